use num_bigint::{BigUint, RandomBits};
use p256::{ecdh::EphemeralSecret as P256EphemeralSecret, PublicKey as P256PublicKey};
use p384::{ecdh::EphemeralSecret as P384EphemeralSecret, PublicKey as P384PublicKey};
use rand::distributions::Distribution;
use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret as X25519EphemeralSecret, PublicKey as X25519PublicKey};
use zeroize::Zeroizing;

use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};

use super::ffdhe::FfdheGroup;
use crate::error::TlshakeError;
use crate::message::NamedGroup;

/// An ephemeral key-exchange keypair for one named group.
///
/// The public value is cached in wire encoding at generation time. The
/// private half is consumed by the first `compute_shared_secret` call and
/// cannot be reused.
pub struct KeyExchange {
    group: NamedGroup,
    inner: Inner,
    public_key: Vec<u8>,
}

enum Inner {
    P256(Option<P256EphemeralSecret>),
    P384(Option<P384EphemeralSecret>),
    X25519(Option<X25519EphemeralSecret>),
    Ffdhe {
        params: &'static FfdheGroup,
        private: Option<BigUint>,
    },
}

impl KeyExchange {
    /// Generate an ephemeral keypair for `group`.
    ///
    /// EC groups export the uncompressed SEC1 point (X25519 its fixed
    /// 32-byte encoding). FFDHE public values are zero-padded to the full
    /// prime width; a short encoding would leak information and break
    /// fixed-width parsing on the peer.
    pub fn generate(group: NamedGroup) -> Result<Self, TlshakeError> {
        let (inner, public_key) = match group {
            NamedGroup::Secp256r1 => {
                let secret = P256EphemeralSecret::random(&mut OsRng);
                let public = P256PublicKey::from(&secret).to_encoded_point(false);
                (Inner::P256(Some(secret)), public.as_bytes().to_vec())
            }
            NamedGroup::Secp384r1 => {
                let secret = P384EphemeralSecret::random(&mut OsRng);
                let public = P384PublicKey::from(&secret).to_encoded_point(false);
                (Inner::P384(Some(secret)), public.as_bytes().to_vec())
            }
            NamedGroup::X25519 => {
                let secret = X25519EphemeralSecret::random_from_rng(OsRng);
                let public = X25519PublicKey::from(&secret);
                (Inner::X25519(Some(secret)), public.as_bytes().to_vec())
            }
            group if group.is_ffdhe() => {
                let params = FfdheGroup::for_group(group)
                    .ok_or(TlshakeError::UnsupportedGroup(group))?;
                let private = random_exponent(params.prime);
                let public = params.generator().modpow(&private, params.prime);
                let public = pad_left(public.to_bytes_be(), params.prime_len);
                (
                    Inner::Ffdhe {
                        params,
                        private: Some(private),
                    },
                    public,
                )
            }
            group => return Err(TlshakeError::UnsupportedGroup(group)),
        };

        Ok(KeyExchange {
            group,
            inner,
            public_key,
        })
    }

    pub fn group(&self) -> NamedGroup {
        self.group
    }

    /// The wire encoding of our public value.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Compute the shared secret from the peer's public value.
    ///
    /// The peer value is validated before use: FFDHE peers equal to 0, 1,
    /// p-1 or p (and anything out of range) are rejected, EC peers are
    /// validated by the point import. The private key is consumed; a
    /// second call fails.
    pub fn compute_shared_secret(
        &mut self,
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, TlshakeError> {
        match &mut self.inner {
            Inner::P256(private) => {
                let secret = private.take().ok_or(TlshakeError::BadKeyShareData)?;

                let point = p256::EncodedPoint::from_bytes(peer_public_key)
                    .map_err(|_| TlshakeError::PeerKeyError)?;
                let public = Option::<P256PublicKey>::from(P256PublicKey::from_encoded_point(&point))
                    .ok_or(TlshakeError::PeerKeyError)?;

                let shared = secret.diffie_hellman(&public);
                Ok(Zeroizing::new(shared.raw_secret_bytes().as_slice().to_vec()))
            }
            Inner::P384(private) => {
                let secret = private.take().ok_or(TlshakeError::BadKeyShareData)?;

                let point = p384::EncodedPoint::from_bytes(peer_public_key)
                    .map_err(|_| TlshakeError::PeerKeyError)?;
                let public = Option::<P384PublicKey>::from(P384PublicKey::from_encoded_point(&point))
                    .ok_or(TlshakeError::PeerKeyError)?;

                let shared = secret.diffie_hellman(&public);
                Ok(Zeroizing::new(shared.raw_secret_bytes().as_slice().to_vec()))
            }
            Inner::X25519(private) => {
                let secret = private.take().ok_or(TlshakeError::BadKeyShareData)?;

                let bytes: [u8; 32] = peer_public_key
                    .try_into()
                    .map_err(|_| TlshakeError::PeerKeyError)?;
                let shared = secret.diffie_hellman(&X25519PublicKey::from(bytes));
                if !shared.was_contributory() {
                    return Err(TlshakeError::PeerKeyError);
                }
                Ok(Zeroizing::new(shared.as_bytes().to_vec()))
            }
            Inner::Ffdhe { params, private } => {
                let private = private.take().ok_or(TlshakeError::BadKeyShareData)?;

                let peer = BigUint::from_bytes_be(peer_public_key);
                validate_ffdhe_peer(&peer, params.prime)?;

                let shared = peer.modpow(&private, params.prime);
                Ok(Zeroizing::new(pad_left(
                    shared.to_bytes_be(),
                    params.prime_len,
                )))
            }
        }
    }
}

impl std::fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyExchange({:?})", self.group)
    }
}

/// Reject the classic small-subgroup/identity values: a peer public value
/// y must satisfy 1 < y < p-1.
fn validate_ffdhe_peer(peer: &BigUint, prime: &BigUint) -> Result<(), TlshakeError> {
    let one = BigUint::from(1u8);
    if *peer <= one || *peer >= prime - &one {
        return Err(TlshakeError::PeerKeyError);
    }
    Ok(())
}

fn random_exponent(prime: &BigUint) -> BigUint {
    // One bit less than the prime keeps the exponent in range.
    let distribution = RandomBits::new(prime.bits() - 1);
    loop {
        let candidate: BigUint = distribution.sample(&mut OsRng);
        if candidate > BigUint::from(1u8) {
            return candidate;
        }
    }
}

fn pad_left(bytes: Vec<u8>, width: usize) -> Vec<u8> {
    if bytes.len() >= width {
        return bytes;
    }
    let mut out = vec![0u8; width];
    let at = width - bytes.len();
    out[at..].copy_from_slice(&bytes);
    out
}
