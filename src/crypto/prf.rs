use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384};
use zeroize::Zeroizing;

use crate::error::TlshakeError;
use crate::message::HashAlgorithm;

/// Upper bound for a single PRF expansion.
///
/// Bounds resource use when the requested length comes from untrusted
/// negotiation input. The largest legitimate request is the key-material
/// block, far below this.
pub const MAX_PRF_OUTPUT: usize = 1024;

/// P_hash for the TLS PRF (RFC 5246 Section 5).
///
/// A(0) = seed; A(i) = HMAC(secret, A(i-1));
/// output block i = HMAC(secret, A(i) + seed). Blocks are concatenated and
/// truncated to `output_len`, so non-multiple-of-hash-size lengths hit the
/// partial final block path.
///
/// NOTE: `full_seed` is the complete seed including any label; no label is
/// prepended here.
pub fn p_hash(
    hash: HashAlgorithm,
    secret: &[u8],
    full_seed: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, TlshakeError> {
    if output_len > MAX_PRF_OUTPUT {
        return Err(TlshakeError::BufferTooSmall(output_len, MAX_PRF_OUTPUT));
    }

    match hash {
        HashAlgorithm::MD5 => p_hash_with::<Hmac<Md5>>(secret, full_seed, output_len),
        HashAlgorithm::SHA1 => p_hash_with::<Hmac<Sha1>>(secret, full_seed, output_len),
        HashAlgorithm::SHA256 => p_hash_with::<Hmac<Sha256>>(secret, full_seed, output_len),
        HashAlgorithm::SHA384 => p_hash_with::<Hmac<Sha384>>(secret, full_seed, output_len),
        other => Err(TlshakeError::UnsupportedHash(other)),
    }
}

fn p_hash_with<M>(
    secret: &[u8],
    full_seed: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, TlshakeError>
where
    M: Mac + KeyInit,
{
    let mut result = Zeroizing::new(Vec::new());
    result
        .try_reserve(output_len)
        .map_err(|_| TlshakeError::AllocationFailure)?;

    // A(1) = HMAC_hash(secret, A(0)) where A(0) = seed
    let mut mac = <M as Mac>::new_from_slice(secret).map_err(|_| TlshakeError::HmacError)?;
    mac.update(full_seed);
    let mut a = mac.finalize().into_bytes();

    while result.len() < output_len {
        // HMAC_hash(secret, A(i) + seed)
        let mut mac = <M as Mac>::new_from_slice(secret).map_err(|_| TlshakeError::HmacError)?;
        mac.update(&a);
        mac.update(full_seed);
        let block = mac.finalize().into_bytes();

        let remaining = output_len - result.len();
        let to_copy = std::cmp::min(remaining, block.len());
        result.extend_from_slice(&block[..to_copy]);

        if result.len() < output_len {
            // A(i+1) = HMAC_hash(secret, A(i))
            let mut mac =
                <M as Mac>::new_from_slice(secret).map_err(|_| TlshakeError::HmacError)?;
            mac.update(&a);
            a = mac.finalize().into_bytes();
        }
    }

    Ok(result)
}

/// The TLS PRF.
///
/// PRF(secret, label, seed) = P_<hash>(secret, label + seed)
///
/// With `use_at_least_sha256` set (TLS 1.2+), a single P_hash runs with
/// `hash` upgraded to at least SHA-256. Without it (TLS 1.0/1.1), the
/// secret is split into two halves, P_MD5 runs over the first and P_SHA1
/// over the second, and the outputs are XORed. For an odd secret length
/// the second half starts one byte early so the halves overlap by one
/// byte (RFC 2246 Section 5).
pub fn prf(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
    use_at_least_sha256: bool,
    hash: HashAlgorithm,
) -> Result<Zeroizing<Vec<u8>>, TlshakeError> {
    debug_assert!(label.is_ascii());

    let mut full_seed = Vec::with_capacity(label.len() + seed.len());
    full_seed.extend_from_slice(label.as_bytes());
    full_seed.extend_from_slice(seed);

    if use_at_least_sha256 {
        p_hash(upgrade_hash(hash), secret, &full_seed, output_len)
    } else {
        let half = secret.len().div_ceil(2);
        let first = &secret[..half];
        let second = &secret[secret.len() - half..];

        let mut out = p_hash(HashAlgorithm::MD5, first, &full_seed, output_len)?;
        let sha1_out = p_hash(HashAlgorithm::SHA1, second, &full_seed, output_len)?;

        for (o, s) in out.iter_mut().zip(sha1_out.iter()) {
            *o ^= s;
        }
        Ok(out)
    }
}

/// Hashes weaker than SHA-256, and the non-standard Blake2b tag, are never
/// used verbatim in 1.2+ mode.
fn upgrade_hash(hash: HashAlgorithm) -> HashAlgorithm {
    match hash {
        HashAlgorithm::SHA256 | HashAlgorithm::SHA384 => hash,
        _ => HashAlgorithm::SHA256,
    }
}
