//! PreSharedKey extension (RFC 8446 Section 4.2.11).
//!
//! The ClientHello form carries an identity list and a binder list of the
//! same length. Binders are HMACs over the transcript hash of the partial
//! ClientHello (everything up to the binder list), so they can only be
//! computed after all identities are in place. The ServerHello form is a
//! single index into the client's list.
//!
//! When present in a ClientHello, this extension must be the last one.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use sha2::{Sha256, Sha384};

use crate::buffer::Buf;
use crate::error::TlshakeError;
use crate::message::{HashAlgorithm, MessageType};

/// Binder lengths a peer may send. The lower bound is the SHA-256 digest
/// size, the upper bound SHA-384; before verification the length must
/// additionally equal the digest length of the identity's hash.
const MIN_BINDER_LEN: usize = 32;
const MAX_BINDER_LEN: usize = 48;

/// One offered PSK identity and its local bookkeeping.
///
/// `hash`, `resumption` and `selected` never travel on the wire; they are
/// filled in from the session that minted the ticket (or from external
/// PSK provisioning) and by server selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskIdentity {
    pub identity: Vec<u8>,
    pub obfuscated_ticket_age: u32,
    pub binder: Vec<u8>,
    /// Hash of the cipher suite this PSK is bound to; determines the
    /// binder length.
    pub hash: HashAlgorithm,
    pub resumption: bool,
    pub selected: bool,
}

impl PskIdentity {
    pub fn new(
        identity: Vec<u8>,
        obfuscated_ticket_age: u32,
        hash: HashAlgorithm,
        resumption: bool,
    ) -> Self {
        let binder = vec![0u8; hash.digest_len()];
        PskIdentity {
            identity,
            obfuscated_ticket_age,
            binder,
            hash,
            resumption,
            selected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreSharedKeyExtension {
    /// Identities in the order they were offered.
    pub identities: Vec<PskIdentity>,
    /// ServerHello form: index of the accepted identity.
    pub selected_identity: Option<u16>,
}

impl PreSharedKeyExtension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity. Offer order is preserved.
    pub fn push_identity(&mut self, identity: PskIdentity) {
        self.identities.push(identity);
    }

    pub fn parse(input: &[u8], msg: MessageType) -> IResult<&[u8], PreSharedKeyExtension> {
        if msg == MessageType::ClientHello {
            Self::parse_client_hello(input)
        } else {
            Self::parse_server_hello(input)
        }
    }

    fn parse_client_hello(input: &[u8]) -> IResult<&[u8], PreSharedKeyExtension> {
        let (input, identities_len) = be_u16(input)?;
        let (input, mut identities_data) = take(identities_len)(input)?;

        let mut identities = Vec::new();
        while !identities_data.is_empty() {
            let (rest, id_len) = be_u16(identities_data)?;
            let (rest, identity) = take(id_len)(rest)?;
            let (rest, obfuscated_ticket_age) = be_u32(rest)?;
            identities_data = rest;

            identities.push(PskIdentity {
                identity: identity.to_vec(),
                obfuscated_ticket_age,
                binder: Vec::new(),
                hash: HashAlgorithm::None,
                resumption: false,
                selected: false,
            });
        }

        let (input, binders_len) = be_u16(input)?;
        let (input, mut binders_data) = take(binders_len)(input)?;

        let mut binder_count = 0;
        for identity in identities.iter_mut() {
            if binders_data.is_empty() {
                break;
            }
            let (rest, binder_len) = be_u8(binders_data)?;
            let (rest, binder) = take(binder_len)(rest)?;
            binders_data = rest;

            // Bound attacker-supplied binder lengths to the digest range.
            let len = binder.len();
            if !(MIN_BINDER_LEN..=MAX_BINDER_LEN).contains(&len) {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    binders_data,
                    nom::error::ErrorKind::LengthValue,
                )));
            }

            identity.binder = binder.to_vec();
            binder_count += 1;
        }

        // Binder list and identity list must pair up exactly.
        if binder_count != identities.len() || !binders_data.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(
                binders_data,
                nom::error::ErrorKind::LengthValue,
            )));
        }

        Ok((
            input,
            PreSharedKeyExtension {
                identities,
                selected_identity: None,
            },
        ))
    }

    fn parse_server_hello(input: &[u8]) -> IResult<&[u8], PreSharedKeyExtension> {
        let (input, selected) = be_u16(input)?;
        Ok((
            input,
            PreSharedKeyExtension {
                identities: Vec::new(),
                selected_identity: Some(selected),
            },
        ))
    }

    pub fn encoded_len(&self, msg: MessageType) -> usize {
        if msg == MessageType::ClientHello {
            let identities: usize = self.identities.iter().map(|i| 6 + i.identity.len()).sum();
            let binders: usize = self.identities.iter().map(|i| 1 + i.binder.len()).sum();
            2 + identities + 2 + binders
        } else {
            2
        }
    }

    pub fn serialize(&self, msg: MessageType, output: &mut Buf) {
        if msg == MessageType::ClientHello {
            let identities_len: usize =
                self.identities.iter().map(|i| 6 + i.identity.len()).sum();
            output.extend_from_slice(&(identities_len as u16).to_be_bytes());
            for identity in &self.identities {
                output.extend_from_slice(&(identity.identity.len() as u16).to_be_bytes());
                output.extend_from_slice(&identity.identity);
                output.extend_from_slice(&identity.obfuscated_ticket_age.to_be_bytes());
            }

            let binders_len: usize = self.identities.iter().map(|i| 1 + i.binder.len()).sum();
            output.extend_from_slice(&(binders_len as u16).to_be_bytes());
            for identity in &self.identities {
                output.push(identity.binder.len() as u8);
                output.extend_from_slice(&identity.binder);
            }
        } else {
            output.extend_from_slice(&self.selected_identity.unwrap_or(0).to_be_bytes());
        }
    }

    /// Wire size of the binder list including its length prefix. The
    /// transcript a binder covers ends exactly this many bytes before the
    /// end of the ClientHello.
    pub fn binders_len(&self) -> usize {
        2 + self
            .identities
            .iter()
            .map(|i| 1 + i.binder.len())
            .sum::<usize>()
    }

    /// Compute all binders over the partial-ClientHello transcript hash.
    ///
    /// `binder_keys` pairs up with the identity list; each key comes from
    /// the external key schedule for that PSK.
    pub fn compute_binders(
        &mut self,
        binder_keys: &[&[u8]],
        transcript_hash: &[u8],
    ) -> Result<(), TlshakeError> {
        if binder_keys.len() != self.identities.len() {
            return Err(TlshakeError::PskKeyError);
        }

        for (identity, key) in self.identities.iter_mut().zip(binder_keys) {
            identity.binder = binder_hmac(identity.hash, key, transcript_hash)?;
        }
        Ok(())
    }

    /// Verify the binder of one identity in constant time.
    ///
    /// The received binder length must equal the digest length of the
    /// hash negotiated for this PSK; a shorter or longer binder is
    /// rejected before any HMAC comparison.
    pub fn verify_binder(
        &self,
        index: usize,
        binder_key: &[u8],
        hash: HashAlgorithm,
        transcript_hash: &[u8],
    ) -> Result<(), TlshakeError> {
        let identity = self.identities.get(index).ok_or(TlshakeError::PskKeyError)?;

        if identity.binder.len() != hash.digest_len() {
            return Err(TlshakeError::PskKeyError);
        }

        match hash {
            HashAlgorithm::SHA256 => {
                verify_hmac::<Hmac<Sha256>>(binder_key, transcript_hash, &identity.binder)
            }
            HashAlgorithm::SHA384 => {
                verify_hmac::<Hmac<Sha384>>(binder_key, transcript_hash, &identity.binder)
            }
            other => Err(TlshakeError::UnsupportedHash(other)),
        }
    }

    /// Server-side selection of an identity by index.
    pub fn select(&mut self, index: u16) -> Result<(), TlshakeError> {
        let identity = self
            .identities
            .get_mut(index as usize)
            .ok_or(TlshakeError::PskKeyError)?;
        identity.selected = true;
        self.selected_identity = Some(index);
        Ok(())
    }

    /// Client-side acceptance of the server's chosen index.
    pub fn accept(&mut self, index: u16) -> Result<(), TlshakeError> {
        self.select(index)
    }
}

fn binder_hmac(
    hash: HashAlgorithm,
    key: &[u8],
    transcript_hash: &[u8],
) -> Result<Vec<u8>, TlshakeError> {
    match hash {
        HashAlgorithm::SHA256 => compute_hmac::<Hmac<Sha256>>(key, transcript_hash),
        HashAlgorithm::SHA384 => compute_hmac::<Hmac<Sha384>>(key, transcript_hash),
        other => Err(TlshakeError::UnsupportedHash(other)),
    }
}

fn compute_hmac<M>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, TlshakeError>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| TlshakeError::HmacError)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_hmac<M>(key: &[u8], message: &[u8], expected: &[u8]) -> Result<(), TlshakeError>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| TlshakeError::HmacError)?;
    mac.update(message);
    mac.verify_slice(expected).map_err(|_| TlshakeError::PskKeyError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_identity_extension() -> PreSharedKeyExtension {
        let mut ext = PreSharedKeyExtension::new();
        ext.push_identity(PskIdentity::new(
            b"ticket-one".to_vec(),
            0x0102_0304,
            HashAlgorithm::SHA256,
            true,
        ));
        ext.push_identity(PskIdentity::new(
            b"ticket-two".to_vec(),
            0,
            HashAlgorithm::SHA384,
            false,
        ));
        ext
    }

    #[test]
    fn client_hello_roundtrip() {
        let ext = two_identity_extension();

        let mut serialized = Buf::new();
        ext.serialize(MessageType::ClientHello, &mut serialized);
        assert_eq!(ext.encoded_len(MessageType::ClientHello), serialized.len());

        // The transcript a binder covers ends where the binder list
        // starts.
        assert_eq!(ext.binders_len(), 2 + (1 + 32) + (1 + 48));

        let (rest, parsed) = PreSharedKeyExtension::parse(&serialized, MessageType::ClientHello)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.identities.len(), 2);
        assert_eq!(parsed.identities[0].identity, b"ticket-one");
        assert_eq!(parsed.identities[0].obfuscated_ticket_age, 0x0102_0304);
        assert_eq!(parsed.identities[0].binder.len(), 32);
        assert_eq!(parsed.identities[1].binder.len(), 48);
    }

    #[test]
    fn server_hello_roundtrip() {
        let mut ext = two_identity_extension();
        ext.select(1).unwrap();

        let mut serialized = Buf::new();
        ext.serialize(MessageType::ServerHello, &mut serialized);
        assert_eq!(&*serialized, &[0x00, 0x01]);

        let (rest, parsed) =
            PreSharedKeyExtension::parse(&serialized, MessageType::ServerHello).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.selected_identity, Some(1));
    }

    #[test]
    fn binder_length_must_pair_with_identities() {
        let ext = two_identity_extension();
        let mut serialized = Buf::new();
        ext.serialize(MessageType::ClientHello, &mut serialized);

        // Drop the final binder byte: the lists no longer pair up.
        let truncated = &serialized[..serialized.len() - 1];
        assert!(PreSharedKeyExtension::parse(truncated, MessageType::ClientHello).is_err());
    }

    #[test]
    fn undersized_binder_is_rejected() {
        // One identity, one 8-byte binder (below the SHA-256 floor).
        let mut wire = Buf::new();
        wire.extend_from_slice(&[0x00, 0x08]); // identities length
        wire.extend_from_slice(&[0x00, 0x02, b'i', b'd']);
        wire.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        wire.extend_from_slice(&[0x00, 0x09]); // binders length
        wire.push(0x08);
        wire.extend_from_slice(&[0xAA; 8]);

        assert!(PreSharedKeyExtension::parse(&wire, MessageType::ClientHello).is_err());
    }

    #[test]
    fn binder_compute_and_verify() {
        let mut ext = PreSharedKeyExtension::new();
        ext.push_identity(PskIdentity::new(
            b"ticket".to_vec(),
            7,
            HashAlgorithm::SHA256,
            true,
        ));

        let key = [0x42u8; 32];
        let transcript = [0x13u8; 32];
        ext.compute_binders(&[&key], &transcript).unwrap();

        assert!(ext
            .verify_binder(0, &key, HashAlgorithm::SHA256, &transcript)
            .is_ok());

        // Wrong key fails.
        let wrong = [0x43u8; 32];
        assert_eq!(
            ext.verify_binder(0, &wrong, HashAlgorithm::SHA256, &transcript)
                .unwrap_err(),
            TlshakeError::PskKeyError
        );

        // Binder length inconsistent with the negotiated hash fails
        // before any comparison.
        assert_eq!(
            ext.verify_binder(0, &key, HashAlgorithm::SHA384, &transcript)
                .unwrap_err(),
            TlshakeError::PskKeyError
        );
    }

    #[test]
    fn selection_out_of_range_fails() {
        let mut ext = two_identity_extension();
        assert_eq!(ext.select(2).unwrap_err(), TlshakeError::PskKeyError);
        assert!(ext.select(0).is_ok());
        assert!(ext.identities[0].selected);
    }
}
