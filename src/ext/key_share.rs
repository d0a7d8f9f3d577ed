//! KeyShare extension (RFC 8446 Section 4.2.8).
//!
//! Carries the ephemeral DH public values for TLS 1.3. The client offers a
//! list of entries; the server answers with a single entry for the chosen
//! group, or a HelloRetryRequest naming the group it wants instead.

use log::debug;
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;
use zeroize::Zeroizing;

use super::supported_groups::SupportedGroupsExtension;
use crate::buffer::Buf;
use crate::crypto::KeyExchange;
use crate::error::TlshakeError;
use crate::message::{MessageType, NamedGroup};

/// A single key share entry: named group + public value, plus the private
/// half when the entry is ours. The private half is opaque key-exchange
/// state and is consumed by the first shared-secret computation.
#[derive(Debug)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub key_exchange: Vec<u8>,
    key_pair: Option<KeyExchange>,
}

impl KeyShareEntry {
    /// Generate an ephemeral keypair for `group` and wrap it as an entry.
    pub fn generate(group: NamedGroup) -> Result<Self, TlshakeError> {
        let key_pair = KeyExchange::generate(group)?;
        let key_exchange = key_pair.public_key().to_vec();
        Ok(KeyShareEntry {
            group,
            key_exchange,
            key_pair: Some(key_pair),
        })
    }

    /// An entry holding only a peer's public value.
    pub fn from_parts(group: NamedGroup, key_exchange: Vec<u8>) -> Self {
        KeyShareEntry {
            group,
            key_exchange,
            key_pair: None,
        }
    }

    /// Compute the shared secret against a peer public value, consuming
    /// our private key.
    pub fn compute_shared_secret(
        &mut self,
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, TlshakeError> {
        let key_pair = self.key_pair.as_mut().ok_or(TlshakeError::BadKeyShareData)?;
        let secret = key_pair.compute_shared_secret(peer_public_key)?;
        // One use only.
        self.key_pair = None;
        Ok(secret)
    }

    fn parse(input: &[u8]) -> IResult<&[u8], KeyShareEntry> {
        let (input, group) = NamedGroup::parse(input)?;
        let (input, key_len) = be_u16(input)?;
        let (input, key_bytes) = take(key_len)(input)?;
        Ok((input, KeyShareEntry::from_parts(group, key_bytes.to_vec())))
    }

    fn encoded_len(&self) -> usize {
        4 + self.key_exchange.len()
    }

    fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.group.as_u16().to_be_bytes());
        output.extend_from_slice(&(self.key_exchange.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.key_exchange);
    }
}

impl PartialEq for KeyShareEntry {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.key_exchange == other.key_exchange
    }
}

impl Eq for KeyShareEntry {}

/// ClientHello form: the offered entry list, one per group, in preference
/// order. `peer` holds the server's entry once a ServerHello is parsed.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct KeyShareClientHello {
    pub entries: Vec<KeyShareEntry>,
    pub peer: Option<KeyShareEntry>,
}

impl KeyShareClientHello {
    /// Generate one entry per group.
    pub fn generate(groups: &[NamedGroup]) -> Result<Self, TlshakeError> {
        let mut list = KeyShareClientHello::default();
        for group in groups {
            list.push_entry(KeyShareEntry::generate(*group)?);
        }
        Ok(list)
    }

    /// Insert an entry; an existing entry for the same group is replaced
    /// so a group never appears twice.
    pub fn push_entry(&mut self, entry: KeyShareEntry) {
        self.entries.retain(|e| e.group != entry.group);
        self.entries.push(entry);
    }

    pub fn find(&self, group: NamedGroup) -> Option<&KeyShareEntry> {
        self.entries.iter().find(|e| e.group == group)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], KeyShareClientHello> {
        let (input, list_len) = be_u16(input)?;
        let (input, mut list) = take(list_len)(input)?;

        let mut out = KeyShareClientHello::default();
        while !list.is_empty() {
            let (rest, entry) = KeyShareEntry::parse(list)?;
            list = rest;
            // Only keep entries for known groups.
            if !matches!(entry.group, NamedGroup::Unknown(_)) {
                out.push_entry(entry);
            }
        }

        Ok((input, out))
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.entries.iter().map(|e| e.encoded_len()).sum::<usize>()
    }

    pub fn serialize(&self, output: &mut Buf) {
        let list_len: usize = self.entries.iter().map(|e| e.encoded_len()).sum();
        output.extend_from_slice(&(list_len as u16).to_be_bytes());
        for entry in &self.entries {
            entry.serialize(output);
        }
    }

    /// Client-side conclusion: compute the shared secret from the server
    /// entry stored by ServerHello parsing.
    pub fn establish(&mut self) -> Result<Zeroizing<Vec<u8>>, TlshakeError> {
        let peer = self.peer.take().ok_or(TlshakeError::BadKeyShareData)?;
        let ours = self
            .entries
            .iter_mut()
            .find(|e| e.group == peer.group)
            .ok_or(TlshakeError::BadKeyShareData)?;
        ours.compute_shared_secret(&peer.key_exchange)
    }
}

/// ServerHello form: the single entry for the chosen group.
#[derive(Debug, PartialEq, Eq)]
pub struct KeyShareServerHello {
    pub entry: KeyShareEntry,
}

impl KeyShareServerHello {
    pub fn parse(input: &[u8]) -> IResult<&[u8], KeyShareServerHello> {
        let (input, entry) = KeyShareEntry::parse(input)?;
        Ok((input, KeyShareServerHello { entry }))
    }

    pub fn encoded_len(&self) -> usize {
        self.entry.encoded_len()
    }

    pub fn serialize(&self, output: &mut Buf) {
        self.entry.serialize(output);
    }
}

/// HelloRetryRequest form: only the group the client should retry with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyShareHelloRetryRequest {
    pub selected_group: NamedGroup,
}

impl KeyShareHelloRetryRequest {
    pub fn parse(input: &[u8]) -> IResult<&[u8], KeyShareHelloRetryRequest> {
        let (input, selected_group) = NamedGroup::parse(input)?;
        Ok((input, KeyShareHelloRetryRequest { selected_group }))
    }

    pub fn encoded_len(&self) -> usize {
        2
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.selected_group.as_u16().to_be_bytes());
    }
}

/// The three wire forms, by carrying message.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyShareExtension {
    ClientHello(KeyShareClientHello),
    ServerHello(KeyShareServerHello),
    HelloRetryRequest(KeyShareHelloRetryRequest),
}

impl KeyShareExtension {
    pub fn parse(input: &[u8], msg: MessageType) -> IResult<&[u8], KeyShareExtension> {
        match msg {
            MessageType::ClientHello => {
                let (input, ext) = KeyShareClientHello::parse(input)?;
                Ok((input, KeyShareExtension::ClientHello(ext)))
            }
            MessageType::HelloRetryRequest => {
                let (input, ext) = KeyShareHelloRetryRequest::parse(input)?;
                Ok((input, KeyShareExtension::HelloRetryRequest(ext)))
            }
            _ => {
                let (input, ext) = KeyShareServerHello::parse(input)?;
                Ok((input, KeyShareExtension::ServerHello(ext)))
            }
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            KeyShareExtension::ClientHello(ext) => ext.encoded_len(),
            KeyShareExtension::ServerHello(ext) => ext.encoded_len(),
            KeyShareExtension::HelloRetryRequest(ext) => ext.encoded_len(),
        }
    }

    pub fn serialize(&self, output: &mut Buf) {
        match self {
            KeyShareExtension::ClientHello(ext) => ext.serialize(output),
            KeyShareExtension::ServerHello(ext) => ext.serialize(output),
            KeyShareExtension::HelloRetryRequest(ext) => ext.serialize(output),
        }
    }
}

/// Outcome of the server-side negotiation.
#[derive(Debug)]
pub enum Established {
    /// A group matched: the server entry to send back and the shared
    /// pre-master secret feeding the key schedule.
    Secret {
        server_entry: KeyShareEntry,
        pre_master_secret: Zeroizing<Vec<u8>>,
    },
    /// No usable client entry; answer with a HelloRetryRequest naming
    /// this group. The client is expected to retry with it.
    HelloRetry(NamedGroup),
}

/// Server-side negotiation over the client's offers.
///
/// Walks the offered entries in client preference order and picks the
/// first group we also support. Every candidate must appear in the
/// client's supported_groups list; a key share for a group the client did
/// not list is an inconsistency between the two extensions.
pub fn establish(
    client_shares: &KeyShareClientHello,
    client_groups: &SupportedGroupsExtension,
    our_groups: &[NamedGroup],
) -> Result<Established, TlshakeError> {
    for offered in &client_shares.entries {
        if !our_groups.contains(&offered.group) {
            continue;
        }
        if !client_groups.contains(offered.group) {
            return Err(TlshakeError::BadKeyShareData);
        }

        let mut server_key = KeyExchange::generate(offered.group)?;
        let public = server_key.public_key().to_vec();
        let pre_master_secret = server_key.compute_shared_secret(&offered.key_exchange)?;

        debug!("key share established over {:?}", offered.group);
        return Ok(Established::Secret {
            server_entry: KeyShareEntry::from_parts(offered.group, public),
            pre_master_secret,
        });
    }

    // No offered entry works. Ask the client to retry with our preferred
    // group among the ones it claims to support.
    for group in our_groups {
        if client_groups.contains(*group) {
            debug!("no usable key share, requesting retry with {:?}", group);
            return Ok(Established::HelloRetry(*group));
        }
    }

    Err(TlshakeError::BadKeyShareData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_retry_request_roundtrip() {
        let buf: [u8; 2] = [0x00, 0x1D];
        let (rest, parsed) = KeyShareHelloRetryRequest::parse(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.selected_group, NamedGroup::X25519);

        let mut out = Buf::new();
        parsed.serialize(&mut out);
        assert_eq!(&*out, &buf);
    }

    #[test]
    fn client_hello_roundtrip() {
        let x25519_key = [0xAA_u8; 32];
        let p256_key = [0xBB_u8; 65];

        let mut wire = Buf::new();
        wire.extend_from_slice(&[0x00, 105]); // (2+2+32) + (2+2+65)
        wire.extend_from_slice(&[0x00, 0x1D, 0x00, 32]);
        wire.extend_from_slice(&x25519_key);
        wire.extend_from_slice(&[0x00, 0x17, 0x00, 65]);
        wire.extend_from_slice(&p256_key);

        let (rest, parsed) = KeyShareClientHello::parse(&wire).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].group, NamedGroup::X25519);
        assert_eq!(parsed.entries[1].group, NamedGroup::Secp256r1);
        assert_eq!(parsed.entries[0].key_exchange, x25519_key);

        let mut out = Buf::new();
        parsed.serialize(&mut out);
        assert_eq!(&*out, &*wire);
        assert_eq!(parsed.encoded_len(), wire.len());
    }

    #[test]
    fn duplicate_group_is_replaced() {
        let mut list = KeyShareClientHello::default();
        list.push_entry(KeyShareEntry::from_parts(NamedGroup::X25519, vec![0x01; 32]));
        list.push_entry(KeyShareEntry::from_parts(NamedGroup::X25519, vec![0x02; 32]));

        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].key_exchange, vec![0x02; 32]);
    }

    #[test]
    fn establish_prefers_client_order() {
        let client = KeyShareClientHello::generate(&[NamedGroup::Secp256r1, NamedGroup::X25519])
            .unwrap();
        let groups =
            SupportedGroupsExtension::new(&[NamedGroup::Secp256r1, NamedGroup::X25519]);

        let result = establish(&client, &groups, NamedGroup::all_supported()).unwrap();
        match result {
            Established::Secret { server_entry, .. } => {
                assert_eq!(server_entry.group, NamedGroup::Secp256r1);
            }
            other => panic!("expected secret, got {:?}", other),
        }
    }

    #[test]
    fn both_sides_agree_on_secret() {
        let mut client = KeyShareClientHello::generate(&[NamedGroup::X25519]).unwrap();
        let groups = SupportedGroupsExtension::new(&[NamedGroup::X25519]);

        let Established::Secret {
            server_entry,
            pre_master_secret,
        } = establish(&client, &groups, &[NamedGroup::X25519]).unwrap()
        else {
            panic!("expected secret");
        };

        client.peer = Some(server_entry);
        let client_secret = client.establish().unwrap();
        assert_eq!(&client_secret[..], &pre_master_secret[..]);
    }

    #[test]
    fn share_outside_supported_groups_is_inconsistent() {
        let client = KeyShareClientHello::generate(&[NamedGroup::X25519]).unwrap();
        // supported_groups does not list X25519.
        let groups = SupportedGroupsExtension::new(&[NamedGroup::Secp256r1]);

        let result = establish(&client, &groups, NamedGroup::all_supported());
        assert!(matches!(result, Err(TlshakeError::BadKeyShareData)));
    }

    #[test]
    fn no_overlap_yields_hello_retry() {
        // Client offers only a P-384 share but supports P-256 too.
        let client = KeyShareClientHello::generate(&[NamedGroup::Secp384r1]).unwrap();
        let groups =
            SupportedGroupsExtension::new(&[NamedGroup::Secp384r1, NamedGroup::Secp256r1]);

        // Server only does P-256.
        let result = establish(&client, &groups, &[NamedGroup::Secp256r1]).unwrap();
        match result {
            Established::HelloRetry(group) => assert_eq!(group, NamedGroup::Secp256r1),
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn no_common_ground_is_fatal() {
        let client = KeyShareClientHello::generate(&[NamedGroup::X25519]).unwrap();
        let groups = SupportedGroupsExtension::new(&[NamedGroup::X25519]);

        let result = establish(&client, &groups, &[NamedGroup::Secp384r1]);
        assert!(matches!(result, Err(TlshakeError::BadKeyShareData)));
    }
}
