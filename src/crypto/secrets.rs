//! Master-secret and key-material derivation (RFC 5246 Sections 6.3, 8.1).

use std::ops::Deref;

use zeroize::Zeroizing;

use super::prf::prf;
use crate::error::TlshakeError;
use crate::message::{HashAlgorithm, ProtocolVersion};

/// Master secret length for TLS 1.0-1.2.
pub const MASTER_SECRET_LEN: usize = 48;

/// Finished verify_data length for TLS 1.0-1.2.
pub const VERIFY_DATA_LEN: usize = 12;

const MASTER_LABEL: &str = "master secret";
const EXTENDED_MASTER_LABEL: &str = "extended master secret";
const KEY_EXPANSION_LABEL: &str = "key expansion";
const CLIENT_FINISHED_LABEL: &str = "client finished";
const SERVER_FINISHED_LABEL: &str = "server finished";

/// A derived secret. Zeroized on drop, redacted in Debug output.
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    pub fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Secret(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Secret(Zeroizing::new(bytes.to_vec()))
    }
}

impl Deref for Secret {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret")
    }
}

/// Which peer a Finished message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Client,
    Server,
}

/// Per-cipher-suite lengths for the key-material split.
#[derive(Debug, Clone, Copy)]
pub struct KeySizes {
    pub mac_key_len: usize,
    pub enc_key_len: usize,
    pub iv_len: usize,
}

impl KeySizes {
    fn block_len(&self) -> usize {
        2 * (self.mac_key_len + self.enc_key_len + self.iv_len)
    }
}

/// The expanded key-material block, split into per-direction keys.
///
/// The block is cut in a fixed order: MAC keys first, then cipher keys,
/// then IVs, client before server within each group.
#[derive(Debug)]
pub struct KeyMaterial {
    pub client_write_mac_key: Secret,
    pub server_write_mac_key: Secret,
    pub client_write_key: Secret,
    pub server_write_key: Secret,
    pub client_write_iv: Secret,
    pub server_write_iv: Secret,
}

/// master_secret = PRF(pre_master_secret, "master secret",
///                     client_random + server_random, 48)
///
/// The seed order is client before server; key expansion uses the reverse.
pub fn make_master_secret(
    pre_master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    version: ProtocolVersion,
    hash: HashAlgorithm,
) -> Result<Secret, TlshakeError> {
    let mut seed = Vec::with_capacity(client_random.len() + server_random.len());
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);

    let out = prf(
        pre_master_secret,
        MASTER_LABEL,
        &seed,
        MASTER_SECRET_LEN,
        version.use_at_least_sha256(),
        hash,
    )?;
    Ok(Secret::new(out))
}

/// Extended master secret (RFC 7627):
///
/// master_secret = PRF(pre_master_secret, "extended master secret",
///                     session_hash, 48)
pub fn make_extended_master_secret(
    pre_master_secret: &[u8],
    session_hash: &[u8],
    version: ProtocolVersion,
    hash: HashAlgorithm,
) -> Result<Secret, TlshakeError> {
    let out = prf(
        pre_master_secret,
        EXTENDED_MASTER_LABEL,
        session_hash,
        MASTER_SECRET_LEN,
        version.use_at_least_sha256(),
        hash,
    )?;
    Ok(Secret::new(out))
}

/// Derive the session master secret honoring the extended-master-secret
/// negotiation result.
///
/// When both peers negotiated the extension, the session hash MUST be
/// present; its absence is a protocol error, not a silent downgrade.
pub fn make_session_master_secret(
    pre_master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    ems_negotiated: bool,
    session_hash: Option<&[u8]>,
    version: ProtocolVersion,
    hash: HashAlgorithm,
) -> Result<Secret, TlshakeError> {
    if ems_negotiated {
        let session_hash = session_hash.ok_or(TlshakeError::MissingSessionHash)?;
        make_extended_master_secret(pre_master_secret, session_hash, version, hash)
    } else {
        make_master_secret(pre_master_secret, client_random, server_random, version, hash)
    }
}

/// key_block = PRF(master_secret, "key expansion",
///                 server_random + client_random, len)
///
/// The seed order here is server before client, the reverse of the
/// master-secret derivation. The asymmetry is part of the protocol.
pub fn derive_keys(
    master_secret: &[u8],
    server_random: &[u8],
    client_random: &[u8],
    version: ProtocolVersion,
    hash: HashAlgorithm,
    sizes: KeySizes,
) -> Result<KeyMaterial, TlshakeError> {
    let mut seed = Vec::with_capacity(server_random.len() + client_random.len());
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let block = prf(
        master_secret,
        KEY_EXPANSION_LABEL,
        &seed,
        sizes.block_len(),
        version.use_at_least_sha256(),
        hash,
    )?;

    let mut at = 0;
    let mut next = |len: usize| {
        let piece = Secret::from_slice(&block[at..at + len]);
        at += len;
        piece
    };

    Ok(KeyMaterial {
        client_write_mac_key: next(sizes.mac_key_len),
        server_write_mac_key: next(sizes.mac_key_len),
        client_write_key: next(sizes.enc_key_len),
        server_write_key: next(sizes.enc_key_len),
        client_write_iv: next(sizes.iv_len),
        server_write_iv: next(sizes.iv_len),
    })
}

/// verify_data = PRF(master_secret, finished_label, transcript_hash, 12)
///
/// The transcript hash is the caller's running handshake hash: MD5 + SHA-1
/// concatenated before TLS 1.2, a single wide hash from 1.2 on.
pub fn finished_verify_data(
    master_secret: &[u8],
    transcript_hash: &[u8],
    sender: Sender,
    version: ProtocolVersion,
    hash: HashAlgorithm,
) -> Result<Zeroizing<Vec<u8>>, TlshakeError> {
    let label = match sender {
        Sender::Client => CLIENT_FINISHED_LABEL,
        Sender::Server => SERVER_FINISHED_LABEL,
    };

    prf(
        master_secret,
        label,
        transcript_hash,
        VERIFY_DATA_LEN,
        version.use_at_least_sha256(),
        hash,
    )
}
