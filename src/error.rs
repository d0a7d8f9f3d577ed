use thiserror::Error;

use crate::ext::ExtensionType;
use crate::message::{HashAlgorithm, MessageType, NamedGroup};

/// Errors produced while parsing extensions or deriving secrets.
///
/// All of these are fatal to the handshake. The caller is expected to map
/// the error to an alert and tear the connection down; no variant is
/// recoverable by re-parsing the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TlshakeError {
    #[error("Malformed input or length field exceeds remaining input")]
    BufferError,

    #[error("Requested output too big ({0} > max {1})")]
    BufferTooSmall(usize, usize),

    #[error("Allocation failure")]
    AllocationFailure,

    #[error("HMAC operation failed")]
    HmacError,

    #[error("Unsupported hash algorithm {0:?}")]
    UnsupportedHash(HashAlgorithm),

    #[error("Unsupported named group {0:?}")]
    UnsupportedGroup(NamedGroup),

    #[error("Peer public key failed validation")]
    PeerKeyError,

    #[error("Key share inconsistent with supported groups")]
    BadKeyShareData,

    #[error("Extension {0:?} not allowed in {1:?}")]
    ExtensionNotAllowed(ExtensionType, MessageType),

    #[error("Invalid payload for extension {0:?}")]
    InvalidExtensionData(ExtensionType),

    #[error("Peer selected an ALPN protocol we did not offer")]
    AlpnMismatch,

    #[error("Echoed cookie does not match the one we issued")]
    CookieMismatch,

    #[error("Pre-shared key rejected")]
    PskKeyError,

    #[error("Extended master secret negotiated but no session hash available")]
    MissingSessionHash,
}
