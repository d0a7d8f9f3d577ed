#![forbid(unsafe_code)]
#![warn(clippy::all)]

//! TLS handshake core: the PRF-based key schedule and the extension
//! negotiation subsystem for TLS 1.0-1.3.
//!
//! The surrounding handshake driver builds and parses hello-type messages
//! through the [`ext::ExtensionRegistry`] two-pass size/write API, and
//! feeds negotiated secrets through [`crypto`]'s derivation functions.
//! Record protection, certificates and message sequencing live elsewhere.

mod buffer;
pub use buffer::Buf;

mod config;
pub use config::{Config, ConfigBuilder};

mod error;
pub use error::TlshakeError;

pub mod crypto;
pub mod ext;
pub mod message;
