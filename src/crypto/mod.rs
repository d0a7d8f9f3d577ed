//! Cryptographic orchestration: the TLS PRF, secret derivation and
//! ephemeral key agreement.
//!
//! Hash/HMAC and curve math come from the underlying crates; this module
//! only combines them the way the TLS key schedule prescribes.

mod ffdhe;
mod key_exchange;
mod prf;
mod secrets;

pub use key_exchange::KeyExchange;
pub use prf::{p_hash, prf, MAX_PRF_OUTPUT};
pub use secrets::{
    derive_keys, finished_verify_data, make_extended_master_secret, make_master_secret,
    make_session_master_secret, KeyMaterial, KeySizes, Secret, Sender, MASTER_SECRET_LEN,
    VERIFY_DATA_LEN,
};
