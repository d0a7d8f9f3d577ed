//! ServerName (SNI) extension (RFC 6066 Section 3).
//!
//! The request form carries a server_name_list with a single host_name
//! entry. The response form is an empty body acknowledging the name; the
//! actual name is never echoed back.

use log::warn;
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::buffer::Buf;
use crate::error::TlshakeError;
use crate::message::MessageType;

const HOST_NAME_TYPE: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNameExtension {
    pub host_name: String,
}

impl ServerNameExtension {
    pub fn new(host_name: impl Into<String>) -> Self {
        ServerNameExtension {
            host_name: host_name.into(),
        }
    }

    /// Parse the request form (ClientHello body).
    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerNameExtension> {
        let (input, list_len) = be_u16(input)?;
        let (input, list) = take(list_len)(input)?;

        let (list, name_type) = be_u8(list)?;
        if name_type != HOST_NAME_TYPE {
            return Err(nom::Err::Error(nom::error::Error::new(
                list,
                nom::error::ErrorKind::Switch,
            )));
        }
        let (list, name_len) = be_u16(list)?;
        let (_, name) = take(name_len)(list)?;

        let Ok(host_name) = std::str::from_utf8(name) else {
            return Err(nom::Err::Error(nom::error::Error::new(
                list,
                nom::error::ErrorKind::Char,
            )));
        };

        Ok((input, ServerNameExtension::new(host_name)))
    }

    pub fn encoded_len(&self, msg: MessageType) -> usize {
        match msg {
            // list length (2) + name type (1) + name length (2) + name
            MessageType::ClientHello => 5 + self.host_name.len(),
            // Responses acknowledge with an empty body.
            _ => 0,
        }
    }

    pub fn serialize(&self, msg: MessageType, output: &mut Buf) {
        if msg != MessageType::ClientHello {
            return;
        }
        let name = self.host_name.as_bytes();
        output.extend_from_slice(&((name.len() + 3) as u16).to_be_bytes());
        output.push(HOST_NAME_TYPE);
        output.extend_from_slice(&(name.len() as u16).to_be_bytes());
        output.extend_from_slice(name);
    }

    /// Case-insensitive comparison per DNS name matching rules.
    pub fn matches(&self, other: &str) -> bool {
        self.host_name.eq_ignore_ascii_case(other)
    }
}

/// Server-side name check.
///
/// Returns whether the requested name matched. A mismatch is fatal unless
/// the configuration tolerates it, in which case the handshake continues
/// without a name match.
pub fn negotiate(
    requested: &ServerNameExtension,
    expected: &str,
    continue_on_mismatch: bool,
) -> Result<bool, TlshakeError> {
    if requested.matches(expected) {
        return Ok(true);
    }
    if continue_on_mismatch {
        warn!(
            "SNI mismatch tolerated by configuration: requested {:?}",
            requested.host_name
        );
        return Ok(false);
    }
    Err(TlshakeError::InvalidExtensionData(
        crate::ext::ExtensionType::ServerName,
    ))
}
