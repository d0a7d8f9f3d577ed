//! Application-Layer Protocol Negotiation extension (RFC 7301).

use log::{debug, warn};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::buffer::Buf;
use crate::error::TlshakeError;
use crate::message::MessageType;

/// ALPN protocol name list.
///
/// In a ClientHello the whole list is offered. In the response the server
/// names exactly one protocol; `selected` records which offered entry that
/// was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlpnExtension {
    pub protocols: Vec<Vec<u8>>,
    pub selected: Option<usize>,
}

impl AlpnExtension {
    pub fn new<I, P>(protocols: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        AlpnExtension {
            protocols: protocols.into_iter().map(|p| p.as_ref().to_vec()).collect(),
            selected: None,
        }
    }

    /// Parse a protocol name list. Both the offer and the response use the
    /// same wire shape; a response carries exactly one name.
    pub fn parse(input: &[u8]) -> IResult<&[u8], AlpnExtension> {
        let (input, list_len) = be_u16(input)?;
        let (input, mut list) = take(list_len)(input)?;

        let mut protocols = Vec::new();
        while !list.is_empty() {
            let (rest, name_len) = be_u8(list)?;
            if name_len == 0 {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            let (rest, name) = take(name_len)(rest)?;
            protocols.push(name.to_vec());
            list = rest;
        }

        Ok((
            input,
            AlpnExtension {
                protocols,
                selected: None,
            },
        ))
    }

    pub fn encoded_len(&self, msg: MessageType) -> usize {
        if msg == MessageType::ClientHello {
            2 + self.protocols.iter().map(|p| 1 + p.len()).sum::<usize>()
        } else {
            match self.selected_protocol() {
                Some(name) => 2 + 1 + name.len(),
                None => 0,
            }
        }
    }

    pub fn serialize(&self, msg: MessageType, output: &mut Buf) {
        if msg == MessageType::ClientHello {
            let list_len: usize = self.protocols.iter().map(|p| 1 + p.len()).sum();
            output.extend_from_slice(&(list_len as u16).to_be_bytes());
            for name in &self.protocols {
                output.push(name.len() as u8);
                output.extend_from_slice(name);
            }
        } else if let Some(name) = self.selected_protocol() {
            output.extend_from_slice(&((name.len() + 1) as u16).to_be_bytes());
            output.push(name.len() as u8);
            output.extend_from_slice(name);
        }
    }

    /// The protocol the server picked, if negotiation has happened.
    pub fn selected_protocol(&self) -> Option<&[u8]> {
        self.selected.map(|i| self.protocols[i].as_slice())
    }

    /// Server-side selection: pick the first protocol from the client's
    /// preference order that we also support.
    pub fn select(
        &mut self,
        supported: &[&[u8]],
        continue_on_mismatch: bool,
    ) -> Result<Option<&[u8]>, TlshakeError> {
        let found = self
            .protocols
            .iter()
            .position(|p| supported.iter().any(|s| *s == &p[..]));

        match found {
            Some(index) => {
                self.selected = Some(index);
                debug!(
                    "ALPN selected {:?}",
                    String::from_utf8_lossy(&self.protocols[index])
                );
                Ok(self.selected_protocol())
            }
            None if continue_on_mismatch => {
                warn!("ALPN mismatch tolerated by configuration");
                self.selected = None;
                Ok(None)
            }
            None => Err(TlshakeError::AlpnMismatch),
        }
    }

    /// Client-side acceptance of the server's choice. The chosen name must
    /// be one we offered.
    pub fn accept(&mut self, chosen: &[u8]) -> Result<(), TlshakeError> {
        match self.protocols.iter().position(|p| &p[..] == chosen) {
            Some(index) => {
                self.selected = Some(index);
                Ok(())
            }
            None => Err(TlshakeError::AlpnMismatch),
        }
    }
}
