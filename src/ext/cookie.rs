//! Cookie extension (RFC 8446 Section 4.2.2).
//!
//! The server sends a cookie in a HelloRetryRequest; the client echoes it
//! byte for byte in its retried ClientHello. The content is opaque to the
//! client. At most one cookie exists per registry; each retry replaces it
//! wholesale.

use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieExtension {
    pub cookie: Vec<u8>,
}

impl CookieExtension {
    pub fn new(cookie: Vec<u8>) -> Self {
        CookieExtension { cookie }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CookieExtension> {
        let (input, cookie_len) = be_u16(input)?;
        if cookie_len == 0 {
            // cookie<1..2^16-1>
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        }
        let (input, cookie) = take(cookie_len)(input)?;
        Ok((input, CookieExtension::new(cookie.to_vec())))
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.cookie.len()
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&(self.cookie.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.cookie);
    }
}
