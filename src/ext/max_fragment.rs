//! MaxFragmentLength extension (RFC 6066 Section 4).
//!
//! A one-byte code negotiating a smaller maximum plaintext fragment. The
//! server echoes the requested code unchanged.

use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxFragmentLength {
    #[default]
    Len512 = 1,
    Len1024 = 2,
    Len2048 = 3,
    Len4096 = 4,
}

impl MaxFragmentLength {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MaxFragmentLength::Len512),
            2 => Some(MaxFragmentLength::Len1024),
            3 => Some(MaxFragmentLength::Len2048),
            4 => Some(MaxFragmentLength::Len4096),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// The negotiated fragment ceiling in bytes.
    pub fn fragment_len(&self) -> usize {
        512 << (self.as_u8() - 1)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], MaxFragmentLength> {
        let (input, value) = be_u8(input)?;
        match MaxFragmentLength::from_u8(value) {
            Some(code) => Ok((input, code)),
            None => Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Switch,
            ))),
        }
    }

    pub fn encoded_len(&self) -> usize {
        1
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.as_u8());
    }
}
