//! PskKeyExchangeModes extension (RFC 8446 Section 4.2.9).
//!
//! A ClientHello offering pre_shared_key without this extension is
//! rejected by the registry.

use nom::number::complete::be_u8;
use nom::IResult;
use tinyvec::ArrayVec;

use crate::buffer::Buf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PskKeyExchangeMode {
    /// PSK-only key exchange.
    #[default]
    PskKe = 0,
    /// PSK with (EC)DHE key exchange.
    PskDheKe = 1,
}

impl PskKeyExchangeMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PskKeyExchangeMode::PskKe),
            1 => Some(PskKeyExchangeMode::PskDheKe),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskKeyExchangeModesExtension {
    pub modes: ArrayVec<[PskKeyExchangeMode; 4]>,
}

impl PskKeyExchangeModesExtension {
    pub fn new(modes: &[PskKeyExchangeMode]) -> Self {
        let mut list = ArrayVec::new();
        for mode in modes {
            let _ = list.try_push(*mode);
        }
        PskKeyExchangeModesExtension { modes: list }
    }

    pub fn supports(&self, mode: PskKeyExchangeMode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], PskKeyExchangeModesExtension> {
        let (mut input, list_len) = be_u8(input)?;
        let mut modes = ArrayVec::new();
        let mut remaining = list_len as usize;

        while remaining > 0 {
            let (rest, value) = be_u8(input)?;
            input = rest;
            remaining -= 1;
            // Unknown modes are ignored for forward compatibility.
            if let Some(mode) = PskKeyExchangeMode::from_u8(value) {
                let _ = modes.try_push(mode);
            }
        }

        Ok((input, PskKeyExchangeModesExtension { modes }))
    }

    pub fn encoded_len(&self) -> usize {
        1 + self.modes.len()
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.modes.len() as u8);
        for mode in &self.modes {
            output.push(mode.as_u8());
        }
    }
}

impl Default for PskKeyExchangeModesExtension {
    fn default() -> Self {
        PskKeyExchangeModesExtension::new(&[PskKeyExchangeMode::PskDheKe])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let ext = PskKeyExchangeModesExtension::new(&[
            PskKeyExchangeMode::PskDheKe,
            PskKeyExchangeMode::PskKe,
        ]);

        let mut buf = Buf::new();
        ext.serialize(&mut buf);
        assert_eq!(&*buf, &[0x02, 0x01, 0x00]);
        assert_eq!(ext.encoded_len(), 3);

        let (rest, parsed) = PskKeyExchangeModesExtension::parse(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, ext);
    }

    #[test]
    fn unknown_modes_are_ignored() {
        let bytes = [0x03, 0x01, 0x7F, 0x00];
        let (_, parsed) = PskKeyExchangeModesExtension::parse(&bytes).unwrap();
        assert_eq!(parsed.modes.len(), 2);
        assert!(parsed.supports(PskKeyExchangeMode::PskDheKe));
        assert!(parsed.supports(PskKeyExchangeMode::PskKe));
    }
}
