//! SignatureAlgorithms extension (RFC 5246 Section 7.4.1.4.1).

use nom::number::complete::be_u16;
use nom::IResult;
use tinyvec::ArrayVec;

use crate::buffer::Buf;
use crate::message::{HashAlgorithm, SignatureAlgorithm, SignatureAndHashAlgorithm};

/// Capacity of the working algorithm list. A peer may offer more pairs;
/// extras beyond this are ignored rather than rejected.
const MAX_ALGORITHMS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAlgorithmsExtension {
    pub algorithms: ArrayVec<[SignatureAndHashAlgorithm; MAX_ALGORITHMS]>,
}

impl SignatureAlgorithmsExtension {
    pub fn new(algorithms: ArrayVec<[SignatureAndHashAlgorithm; MAX_ALGORITHMS]>) -> Self {
        SignatureAlgorithmsExtension { algorithms }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SignatureAlgorithmsExtension> {
        let (mut input, list_len) = be_u16(input)?;
        let mut algorithms = ArrayVec::new();
        let mut remaining = list_len as usize;

        while remaining >= 2 {
            let (rest, alg) = SignatureAndHashAlgorithm::parse(input)?;
            input = rest;
            remaining -= 2;
            let _ = algorithms.try_push(alg);
        }

        Ok((input, SignatureAlgorithmsExtension { algorithms }))
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.algorithms.len() * 2
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&((self.algorithms.len() * 2) as u16).to_be_bytes());
        for alg in &self.algorithms {
            output.extend_from_slice(&alg.as_u16().to_be_bytes());
        }
    }
}

impl Default for SignatureAlgorithmsExtension {
    fn default() -> Self {
        let mut algorithms = ArrayVec::new();
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA256,
            SignatureAlgorithm::ECDSA,
        ));
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA384,
            SignatureAlgorithm::ECDSA,
        ));
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA256,
            SignatureAlgorithm::RSA,
        ));
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA384,
            SignatureAlgorithm::RSA,
        ));
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA512,
            SignatureAlgorithm::RSA,
        ));
        SignatureAlgorithmsExtension { algorithms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut algorithms = ArrayVec::new();
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA256,
            SignatureAlgorithm::ECDSA,
        ));
        algorithms.push(SignatureAndHashAlgorithm::new(
            HashAlgorithm::SHA256,
            SignatureAlgorithm::RSA,
        ));
        let ext = SignatureAlgorithmsExtension::new(algorithms);

        let mut serialized = Buf::new();
        ext.serialize(&mut serialized);

        let expected = [
            0x00, 0x04, // list length
            0x04, 0x03, // SHA256/ECDSA
            0x04, 0x01, // SHA256/RSA
        ];
        assert_eq!(&*serialized, &expected);
        assert_eq!(ext.encoded_len(), expected.len());

        let (rest, parsed) = SignatureAlgorithmsExtension::parse(&serialized).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, ext);
    }

    #[test]
    fn oversized_list_is_capped() {
        let mut wire = Buf::new();
        wire.extend_from_slice(&((MAX_ALGORITHMS as u16 + 4) * 2).to_be_bytes());
        for _ in 0..MAX_ALGORITHMS + 4 {
            wire.extend_from_slice(&[0x04, 0x03]);
        }

        let (rest, parsed) = SignatureAlgorithmsExtension::parse(&wire).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.algorithms.len(), MAX_ALGORITHMS);
    }
}
