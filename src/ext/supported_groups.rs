//! SupportedGroups extension (RFC 8422 Section 5.1.1, RFC 7919).
//!
//! The client's named-group preference list. The key-share negotiator
//! cross-checks every offered key share against this list.

use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::message::NamedGroup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedGroupsExtension {
    pub groups: Vec<NamedGroup>,
}

impl SupportedGroupsExtension {
    pub fn new(groups: &[NamedGroup]) -> Self {
        SupportedGroupsExtension {
            groups: groups.to_vec(),
        }
    }

    pub fn contains(&self, group: NamedGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SupportedGroupsExtension> {
        let (mut input, list_len) = be_u16(input)?;
        let mut groups = Vec::new();
        let mut remaining = list_len as usize;

        // Parse groups; unknown ones are dropped from the working list.
        while remaining >= 2 {
            let (rest, group) = NamedGroup::parse(input)?;
            input = rest;
            remaining -= 2;
            if !matches!(group, NamedGroup::Unknown(_)) {
                groups.push(group);
            }
        }

        Ok((input, SupportedGroupsExtension { groups }))
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.groups.len() * 2
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&((self.groups.len() * 2) as u16).to_be_bytes());
        for group in &self.groups {
            output.extend_from_slice(&group.as_u16().to_be_bytes());
        }
    }
}

impl Default for SupportedGroupsExtension {
    fn default() -> Self {
        SupportedGroupsExtension::new(NamedGroup::all_supported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = &[
        0x00, 0x06, // list length
        0x00, 0x1D, // x25519
        0x00, 0x17, // secp256r1
        0x01, 0x00, // ffdhe2048
    ];

    #[test]
    fn roundtrip() {
        let ext = SupportedGroupsExtension::new(&[
            NamedGroup::X25519,
            NamedGroup::Secp256r1,
            NamedGroup::Ffdhe2048,
        ]);

        let mut serialized = Buf::new();
        ext.serialize(&mut serialized);
        assert_eq!(&*serialized, MESSAGE);
        assert_eq!(ext.encoded_len(), MESSAGE.len());

        let (rest, parsed) = SupportedGroupsExtension::parse(&serialized).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, ext);
    }

    #[test]
    fn unknown_groups_are_dropped() {
        let bytes = [0x00, 0x04, 0xAB, 0xCD, 0x00, 0x1D];
        let (_, parsed) = SupportedGroupsExtension::parse(&bytes).unwrap();
        assert_eq!(parsed.groups, vec![NamedGroup::X25519]);
    }
}
