use nom::number::complete::be_u16;
use nom::IResult;

/// Named groups for ephemeral key exchange (RFC 8422, RFC 7919).
///
/// Covers the elliptic-curve groups and the finite-field (FFDHE) range of
/// the IANA registry. The key-share negotiator supports P-256, P-384,
/// X25519, ffdhe2048 and ffdhe3072.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamedGroup {
    /// secp256r1 / NIST P-256.
    #[default]
    Secp256r1,
    /// secp384r1 / NIST P-384.
    Secp384r1,
    /// secp521r1 / NIST P-521.
    Secp521r1,
    /// X25519 (Curve25519).
    X25519,
    /// X448 (Curve448).
    X448,
    /// ffdhe2048 (RFC 7919).
    Ffdhe2048,
    /// ffdhe3072 (RFC 7919).
    Ffdhe3072,
    /// ffdhe4096 (RFC 7919).
    Ffdhe4096,
    /// ffdhe6144 (RFC 7919).
    Ffdhe6144,
    /// ffdhe8192 (RFC 7919).
    Ffdhe8192,
    /// Unknown or unsupported group.
    Unknown(u16),
}

impl NamedGroup {
    /// Convert a wire format u16 value to a `NamedGroup`.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0017 => NamedGroup::Secp256r1,
            0x0018 => NamedGroup::Secp384r1,
            0x0019 => NamedGroup::Secp521r1,
            0x001D => NamedGroup::X25519,
            0x001E => NamedGroup::X448,
            0x0100 => NamedGroup::Ffdhe2048,
            0x0101 => NamedGroup::Ffdhe3072,
            0x0102 => NamedGroup::Ffdhe4096,
            0x0103 => NamedGroup::Ffdhe6144,
            0x0104 => NamedGroup::Ffdhe8192,
            _ => NamedGroup::Unknown(value),
        }
    }

    /// Convert this `NamedGroup` to its wire format u16 value.
    pub fn as_u16(&self) -> u16 {
        match self {
            NamedGroup::Secp256r1 => 0x0017,
            NamedGroup::Secp384r1 => 0x0018,
            NamedGroup::Secp521r1 => 0x0019,
            NamedGroup::X25519 => 0x001D,
            NamedGroup::X448 => 0x001E,
            NamedGroup::Ffdhe2048 => 0x0100,
            NamedGroup::Ffdhe3072 => 0x0101,
            NamedGroup::Ffdhe4096 => 0x0102,
            NamedGroup::Ffdhe6144 => 0x0103,
            NamedGroup::Ffdhe8192 => 0x0104,
            NamedGroup::Unknown(value) => *value,
        }
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], NamedGroup> {
        let (input, value) = be_u16(input)?;
        Ok((input, NamedGroup::from_u16(value)))
    }

    /// True for the finite-field Diffie-Hellman range of the registry.
    pub fn is_ffdhe(&self) -> bool {
        matches!(
            self,
            NamedGroup::Ffdhe2048
                | NamedGroup::Ffdhe3072
                | NamedGroup::Ffdhe4096
                | NamedGroup::Ffdhe6144
                | NamedGroup::Ffdhe8192
        )
    }

    /// Returns true if this named group is supported by this implementation.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            NamedGroup::Secp256r1
                | NamedGroup::Secp384r1
                | NamedGroup::X25519
                | NamedGroup::Ffdhe2048
                | NamedGroup::Ffdhe3072
        )
    }

    /// All supported named groups in preference order.
    pub fn all_supported() -> &'static [NamedGroup] {
        &[
            NamedGroup::X25519,
            NamedGroup::Secp256r1,
            NamedGroup::Secp384r1,
            NamedGroup::Ffdhe2048,
            NamedGroup::Ffdhe3072,
        ]
    }
}
