//! The per-connection extension registry and its serialize/parse passes.
//!
//! Two registries take part in building a message: the connection-level
//! one and an optional context-level (default) one. The same [`Semaphore`]
//! is threaded through both so a type present at connection level shadows
//! the default and is emitted exactly once.
//!
//! Serialization is two-pass: a size pass over identically-initialized
//! state, then a write pass. Parsing iterates type-length-value records,
//! bounds-checks every length against the remaining input and dispatches
//! to the per-type codec with the exact body slice.

use log::{debug, trace, warn};

use super::key_share::KeyShareExtension;
use super::pre_shared_key::PreSharedKeyExtension;
use super::server_name::ServerNameExtension;
use super::supported_versions::SupportedVersionsExtension;
use super::{
    AlpnExtension, CookieExtension, Extension, ExtensionPayload, ExtensionType, MaxFragmentLength,
    PskKeyExchangeModesExtension, Semaphore, SignatureAlgorithmsExtension,
    SupportedGroupsExtension,
};
use crate::buffer::Buf;
use crate::error::TlshakeError;
use crate::message::{MessageType, ProtocolVersion};

/// Tolerances for the explicitly mismatch-tolerant negotiation modes.
/// Both default to strict.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsePolicy {
    pub alpn_continue_on_mismatch: bool,
    pub sni_continue_on_mismatch: bool,
}

/// An ordered set of extensions, unique by type.
///
/// One instance exists per connection; a second, read-only instance may be
/// shared from the configuration as the default set.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    entries: Vec<Extension>,
}

/// Which slice of the registry a size/write pass covers. pre_shared_key
/// must be the last extension of a ClientHello, so it gets its own pass
/// after every other type has been emitted from both registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    SkipPsk,
    OnlyPsk,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Linear scan by type. Registries are small.
    pub fn find(&self, ty: ExtensionType) -> Option<&Extension> {
        self.entries.iter().find(|e| e.extension_type == ty)
    }

    pub fn find_mut(&mut self, ty: ExtensionType) -> Option<&mut Extension> {
        self.entries.iter_mut().find(|e| e.extension_type == ty)
    }

    /// Insert at the head of the list. Any existing entry of the same
    /// type is unlinked and dropped, so at most one survives.
    pub fn push(&mut self, payload: ExtensionPayload) -> &mut Extension {
        let ty = payload.extension_type();
        self.entries.retain(|e| e.extension_type != ty);
        self.entries.insert(0, Extension::new(payload));
        &mut self.entries[0]
    }

    /// Insert an extension already marked for the next response.
    pub fn push_response(&mut self, payload: ExtensionPayload) {
        self.push(payload).response_pending = true;
    }

    /// Drop every extension, releasing payloads.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn size_pass(
        &self,
        semaphore: &mut Semaphore,
        msg: MessageType,
        response_only: bool,
        pass: Pass,
    ) -> usize {
        let mut total = 0;
        for ext in self.eligible(msg, response_only, pass) {
            if semaphore.is_marked(ext.extension_type) {
                continue;
            }
            total += 4 + ext.payload.encoded_len(msg);
            semaphore.mark(ext.extension_type);
        }
        total
    }

    fn write_pass(
        &self,
        semaphore: &mut Semaphore,
        msg: MessageType,
        response_only: bool,
        pass: Pass,
        output: &mut Buf,
    ) -> usize {
        let before = output.len();
        for ext in self.eligible(msg, response_only, pass) {
            if semaphore.is_marked(ext.extension_type) {
                continue;
            }
            output.extend_from_slice(&ext.extension_type.as_u16().to_be_bytes());
            output.extend_from_slice(&(ext.payload.encoded_len(msg) as u16).to_be_bytes());
            ext.payload.serialize(msg, output);
            semaphore.mark(ext.extension_type);
        }
        output.len() - before
    }

    /// The entries a pass may emit, in list order. The semaphore filter
    /// is applied by the passes themselves, which also mark what they
    /// emit.
    fn eligible<'a>(
        &'a self,
        msg: MessageType,
        response_only: bool,
        pass: Pass,
    ) -> impl Iterator<Item = &'a Extension> {
        self.entries.iter().filter(move |ext| {
            let is_psk = ext.extension_type == ExtensionType::PreSharedKey;
            match pass {
                Pass::SkipPsk if is_psk => return false,
                Pass::OnlyPsk if !is_psk => return false,
                _ => {}
            }
            if !allowed(ext.extension_type, msg) {
                return false;
            }
            if response_only && !ext.response_pending {
                return false;
            }
            true
        })
    }

    /// Clear the response markers of everything just answered in `msg`.
    ///
    /// A cookie written into a HelloRetryRequest stays pending: its marker
    /// means "echo outstanding" and is only cleared once the retried
    /// ClientHello repeats the exact bytes.
    fn clear_pending(&mut self, msg: MessageType) {
        for ext in &mut self.entries {
            if ext.extension_type == ExtensionType::Cookie && msg == MessageType::HelloRetryRequest
            {
                continue;
            }
            if ext.response_pending && allowed(ext.extension_type, msg) {
                ext.response_pending = false;
            }
        }
    }

    /// Parse a sequence of extension TLV records from `msg`.
    ///
    /// Stops at the first error; no later extension is processed. Unknown
    /// and unimplemented types are skipped for forward compatibility.
    pub fn parse(
        &mut self,
        input: &[u8],
        msg: MessageType,
        version: ProtocolVersion,
        policy: ParsePolicy,
    ) -> Result<(), TlshakeError> {
        let mut rest = input;
        let mut seen_psk = false;

        while !rest.is_empty() {
            if rest.len() < 4 {
                return Err(TlshakeError::BufferError);
            }
            let ty = ExtensionType::from_u16(u16::from_be_bytes([rest[0], rest[1]]));
            let len = u16::from_be_bytes([rest[2], rest[3]]) as usize;
            let after_header = &rest[4..];

            // The primary defense against malformed input: a record may
            // never claim more bytes than remain.
            if len > after_header.len() {
                return Err(TlshakeError::BufferError);
            }
            let body = &after_header[..len];
            rest = &after_header[len..];

            if seen_psk {
                // pre_shared_key must be the last extension.
                return Err(TlshakeError::PskKeyError);
            }

            trace!("extension {:?} ({} bytes) in {:?}", ty, len, msg);

            if !self.is_implemented(ty) {
                trace!("skipping unhandled extension {:?}", ty);
                continue;
            }
            if !allowed(ty, msg) {
                return Err(TlshakeError::ExtensionNotAllowed(ty, msg));
            }
            if requires_tls13(ty) && version != ProtocolVersion::TLS1_3 {
                return Err(TlshakeError::ExtensionNotAllowed(ty, msg));
            }

            self.parse_one(ty, body, msg, policy)?;

            if ty == ExtensionType::PreSharedKey && msg == MessageType::ClientHello {
                seen_psk = true;
            }
        }

        Ok(())
    }

    fn is_implemented(&self, ty: ExtensionType) -> bool {
        matches!(
            ty,
            ExtensionType::ServerName
                | ExtensionType::MaxFragmentLength
                | ExtensionType::SupportedGroups
                | ExtensionType::SignatureAlgorithms
                | ExtensionType::ApplicationLayerProtocolNegotiation
                | ExtensionType::ExtendedMasterSecret
                | ExtensionType::SupportedVersions
                | ExtensionType::Cookie
                | ExtensionType::PskKeyExchangeModes
                | ExtensionType::KeyShare
                | ExtensionType::PreSharedKey
        )
    }

    fn parse_one(
        &mut self,
        ty: ExtensionType,
        body: &[u8],
        msg: MessageType,
        policy: ParsePolicy,
    ) -> Result<(), TlshakeError> {
        match ty {
            ExtensionType::ServerName => self.parse_server_name(body, msg),
            ExtensionType::MaxFragmentLength => self.parse_max_fragment(body, msg),
            ExtensionType::SupportedGroups => {
                let ext = complete(SupportedGroupsExtension::parse(body), ty)?;
                self.push(ExtensionPayload::SupportedGroups(ext));
                Ok(())
            }
            ExtensionType::SignatureAlgorithms => {
                let ext = complete(SignatureAlgorithmsExtension::parse(body), ty)?;
                self.push(ExtensionPayload::SignatureAlgorithms(ext));
                Ok(())
            }
            ExtensionType::ApplicationLayerProtocolNegotiation => {
                self.parse_alpn(body, msg, policy)
            }
            ExtensionType::ExtendedMasterSecret => {
                if !body.is_empty() {
                    return Err(TlshakeError::InvalidExtensionData(ty));
                }
                self.push(ExtensionPayload::ExtendedMasterSecret);
                Ok(())
            }
            ExtensionType::SupportedVersions => {
                let ext = complete(SupportedVersionsExtension::parse(body, msg), ty)?;
                self.push(ExtensionPayload::SupportedVersions(ext));
                Ok(())
            }
            ExtensionType::Cookie => self.parse_cookie(body, msg),
            ExtensionType::PskKeyExchangeModes => {
                let ext = complete(PskKeyExchangeModesExtension::parse(body), ty)?;
                self.push(ExtensionPayload::PskKeyExchangeModes(ext));
                Ok(())
            }
            ExtensionType::KeyShare => self.parse_key_share(body, msg),
            ExtensionType::PreSharedKey => self.parse_pre_shared_key(body, msg),
            _ => Ok(()),
        }
    }

    fn parse_server_name(&mut self, body: &[u8], msg: MessageType) -> Result<(), TlshakeError> {
        if msg == MessageType::ClientHello {
            let ext = complete(
                ServerNameExtension::parse(body),
                ExtensionType::ServerName,
            )?;
            self.push(ExtensionPayload::ServerName(ext)).response_pending = true;
            return Ok(());
        }

        // The response is an empty acknowledgment of a name we must have
        // requested ourselves.
        if !body.is_empty() {
            return Err(TlshakeError::InvalidExtensionData(ExtensionType::ServerName));
        }
        if self.find(ExtensionType::ServerName).is_none() {
            return Err(TlshakeError::ExtensionNotAllowed(
                ExtensionType::ServerName,
                msg,
            ));
        }
        Ok(())
    }

    fn parse_max_fragment(&mut self, body: &[u8], msg: MessageType) -> Result<(), TlshakeError> {
        let ty = ExtensionType::MaxFragmentLength;
        let code = complete(MaxFragmentLength::parse(body), ty)?;

        if msg == MessageType::ClientHello {
            self.push(ExtensionPayload::MaxFragmentLength(code))
                .response_pending = true;
            return Ok(());
        }

        // The echo must repeat our requested code exactly.
        match self.find(ty) {
            Some(Extension {
                payload: ExtensionPayload::MaxFragmentLength(ours),
                ..
            }) if *ours == code => Ok(()),
            Some(_) => Err(TlshakeError::InvalidExtensionData(ty)),
            None => Err(TlshakeError::ExtensionNotAllowed(ty, msg)),
        }
    }

    fn parse_alpn(
        &mut self,
        body: &[u8],
        msg: MessageType,
        policy: ParsePolicy,
    ) -> Result<(), TlshakeError> {
        let ty = ExtensionType::ApplicationLayerProtocolNegotiation;
        let ext = complete(AlpnExtension::parse(body), ty)?;

        if msg == MessageType::ClientHello {
            self.push(ExtensionPayload::Alpn(ext)).response_pending = true;
            return Ok(());
        }

        // The response names exactly one protocol, which must be one we
        // offered.
        if ext.protocols.len() != 1 {
            return Err(TlshakeError::InvalidExtensionData(ty));
        }
        let Some(Extension {
            payload: ExtensionPayload::Alpn(ours),
            ..
        }) = self.find_mut(ty)
        else {
            return Err(TlshakeError::ExtensionNotAllowed(ty, msg));
        };

        match ours.accept(&ext.protocols[0]) {
            Err(TlshakeError::AlpnMismatch) if policy.alpn_continue_on_mismatch => {
                warn!("ALPN mismatch tolerated by configuration");
                Ok(())
            }
            other => other,
        }
    }

    fn parse_cookie(&mut self, body: &[u8], msg: MessageType) -> Result<(), TlshakeError> {
        let ext = complete(CookieExtension::parse(body), ExtensionType::Cookie)?;

        if msg == MessageType::ClientHello {
            // If we issued a cookie in a HelloRetryRequest, this must be
            // its byte-exact echo.
            if let Some(existing) = self.find_mut(ExtensionType::Cookie) {
                if existing.response_pending {
                    let ExtensionPayload::Cookie(ours) = &existing.payload else {
                        return Err(TlshakeError::InvalidExtensionData(ExtensionType::Cookie));
                    };
                    if ours.cookie != ext.cookie {
                        return Err(TlshakeError::CookieMismatch);
                    }
                    existing.response_pending = false;
                    debug!("cookie echo verified");
                    return Ok(());
                }
            }
        }

        // HelloRetryRequest (client side): keep the cookie so the retried
        // ClientHello embeds it. Each round trip replaces it wholesale.
        self.push(ExtensionPayload::Cookie(ext));
        Ok(())
    }

    fn parse_key_share(&mut self, body: &[u8], msg: MessageType) -> Result<(), TlshakeError> {
        let ty = ExtensionType::KeyShare;
        let ext = complete(KeyShareExtension::parse(body, msg), ty)?;

        match ext {
            KeyShareExtension::ClientHello(_) | KeyShareExtension::HelloRetryRequest(_) => {
                // Offers are stored as-is; after a retry request the
                // caller regenerates its entries for the named group.
                self.push(ExtensionPayload::KeyShare(ext));
                Ok(())
            }
            KeyShareExtension::ServerHello(sh) => {
                let Some(Extension {
                    payload: ExtensionPayload::KeyShare(KeyShareExtension::ClientHello(ours)),
                    ..
                }) = self.find_mut(ty)
                else {
                    return Err(TlshakeError::ExtensionNotAllowed(ty, msg));
                };
                // The server must pick a group we offered a share for.
                if ours.find(sh.entry.group).is_none() {
                    return Err(TlshakeError::BadKeyShareData);
                }
                ours.peer = Some(sh.entry);
                Ok(())
            }
        }
    }

    fn parse_pre_shared_key(&mut self, body: &[u8], msg: MessageType) -> Result<(), TlshakeError> {
        let ty = ExtensionType::PreSharedKey;
        let ext = match PreSharedKeyExtension::parse(body, msg) {
            Ok((rest, ext)) if rest.is_empty() => ext,
            Ok(_) => return Err(TlshakeError::InvalidExtensionData(ty)),
            // Binder bounds violations surface as parse failures.
            Err(nom::Err::Failure(_)) => return Err(TlshakeError::PskKeyError),
            Err(_) => return Err(TlshakeError::BufferError),
        };

        if msg == MessageType::ClientHello {
            // A PSK offer is only acceptable alongside its key-exchange
            // modes.
            if self.find(ExtensionType::PskKeyExchangeModes).is_none() {
                return Err(TlshakeError::PskKeyError);
            }
            self.push(ExtensionPayload::PreSharedKey(ext)).response_pending = true;
            return Ok(());
        }

        // Server answer: the index must land inside our offer list.
        let index = ext.selected_identity.ok_or(TlshakeError::PskKeyError)?;
        let Some(Extension {
            payload: ExtensionPayload::PreSharedKey(ours),
            ..
        }) = self.find_mut(ty)
        else {
            return Err(TlshakeError::ExtensionNotAllowed(ty, msg));
        };
        ours.accept(index)
    }
}

/// Compute the byte size of a request's extension block (ClientHello or
/// CertificateRequest), consulting the connection registry first and the
/// defaults second under one shared semaphore.
pub fn request_size(
    conn: &ExtensionRegistry,
    defaults: Option<&ExtensionRegistry>,
    msg: MessageType,
) -> usize {
    debug_assert!(msg.is_request());
    two_level_size(conn, defaults, msg, false)
}

/// Write a request's extension block. Must be preceded by a
/// [`request_size`] call; the passes walk identically-initialized state.
pub fn write_request(
    conn: &ExtensionRegistry,
    defaults: Option<&ExtensionRegistry>,
    msg: MessageType,
    output: &mut Buf,
) -> usize {
    debug_assert!(msg.is_request());
    two_level_write(conn, defaults, msg, false, output)
}

/// Compute the byte size of a response's extension block (ServerHello,
/// HelloRetryRequest, EncryptedExtensions, NewSessionTicket). Only
/// extensions marked response-pending are counted.
pub fn response_size(
    conn: &ExtensionRegistry,
    defaults: Option<&ExtensionRegistry>,
    msg: MessageType,
) -> usize {
    debug_assert!(!msg.is_request());
    two_level_size(conn, defaults, msg, true)
}

/// Write a response's extension block and clear the response markers of
/// everything written.
pub fn write_response(
    conn: &mut ExtensionRegistry,
    defaults: Option<&ExtensionRegistry>,
    msg: MessageType,
    output: &mut Buf,
) -> usize {
    debug_assert!(!msg.is_request());
    let written = two_level_write(conn, defaults, msg, true, output);
    conn.clear_pending(msg);
    written
}

fn two_level_size(
    conn: &ExtensionRegistry,
    defaults: Option<&ExtensionRegistry>,
    msg: MessageType,
    response_only: bool,
) -> usize {
    let mut semaphore = Semaphore::new();
    let mut total = 0;
    for pass in [Pass::SkipPsk, Pass::OnlyPsk] {
        total += conn.size_pass(&mut semaphore, msg, response_only, pass);
        if let Some(defaults) = defaults {
            total += defaults.size_pass(&mut semaphore, msg, response_only, pass);
        }
    }
    total
}

fn two_level_write(
    conn: &ExtensionRegistry,
    defaults: Option<&ExtensionRegistry>,
    msg: MessageType,
    response_only: bool,
    output: &mut Buf,
) -> usize {
    let mut semaphore = Semaphore::new();
    let mut written = 0;
    for pass in [Pass::SkipPsk, Pass::OnlyPsk] {
        written += conn.write_pass(&mut semaphore, msg, response_only, pass, output);
        if let Some(defaults) = defaults {
            written += defaults.write_pass(&mut semaphore, msg, response_only, pass, output);
        }
    }
    written
}

/// Message-type legality per extension type.
fn allowed(ty: ExtensionType, msg: MessageType) -> bool {
    use MessageType::*;
    match ty {
        ExtensionType::ServerName => {
            matches!(msg, ClientHello | ServerHello | EncryptedExtensions)
        }
        ExtensionType::MaxFragmentLength => {
            matches!(msg, ClientHello | ServerHello | EncryptedExtensions)
        }
        ExtensionType::SupportedGroups => matches!(msg, ClientHello | EncryptedExtensions),
        ExtensionType::SignatureAlgorithms => matches!(msg, ClientHello | CertificateRequest),
        ExtensionType::ApplicationLayerProtocolNegotiation => {
            matches!(msg, ClientHello | ServerHello | EncryptedExtensions)
        }
        ExtensionType::ExtendedMasterSecret => matches!(msg, ClientHello | ServerHello),
        ExtensionType::SupportedVersions => {
            matches!(msg, ClientHello | ServerHello | HelloRetryRequest)
        }
        ExtensionType::Cookie => matches!(msg, ClientHello | HelloRetryRequest),
        ExtensionType::PskKeyExchangeModes => matches!(msg, ClientHello),
        ExtensionType::KeyShare => matches!(msg, ClientHello | ServerHello | HelloRetryRequest),
        ExtensionType::PreSharedKey => matches!(msg, ClientHello | ServerHello),
        _ => false,
    }
}

/// Types that only exist in the TLS 1.3 handshake.
fn requires_tls13(ty: ExtensionType) -> bool {
    matches!(
        ty,
        ExtensionType::SupportedVersions
            | ExtensionType::Cookie
            | ExtensionType::PskKeyExchangeModes
            | ExtensionType::KeyShare
            | ExtensionType::PreSharedKey
            | ExtensionType::EarlyData
    )
}

fn complete<T>(
    result: nom::IResult<&[u8], T>,
    ty: ExtensionType,
) -> Result<T, TlshakeError> {
    match result {
        Ok((rest, value)) if rest.is_empty() => Ok(value),
        Ok(_) => Err(TlshakeError::InvalidExtensionData(ty)),
        Err(_) => Err(TlshakeError::BufferError),
    }
}
