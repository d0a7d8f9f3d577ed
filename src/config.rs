use std::sync::Arc;

use crate::ext::{ExtensionRegistry, ParsePolicy};
use crate::message::NamedGroup;

/// Handshake configuration.
///
/// Holds the context-level default extension registry and the negotiation
/// policy knobs. The default registry is shared read-only across every
/// connection spawned from this configuration; it must be fully built
/// before the first connection parses and never mutated afterwards.
#[derive(Clone)]
pub struct Config {
    default_extensions: Arc<ExtensionRegistry>,
    supported_groups: Vec<NamedGroup>,
    with_extended_master_secret: bool,
    alpn_continue_on_mismatch: bool,
    sni_continue_on_mismatch: bool,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            default_extensions: ExtensionRegistry::new(),
            supported_groups: NamedGroup::all_supported().to_vec(),
            with_extended_master_secret: true,
            alpn_continue_on_mismatch: false,
            sni_continue_on_mismatch: false,
        }
    }

    /// The shared context-level registry, consulted for extension types
    /// absent at connection level.
    #[inline(always)]
    pub fn default_extensions(&self) -> &ExtensionRegistry {
        &self.default_extensions
    }

    /// Named groups we are willing to negotiate, in preference order.
    #[inline(always)]
    pub fn supported_groups(&self) -> &[NamedGroup] {
        &self.supported_groups
    }

    /// Whether to require the extended master secret derivation when the
    /// peer offers it.
    #[inline(always)]
    pub fn with_extended_master_secret(&self) -> bool {
        self.with_extended_master_secret
    }

    /// The mismatch tolerances handed to the registry's parse.
    #[inline(always)]
    pub fn parse_policy(&self) -> ParsePolicy {
        ParsePolicy {
            alpn_continue_on_mismatch: self.alpn_continue_on_mismatch,
            sni_continue_on_mismatch: self.sni_continue_on_mismatch,
        }
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    default_extensions: ExtensionRegistry,
    supported_groups: Vec<NamedGroup>,
    with_extended_master_secret: bool,
    alpn_continue_on_mismatch: bool,
    sni_continue_on_mismatch: bool,
}

impl ConfigBuilder {
    /// Populate the context-level default registry.
    pub fn default_extensions(mut self, registry: ExtensionRegistry) -> Self {
        self.default_extensions = registry;
        self
    }

    /// Set the named-group preference list.
    pub fn supported_groups(mut self, groups: Vec<NamedGroup>) -> Self {
        self.supported_groups = groups;
        self
    }

    /// Enable or disable extended-master-secret derivation.
    pub fn with_extended_master_secret(mut self, enabled: bool) -> Self {
        self.with_extended_master_secret = enabled;
        self
    }

    /// Continue the handshake when ALPN yields no common protocol.
    /// Default off: a mismatch is fatal.
    pub fn alpn_continue_on_mismatch(mut self, enabled: bool) -> Self {
        self.alpn_continue_on_mismatch = enabled;
        self
    }

    /// Continue the handshake when the requested server name does not
    /// match. Default off: a mismatch is fatal.
    pub fn sni_continue_on_mismatch(mut self, enabled: bool) -> Self {
        self.sni_continue_on_mismatch = enabled;
        self
    }

    pub fn build(self) -> Config {
        Config {
            default_extensions: Arc::new(self.default_extensions),
            supported_groups: self.supported_groups,
            with_extended_master_secret: self.with_extended_master_secret,
            alpn_continue_on_mismatch: self.alpn_continue_on_mismatch,
            sni_continue_on_mismatch: self.sni_continue_on_mismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::{ExtensionPayload, ExtensionType, SupportedGroupsExtension};

    #[test]
    fn defaults() {
        let config = Config::builder().build();
        assert!(config.with_extended_master_secret());
        assert!(!config.parse_policy().alpn_continue_on_mismatch);
        assert!(!config.parse_policy().sni_continue_on_mismatch);
        assert!(config.default_extensions().is_empty());
        assert_eq!(config.supported_groups(), NamedGroup::all_supported());
    }

    #[test]
    fn default_registry_is_shared() {
        let mut registry = ExtensionRegistry::new();
        registry.push(ExtensionPayload::SupportedGroups(
            SupportedGroupsExtension::default(),
        ));

        let config = Config::builder().default_extensions(registry).build();
        let clone = config.clone();

        assert!(clone
            .default_extensions()
            .find(ExtensionType::SupportedGroups)
            .is_some());
    }
}
