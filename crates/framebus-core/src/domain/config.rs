//! Bus configuration.
//!
//! [`BusConfig`] captures the policy a bus starts with: which origin it
//! considers its own, which senders it trusts, and which namespaces it
//! listens on from the start.  Keeping it a plain struct (no file reads, no
//! environment lookups) lets tests build a bus from literals; the
//! infrastructure layer loads it from TOML.
//!
//! ```toml
//! self_origin = "https://www.example.com"
//! allowed_origins = ["ads.example.com", "https://tags.example.net"]
//! namespaces = ["dfp", "gtm"]
//! ```
//!
//! Every field has a serde default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};

use super::origin::{NULL_ORIGIN, WILDCARD_ORIGIN};

/// Startup policy for a [`crate::MessageBus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// The origin of the context the bus runs in.  Messages from this origin
    /// are always trusted.
    #[serde(default = "default_self_origin")]
    pub self_origin: String,

    /// Trusted sender origins, applied in order with `add_origin` semantics.
    /// An empty list trusts nobody but the bus's own origin and `"null"`.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Namespaces to listen on immediately.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

fn default_self_origin() -> String {
    NULL_ORIGIN.to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![WILDCARD_ORIGIN.to_string()]
}

impl Default for BusConfig {
    /// | Field           | Default    |
    /// |-----------------|------------|
    /// | self_origin     | `"null"`   |
    /// | allowed_origins | `["*"]`    |
    /// | namespaces      | `[]`       |
    fn default() -> Self {
        Self {
            self_origin: default_self_origin(),
            allowed_origins: default_allowed_origins(),
            namespaces: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_trusts_any_origin() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_default_self_origin_is_null() {
        assert_eq!(BusConfig::default().self_origin, "null");
    }

    #[test]
    fn test_default_listens_on_nothing() {
        assert!(BusConfig::default().namespaces.is_empty());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        // Arrange / Act
        let cfg: BusConfig = toml::from_str("").unwrap();

        // Assert
        assert_eq!(cfg, BusConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        // Arrange
        let text = r#"
self_origin = "https://www.example.com"
namespaces = ["dfp"]
"#;

        // Act
        let cfg: BusConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.self_origin, "https://www.example.com");
        assert_eq!(cfg.namespaces, vec!["dfp".to_string()]);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_explicit_empty_allow_list_is_kept() {
        let cfg: BusConfig = toml::from_str("allowed_origins = []").unwrap();
        assert!(cfg.allowed_origins.is_empty());
    }
}
