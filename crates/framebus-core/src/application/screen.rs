//! Screening: the three gates every inbound string must pass.
//!
//! The channel is shared with every other script that posts to the same
//! context, so most of what arrives is noise.  Screening turns one raw
//! notification into either an [`Admitted`] envelope or a [`Rejection`]
//! naming the first gate that failed:
//!
//! ```text
//! raw (origin, string)
//!   │ 1. origin is self, "null", or allow-listed   ── else Rejection::Origin
//!   │ 2. string parses as an Envelope              ── else Rejection::Malformed
//!   │ 3. type ends in an accepted namespace        ── else Rejection::Namespace
//!   ▼
//! Admitted { envelope, namespace }
//! ```
//!
//! Screening is pure: it reads the policy and never calls into the channel
//! or the event sink, so the bus can run it under its state lock and the
//! diagnostic CLI can run it without side effects.

use std::fmt;

use crate::domain::namespace::NamespaceSet;
use crate::domain::origin::{OriginAllowList, NULL_ORIGIN};
use crate::protocol::envelope::{decode_envelope, Envelope};

/// Why an inbound message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The sender's origin is not trusted.
    Origin,
    /// The payload is not a valid envelope.
    Malformed,
    /// The envelope's type is not in an accepted namespace.
    Namespace,
    /// The bus is not attached to its channel, so nothing is delivered.
    /// Reported by `MessageBus::inspect`; `screen` never returns it.
    NotListening,
}

impl Rejection {
    /// Short lower-case label, used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::Origin => "origin",
            Rejection::Malformed => "malformed",
            Rejection::Namespace => "namespace",
            Rejection::NotListening => "not-listening",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound message that passed every gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    /// The decoded envelope.
    pub envelope: Envelope,
    /// The accepted namespace the envelope's type ends in.
    pub namespace: String,
}

/// The policy screening reads: who the bus is and what it accepts.
#[derive(Debug, Clone, Copy)]
pub struct ScreenPolicy<'a> {
    pub self_origin: &'a str,
    pub origins: &'a OriginAllowList,
    pub namespaces: &'a NamespaceSet,
}

impl ScreenPolicy<'_> {
    /// Gate 1 on its own.
    pub fn trusts(&self, origin: &str) -> bool {
        origin == self.self_origin || origin == NULL_ORIGIN || self.origins.matches(origin)
    }

    /// Runs all three gates in order.
    pub fn screen(&self, origin: &str, raw: &str) -> Result<Admitted, Rejection> {
        if !self.trusts(origin) {
            return Err(Rejection::Origin);
        }

        let envelope = decode_envelope(raw).map_err(|_| Rejection::Malformed)?;

        let namespace = self
            .namespaces
            .resolve(&envelope.kind)
            .ok_or(Rejection::Namespace)?
            .to_string();

        Ok(Admitted {
            envelope,
            namespace,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SELF: &str = "https://www.example.com";

    fn dfp_namespaces() -> NamespaceSet {
        let mut set = NamespaceSet::new();
        set.insert("dfp");
        set
    }

    #[test]
    fn test_allow_listed_origin_is_admitted() {
        // Arrange
        let origins = OriginAllowList::from_origins(["ads.example"]);
        let namespaces = dfp_namespaces();
        let policy = ScreenPolicy { self_origin: SELF, origins: &origins, namespaces: &namespaces };

        // Act
        let admitted = policy
            .screen("https://ads.example", r#"{"type":"init.dfp","data":{"a":1}}"#)
            .unwrap();

        // Assert
        assert_eq!(admitted.envelope.kind, "init.dfp");
        assert_eq!(admitted.envelope.data, json!({"a": 1}));
        assert_eq!(admitted.namespace, "dfp");
    }

    #[test]
    fn test_foreign_origin_is_rejected_before_parsing() {
        // Arrange: an empty allow-list and a payload that is not even JSON
        let origins = OriginAllowList::empty();
        let namespaces = dfp_namespaces();
        let policy = ScreenPolicy { self_origin: SELF, origins: &origins, namespaces: &namespaces };

        // Act
        let verdict = policy.screen("https://evil.example", "not json");

        // Assert: the origin gate fires first
        assert_eq!(verdict, Err(Rejection::Origin));
    }

    #[test]
    fn test_self_origin_and_null_origin_bypass_allow_list() {
        let origins = OriginAllowList::empty();
        let namespaces = dfp_namespaces();
        let policy = ScreenPolicy { self_origin: SELF, origins: &origins, namespaces: &namespaces };
        let raw = r#"{"type":"init.dfp"}"#;

        assert!(policy.screen(SELF, raw).is_ok());
        assert!(policy.screen(NULL_ORIGIN, raw).is_ok());
    }

    #[test]
    fn test_self_origin_comparison_is_exact() {
        let origins = OriginAllowList::empty();
        let namespaces = dfp_namespaces();
        let policy = ScreenPolicy { self_origin: SELF, origins: &origins, namespaces: &namespaces };
        assert!(!policy.trusts("https://WWW.example.com/"));
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let origins = OriginAllowList::new();
        let namespaces = dfp_namespaces();
        let policy = ScreenPolicy { self_origin: SELF, origins: &origins, namespaces: &namespaces };
        assert_eq!(policy.screen(SELF, "{oops"), Err(Rejection::Malformed));
    }

    #[test]
    fn test_unregistered_namespace_is_rejected() {
        let origins = OriginAllowList::new();
        let namespaces = dfp_namespaces();
        let policy = ScreenPolicy { self_origin: SELF, origins: &origins, namespaces: &namespaces };
        assert_eq!(
            policy.screen(SELF, r#"{"type":"init.other"}"#),
            Err(Rejection::Namespace)
        );
    }

    #[test]
    fn test_rejection_labels() {
        assert_eq!(Rejection::Origin.to_string(), "origin");
        assert_eq!(Rejection::Malformed.to_string(), "malformed");
        assert_eq!(Rejection::Namespace.to_string(), "namespace");
        assert_eq!(Rejection::NotListening.to_string(), "not-listening");
    }
}
