//! Origin allow-list: which senders the bus trusts.
//!
//! Every inbound notification carries the sender's *origin* (scheme + host,
//! e.g. `https://ads.example.com`).  The allow-list decides which of those
//! origins may reach local listeners.
//!
//! # Entries
//!
//! An entry is either:
//!
//! - the wildcard marker [`WILDCARD_ORIGIN`] (`"*"`), meaning "any origin", or
//! - a concrete host, written with or without its scheme
//!   (`"ads.example.com"` or `"https://ads.example.com"`).  Concrete hosts
//!   match case-insensitively and accept both `http` and `https` senders.
//!
//! The wildcard and concrete hosts never coexist: adding a concrete host
//! drops the wildcard, and adding the wildcard collapses the list to just
//! the wildcard.
//!
//! # Compiled matcher
//!
//! The ordered entry list is the source of truth.  Every mutation recompiles
//! it into an [`OriginMatcher`] so that [`OriginAllowList::matches`] is a
//! single set lookup on the hot inbound path.

use std::collections::HashSet;

/// The allow-list entry meaning "accept any origin".
pub const WILDCARD_ORIGIN: &str = "*";

/// The origin string reported for opaque senders (sandboxed frames,
/// `file://` documents, data URLs).
pub const NULL_ORIGIN: &str = "null";

/// Compiled form of the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginMatcher {
    /// The wildcard is present.
    Any,
    /// Lower-cased `host[:port]` keys without a scheme.
    Hosts(HashSet<String>),
}

/// An ordered set of trusted origins.
///
/// # Example
///
/// ```rust
/// use framebus_core::OriginAllowList;
///
/// let mut origins = OriginAllowList::empty();
/// origins.add("https://ads.example.com");
///
/// assert!(origins.matches("http://ADS.example.com"));
/// assert!(!origins.matches("https://evil.example"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAllowList {
    entries: Vec<String>,
    matcher: OriginMatcher,
}

impl OriginAllowList {
    /// Creates an allow-list holding only the wildcard.
    pub fn new() -> Self {
        Self {
            entries: vec![WILDCARD_ORIGIN.to_string()],
            matcher: OriginMatcher::Any,
        }
    }

    /// Creates an allow-list that trusts nothing.
    ///
    /// The bus still accepts its own origin and [`NULL_ORIGIN`]; those checks
    /// happen outside the list.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            matcher: OriginMatcher::Hosts(HashSet::new()),
        }
    }

    /// Builds an allow-list by adding each origin in order.
    ///
    /// An empty iterator yields [`OriginAllowList::empty`].
    pub fn from_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::empty();
        for origin in origins {
            list.add(origin.as_ref());
        }
        list
    }

    /// Adds an origin.  Returns `true` if the list changed.
    pub fn add(&mut self, origin: &str) -> bool {
        if is_wildcard(origin) {
            if self.is_wildcard() && self.entries.len() == 1 {
                return false;
            }
            self.entries = vec![WILDCARD_ORIGIN.to_string()];
            self.recompile();
            return true;
        }

        if self.entries.iter().any(|e| e == origin) {
            return false;
        }

        self.entries.retain(|e| !is_wildcard(e));
        self.entries.push(origin.to_string());
        self.recompile();
        true
    }

    /// Removes an origin.  Returns `true` if it was present.
    pub fn remove(&mut self, origin: &str) -> bool {
        match self.entries.iter().position(|e| e == origin) {
            Some(index) => {
                self.entries.remove(index);
                self.recompile();
                true
            }
            None => false,
        }
    }

    /// Returns `true` when the wildcard is the (only) entry.
    pub fn is_wildcard(&self) -> bool {
        self.matcher == OriginMatcher::Any
    }

    /// The entries in insertion order, exactly as they were added.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Tests a sender origin against the compiled matcher.
    pub fn matches(&self, origin: &str) -> bool {
        match &self.matcher {
            OriginMatcher::Any => true,
            OriginMatcher::Hosts(hosts) => {
                sender_host_key(origin).is_some_and(|key| hosts.contains(&key))
            }
        }
    }

    fn recompile(&mut self) {
        self.matcher = if self.entries.iter().any(|e| is_wildcard(e)) {
            OriginMatcher::Any
        } else {
            OriginMatcher::Hosts(self.entries.iter().filter_map(|e| entry_host_key(e)).collect())
        };
    }
}

impl Default for OriginAllowList {
    fn default() -> Self {
        Self::new()
    }
}

fn is_wildcard(origin: &str) -> bool {
    origin == WILDCARD_ORIGIN
}

/// Normalises an allow-list entry to its `host[:port]` key.
///
/// Entries written with a scheme other than `http`/`https` compile to
/// nothing, so they can never match a sender.
fn entry_host_key(entry: &str) -> Option<String> {
    let lower = entry.trim().to_ascii_lowercase();
    let host = match lower.split_once("://") {
        Some(("http" | "https", rest)) => rest,
        Some(_) => return None,
        None => lower.as_str(),
    };
    let host = host.trim_end_matches('/');
    (!host.is_empty()).then(|| host.to_string())
}

/// Normalises a sender origin to its `host[:port]` key.
///
/// Only `http` and `https` senders produce a key.
fn sender_host_key(origin: &str) -> Option<String> {
    let lower = origin.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))?;
    let host = rest.trim_end_matches('/');
    (!host.is_empty()).then(|| host.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_list_is_wildcard() {
        let list = OriginAllowList::new();
        assert!(list.is_wildcard());
        assert_eq!(list.entries(), ["*"]);
        assert!(list.matches("https://anything.example"));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let list = OriginAllowList::empty();
        assert!(!list.matches("https://www.example.com"));
        assert!(!list.matches(NULL_ORIGIN));
    }

    #[test]
    fn test_concrete_origin_replaces_wildcard() {
        // Arrange
        let mut list = OriginAllowList::new();

        // Act
        let changed = list.add("http://a.example");

        // Assert
        assert!(changed);
        assert_eq!(list.entries(), ["http://a.example"]);
        assert!(!list.is_wildcard());
    }

    #[test]
    fn test_wildcard_collapses_concrete_origins() {
        // Arrange
        let mut list = OriginAllowList::empty();
        list.add("http://a.example");
        list.add("http://b.example");

        // Act
        list.add("*");

        // Assert
        assert_eq!(list.entries(), ["*"]);
        assert!(list.is_wildcard());
    }

    #[test]
    fn test_wildcard_then_concrete_leaves_only_concrete() {
        let mut list = OriginAllowList::empty();
        list.add("http://a.example");
        list.add("*");
        list.add("http://b.example");
        assert_eq!(list.entries(), ["http://b.example"]);
    }

    #[test]
    fn test_adding_duplicate_is_noop() {
        let mut list = OriginAllowList::empty();
        assert!(list.add("a.example"));
        assert!(!list.add("a.example"));
        assert_eq!(list.entries().len(), 1);
    }

    #[test]
    fn test_adding_wildcard_twice_is_noop() {
        let mut list = OriginAllowList::new();
        assert!(!list.add("*"));
    }

    #[test]
    fn test_match_is_case_insensitive_and_scheme_agnostic() {
        // Arrange: entry written with https, sender uses http and mixed case
        let list = OriginAllowList::from_origins(["https://Ads.Example.com"]);

        // Act / Assert
        assert!(list.matches("http://ads.example.com"));
        assert!(list.matches("HTTPS://ADS.EXAMPLE.COM"));
    }

    #[test]
    fn test_entry_without_scheme_matches_http_and_https() {
        let list = OriginAllowList::from_origins(["ads.example.com"]);
        assert!(list.matches("http://ads.example.com"));
        assert!(list.matches("https://ads.example.com"));
    }

    #[test]
    fn test_port_is_part_of_the_host_key() {
        let list = OriginAllowList::from_origins(["http://localhost:8080"]);
        assert!(list.matches("http://localhost:8080"));
        assert!(!list.matches("http://localhost"));
        assert!(!list.matches("http://localhost:9090"));
    }

    #[test]
    fn test_non_http_sender_never_matches_concrete_entry() {
        let list = OriginAllowList::from_origins(["ads.example.com"]);
        assert!(!list.matches("ftp://ads.example.com"));
        assert!(!list.matches("ads.example.com"));
    }

    #[test]
    fn test_suffix_lookalike_does_not_match() {
        let list = OriginAllowList::from_origins(["example.com"]);
        assert!(!list.matches("https://evil-example.com"));
        assert!(!list.matches("https://example.com.evil.net"));
    }

    #[test]
    fn test_non_http_entry_compiles_to_nothing() {
        let list = OriginAllowList::from_origins(["chrome-extension://abc"]);
        assert_eq!(list.entries().len(), 1);
        assert!(!list.matches("chrome-extension://abc"));
        assert!(!list.matches("https://abc"));
    }

    #[test]
    fn test_remove_recompiles_matcher() {
        // Arrange
        let mut list = OriginAllowList::from_origins(["a.example", "b.example"]);

        // Act
        let removed = list.remove("a.example");

        // Assert
        assert!(removed);
        assert!(!list.matches("https://a.example"));
        assert!(list.matches("https://b.example"));
    }

    #[test]
    fn test_remove_absent_origin_is_noop() {
        let mut list = OriginAllowList::from_origins(["a.example"]);
        assert!(!list.remove("b.example"));
        assert_eq!(list.entries(), ["a.example"]);
    }

    #[test]
    fn test_removing_wildcard_leaves_empty_list() {
        let mut list = OriginAllowList::new();
        assert!(list.remove("*"));
        assert!(list.entries().is_empty());
        assert!(!list.matches("https://a.example"));
    }

    #[test]
    fn test_from_empty_iterator_is_empty_list() {
        let list = OriginAllowList::from_origins(Vec::<String>::new());
        assert!(list.entries().is_empty());
    }
}
