//! Message namespaces.
//!
//! Many unrelated features share one physical channel: an ad frame, a tag
//! manager sandbox, a login widget.  Each picks a *namespace* and qualifies
//! its message types with it, so `"init.dfp"` is the `init` message of the
//! `dfp` namespace.  The bus routes an inbound message only if its type ends
//! in a namespace somebody is listening on.
//!
//! # Default namespace
//!
//! A type written without any namespace (`"ping"`) is qualified with
//! [`DEFAULT_NAMESPACE`] on both the send and the receive side, so it becomes
//! `"ping.postMessage"`.  The default namespace is always accepted by the
//! suffix matcher, but it does not count as a *registration*: only explicit
//! registrations keep the wire subscription alive.

/// The namespace appended to types that carry none.
pub const DEFAULT_NAMESPACE: &str = "postMessage";

/// Returns `true` if `kind` already carries a namespace: a `.` followed by at
/// least one more character.
pub fn has_namespace(kind: &str) -> bool {
    kind.char_indices()
        .any(|(index, c)| c == '.' && index + 1 < kind.len())
}

/// Qualifies a message type with [`DEFAULT_NAMESPACE`] when it has none.
///
/// ```rust
/// use framebus_core::qualify_type;
///
/// assert_eq!(qualify_type("ping"), "ping.postMessage");
/// assert_eq!(qualify_type("init.dfp"), "init.dfp");
/// ```
pub fn qualify_type(kind: &str) -> String {
    if has_namespace(kind) {
        kind.to_string()
    } else {
        format!("{kind}.{DEFAULT_NAMESPACE}")
    }
}

/// Strips a leading `.` from a caller-supplied namespace.
///
/// Returns `None` for names that are empty after stripping.
pub fn bare_namespace(namespace: &str) -> Option<&str> {
    let bare = namespace.strip_prefix('.').unwrap_or(namespace);
    (!bare.is_empty()).then_some(bare)
}

/// The ordered set of registered namespaces plus its compiled suffix matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSet {
    registered: Vec<String>,
    /// Every accepted namespace (default included), longest first, so the
    /// most specific namespace wins when one is a suffix of another.
    compiled: Vec<String>,
}

impl NamespaceSet {
    /// Creates a set with no registrations.
    pub fn new() -> Self {
        let mut set = Self {
            registered: Vec::new(),
            compiled: Vec::new(),
        };
        set.recompile();
        set
    }

    /// Registers a bare namespace.  Returns `true` if it was newly added.
    pub fn insert(&mut self, namespace: &str) -> bool {
        if self.registered.iter().any(|n| n == namespace) {
            return false;
        }
        self.registered.push(namespace.to_string());
        self.recompile();
        true
    }

    /// Deregisters a namespace.  Returns `true` if it was present.
    pub fn remove(&mut self, namespace: &str) -> bool {
        match self.registered.iter().position(|n| n == namespace) {
            Some(index) => {
                self.registered.remove(index);
                self.recompile();
                true
            }
            None => false,
        }
    }

    /// Drops every registration, returning the removed namespaces in order.
    pub fn clear(&mut self) -> Vec<String> {
        let removed = std::mem::take(&mut self.registered);
        self.recompile();
        removed
    }

    /// `true` when no namespace is registered.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// The registered namespaces in registration order.
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// `true` if messages of `namespace` are accepted (the default namespace
    /// always is).
    pub fn contains(&self, namespace: &str) -> bool {
        self.compiled.iter().any(|n| n == namespace)
    }

    /// Returns the accepted namespace `kind` ends in, if any.
    pub fn resolve(&self, kind: &str) -> Option<&str> {
        self.compiled
            .iter()
            .find(|namespace| ends_in_namespace(kind, namespace))
            .map(String::as_str)
    }

    /// `true` if `kind` ends in an accepted namespace.
    pub fn matches(&self, kind: &str) -> bool {
        self.resolve(kind).is_some()
    }

    fn recompile(&mut self) {
        let mut compiled: Vec<String> = Vec::with_capacity(self.registered.len() + 1);
        compiled.push(DEFAULT_NAMESPACE.to_string());
        for namespace in &self.registered {
            if !compiled.contains(namespace) {
                compiled.push(namespace.clone());
            }
        }
        // Stable sort keeps registration order among equal lengths.
        compiled.sort_by(|a, b| b.len().cmp(&a.len()));
        self.compiled = compiled;
    }
}

impl Default for NamespaceSet {
    fn default() -> Self {
        Self::new()
    }
}

fn ends_in_namespace(kind: &str, namespace: &str) -> bool {
    kind.strip_suffix(namespace)
        .is_some_and(|head| head.ends_with('.'))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
