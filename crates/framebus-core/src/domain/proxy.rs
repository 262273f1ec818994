//! Proxy routes: namespace → ordered list of relay targets.
//!
//! A page that embeds a sandboxed frame can relay every message of a
//! namespace it receives on to further contexts, for example forwarding tag
//! manager traffic from the page's own frame into a nested jail frame.
//! Routes only grow: each registration appends its targets after the ones
//! already present.

use std::collections::HashMap;

use super::context::Context;

/// Table of proxy routes keyed by bare namespace.
#[derive(Debug, Clone)]
pub struct ProxyTable<C: Context> {
    routes: HashMap<String, Vec<C>>,
}

impl<C: Context> ProxyTable<C> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Appends `targets` to the route for `namespace`, creating it if absent.
    pub fn extend<I>(&mut self, namespace: &str, targets: I)
    where
        I: IntoIterator<Item = C>,
    {
        self.routes
            .entry(namespace.to_string())
            .or_default()
            .extend(targets);
    }

    /// The targets for `namespace` in registration order (empty if none).
    pub fn targets(&self, namespace: &str) -> &[C] {
        self.routes.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `true` if a route exists for `namespace`.
    pub fn contains(&self, namespace: &str) -> bool {
        self.routes.contains_key(namespace)
    }
}

impl<C: Context> Default for ProxyTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
