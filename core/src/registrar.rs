//! Per-instance table of enabled verbs.
//!
//! Computed once when a service is built, from the configured allow-list.
//! Every instance owns its table; nothing is shared between instances.

use std::fmt;

use crate::http::HttpMethod;

/// A set of HTTP verbs.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MethodSet {
    bits: u8,
}

impl MethodSet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub const fn all() -> Self {
        Self { bits: 0b1_1111 }
    }

    const fn bit(method: HttpMethod) -> u8 {
        1 << (method as u8)
    }

    pub fn contains(self, method: HttpMethod) -> bool {
        self.bits & Self::bit(method) != 0
    }

    pub fn insert(&mut self, method: HttpMethod) {
        self.bits |= Self::bit(method);
    }

    /// Every supported verb not in this set.
    pub fn complement(self) -> Self {
        Self {
            bits: Self::all().bits & !self.bits,
        }
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = HttpMethod> {
        HttpMethod::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    /// Resolve an allow-list of verb names, case-insensitively.
    ///
    /// `None` enables every verb. Unknown names are ignored with a warning.
    pub fn from_include<S: AsRef<str>>(include: Option<&[S]>) -> Self {
        let Some(names) = include else {
            return Self::all();
        };
        let mut set = Self::empty();
        for name in names {
            match HttpMethod::parse(name.as_ref()) {
                Some(method) => set.insert(method),
                None => tracing::warn!(method = name.as_ref(), "ignoring unsupported HTTP method in includeMethods"),
            }
        }
        set
    }
}

impl FromIterator<HttpMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = HttpMethod>>(iter: I) -> Self {
        let mut set = Self::empty();
        for method in iter {
            set.insert(method);
        }
        set
    }
}

impl fmt::Debug for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Which entry points a service instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodTable {
    /// Verbs with an in-process helper method.
    pub helpers: MethodSet,
    /// Verbs with a network-facing action entry point.
    pub actions: MethodSet,
}

impl MethodTable {
    /// Compute the table for one instance.
    ///
    /// Excluded verbs lose both their helper and their action. Actions exist
    /// only when `expose_actions` is set.
    pub fn register<S: AsRef<str>>(include: Option<&[S]>, expose_actions: bool) -> Self {
        let helpers = MethodSet::from_include(include);
        let actions = if expose_actions { helpers } else { MethodSet::empty() };
        tracing::debug!(?helpers, excluded = ?helpers.complement(), ?actions, "registered HTTP methods");
        Self { helpers, actions }
    }

    pub fn has_helper(&self, method: HttpMethod) -> bool {
        self.helpers.contains(method)
    }

    pub fn has_action(&self, method: HttpMethod) -> bool {
        self.actions.contains(method)
    }
}
