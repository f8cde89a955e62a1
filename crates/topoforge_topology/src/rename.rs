//! Name deduplication for topology copies.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::models::Topology;

/// Length of a generated suffix.
pub const SUFFIX_LEN: usize = 6;

/// Number of distinct generated suffixes (16^6).
pub const SUFFIX_SPACE: usize = 1 << (4 * SUFFIX_LEN);

/// A short token appended to every entity name of one copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Suffix(String);

impl Suffix {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Draw a fresh random suffix.
    pub fn generate() -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self(token[..SUFFIX_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Apply the suffix to a name: `<name>_<suffix>`.
    pub fn apply(&self, name: &str) -> String {
        format!("{}_{}", name, self.0)
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out suffixes that are unique within one batch.
#[derive(Debug)]
pub struct SuffixGenerator {
    issued: HashSet<Suffix>,
    limit: usize,
}

impl Default for SuffixGenerator {
    fn default() -> Self {
        Self {
            issued: HashSet::new(),
            limit: SUFFIX_SPACE,
        }
    }
}

impl SuffixGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw suffixes until one that has not been issued by this generator comes up.
    ///
    /// Returns `None` once the suffix space is used up.
    pub fn next_suffix(&mut self) -> Option<Suffix> {
        if self.issued.len() >= self.limit {
            return None;
        }
        loop {
            let suffix = Suffix::generate();
            if self.issued.insert(suffix.clone()) {
                return Some(suffix);
            }
        }
    }

    /// Reserve a caller-chosen suffix. Returns false if it was already issued.
    pub fn reserve(&mut self, suffix: Suffix) -> bool {
        self.issued.insert(suffix)
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

/// Produce a renamed deep copy of `topology`.
///
/// Instance names, instance attachment names, network names, router names and
/// router attachment names all become `<original>_<suffix>`. The input is left
/// untouched.
pub fn rename(topology: &Topology, suffix: &Suffix) -> Topology {
    let mut renamed = topology.clone();

    for instance in &mut renamed.instances {
        instance.name = suffix.apply(&instance.name);
        for attachment in &mut instance.networks {
            attachment.name = suffix.apply(&attachment.name);
        }
    }

    for network in &mut renamed.networks {
        network.name = suffix.apply(&network.name);
    }

    for router in &mut renamed.routers {
        router.name = suffix.apply(&router.name);
        for attachment in &mut router.networks {
            attachment.name = suffix.apply(&attachment.name);
        }
    }

    renamed
}
