use std::collections::HashMap;

use tracing::debug;

use crate::db::{DbHandle, Result};

/// Name shown for class ids that do not resolve.
pub const UNKNOWN_CLASS: &str = "UnknownClass";

/// Something that can turn a class id (`0x..`) into a class name.
pub trait ClassNameLookup {
    fn lookup_class_name(&self, class_id: &str) -> Result<Option<String>>;
}

impl ClassNameLookup for DbHandle {
    fn lookup_class_name(&self, class_id: &str) -> Result<Option<String>> {
        match parse_id(class_id) {
            Some(id) => self.class_name(id),
            None => Ok(None),
        }
    }
}

/// Parses an id in the `0x1f` form; plain decimal is accepted too.
pub fn parse_id(id: &str) -> Option<i64> {
    let id = id.trim();
    match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => id.parse().ok(),
    }
}

/// Memoizes class name lookups for one console session.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    cache: HashMap<String, String>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the display name for `class_id`, querying `lookup` at most once per id.
    pub fn resolve(&mut self, lookup: &dyn ClassNameLookup, class_id: &str) -> &str {
        if !self.cache.contains_key(class_id) {
            let name = match lookup.lookup_class_name(class_id) {
                Ok(Some(name)) => name,
                Ok(None) => UNKNOWN_CLASS.to_string(),
                Err(e) => {
                    debug!(class_id, error = %e, "class lookup failed");
                    UNKNOWN_CLASS.to_string()
                }
            };
            debug!(class_id, name = %name, "resolved class id");
            self.cache.insert(class_id.to_string(), name);
        }
        &self.cache[class_id]
    }

    pub fn cached(&self, class_id: &str) -> Option<&str> {
        self.cache.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::DbError;
    use std::cell::Cell;

    /// Lookup backed by a fixed table that counts how often it is asked.
    pub(crate) struct FakeLookup {
        pub names: Vec<(&'static str, &'static str)>,
        pub calls: Cell<usize>,
        pub fail: bool,
    }

    impl FakeLookup {
        pub fn new(names: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                names,
                calls: Cell::new(0),
                fail: false,
            }
        }
    }

    impl ClassNameLookup for FakeLookup {
        fn lookup_class_name(&self, class_id: &str) -> Result<Option<String>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(DbError::query("SELECT Name FROM ec_Class", "no such table"));
            }
            Ok(self
                .names
                .iter()
                .find(|(id, _)| *id == class_id)
                .map(|(_, name)| name.to_string()))
        }
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("0x1f"), Some(31));
        assert_eq!(parse_id("0X10"), Some(16));
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("0xzz"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn test_resolve_hits_lookup_once() {
        let lookup = FakeLookup::new(vec![("0x1f", "PhysicalElement")]);
        let mut resolver = ReferenceResolver::new();
        assert_eq!(resolver.resolve(&lookup, "0x1f"), "PhysicalElement");
        assert_eq!(resolver.resolve(&lookup, "0x1f"), "PhysicalElement");
        assert_eq!(lookup.calls.get(), 1);
    }

    #[test]
    fn test_misses_are_cached_as_unknown() {
        let lookup = FakeLookup::new(vec![]);
        let mut resolver = ReferenceResolver::new();
        assert_eq!(resolver.resolve(&lookup, "0x99"), UNKNOWN_CLASS);
        assert_eq!(resolver.resolve(&lookup, "0x99"), UNKNOWN_CLASS);
        assert_eq!(lookup.calls.get(), 1);
        assert_eq!(resolver.cached("0x99"), Some(UNKNOWN_CLASS));
    }

    #[test]
    fn test_failed_lookup_resolves_to_unknown() {
        let mut lookup = FakeLookup::new(vec![("0x1", "Never")]);
        lookup.fail = true;
        let mut resolver = ReferenceResolver::new();
        assert_eq!(resolver.resolve(&lookup, "0x1"), UNKNOWN_CLASS);
        assert_eq!(resolver.len(), 1);
    }
}
