//! Use flags handed to the meta-build
//!
//! Every flag common-mk reads is always present in the final set, explicitly
//! false unless enabled, so GN never sees an undefined `use.*` lookup.

use std::collections::BTreeMap;

/// Use flags required by common-mk
pub const COMMON_MK_USES: &[&str] = &[
    "asan",
    "coverage",
    "cros_host",
    "cros_debug",
    "floss_rootcanal",
    "function_elimination_experiment",
    "fuzzer",
    "lto_experiment",
    "msan",
    "profiling",
    "proto_force_optimize_speed",
    "tcmalloc",
    "test",
    "ubsan",
];

/// Defaults layered over the common-mk set
pub const USE_DEFAULTS: &[(&str, bool)] = &[
    ("android", false),
    ("bt_nonstandard_codecs", false),
    ("test", false),
];

/// Prefix that turns an override into a disable
pub const NEGATION_MARKER: char = '-';

/// Ordered mapping of use flag name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseFlags {
    flags: BTreeMap<String, bool>,
}

impl UseFlags {
    /// Build from a base set, a default table and user overrides
    ///
    /// Base flags start false, defaults replace them, then each override
    /// sets its flag true (or false when prefixed with `-`). Later overrides
    /// win over earlier ones.
    pub fn build<I, S>(base: &[&str], defaults: &[(&str, bool)], overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Self::default();

        for name in base {
            flags.set(*name, false);
        }

        for (name, value) in defaults {
            flags.set(*name, *value);
        }

        for token in overrides {
            let token = token.as_ref().trim();
            let (name, value) = match token.strip_prefix(NEGATION_MARKER) {
                Some(rest) => (rest, false),
                None => (token, true),
            };
            if name.is_empty() {
                tracing::warn!("Ignoring empty use flag override '{}'", token);
                continue;
            }
            flags.set(name, value);
        }

        flags
    }

    /// Build with the common-mk base set and the built-in defaults
    pub fn from_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(COMMON_MK_USES, USE_DEFAULTS, overrides)
    }

    /// Value of a flag, if present
    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    /// True only when the flag is present and enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    /// Set a flag, adding it if unknown
    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Iterate flags in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_flags_present_and_false() {
        let flags = UseFlags::from_overrides(Vec::<String>::new());

        for name in COMMON_MK_USES {
            assert_eq!(flags.get(name), Some(false), "missing {}", name);
        }
        assert_eq!(flags.get("android"), Some(false));
        assert_eq!(flags.get("bt_nonstandard_codecs"), Some(false));
    }

    #[test]
    fn test_test_and_negated_android() {
        let flags = UseFlags::from_overrides(["test", "-android"]);

        assert_eq!(flags.get("test"), Some(true));
        assert_eq!(flags.get("android"), Some(false));
        assert_eq!(flags.get("bt_nonstandard_codecs"), Some(false));
        for name in COMMON_MK_USES.iter().filter(|n| **n != "test") {
            assert_eq!(flags.get(name), Some(false), "{} should default false", name);
        }
        // No stray marker-prefixed key
        assert_eq!(flags.get("-android"), None);
    }

    #[test]
    fn test_override_beats_default() {
        let flags = UseFlags::build(&["a"], &[("b", false)], ["b"]);
        assert_eq!(flags.get("b"), Some(true));
    }

    #[test]
    fn test_default_replaces_base() {
        let flags = UseFlags::build(&["a", "b"], &[("b", true)], Vec::<&str>::new());
        assert_eq!(flags.get("a"), Some(false));
        assert_eq!(flags.get("b"), Some(true));
    }

    #[test]
    fn test_negation_wins_regardless_of_default() {
        let flags = UseFlags::build(&[], &[("codec", true)], ["-codec"]);
        assert_eq!(flags.get("codec"), Some(false));
    }

    #[test]
    fn test_later_override_wins() {
        let flags = UseFlags::from_overrides(["asan", "-asan"]);
        assert_eq!(flags.get("asan"), Some(false));

        let flags = UseFlags::from_overrides(["-asan", "asan"]);
        assert_eq!(flags.get("asan"), Some(true));
    }

    #[test]
    fn test_unknown_override_is_added() {
        let flags = UseFlags::from_overrides(["floss_experimental"]);
        assert_eq!(flags.get("floss_experimental"), Some(true));
        assert_eq!(flags.len(), COMMON_MK_USES.len() + 3);
    }

    #[test]
    fn test_empty_override_ignored() {
        let flags = UseFlags::from_overrides(["-", "  "]);
        assert_eq!(flags, UseFlags::from_overrides(Vec::<&str>::new()));
    }

    #[test]
    fn test_iter_is_sorted() {
        let flags = UseFlags::build(&["zeta", "alpha"], &[], ["mid"]);
        let names: Vec<&str> = flags.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_is_enabled() {
        let flags = UseFlags::from_overrides(["test"]);
        assert!(flags.is_enabled("test"));
        assert!(!flags.is_enabled("asan"));
        assert!(!flags.is_enabled("never_defined"));
    }
}
