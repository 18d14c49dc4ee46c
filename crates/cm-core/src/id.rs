use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Process-wide interner backing every `EntityId`.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned id of a company, feature, arrow or group. `Copy`, and compares
/// by interner index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(Spur);

impl EntityId {
    /// Intern a string as an EntityId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        EntityId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Trailing decimal run of the id (`comp-17` → 17), if any.
    pub fn numeric_suffix(&self) -> Option<u64> {
        let s = self.as_str();
        let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        s[s.len() - digits..].parse().ok()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EntityId::intern(&s))
    }
}

// ─── Id sources ──────────────────────────────────────────────────────────

/// Id prefixes, one per entity kind.
pub mod prefix {
    pub const COMPANY: &str = "comp";
    pub const FEATURE: &str = "feat";
    pub const ARROW: &str = "arrow";
    pub const GROUP: &str = "grp";
}

/// Generator for fresh entity ids, injected into the store.
pub trait IdSource {
    /// Produce the next id for the given prefix.
    fn next(&mut self, prefix: &str) -> EntityId;

    /// Called for every id loaded from storage so later ids can steer clear of it.
    fn observe(&mut self, _id: EntityId) {}
}

/// Strictly monotonic counter: `comp-1`, `feat-2`, `arrow-3`, ...
///
/// One counter is shared by every prefix, so no two generated ids share a suffix.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next(&mut self, prefix: &str) -> EntityId {
        match self.next.checked_add(1) {
            Some(n) => {
                self.next = n;
                EntityId::intern(&format!("{prefix}-{n}"))
            }
            // Counter exhausted; random ids are still unique.
            None => UuidIds.next(prefix),
        }
    }

    /// Suffixes with no successor are ignored so the counter keeps counting.
    fn observe(&mut self, id: EntityId) {
        if let Some(n) = id.numeric_suffix()
            && n < u64::MAX
        {
            self.next = self.next.max(n);
        }
    }
}

/// Random v4 UUID ids: `comp-8c1f…`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next(&mut self, prefix: &str) -> EntityId {
        EntityId::intern(&format!("{prefix}-{}", uuid::Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = EntityId::intern("comp-1");
        let b = EntityId::intern("comp-1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "comp-1");
    }

    #[test]
    fn sequential_ids_are_unique_across_prefixes() {
        let mut ids = SequentialIds::new();
        let a = ids.next(prefix::COMPANY);
        let b = ids.next(prefix::ARROW);
        let c = ids.next(prefix::COMPANY);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "comp-1");
        assert_eq!(b.as_str(), "arrow-2");
        assert_eq!(c.as_str(), "comp-3");
    }

    #[test]
    fn observe_skips_past_loaded_suffixes() {
        let mut ids = SequentialIds::new();
        ids.observe(EntityId::intern("comp-1718000000000"));
        ids.observe(EntityId::intern("q1-2"));
        ids.observe(EntityId::intern("no-digits"));
        let next = ids.next(prefix::GROUP);
        assert_eq!(next.as_str(), "grp-1718000000001");
    }

    #[test]
    fn saturated_suffix_does_not_overflow() {
        let mut ids = SequentialIds::new();
        ids.observe(EntityId::intern("comp-18446744073709551615"));
        assert_eq!(ids.next(prefix::COMPANY).as_str(), "comp-1");

        ids.observe(EntityId::intern("comp-18446744073709551614"));
        assert_eq!(ids.next(prefix::COMPANY).as_str(), "comp-18446744073709551615");
        let fallback = ids.next(prefix::COMPANY);
        assert!(fallback.as_str().starts_with("comp-"));
        assert_ne!(fallback.as_str(), "comp-18446744073709551615");
    }

    #[test]
    fn numeric_suffix_parsing() {
        assert_eq!(EntityId::intern("arrow-42").numeric_suffix(), Some(42));
        assert_eq!(EntityId::intern("l3-1").numeric_suffix(), Some(1));
        assert_eq!(EntityId::intern("plain").numeric_suffix(), None);
    }

    #[test]
    fn uuid_ids_carry_prefix() {
        let id = UuidIds.next(prefix::FEATURE);
        assert!(id.as_str().starts_with("feat-"));
        assert_ne!(id, UuidIds.next(prefix::FEATURE));
    }
}
