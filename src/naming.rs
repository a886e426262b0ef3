//! Batch-scoped material name sanitizing and de-duplication.

use std::collections::HashSet;

/// Names claimed so far in one export batch.
///
/// Passed by `&mut` through the batch; never a process-wide singleton, so
/// separate runs (and tests) cannot leak claims into each other.
#[derive(Debug, Default)]
pub struct NameRegistry {
    used: HashSet<String>,
}

/// Replace characters the target identifier space disallows.
pub fn sanitize(raw: &str) -> String {
    raw.replace('.', "_")
}

impl NameRegistry {
    pub fn new() -> NameRegistry {
        NameRegistry::default()
    }

    /// Sanitize `raw` and commit a unique name for it.
    ///
    /// First claim keeps the sanitized name; collisions append the smallest
    /// free `_<n>` suffix starting at 0.
    pub fn claim(&mut self, raw: &str) -> String {
        let base = sanitize(raw);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut index = 0usize;
        loop {
            let candidate = format!("{base}_{index}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            index += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn collision_sequence_is_deterministic() {
        let mut names = NameRegistry::new();
        assert_eq!(names.claim("Wood"), "Wood");
        assert_eq!(names.claim("Wood"), "Wood_0");
        assert_eq!(names.claim("Wood.001"), "Wood_001");
        assert_eq!(names.claim("Wood"), "Wood_1");
    }

    #[test]
    fn sanitize_replaces_dots() {
        assert_eq!(sanitize("Mat.004.final"), "Mat_004_final");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn sanitized_collision_with_existing_suffix() {
        // "Wood_0" claimed directly, then a "Wood" collision must skip past it.
        let mut names = NameRegistry::new();
        assert_eq!(names.claim("Wood_0"), "Wood_0");
        assert_eq!(names.claim("Wood"), "Wood");
        assert_eq!(names.claim("Wood"), "Wood_1");
    }

    proptest! {
        #[test]
        fn claims_are_pairwise_distinct(raws in prop::collection::vec(any::<String>(), 0..12)) {
            let mut names = NameRegistry::new();
            let claimed: Vec<String> = raws.iter().map(|r| names.claim(r)).collect();
            let unique: std::collections::HashSet<&String> = claimed.iter().collect();
            prop_assert_eq!(unique.len(), claimed.len());
        }
    }
}
