//! 🔧 Repair strategies — what we actually do to a broken document.
//!
//! The registry is an explicit map from error-type tag to strategy,
//! populated at startup. No string-concatenated function-name lookups, no
//! reflection séances: an unknown tag looks up to `None` and the
//! orchestrator treats that as the defined Skipped outcome, not a failure.
//!
//! Today there is exactly one strategy, because there is exactly one error
//! family we know how to un-break: a schema-incompatible field gets
//! stripped from the document and the write is retried.

use std::collections::HashMap;

use serde_json::Value;

/// The repair playbook for one error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    /// Strip the classified bad field from the document and retry the
    /// write. The only tool we have; fortunately most mapping conflicts
    /// are exactly this shape of nail.
    StripBadField,
}

/// 📖 Error-type tag → strategy. Unknown tags are a no-op outcome.
#[derive(Debug)]
pub struct StrategyRegistry {
    strategies: HashMap<String, RepairStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };
        // The one failure family the original operators kept hitting:
        // a field whose mapping changed under the documents.
        registry.register("illegal_argument_exception", RepairStrategy::StripBadField);
        registry
    }
}

impl StrategyRegistry {
    pub fn register(&mut self, err_type: impl Into<String>, strategy: RepairStrategy) {
        self.strategies.insert(err_type.into(), strategy);
    }

    pub fn lookup(&self, err_type: &str) -> Option<RepairStrategy> {
        self.strategies.get(err_type).copied()
    }
}

/// ✂️ Remove the bad field's *parent* key from a document body, in place.
///
/// The field path splits on `.` and we delete the second-to-last segment's
/// key from its container — one level up from the deepest match. Yes,
/// really: for `meta.bad_field` the whole `meta` object goes, not just
/// `bad_field`. This mirrors the behavior the original operators ran in
/// production for years; it may be a safety margin, it may be a quirk, but
/// "repaired the same way as before" beats "silently repaired differently".
/// A single-segment path has no parent, so that segment itself is removed
/// at the root.
///
/// Removing something that is already absent is a no-op, never an error —
/// repair must be idempotent because a retried run will happily classify
/// the same failure twice.
pub fn strip_bad_field(body: &mut Value, field_path: &str) {
    let segments: Vec<&str> = field_path.split('.').collect();
    let (walk, victim) = match segments.len() {
        0 => return,
        1 => (&segments[..0], segments[0]),
        n => (&segments[..n - 2], segments[n - 2]),
    };

    let mut cursor = &mut *body;
    for segment in walk {
        match cursor.get_mut(*segment) {
            Some(child) => cursor = child,
            // Path doesn't exist (anymore) — nothing to strip, nothing to report.
            None => return,
        }
    }

    if let Some(container) = cursor.as_object_mut() {
        container.remove(victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_the_default_registry_knows_exactly_one_trick() {
        let registry = StrategyRegistry::default();
        assert_eq!(
            registry.lookup("illegal_argument_exception"),
            Some(RepairStrategy::StripBadField)
        );
        assert_eq!(registry.lookup("mapper_parsing_exception"), None);
    }

    #[test]
    fn the_one_where_registration_is_open_for_business() {
        let mut registry = StrategyRegistry::default();
        registry.register("mapper_parsing_exception", RepairStrategy::StripBadField);
        assert!(registry.lookup("mapper_parsing_exception").is_some());
    }

    #[test]
    fn strips_the_parent_of_the_reported_leaf_not_the_leaf_itself() {
        // ⚠️ The deliberate quirk: for a.b.c we remove "b" from "a", taking
        // "c" (and any siblings of "c") with it. Do not "fix" this without
        // confirming with whoever depends on the old tool's behavior.
        let mut body = json!({
            "a": {"b": {"c": 1, "d": 2}, "keep": true},
            "other": "stays"
        });
        strip_bad_field(&mut body, "a.b.c");
        assert_eq!(body, json!({"a": {"keep": true}, "other": "stays"}));
    }

    #[test]
    fn the_one_where_a_two_segment_path_clears_the_top_level_key() {
        let mut body = json!({"meta": {"bad_field": "boom"}, "title": "kept"});
        strip_bad_field(&mut body, "meta.bad_field");
        assert_eq!(body, json!({"title": "kept"}));
    }

    #[test]
    fn the_one_where_a_single_segment_field_is_removed_at_the_root() {
        let mut body = json!({"bad": 1, "good": 2});
        strip_bad_field(&mut body, "bad");
        assert_eq!(body, json!({"good": 2}));
    }

    #[test]
    fn the_one_where_stripping_twice_is_perfectly_fine() {
        // Idempotence: the second strip finds nothing and does nothing.
        let mut body = json!({"meta": {"bad_field": true}, "title": "t"});
        strip_bad_field(&mut body, "meta.bad_field");
        let after_first = body.clone();
        strip_bad_field(&mut body, "meta.bad_field");
        assert_eq!(body, after_first);
    }

    #[test]
    fn the_one_where_the_path_walks_off_a_cliff_and_nobody_falls() {
        let mut body = json!({"meta": {"year": 2017}});
        strip_bad_field(&mut body, "does.not.exist.at.all");
        assert_eq!(body, json!({"meta": {"year": 2017}}));
    }

    #[test]
    fn the_one_where_the_container_is_not_an_object() {
        // Walking lands on an array/scalar: nothing sensible to remove,
        // so nothing is removed and nothing panics.
        let mut body = json!({"meta": [1, 2, 3]});
        strip_bad_field(&mut body, "meta.list.item");
        assert_eq!(body, json!({"meta": [1, 2, 3]}));
    }
}
