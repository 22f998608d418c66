//! 🗺️ Mapping merge — folding several index bodies into one.
//!
//! `create-index` accepts multiple mapping files; this module merges them
//! left to right into a single index body. The merge is shallow except for
//! the `mappings` key, which gets per-type treatment so two files can each
//! contribute their own document types without clobbering the whole
//! mappings object. Everything a later body overwrites is reported back so
//! the operator gets warned instead of surprised.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// 🔀 Merge index bodies left to right.
///
/// Returns the merged body plus the set of dotted paths that a later body
/// overwrote in an earlier one (`mappings.<type>` for mapping types,
/// the bare key for everything else).
///
/// Semantics are uniform across arities — this is deliberate: an empty
/// slice yields an empty object, a single body yields a clone with no
/// overwrites, and longer slices fold pairwise while accumulating (not
/// restarting from the first body, and not returning an uninitialized
/// result for the single-body case — both sharp edges of the tool this
/// one replaces).
pub fn merge_index_bodies(bodies: &[Value]) -> (Value, BTreeSet<String>) {
    let Some((base, rest)) = bodies.split_first() else {
        return (Value::Object(Map::new()), BTreeSet::new());
    };

    let mut merged = base.clone();
    let mut overwritten = BTreeSet::new();
    for body in rest {
        let (next, fields) = merge_two_index_bodies(&merged, body);
        merged = next;
        overwritten.extend(fields);
    }
    (merged, overwritten)
}

fn merge_two_index_bodies(base: &Value, overlay: &Value) -> (Value, BTreeSet<String>) {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    let mut overwritten = BTreeSet::new();

    let Some(overlay) = overlay.as_object() else {
        return (Value::Object(merged), overwritten);
    };

    for (key, value) in overlay {
        if key == "mappings" {
            let (mappings, overwritten_types) = merge_mappings(
                base.get("mappings").unwrap_or(&Value::Null),
                value,
            );
            merged.insert("mappings".to_string(), mappings);
            overwritten.extend(
                overwritten_types
                    .into_iter()
                    .map(|doc_type| format!("mappings.{doc_type}")),
            );
        } else {
            if base.get(key).is_some() {
                overwritten.insert(key.clone());
            }
            merged.insert(key.clone(), value.clone());
        }
    }

    (Value::Object(merged), overwritten)
}

/// Per-type merge of two `mappings` objects: each type in the overlay
/// replaces the same type in the base wholesale (a mapping definition is
/// not meaningfully splice-able below the type level).
fn merge_mappings(base: &Value, overlay: &Value) -> (Value, Vec<String>) {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    let mut overwritten = Vec::new();

    if let Some(overlay) = overlay.as_object() {
        for (doc_type, mapping) in overlay {
            if merged.contains_key(doc_type) {
                overwritten.push(doc_type.clone());
            }
            merged.insert(doc_type.clone(), mapping.clone());
        }
    }

    (Value::Object(merged), overwritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_no_bodies_make_an_empty_body() {
        let (merged, overwritten) = merge_index_bodies(&[]);
        assert_eq!(merged, json!({}));
        assert!(overwritten.is_empty());
    }

    #[test]
    fn the_one_where_a_single_body_passes_through_untouched() {
        // Unified semantics: the single-body path behaves exactly like a
        // degenerate fold, no special-cased return value.
        let body = json!({"mappings": {"record": {"properties": {}}}, "settings": {"shards": 1}});
        let (merged, overwritten) = merge_index_bodies(std::slice::from_ref(&body));
        assert_eq!(merged, body);
        assert!(overwritten.is_empty());
    }

    #[test]
    fn the_one_where_mapping_types_merge_side_by_side() {
        let a = json!({"mappings": {"record": {"properties": {"title": {}}}}});
        let b = json!({"mappings": {"author": {"properties": {"name": {}}}}});
        let (merged, overwritten) = merge_index_bodies(&[a, b]);

        assert_eq!(
            merged,
            json!({"mappings": {
                "record": {"properties": {"title": {}}},
                "author": {"properties": {"name": {}}}
            }})
        );
        assert!(overwritten.is_empty(), "disjoint types overwrite nothing");
    }

    #[test]
    fn the_one_where_the_later_body_wins_and_we_say_so() {
        let a = json!({
            "mappings": {"record": {"properties": {"title": {"type": "text"}}}},
            "settings": {"number_of_shards": 1}
        });
        let b = json!({
            "mappings": {"record": {"properties": {"title": {"type": "keyword"}}}},
            "settings": {"number_of_shards": 5}
        });
        let (merged, overwritten) = merge_index_bodies(&[a, b]);

        assert_eq!(
            merged["mappings"]["record"]["properties"]["title"]["type"],
            "keyword"
        );
        assert_eq!(merged["settings"]["number_of_shards"], 5);
        let expected: BTreeSet<String> =
            ["mappings.record".to_string(), "settings".to_string()].into();
        assert_eq!(overwritten, expected);
    }

    #[test]
    fn the_one_where_three_bodies_fold_cumulatively() {
        // The fold must accumulate: body three merges into one+two, not
        // into body one alone.
        let a = json!({"settings": {"a": 1}});
        let b = json!({"mappings": {"t": {"x": 1}}});
        let c = json!({"aliases": {"read-alias": {}}});
        let (merged, overwritten) = merge_index_bodies(&[a, b, c]);

        assert_eq!(merged["settings"]["a"], 1);
        assert_eq!(merged["mappings"]["t"]["x"], 1);
        assert!(merged["aliases"].get("read-alias").is_some());
        assert!(overwritten.is_empty());
    }

    #[test]
    fn the_one_where_overwrites_from_every_round_are_collected() {
        let a = json!({"settings": {"v": 1}});
        let b = json!({"settings": {"v": 2}, "aliases": {}});
        let c = json!({"aliases": {"x": {}}});
        let (_, overwritten) = merge_index_bodies(&[a, b, c]);

        let expected: BTreeSet<String> = ["settings".to_string(), "aliases".to_string()].into();
        assert_eq!(overwritten, expected);
    }
}
