//! Profile merge engine.
//!
//! Folds [`ProfileFragment`]s into a running [`Profile`]. Items are matched
//! per category by an identity key built from the category's matching
//! fields; matched items are reconciled field by field:
//!
//! - a field missing or empty on the existing item takes the incoming value
//! - two strings: the longer one wins (equal lengths: the greater one)
//! - two lists: set union
//! - anything else: the existing value stays (first-seen wins)
//!
//! Items are normalized on entry (empty fields dropped, list repeats
//! removed). Items without any populated matching field get a content-derived
//! synthetic key, so they are never dropped and re-merging the same item is
//! still a no-op. Top-level scalars are first-writer-wins.
//!
//! Raw oracle JSON enters through [`fragment_from_value`], which peels the
//! wrapper keys the extraction side is known to emit.

use std::collections::HashMap;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use footprint_shared::{
    Category, FieldMap, Item, Profile, ProfileFragment, Section, is_empty_value,
};

/// Keys that wrap the real category map in some oracle responses.
const WRAPPER_KEYS: &[&str] = &["sections", "extract_data", "extracted_data"];

/// Guard against pathologically nested wrappers.
const MAX_WRAPPER_DEPTH: usize = 8;

/// Prefix of synthetic keys; identity keys only contain `[a-z0-9|]`.
const SYNTHETIC_PREFIX: &str = "~anon:";

/// Counts reported by a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Items appended as new entries.
    pub added: usize,
    /// Items folded into an existing entry.
    pub merged: usize,
    /// Scalars newly set.
    pub scalars_set: usize,
}

// ---------------------------------------------------------------------------
// Identity keys
// ---------------------------------------------------------------------------

/// Lower-case and strip everything but ASCII letters and digits.
pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Identity key of `item`: normalized matching fields joined with `|`,
/// empty segments dropped. `None` if every matching field is empty.
pub fn identity_key(item: &Item, fields: &[&str]) -> Option<String> {
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|f| item.get(f))
        .map(|v| match v {
            Value::String(s) => normalize_key(s),
            Value::Null => String::new(),
            other => normalize_key(&other.to_string()),
        })
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

/// Stable key for an item with no identity: a digest of its content.
fn synthetic_key(item: &Item) -> String {
    // serde_json maps are ordered, so serialization is canonical.
    let canonical = Value::Object(item.fields().clone()).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{SYNTHETIC_PREFIX}{digest:x}")
}

fn key_of(item: &Item, fields: &[&str]) -> String {
    identity_key(item, fields).unwrap_or_else(|| synthetic_key(item))
}

// ---------------------------------------------------------------------------
// Field reconciliation
// ---------------------------------------------------------------------------

/// Drop empty fields and repeated list entries.
pub fn normalize_item(item: Item) -> Item {
    let fields: FieldMap = item
        .0
        .into_iter()
        .filter(|(_, value)| !is_empty_value(value))
        .map(|(field, value)| (field, dedup_list(value)))
        .collect();
    Item::from(fields)
}

fn dedup_list(value: Value) -> Value {
    match value {
        Value::Array(values) => {
            let mut unique = Vec::with_capacity(values.len());
            union_into(&mut unique, values);
            Value::Array(unique)
        }
        other => other,
    }
}

/// Fold `incoming` into `existing` field by field.
pub fn merge_fields(existing: &mut Item, incoming: Item) {
    for (field, value) in incoming.0 {
        if is_empty_value(&value) {
            continue;
        }
        let value = dedup_list(value);

        let fields = existing.fields_mut();
        let Some(current) = fields.get_mut(&field) else {
            fields.insert(field, value);
            continue;
        };
        if is_empty_value(current) {
            *current = value;
            continue;
        }

        match (current, value) {
            (Value::String(cur), Value::String(new)) => {
                if prefer_text(&new, cur) {
                    *cur = new;
                }
            }
            (Value::Array(cur), Value::Array(new)) => union_into(cur, new),
            (cur, new) => {
                // First-seen wins for non-text scalars and mismatched types.
                if *cur != new {
                    debug!(%field, kept = %cur, dropped = %new, "conflicting value ignored");
                }
            }
        }
    }
}

/// Longer text wins; ties go to the lexicographically greater string so the
/// outcome does not depend on arrival order.
fn prefer_text(candidate: &str, current: &str) -> bool {
    let (a, b) = (candidate.chars().count(), current.chars().count());
    a > b || (a == b && candidate > current)
}

/// Set union preserving first-seen order.
fn union_into(current: &mut Vec<Value>, incoming: Vec<Value>) {
    for value in incoming {
        if !current.contains(&value) {
            current.push(value);
        }
    }
}

// ---------------------------------------------------------------------------
// List and profile merging
// ---------------------------------------------------------------------------

/// Merge `incoming` items into `existing`, deduplicating by identity key.
pub fn merge_items(existing: &mut Vec<Item>, incoming: Vec<Item>, fields: &[&str]) -> MergeStats {
    let mut stats = MergeStats::default();
    let mut index: HashMap<String, usize> = HashMap::with_capacity(existing.len());
    for (i, item) in existing.iter().enumerate() {
        index.entry(key_of(item, fields)).or_insert(i);
    }

    for item in incoming {
        let item = normalize_item(item);
        if item.fields().is_empty() {
            continue;
        }
        let key = key_of(&item, fields);
        match index.get(&key) {
            Some(&i) => {
                merge_fields(&mut existing[i], item);
                stats.merged += 1;
            }
            None => {
                index.insert(key, existing.len());
                existing.push(item);
                stats.added += 1;
            }
        }
    }

    stats
}

/// Set a top-level scalar if absent. Primitive lists are unioned.
fn merge_scalar(profile: &mut Profile, key: String, value: Value) -> bool {
    if is_empty_value(&value) {
        return false;
    }
    match profile.scalars.get_mut(&key) {
        Some(Value::Array(current)) => {
            if let Value::Array(new) = value {
                let before = current.len();
                union_into(current, new);
                return current.len() > before;
            }
            false
        }
        Some(current) if !is_empty_value(current) => false,
        _ => {
            profile.scalars.insert(key, dedup_list(value));
            true
        }
    }
}

/// Fold a fragment into the profile.
pub fn merge_profile(profile: &mut Profile, fragment: ProfileFragment) -> MergeStats {
    let mut stats = MergeStats::default();

    for (key, value) in fragment.scalars {
        if merge_scalar(profile, key, value) {
            stats.scalars_set += 1;
        }
    }

    for (category, items) in fragment.sections {
        if items.is_empty() {
            continue;
        }
        let fields = category.identity_fields();
        let existing = profile.sections.entry(category.clone()).or_default();
        let s = merge_items(existing, items, fields);
        if existing.is_empty() {
            profile.sections.remove(&category);
        }
        stats.added += s.added;
        stats.merged += s.merged;
    }

    stats
}

/// Fold raw oracle JSON into the profile.
pub fn merge_value(profile: &mut Profile, value: Value) -> MergeStats {
    merge_profile(profile, fragment_from_value(value))
}

// ---------------------------------------------------------------------------
// Structural normalization
// ---------------------------------------------------------------------------

/// Lift arbitrary oracle JSON into a fragment.
///
/// Non-object payloads yield an empty fragment. Wrapper keys are peeled
/// (sibling keys are kept unless the wrapped map defines them too), then
/// every top-level entry is classified with [`classify_section`].
pub fn fragment_from_value(value: Value) -> ProfileFragment {
    let mut fragment = ProfileFragment::new();
    let Value::Object(map) = value else {
        if !value.is_null() {
            warn!(kind = value_kind(&value), "ignoring non-object fragment");
        }
        return fragment;
    };

    for (key, value) in peel_wrappers(map) {
        if let Some(section) = classify_section(&key, value) {
            fragment.insert(&key, section);
        }
    }
    fragment
}

fn peel_wrappers(mut map: FieldMap) -> FieldMap {
    for _ in 0..MAX_WRAPPER_DEPTH {
        let Some(wrapper) = WRAPPER_KEYS
            .iter()
            .find(|k| matches!(map.get(**k), Some(Value::Object(_))))
        else {
            break;
        };
        let Some(Value::Object(mut inner)) = map.remove(*wrapper) else {
            break;
        };
        for (k, v) in map {
            inner.entry(k).or_insert(v);
        }
        map = inner;
    }
    map
}

/// Decide whether a top-level entry is a list of items or a scalar.
///
/// - arrays containing objects → items (non-object elements are dropped)
/// - arrays of primitives → scalar list
/// - a lone object under a known category → one item
/// - other objects → opaque scalar
/// - empty values → `None`
pub fn classify_section(key: &str, value: Value) -> Option<Section> {
    if is_empty_value(&value) {
        return None;
    }
    match value {
        Value::Array(values) if values.iter().any(Value::is_object) => {
            let total = values.len();
            let items: Vec<Item> = values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(Item::from(map)),
                    _ => None,
                })
                .collect();
            if items.len() < total {
                warn!(%key, dropped = total - items.len(), "non-object entries in item list");
            }
            Some(Section::Items(items))
        }
        Value::Object(map) if !matches!(Category::from_key(key), Category::Other(_)) => {
            Some(Section::Items(vec![Item::from(map)]))
        }
        other => Some(Section::Scalar(other)),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
