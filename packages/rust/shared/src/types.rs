//! Core domain types for footprint audits.
//!
//! Oracle output is schema-free JSON. It is lifted into a [`ProfileFragment`]:
//! list sections keyed by [`Category`] (known categories plus an opaque
//! [`Category::Other`] escape hatch) and top-level scalar fields. The
//! accumulated, deduplicated result of an audit is a [`Profile`].

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Scalar field holding the audited site's root URL.
pub const PORTFOLIO_URL: &str = "portfolio_url";

/// Field map backing a single item.
pub type FieldMap = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A list section of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Projects,
    Experience,
    CodeReviews,
    Education,
    /// Any list section the core has no special knowledge of.
    Other(String),
}

impl Category {
    /// Map a JSON key onto a category.
    pub fn from_key(key: &str) -> Self {
        match key {
            "projects" => Self::Projects,
            "experience" => Self::Experience,
            "code_reviews" => Self::CodeReviews,
            "education" => Self::Education,
            other => Self::Other(other.to_string()),
        }
    }

    /// The JSON key for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Projects => "projects",
            Self::Experience => "experience",
            Self::CodeReviews => "code_reviews",
            Self::Education => "education",
            Self::Other(key) => key,
        }
    }

    /// Fields whose normalized values form an item's identity key.
    pub fn identity_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Projects | Self::Experience | Self::Other(_) => &["title"],
            Self::CodeReviews => &["file_name"],
            Self::Education => &["degree", "institution"],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One semi-structured record (a project, a role, a code review...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(pub FieldMap);

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value if it is a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.0
    }

    pub fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.0
    }
}

impl From<FieldMap> for Item {
    fn from(map: FieldMap) -> Self {
        Self(map)
    }
}

/// `null`, blank strings, and empty arrays/objects carry no information.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// One classified top-level entry of an oracle payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// A list of records.
    Items(Vec<Item>),
    /// A scalar (or list of primitives) such as `portfolio_url` or `skills`.
    Scalar(Value),
}

/// A partial profile produced by processing one URL (or one batch).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFragment {
    pub sections: BTreeMap<Category, Vec<Item>>,
    pub scalars: BTreeMap<String, Value>,
}

impl ProfileFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty) && self.scalars.is_empty()
    }

    /// Total number of items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    /// Insert a classified section under `key`, combining additively with
    /// anything already present.
    pub fn insert(&mut self, key: &str, section: Section) {
        match section {
            Section::Items(items) => self.push_items(Category::from_key(key), items),
            Section::Scalar(value) => self.set_scalar(key, value),
        }
    }

    /// Append items to a category.
    pub fn push_items(&mut self, category: Category, items: Vec<Item>) {
        if items.is_empty() {
            return;
        }
        self.sections.entry(category).or_default().extend(items);
    }

    /// Set a scalar unless a non-empty one is already present.
    /// Primitive lists are concatenated instead.
    pub fn set_scalar(&mut self, key: &str, value: Value) {
        if is_empty_value(&value) {
            return;
        }
        match self.scalars.get_mut(key) {
            Some(Value::Array(existing)) => {
                if let Value::Array(incoming) = value {
                    existing.extend(incoming);
                }
            }
            Some(existing) if !is_empty_value(existing) => {}
            _ => {
                self.scalars.insert(key.to_string(), value);
            }
        }
    }

    /// Additive combination used for batch aggregation: lists concatenated,
    /// scalars first-wins. No deduplication happens here.
    pub fn absorb(&mut self, other: ProfileFragment) {
        for (category, items) in other.sections {
            self.push_items(category, items);
        }
        for (key, value) in other.scalars {
            self.set_scalar(&key, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// The accumulated, deduplicated record of one audit.
///
/// Serializes to a flat JSON object: scalar fields plus one array per
/// category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub sections: BTreeMap<Category, Vec<Item>>,
    pub scalars: BTreeMap<String, Value>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items of one category (empty slice if none).
    pub fn items(&self, category: &Category) -> &[Item] {
        self.sections.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn scalar(&self, key: &str) -> Option<&Value> {
        self.scalars.get(key)
    }

    pub fn portfolio_url(&self) -> Option<&str> {
        self.scalar(PORTFOLIO_URL).and_then(Value::as_str)
    }

    /// Total number of items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    /// Render as a JSON object.
    pub fn to_value(&self) -> Value {
        let mut map = FieldMap::new();
        for (key, value) in &self.scalars {
            map.insert(key.clone(), value.clone());
        }
        for (category, items) in &self.sections {
            let items = items.iter().map(|i| Value::Object(i.0.clone())).collect();
            map.insert(category.as_str().to_string(), Value::Array(items));
        }
        Value::Object(map)
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.scalars.len() + self.sections.len()))?;
        for (key, value) in &self.scalars {
            map.serialize_entry(key, value)?;
        }
        for (category, items) in &self.sections {
            map.serialize_entry(category.as_str(), items)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// A visible anchor found on a page, resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

impl Link {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_keys_roundtrip() {
        for key in ["projects", "experience", "code_reviews", "education", "skills"] {
            assert_eq!(Category::from_key(key).as_str(), key);
        }
        assert_eq!(Category::from_key("awards"), Category::Other("awards".into()));
        assert_eq!(Category::CodeReviews.identity_fields(), &["file_name"]);
    }

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("  ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn absorb_concatenates_lists_and_keeps_first_scalar() {
        let mut a = ProfileFragment::new();
        a.push_items(Category::Projects, vec![Item::new().with("title", "A")]);
        a.set_scalar("bio", json!("first"));
        a.set_scalar("skills", json!(["Rust"]));

        let mut b = ProfileFragment::new();
        b.push_items(Category::Projects, vec![Item::new().with("title", "A")]);
        b.set_scalar("bio", json!("second"));
        b.set_scalar("skills", json!(["Go"]));

        a.absorb(b);
        assert_eq!(a.sections[&Category::Projects].len(), 2);
        assert_eq!(a.scalars["bio"], json!("first"));
        assert_eq!(a.scalars["skills"], json!(["Rust", "Go"]));
    }

    #[test]
    fn profile_serializes_flat() {
        let mut profile = Profile::new();
        profile
            .scalars
            .insert(PORTFOLIO_URL.into(), json!("https://me.dev"));
        profile.sections.insert(
            Category::Projects,
            vec![Item::new().with("title", "Portfolio Site")],
        );

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value, profile.to_value());
        assert_eq!(value["portfolio_url"], "https://me.dev");
        assert_eq!(value["projects"][0]["title"], "Portfolio Site");
        assert_eq!(profile.portfolio_url(), Some("https://me.dev"));
    }
}
