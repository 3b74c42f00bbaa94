//! user supplied tags
//!
//! Tags arrive as a flat JSON object of strings. Anything else (nested objects, arrays, numbers, `null`, repeated
//! keys) is rejected before a single file is read.
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::BTreeMap;

/// Tag key to tag value, ordered by key (byte order)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn from_json(source: &str) -> Result<Self, TagSetError> {
        serde_json::from_str(source).map_err(TagSetError::Shape)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the tags as HCL object literal
    ///
    /// Sorted by key, no whitespace, no trailing comma. Keys and values are HCL quoted strings.
    ///
    /// ```
    /// let tags = terratag::tag_set::TagSet::from_json(r#"{"team":"x","env":"prod"}"#).unwrap();
    /// assert_eq!(tags.to_hcl_literal(), r#"{"env"="prod","team"="x"}"#);
    /// ```
    pub fn to_hcl_literal(&self) -> String {
        let pairs: Vec<String> = self
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    crate::quoting::quoted(key),
                    crate::quoting::quoted(value)
                )
            })
            .collect();

        format!("{{{}}}", pairs.join(","))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TagSetVisitor)
    }
}

struct TagSetVisitor;

impl<'de> Visitor<'de> for TagSetVisitor {
    type Value = TagSet;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a flat object of string values")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut tags = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, String>()? {
            if tags.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate tag key `{key}`")));
            }
            tags.insert(key, value);
        }

        Ok(TagSet(tags))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TagSetError {
    #[error("tags must be a flat JSON object of strings")]
    Shape(#[source] serde_json::Error),
}
