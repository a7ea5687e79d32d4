//! Event tags used for stream selection.
//!
//! A tag is a key/value label carried next to an event's payload. Tags are
//! never interpreted by the domain logic; they exist so that an event store can
//! select "all events about seat `1:2`" or "all events about screening `s-1`"
//! without decoding payloads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `Tag` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid tag: {0}")]
pub struct ParseTagError(String);

/// A single key/value label on an event.
///
/// # Examples
///
/// ```
/// use cinema_core::tag::Tag;
///
/// let tag = Tag::new("seatId", "1:2");
/// assert_eq!(tag.key(), "seatId");
/// assert_eq!(tag.value(), "1:2");
/// assert_eq!(tag.to_string(), "seatId=1:2");
///
/// let parsed: Tag = "screeningId=s-1".parse().unwrap();
/// assert_eq!(parsed, Tag::new("screeningId", "s-1"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Create a new tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The tag key (e.g. `"seatId"`).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The tag value (e.g. `"1:2"`).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for Tag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(ParseTagError(format!("expected `key=value`, got `{s}`"))),
        }
    }
}

/// The set of tags carried by one event.
///
/// Keys are unique; inserting a tag with an existing key replaces its value.
/// Backed by a `BTreeMap` so iteration order, `Display` and JSON encoding
/// are deterministic.
///
/// Serializes as a flat JSON object:
///
/// ```
/// use cinema_core::tag::{Tag, Tags};
///
/// let tags = Tags::from([Tag::new("seatId", "1:2"), Tag::new("screeningId", "s-1")]);
/// let json = serde_json::to_string(&tags).unwrap();
/// assert_eq!(json, r#"{"screeningId":"s-1","seatId":"1:2"}"#);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Create an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a tag, replacing any previous value under the same key.
    pub fn insert(&mut self, tag: Tag) {
        self.0.insert(tag.key, tag.value);
    }

    /// Look up the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether this set carries exactly this key/value pair.
    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        self.get(tag.key()) == Some(tag.value())
    }

    /// Iterate over the tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().map(|(k, v)| Tag::new(k.as_str(), v.as_str()))
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a JSON object (the persisted form).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<const N: usize> From<[Tag; N]> for Tags {
    fn from(tags: [Tag; N]) -> Self {
        tags.into_iter().collect()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "]")
    }
}
