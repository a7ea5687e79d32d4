//! Event criteria: the selection expression behind a consistency boundary.
//!
//! An [`EventCriteria`] is a small boolean expression tree. Its leaves test a
//! single tag for equality or the event type for membership in a set; inner
//! nodes combine children with AND ([`EventCriteria::All`]) or OR
//! ([`EventCriteria::Any`]).
//!
//! The expression is a plain value. It is built fresh for every command,
//! handed to the event store to source events, and handed back to the store
//! as the append condition. It is never persisted.
//!
//! # Example
//!
//! ```
//! use cinema_core::criteria::EventCriteria;
//! use cinema_core::tag::{Tag, Tags};
//!
//! // seat 1:1 OR seat 1:2, each restricted to seat lifecycle events
//! let seats = EventCriteria::either(["1:1", "1:2"].map(|seat| {
//!     EventCriteria::having_tag(Tag::new("seatId", seat))
//!         .and_being_one_of_types(["SeatPlaced", "SeatBlocked"])
//! }));
//!
//! let seat_2 = Tags::from([Tag::new("seatId", "1:2")]);
//! assert!(seats.matches("SeatPlaced", &seat_2));
//!
//! let seat_3 = Tags::from([Tag::new("seatId", "1:3")]);
//! assert!(!seats.matches("SeatPlaced", &seat_3));
//! ```

use crate::tag::{Tag, Tags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Boolean expression selecting events by tag and type.
///
/// # Semantics
///
/// - `HasTag(tag)`: the event carries exactly this key/value pair
/// - `TypeIn(types)`: the event type is one of `types` (an empty set matches nothing)
/// - `All(children)`: every child matches (an empty list matches everything)
/// - `Any(children)`: at least one child matches (an empty list matches nothing)
///
/// The "empty `Any` matches nothing" rule means a disjunction built from an
/// empty collection can never widen into "every event in the log".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCriteria {
    /// Tag equality.
    HasTag(Tag),
    /// Event type membership.
    TypeIn(BTreeSet<String>),
    /// Conjunction.
    All(Vec<EventCriteria>),
    /// Disjunction.
    Any(Vec<EventCriteria>),
}

impl EventCriteria {
    /// Criteria matching every event. Useful for diagnostics and tests only;
    /// command handlers should always resolve a narrower boundary.
    #[must_use]
    pub const fn any_event() -> Self {
        Self::All(Vec::new())
    }

    /// Criteria matching no event at all.
    #[must_use]
    pub const fn no_event() -> Self {
        Self::Any(Vec::new())
    }

    /// Events carrying `tag`.
    #[must_use]
    pub const fn having_tag(tag: Tag) -> Self {
        Self::HasTag(tag)
    }

    /// Events carrying *all* of `tags`.
    #[must_use]
    pub fn having_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut leaves: Vec<Self> = tags.into_iter().map(Self::HasTag).collect();
        if leaves.len() == 1 {
            leaves.remove(0)
        } else {
            Self::All(leaves)
        }
    }

    /// Events whose type is one of `types`.
    #[must_use]
    pub fn of_types<S: Into<String>>(types: impl IntoIterator<Item = S>) -> Self {
        Self::TypeIn(types.into_iter().map(Into::into).collect())
    }

    /// Restrict this expression to the given event types.
    ///
    /// Tag matches should always be narrowed this way: two unrelated event
    /// types may well carry an identical tag value.
    #[must_use]
    pub fn and_being_one_of_types<S: Into<String>>(self, types: impl IntoIterator<Item = S>) -> Self {
        self.and(Self::of_types(types))
    }

    /// Conjunction of `self` and `other`, flattening nested `All` nodes.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut children = match self {
            Self::All(children) => children,
            single => vec![single],
        };
        match other {
            Self::All(more) => children.extend(more),
            single => children.push(single),
        }
        Self::All(children)
    }

    /// Disjunction of `self` and `other`, flattening nested `Any` nodes.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut children = match self {
            Self::Any(children) => children,
            single => vec![single],
        };
        match other {
            Self::Any(more) => children.extend(more),
            single => children.push(single),
        }
        Self::Any(children)
    }

    /// Disjunction of every criteria in `criteria`.
    ///
    /// An empty input yields [`EventCriteria::no_event`].
    #[must_use]
    pub fn either(criteria: impl IntoIterator<Item = Self>) -> Self {
        criteria
            .into_iter()
            .fold(Self::no_event(), |acc, next| acc.or(next))
    }

    /// Evaluate the expression against one event.
    #[must_use]
    pub fn matches(&self, event_type: &str, tags: &Tags) -> bool {
        match self {
            Self::HasTag(tag) => tags.contains(tag),
            Self::TypeIn(types) => types.contains(event_type),
            Self::All(children) => children.iter().all(|c| c.matches(event_type, tags)),
            Self::Any(children) => children.iter().any(|c| c.matches(event_type, tags)),
        }
    }

    /// Every tag mentioned anywhere in the expression, deduplicated.
    #[must_use]
    pub fn referenced_tags(&self) -> BTreeSet<Tag> {
        let mut out = BTreeSet::new();
        self.collect_tags(&mut out);
        out
    }

    /// Whether the expression can never match any event.
    ///
    /// Conservative: `true` is only reported for structurally empty
    /// disjunctions and type sets.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Self::HasTag(_) => false,
            Self::TypeIn(types) => types.is_empty(),
            Self::All(children) => children.iter().any(Self::is_unsatisfiable),
            Self::Any(children) => children.iter().all(Self::is_unsatisfiable),
        }
    }

    fn collect_tags(&self, out: &mut BTreeSet<Tag>) {
        match self {
            Self::HasTag(tag) => {
                out.insert(tag.clone());
            }
            Self::TypeIn(_) => {}
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_tags(out);
                }
            }
        }
    }
}

impl fmt::Display for EventCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasTag(tag) => write!(f, "{tag}"),
            Self::TypeIn(types) => {
                write!(f, "type in {{")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "}}")
            }
            Self::All(children) if children.is_empty() => write!(f, "TRUE"),
            Self::Any(children) if children.is_empty() => write!(f, "FALSE"),
            Self::All(children) => write_joined(f, children, " AND "),
            Self::Any(children) => write_joined(f, children, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[EventCriteria], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
