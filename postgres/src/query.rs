//! Compilation of [`EventCriteria`] into a parameterised SQL predicate.
//!
//! Every leaf becomes a bound parameter; no tag key, tag value or event type
//! is ever spliced into the SQL text.
//!
//! | Criteria | SQL |
//! |---|---|
//! | `HasTag(k=v)` | `tags @> $n::jsonb` with `{"k":"v"}` |
//! | `TypeIn(types)` | `event_type = ANY($n)` |
//! | `All([])` / `Any([])` | `TRUE` / `FALSE` |
//! | `All(xs)` / `Any(xs)` | `(x1 AND x2 ...)` / `(x1 OR x2 ...)` |

use cinema_core::criteria::EventCriteria;
use sqlx::{Postgres, QueryBuilder};

/// Append the predicate for `criteria` to `builder`.
pub(crate) fn push_criteria(builder: &mut QueryBuilder<'_, Postgres>, criteria: &EventCriteria) {
    match criteria {
        EventCriteria::HasTag(tag) => {
            let mut object = serde_json::Map::new();
            object.insert(tag.key().to_string(), serde_json::Value::from(tag.value()));
            builder.push("tags @> ");
            builder.push_bind(serde_json::Value::Object(object));
            builder.push("::jsonb");
        }
        EventCriteria::TypeIn(types) if types.is_empty() => {
            builder.push("FALSE");
        }
        EventCriteria::TypeIn(types) => {
            builder.push("event_type = ANY(");
            builder.push_bind(types.iter().cloned().collect::<Vec<String>>());
            builder.push(")");
        }
        EventCriteria::All(children) => push_junction(builder, children, " AND ", "TRUE"),
        EventCriteria::Any(children) => push_junction(builder, children, " OR ", "FALSE"),
    }
}

fn push_junction(
    builder: &mut QueryBuilder<'_, Postgres>,
    children: &[EventCriteria],
    separator: &str,
    empty: &str,
) {
    match children {
        [] => {
            builder.push(empty);
        }
        [only] => push_criteria(builder, only),
        _ => {
            builder.push("(");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    builder.push(separator);
                }
                push_criteria(builder, child);
            }
            builder.push(")");
        }
    }
}
