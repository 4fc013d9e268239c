// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upstream course records as delivered by the catalog and the cart API.
//!
//! These are loosely shaped: identifiers arrive as `id` or `_id` (strings or
//! numbers) and prices as numbers, numeric strings, or garbage. Nothing here
//! is trusted until [`CartItem::from_course`](super::CartItem::from_course)
//! has normalized it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A course-like record from an external source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Document ID used by the backend when `id` is absent
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Raw price; see [`coerce_price`]
    #[serde(default)]
    pub price: Value,
    #[serde(
        rename = "priceCurrency",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub price_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Present on records coming back from the cart API
    #[serde(rename = "addedAt", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

impl Course {
    /// The identifier used for cart membership: `id`, falling back to `_id`.
    /// Blank identifiers count as missing.
    pub fn key(&self) -> Option<&str> {
        non_blank(self.id.as_deref()).or_else(|| non_blank(self.document_id.as_deref()))
    }

    /// Category, if the record carries a non-blank one.
    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Coerce an upstream price into a non-negative amount.
///
/// Numbers are taken as-is, strings are parsed after trimming (an empty
/// string is 0). Anything else, including negative or non-finite values,
/// counts as 0.
pub fn coerce_price(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        _ => 0.0,
    };

    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Accept identifiers given as strings or numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_falls_back_to_document_id() {
        let course: Course = serde_json::from_value(json!({"_id": "65f0", "title": "T"})).unwrap();
        assert_eq!(course.key(), Some("65f0"));

        let course: Course =
            serde_json::from_value(json!({"id": "c1", "_id": "65f0", "title": "T"})).unwrap();
        assert_eq!(course.key(), Some("c1"));
    }

    #[test]
    fn blank_id_is_missing() {
        let course: Course = serde_json::from_value(json!({"id": "  ", "title": "T"})).unwrap();
        assert_eq!(course.key(), None);
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let course: Course = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(course.key(), Some("42"));
    }

    #[test]
    fn coerce_price_shapes() {
        assert_eq!(coerce_price(&json!(100000)), 100000.0);
        assert_eq!(coerce_price(&json!("50000")), 50000.0);
        assert_eq!(coerce_price(&json!(" 12.5 ")), 12.5);
        assert_eq!(coerce_price(&json!("bad")), 0.0);
        assert_eq!(coerce_price(&json!("")), 0.0);
        assert_eq!(coerce_price(&json!(null)), 0.0);
        assert_eq!(coerce_price(&json!(true)), 0.0);
        assert_eq!(coerce_price(&json!(-10)), 0.0);
        assert_eq!(coerce_price(&json!("NaN")), 0.0);
    }
}
