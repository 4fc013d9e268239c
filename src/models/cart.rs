// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cart line items and the snapshot handed to subscribers.

use crate::models::course::{coerce_price, Course};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Currency assumed when neither the course nor the caller supplies one.
pub const DEFAULT_CURRENCY: &str = "UZS";

/// One course a visitor intends to buy.
///
/// This is the persisted shape: a JSON array of these lives under the cart
/// storage key and is what the cart API receives. Reading goes through
/// [`Course`], so stored entries get the same id fallback and price coercion
/// as fresh input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Course")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CartItem {
    pub id: String,
    pub title: String,
    /// Non-negative amount; unreadable stored values load as 0
    pub price: f64,
    pub price_currency: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(optional))]
    pub slug: Option<String>,
    /// Insertion time (RFC3339, millisecond precision)
    pub added_at: String,
}

impl TryFrom<Course> for CartItem {
    type Error = String;

    /// Rebuild a stored item. Only a missing identifier is an error.
    fn try_from(course: Course) -> Result<Self, Self::Error> {
        let added_at = course.added_at.clone().unwrap_or_default();
        Self::from_course(&course, DEFAULT_CURRENCY, added_at)
            .ok_or_else(|| "cart item has no id".to_string())
    }
}

impl CartItem {
    /// Normalize an upstream course into a cart item.
    ///
    /// Returns `None` when the course has no usable identifier.
    pub fn from_course(course: &Course, default_currency: &str, added_at: String) -> Option<Self> {
        let id = course.key()?.to_string();

        let price_currency = course
            .price_currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default_currency)
            .to_string();

        Some(Self {
            id,
            title: course.title.clone(),
            price: coerce_price(&course.price),
            price_currency,
            category: course.category().unwrap_or_default().to_string(),
            slug: course
                .slug
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
            added_at,
        })
    }

    /// Normalize a course returned by the cart API, keeping its `addedAt`
    /// when the server sent one.
    pub fn from_remote(course: &Course, default_currency: &str) -> Option<Self> {
        let added_at = course
            .added_at
            .clone()
            .unwrap_or_else(crate::time_utils::now_timestamp);
        Self::from_course(course, default_currency, added_at)
    }
}

/// What subscribers see after every cart change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CartSnapshot {
    /// Items excluding already-owned courses, in insertion order
    pub items: Vec<CartItem>,
    pub count: usize,
    pub total: f64,
}
