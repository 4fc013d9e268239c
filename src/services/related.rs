// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Related-course suggestions.

use crate::models::Course;
use std::collections::HashSet;

/// Number of suggestions shown when the caller has no preference.
pub const DEFAULT_RELATED_LIMIT: usize = 4;

/// Pick up to `limit` courses to suggest next to `current`.
///
/// Candidates are never `current` itself, never already in the cart
/// (`in_cart`), and must have an identifier. Same-category candidates come
/// first, then any other candidates backfill the remaining slots. Both tiers
/// keep the pool's order.
pub fn related_courses<'a>(
    current: &Course,
    pool: &'a [Course],
    in_cart: &HashSet<&str>,
    limit: usize,
) -> Vec<&'a Course> {
    if limit == 0 {
        return Vec::new();
    }

    let current_key = current.key();
    let current_category = current.category();

    let mut picked: Vec<&'a Course> = Vec::with_capacity(limit);
    let mut chosen: HashSet<&'a str> = HashSet::new();

    // Same category first
    if let Some(category) = current_category {
        for course in pool {
            if picked.len() == limit {
                return picked;
            }
            if course.category() != Some(category) {
                continue;
            }
            if let Some(key) = eligible(course, current_key, in_cart) {
                if chosen.insert(key) {
                    picked.push(course);
                }
            }
        }
    }

    // Backfill with anything else
    for course in pool {
        if picked.len() == limit {
            break;
        }
        if let Some(key) = eligible(course, current_key, in_cart) {
            if chosen.insert(key) {
                picked.push(course);
            }
        }
    }

    picked
}

/// Identifier of `course` if it may be suggested.
fn eligible<'c>(
    course: &'c Course,
    current_key: Option<&str>,
    in_cart: &HashSet<&str>,
) -> Option<&'c str> {
    course
        .key()
        .filter(|key| Some(*key) != current_key && !in_cart.contains(key))
}
