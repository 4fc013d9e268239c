// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use course_cart::models::{Course, OwnedCourse, User};
use course_cart::services::{CartSettings, CartStore};
use course_cart::storage::MemoryStore;
use std::sync::Arc;

/// A course with an id, price and category.
#[allow(dead_code)]
pub fn course(id: &str, price: serde_json::Value, category: &str) -> Course {
    Course {
        id: Some(id.to_string()),
        title: format!("Course {}", id),
        price,
        category: Some(category.to_string()),
        ..Course::default()
    }
}

/// A course in the "AI" category priced 100000.
#[allow(dead_code)]
pub fn simple_course(id: &str) -> Course {
    course(id, serde_json::json!(100000), "AI")
}

/// A user owning the given course ids.
#[allow(dead_code)]
pub fn user_owning(ids: &[&str]) -> User {
    User {
        id: Some("u1".to_string()),
        purchased_courses: ids
            .iter()
            .map(|id| OwnedCourse::Id(id.to_string()))
            .collect(),
        ..User::default()
    }
}

/// Build a cart over `store` with default settings.
#[allow(dead_code)]
pub fn cart_over(store: &MemoryStore) -> CartStore {
    CartStore::new(Arc::new(store.clone()), CartSettings::default())
}

/// Item ids in cart order.
#[allow(dead_code)]
pub fn cart_ids(cart: &CartStore) -> Vec<String> {
    cart.items().map(|item| item.id.clone()).collect()
}
