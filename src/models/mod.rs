// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod cart;
pub mod course;
pub mod user;

pub use cart::{CartItem, CartSnapshot, DEFAULT_CURRENCY};
pub use course::Course;
pub use user::{OwnedCourse, User};
