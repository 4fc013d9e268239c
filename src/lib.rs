// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Course-Cart: the cart layer of an e-learning storefront
//!
//! This crate keeps a visitor's course cart in a local key-value store,
//! filters out courses the signed-in user already owns, merges with the
//! server-held cart at login, and pushes changes to the remote cart API in
//! the background.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::{CartStore, Storefront};
