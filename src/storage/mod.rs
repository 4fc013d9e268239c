// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local key-value storage (the browser `localStorage` equivalent).

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// String-keyed, string-valued persistent store.
///
/// Implementations must tolerate concurrent readers; the cart itself is the
/// only writer of its key.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Storage key names as constants.
pub mod keys {
    pub const CART: &str = "cart";
    pub const USER: &str = "user";
    pub const TOKEN: &str = "token";
    /// Where checkout asks to be sent back to after login
    pub const RETURN_AFTER_LOGIN: &str = "returnAfterLogin";
}
