// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cart store: the visitor's course cart, persisted locally and reconciled
//! with the signed-in user's purchases.
//!
//! Handles:
//! - Idempotent add/remove/clear with a full write to storage on every change
//! - Evicting courses the user already owns (matched by id or slug)
//! - Login-time merge with the server-held cart
//! - Change notifications to subscribers
//! - Queuing remote writes on the sync outbox when a session token is set

use crate::config::Config;
use crate::models::{CartItem, CartSnapshot, Course, User, DEFAULT_CURRENCY};
use crate::services::outbox::{OutboxHandle, SyncOp};
use crate::services::related::related_courses;
use crate::storage::{keys, KeyValueStore};
use crate::time_utils::now_timestamp;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Callback invoked with the new state after every change.
pub type Subscriber = Box<dyn Fn(&CartSnapshot) + Send>;

/// Token returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Settings the cart needs from application config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSettings {
    /// Storage key holding the serialized item list
    pub storage_key: String,
    /// Currency for courses that don't carry one
    pub default_currency: String,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            storage_key: keys::CART.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl From<&Config> for CartSettings {
    fn from(config: &Config) -> Self {
        Self {
            storage_key: config.cart_storage_key.clone(),
            default_currency: config.default_currency.clone(),
        }
    }
}

/// The cart. One instance per local store, constructed once and passed to
/// whatever needs it.
pub struct CartStore {
    storage: Arc<dyn KeyValueStore>,
    settings: CartSettings,
    items: Vec<CartItem>,
    user: Option<User>,
    token: Option<String>,
    outbox: Option<OutboxHandle>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl CartStore {
    /// Create a cart hydrated from storage.
    ///
    /// Unreadable or malformed stored data yields an empty cart.
    pub fn new(storage: Arc<dyn KeyValueStore>, settings: CartSettings) -> Self {
        let items = load_items(storage.as_ref(), &settings.storage_key);
        tracing::debug!(count = items.len(), "Cart hydrated from storage");

        Self {
            storage,
            settings,
            items,
            user: None,
            token: None,
            outbox: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    // ─── Mutations ───────────────────────────────────────────────

    /// Add a course.
    ///
    /// Ignored when the course has no identifier, is already owned by the
    /// current user, or is already in the cart. Returns whether it was added.
    pub fn add_item(&mut self, course: &Course) -> bool {
        let Some(item) =
            CartItem::from_course(course, &self.settings.default_currency, now_timestamp())
        else {
            tracing::debug!(title = %course.title, "Ignoring course without identifier");
            return false;
        };

        if self.is_owned(&item) {
            tracing::debug!(course_id = %item.id, "Course already purchased, not adding");
            return false;
        }

        if self.items.iter().any(|existing| existing.id == item.id) {
            return false;
        }

        tracing::info!(course_id = %item.id, "Added course to cart");
        self.items.push(item);
        self.commit();
        true
    }

    /// Remove the item with `course_id`. Returns whether anything was removed.
    pub fn remove_item(&mut self, course_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != course_id);
        if self.items.len() == before {
            return false;
        }

        tracing::info!(course_id, "Removed course from cart");
        self.commit();
        true
    }

    /// Empty the cart and delete the persisted copy.
    pub fn clear(&mut self) {
        self.items.clear();
        if let Err(e) = self.storage.remove(&self.settings.storage_key) {
            tracing::warn!(error = %e, "Failed to remove persisted cart");
        }
        tracing::info!("Cart cleared");
        self.notify();
        self.enqueue(SyncOp::Clear);
    }

    /// Re-read the persisted cart, discarding in-memory state.
    ///
    /// Owned courses found in storage are evicted and the result synced, the
    /// same as for [`set_user`](Self::set_user).
    pub fn reload(&mut self) {
        self.items = load_items(self.storage.as_ref(), &self.settings.storage_key);
        let evicted = self.evict_owned();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted purchased courses from reloaded cart");
            self.commit();
        } else {
            self.notify();
        }
    }

    /// Update the user whose purchases filter the cart.
    ///
    /// Owned courses are evicted from the cart and from storage, so they do
    /// not come back after a later logout.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
        let evicted = self.evict_owned();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted purchased courses from cart");
            self.commit();
        }
    }

    /// Update both the user and the session token used for remote sync.
    pub fn set_session(&mut self, user: Option<User>, token: Option<String>) {
        self.token = token;
        self.set_user(user);
    }

    /// Start a session whose server cart has not been merged yet.
    ///
    /// Like [`set_session`](Self::set_session), but evictions are only
    /// persisted and announced locally. Nothing is queued for the new token
    /// until [`merge_remote`](Self::merge_remote) produces the merged cart, so
    /// the server cart cannot be overwritten before it is read.
    pub fn begin_session(&mut self, user: User, token: String) {
        self.token = Some(token);
        self.user = Some(user);
        let evicted = self.evict_owned();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted purchased courses ahead of merge");
            self.persist();
            self.notify();
        }
    }

    /// Route future changes to the sync outbox (or stop doing so).
    pub fn attach_outbox(&mut self, outbox: Option<OutboxHandle>) {
        self.outbox = outbox;
    }

    /// Merge a server-held cart into the local one.
    ///
    /// The result is the union on `id`: server items first in server order,
    /// then local items the server does not have, in local order. When both
    /// sides hold the same id the local record wins but keeps the server
    /// position. Owned courses are evicted afterwards.
    pub fn merge_remote(&mut self, server_items: Vec<CartItem>) {
        let local = std::mem::take(&mut self.items);
        let local_count = local.len();
        self.items = merge_items(server_items, local);
        self.evict_owned();

        tracing::info!(
            local = local_count,
            merged = self.items.len(),
            "Merged server cart"
        );
        self.commit();
    }

    // ─── Queries ─────────────────────────────────────────────────

    /// Items not owned by the current user, in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(move |item| !self.is_owned(item))
    }

    /// Sum of prices over [`items`](Self::items).
    pub fn total(&self) -> f64 {
        self.items().map(|item| item.price).sum()
    }

    /// Number of [`items`](Self::items).
    pub fn count(&self) -> usize {
        self.items().count()
    }

    /// Whether `course_id` is among [`items`](Self::items).
    pub fn contains(&self, course_id: &str) -> bool {
        self.items().any(|item| item.id == course_id)
    }

    /// Suggest up to `limit` courses from `pool` to show next to `current`,
    /// skipping anything already in the cart.
    pub fn related<'a>(&self, current: &Course, pool: &'a [Course], limit: usize) -> Vec<&'a Course> {
        let in_cart: HashSet<&str> = self.items().map(|item| item.id.as_str()).collect();
        related_courses(current, pool, &in_cart, limit)
    }

    /// Current state as handed to subscribers.
    pub fn snapshot(&self) -> CartSnapshot {
        let items: Vec<CartItem> = self.items().cloned().collect();
        CartSnapshot {
            count: items.len(),
            total: items.iter().map(|item| item.price).sum(),
            items,
        }
    }

    /// The user currently filtering the cart.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    // ─── Subscriptions ───────────────────────────────────────────

    /// Register a callback run after every change.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&CartSnapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    // ─── Internals ───────────────────────────────────────────────

    fn is_owned(&self, item: &CartItem) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.owns(&item.id, item.slug.as_deref()))
    }

    /// Drop owned items from the underlying list. Returns how many went.
    fn evict_owned(&mut self) -> usize {
        let Some(user) = &self.user else {
            return 0;
        };
        let before = self.items.len();
        self.items
            .retain(|item| !user.owns(&item.id, item.slug.as_deref()));
        before - self.items.len()
    }

    /// Persist, notify, and queue a full remote replace.
    fn commit(&self) {
        self.persist();
        self.notify();
        self.enqueue(SyncOp::Replace(self.items.clone()));
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.items)
            .map_err(crate::error::AppError::from)
            .and_then(|raw| self.storage.set(&self.settings.storage_key, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist cart; keeping in-memory state");
        }
    }

    fn notify(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, callback) in &self.subscribers {
            callback(&snapshot);
        }
    }

    fn enqueue(&self, op: SyncOp) {
        if let (Some(outbox), Some(token)) = (&self.outbox, &self.token) {
            outbox.enqueue(token, op);
        }
    }
}

/// Read and parse the persisted item list. Duplicate ids keep the first.
fn load_items(storage: &dyn KeyValueStore, key: &str) -> Vec<CartItem> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted cart; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<CartItem>>(&raw) {
        Ok(items) => {
            let mut seen = HashSet::new();
            items
                .into_iter()
                .filter(|item| seen.insert(item.id.clone()))
                .collect()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Persisted cart is malformed; starting empty");
            Vec::new()
        }
    }
}

/// Union of two carts on `id`; see [`CartStore::merge_remote`].
pub fn merge_items(server: Vec<CartItem>, local: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(server.len() + local.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in server {
        if positions.contains_key(&item.id) {
            continue;
        }
        positions.insert(item.id.clone(), merged.len());
        merged.push(item);
    }

    for item in local {
        match positions.get(&item.id) {
            Some(&index) => merged[index] = item,
            None => {
                positions.insert(item.id.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}
