// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod cart;
pub mod cart_api;
pub mod checkout;
pub mod outbox;
pub mod related;
pub mod storefront;

pub use auth::{AuthSession, Session};
pub use cart::{CartSettings, CartStore, SubscriptionId};
pub use cart_api::CartApiClient;
pub use checkout::{prepare_checkout, CheckoutRequest};
pub use outbox::{OutboxHandle, OutboxStats, RetryPolicy, SyncJob, SyncOp, SyncOutbox};
pub use related::{related_courses, DEFAULT_RELATED_LIMIT};
pub use storefront::{LoginOutcome, Storefront};
