// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront: wires the auth session, the cart, the cart API and the sync
//! outbox together.
//!
//! Handles the login transition:
//! 1. Persist the session and hand the user/token to the cart, without
//!    queuing any remote write yet
//! 2. Fetch the server cart (once per login)
//! 3. Merge it into the local cart and queue the merged result for sync
//!
//! A failed fetch keeps the local cart as-is and pushes nothing; there is no
//! retry. Later local changes sync normally.

use crate::config::Config;
use crate::error::Result;
use crate::models::{CartItem, User};
use crate::services::auth::AuthSession;
use crate::services::cart::{CartSettings, CartStore};
use crate::services::cart_api::CartApiClient;
use crate::services::checkout::{prepare_checkout, CheckoutRequest};
use crate::services::outbox::{OutboxHandle, OutboxStats, SyncOutbox};
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What happened to the cart during [`Storefront::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Server cart merged; `server_items` is how many the server held
    Merged { server_items: usize },
    /// No remote API configured, or the fetch failed
    LocalOnly,
    /// This token was already merged
    AlreadyMerged,
}

/// Top-level state: one per local store.
pub struct Storefront {
    config: Config,
    storage: Arc<dyn KeyValueStore>,
    auth: AuthSession,
    cart: CartStore,
    api: Option<CartApiClient>,
    merged_token: Option<String>,
}

impl Storefront {
    /// Build an offline storefront: local cart and session only.
    ///
    /// A session restored from storage filters the cart immediately but is
    /// not treated as a login, so no merge happens.
    pub fn new(config: Config, storage: Arc<dyn KeyValueStore>) -> Self {
        let auth = AuthSession::load(Arc::clone(&storage));
        let mut cart = CartStore::new(Arc::clone(&storage), CartSettings::from(&config));
        cart.set_session(auth.user().cloned(), auth.token().map(str::to_string));
        let merged_token = auth.token().map(str::to_string);

        Self {
            config,
            storage,
            auth,
            cart,
            api: None,
            merged_token,
        }
    }

    /// Attach a cart API client and the outbox that delivers writes through it.
    pub fn with_remote(mut self, api: CartApiClient, outbox: OutboxHandle) -> Self {
        self.cart.attach_outbox(Some(outbox));
        self.api = Some(api);
        self
    }

    /// Build a storefront talking to the API in `config`, spawning the sync
    /// worker on the current runtime.
    ///
    /// The worker stops once the storefront is dropped and the queue drains;
    /// await the returned handle to let pending writes finish.
    pub fn connect(
        config: Config,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<(Self, JoinHandle<OutboxStats>)> {
        let api = CartApiClient::from_config(&config)?;
        let (outbox, worker) = SyncOutbox::spawn(api.clone(), config.retry_policy());
        let storefront = Self::new(config, storage).with_remote(api, outbox);
        Ok((storefront, worker))
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sign in and reconcile the cart with the server.
    ///
    /// Until the server cart has been fetched and merged, nothing is queued
    /// for the new token: an early replace would overwrite the server cart
    /// before it is read.
    pub async fn login(&mut self, user: User, token: String) -> LoginOutcome {
        self.auth.login(user.clone(), token.clone());

        if self.merged_token.as_deref() == Some(token.as_str()) {
            self.cart.set_session(Some(user), Some(token));
            return LoginOutcome::AlreadyMerged;
        }
        self.merged_token = Some(token.clone());

        let Some(api) = &self.api else {
            self.cart.set_session(Some(user), Some(token));
            return LoginOutcome::LocalOnly;
        };
        self.cart.begin_session(user, token.clone());

        match api.fetch_cart(&token).await {
            Ok(courses) => {
                let server_items: Vec<CartItem> = courses
                    .iter()
                    .filter_map(|c| CartItem::from_remote(c, &self.config.default_currency))
                    .collect();
                let count = server_items.len();
                self.cart.merge_remote(server_items);
                LoginOutcome::Merged {
                    server_items: count,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch server cart; keeping local cart");
                LoginOutcome::LocalOnly
            }
        }
    }

    /// Sign out. The cart stays as it is locally; remote sync stops.
    pub fn logout(&mut self) {
        self.auth.logout();
        self.cart.set_session(None, None);
        self.merged_token = None;
    }

    /// Replace the signed-in user's profile, re-filtering the cart.
    pub fn update_user(&mut self, user: User) -> bool {
        if !self.auth.update_user(user.clone()) {
            return false;
        }
        self.cart.set_user(Some(user));
        true
    }

    /// Start checkout with the current cart.
    pub fn checkout(&self) -> CheckoutRequest {
        prepare_checkout(
            &self.cart,
            self.auth.user(),
            &self.config.checkout_contact,
            self.storage.as_ref(),
        )
    }
}
