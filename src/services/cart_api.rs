// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the storefront's remote cart API.
//!
//! Handles:
//! - Fetching the server-held cart at login
//! - Replacing the server cart with the full local item list
//! - Clearing the server cart
//!
//! All calls carry the session token as a bearer header.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{CartItem, Course};
use serde::Deserialize;
use std::time::Duration;

/// Remote cart API client.
#[derive(Debug, Clone)]
pub struct CartApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Body of `GET /cart`: a bare array, or one wrapped under `items`/`data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CartPayload {
    Items(Vec<Course>),
    Wrapped {
        #[serde(alias = "data")]
        items: Vec<Course>,
    },
}

impl CartApiClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from application config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout())
    }

    fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }

    /// Fetch the server-held cart.
    pub async fn fetch_cart(&self, token: &str) -> Result<Vec<Course>> {
        let response = self
            .http
            .get(self.cart_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::RemoteTransport(e.to_string()))?;

        let payload: CartPayload = self.check_response_json(response).await?;
        Ok(match payload {
            CartPayload::Items(items) | CartPayload::Wrapped { items } => items,
        })
    }

    /// Replace the server cart with the full item list.
    pub async fn replace_cart(&self, token: &str, items: &[CartItem]) -> Result<()> {
        let response = self
            .http
            .post(self.cart_url())
            .bearer_auth(token)
            .json(items)
            .send()
            .await
            .map_err(|e| AppError::RemoteTransport(e.to_string()))?;

        self.check_response(response).await
    }

    /// Empty the server cart.
    pub async fn clear_cart(&self, token: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.cart_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::RemoteTransport(e.to_string()))?;

        self.check_response(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::status_error(response).await)
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::RemoteDecode(e.to_string()))
    }

    async fn status_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 401 {
            return AppError::Unauthorized;
        }
        if status.as_u16() == 429 {
            tracing::warn!("Cart API rate limit hit (429)");
        }

        AppError::RemoteStatus {
            status: status.as_u16(),
            message: body,
        }
    }
}
