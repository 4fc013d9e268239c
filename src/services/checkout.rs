// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Checkout: turn the cart into a purchase request sent over Telegram.

use crate::models::{CartItem, User, DEFAULT_CURRENCY};
use crate::services::cart::CartStore;
use crate::storage::{keys, KeyValueStore};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Page to come back to after signing in from checkout.
pub const CHECKOUT_RETURN_PATH: &str = "/cart";

/// Result of starting checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CheckoutRequest {
    /// Nobody is signed in; the return path has been saved
    LoginRequired { return_to: String },
    /// Nothing to buy
    EmptyCart,
    /// Message and link ready to open
    Ready {
        message: String,
        url: String,
        total: f64,
        currency: String,
    },
}

/// Prepare checkout for the current cart.
///
/// Without a signed-in user the return path is stored under
/// `returnAfterLogin` so the login flow can send the visitor back.
pub fn prepare_checkout(
    cart: &CartStore,
    user: Option<&User>,
    contact: &str,
    storage: &dyn KeyValueStore,
) -> CheckoutRequest {
    if user.is_none() {
        if let Err(e) = storage.set(keys::RETURN_AFTER_LOGIN, CHECKOUT_RETURN_PATH) {
            tracing::warn!(error = %e, "Failed to save checkout return path");
        }
        return CheckoutRequest::LoginRequired {
            return_to: CHECKOUT_RETURN_PATH.to_string(),
        };
    }

    let items: Vec<CartItem> = cart.items().cloned().collect();
    if items.is_empty() {
        return CheckoutRequest::EmptyCart;
    }

    let total = cart.total();
    let currency = items
        .first()
        .map(|item| item.price_currency.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let message = purchase_message(&items, total, &currency);
    let url = format!(
        "https://t.me/{}?text={}",
        contact,
        urlencoding::encode(&message)
    );

    tracing::info!(count = items.len(), total, "Prepared checkout request");
    CheckoutRequest::Ready {
        message,
        url,
        total,
        currency,
    }
}

/// The purchase request text.
pub fn purchase_message(items: &[CartItem], total: f64, currency: &str) -> String {
    let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
    format!(
        "Hi! I'd like to purchase the following courses:\n\n{}\n\nTotal: {} {}\n\nPlease provide payment details.",
        titles.join(", "),
        format_amount(total),
        currency
    )
}

/// Format an amount with comma thousands separators and at most three
/// fraction digits (`150000` -> `150,000`, `1234.5` -> `1,234.5`).
pub fn format_amount(amount: f64) -> String {
    let amount = if amount.is_finite() { amount.abs() } else { 0.0 };
    let millis = (amount * 1000.0).round() as u64;
    let whole = (millis / 1000).to_string();
    let fraction = millis % 1000;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction == 0 {
        grouped
    } else {
        let digits = format!("{:03}", fraction);
        format!("{}.{}", grouped, digits.trim_end_matches('0'))
    }
}
