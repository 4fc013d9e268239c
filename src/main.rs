// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course-Cart command line
//!
//! Drives the cart over a file-backed store, syncing with the storefront
//! API unless `--offline` is given.

use anyhow::Context;
use clap::{Parser, Subcommand};
use course_cart::{
    config::Config,
    models::{Course, User},
    services::{CheckoutRequest, Storefront, DEFAULT_RELATED_LIMIT},
    storage::FileStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "course-cart", about = "Manage a storefront course cart")]
struct Cli {
    /// Storage directory (overrides CART_STORAGE_DIR)
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Don't talk to the cart API
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the cart
    List,
    /// Add a course
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Remove a course by id
    Remove { id: String },
    /// Empty the cart
    Clear,
    /// Print the cart total
    Total,
    /// Suggest courses from a JSON catalog file
    Related {
        /// JSON array of courses
        catalog: PathBuf,
        /// Course to base suggestions on (defaults to the first cart item)
        #[arg(long)]
        course: Option<String>,
        #[arg(long, default_value_t = DEFAULT_RELATED_LIMIT)]
        limit: usize,
    },
    /// Build the purchase request
    Checkout,
    /// Sign in with a user JSON file and token, merging the server cart
    Login {
        #[arg(long)]
        user_file: PathBuf,
        #[arg(long)]
        token: String,
    },
    /// Sign out
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    let storage = Arc::new(FileStore::open(&config.storage_dir)?);
    tracing::debug!(dir = %config.storage_dir.display(), "Using storage directory");

    let (mut storefront, worker) = if cli.offline {
        (Storefront::new(config, storage), None)
    } else {
        let (storefront, worker) = Storefront::connect(config, storage)?;
        (storefront, Some(worker))
    };

    run(&mut storefront, cli.command).await?;

    // Let queued writes reach the server before exiting.
    drop(storefront);
    if let Some(worker) = worker {
        let stats = worker.await.context("Cart sync worker panicked")?;
        if stats.dropped > 0 {
            tracing::warn!(dropped = stats.dropped, "Some cart changes were not synced");
        }
    }
    Ok(())
}

async fn run(storefront: &mut Storefront, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => {
            for item in storefront.cart().items() {
                println!(
                    "{}\t{}\t{} {}",
                    item.id, item.title, item.price, item.price_currency
                );
            }
            println!("{} item(s)", storefront.cart().count());
        }
        Command::Add {
            id,
            title,
            price,
            category,
            slug,
            currency,
        } => {
            let course = Course {
                id: Some(id.clone()),
                title,
                price: serde_json::Value::String(price),
                category,
                slug,
                price_currency: currency,
                ..Course::default()
            };
            if storefront.cart_mut().add_item(&course) {
                println!("Added {}", id);
            } else {
                println!("Not added: {} is already in the cart or owned", id);
            }
        }
        Command::Remove { id } => {
            if storefront.cart_mut().remove_item(&id) {
                println!("Removed {}", id);
            } else {
                println!("{} is not in the cart", id);
            }
        }
        Command::Clear => {
            storefront.cart_mut().clear();
            println!("Cart cleared");
        }
        Command::Total => {
            let cart = storefront.cart();
            let currency = cart
                .items()
                .next()
                .map(|item| item.price_currency.as_str())
                .unwrap_or(storefront.config().default_currency.as_str());
            println!("{} {}", cart.total(), currency);
        }
        Command::Related {
            catalog,
            course,
            limit,
        } => {
            let raw = std::fs::read_to_string(&catalog)
                .with_context(|| format!("Failed to read {}", catalog.display()))?;
            let pool: Vec<Course> =
                serde_json::from_str(&raw).context("Catalog must be a JSON array of courses")?;

            let current = match course {
                Some(id) => pool
                    .iter()
                    .find(|c| c.key() == Some(id.as_str()))
                    .cloned()
                    .with_context(|| format!("Course {} not in catalog", id))?,
                None => {
                    let Some(first) = storefront.cart().items().next() else {
                        println!("Cart is empty; pass --course");
                        return Ok(());
                    };
                    Course {
                        id: Some(first.id.clone()),
                        category: Some(first.category.clone()),
                        ..Course::default()
                    }
                }
            };

            for suggestion in storefront.cart().related(&current, &pool, limit) {
                println!(
                    "{}\t{}",
                    suggestion.key().unwrap_or_default(),
                    suggestion.title
                );
            }
        }
        Command::Checkout => match storefront.checkout() {
            CheckoutRequest::LoginRequired { return_to } => {
                println!("Sign in first; you will be returned to {}", return_to);
            }
            CheckoutRequest::EmptyCart => println!("Cart is empty"),
            CheckoutRequest::Ready { message, url, .. } => {
                println!("{}\n\n{}", message, url);
            }
        },
        Command::Login { user_file, token } => {
            let raw = std::fs::read_to_string(&user_file)
                .with_context(|| format!("Failed to read {}", user_file.display()))?;
            let user: User = serde_json::from_str(&raw).context("Invalid user JSON")?;
            let outcome = storefront.login(user, token).await;
            println!("{:?}; {} item(s) in cart", outcome, storefront.cart().count());
        }
        Command::Logout => {
            storefront.logout();
            println!("Signed out");
        }
    }
    Ok(())
}

/// Initialize logging to stderr: JSON when `LOG_FORMAT=json`, text otherwise.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("course_cart=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
