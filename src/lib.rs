//! The Rust client for SPACE, a pricing-driven feature management platform for multi-tenant SaaS.
//!
//! # Overview
//!
//! The client revolves around a [`Client`] created with [`connect`] from [`ConnectionOptions`].
//! The client owns one HTTP [`Session`] that is opened lazily on first use and shared by three
//! modules:
//!
//! - [`ContractModule`] registers and updates the usage contracts of your users.
//! - [`FeatureModule`] evaluates features and usage limits for a user, reverts optimistic
//!   evaluations, and issues pricing tokens.
//! - [`ServiceModule`] manages the pricing catalog: services, pricing versions and their
//!   availability.
//!
//! The client does not evaluate anything itself. Every operation is a single request to SPACE.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Local precondition violations are reported as
//! [`Error::InvalidArgument`] before any request is sent. A response with a non-2xx status is an
//! [`Error::Remote`] carrying the status and the server's body, while a request that received no
//! response at all is an [`Error::Transport`]. No operation retries.
//!
//! An unknown feature is not an error: [`FeatureModule::evaluate`] resolves it to a
//! [`FeatureEvaluationResult`] with `eval == false` and a `FLAG_NOT_FOUND` error code.
//! [`Client::is_connected_to_space`] never fails and resolves to `false` instead.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `space` target. Consider integrating a `log`-compatible logger implementation for better
//! visibility into client operations.
//!
//! # Examples
//!
//! ```no_run
//! # async fn run() -> space_client::Result<()> {
//! use std::collections::HashMap;
//!
//! use space_client::{ConnectionOptions, EvaluationOptions};
//!
//! let client = space_client::connect(ConnectionOptions::new("http://localhost:5403", "api-key"))?;
//!
//! let result = client
//!     .features()
//!     .evaluate("user-1", "zoom-meetings", &HashMap::new(), EvaluationOptions::default())
//!     .await?;
//! println!("enabled: {}", result.eval);
//! # Ok(())
//! # }
//! ```
//!
//! More examples can be found in the `demos` directory of the repository.

#![warn(rustdoc::missing_crate_level_docs)]

mod client;
mod config;
mod contracts;
mod error;
mod features;
mod services;

pub mod pricing;
pub mod session;

pub use client::Client;
pub use config::{connect, connect_with, ConnectionOptions, ConnectionSettings};
pub use contracts::{
    BillingPeriod, BillingPeriodCreate, Contract, ContractHistoryEntry, ContractModule,
    ContractToCreate, Subscription, SubscriptionAddOns, UsageLevel, UserContact,
};
pub use error::{Error, Result};
pub use features::{
    EvaluationOptions, FeatureError, FeatureEvaluationResult, FeatureModule, LimitValue,
    FLAG_NOT_FOUND,
};
pub use pricing::{Availability, FallbackSubscription, Pricing, Service};
pub use services::{PricingUpload, ServiceModule};
pub use session::{Session, SessionProvider, SessionStore};
