//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login and access tokens
//! - `payments` - Payment intents and the Stripe client
//! - `email` - Transactional email (welcome message)

pub mod auth;
pub mod email;
pub mod payments;
