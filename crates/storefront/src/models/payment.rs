//! Payment intent types.
//!
//! The provider owns the payment intent. We keep a mirror row per intent so
//! that updates can be checked against the user who created it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{PaymentId, UserId};

/// A payment intent as reported by the provider.
///
/// `status` is the provider's own status string, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Provider identifier (`pi_...` for Stripe).
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Provider status, e.g. `requires_payment_method`.
    pub status: String,
    /// Secret the browser uses to confirm the payment.
    pub client_secret: Option<String>,
    /// Metadata stored on the provider object.
    pub metadata: BTreeMap<String, String>,
}

/// Local mirror of a provider payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub user_id: UserId,
    pub provider_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
