//! Domain models for the storefront.
//!
//! These types are validated domain objects, separate from database row
//! types (see `db`) and from request/response bodies (see `routes`).

pub mod payment;
pub mod session;
pub mod user;

pub use payment::{PaymentIntent, PaymentRecord};
pub use session::CurrentUser;
pub use user::{Cart, NewUser, User};
