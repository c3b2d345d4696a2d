//! Bookstore Core - Shared types library.
//!
//! This crate provides common types used across all bookstore components:
//! - `storefront` - Public HTTP API and localized landing pages
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, passwords, roles and money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
