//! Storekeep Core - Shared types library.
//!
//! This crate provides the domain types used across all Storekeep components:
//! - `api` - The REST API server and its services
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Validation happens at construction, so a value of one of
//! these types is always well-formed.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, names, emails, and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
