//! Civil Materials Core - Shared types library.
//!
//! Common types used by the storefront binary:
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//!
//! # Architecture
//!
//! This crate contains only types - no I/O, no HTTP clients. Everything the
//! storefront persists or computes lives in the external catalog backend; the
//! types here exist so handles to that data cannot be mixed up in transit.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
