//! Core invoice model consumed by the declaration engine.
//!
//! This module provides the read-only [`InvoiceSource`] interface, an
//! immutable [`Invoice`] snapshot with builders, the error types, and the
//! static reference tables (countries, counterparty id types).

mod builder;
pub mod countries;
mod error;
mod id_type;
mod types;

pub use builder::*;
pub use error::*;
pub use id_type::*;
pub use types::*;
