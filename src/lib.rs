//! # suministro
//!
//! Invoice to tax-declaration engine for the immediate supply of invoice
//! information (SII) to the tax authority, covering the general VAT regime
//! and the Canary Islands regional regime.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Field names of the produced records follow the authority's published
//! schema.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use suministro::core::*;
//! use suministro::sii::{self, Variant};
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("F-2024-001", "out_invoice")
//!     .issue_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
//!     .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
//!     .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
//!     .add_tax_line(TaxLineBuilder::new("IVA 21%", dec!(1000), dec!(210), dec!(21)).build())
//!     .totals(dec!(1210), dec!(1000), dec!(210))
//!     .build()
//!     .unwrap();
//!
//! let record = sii::build(&invoice, Direction::Issued, Variant::General).unwrap();
//! let outcome = sii::validate(record, &sii::VariantPolicy::general());
//! assert!(outcome.successful);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice snapshot, builders, errors, reference tables |
//! | `sii` (default) | Variant policy, breakdown, rectification, record builder, validator |
//! | `json` | JSON rendering of declaration records |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "sii")]
pub mod sii;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
