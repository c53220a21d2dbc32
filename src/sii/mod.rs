//! Declaration records for the immediate supply of invoice information.
//!
//! Turns an invoice into the record a taxpayer submits for its issued or
//! received invoice register, under either the general VAT regime or the
//! regional indirect tax regime, and validates it against the authority's
//! field contract.
//!
//! # Pipeline
//!
//! - [`VariantPolicy`] carries every variant-specific table and flag
//! - [`calculate_breakdown`] classifies tax lines into exempt, non-exempt,
//!   reverse-charge and non-subject buckets
//! - [`resolve_rectification`] derives the rectification type and amounts
//! - [`DeclarationBuilder`] assembles the [`DeclarationRecord`]
//! - [`validate()`] checks the record and renders dates for the wire
//!
//! # Example
//!
//! ```
//! use suministro::core::*;
//! use suministro::sii::{self, Variant};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("FP-77", "in_invoice")
//!     .issue_date(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap())
//!     .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
//!     .counterparty(PartyBuilder::new("Proveedor Canario SL", "ES").vat("ESB35000000").build())
//!     .add_tax_line(TaxLineBuilder::new("IGIC 7%", dec!(200), dec!(14), dec!(7)).build())
//!     .totals(dec!(214), dec!(200), dec!(14))
//!     .build()
//!     .unwrap();
//!
//! let outcome = sii::declare(&invoice, Direction::Received, Variant::Regional).unwrap();
//! assert!(outcome.successful, "{:?}", outcome.messages());
//! ```

mod breakdown;
mod declaration;
mod lease;
mod policy;
mod record;
mod rectification;
mod schema;
mod validate;

pub use breakdown::{
    BreakdownContext, QuotaRole, TaxBreakdown, TaxBreakdownEntry, calculate_breakdown,
};
pub use declaration::{
    DEFAULT_DESCRIPTION, DESCRIPTION_MAX_LENGTH, DeclarationBuilder, build, build_with, declare,
    resolve_period,
};
pub use lease::{SitusCode, is_lease_regime, lease_block, situs_code};
pub use policy::{
    DEFAULT_REGIME_CODE, EXPORT_REGIME_CODE, IMPORT_REGIME_CODE, LEASE_WITH_RETENTION,
    LEASE_WITHOUT_RETENTION, Variant, VariantPolicy,
};
pub use record::{DeclarationRecord, ISO_DATE_FORMAT, Node, Value, WIRE_DATE_FORMAT};
pub use rectification::{
    InvoiceReference, NORMAL_TYPE_CODE, RECTIFYING_TYPE_CODE, Rectification, RectificationClass,
    RectificationMode, RectifiedTotals, classify, resolve_rectification,
};
pub use schema::{FieldRule, FieldType, Schema, declaration_schema};
pub use validate::{AMOUNT_MAX_SCALE, ValidationOutcome, validate};
