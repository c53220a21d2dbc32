use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DeclarationError;

/// Matches tax names that denote a reverse-charge (Inversión del Sujeto
/// Pasivo) tax.
static REVERSE_CHARGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bISP\b|inversi[oó]n\s+del\s+sujeto\s+pasivo|reverse[\s-]+charge)")
        .expect("reverse charge pattern is valid")
});

/// Whether an invoice was issued by the company or received from a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Libro registro de facturas expedidas.
    Issued,
    /// Libro registro de facturas recibidas.
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Received => "received",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "issued" | "out" | "emitida" => Ok(Self::Issued),
            "received" | "in" | "recibida" => Ok(Self::Received),
            other => Err(DeclarationError::Classification(format!(
                "unknown invoice direction '{other}'"
            ))),
        }
    }
}

/// Raw accounting document type of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    /// `out_invoice`: customer invoice.
    OutInvoice,
    /// `out_refund`: customer refund.
    OutRefund,
    /// `in_invoice`: supplier invoice.
    InInvoice,
    /// `in_refund`: supplier refund.
    InRefund,
}

impl InvoiceType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutInvoice => "out_invoice",
            Self::OutRefund => "out_refund",
            Self::InInvoice => "in_invoice",
            Self::InRefund => "in_refund",
        }
    }

    /// Parse from the raw type code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "out_invoice" => Some(Self::OutInvoice),
            "out_refund" => Some(Self::OutRefund),
            "in_invoice" => Some(Self::InInvoice),
            "in_refund" => Some(Self::InRefund),
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::OutInvoice | Self::OutRefund => Direction::Issued,
            Self::InInvoice | Self::InRefund => Direction::Received,
        }
    }
}

/// Rectification kind tag carried by an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RectificationKind {
    /// N: normal invoice.
    Normal,
    /// R: rectification reporting only the delta.
    Difference,
    /// A: credit note cancelling (part of) a previous invoice.
    Credit,
    /// RA: rectification replacing the previous invoice's amounts.
    Substitution,
    /// B: credit note cancelling and replacing a previous invoice.
    SubstitutionCredit,
}

impl RectificationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Normal => "N",
            Self::Difference => "R",
            Self::Credit => "A",
            Self::Substitution => "RA",
            Self::SubstitutionCredit => "B",
        }
    }

    /// Parse from the raw tag. An empty tag is a normal invoice.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "" | "N" => Some(Self::Normal),
            "R" => Some(Self::Difference),
            "A" => Some(Self::Credit),
            "RA" => Some(Self::Substitution),
            "B" => Some(Self::SubstitutionCredit),
            _ => None,
        }
    }

    /// Whether the invoice rectifies a previous one.
    pub fn is_rectifying(&self) -> bool {
        !matches!(self, Self::Normal)
    }

    /// Whether the rectification replaces the previous invoice's amounts.
    pub fn is_substitution(&self) -> bool {
        matches!(self, Self::Substitution | Self::SubstitutionCredit)
    }
}

/// How a tax line's rate applies to its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateType {
    /// Percentage of the base.
    Proportional,
    /// Explicitly exempt tax.
    Exempt,
}

/// A tax line of an invoice, already computed by the invoicing system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    /// Tax name, e.g. "IVA 21%" or "IGIC 7% ISP".
    pub name: String,
    /// Taxable base.
    pub base: Decimal,
    /// Tax amount (quota).
    pub amount: Decimal,
    /// Nominal rate in percent.
    pub rate: Decimal,
    pub rate_type: RateType,
}

impl TaxLine {
    /// Whether the tax name marks this line as reverse charge.
    pub fn is_reverse_charge(&self) -> bool {
        REVERSE_CHARGE_NAME.is_match(&self.name)
    }
}

/// Company or counterparty of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Legal name (NombreRazon).
    pub name: String,
    /// Tax identifier, optionally prefixed with the country code
    /// (e.g. "ESB12345678" or "FR12345678901").
    pub vat: Option<String>,
    /// Country code (ISO 3166-1 alpha-2).
    pub country_code: String,
    /// Whether the party is registered in the authority's census.
    pub registered: bool,
}

impl Party {
    /// Whether the party is resident in Spain.
    pub fn is_domestic(&self) -> bool {
        self.country_code.eq_ignore_ascii_case("ES")
    }

    /// Tax identifier without its country prefix.
    ///
    /// The prefix is only stripped when it equals the party's own country
    /// code, so "ESB12345678" becomes "B12345678" for a Spanish party.
    pub fn tax_id(&self) -> Option<&str> {
        let vat = self.vat.as_deref()?.trim();
        if vat.is_empty() {
            return None;
        }
        match vat.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case(&self.country_code) => Some(&vat[2..]),
            _ => Some(vat),
        }
    }
}

/// Declared reporting period (year and month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub year: i32,
    pub month: u32,
}

impl FiscalPeriod {
    /// Create a period, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }
}

/// Leased real estate referenced by a business-premises lease invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeasedProperty {
    /// Country where the property is located (ISO 3166-1 alpha-2).
    pub country_code: String,
    /// ISO 3166-2 subdivision of the autonomous community (e.g. "ES-PV").
    pub region: Option<String>,
    /// Cadastral reference (Referencia Catastral).
    pub cadastral_reference: Option<String>,
}

/// Read-only view of an invoice as consumed by the declaration engine.
///
/// The engine never mutates the invoice; implementors may be backed by any
/// storage. [`Invoice`] is the crate's own snapshot implementation.
pub trait InvoiceSource {
    /// Internal invoice number.
    fn number(&self) -> &str;
    /// Raw document type code (`out_invoice`, `in_refund`, ...).
    fn type_code(&self) -> &str;
    fn issue_date(&self) -> Option<NaiveDate>;
    /// Accounting (registration) date.
    fn accounting_date(&self) -> Option<NaiveDate>;
    fn declared_period(&self) -> Option<FiscalPeriod>;
    /// The company filing the declaration.
    fn company(&self) -> &Party;
    /// Customer for issued invoices, supplier for received ones.
    fn counterparty(&self) -> &Party;
    /// Supplier's own invoice number (received invoices).
    fn supplier_number(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
    /// Total including tax.
    fn amount_total(&self) -> Decimal;
    /// Total excluding tax.
    fn amount_untaxed(&self) -> Decimal;
    /// Total tax.
    fn amount_tax(&self) -> Decimal;
    /// Tax lines in document order.
    fn tax_lines(&self) -> &[TaxLine];
    /// Raw rectification kind tag (see [`RectificationKind::from_tag`]).
    fn rectification_kind(&self) -> &str;
    /// The invoice this one immediately rectifies.
    fn rectified_invoice(&self) -> Option<&dyn InvoiceSource>;
    /// Raw special regime code (ClaveRegimenEspecialOTrascendencia).
    fn regime_code(&self) -> Option<&str>;
    fn leased_property(&self) -> Option<&LeasedProperty>;
    /// Whether the invoice was already successfully declared.
    fn already_declared(&self) -> bool;
    fn fiscal_position(&self) -> Option<&str>;
}

/// Immutable invoice snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub type_code: String,
    pub issue_date: Option<NaiveDate>,
    pub accounting_date: Option<NaiveDate>,
    pub declared_period: Option<FiscalPeriod>,
    pub company: Party,
    pub counterparty: Party,
    pub supplier_number: Option<String>,
    pub description: Option<String>,
    pub amount_total: Decimal,
    pub amount_untaxed: Decimal,
    pub amount_tax: Decimal,
    pub tax_lines: Vec<TaxLine>,
    pub rectification_kind: String,
    pub rectifies: Option<Box<Invoice>>,
    pub regime_code: Option<String>,
    pub leased_property: Option<LeasedProperty>,
    pub already_declared: bool,
    pub fiscal_position: Option<String>,
}

impl InvoiceSource for Invoice {
    fn number(&self) -> &str {
        &self.number
    }

    fn type_code(&self) -> &str {
        &self.type_code
    }

    fn issue_date(&self) -> Option<NaiveDate> {
        self.issue_date
    }

    fn accounting_date(&self) -> Option<NaiveDate> {
        self.accounting_date
    }

    fn declared_period(&self) -> Option<FiscalPeriod> {
        self.declared_period
    }

    fn company(&self) -> &Party {
        &self.company
    }

    fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    fn supplier_number(&self) -> Option<&str> {
        self.supplier_number.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn amount_total(&self) -> Decimal {
        self.amount_total
    }

    fn amount_untaxed(&self) -> Decimal {
        self.amount_untaxed
    }

    fn amount_tax(&self) -> Decimal {
        self.amount_tax
    }

    fn tax_lines(&self) -> &[TaxLine] {
        &self.tax_lines
    }

    fn rectification_kind(&self) -> &str {
        &self.rectification_kind
    }

    fn rectified_invoice(&self) -> Option<&dyn InvoiceSource> {
        self.rectifies
            .as_deref()
            .map(|invoice| invoice as &dyn InvoiceSource)
    }

    fn regime_code(&self) -> Option<&str> {
        self.regime_code.as_deref()
    }

    fn leased_property(&self) -> Option<&LeasedProperty> {
        self.leased_property.as_ref()
    }

    fn already_declared(&self) -> bool {
        self.already_declared
    }

    fn fiscal_position(&self) -> Option<&str> {
        self.fiscal_position.as_deref()
    }
}
