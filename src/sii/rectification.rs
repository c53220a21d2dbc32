//! Rectification type, mode and rectified totals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::breakdown::amount_overflow;
use super::policy::VariantPolicy;
use crate::core::{DeclarationError, Direction, InvoiceSource, RectificationKind};

/// `TipoFactura` of a regular invoice.
pub const NORMAL_TYPE_CODE: &str = "F1";
/// `TipoFactura` of a rectifying invoice.
pub const RECTIFYING_TYPE_CODE: &str = "R4";

/// How a rectification is resolved for the declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RectificationClass {
    None,
    /// Reports only the delta against the rectified invoice.
    Difference,
    /// Replaces the rectified invoice's declared amounts.
    SubstitutionFull,
    /// Substitution of an invoice that was never declared: rectified
    /// amounts are zero.
    SubstitutionZero,
}

/// `TipoRectificativa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RectificationMode {
    Substitution,
    Difference,
}

impl RectificationMode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Substitution => "S",
            Self::Difference => "I",
        }
    }
}

/// `ImporteRectificacion`: base and quota being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RectifiedTotals {
    pub base: Decimal,
    pub quota: Decimal,
}

/// Identification of the rectified invoice (`IDFacturaRectificada`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceReference {
    pub series_number: String,
    pub issue_date: Option<NaiveDate>,
}

/// Rectification data merged into the declaration's detail block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rectification {
    pub type_code: &'static str,
    pub class: RectificationClass,
    pub mode: RectificationMode,
    pub totals: Option<RectifiedTotals>,
    pub reference: Option<InvoiceReference>,
}

pub(crate) fn parse_kind(
    invoice: &dyn InvoiceSource,
) -> Result<RectificationKind, DeclarationError> {
    RectificationKind::from_tag(invoice.rectification_kind()).ok_or_else(|| {
        DeclarationError::Classification(format!(
            "invoice {}: unknown rectification kind '{}'",
            invoice.number(),
            invoice.rectification_kind()
        ))
    })
}

/// Classify a kind against the invoice it rectifies.
///
/// Substitutions only carry the prior amounts when that invoice was
/// successfully declared; otherwise there is nothing to replace.
pub fn classify(kind: RectificationKind, prior: Option<&dyn InvoiceSource>) -> RectificationClass {
    match kind {
        RectificationKind::Normal => RectificationClass::None,
        RectificationKind::Difference | RectificationKind::Credit => RectificationClass::Difference,
        RectificationKind::Substitution | RectificationKind::SubstitutionCredit => {
            if prior.is_some_and(|prior| prior.already_declared()) {
                RectificationClass::SubstitutionFull
            } else {
                RectificationClass::SubstitutionZero
            }
        }
    }
}

/// Series number under which an invoice was declared.
pub(crate) fn series_number(invoice: &dyn InvoiceSource, direction: Direction) -> String {
    match direction {
        Direction::Issued => invoice.number().to_string(),
        Direction::Received => invoice
            .supplier_number()
            .filter(|number| !number.trim().is_empty())
            .unwrap_or(invoice.number())
            .to_string(),
    }
}

/// Resolve the rectification data of an invoice, `None` for normal ones.
///
/// Only the immediately rectified invoice is consulted: a rectification of
/// a rectification takes the amounts of its direct predecessor, never of
/// the chain's root.
pub fn resolve_rectification(
    invoice: &dyn InvoiceSource,
    direction: Direction,
    policy: &VariantPolicy,
) -> Result<Option<Rectification>, DeclarationError> {
    let kind = parse_kind(invoice)?;
    let prior = invoice.rectified_invoice();

    let (mode, totals) = match classify(kind, prior) {
        RectificationClass::None => return Ok(None),
        RectificationClass::Difference => (RectificationMode::Difference, None),
        RectificationClass::SubstitutionZero => (
            RectificationMode::Substitution,
            Some(RectifiedTotals {
                base: Decimal::ZERO,
                quota: Decimal::ZERO,
            }),
        ),
        RectificationClass::SubstitutionFull => {
            let Some(prior) = prior else {
                return Err(DeclarationError::Classification(format!(
                    "invoice {}: substitution without rectified invoice",
                    invoice.number()
                )));
            };
            let sign = policy.sign(parse_kind(prior)?);
            let signed = |amount: Decimal| {
                sign.checked_mul(amount)
                    .ok_or_else(|| amount_overflow(prior))
            };
            (
                RectificationMode::Substitution,
                Some(RectifiedTotals {
                    base: signed(prior.amount_untaxed())?,
                    quota: signed(prior.amount_tax())?,
                }),
            )
        }
    };

    let reference = prior
        .filter(|prior| prior.already_declared())
        .map(|prior| InvoiceReference {
            series_number: series_number(prior, direction),
            issue_date: prior.issue_date(),
        });

    Ok(Some(Rectification {
        type_code: RECTIFYING_TYPE_CODE,
        class: classify(kind, prior),
        mode,
        totals,
        reference,
    }))
}
