//! Tax breakdown: classification of an invoice's tax lines into exempt,
//! non-exempt, reverse-charge and non-subject buckets.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;

use super::policy::VariantPolicy;
use crate::core::{DeclarationError, Direction, InvoiceSource, RateType, TaxLine};

/// Who bears the quota of a breakdown entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuotaRole {
    /// Charged to the customer (issued invoices).
    Charged,
    /// Borne by the recipient (received invoices).
    Borne,
}

impl QuotaRole {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Issued => Self::Charged,
            Direction::Received => Self::Borne,
        }
    }

    /// Declaration field carrying the quota.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Charged => "CuotaRepercutida",
            Self::Borne => "CuotaSoportada",
        }
    }
}

/// Aggregated base and quota for one rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBreakdownEntry {
    pub rate: Decimal,
    pub base: Decimal,
    pub quota: Decimal,
    pub role: QuotaRole,
}

/// Result of classifying an invoice's tax lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBreakdown {
    pub subject_to_tax: bool,
    pub exempt: bool,
    pub non_exempt: bool,
    pub non_subject: bool,
    pub exempt_total: Decimal,
    /// Rate-merged entries in first-seen order.
    pub non_exempt_entries: Vec<TaxBreakdownEntry>,
    /// One entry per reverse-charge line, never merged.
    pub reverse_charge_entries: Vec<TaxBreakdownEntry>,
    pub non_subject_amount: Decimal,
    /// The non-subject amount was folded into a zero-rate entry.
    pub remainder_synthesized: bool,
}

impl TaxBreakdown {
    fn empty() -> Self {
        Self {
            subject_to_tax: false,
            exempt: false,
            non_exempt: false,
            non_subject: false,
            exempt_total: Decimal::ZERO,
            non_exempt_entries: Vec::new(),
            reverse_charge_entries: Vec::new(),
            non_subject_amount: Decimal::ZERO,
            remainder_synthesized: false,
        }
    }

    /// Quota the recipient may deduct: non-exempt plus reverse-charge quotas.
    ///
    /// `None` when the sum overflows.
    pub fn deductible_quota(&self) -> Option<Decimal> {
        self.non_exempt_entries
            .iter()
            .chain(&self.reverse_charge_entries)
            .try_fold(Decimal::ZERO, |sum, entry| sum.checked_add(entry.quota))
    }

    /// Sum of every classified base and quota plus the non-subject amount.
    ///
    /// `None` when the sum overflows.
    pub fn declared_total(&self) -> Option<Decimal> {
        let remainder = if self.remainder_synthesized {
            Decimal::ZERO
        } else {
            self.non_subject_amount
        };
        self.non_exempt_entries
            .iter()
            .chain(&self.reverse_charge_entries)
            .try_fold(Decimal::ZERO, |sum, entry| {
                sum.checked_add(entry.base)?.checked_add(entry.quota)
            })?
            .checked_add(self.exempt_total)?
            .checked_add(remainder)
    }
}

/// Error for an invoice whose amounts leave the `Decimal` range.
pub(crate) fn amount_overflow(invoice: &dyn InvoiceSource) -> DeclarationError {
    DeclarationError::Amount(format!(
        "invoice {}: amounts exceed the representable range",
        invoice.number()
    ))
}

/// Per-invoice inputs of the calculation that are decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownContext {
    pub direction: Direction,
    /// Multiplier from the rectification kind's sign table.
    pub sign: Decimal,
    pub export: bool,
    pub import: bool,
}

/// Classify and aggregate the invoice's tax lines.
///
/// An invoice without matching tax lines yields an empty breakdown, plus a
/// non-subject remainder when its total is non-zero. Fails only when the
/// signed amounts or their sums overflow.
pub fn calculate_breakdown(
    invoice: &dyn InvoiceSource,
    ctx: BreakdownContext,
    policy: &VariantPolicy,
) -> Result<TaxBreakdown, DeclarationError> {
    let role = QuotaRole::for_direction(ctx.direction);
    let mut result = TaxBreakdown::empty();
    let mut classified = Decimal::ZERO;
    let checked = |amount: Option<Decimal>| amount.ok_or_else(|| amount_overflow(invoice));

    for line in invoice
        .tax_lines()
        .iter()
        .filter(|line| policy.matches_tax_family(&line.name))
    {
        let base = checked(ctx.sign.checked_mul(line.base))?;
        let quota = checked(ctx.sign.checked_mul(line.amount))?;
        classified = checked(
            classified
                .checked_add(base)
                .and_then(|sum| sum.checked_add(quota)),
        )?;

        if line.is_reverse_charge() {
            result.reverse_charge_entries.push(TaxBreakdownEntry {
                rate: line.rate,
                base,
                quota,
                role,
            });
        } else if is_exempt(line, &ctx, policy) {
            result.exempt = true;
            result.exempt_total = checked(result.exempt_total.checked_add(base))?;
        } else {
            result.non_exempt = true;
            match result
                .non_exempt_entries
                .iter_mut()
                .find(|entry| entry.rate == line.rate)
            {
                Some(entry) => {
                    entry.base = checked(entry.base.checked_add(base))?;
                    entry.quota = checked(entry.quota.checked_add(quota))?;
                }
                None => result.non_exempt_entries.push(TaxBreakdownEntry {
                    rate: line.rate,
                    base,
                    quota,
                    role,
                }),
            }
        }
    }

    let remainder = checked(
        ctx.sign
            .checked_mul(invoice.amount_total())
            .and_then(|total| total.checked_sub(classified)),
    )?
    .round_dp_with_strategy(policy.rounding_dp(), RoundingStrategy::MidpointAwayFromZero);
    if !remainder.is_zero() {
        result.non_subject = true;
        result.non_subject_amount = remainder;
        if ctx.direction == Direction::Received {
            // Received declarations always carry at least one detail entry.
            result.non_exempt = true;
            result.remainder_synthesized = true;
            result.non_exempt_entries.push(TaxBreakdownEntry {
                rate: Decimal::ZERO,
                base: remainder,
                quota: Decimal::ZERO,
                role,
            });
        }
    }

    result.subject_to_tax =
        result.exempt || result.non_exempt || !result.reverse_charge_entries.is_empty();

    debug!(
        invoice = invoice.number(),
        exempt = result.exempt,
        non_exempt_rates = result.non_exempt_entries.len(),
        reverse_charge = result.reverse_charge_entries.len(),
        non_subject = %result.non_subject_amount,
        "tax breakdown calculated"
    );

    Ok(result)
}

fn is_exempt(line: &TaxLine, ctx: &BreakdownContext, policy: &VariantPolicy) -> bool {
    line.rate.is_zero()
        && line.rate_type == RateType::Proportional
        && !(ctx.export || ctx.import)
        && (!policy.exempt_requires_keyword() || policy.has_exempt_keyword(&line.name))
}
