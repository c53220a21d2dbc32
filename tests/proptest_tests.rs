//! Property-based tests for the declaration engine.
//!
//! Run with: `cargo test --test proptest_tests`

#![cfg(feature = "sii")]

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use suministro::core::*;
use suministro::sii::{self, BreakdownContext, Variant, VariantPolicy, calculate_breakdown};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build_invoice(type_code: &str, kind: &str, lines: Vec<TaxLine>, total: Decimal) -> Invoice {
    let mut builder = InvoiceBuilder::new("F-PROP", type_code)
        .issue_date(date(2024, 6, 15))
        .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
        .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
        .rectification_kind(kind)
        .totals(total, Decimal::ZERO, Decimal::ZERO);
    for line in lines {
        builder = builder.add_tax_line(line);
    }
    builder.build().unwrap()
}

fn context(direction: Direction, kind: &str) -> BreakdownContext {
    let policy = VariantPolicy::general();
    BreakdownContext {
        direction,
        sign: policy.sign(RectificationKind::from_tag(kind).unwrap()),
        export: false,
        import: false,
    }
}

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Generate a base amount (0.01 to 99999.99).
fn arb_base() -> impl Strategy<Value = Decimal> {
    (1u64..10_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Generate a tax name and rate, covering exempt and reverse-charge lines.
fn arb_tax() -> impl Strategy<Value = (&'static str, Decimal)> {
    prop_oneof![
        Just(("IVA 21%", dec!(21))),
        Just(("IVA 10%", dec!(10))),
        Just(("IVA 4%", dec!(4))),
        Just(("IVA Exento", dec!(0))),
        Just(("IVA 21% ISP", dec!(21))),
        Just(("IRPF 15%", dec!(15))),
    ]
}

fn arb_line() -> impl Strategy<Value = TaxLine> {
    (arb_base(), arb_tax()).prop_map(|(base, (name, rate))| {
        let amount = (base * rate / dec!(100)).round_dp(2);
        TaxLineBuilder::new(name, base, amount, rate).build()
    })
}

fn arb_lines() -> impl Strategy<Value = Vec<TaxLine>> {
    prop::collection::vec(arb_line(), 0..=6)
}

/// Extra amount on top of the lines' sum, left unclassified.
fn arb_extra() -> impl Strategy<Value = Decimal> {
    prop_oneof![Just(Decimal::ZERO), (0u64..1_000_000u64).prop_map(|c| Decimal::new(c as i64, 2))]
}

fn arb_kind() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("N"), Just("R"), Just("A"), Just("RA"), Just("B")]
}

fn lines_total(lines: &[TaxLine]) -> Decimal {
    lines
        .iter()
        .filter(|line| VariantPolicy::general().matches_tax_family(&line.name))
        .map(|line| line.base + line.amount)
        .sum()
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    /// Classified amounts plus the non-subject remainder add up to the
    /// signed invoice total.
    #[test]
    fn breakdown_sums_to_total(
        lines in arb_lines(),
        extra in arb_extra(),
        kind in arb_kind(),
        received in any::<bool>(),
    ) {
        let (type_code, direction) = if received {
            ("in_invoice", Direction::Received)
        } else {
            ("out_invoice", Direction::Issued)
        };
        let total = lines_total(&lines) + extra;
        let inv = build_invoice(type_code, kind, lines, total);
        let ctx = context(direction, kind);
        let breakdown = calculate_breakdown(&inv, ctx, &VariantPolicy::general()).unwrap();

        let diff = (breakdown.declared_total().unwrap() - ctx.sign * total).abs();
        prop_assert!(diff <= dec!(0.01), "off by {}", diff);
        prop_assert_eq!(breakdown.non_subject, !extra.is_zero());
    }

    /// Credit-kind quotas are the negated absolute line amounts.
    #[test]
    fn credit_quotas_are_negative(lines in arb_lines()) {
        let total = lines_total(&lines);
        let inv = build_invoice("out_refund", "A", lines.clone(), total);
        let breakdown = calculate_breakdown(
            &inv,
            context(Direction::Issued, "A"),
            &VariantPolicy::general(),
        )
        .unwrap();

        let expected: Decimal = lines
            .iter()
            .filter(|line| line.name.starts_with("IVA") && !line.rate.is_zero())
            .map(|line| -line.amount.abs())
            .sum();
        let quotas: Decimal = breakdown
            .non_exempt_entries
            .iter()
            .chain(&breakdown.reverse_charge_entries)
            .map(|entry| entry.quota)
            .sum();
        prop_assert_eq!(quotas, expected);
        for entry in breakdown.non_exempt_entries.iter().chain(&breakdown.reverse_charge_entries) {
            prop_assert!(entry.quota <= Decimal::ZERO);
        }
    }

    /// Building twice from the same snapshot gives the same record and the
    /// same validation result.
    #[test]
    fn declaration_is_idempotent(lines in arb_lines(), extra in arb_extra()) {
        let total = lines_total(&lines) + extra;
        let inv = build_invoice("out_invoice", "N", lines, total);
        let policy = VariantPolicy::general();

        let first = sii::build(&inv, Direction::Issued, Variant::General).unwrap();
        let second = sii::build(&inv, Direction::Issued, Variant::General).unwrap();
        prop_assert_eq!(&first, &second);

        let first = sii::validate(first, &policy);
        let second = sii::validate(second, &policy);
        prop_assert_eq!(first, second);
    }

    /// Well-formed domestic invoices always validate.
    #[test]
    fn domestic_invoices_validate(lines in arb_lines(), extra in arb_extra()) {
        let total = lines_total(&lines) + extra;
        let inv = build_invoice("out_invoice", "N", lines, total);
        let outcome = sii::declare(&inv, Direction::Issued, Variant::General).unwrap();
        prop_assert!(outcome.successful, "{:?}", outcome.messages());
    }

    /// Substitutions of undeclared invoices always rectify zero amounts.
    #[test]
    fn substitution_zero_ignores_prior_amounts(
        base in arb_base(),
        kind in prop_oneof![Just("RA"), Just("B")],
    ) {
        let prior = InvoiceBuilder::new("F-PRIOR", "out_invoice")
            .issue_date(date(2024, 1, 10))
            .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
            .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
            .totals(base * dec!(1.21), base, base * dec!(0.21))
            .build()
            .unwrap();
        let inv = InvoiceBuilder::new("R-PROP", "out_invoice")
            .issue_date(date(2024, 6, 15))
            .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
            .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
            .rectification_kind(kind)
            .rectifies(prior)
            .build()
            .unwrap();

        let rect = sii::resolve_rectification(&inv, Direction::Issued, &VariantPolicy::general())
            .unwrap()
            .unwrap();
        prop_assert_eq!(rect.class, sii::RectificationClass::SubstitutionZero);
        let totals = rect.totals.unwrap();
        prop_assert_eq!(totals.base, Decimal::ZERO);
        prop_assert_eq!(totals.quota, Decimal::ZERO);
    }
}
