use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use suministro::core::*;
use suministro::sii::{self, BreakdownContext, Variant, VariantPolicy};

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn build_invoice(number: &str, lines: usize) -> Invoice {
    let mut builder = InvoiceBuilder::new(number, "out_invoice")
        .issue_date(test_date())
        .company(PartyBuilder::new("Benchmark SL", "ES").vat("ESB12345678").build())
        .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build());

    let rates = [dec!(21), dec!(10), dec!(4), dec!(0)];
    let mut total = Decimal::ZERO;
    for i in 0..lines {
        let rate = rates[i % rates.len()];
        let base = dec!(120);
        let quota = (base * rate / dec!(100)).round_dp(2);
        let name = if rate.is_zero() {
            "IVA Exento".to_string()
        } else {
            format!("IVA {rate}%")
        };
        total += base + quota;
        builder = builder.add_tax_line(TaxLineBuilder::new(name, base, quota, rate).build());
    }

    builder.totals(total, Decimal::ZERO, Decimal::ZERO).build().unwrap()
}

fn bench_breakdown(c: &mut Criterion) {
    let invoice = build_invoice("BENCH-BIG", 1000);
    let policy = VariantPolicy::general();
    let ctx = BreakdownContext {
        direction: Direction::Issued,
        sign: Decimal::ONE,
        export: false,
        import: false,
    };
    c.bench_function("breakdown_1000_lines", |b| {
        b.iter(|| black_box(sii::calculate_breakdown(black_box(&invoice), ctx, &policy)));
    });
}

fn bench_build(c: &mut Criterion) {
    let invoice = build_invoice("BENCH-001", 10);
    c.bench_function("build_declaration_10_lines", |b| {
        b.iter(|| black_box(sii::build(black_box(&invoice), Direction::Issued, Variant::General)));
    });
}

fn bench_validate(c: &mut Criterion) {
    let invoice = build_invoice("BENCH-001", 10);
    let record = sii::build(&invoice, Direction::Issued, Variant::General).unwrap();
    let policy = VariantPolicy::general();
    c.bench_function("validate_declaration", |b| {
        b.iter(|| black_box(sii::validate(black_box(record.clone()), &policy)));
    });
}

fn bench_declare_batch(c: &mut Criterion) {
    let invoices: Vec<_> = (1..=100)
        .map(|n| build_invoice(&format!("F-2024-{n:04}"), 2))
        .collect();
    c.bench_function("declare_100_invoices", |b| {
        b.iter(|| {
            for invoice in &invoices {
                black_box(sii::declare(invoice, Direction::Issued, Variant::General).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_breakdown,
    bench_build,
    bench_validate,
    bench_declare_batch
);
criterion_main!(benches);
