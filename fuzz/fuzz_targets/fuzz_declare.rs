#![no_main]

use std::str::FromStr;

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;
use suministro::core::*;
use suministro::sii::{self, Variant};

// Fields separated by '|': type code, kind tag, regime code, tax name,
// rate, base, total, issue date.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let fields: Vec<&str> = s.split('|').collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or("");
    let amount = |i: usize| Decimal::from_str(field(i)).unwrap_or_default();

    let mut builder = InvoiceBuilder::new("FUZZ-1", field(0))
        .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
        .counterparty(PartyBuilder::new("Cliente", field(8)).vat(field(9)).build())
        .rectification_kind(field(1))
        .regime_code(field(2))
        .add_tax_line(TaxLineBuilder::new(field(3), amount(5), amount(5), amount(4)).build())
        .totals(amount(6), amount(5), Decimal::ZERO);
    if let Ok(date) = NaiveDate::parse_from_str(field(7), "%Y-%m-%d") {
        builder = builder.issue_date(date);
    }
    let Ok(invoice) = builder.build() else {
        return;
    };

    // Must not panic; classification and period errors are fine.
    for variant in [Variant::General, Variant::Regional] {
        for direction in [Direction::Issued, Direction::Received] {
            let _ = sii::declare(&invoice, direction, variant);
        }
    }
});
