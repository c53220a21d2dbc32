#![no_main]

use libfuzzer_sys::fuzz_target;
use suministro::core::*;
use suministro::sii::{self, Value, Variant, VariantPolicy};

const FIELDS: &[&str] = &[
    "RegistroLRFacturasEmitidas.IDFactura.FechaExpedicionFacturaEmisor",
    "RegistroLRFacturasEmitidas.IDFactura.NumSerieFacturaEmisor",
    "RegistroLRFacturasEmitidas.FacturaExpedida.DescripcionOperacion",
    "RegistroLRFacturasEmitidas.FacturaExpedida.ImporteTotal",
    "Cabecera.Titular.NombreRazon",
];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };
    let Ok(invoice) = InvoiceBuilder::new("FUZZ-1", "out_invoice")
        .issue_date(chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
        .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
        .build()
    else {
        return;
    };
    let Ok(mut record) = sii::build(&invoice, Direction::Issued, Variant::General) else {
        return;
    };

    let path = FIELDS[selector as usize % FIELDS.len()];
    if let Some(slot) = record.body.get_path_mut(path) {
        *slot = Value::from(text);
    }

    // Must not panic, whatever text lands in the field.
    let _ = sii::validate(record, &VariantPolicy::general());
});
