use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use suministro::core::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn company() -> Party {
    PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build()
}

fn customer() -> Party {
    PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build()
}

// --- Invoice builder ---

#[test]
fn builder_defaults() {
    let inv = InvoiceBuilder::new("F-1", "out_invoice")
        .company(company())
        .counterparty(customer())
        .build()
        .unwrap();

    assert_eq!(inv.number(), "F-1");
    assert_eq!(inv.rectification_kind(), "N");
    assert_eq!(inv.amount_total(), Decimal::ZERO);
    assert!(inv.tax_lines().is_empty());
    assert!(inv.rectified_invoice().is_none());
    assert!(!inv.already_declared());
    assert_eq!(inv.issue_date(), None);
}

#[test]
fn builder_requires_parties() {
    let err = InvoiceBuilder::new("F-1", "out_invoice")
        .counterparty(customer())
        .build()
        .unwrap_err();
    assert!(matches!(err, DeclarationError::Builder(_)));
    assert_eq!(err.to_string(), "builder error: company is required");

    let err = InvoiceBuilder::new("F-1", "out_invoice")
        .company(company())
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("counterparty"));
}

#[test]
fn builder_rejects_excessive_lines() {
    let mut builder = InvoiceBuilder::new("F-1", "out_invoice")
        .company(company())
        .counterparty(customer());
    for _ in 0..10_001 {
        builder = builder.add_tax_line(
            TaxLineBuilder::new("IVA 21%", dec!(1), dec!(0.21), dec!(21)).build(),
        );
    }
    assert!(builder.build().is_err());
}

#[test]
fn builder_rejects_oversized_amounts() {
    let huge = Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0);

    let err = InvoiceBuilder::new("F-1", "out_invoice")
        .company(company())
        .counterparty(customer())
        .add_tax_line(TaxLineBuilder::new("IVA 21%", huge, huge, dec!(21)).build())
        .build()
        .unwrap_err();
    assert!(matches!(err, DeclarationError::Builder(_)));

    let err = InvoiceBuilder::new("F-1", "out_invoice")
        .company(company())
        .counterparty(customer())
        .totals(-huge, Decimal::ZERO, Decimal::ZERO)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("exceeds the maximum"));

    let at_limit = InvoiceBuilder::new("F-1", "out_invoice")
        .company(company())
        .counterparty(customer())
        .totals(MAX_AMOUNT, MAX_AMOUNT, Decimal::ZERO)
        .build();
    assert!(at_limit.is_ok());
}

#[test]
fn rectification_link_is_exposed() {
    let original = InvoiceBuilder::new("F-1", "out_invoice")
        .issue_date(date(2024, 1, 10))
        .company(company())
        .counterparty(customer())
        .already_declared(true)
        .build()
        .unwrap();
    let credit = InvoiceBuilder::new("A-1", "out_refund")
        .company(company())
        .counterparty(customer())
        .rectification_kind("A")
        .rectifies(original)
        .build()
        .unwrap();

    let prior = credit.rectified_invoice().unwrap();
    assert_eq!(prior.number(), "F-1");
    assert!(prior.already_declared());
    assert_eq!(prior.issue_date(), Some(date(2024, 1, 10)));
}

// --- Classification enums ---

#[test]
fn invoice_types() {
    for code in ["out_invoice", "out_refund", "in_invoice", "in_refund"] {
        assert_eq!(InvoiceType::from_code(code).unwrap().code(), code);
    }
    assert_eq!(
        InvoiceType::from_code("in_refund").unwrap().direction(),
        Direction::Received
    );
    assert_eq!(
        InvoiceType::from_code("out_refund").unwrap().direction(),
        Direction::Issued
    );
    assert!(InvoiceType::from_code("entry").is_none());
}

#[test]
fn directions_parse() {
    assert_eq!("issued".parse::<Direction>().unwrap(), Direction::Issued);
    assert_eq!(" Recibida ".parse::<Direction>().unwrap(), Direction::Received);
    let err = "sideways".parse::<Direction>().unwrap_err();
    assert!(matches!(err, DeclarationError::Classification(_)));
}

#[test]
fn rectification_tags() {
    assert_eq!(RectificationKind::from_tag(""), Some(RectificationKind::Normal));
    for tag in ["N", "R", "A", "RA", "B"] {
        assert_eq!(RectificationKind::from_tag(tag).unwrap().tag(), tag);
    }
    assert!(RectificationKind::from_tag("X").is_none());
    assert!(!RectificationKind::Normal.is_rectifying());
    assert!(RectificationKind::Credit.is_rectifying());
    assert!(!RectificationKind::Credit.is_substitution());
    assert!(RectificationKind::SubstitutionCredit.is_substitution());
}

// --- Tax lines and parties ---

#[test]
fn reverse_charge_names() {
    let line = |name: &str| TaxLineBuilder::new(name, dec!(100), dec!(21), dec!(21)).build();
    assert!(line("IVA 21% ISP").is_reverse_charge());
    assert!(line("IVA Inversion del Sujeto Pasivo").is_reverse_charge());
    assert!(line("VAT reverse-charge").is_reverse_charge());
    assert!(!line("IVA 21%").is_reverse_charge());
    assert!(!line("IVA DISPENSA").is_reverse_charge());
}

#[test]
fn party_tax_id() {
    assert_eq!(company().tax_id(), Some("B12345678"));
    assert!(company().is_domestic());

    let french = PartyBuilder::new("Client SARL", "FR").vat("FR12345678901").build();
    assert_eq!(french.tax_id(), Some("12345678901"));
    assert!(!french.is_domestic());

    let bare = PartyBuilder::new("Autónomo", "ES").vat(" 12345678Z ").build();
    assert_eq!(bare.tax_id(), Some("12345678Z"));

    let none = PartyBuilder::new("Sin NIF", "ES").vat("  ").build();
    assert_eq!(none.tax_id(), None);
}

#[test]
fn fiscal_period_bounds() {
    assert!(FiscalPeriod::new(2024, 1).is_some());
    assert!(FiscalPeriod::new(2024, 12).is_some());
    assert!(FiscalPeriod::new(2024, 0).is_none());
    assert!(FiscalPeriod::new(2024, 13).is_none());
}

// --- Counterparty classification ---

#[test]
fn country_classifier() {
    let classifier = CountryClassifier;
    assert_eq!(classifier.classify(&customer()), IdType::Nif);
    assert_eq!(
        classifier.classify(&PartyBuilder::new("GmbH", "DE").vat("DE123456789").build()),
        IdType::NifIva
    );
    assert_eq!(
        classifier.classify(&PartyBuilder::new("Inc", "US").build()),
        IdType::Other
    );
}

// --- External invoice providers ---

/// Minimal provider that is not the crate's own snapshot type.
struct LedgerEntry {
    company: Party,
    counterparty: Party,
    lines: Vec<TaxLine>,
}

impl InvoiceSource for LedgerEntry {
    fn number(&self) -> &str {
        "LEDGER-1"
    }
    fn type_code(&self) -> &str {
        "out_invoice"
    }
    fn issue_date(&self) -> Option<NaiveDate> {
        Some(date(2024, 2, 29))
    }
    fn accounting_date(&self) -> Option<NaiveDate> {
        None
    }
    fn declared_period(&self) -> Option<FiscalPeriod> {
        None
    }
    fn company(&self) -> &Party {
        &self.company
    }
    fn counterparty(&self) -> &Party {
        &self.counterparty
    }
    fn supplier_number(&self) -> Option<&str> {
        None
    }
    fn description(&self) -> Option<&str> {
        Some("Consultoría")
    }
    fn amount_total(&self) -> Decimal {
        dec!(110)
    }
    fn amount_untaxed(&self) -> Decimal {
        dec!(100)
    }
    fn amount_tax(&self) -> Decimal {
        dec!(10)
    }
    fn tax_lines(&self) -> &[TaxLine] {
        &self.lines
    }
    fn rectification_kind(&self) -> &str {
        "N"
    }
    fn rectified_invoice(&self) -> Option<&dyn InvoiceSource> {
        None
    }
    fn regime_code(&self) -> Option<&str> {
        Some("1")
    }
    fn leased_property(&self) -> Option<&LeasedProperty> {
        None
    }
    fn already_declared(&self) -> bool {
        false
    }
    fn fiscal_position(&self) -> Option<&str> {
        None
    }
}

#[cfg(feature = "sii")]
#[test]
fn external_provider_with_overflowing_amounts_is_an_error() {
    use suministro::sii::{self, Variant};

    let huge = Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0);
    let entry = LedgerEntry {
        company: company(),
        counterparty: customer(),
        lines: vec![TaxLineBuilder::new("IVA 21%", huge, huge, dec!(21)).build()],
    };
    let err = sii::declare(&entry, Direction::Issued, Variant::General).unwrap_err();
    assert!(matches!(err, DeclarationError::Amount(_)), "{err}");
    assert_eq!(
        err.to_string(),
        "amount error: invoice LEDGER-1: amounts exceed the representable range"
    );
}

#[cfg(feature = "sii")]
#[test]
fn external_provider_declares() {
    use suministro::sii::{self, Variant};

    let entry = LedgerEntry {
        company: company(),
        counterparty: customer(),
        lines: vec![TaxLineBuilder::new("IVA 10%", dec!(100), dec!(10), dec!(10)).build()],
    };
    let outcome = sii::declare(&entry, Direction::Issued, Variant::General).unwrap();
    assert!(outcome.successful, "{:?}", outcome.messages());
    assert_eq!(
        outcome
            .record
            .body
            .get_path("RegistroLRFacturasEmitidas.FacturaExpedida.DescripcionOperacion")
            .and_then(sii::Value::as_text),
        Some("Consultoría")
    );
}
