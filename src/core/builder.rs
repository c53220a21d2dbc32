use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::DeclarationError;
use super::types::*;

/// Largest absolute amount accepted on an invoice snapshot or tax line.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000_000);

/// Builder for invoice snapshots.
///
/// ```
/// use suministro::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("F-2024-001", "out_invoice")
///     .issue_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
///     .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
///     .add_tax_line(TaxLineBuilder::new("IVA 21%", dec!(100), dec!(21), dec!(21)).build())
///     .totals(dec!(121), dec!(100), dec!(21))
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.tax_lines.len(), 1);
/// ```
pub struct InvoiceBuilder {
    number: String,
    type_code: String,
    issue_date: Option<NaiveDate>,
    accounting_date: Option<NaiveDate>,
    declared_period: Option<FiscalPeriod>,
    company: Option<Party>,
    counterparty: Option<Party>,
    supplier_number: Option<String>,
    description: Option<String>,
    amount_total: Decimal,
    amount_untaxed: Decimal,
    amount_tax: Decimal,
    tax_lines: Vec<TaxLine>,
    rectification_kind: String,
    rectifies: Option<Box<Invoice>>,
    regime_code: Option<String>,
    leased_property: Option<LeasedProperty>,
    already_declared: bool,
    fiscal_position: Option<String>,
}

impl InvoiceBuilder {
    pub fn new(number: impl Into<String>, type_code: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            type_code: type_code.into(),
            issue_date: None,
            accounting_date: None,
            declared_period: None,
            company: None,
            counterparty: None,
            supplier_number: None,
            description: None,
            amount_total: Decimal::ZERO,
            amount_untaxed: Decimal::ZERO,
            amount_tax: Decimal::ZERO,
            tax_lines: Vec::new(),
            rectification_kind: RectificationKind::Normal.tag().to_string(),
            rectifies: None,
            regime_code: None,
            leased_property: None,
            already_declared: false,
            fiscal_position: None,
        }
    }

    pub fn issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }

    pub fn accounting_date(mut self, date: NaiveDate) -> Self {
        self.accounting_date = Some(date);
        self
    }

    pub fn declared_period(mut self, period: FiscalPeriod) -> Self {
        self.declared_period = Some(period);
        self
    }

    pub fn company(mut self, party: Party) -> Self {
        self.company = Some(party);
        self
    }

    pub fn counterparty(mut self, party: Party) -> Self {
        self.counterparty = Some(party);
        self
    }

    pub fn supplier_number(mut self, number: impl Into<String>) -> Self {
        self.supplier_number = Some(number.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set total, untaxed base and tax amount.
    pub fn totals(mut self, total: Decimal, untaxed: Decimal, tax: Decimal) -> Self {
        self.amount_total = total;
        self.amount_untaxed = untaxed;
        self.amount_tax = tax;
        self
    }

    pub fn add_tax_line(mut self, line: TaxLine) -> Self {
        self.tax_lines.push(line);
        self
    }

    pub fn rectification_kind(mut self, tag: impl Into<String>) -> Self {
        self.rectification_kind = tag.into();
        self
    }

    /// Link the invoice this one immediately rectifies.
    pub fn rectifies(mut self, original: Invoice) -> Self {
        self.rectifies = Some(Box::new(original));
        self
    }

    pub fn regime_code(mut self, code: impl Into<String>) -> Self {
        self.regime_code = Some(code.into());
        self
    }

    pub fn leased_property(mut self, property: LeasedProperty) -> Self {
        self.leased_property = Some(property);
        self
    }

    pub fn already_declared(mut self, declared: bool) -> Self {
        self.already_declared = declared;
        self
    }

    pub fn fiscal_position(mut self, tag: impl Into<String>) -> Self {
        self.fiscal_position = Some(tag.into());
        self
    }

    /// Build the snapshot. Company and counterparty are mandatory; every
    /// other gap is left for the declaration validator to report.
    pub fn build(self) -> Result<Invoice, DeclarationError> {
        let company = self
            .company
            .ok_or_else(|| DeclarationError::Builder("company is required".into()))?;
        let counterparty = self
            .counterparty
            .ok_or_else(|| DeclarationError::Builder("counterparty is required".into()))?;

        if self.tax_lines.len() > 10_000 {
            return Err(DeclarationError::Builder(
                "invoice cannot have more than 10,000 tax lines".into(),
            ));
        }

        let amounts = [self.amount_total, self.amount_untaxed, self.amount_tax]
            .into_iter()
            .chain(
                self.tax_lines
                    .iter()
                    .flat_map(|line| [line.base, line.amount, line.rate]),
            );
        for amount in amounts {
            if amount.abs() > MAX_AMOUNT {
                return Err(DeclarationError::Builder(format!(
                    "amount {amount} exceeds the maximum of {MAX_AMOUNT}"
                )));
            }
        }

        Ok(Invoice {
            number: self.number,
            type_code: self.type_code,
            issue_date: self.issue_date,
            accounting_date: self.accounting_date,
            declared_period: self.declared_period,
            company,
            counterparty,
            supplier_number: self.supplier_number,
            description: self.description,
            amount_total: self.amount_total,
            amount_untaxed: self.amount_untaxed,
            amount_tax: self.amount_tax,
            tax_lines: self.tax_lines,
            rectification_kind: self.rectification_kind,
            rectifies: self.rectifies,
            regime_code: self.regime_code,
            leased_property: self.leased_property,
            already_declared: self.already_declared,
            fiscal_position: self.fiscal_position,
        })
    }
}

/// Builder for Party (company or counterparty).
pub struct PartyBuilder {
    name: String,
    vat: Option<String>,
    country_code: String,
    registered: bool,
}

impl PartyBuilder {
    /// New party, registered in the census by default.
    pub fn new(name: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vat: None,
            country_code: country_code.into(),
            registered: true,
        }
    }

    pub fn vat(mut self, vat: impl Into<String>) -> Self {
        self.vat = Some(vat.into());
        self
    }

    pub fn registered(mut self, registered: bool) -> Self {
        self.registered = registered;
        self
    }

    pub fn build(self) -> Party {
        Party {
            name: self.name,
            vat: self.vat,
            country_code: self.country_code,
            registered: self.registered,
        }
    }
}

/// Builder for TaxLine.
pub struct TaxLineBuilder {
    name: String,
    base: Decimal,
    amount: Decimal,
    rate: Decimal,
    rate_type: RateType,
}

impl TaxLineBuilder {
    pub fn new(name: impl Into<String>, base: Decimal, amount: Decimal, rate: Decimal) -> Self {
        Self {
            name: name.into(),
            base,
            amount,
            rate,
            rate_type: RateType::Proportional,
        }
    }

    pub fn rate_type(mut self, rate_type: RateType) -> Self {
        self.rate_type = rate_type;
        self
    }

    pub fn build(self) -> TaxLine {
        TaxLine {
            name: self.name,
            base: self.base,
            amount: self.amount,
            rate: self.rate,
            rate_type: self.rate_type,
        }
    }
}
