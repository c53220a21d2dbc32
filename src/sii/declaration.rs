//! Assembly of the full declaration record from an invoice.

use chrono::Datelike;
use rust_decimal::Decimal;
use tracing::debug;

use super::breakdown::{
    BreakdownContext, QuotaRole, TaxBreakdown, TaxBreakdownEntry, amount_overflow,
    calculate_breakdown,
};
use super::lease::{is_lease_regime, lease_block};
use super::policy::{EXPORT_REGIME_CODE, IMPORT_REGIME_CODE, Variant, VariantPolicy};
use super::record::{DeclarationRecord, Node, register_name};
use super::rectification::{
    NORMAL_TYPE_CODE, Rectification, parse_kind, resolve_rectification, series_number,
};
use super::validate::{ValidationOutcome, validate};
use crate::core::{
    CounterpartyClassifier, CountryClassifier, DeclarationError, Direction, FiscalPeriod, IdType,
    InvoiceSource, InvoiceType, Party,
};

/// Maximum length of `DescripcionOperacion`.
pub const DESCRIPTION_MAX_LENGTH: usize = 500;
/// Description declared when the invoice has none.
pub const DEFAULT_DESCRIPTION: &str = "/";

/// Build the declaration record of an invoice with the variant's default
/// policy and the country-table counterparty classifier.
pub fn build(
    invoice: &dyn InvoiceSource,
    direction: Direction,
    variant: Variant,
) -> Result<DeclarationRecord, DeclarationError> {
    DeclarationBuilder::new(VariantPolicy::for_variant(variant)).build(invoice, direction)
}

/// Build with an explicit policy and counterparty classifier.
pub fn build_with<C: CounterpartyClassifier>(
    invoice: &dyn InvoiceSource,
    direction: Direction,
    policy: VariantPolicy,
    classifier: C,
) -> Result<DeclarationRecord, DeclarationError> {
    DeclarationBuilder::new(policy)
        .with_classifier(classifier)
        .build(invoice, direction)
}

/// Build and validate in one call.
///
/// Fatal errors abort with `Err`; field-level problems are reported in the
/// returned outcome.
pub fn declare(
    invoice: &dyn InvoiceSource,
    direction: Direction,
    variant: Variant,
) -> Result<ValidationOutcome, DeclarationError> {
    DeclarationBuilder::new(VariantPolicy::for_variant(variant)).declare(invoice, direction)
}

/// Reporting period of an invoice: declared period, else accounting date,
/// else issue date.
pub fn resolve_period(invoice: &dyn InvoiceSource) -> Result<FiscalPeriod, DeclarationError> {
    if let Some(period) = invoice.declared_period() {
        return Ok(period);
    }
    invoice
        .accounting_date()
        .or(invoice.issue_date())
        .map(|date| FiscalPeriod {
            year: date.year(),
            month: date.month(),
        })
        .ok_or_else(|| {
            DeclarationError::PeriodResolution(format!(
                "invoice {} has no declared period, accounting date or issue date",
                invoice.number()
            ))
        })
}

/// Builder turning invoices into declaration records.
///
/// ```
/// use suministro::core::*;
/// use suministro::sii::*;
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let invoice = InvoiceBuilder::new("F-2024-001", "out_invoice")
///     .issue_date(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap())
///     .company(PartyBuilder::new("ACME SL", "ES").vat("ESB12345678").build())
///     .counterparty(PartyBuilder::new("Cliente SA", "ES").vat("ESA87654321").build())
///     .add_tax_line(TaxLineBuilder::new("IVA 21%", dec!(100), dec!(21), dec!(21)).build())
///     .totals(dec!(121), dec!(100), dec!(21))
///     .build()
///     .unwrap();
///
/// let outcome = DeclarationBuilder::new(VariantPolicy::general())
///     .declare(&invoice, Direction::Issued)
///     .unwrap();
/// assert!(outcome.successful, "{:?}", outcome.messages());
/// ```
#[derive(Debug, Clone)]
pub struct DeclarationBuilder<C = CountryClassifier> {
    policy: VariantPolicy,
    classifier: C,
}

impl DeclarationBuilder<CountryClassifier> {
    pub fn new(policy: VariantPolicy) -> Self {
        Self {
            policy,
            classifier: CountryClassifier,
        }
    }
}

impl<C: CounterpartyClassifier> DeclarationBuilder<C> {
    /// Replace the counterparty classifier.
    pub fn with_classifier<D: CounterpartyClassifier>(
        self,
        classifier: D,
    ) -> DeclarationBuilder<D> {
        DeclarationBuilder {
            policy: self.policy,
            classifier,
        }
    }

    pub fn policy(&self) -> &VariantPolicy {
        &self.policy
    }

    /// Build and validate in one call.
    pub fn declare(
        &self,
        invoice: &dyn InvoiceSource,
        direction: Direction,
    ) -> Result<ValidationOutcome, DeclarationError> {
        let record = self.build(invoice, direction)?;
        Ok(validate(record, &self.policy))
    }

    /// Build the declaration record.
    ///
    /// Fails before producing anything when the invoice type, requested
    /// direction or rectification tag cannot be classified, or when no
    /// reporting period can be derived.
    pub fn build(
        &self,
        invoice: &dyn InvoiceSource,
        direction: Direction,
    ) -> Result<DeclarationRecord, DeclarationError> {
        let invoice_type = InvoiceType::from_code(invoice.type_code()).ok_or_else(|| {
            DeclarationError::Classification(format!(
                "invoice {}: unknown invoice type '{}'",
                invoice.number(),
                invoice.type_code()
            ))
        })?;
        if invoice_type.direction() != direction {
            return Err(DeclarationError::Classification(format!(
                "invoice {}: type '{}' cannot be declared as {}",
                invoice.number(),
                invoice_type.code(),
                direction.as_str()
            )));
        }

        let kind = parse_kind(invoice)?;
        let period = resolve_period(invoice)?;
        let sign = self.policy.sign(kind);
        let regime = self.policy.regime_code(invoice.regime_code());

        debug!(
            invoice = invoice.number(),
            direction = direction.as_str(),
            variant = self.policy.variant().as_str(),
            regime,
            kind = kind.tag(),
            "building declaration"
        );

        let extra_community = invoice.fiscal_position().is_some_and(is_extra_community);
        let ctx = BreakdownContext {
            direction,
            sign,
            export: direction == Direction::Issued
                && (regime == EXPORT_REGIME_CODE || extra_community),
            import: direction == Direction::Received
                && (regime == IMPORT_REGIME_CODE || extra_community),
        };
        let breakdown = calculate_breakdown(invoice, ctx, &self.policy)?;
        let rectification = resolve_rectification(invoice, direction, &self.policy)?;

        let total = sign
            .checked_mul(invoice.amount_total())
            .ok_or_else(|| amount_overflow(invoice))?;
        let deductible = breakdown
            .deductible_quota()
            .ok_or_else(|| amount_overflow(invoice))?;

        let mut detail = rectification_fields(rectification.as_ref());
        detail.insert("ClaveRegimenEspecialOTrascendencia", regime);
        detail.insert("ImporteTotal", total);
        detail.insert("DescripcionOperacion", description(invoice));
        if is_lease_regime(regime) {
            detail.insert("DatosInmueble", lease_block(invoice.leased_property()));
        }

        let counterparty = self.counterparty(invoice.counterparty(), direction);
        let detail = match direction {
            Direction::Issued => {
                let foreign = !invoice.counterparty().is_domestic();
                detail
                    .with("Contraparte", counterparty)
                    .with("TipoDesglose", self.issued_breakdown(&breakdown, foreign))
            }
            Direction::Received => detail
                .with("DesgloseFactura", self.received_breakdown(&breakdown))
                .with("Contraparte", counterparty)
                .with_opt(
                    "FechaRegContable",
                    invoice.accounting_date().or(invoice.issue_date()),
                )
                .with("CuotaDeducible", deductible),
        };

        let register = Node::new()
            .with(
                "PeriodoLiquidacion",
                Node::new()
                    .with("Ejercicio", period.year.to_string())
                    .with("Periodo", format!("{:02}", period.month)),
            )
            .with("IDFactura", self.invoice_identity(invoice, direction))
            .with(detail_name(direction), detail);

        let body = Node::new()
            .with("Cabecera", self.header(invoice))
            .with(register_name(direction), register);

        debug!(invoice = invoice.number(), "declaration built");

        Ok(DeclarationRecord {
            direction,
            variant: self.policy.variant(),
            operation_date: invoice.issue_date(),
            body,
        })
    }

    fn header(&self, invoice: &dyn InvoiceSource) -> Node {
        let company = invoice.company();
        let communication = if invoice.already_declared() {
            "A1"
        } else {
            "A0"
        };
        Node::new()
            .with("IDVersionSii", self.policy.version())
            .with(
                "Titular",
                Node::new()
                    .with("NombreRazon", company.name.as_str())
                    .with_opt("NIF", company.tax_id()),
            )
            .with("TipoComunicacion", communication)
    }

    fn invoice_identity(&self, invoice: &dyn InvoiceSource, direction: Direction) -> Node {
        let issuer = match direction {
            Direction::Issued => Node::new().with_opt("NIF", invoice.company().tax_id()),
            Direction::Received => self.identify(Node::new(), invoice.counterparty(), direction),
        };
        Node::new()
            .with("IDEmisorFactura", issuer)
            .with("NumSerieFacturaEmisor", series_number(invoice, direction))
            .with_opt("FechaExpedicionFacturaEmisor", invoice.issue_date())
    }

    fn counterparty(&self, party: &Party, direction: Direction) -> Node {
        let node = Node::new().with("NombreRazon", party.name.as_str());
        self.identify(node, party, direction)
    }

    /// Append either `NIF` or `IDOtro` identifying `party`.
    fn identify(&self, node: Node, party: &Party, direction: Direction) -> Node {
        let id_type = if direction == Direction::Received
            && party.is_domestic()
            && !party.registered
        {
            IdType::NotOnFile
        } else {
            self.classifier.classify(party)
        };

        match id_type.code() {
            None => node.with_opt("NIF", party.tax_id()),
            Some(code) => {
                let id = if party.is_domestic() {
                    party.tax_id()
                } else {
                    party.vat.as_deref().map(str::trim).filter(|vat| !vat.is_empty())
                };
                node.with(
                    "IDOtro",
                    Node::new()
                        .with("CodigoPais", party.country_code.to_uppercase())
                        .with("IDType", code)
                        .with_opt("ID", id),
                )
            }
        }
    }

    fn detail_entry(&self, entry: &TaxBreakdownEntry) -> Node {
        Node::new()
            .with("TipoImpositivo", entry.rate)
            .with("BaseImponible", entry.base)
            .with(entry.role.field_name(), entry.quota)
    }

    fn zero_entry(&self, role: QuotaRole) -> Node {
        self.detail_entry(&TaxBreakdownEntry {
            rate: Decimal::ZERO,
            base: Decimal::ZERO,
            quota: Decimal::ZERO,
            role,
        })
    }

    fn rate_container(&self, entries: Vec<Node>) -> Node {
        Node::new().with(self.policy.detail_entry(), entries)
    }

    fn issued_breakdown(&self, breakdown: &TaxBreakdown, foreign: bool) -> Node {
        let mut desglose = Node::new();

        if breakdown.subject_to_tax {
            let mut subject = Node::new();
            if breakdown.exempt {
                subject.insert(
                    "Exenta",
                    Node::new().with(
                        "DetalleExenta",
                        vec![Node::new().with("BaseImponible", breakdown.exempt_total)],
                    ),
                );
            }
            let has_regular = !breakdown.non_exempt_entries.is_empty();
            let has_reverse = !breakdown.reverse_charge_entries.is_empty();
            if has_regular || has_reverse {
                let kind = match (has_regular, has_reverse) {
                    (true, true) => "S3",
                    (false, true) => "S2",
                    _ => "S1",
                };
                let entries = breakdown
                    .non_exempt_entries
                    .iter()
                    .chain(&breakdown.reverse_charge_entries)
                    .map(|entry| self.detail_entry(entry))
                    .collect();
                subject.insert(
                    "NoExenta",
                    Node::new()
                        .with("TipoNoExenta", kind)
                        .with(self.policy.breakdown_container(), self.rate_container(entries)),
                );
            }
            desglose.insert("Sujeta", subject);
        }

        if breakdown.non_subject {
            let field = if foreign {
                "ImporteTAIReglasLocalizacion"
            } else {
                "ImportePorArticulos7_14_Otros"
            };
            desglose.insert(
                "NoSujeta",
                Node::new().with(field, breakdown.non_subject_amount),
            );
        }

        if desglose.is_empty() {
            desglose.insert(
                "Sujeta",
                Node::new().with(
                    "NoExenta",
                    Node::new().with("TipoNoExenta", "S1").with(
                        self.policy.breakdown_container(),
                        self.rate_container(vec![self.zero_entry(QuotaRole::Charged)]),
                    ),
                ),
            );
        }

        if foreign {
            Node::new().with(
                "DesgloseTipoOperacion",
                Node::new().with("Entrega", desglose),
            )
        } else {
            Node::new().with("DesgloseFactura", desglose)
        }
    }

    fn received_breakdown(&self, breakdown: &TaxBreakdown) -> Node {
        let mut desglose = Node::new();

        if !breakdown.reverse_charge_entries.is_empty() {
            let entries = breakdown
                .reverse_charge_entries
                .iter()
                .map(|entry| self.detail_entry(entry))
                .collect();
            desglose.insert("InversionSujetoPasivo", self.rate_container(entries));
        }

        let mut entries: Vec<Node> = breakdown
            .non_exempt_entries
            .iter()
            .map(|entry| self.detail_entry(entry))
            .collect();
        if breakdown.exempt {
            entries.push(Node::new().with("BaseImponible", breakdown.exempt_total));
        }
        if entries.is_empty() && desglose.is_empty() {
            entries.push(self.zero_entry(QuotaRole::Borne));
        }
        if !entries.is_empty() {
            desglose.insert(
                self.policy.breakdown_container(),
                self.rate_container(entries),
            );
        }

        desglose
    }
}

fn detail_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Issued => "FacturaExpedida",
        Direction::Received => "FacturaRecibida",
    }
}

fn is_extra_community(fiscal_position: &str) -> bool {
    fiscal_position.to_lowercase().contains("extracomunitari")
}

fn description(invoice: &dyn InvoiceSource) -> String {
    match invoice.description().map(str::trim) {
        Some(text) if !text.is_empty() => text.chars().take(DESCRIPTION_MAX_LENGTH).collect(),
        _ => DEFAULT_DESCRIPTION.to_string(),
    }
}

/// `TipoFactura` and, for rectifications, the fields describing what is
/// being rectified.
fn rectification_fields(rectification: Option<&Rectification>) -> Node {
    let Some(rect) = rectification else {
        return Node::new().with("TipoFactura", NORMAL_TYPE_CODE);
    };

    let mut node = Node::new()
        .with("TipoFactura", rect.type_code)
        .with("TipoRectificativa", rect.mode.code());
    if let Some(reference) = &rect.reference {
        let id = Node::new()
            .with("NumSerieFacturaEmisor", reference.series_number.as_str())
            .with_opt("FechaExpedicionFacturaEmisor", reference.issue_date);
        node.insert(
            "FacturasRectificadas",
            Node::new().with("IDFacturaRectificada", vec![id]),
        );
    }
    if let Some(totals) = rect.totals {
        node.insert(
            "ImporteRectificacion",
            Node::new()
                .with("BaseRectificada", totals.base)
                .with("CuotaRectificada", totals.quota),
        );
    }
    node
}
