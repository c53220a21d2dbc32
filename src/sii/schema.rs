//! Field contract of a declaration record.
//!
//! The contract is closed: every field a record may carry is listed here,
//! together with its type, whether it is required, its allowed values and
//! its maximum length. [`declaration_schema`] builds the contract for one
//! direction and variant.

use super::policy::VariantPolicy;
use super::record::register_name;
use crate::core::Direction;
use crate::core::ID_TYPE_CODES;
use crate::core::countries::COUNTRY_CODES;

pub const INVOICE_TYPE_CODES: &[&str] = &["F1", "F2", "R1", "R2", "R3", "R4", "R5"];
pub const COMMUNICATION_TYPES: &[&str] = &["A0", "A1"];
pub const RECTIFICATION_MODES: &[&str] = &["S", "I"];
pub const NON_EXEMPT_TYPES: &[&str] = &["S1", "S2", "S3"];
pub const EXEMPTION_CAUSES: &[&str] = &["E1", "E2", "E3", "E4", "E5", "E6"];
pub const SITUS_CODES: &[&str] = &["1", "2", "3", "4"];
pub const PERIOD_CODES: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12",
];

const NAME_MAX_LENGTH: usize = 120;
const NIF_MAX_LENGTH: usize = 9;
const SERIES_NUMBER_MAX_LENGTH: usize = 60;
const DESCRIPTION_MAX_LENGTH: usize = 500;
const FOREIGN_ID_MAX_LENGTH: usize = 20;
const CADASTRAL_REFERENCE_MAX_LENGTH: usize = 25;

/// Expected shape of a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Text,
    Amount,
    /// Amount that must also be a valid tax rate on the operation date.
    Rate,
    /// Calendar date; accepted typed or as text, emitted as `DD-MM-YYYY`.
    Date,
    Node(Schema),
    /// Non-empty list of nodes sharing one schema.
    List(Schema),
}

/// Contract of a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub choices: Option<Vec<&'static str>>,
    pub max_length: Option<usize>,
}

impl FieldRule {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            choices: None,
            max_length: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn amount(name: &'static str) -> Self {
        Self::new(name, FieldType::Amount)
    }

    pub fn rate(name: &'static str) -> Self {
        Self::new(name, FieldType::Rate)
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn node(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldType::Node(schema))
    }

    pub fn list(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldType::List(schema))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = &'static str>) -> Self {
        self.choices = Some(choices.into_iter().collect());
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Contract of a node: its fields plus groups of which at least one
/// member must be present.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldRule>,
    pub one_of: Vec<Vec<&'static str>>,
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            one_of: Vec::new(),
        }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn at_least_one_of(mut self, group: &[&'static str]) -> Self {
        self.one_of.push(group.to_vec());
        self
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }
}

/// Full contract of a declaration body for `direction` under `policy`.
pub fn declaration_schema(direction: Direction, policy: &VariantPolicy) -> Schema {
    let (detail_name, detail) = match direction {
        Direction::Issued => ("FacturaExpedida", issued_detail(policy)),
        Direction::Received => ("FacturaRecibida", received_detail(policy)),
    };

    let register = Schema::new(register_name(direction))
        .field(FieldRule::node("PeriodoLiquidacion", period()).required())
        .field(FieldRule::node("IDFactura", invoice_id(direction)).required())
        .field(FieldRule::node(detail_name, detail).required());

    Schema::new("Body")
        .field(FieldRule::node("Cabecera", header(policy)).required())
        .field(FieldRule::node(register_name(direction), register).required())
}

fn header(policy: &VariantPolicy) -> Schema {
    Schema::new("Cabecera")
        .field(
            FieldRule::text("IDVersionSii")
                .required()
                .choices([policy.version()]),
        )
        .field(
            FieldRule::node(
                "Titular",
                Schema::new("Titular")
                    .field(FieldRule::text("NombreRazon").required().max_length(NAME_MAX_LENGTH))
                    .field(FieldRule::text("NIF").required().max_length(NIF_MAX_LENGTH)),
            )
            .required(),
        )
        .field(
            FieldRule::text("TipoComunicacion")
                .required()
                .choices(COMMUNICATION_TYPES.iter().copied()),
        )
}

fn period() -> Schema {
    Schema::new("PeriodoLiquidacion")
        .field(FieldRule::text("Ejercicio").required().max_length(4))
        .field(
            FieldRule::text("Periodo")
                .required()
                .choices(PERIOD_CODES.iter().copied()),
        )
}

/// `NIF` or `IDOtro`, at least one.
fn identified(name: &'static str) -> Schema {
    Schema::new(name)
        .field(FieldRule::text("NIF").max_length(NIF_MAX_LENGTH))
        .field(FieldRule::node("IDOtro", foreign_id()))
        .at_least_one_of(&["NIF", "IDOtro"])
}

fn foreign_id() -> Schema {
    Schema::new("IDOtro")
        .field(
            FieldRule::text("CodigoPais")
                .required()
                .choices(COUNTRY_CODES.iter().copied()),
        )
        .field(
            FieldRule::text("IDType")
                .required()
                .choices(ID_TYPE_CODES.iter().copied()),
        )
        .field(FieldRule::text("ID").required().max_length(FOREIGN_ID_MAX_LENGTH))
}

fn invoice_id(direction: Direction) -> Schema {
    let issuer = match direction {
        Direction::Issued => Schema::new("IDEmisorFactura")
            .field(FieldRule::text("NIF").required().max_length(NIF_MAX_LENGTH)),
        Direction::Received => identified("IDEmisorFactura"),
    };
    Schema::new("IDFactura")
        .field(FieldRule::node("IDEmisorFactura", issuer).required())
        .field(
            FieldRule::text("NumSerieFacturaEmisor")
                .required()
                .max_length(SERIES_NUMBER_MAX_LENGTH),
        )
        .field(FieldRule::date("FechaExpedicionFacturaEmisor").required())
}

fn counterparty() -> Schema {
    let mut schema = identified("Contraparte");
    schema.fields.insert(
        0,
        FieldRule::text("NombreRazon")
            .required()
            .max_length(NAME_MAX_LENGTH),
    );
    schema
}

/// Fields shared by issued and received detail blocks, in record order.
fn common_detail(name: &'static str, policy: &VariantPolicy) -> Schema {
    let rectified = Schema::new("IDFacturaRectificada")
        .field(
            FieldRule::text("NumSerieFacturaEmisor")
                .required()
                .max_length(SERIES_NUMBER_MAX_LENGTH),
        )
        .field(FieldRule::date("FechaExpedicionFacturaEmisor").required());

    Schema::new(name)
        .field(
            FieldRule::text("TipoFactura")
                .required()
                .choices(INVOICE_TYPE_CODES.iter().copied()),
        )
        .field(FieldRule::text("TipoRectificativa").choices(RECTIFICATION_MODES.iter().copied()))
        .field(FieldRule::node(
            "FacturasRectificadas",
            Schema::new("FacturasRectificadas")
                .field(FieldRule::list("IDFacturaRectificada", rectified).required()),
        ))
        .field(FieldRule::node(
            "ImporteRectificacion",
            Schema::new("ImporteRectificacion")
                .field(FieldRule::amount("BaseRectificada").required())
                .field(FieldRule::amount("CuotaRectificada").required()),
        ))
        .field(
            FieldRule::text("ClaveRegimenEspecialOTrascendencia")
                .required()
                .choices(policy.regime_codes()),
        )
        .field(FieldRule::amount("ImporteTotal"))
        .field(
            FieldRule::text("DescripcionOperacion")
                .required()
                .max_length(DESCRIPTION_MAX_LENGTH),
        )
        .field(FieldRule::node("DatosInmueble", property()))
}

fn property() -> Schema {
    let detail = Schema::new("DetalleInmueble")
        .field(
            FieldRule::text("SituacionInmueble")
                .required()
                .choices(SITUS_CODES.iter().copied()),
        )
        .field(FieldRule::text("ReferenciaCatastral").max_length(CADASTRAL_REFERENCE_MAX_LENGTH));
    Schema::new("DatosInmueble").field(FieldRule::node("DetalleInmueble", detail).required())
}

/// Rate container (`DesgloseIVA`/`DesgloseIGIC`) holding a detail list.
fn rate_container(policy: &VariantPolicy, entry: Schema) -> Schema {
    Schema::new(policy.breakdown_container())
        .field(FieldRule::list(policy.detail_entry(), entry).required())
}

fn issued_detail(policy: &VariantPolicy) -> Schema {
    let desglose = issued_desglose(policy);
    let by_operation = Schema::new("DesgloseTipoOperacion")
        .field(FieldRule::node("PrestacionServicios", desglose.clone()))
        .field(FieldRule::node("Entrega", desglose.clone()))
        .at_least_one_of(&["PrestacionServicios", "Entrega"]);
    let breakdown = Schema::new("TipoDesglose")
        .field(FieldRule::node("DesgloseFactura", desglose))
        .field(FieldRule::node("DesgloseTipoOperacion", by_operation))
        .at_least_one_of(&["DesgloseFactura", "DesgloseTipoOperacion"]);

    common_detail("FacturaExpedida", policy)
        .field(FieldRule::node("Contraparte", counterparty()).required())
        .field(FieldRule::node("TipoDesglose", breakdown).required())
}

fn issued_desglose(policy: &VariantPolicy) -> Schema {
    let exempt = Schema::new("Exenta").field(
        FieldRule::list(
            "DetalleExenta",
            Schema::new("DetalleExenta")
                .field(FieldRule::text("CausaExencion").choices(EXEMPTION_CAUSES.iter().copied()))
                .field(FieldRule::amount("BaseImponible").required()),
        )
        .required(),
    );
    let entry = Schema::new(policy.detail_entry())
        .field(FieldRule::rate("TipoImpositivo").required())
        .field(FieldRule::amount("BaseImponible").required())
        .field(FieldRule::amount("CuotaRepercutida").required());
    let non_exempt = Schema::new("NoExenta")
        .field(
            FieldRule::text("TipoNoExenta")
                .required()
                .choices(NON_EXEMPT_TYPES.iter().copied()),
        )
        .field(
            FieldRule::node(
                policy.breakdown_container(),
                rate_container(policy, entry),
            )
            .required(),
        );
    let subject = Schema::new("Sujeta")
        .field(FieldRule::node("Exenta", exempt))
        .field(FieldRule::node("NoExenta", non_exempt))
        .at_least_one_of(&["Exenta", "NoExenta"]);
    let non_subject = Schema::new("NoSujeta")
        .field(FieldRule::amount("ImportePorArticulos7_14_Otros"))
        .field(FieldRule::amount("ImporteTAIReglasLocalizacion"))
        .at_least_one_of(&["ImportePorArticulos7_14_Otros", "ImporteTAIReglasLocalizacion"]);

    Schema::new("Desglose")
        .field(FieldRule::node("Sujeta", subject))
        .field(FieldRule::node("NoSujeta", non_subject))
        .at_least_one_of(&["Sujeta", "NoSujeta"])
}

fn received_detail(policy: &VariantPolicy) -> Schema {
    // Exempt bases are declared without rate or quota.
    let entry = Schema::new(policy.detail_entry())
        .field(FieldRule::rate("TipoImpositivo"))
        .field(FieldRule::amount("BaseImponible").required())
        .field(FieldRule::amount("CuotaSoportada"));
    let container = rate_container(policy, entry);
    let mut reverse_charge = container.clone();
    reverse_charge.name = "InversionSujetoPasivo";

    let breakdown = Schema::new("DesgloseFactura")
        .field(FieldRule::node("InversionSujetoPasivo", reverse_charge))
        .field(FieldRule::node(policy.breakdown_container(), container))
        .at_least_one_of(&["InversionSujetoPasivo", policy.breakdown_container()]);

    common_detail("FacturaRecibida", policy)
        .field(FieldRule::node("DesgloseFactura", breakdown).required())
        .field(FieldRule::node("Contraparte", counterparty()).required())
        .field(FieldRule::date("FechaRegContable").required())
        .field(FieldRule::amount("CuotaDeducible").required())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested<'a>(schema: &'a Schema, path: &[&str]) -> &'a Schema {
        path.iter().fold(schema, |current, name| {
            match &current.rule(name).unwrap().field_type {
                FieldType::Node(child) | FieldType::List(child) => child,
                other => panic!("{name} is {other:?}"),
            }
        })
    }

    #[test]
    fn issued_body_layout() {
        let schema = declaration_schema(Direction::Issued, &VariantPolicy::general());
        let names: Vec<_> = schema.fields.iter().map(|rule| rule.name).collect();
        assert_eq!(names, vec!["Cabecera", "RegistroLRFacturasEmitidas"]);

        let detail = nested(&schema, &["RegistroLRFacturasEmitidas", "FacturaExpedida"]);
        assert!(detail.rule("TipoDesglose").unwrap().required);
        assert!(detail.rule("FechaRegContable").is_none());
    }

    #[test]
    fn subject_requires_exempt_or_non_exempt() {
        let schema = declaration_schema(Direction::Issued, &VariantPolicy::general());
        let subject = nested(
            &schema,
            &[
                "RegistroLRFacturasEmitidas",
                "FacturaExpedida",
                "TipoDesglose",
                "DesgloseFactura",
                "Sujeta",
            ],
        );
        assert_eq!(subject.one_of, vec![vec!["Exenta", "NoExenta"]]);
    }

    #[test]
    fn regional_container_names() {
        let schema = declaration_schema(Direction::Received, &VariantPolicy::regional());
        let breakdown = nested(
            &schema,
            &["RegistroLRFacturasRecibidas", "FacturaRecibida", "DesgloseFactura"],
        );
        assert!(breakdown.rule("DesgloseIGIC").is_some());
        assert!(breakdown.rule("DesgloseIVA").is_none());

        let entry = nested(breakdown, &["DesgloseIGIC", "DetalleIGIC"]);
        assert!(!entry.rule("TipoImpositivo").unwrap().required);
        assert!(entry.rule("CuotaSoportada").is_some());
    }

    #[test]
    fn regime_choices_follow_variant() {
        let general = declaration_schema(Direction::Issued, &VariantPolicy::general());
        let regional = declaration_schema(Direction::Issued, &VariantPolicy::regional());
        let choices = |schema: &Schema| {
            nested(schema, &["RegistroLRFacturasEmitidas", "FacturaExpedida"])
                .rule("ClaveRegimenEspecialOTrascendencia")
                .unwrap()
                .choices
                .clone()
                .unwrap()
        };
        assert!(choices(&general).contains(&"17"));
        assert!(!choices(&regional).contains(&"17"));
    }
}
