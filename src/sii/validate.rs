//! Validation of a declaration record against its field contract.
//!
//! Validation never stops at the first problem: every violation is
//! collected, each addressed by the dot path of the offending field.
//! Dates are normalized to the wire format as a side effect.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::policy::VariantPolicy;
use super::record::{DeclarationRecord, ISO_DATE_FORMAT, Node, Value, WIRE_DATE_FORMAT};
use super::schema::{FieldRule, FieldType, Schema, declaration_schema};
use crate::core::ValidationError;

/// Maximum number of decimal places of a declared amount.
pub const AMOUNT_MAX_SCALE: u32 = 2;

/// Result of validating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub successful: bool,
    pub errors: Vec<ValidationError>,
    /// The record with dates rendered as `DD-MM-YYYY` text.
    pub record: DeclarationRecord,
}

impl ValidationOutcome {
    /// Rendered error messages, one per violation.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Whether any error was reported for `field` or below it.
    pub fn has_error_at(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field.starts_with(field))
    }
}

/// Validate `record` against the contract of its direction under `policy`.
pub fn validate(mut record: DeclarationRecord, policy: &VariantPolicy) -> ValidationOutcome {
    let schema = declaration_schema(record.direction, policy);
    let mut validator = Validator {
        policy,
        operation_date: record.operation_date,
        errors: Vec::new(),
    };

    if record.variant != policy.variant() {
        validator.errors.push(ValidationError::with_value(
            "Cabecera",
            record.variant.as_str(),
            format!("record built for a different variant than {}", policy.variant().as_str()),
        ));
    }
    validator.node(&mut record.body, &schema, "");

    let errors = validator.errors;
    let successful = errors.is_empty();
    if successful {
        debug!(direction = record.direction.as_str(), "declaration valid");
    } else {
        warn!(
            direction = record.direction.as_str(),
            variant = record.variant.as_str(),
            errors = errors.len(),
            "declaration failed validation"
        );
    }

    ValidationOutcome {
        successful,
        errors,
        record,
    }
}

struct Validator<'a> {
    policy: &'a VariantPolicy,
    operation_date: Option<NaiveDate>,
    errors: Vec<ValidationError>,
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

impl Validator<'_> {
    fn node(&mut self, node: &mut Node, schema: &Schema, path: &str) {
        for (key, value) in node.iter() {
            if schema.rule(key).is_none() {
                self.errors.push(ValidationError::with_value(
                    join(path, key),
                    value.to_string(),
                    format!("unknown field in {}", schema.name),
                ));
            }
        }

        for rule in &schema.fields {
            let field_path = join(path, rule.name);
            match node.get_mut(rule.name) {
                Some(value) => self.field(value, rule, &field_path),
                None if rule.required => self
                    .errors
                    .push(ValidationError::missing(field_path, "required field")),
                None => {}
            }
        }

        for group in &schema.one_of {
            if !group.iter().any(|name| node.contains_key(name)) {
                let at = if path.is_empty() { schema.name } else { path };
                self.errors.push(ValidationError::missing(
                    at,
                    format!("at least one of {} is required", group.join(", ")),
                ));
            }
        }
    }

    fn field(&mut self, value: &mut Value, rule: &FieldRule, path: &str) {
        match &rule.field_type {
            FieldType::Text => match value {
                Value::Text(text) => self.text(text, rule, path),
                other => self.type_error(path, other, "text"),
            },
            FieldType::Amount => {
                self.amount(value, path);
            }
            FieldType::Rate => {
                if let Some(rate) = self.amount(value, path) {
                    self.rate(rate, path);
                }
            }
            FieldType::Date => self.date(value, path),
            FieldType::Node(schema) => match value {
                Value::Node(node) => self.node(node, schema, path),
                other => self.type_error(path, other, "node"),
            },
            FieldType::List(schema) => match value {
                Value::List(items) => {
                    if items.is_empty() {
                        self.errors.push(ValidationError::with_value(
                            path,
                            "[0 items]",
                            "must contain at least one entry",
                        ));
                    }
                    for (index, item) in items.iter_mut().enumerate() {
                        let item_path = format!("{path}[{index}]");
                        match item {
                            Value::Node(node) => self.node(node, schema, &item_path),
                            other => self.type_error(&item_path, other, "node"),
                        }
                    }
                }
                other => self.type_error(path, other, "list"),
            },
        }
    }

    fn type_error(&mut self, path: &str, value: &Value, expected: &str) {
        self.errors.push(ValidationError::with_value(
            path,
            value.to_string(),
            format!("expected {expected}, found {}", value.kind()),
        ));
    }

    fn text(&mut self, text: &str, rule: &FieldRule, path: &str) {
        if rule.required && text.trim().is_empty() {
            self.errors
                .push(ValidationError::with_value(path, text, "must not be empty"));
            return;
        }
        if let Some(choices) = &rule.choices {
            if !choices.iter().any(|choice| *choice == text) {
                self.errors.push(ValidationError::with_value(
                    path,
                    text,
                    "not an allowed value",
                ));
            }
        }
        if let Some(max) = rule.max_length {
            let length = text.chars().count();
            if length > max {
                self.errors.push(ValidationError::with_value(
                    path,
                    text,
                    format!("exceeds maximum length {max} ({length})"),
                ));
            }
        }
    }

    fn amount(&mut self, value: &Value, path: &str) -> Option<Decimal> {
        let Value::Amount(amount) = value else {
            self.type_error(path, value, "amount");
            return None;
        };
        if amount.normalize().scale() > AMOUNT_MAX_SCALE {
            self.errors.push(ValidationError::with_value(
                path,
                amount.to_string(),
                format!("more than {AMOUNT_MAX_SCALE} decimal places"),
            ));
        }
        Some(*amount)
    }

    fn rate(&mut self, rate: Decimal, path: &str) {
        let Some(date) = self.operation_date else {
            return;
        };
        if !self.policy.is_valid_rate(rate, date) {
            self.errors.push(ValidationError::with_value(
                path,
                rate.to_string(),
                format!(
                    "not a valid {} rate on {}",
                    self.policy.variant().as_str(),
                    date.format(ISO_DATE_FORMAT)
                ),
            ));
        }
    }

    fn date(&mut self, value: &mut Value, path: &str) {
        let parsed = match value {
            Value::Date(date) => Some(*date),
            Value::Text(text) => NaiveDate::parse_from_str(text.trim(), ISO_DATE_FORMAT)
                .or_else(|_| NaiveDate::parse_from_str(text.trim(), WIRE_DATE_FORMAT))
                .ok(),
            _ => None,
        };
        match parsed {
            Some(date) => *value = Value::Text(date.format(WIRE_DATE_FORMAT).to_string()),
            None => self.errors.push(ValidationError::with_value(
                path,
                value.to_string(),
                "expected a date (YYYY-MM-DD or DD-MM-YYYY)",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Direction;
    use crate::sii::policy::Variant;
    use rust_decimal_macros::dec;

    fn record(body: Node) -> DeclarationRecord {
        DeclarationRecord {
            direction: Direction::Issued,
            variant: Variant::General,
            operation_date: NaiveDate::from_ymd_opt(2024, 5, 10),
            body,
        }
    }

    fn validator(policy: &VariantPolicy) -> Validator<'_> {
        Validator {
            policy,
            operation_date: NaiveDate::from_ymd_opt(2024, 5, 10),
            errors: Vec::new(),
        }
    }

    #[test]
    fn empty_body_reports_required_sections() {
        let outcome = validate(record(Node::new()), &VariantPolicy::general());
        assert!(!outcome.successful);
        let fields: Vec<_> = outcome.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["Cabecera", "RegistroLRFacturasEmitidas"]);
    }

    #[test]
    fn unknown_field_is_reported() {
        let policy = VariantPolicy::general();
        let schema = Schema::new("T").field(FieldRule::text("A"));
        let mut node = Node::new().with("A", "x").with("Z", "y");
        let mut v = validator(&policy);
        v.node(&mut node, &schema, "Root");
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors[0].field, "Root.Z");
        assert_eq!(v.errors[0].value.as_deref(), Some("y"));
    }

    #[test]
    fn one_of_reported_at_container() {
        let policy = VariantPolicy::general();
        let schema = Schema::new("Sujeta")
            .field(FieldRule::node("Exenta", Schema::new("Exenta")))
            .field(FieldRule::node("NoExenta", Schema::new("NoExenta")))
            .at_least_one_of(&["Exenta", "NoExenta"]);
        let mut v = validator(&policy);
        v.node(&mut Node::new(), &schema, "X.Sujeta");
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors[0].field, "X.Sujeta");
        assert!(v.errors[0].message.contains("Exenta, NoExenta"));
    }

    #[test]
    fn dates_are_rendered_for_the_wire() {
        let policy = VariantPolicy::general();
        let mut v = validator(&policy);

        let mut typed = Value::from(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        v.date(&mut typed, "D");
        assert_eq!(typed, Value::from("05-03-2024"));

        let mut iso = Value::from("2024-03-05");
        v.date(&mut iso, "D");
        assert_eq!(iso, Value::from("05-03-2024"));

        let mut wire = Value::from("05-03-2024");
        v.date(&mut wire, "D");
        assert_eq!(wire, Value::from("05-03-2024"));

        let mut bad = Value::from("March 5th");
        v.date(&mut bad, "D");
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn amount_scale_and_rates() {
        let policy = VariantPolicy::general();
        let mut v = validator(&policy);
        assert_eq!(v.amount(&Value::from(dec!(10.50)), "A"), Some(dec!(10.50)));
        assert_eq!(v.amount(&Value::from(dec!(10.5000)), "A"), Some(dec!(10.5000)));
        assert!(v.errors.is_empty());

        v.amount(&Value::from(dec!(10.505)), "A");
        assert_eq!(v.errors.len(), 1);

        v.rate(dec!(21), "R");
        v.rate(dec!(21.00), "R");
        assert_eq!(v.errors.len(), 1);
        v.rate(dec!(7), "R");
        assert_eq!(v.errors.len(), 2);
    }

    #[test]
    fn text_rules() {
        let policy = VariantPolicy::general();
        let rule = FieldRule::text("T").required().choices(["A0", "A1"]).max_length(2);
        let mut v = validator(&policy);
        v.text("A0", &rule, "T");
        assert!(v.errors.is_empty());
        v.text("", &rule, "T");
        v.text("B0", &rule, "T");
        v.text("A00", &rule, "T");
        assert_eq!(v.errors.len(), 4);
    }
}
