use thiserror::Error;

/// Fatal errors raised while turning an invoice into a declaration.
///
/// Field-level problems are never reported through this type; they are
/// collected as [`ValidationError`]s instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeclarationError {
    /// Unrecognized invoice type code, direction or rectification tag.
    #[error("classification error: {0}")]
    Classification(String),

    /// No declared period, accounting date or issue date to derive the
    /// reporting period from.
    #[error("period resolution error: {0}")]
    PeriodResolution(String),

    /// Invoice snapshot builder encountered missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Signed or aggregated amounts do not fit in a `Decimal`.
    #[error("amount error: {0}")]
    Amount(String),

    /// Rendering a record through a serde backend failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A single validation error: field path, offending value and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field
    /// (e.g. "RegistroLRFacturasEmitidas.IDFactura.NumSerieFacturaEmisor").
    pub field: String,
    /// Rendered value found at the path, `None` when the field is absent.
    pub value: Option<String>,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} - {}",
            self.field,
            self.value.as_deref().unwrap_or("missing"),
            self.message
        )
    }
}

impl ValidationError {
    /// Create a validation error for an absent field.
    pub fn missing(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
            message: message.into(),
        }
    }

    /// Create a validation error carrying the offending value.
    pub fn with_value(
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
            message: message.into(),
        }
    }
}
