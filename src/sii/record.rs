//! Ordered record tree emitted by the declaration builder.
//!
//! Key names and nesting mirror the authority's published schema. Amounts
//! are kept as exact [`Decimal`]s and dates serialize as `DD-MM-YYYY`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::policy::Variant;
use crate::core::Direction;

/// Date format of the authority's wire contract.
pub const WIRE_DATE_FORMAT: &str = "%d-%m-%Y";
/// Date format accepted on input.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// A leaf or subtree of a declaration record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Amount(Decimal),
    Date(NaiveDate),
    Node(Node),
    List(Vec<Value>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Self::Amount(amount) => Some(*amount),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short label of the value's kind, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Amount(_) => "amount",
            Self::Date(_) => "date",
            Self::Node(_) => "node",
            Self::List(_) => "list",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Amount(amount) => write!(f, "{amount}"),
            Self::Date(date) => write!(f, "{}", date.format(ISO_DATE_FORMAT)),
            Self::Node(_) => write!(f, "{{...}}"),
            Self::List(items) => write!(f, "[{} items]", items.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Decimal> for Value {
    fn from(amount: Decimal) -> Self {
        Self::Amount(amount)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Vec<Node>> for Value {
    fn from(nodes: Vec<Node>) -> Self {
        Self::List(nodes.into_iter().map(Value::Node).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Amount(amount) => Serialize::serialize(amount, serializer),
            Self::Date(date) => {
                serializer.serialize_str(&date.format(WIRE_DATE_FORMAT).to_string())
            }
            Self::Node(node) => node.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Ordered mapping of field names to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    entries: Vec<(String, Value)>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, consuming and returning the node.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Append a field only when a value is present.
    pub fn with_opt<V: Into<Value>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Set a field. An existing field keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Look up a dot-separated path of nested nodes, e.g.
    /// `"FacturaExpedida.TipoDesglose.DesgloseFactura"`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.as_node()?.get(segment)?;
        }
        Some(current)
    }

    /// Mutable variant of [`Node::get_path`].
    pub fn get_path_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split('.');
        let mut current = self.get_mut(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Node(node) => node.get_mut(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as pretty-printed JSON.
    #[cfg(feature = "json")]
    pub fn to_json_string(&self) -> Result<String, crate::core::DeclarationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::core::DeclarationError::Serialization(e.to_string()))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A declaration ready for validation and submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationRecord {
    pub direction: Direction,
    pub variant: Variant,
    /// Date the operation's tax rates are checked against.
    pub operation_date: Option<NaiveDate>,
    /// `Cabecera` plus the register entry.
    pub body: Node,
}

impl DeclarationRecord {
    /// Name of the submission element wrapping [`DeclarationRecord::body`].
    pub fn root_name(&self) -> &'static str {
        match self.direction {
            Direction::Issued => "SuministroLRFacturasEmitidas",
            Direction::Received => "SuministroLRFacturasRecibidas",
        }
    }

    /// Name of the register entry element inside the body.
    pub fn register_name(&self) -> &'static str {
        register_name(self.direction)
    }
}

pub(crate) fn register_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Issued => "RegistroLRFacturasEmitidas",
        Direction::Received => "RegistroLRFacturasRecibidas",
    }
}
