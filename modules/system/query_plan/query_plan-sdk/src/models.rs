//! Domain models for query planning.
//!
//! A query plan is the PDP's answer to "which resources of this kind may the
//! principal act on?". Instead of a per-row decision it returns a boolean
//! expression tree over resource attributes (the access plan) that the
//! caller pushes down to the data store.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const EXPRESSION_KEY: &str = "expression";
const OPERATOR_KEY: &str = "operator";
const OPERANDS_KEY: &str = "operands";
const VARIABLE_KEY: &str = "variable";
const VALUE_KEY: &str = "value";

/// Operator tag of an access plan expression.
///
/// Tags outside the supported set are kept verbatim in [`Operator::Other`]
/// so the compiler decides what to do with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    In,
    Other(String),
}

impl Operator {
    /// Parse a wire tag. Never fails: unknown tags become [`Operator::Other`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "and" => Self::And,
            "or" => Self::Or,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "gt" => Self::Gt,
            "lte" => Self::Lte,
            "gte" => Self::Gte,
            "in" => Self::In,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The wire tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Gte => "gte",
            Self::In => "in",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An operator applied to an ordered list of operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub operator: Operator,
    pub operands: Vec<Operand>,
}

impl Expression {
    /// Parse the body of an `expression` field.
    ///
    /// Returns the raw JSON back when it is not an object with a string
    /// `operator`. A missing `operands` field reads as no operands.
    fn from_json(raw: Value) -> Result<Self, Value> {
        let Value::Object(mut fields) = raw else {
            return Err(raw);
        };
        let operator = match fields.get(OPERATOR_KEY) {
            Some(Value::String(tag)) => Operator::from_tag(tag),
            _ => return Err(Value::Object(fields)),
        };
        let operands = match fields.remove(OPERANDS_KEY) {
            Some(Value::Array(items)) => items.into_iter().map(Operand::from_json).collect(),
            None => Vec::new(),
            Some(other) => {
                fields.insert(OPERANDS_KEY.to_owned(), other);
                return Err(Value::Object(fields));
            }
        };
        Ok(Self { operator, operands })
    }
}

/// A node of the access plan tree.
///
/// The wire format distinguishes variants by which key is present:
/// `{"expression": ..}`, `{"value": ..}` or `{"variable": ".."}`. Anything
/// else is kept as [`Operand::Unrecognized`] instead of failing the parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Expression(Expression),
    /// Dotted attribute path, e.g. `request.resource.attr.department`.
    Variable(String),
    /// Literal scalar or array. JSON `null` is a literal too.
    Value(Value),
    /// Raw JSON of a node matching none of the known shapes.
    Unrecognized(Value),
}

impl Operand {
    // ── Constructors ────────────────────────────────────────────────

    #[must_use]
    pub fn expression(operator: Operator, operands: Vec<Operand>) -> Self {
        Self::Expression(Expression { operator, operands })
    }

    #[must_use]
    pub fn and(operands: Vec<Operand>) -> Self {
        Self::expression(Operator::And, operands)
    }

    #[must_use]
    pub fn or(operands: Vec<Operand>) -> Self {
        Self::expression(Operator::Or, operands)
    }

    /// `operator(variable(path), value(literal))`.
    #[must_use]
    pub fn comparison(
        operator: Operator,
        path: impl Into<String>,
        literal: impl Into<Value>,
    ) -> Self {
        Self::expression(
            operator,
            vec![Self::Variable(path.into()), Self::Value(literal.into())],
        )
    }

    #[must_use]
    pub fn variable(path: impl Into<String>) -> Self {
        Self::Variable(path.into())
    }

    #[must_use]
    pub fn value(literal: impl Into<Value>) -> Self {
        Self::Value(literal.into())
    }

    /// Classify a raw JSON node. Never fails.
    #[must_use]
    pub fn from_json(raw: Value) -> Self {
        let Value::Object(mut fields) = raw else {
            return Self::Unrecognized(raw);
        };

        if let Some(expression) = fields.remove(EXPRESSION_KEY) {
            return match Expression::from_json(expression) {
                Ok(expression) => Self::Expression(expression),
                Err(expression) => {
                    fields.insert(EXPRESSION_KEY.to_owned(), expression);
                    Self::Unrecognized(Value::Object(fields))
                }
            };
        }

        if let Some(value) = fields.remove(VALUE_KEY) {
            return Self::Value(value);
        }

        match fields.remove(VARIABLE_KEY) {
            Some(Value::String(path)) => Self::Variable(path),
            Some(other) => {
                fields.insert(VARIABLE_KEY.to_owned(), other);
                Self::Unrecognized(Value::Object(fields))
            }
            None => Self::Unrecognized(Value::Object(fields)),
        }
    }
}

impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Expression(expression) => single_entry(serializer, EXPRESSION_KEY, expression),
            Self::Variable(path) => single_entry(serializer, VARIABLE_KEY, path),
            Self::Value(value) => single_entry(serializer, VALUE_KEY, value),
            Self::Unrecognized(raw) => raw.serialize(serializer),
        }
    }
}

fn single_entry<S, T>(serializer: S, key: &str, value: &T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

/// Outcome category of a query plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    /// Every resource of the kind is accessible; no filter applies.
    #[serde(rename = "KIND_ALWAYS_ALLOWED")]
    AlwaysAllowed,
    /// No resource of the kind is accessible.
    #[serde(rename = "KIND_ALWAYS_DENIED")]
    AlwaysDenied,
    /// Access depends on resource attributes; see [`QueryPlanResponse::filter`].
    #[default]
    #[serde(rename = "KIND_CONDITIONAL")]
    Conditional,
}

/// Query plan returned by the PDP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlanResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub resource_kind: String,
    #[serde(default)]
    pub policy_version: String,
    #[serde(default)]
    pub kind: PlanKind,
    /// The access plan. Required when `kind` is conditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Operand>,
}

/// The principal a plan is requested for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Principal attributes available to policy conditions.
    #[serde(default)]
    pub attr: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
}

/// The resource collection a plan is requested for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResource {
    /// Resource kind, e.g. `contact`.
    pub kind: String,
    /// Attributes known up front; the plan covers the remaining ones.
    #[serde(default)]
    pub attr: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
}

/// Query plan request sent to the PDP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub principal: Principal,
    pub resource: PlanResource,
    pub action: String,
}
