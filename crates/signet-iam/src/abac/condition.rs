//! ABAC Condition Expressions
//!
//! A condition is one JSON object with exactly one operator key, evaluated
//! against subject/resource/context attribute maps. Parsing builds a
//! tagged-variant tree; evaluation threads an explicit depth counter that
//! only logical operators consume. Everything fails closed: malformed
//! shapes, unknown operators, and exceeded limits all evaluate to false at
//! the policy level, and errors never carry condition text.

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum serialized condition size in bytes.
pub const MAX_CONDITION_BYTES: usize = 10 * 1024;

/// Maximum nesting depth, counted over `and`/`or`/`not` only.
pub const MAX_LOGICAL_DEPTH: usize = 10;

/// Why a condition was rejected. Deliberately free of any payload so a
/// policy body can never leak through an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition exceeds the serialized size limit")]
    TooLarge,

    #[error("condition is not valid JSON")]
    InvalidJson,

    #[error("condition shape is invalid")]
    InvalidShape,

    #[error("condition uses an unknown operator")]
    UnknownOperator,

    #[error("condition exceeds the nesting depth limit")]
    DepthExceeded,
}

/// Parsed condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { path: String, value: Value },
    Ne { path: String, value: Value },
    Gt { path: String, value: Value },
    Gte { path: String, value: Value },
    Lt { path: String, value: Value },
    Lte { path: String, value: Value },
    In { path: String, values: Vec<Value> },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Parse a serialized condition, enforcing the size cap first.
    pub fn parse_str(condition: &str) -> Result<Self, ConditionError> {
        if condition.len() > MAX_CONDITION_BYTES {
            return Err(ConditionError::TooLarge);
        }
        let value: Value =
            serde_json::from_str(condition).map_err(|_| ConditionError::InvalidJson)?;
        Self::parse(&value)
    }

    /// Parse a JSON value into a condition tree.
    pub fn parse(value: &Value) -> Result<Self, ConditionError> {
        let object = value.as_object().ok_or(ConditionError::InvalidShape)?;
        if object.len() != 1 {
            return Err(ConditionError::InvalidShape);
        }
        let (operator, operand) = object.iter().next().ok_or(ConditionError::InvalidShape)?;

        match operator.as_str() {
            "eq" => Self::parse_comparison(operand, |path, value| Condition::Eq { path, value }),
            "ne" => Self::parse_comparison(operand, |path, value| Condition::Ne { path, value }),
            "gt" => Self::parse_comparison(operand, |path, value| Condition::Gt { path, value }),
            "gte" => Self::parse_comparison(operand, |path, value| Condition::Gte { path, value }),
            "lt" => Self::parse_comparison(operand, |path, value| Condition::Lt { path, value }),
            "lte" => Self::parse_comparison(operand, |path, value| Condition::Lte { path, value }),
            "in" => {
                let (path, literal) = Self::single_entry(operand)?;
                let values = literal
                    .as_array()
                    .ok_or(ConditionError::InvalidShape)?
                    .clone();
                Ok(Condition::In { path, values })
            }
            "and" => Ok(Condition::And(Self::parse_list(operand)?)),
            "or" => Ok(Condition::Or(Self::parse_list(operand)?)),
            "not" => Ok(Condition::Not(Box::new(Self::parse(operand)?))),
            _ => Err(ConditionError::UnknownOperator),
        }
    }

    fn parse_comparison(
        operand: &Value,
        build: impl FnOnce(String, Value) -> Condition,
    ) -> Result<Condition, ConditionError> {
        let (path, value) = Self::single_entry(operand)?;
        Ok(build(path, value))
    }

    /// Comparison operands must be an object with exactly one field.
    fn single_entry(operand: &Value) -> Result<(String, Value), ConditionError> {
        let object = operand.as_object().ok_or(ConditionError::InvalidShape)?;
        if object.len() != 1 {
            return Err(ConditionError::InvalidShape);
        }
        let (path, value) = object.iter().next().ok_or(ConditionError::InvalidShape)?;
        Ok((path.clone(), value.clone()))
    }

    /// `and`/`or` operands must be non-empty arrays of conditions.
    fn parse_list(operand: &Value) -> Result<Vec<Condition>, ConditionError> {
        let items = operand.as_array().ok_or(ConditionError::InvalidShape)?;
        if items.is_empty() {
            return Err(ConditionError::InvalidShape);
        }
        items.iter().map(Self::parse).collect()
    }

    /// Evaluate against an attribute context.
    pub fn evaluate(&self, attributes: &AttributeContext) -> Result<bool, ConditionError> {
        self.evaluate_at(attributes, 0)
    }

    fn evaluate_at(
        &self,
        attributes: &AttributeContext,
        depth: usize,
    ) -> Result<bool, ConditionError> {
        match self {
            Condition::Eq { path, value } => Ok(Self::compare_scalars(
                attributes.resolve(path),
                value,
                |eq| eq,
            )),
            Condition::Ne { path, value } => Ok(Self::compare_scalars(
                attributes.resolve(path),
                value,
                |eq| !eq,
            )),
            Condition::Gt { path, value } => {
                Ok(Self::compare_numbers(attributes.resolve(path), value, |a, b| a > b))
            }
            Condition::Gte { path, value } => {
                Ok(Self::compare_numbers(attributes.resolve(path), value, |a, b| a >= b))
            }
            Condition::Lt { path, value } => {
                Ok(Self::compare_numbers(attributes.resolve(path), value, |a, b| a < b))
            }
            Condition::Lte { path, value } => {
                Ok(Self::compare_numbers(attributes.resolve(path), value, |a, b| a <= b))
            }
            Condition::In { path, values } => Ok(Self::intersects(attributes.resolve(path), values)),
            Condition::And(children) => {
                if depth >= MAX_LOGICAL_DEPTH {
                    return Err(ConditionError::DepthExceeded);
                }
                for child in children {
                    if !child.evaluate_at(attributes, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                if depth >= MAX_LOGICAL_DEPTH {
                    return Err(ConditionError::DepthExceeded);
                }
                for child in children {
                    if child.evaluate_at(attributes, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(child) => {
                if depth >= MAX_LOGICAL_DEPTH {
                    return Err(ConditionError::DepthExceeded);
                }
                Ok(!child.evaluate_at(attributes, depth + 1)?)
            }
        }
    }

    /// Scalar comparison with numbers compared numerically. Null, missing,
    /// and non-scalar values never satisfy either `eq` or `ne`.
    fn compare_scalars(
        resolved: Option<&Value>,
        literal: &Value,
        apply: impl FnOnce(bool) -> bool,
    ) -> bool {
        let resolved = match resolved {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };
        if literal.is_null() {
            return false;
        }
        if resolved.is_array() || resolved.is_object() {
            return false;
        }
        apply(scalar_eq(resolved, literal))
    }

    /// Numeric comparison: both sides must be JSON numbers.
    fn compare_numbers(
        resolved: Option<&Value>,
        literal: &Value,
        apply: impl FnOnce(f64, f64) -> bool,
    ) -> bool {
        match (resolved.and_then(Value::as_f64), literal.as_f64()) {
            (Some(a), Some(b)) => apply(a, b),
            _ => false,
        }
    }

    /// Collection intersection: the resolved value must be an array, and at
    /// least one non-null element must equal one literal element.
    fn intersects(resolved: Option<&Value>, literals: &[Value]) -> bool {
        let items = match resolved.and_then(Value::as_array) {
            Some(items) => items,
            None => return false,
        };
        items
            .iter()
            .filter(|item| !item.is_null())
            .any(|item| literals.iter().any(|literal| scalar_eq(item, literal)))
    }
}

/// Structural equality with numeric normalization: `1` equals `1.0`.
fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// The attribute triple a condition is evaluated against. Read-only for the
/// duration of one evaluation.
#[derive(Debug, Clone, Default)]
pub struct AttributeContext {
    subject: Map<String, Value>,
    resource: Map<String, Value>,
    context: Map<String, Value>,
}

impl AttributeContext {
    pub fn new(
        subject: Map<String, Value>,
        resource: Map<String, Value>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            subject,
            resource,
            context,
        }
    }

    /// Resolve a `.`-separated path. The first segment must name one of the
    /// three roots; each further segment is a key lookup. Missing segments,
    /// an empty path, and a bare root all resolve to nothing.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = match segments.next()? {
            "subject" => &self.subject,
            "resource" => &self.resource,
            "context" => &self.context,
            _ => return None,
        };

        let first_key = segments.next()?;
        let mut current = root.get(first_key)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject(value: Value) -> AttributeContext {
        AttributeContext::new(
            value.as_object().cloned().unwrap_or_default(),
            Map::new(),
            Map::new(),
        )
    }

    fn eval(condition: Value, attributes: &AttributeContext) -> Result<bool, ConditionError> {
        Condition::parse(&condition)?.evaluate(attributes)
    }

    #[test]
    fn path_resolution_walks_nested_maps() {
        let attributes = subject(json!({"org": {"tier": "gold"}}));

        assert_eq!(
            attributes.resolve("subject.org.tier"),
            Some(&json!("gold"))
        );
        assert_eq!(attributes.resolve("subject.org.missing"), None);
        assert_eq!(attributes.resolve("subject.missing.tier"), None);
        assert_eq!(attributes.resolve("resource.org.tier"), None);
        assert_eq!(attributes.resolve("unknown.org"), None);
        assert_eq!(attributes.resolve("subject"), None);
        assert_eq!(attributes.resolve(""), None);
    }

    #[test]
    fn eq_and_ne_over_scalars() {
        let attributes = subject(json!({"userId": "u", "age": 30}));

        assert!(eval(json!({"eq": {"subject.userId": "u"}}), &attributes).unwrap());
        assert!(!eval(json!({"eq": {"subject.userId": "v"}}), &attributes).unwrap());
        assert!(eval(json!({"ne": {"subject.userId": "v"}}), &attributes).unwrap());
        assert!(!eval(json!({"ne": {"subject.userId": "u"}}), &attributes).unwrap());
    }

    #[test]
    fn integers_and_floats_compare_numerically() {
        let attributes = subject(json!({"age": 30}));

        assert!(eval(json!({"eq": {"subject.age": 30.0}}), &attributes).unwrap());
        assert!(eval(json!({"gt": {"subject.age": 29.5}}), &attributes).unwrap());
        assert!(eval(json!({"lte": {"subject.age": 30}}), &attributes).unwrap());
        assert!(!eval(json!({"lt": {"subject.age": 30}}), &attributes).unwrap());
        assert!(eval(json!({"gte": {"subject.age": 30.0}}), &attributes).unwrap());
    }

    #[test]
    fn null_on_either_side_is_false() {
        let attributes = subject(json!({"nullable": null, "present": "x"}));

        assert!(!eval(json!({"eq": {"subject.nullable": "x"}}), &attributes).unwrap());
        assert!(!eval(json!({"ne": {"subject.nullable": "x"}}), &attributes).unwrap());
        assert!(!eval(json!({"eq": {"subject.present": null}}), &attributes).unwrap());
        assert!(!eval(json!({"eq": {"subject.missing": "x"}}), &attributes).unwrap());
        assert!(!eval(json!({"gt": {"subject.missing": 1}}), &attributes).unwrap());
    }

    #[test]
    fn numeric_operators_require_numbers_on_both_sides() {
        let attributes = subject(json!({"name": "abc", "age": 30}));

        assert!(!eval(json!({"gt": {"subject.name": 1}}), &attributes).unwrap());
        assert!(!eval(json!({"gt": {"subject.age": "29"}}), &attributes).unwrap());
    }

    #[test]
    fn in_requires_array_literal_and_collection_value() {
        let attributes = subject(json!({"roles": ["admin", "viewer"], "role": "admin"}));

        assert!(eval(json!({"in": {"subject.roles": ["admin"]}}), &attributes).unwrap());
        assert!(!eval(json!({"in": {"subject.roles": ["editor"]}}), &attributes).unwrap());
        // Scalar on the left is not a collection
        assert!(!eval(json!({"in": {"subject.role": ["admin"]}}), &attributes).unwrap());
        // Non-array literal is a shape error
        assert!(Condition::parse(&json!({"in": {"subject.roles": "admin"}})).is_err());
    }

    #[test]
    fn in_ignores_null_collection_entries() {
        let attributes = subject(json!({"roles": [null, "viewer"]}));

        assert!(eval(json!({"in": {"subject.roles": ["viewer"]}}), &attributes).unwrap());
        assert!(!eval(json!({"in": {"subject.roles": [null]}}), &attributes).unwrap());
    }

    #[test]
    fn logical_operators_combine_and_short_circuit() {
        let attributes = subject(json!({"userId": "u", "age": 30}));

        assert!(eval(
            json!({"and": [
                {"eq": {"subject.userId": "u"}},
                {"gte": {"subject.age": 18}}
            ]}),
            &attributes
        )
        .unwrap());

        assert!(eval(
            json!({"or": [
                {"eq": {"subject.userId": "someone-else"}},
                {"eq": {"subject.userId": "u"}}
            ]}),
            &attributes
        )
        .unwrap());

        assert!(eval(json!({"not": {"eq": {"subject.userId": "v"}}}), &attributes).unwrap());
        assert!(!eval(json!({"not": {"eq": {"subject.userId": "u"}}}), &attributes).unwrap());
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        // Multiple operator keys
        assert!(Condition::parse(&json!({"eq": {"subject.a": 1}, "ne": {"subject.a": 2}})).is_err());
        // Multiple fields inside a comparison
        assert!(Condition::parse(&json!({"eq": {"subject.a": 1, "subject.b": 2}})).is_err());
        // Empty logical list
        assert!(Condition::parse(&json!({"and": []})).is_err());
        // Non-object condition
        assert!(Condition::parse(&json!(["eq"])).is_err());
        // Unknown operator
        assert_eq!(
            Condition::parse(&json!({"matches": {"subject.a": 1}})).unwrap_err(),
            ConditionError::UnknownOperator
        );
    }

    #[test]
    fn parse_str_enforces_size_and_json_validity() {
        assert_eq!(
            Condition::parse_str("not json").unwrap_err(),
            ConditionError::InvalidJson
        );

        let oversized = format!(
            r#"{{"eq":{{"subject.a":"{}"}}}}"#,
            "x".repeat(MAX_CONDITION_BYTES)
        );
        assert_eq!(
            Condition::parse_str(&oversized).unwrap_err(),
            ConditionError::TooLarge
        );
    }

    fn nest_ands(levels: usize) -> Value {
        let mut condition = json!({"eq": {"subject.userId": "u"}});
        for _ in 0..levels {
            condition = json!({"and": [condition]});
        }
        condition
    }

    #[test]
    fn depth_limit_counts_logical_operators_only() {
        let attributes = subject(json!({"userId": "u"}));

        let at_limit = Condition::parse(&nest_ands(MAX_LOGICAL_DEPTH)).unwrap();
        assert!(at_limit.evaluate(&attributes).unwrap());

        let over_limit = Condition::parse(&nest_ands(MAX_LOGICAL_DEPTH + 1)).unwrap();
        assert_eq!(
            over_limit.evaluate(&attributes).unwrap_err(),
            ConditionError::DepthExceeded
        );
    }
}
