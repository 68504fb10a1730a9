use bson::{Bson, Document};

use crate::expression::Expression;
use crate::operator::ComparisonOp;

/// Parse error for filter documents.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParseError(pub String);

impl std::fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "filter parse error: {}", self.0)
    }
}

impl std::error::Error for FilterParseError {}

/// Parse a filter document into an [`Expression`] tree.
///
/// Follows MongoDB query semantics:
/// - Top-level entries combine with an implicit AND
/// - `{ "field": value }` is implicit `$eq`
/// - `{ "field": { "$gt": v, ... } }` uses operator sub-documents
/// - `{ "$and": [...] }` / `{ "$or": [...] }` for explicit logical groups
/// - `{}` and `{ "$and": [] }` match every document
pub fn parse_filter(doc: &Document) -> Result<Expression, FilterParseError> {
    let mut children = Vec::new();

    for (key, value) in doc {
        match key.as_str() {
            "$and" => children.push(Expression::And(parse_logical_array(key, value)?)),
            "$or" => children.push(Expression::Or(parse_logical_array(key, value)?)),
            k if k.starts_with('$') => {
                return Err(FilterParseError(format!("unknown top-level operator: {k}")));
            }
            _ => children.push(parse_field_condition(key, value)?),
        }
    }

    if children.len() == 1 {
        Ok(children.pop().unwrap())
    } else {
        Ok(Expression::And(children))
    }
}

/// Parse a `$and`/`$or` array into sub-expressions. An empty array is legal
/// and yields an empty group.
fn parse_logical_array(key: &str, value: &Bson) -> Result<Vec<Expression>, FilterParseError> {
    let Bson::Array(items) = value else {
        return Err(FilterParseError(format!("{key} value must be an array")));
    };

    let mut children = Vec::with_capacity(items.len());
    for item in items {
        let Bson::Document(sub) = item else {
            return Err(FilterParseError(format!(
                "{key} array elements must be documents"
            )));
        };
        children.push(parse_filter(sub)?);
    }
    Ok(children)
}

/// Parse a field condition: implicit `$eq` or an operator sub-document.
fn parse_field_condition(field: &str, value: &Bson) -> Result<Expression, FilterParseError> {
    // A sub-document whose first key starts with `$` is an operator map;
    // any other sub-document is an embedded-document equality operand.
    if let Bson::Document(sub) = value {
        let is_operator_doc = sub.keys().next().is_some_and(|k| k.starts_with('$'));
        if is_operator_doc {
            return parse_operator_doc(field, sub);
        }
    }

    Ok(Expression::Compare {
        field: field.to_string(),
        op: ComparisonOp::Eq,
        value: value.clone(),
    })
}

/// Parse an operator sub-document like `{ "$gt": 21, "$lte": 100 }`.
fn parse_operator_doc(field: &str, sub: &Document) -> Result<Expression, FilterParseError> {
    let mut conditions = Vec::new();

    for (op_key, operand) in sub {
        let Some(op) = ComparisonOp::parse(op_key) else {
            return Err(FilterParseError(format!("unknown field operator: {op_key}")));
        };

        match op {
            ComparisonOp::Exists if !matches!(operand, Bson::Boolean(_)) => {
                return Err(FilterParseError("$exists value must be a boolean".into()));
            }
            ComparisonOp::In if !matches!(operand, Bson::Array(_)) => {
                return Err(FilterParseError("$in value must be an array".into()));
            }
            _ => {}
        }

        conditions.push(Expression::Compare {
            field: field.to_string(),
            op,
            value: operand.clone(),
        });
    }

    match conditions.len() {
        0 => Err(FilterParseError("empty operator document".into())),
        1 => Ok(conditions.pop().unwrap()),
        _ => Ok(Expression::And(conditions)),
    }
}
