use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::operator::ComparisonOp;

/// A parsed filter: a tree of logical groups over field comparisons.
///
/// `And(vec![])` is the match-all expression: an empty filter document and
/// `{"$and": []}` both parse to it and every document satisfies it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Compare {
        field: String,
        op: ComparisonOp,
        value: Bson,
    },
}

impl Expression {
    /// Evaluate the expression against a document.
    ///
    /// A missing field fails every comparison except `$exists: false`.
    /// An explicit null value is visible to comparisons but counts as
    /// absent for `$exists`.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Expression::And(children) => children.iter().all(|c| c.matches(doc)),
            Expression::Or(children) => children.iter().any(|c| c.matches(doc)),
            Expression::Compare { field, op, value } => compare_field(doc.get(field), *op, value),
        }
    }

    /// True when the expression matches every document.
    pub fn is_match_all(&self) -> bool {
        matches!(self, Expression::And(children) if children.is_empty())
    }
}

fn compare_field(actual: Option<&Bson>, op: ComparisonOp, operand: &Bson) -> bool {
    let Some(actual) = actual else {
        // Absent field: only an explicit existence check can succeed.
        return op == ComparisonOp::Exists && *operand == Bson::Boolean(false);
    };

    match op {
        ComparisonOp::Eq => values_equal(actual, operand),
        ComparisonOp::Ne => !values_equal(actual, operand),
        ComparisonOp::Gt => matches!(compare_values(actual, operand), Some(Ordering::Greater)),
        ComparisonOp::Lt => matches!(compare_values(actual, operand), Some(Ordering::Less)),
        ComparisonOp::Gte => matches!(
            compare_values(actual, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ComparisonOp::Lte => matches!(
            compare_values(actual, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ComparisonOp::In => match operand {
            Bson::Array(items) => items.iter().any(|item| values_equal(actual, item)),
            _ => false,
        },
        ComparisonOp::Exists => {
            let present = *actual != Bson::Null;
            *operand == Bson::Boolean(present)
        }
    }
}

/// Equality with numeric promotion: ints and doubles compare as f64,
/// everything else by exact BSON equality.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering with numeric promotion. Strings, booleans, and datetimes
/// compare within their own type; any other combination is unordered.
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn compare(field: &str, op: ComparisonOp, value: Bson) -> Expression {
        Expression::Compare {
            field: field.to_string(),
            op,
            value,
        }
    }

    #[test]
    fn eq_on_present_field() {
        let doc = doc! { "name": "Ana" };
        assert!(compare("name", ComparisonOp::Eq, Bson::String("Ana".into())).matches(&doc));
        assert!(!compare("name", ComparisonOp::Eq, Bson::String("Bob".into())).matches(&doc));
    }

    #[test]
    fn missing_field_fails_comparisons() {
        let doc = doc! { "name": "Ana" };
        assert!(!compare("age", ComparisonOp::Eq, Bson::Int32(1)).matches(&doc));
        assert!(!compare("age", ComparisonOp::Ne, Bson::Int32(1)).matches(&doc));
        assert!(!compare("age", ComparisonOp::Gt, Bson::Int32(1)).matches(&doc));
    }

    #[test]
    fn exists_false_matches_missing_and_null() {
        let doc = doc! { "deleted_at": Bson::Null };
        assert!(compare("deleted_at", ComparisonOp::Exists, Bson::Boolean(false)).matches(&doc));
        assert!(compare("missing", ComparisonOp::Exists, Bson::Boolean(false)).matches(&doc));
        assert!(!compare("missing", ComparisonOp::Exists, Bson::Boolean(true)).matches(&doc));
    }

    #[test]
    fn exists_true_matches_present() {
        let doc = doc! { "email": "a@x" };
        assert!(compare("email", ComparisonOp::Exists, Bson::Boolean(true)).matches(&doc));
    }

    #[test]
    fn numeric_promotion_across_int_widths() {
        let doc = doc! { "age": 30_i64 };
        assert!(compare("age", ComparisonOp::Eq, Bson::Int32(30)).matches(&doc));
        assert!(compare("age", ComparisonOp::Gte, Bson::Double(29.5)).matches(&doc));
        assert!(compare("age", ComparisonOp::Lt, Bson::Double(30.5)).matches(&doc));
    }

    #[test]
    fn mixed_types_are_unordered() {
        let doc = doc! { "age": "thirty" };
        assert!(!compare("age", ComparisonOp::Gt, Bson::Int32(1)).matches(&doc));
        assert!(!compare("age", ComparisonOp::Lte, Bson::Int32(1)).matches(&doc));
        // Mixed-type equality is simply false, so $ne holds.
        assert!(compare("age", ComparisonOp::Ne, Bson::Int32(30)).matches(&doc));
    }

    #[test]
    fn string_comparison_within_type() {
        let doc = doc! { "name": "Bob" };
        assert!(compare("name", ComparisonOp::Gt, Bson::String("Ana".into())).matches(&doc));
        assert!(compare("name", ComparisonOp::Lt, Bson::String("Zoe".into())).matches(&doc));
    }

    #[test]
    fn in_operator() {
        let doc = doc! { "status": "active" };
        let list = Bson::Array(vec![
            Bson::String("pending".into()),
            Bson::String("active".into()),
        ]);
        assert!(compare("status", ComparisonOp::In, list).matches(&doc));

        let list = Bson::Array(vec![Bson::String("archived".into())]);
        assert!(!compare("status", ComparisonOp::In, list).matches(&doc));
        // Non-array operand never matches.
        assert!(!compare("status", ComparisonOp::In, Bson::String("active".into())).matches(&doc));
    }

    #[test]
    fn in_uses_numeric_promotion() {
        let doc = doc! { "age": 30_i32 };
        let list = Bson::Array(vec![Bson::Double(30.0)]);
        assert!(compare("age", ComparisonOp::In, list).matches(&doc));
    }

    #[test]
    fn empty_and_matches_everything() {
        let expr = Expression::And(vec![]);
        assert!(expr.is_match_all());
        assert!(expr.matches(&doc! {}));
        assert!(expr.matches(&doc! { "a": 1 }));
    }

    #[test]
    fn and_or_combinations() {
        let doc = doc! { "a": 1, "b": 2 };
        let both = Expression::And(vec![
            compare("a", ComparisonOp::Eq, Bson::Int32(1)),
            compare("b", ComparisonOp::Eq, Bson::Int32(2)),
        ]);
        assert!(both.matches(&doc));

        let either = Expression::Or(vec![
            compare("a", ComparisonOp::Eq, Bson::Int32(9)),
            compare("b", ComparisonOp::Eq, Bson::Int32(2)),
        ]);
        assert!(either.matches(&doc));

        let neither = Expression::Or(vec![
            compare("a", ComparisonOp::Eq, Bson::Int32(9)),
            compare("b", ComparisonOp::Eq, Bson::Int32(9)),
        ]);
        assert!(!neither.matches(&doc));
    }

    #[test]
    fn datetime_comparison() {
        let early = bson::DateTime::from_millis(1_000);
        let late = bson::DateTime::from_millis(2_000);
        let doc = doc! { "created_at": late };
        assert!(compare("created_at", ComparisonOp::Gt, Bson::DateTime(early)).matches(&doc));
    }
}
