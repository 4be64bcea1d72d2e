//! # Predicate Evaluation
//!
//! Matches, orders and projects [`Document`]s according to the pieces of a
//! query plan. Values are compared numerically when both sides coerce to a
//! number, otherwise as strings; ISO-8601 timestamps therefore order
//! correctly without parsing.

use std::cmp::Ordering;

use nt_query::{ComparisonOperator, FilterExpression, Predicate, ProjectionSpec, SortDirection, SortSpec};
use serde_json::Value;

use crate::{Document, StoreError, ID_FIELD};

/// Reject filters containing operators the store cannot evaluate.
pub fn validate(filter: &FilterExpression) -> Result<(), StoreError> {
    for predicate in filter.predicates() {
        if let Predicate::Unrecognized {
            field, operator, ..
        } = predicate
        {
            return Err(StoreError::UnknownOperator {
                field: field.clone(),
                operator: operator.clone(),
            });
        }
    }
    Ok(())
}

/// Whether `doc` satisfies every predicate. Call [`validate`] first;
/// unrecognised predicates never match.
pub fn matches(doc: &Document, filter: &FilterExpression) -> bool {
    filter
        .predicates()
        .iter()
        .all(|predicate| evaluate(doc, predicate))
}

fn evaluate(doc: &Document, predicate: &Predicate) -> bool {
    let value = extract_field(doc, predicate.field());

    match predicate {
        Predicate::Eq { value: expected, .. } => {
            any_element(value, |v| values_equal(v, expected))
        }
        Predicate::In { values, .. } => {
            any_element(value, |v| values.iter().any(|expected| values_equal(v, expected)))
        }
        Predicate::Range { op, value: bound, .. } => {
            any_element(value, |v| satisfies_range(v, *op, bound))
        }
        Predicate::Ne { value: unwanted, .. } => {
            !any_element(value, |v| values_equal(v, unwanted))
        }
        Predicate::Unrecognized { .. } => false,
    }
}

/// Arrays match when any element does, missing fields never match.
fn any_element(value: Option<&Value>, test: impl Fn(&Value) -> bool) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(&test),
        Some(v) => test(v),
        None => false,
    }
}

/// Look up `field` in a document. Dotted names descend into nested objects
/// (`startLocation.address`).
pub fn extract_field<'a>(doc: &'a Document, field: &str) -> Option<&'a Value> {
    if let Some(value) = doc.get(field) {
        return Some(value);
    }

    let (head, rest) = field.split_once('.')?;
    let root = doc.get(head)?;
    let pointer = format!("/{}", rest.replace('.', "/"));
    root.pointer(&pointer)
}

fn satisfies_range(actual: &Value, op: ComparisonOperator, bound: &str) -> bool {
    let Some(ordering) = compare_to_str(actual, bound) else {
        return false;
    };
    match op {
        ComparisonOperator::Gt => ordering == Ordering::Greater,
        ComparisonOperator::Gte => ordering != Ordering::Less,
        ComparisonOperator::Lt => ordering == Ordering::Less,
        ComparisonOperator::Lte => ordering != Ordering::Greater,
    }
}

fn compare_to_str(actual: &Value, expected: &str) -> Option<Ordering> {
    if let (Some(a), Ok(b)) = (value_to_f64(actual), expected.trim().parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    match actual {
        Value::String(s) => Some(s.as_str().cmp(expected)),
        _ => None,
    }
}

fn values_equal(actual: &Value, expected: &str) -> bool {
    // Try numeric comparison first
    if let (Some(a), Ok(b)) = (value_to_f64(actual), expected.trim().parse::<f64>()) {
        return (a - b).abs() < f64::EPSILON;
    }
    // Fall back to string comparison
    value_to_string(actual) == expected
}

fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Multi-key ordering. Missing and null values sort first.
pub fn compare_documents(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    for key in sort.keys() {
        let ordering = compare_values(
            extract_field(a, &key.field),
            extract_field(b, &key.field),
        );
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Apply a projection. An inclusion list keeps only the listed fields plus
/// the document id; the exclusion list is removed afterwards.
pub fn project(doc: &Document, projection: Option<&ProjectionSpec>) -> Document {
    let Some(projection) = projection else {
        return doc.clone();
    };

    let mut out = if projection.include.is_empty() {
        doc.clone()
    } else {
        doc.iter()
            .filter(|(k, _)| k.as_str() == ID_FIELD || projection.include.iter().any(|f| f == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    };

    for field in &projection.exclude {
        out.remove(field);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_query::{QueryParameters, SortKey};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        crate::document_from_value(value).unwrap()
    }

    fn filter(raw: &str) -> FilterExpression {
        FilterExpression::from_params(&QueryParameters::parse(raw))
    }

    #[test]
    fn test_numeric_equality_coerces_query_string() {
        let d = doc(json!({ "duration": 5, "difficulty": "easy" }));
        assert!(matches(&d, &filter("duration=5&difficulty=easy")));
        assert!(matches(&d, &filter("duration=5.0")));
        assert!(!matches(&d, &filter("duration=7")));
    }

    #[test]
    fn test_range_operators() {
        let d = doc(json!({ "price": 497 }));
        assert!(matches(&d, &filter("price[gte]=497")));
        assert!(!matches(&d, &filter("price[gt]=497")));
        assert!(matches(&d, &filter("price[lt]=500&price[gte]=100")));
        assert!(!matches(&d, &filter("price[lte]=496")));
    }

    #[test]
    fn test_dates_compare_as_strings() {
        let d = doc(json!({ "createdAt": "2021-03-15T10:00:00.000Z" }));
        assert!(matches(&d, &filter("createdAt[gte]=2021-01-01")));
        assert!(!matches(&d, &filter("createdAt[lt]=2021-01-01")));
    }

    #[test]
    fn test_array_field_matches_any_element() {
        let d = doc(json!({ "startDates": ["2021-04-25", "2021-07-20"] }));
        assert!(matches(&d, &filter("startDates[gte]=2021-07-01")));
        assert!(!matches(&d, &filter("startDates[gte]=2022-01-01")));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let d = doc(json!({ "name": "x" }));
        assert!(!matches(&d, &filter("price=1")));
        assert!(!matches(&d, &filter("price[lt]=1")));
    }

    #[test]
    fn test_ne_against_boolean() {
        let hidden = FilterExpression::new().and(Predicate::ne("secretTour", "true"));
        assert!(!matches(&doc(json!({ "secretTour": true })), &hidden));
        assert!(matches(&doc(json!({ "secretTour": false })), &hidden));
        assert!(matches(&doc(json!({ "name": "no flag" })), &hidden));
    }

    #[test]
    fn test_membership() {
        let f = filter("difficulty=easy&difficulty=medium");
        assert!(matches(&doc(json!({ "difficulty": "medium" })), &f));
        assert!(!matches(&doc(json!({ "difficulty": "difficult" })), &f));
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = validate(&filter("price[between]=1")).unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownOperator {
                field: "price".into(),
                operator: "between".into()
            }
        );
        assert!(validate(&filter("price[gte]=1")).is_ok());
    }

    #[test]
    fn test_dotted_field_lookup() {
        let d = doc(json!({ "startLocation": { "address": "Miami, USA" } }));
        assert_eq!(
            extract_field(&d, "startLocation.address"),
            Some(&json!("Miami, USA"))
        );
        assert!(matches(&d, &filter("startLocation.address=Miami,%20USA")));
    }

    #[test]
    fn test_multi_key_sort() {
        let a = doc(json!({ "ratingsAverage": 4.8, "price": 997 }));
        let b = doc(json!({ "ratingsAverage": 4.8, "price": 397 }));
        let c = doc(json!({ "ratingsAverage": 4.9, "price": 1497 }));
        let sort = SortSpec::parse("-ratingsAverage,price").unwrap();

        let mut docs = vec![&a, &b, &c];
        docs.sort_by(|x, y| compare_documents(x, y, &sort));
        assert_eq!(docs, vec![&c, &b, &a]);
    }

    #[test]
    fn test_missing_values_sort_first() {
        let with = doc(json!({ "createdAt": "2021-01-01" }));
        let without = doc(json!({}));
        let sort = SortSpec::parse("createdAt").unwrap();
        assert_eq!(compare_documents(&without, &with, &sort), Ordering::Less);
        assert_eq!(sort.keys(), &[SortKey::asc("createdAt")]);
    }

    #[test]
    fn test_projection_include_keeps_id() {
        let d = doc(json!({ "id": "t1", "name": "Hiker", "price": 1, "__v": 0 }));
        let p = ProjectionSpec::include(["name"]);
        assert_eq!(
            Value::Object(project(&d, Some(&p))),
            json!({ "id": "t1", "name": "Hiker" })
        );
    }

    #[test]
    fn test_projection_default_drops_version() {
        let d = doc(json!({ "id": "t1", "name": "Hiker", "__v": 3 }));
        let out = project(&d, Some(&ProjectionSpec::default()));
        assert!(!out.contains_key("__v"));
        assert_eq!(out.len(), 2);
    }
}
