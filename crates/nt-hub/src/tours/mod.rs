//! # Tours
//!
//! The tour model: validation rules, defaults and derived fields applied on
//! top of the generic document store, plus the scoping every read shares.

pub mod stats;

use nt_query::{FilterExpression, Predicate};
use nt_store::{Collection, Document};
use serde_json::Value;

pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "difficult"];

const NAME_MIN: usize = 10;
const NAME_MAX: usize = 40;
const DEFAULT_RATING: f64 = 4.5;

/// Secret tours never show up in reads.
pub fn public_filter() -> FilterExpression {
    FilterExpression::new().and(Predicate::ne("secretTour", "true"))
}

/// Validate a new tour and fill in defaults and derived fields.
pub fn prepare_new(body: Value) -> Result<Document, Vec<String>> {
    let mut doc = into_document(body)?;
    trim_strings(&mut doc);

    doc.entry("ratingsAverage").or_insert(Value::from(DEFAULT_RATING));
    doc.entry("ratingsQuantity").or_insert(Value::from(0));
    doc.entry("secretTour").or_insert(Value::Bool(false));
    doc.entry("images").or_insert(Value::Array(Vec::new()));
    doc.entry("startDates").or_insert(Value::Array(Vec::new()));
    doc.entry("createdAt")
        .or_insert_with(|| Value::String(now_rfc3339()));

    let errors = validate(&doc, true);
    if !errors.is_empty() {
        return Err(errors);
    }

    set_slug(&mut doc);
    Ok(doc)
}

/// Validate a partial update against the rules of the fields it touches.
pub fn prepare_patch(body: Value) -> Result<Document, Vec<String>> {
    let mut patch = into_document(body)?;
    trim_strings(&mut patch);

    let errors = validate(&patch, false);
    if !errors.is_empty() {
        return Err(errors);
    }

    set_slug(&mut patch);
    Ok(patch)
}

/// Load a JSON array of tours into `tours`, validating each one like a
/// create. Returns the number of tours imported.
pub async fn import(tours: &Collection, seed: Value) -> Result<usize, String> {
    let Value::Array(entries) = seed else {
        return Err("seed data must be a JSON array of tours".to_string());
    };

    let mut batch = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let doc = prepare_new(entry)
            .map_err(|errors| format!("tour #{}: {}", i, errors.join(". ")))?;
        batch.push(doc);
    }

    let inserted = tours.insert_many(batch).await.map_err(|e| e.to_string())?;
    Ok(inserted.len())
}

/// Output form of a stored tour, with the virtual `durationWeeks`.
pub fn present(mut doc: Document) -> Value {
    if let Some(duration) = doc.get("duration").and_then(Value::as_f64) {
        doc.insert("durationWeeks".to_string(), Value::from(duration / 7.0));
    }
    Value::Object(doc)
}

/// `"The Forest Hiker"` → `"the-forest-hiker"`.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn into_document(body: Value) -> Result<Document, Vec<String>> {
    nt_store::document_from_value(body).map_err(|e| vec![e.to_string()])
}

fn set_slug(doc: &mut Document) {
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        doc.insert("slug".to_string(), Value::String(slug));
    }
}

fn trim_strings(doc: &mut Document) {
    for field in ["name", "summary", "description"] {
        if let Some(Value::String(s)) = doc.get_mut(field) {
            *s = s.trim().to_string();
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Collect every rule violation. With `full` set, required fields must be
/// present; otherwise only the fields present are checked.
fn validate(doc: &Document, full: bool) -> Vec<String> {
    let mut errors = Vec::new();

    let required = [
        ("name", "A tour must have a name"),
        ("duration", "A tour must have a duration"),
        ("maxGroupSize", "A tour must have a group size"),
        ("difficulty", "A tour must have a difficulty"),
        ("price", "A tour must have a price"),
        ("summary", "A tour must have a summary"),
        ("imageCover", "A tour must have a cover image"),
    ];
    for (field, message) in required {
        let missing = match doc.get(field) {
            None | Some(Value::Null) => full,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            errors.push(message.to_string());
        }
    }

    if let Some(name) = doc.get("name") {
        match name.as_str() {
            Some(name) if name.chars().count() > NAME_MAX => {
                errors.push(format!("A tour name cannot have more than {} characters", NAME_MAX))
            }
            Some(name) if !name.is_empty() && name.chars().count() < NAME_MIN => {
                errors.push(format!("A tour name cannot have less than {} characters", NAME_MIN))
            }
            Some(_) => {}
            None => errors.push("Tour name must be a string".to_string()),
        }
    }

    for field in [
        "duration",
        "maxGroupSize",
        "price",
        "ratingsAverage",
        "ratingsQuantity",
        "priceDiscount",
    ] {
        if let Some(value) = doc.get(field) {
            if !value.is_null() && !value.is_number() {
                errors.push(format!("{} must be a number", field));
            }
        }
    }

    let difficulty_ok = match doc.get("difficulty") {
        None | Some(Value::Null) => true,
        Some(Value::String(d)) => d.is_empty() || DIFFICULTIES.contains(&d.as_str()),
        Some(_) => false,
    };
    if !difficulty_ok {
        errors.push("Difficulty is either: easy, medium or difficult".to_string());
    }

    if let Some(rating) = doc.get("ratingsAverage").and_then(Value::as_f64) {
        if rating < 1.0 {
            errors.push("Rating must be above 1.0".to_string());
        }
        if rating > 5.0 {
            errors.push("Rating must be below 5.0".to_string());
        }
    }

    // Only checked when both values are part of the same write
    if let (Some(discount), Some(price)) = (
        doc.get("priceDiscount").and_then(Value::as_f64),
        doc.get("price").and_then(Value::as_f64),
    ) {
        if discount >= price {
            errors.push(format!(
                "Discount price of {} should be below regular price",
                doc["priceDiscount"]
            ));
        }
    }

    if let Some(dates) = doc.get("startDates") {
        let valid = match dates {
            Value::Array(items) => items.iter().all(is_date),
            _ => false,
        };
        if !valid {
            errors.push("startDates must be a list of dates".to_string());
        }
    }

    errors
}

fn is_date(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d,%H:%M").is_ok()
}
