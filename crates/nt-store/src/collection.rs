//! # Collection
//!
//! Thread-safe, cheaply clonable handle over one named set of documents.
//! Each document carries an `id` and a `__v` version counter bumped on
//! every update.

use std::sync::Arc;

use nt_query::{FilterExpression, QueryPlan, VERSION_FIELD};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::eval;
use crate::find::Find;
use crate::{Document, StoreError, ID_FIELD};

#[derive(Clone)]
pub struct Collection {
    name: String,
    id_prefix: String,
    unique: Vec<String>,
    pub(crate) docs: Arc<RwLock<Vec<Document>>>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id_prefix: name.clone(),
            name,
            unique: Vec::new(),
            docs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Prefix for generated ids (`<prefix>-<uuid>`), defaults to the name.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Reject inserts and updates that would duplicate `field`.
    pub fn with_unique(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a lazily executed query over the whole collection.
    pub fn find(&self) -> Find {
        Find::new(self.clone(), QueryPlan::new())
    }

    pub async fn insert(&self, doc: Document) -> Result<Document, StoreError> {
        let mut docs = self.docs.write().await;
        self.insert_locked(&mut docs, doc)
    }

    /// Insert in order, stopping at the first failure. Documents inserted
    /// before the failure stay.
    pub async fn insert_many(&self, batch: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.docs.write().await;
        let mut inserted = Vec::with_capacity(batch.len());
        for doc in batch {
            inserted.push(self.insert_locked(&mut docs, doc)?);
        }
        tracing::debug!(collection = %self.name, count = inserted.len(), "inserted documents");
        Ok(inserted)
    }

    fn insert_locked(&self, docs: &mut Vec<Document>, mut doc: Document) -> Result<Document, StoreError> {
        let id = match doc.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => format!("{}-{}", self.id_prefix, uuid::Uuid::new_v4().as_simple()),
        };
        if docs.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(StoreError::Duplicate {
                field: ID_FIELD.to_string(),
                value: id,
            });
        }
        self.check_unique(docs, &doc, None)?;

        doc.insert(ID_FIELD.to_string(), Value::String(id));
        doc.insert(VERSION_FIELD.to_string(), Value::from(0u64));
        docs.push(doc.clone());
        Ok(doc)
    }

    fn check_unique(&self, docs: &[Document], candidate: &Document, skip_id: Option<&str>) -> Result<(), StoreError> {
        for field in &self.unique {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let clash = docs
                .iter()
                .filter(|d| skip_id.is_none() || document_id(d) != skip_id)
                .any(|d| d.get(field) == Some(value));
            if clash {
                return Err(StoreError::Duplicate {
                    field: field.clone(),
                    value: match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                });
            }
        }
        Ok(())
    }

    /// First document matching `filter`, in insertion order.
    pub async fn find_one(&self, filter: &FilterExpression) -> Result<Option<Document>, StoreError> {
        eval::validate(filter)?;
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .find(|d| eval::matches(d, filter))
            .cloned())
    }

    /// Every document matching `filter`, unsorted and unpaged.
    pub async fn documents(&self, filter: &FilterExpression) -> Result<Vec<Document>, StoreError> {
        eval::validate(filter)?;
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .filter(|d| eval::matches(d, filter))
            .cloned()
            .collect())
    }

    /// Merge top-level keys of `patch` into the document. `id` and `__v`
    /// in the patch are ignored.
    pub async fn update_by_id(&self, id: &str, mut patch: Document) -> Result<Document, StoreError> {
        patch.remove(ID_FIELD);
        patch.remove(VERSION_FIELD);

        let mut docs = self.docs.write().await;
        self.check_unique(&docs, &patch, Some(id))?;

        let doc = docs
            .iter_mut()
            .find(|d| document_id(d) == Some(id))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let version = doc.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
        doc.extend(patch);
        doc.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
        Ok(doc.clone())
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<Document, StoreError> {
        let mut docs = self.docs.write().await;
        let idx = docs
            .iter()
            .position(|d| document_id(d) == Some(id))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Ok(docs.remove(idx))
    }

    pub async fn count(&self) -> usize {
        self.docs.read().await.len()
    }
}

fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_query::Predicate;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        crate::document_from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_version() {
        let tours = Collection::new("tours").with_id_prefix("tour");
        let stored = tours.insert(doc(json!({ "name": "The Sea Explorer" }))).await.unwrap();

        let id = stored["id"].as_str().unwrap();
        assert!(id.starts_with("tour-"));
        assert_eq!(stored["__v"], json!(0));
        let by_id = FilterExpression::new().and(Predicate::eq(ID_FIELD, id));
        assert_eq!(tours.find_one(&by_id).await.unwrap(), Some(stored.clone()));
        assert_eq!(tours.count().await, 1);
    }

    #[tokio::test]
    async fn test_unique_field_rejects_duplicates() {
        let tours = Collection::new("tours").with_unique("name");
        tours.insert(doc(json!({ "name": "The Snow Adventurer" }))).await.unwrap();
        let err = tours
            .insert(doc(json!({ "name": "The Snow Adventurer" })))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Duplicate {
                field: "name".into(),
                value: "The Snow Adventurer".into()
            }
        );
    }

    #[tokio::test]
    async fn test_explicit_id_is_kept_and_must_be_unique() {
        let tours = Collection::new("tours");
        tours.insert(doc(json!({ "id": "abc" }))).await.unwrap();
        let by_id = FilterExpression::new().and(Predicate::eq(ID_FIELD, "abc"));
        assert!(tours.find_one(&by_id).await.unwrap().is_some());
        assert!(tours.insert(doc(json!({ "id": "abc" }))).await.is_err());
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_version() {
        let tours = Collection::new("tours").with_unique("name");
        let a = tours.insert(doc(json!({ "name": "A", "price": 1 }))).await.unwrap();
        tours.insert(doc(json!({ "name": "B" }))).await.unwrap();
        let id = a["id"].as_str().unwrap();

        let updated = tours
            .update_by_id(id, doc(json!({ "price": 2, "id": "hijack", "__v": 99 })))
            .await
            .unwrap();
        assert_eq!(updated["price"], json!(2));
        assert_eq!(updated["name"], json!("A"));
        assert_eq!(updated["id"], json!(id));
        assert_eq!(updated["__v"], json!(1));

        // Keeping its own name is fine, taking another's is not
        assert!(tours.update_by_id(id, doc(json!({ "name": "A" }))).await.is_ok());
        assert!(tours.update_by_id(id, doc(json!({ "name": "B" }))).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let tours = Collection::new("tours");
        assert_eq!(
            tours.update_by_id("nope", Document::new()).await.unwrap_err(),
            StoreError::NotFound { id: "nope".into() }
        );
        assert!(tours.delete_by_id("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let tours = Collection::new("tours");
        let batch = vec![doc(json!({ "n": 1 })), doc(json!({ "n": 2 })), doc(json!({ "n": 3 }))];
        let inserted = tours.insert_many(batch).await.unwrap();
        let first = inserted[0]["id"].as_str().unwrap();

        let removed = tours.delete_by_id(first).await.unwrap();
        assert_eq!(removed["n"], json!(1));
        assert_eq!(tours.count().await, 2);
        assert!(tours.delete_by_id(first).await.is_err());
    }

    #[tokio::test]
    async fn test_filtered_snapshot_and_find_one() {
        let tours = Collection::new("tours");
        tours
            .insert_many(vec![
                doc(json!({ "name": "visible", "secretTour": false })),
                doc(json!({ "name": "hidden", "secretTour": true })),
            ])
            .await
            .unwrap();

        let public = FilterExpression::new().and(Predicate::ne("secretTour", "true"));
        let docs = tours.documents(&public).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], json!("visible"));

        let hidden = FilterExpression::new().and(Predicate::eq("name", "hidden"));
        let found = tours.find_one(&public.clone().and(Predicate::eq("name", "hidden"))).await.unwrap();
        assert!(found.is_none());
        assert!(tours.find_one(&hidden).await.unwrap().is_some());
    }
}
