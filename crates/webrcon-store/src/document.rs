//! Documents, queries and the in-memory collection layout shared by the
//! store backends

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::StoreError;

/// A stored record: a JSON object
pub type Document = serde_json::Map<String, Value>;

/// Numeric document id, unique within a collection
pub type DocumentId = u64;

/// Exact-match predicate over one top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub field: String,
    pub value: Value,
}

impl Query {
    /// Match documents whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// One collection: documents ordered by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Collection {
    next_id: DocumentId,
    documents: BTreeMap<DocumentId, Document>,
}

impl Collection {
    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(&id).cloned()
    }

    pub fn query(&self, query: &Query) -> Vec<(DocumentId, Document)> {
        self.documents
            .iter()
            .filter(|(_, document)| query.matches(document))
            .map(|(id, document)| (*id, document.clone()))
            .collect()
    }

    /// Insert a new document, or merge into an existing one. Fields missing
    /// from `document` keep their stored value.
    pub fn set(&mut self, id: Option<DocumentId>, document: Document) -> DocumentId {
        if let Some(id) = id {
            if let Some(existing) = self.documents.get_mut(&id) {
                existing.extend(document);
                return id;
            }
        }

        self.next_id += 1;
        let id = self.next_id;
        self.documents.insert(id, document);
        id
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Collection names become file names, so keep them to a safe alphabet
pub(crate) fn validate_collection(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}
