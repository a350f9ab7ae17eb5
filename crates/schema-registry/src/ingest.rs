//! Extraction-driven ingest.
//!
//! A [`FieldExtractor`] turns some source (an uploaded image URL, a document
//! id) into a JSON object keyed by field names. The registry only supplies
//! the field list and stores the result; fetching, OCR and model calls are
//! the extractor's business.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::registry::SchemaRegistry;

/// Marker an extractor returns for a field it could not determine.
pub const NOT_FOUND_MARKER: &str = "Not Found";

/// Produces field values for a source document.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract values for the fields described in `prompt` from `source`.
    async fn extract(&self, source: &str, prompt: &str) -> Result<Map<String, Value>>;
}

/// Instruction text asking for the given fields as a flat JSON object.
pub fn build_extraction_prompt(fields: &[String]) -> String {
    format!(
        "Extract the following fields from the document. \
         Return a single JSON object with exactly these keys and no other text. \
         If a value cannot be determined or is ambiguous, use the string \"{marker}\".\n\n\
         Fields:\n{fields}\n",
        marker = NOT_FOUND_MARKER,
        fields = fields.join("\n"),
    )
}

/// Outcome of one [`IngestPipeline::ingest`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub id: Uuid,
    pub values: Map<String, Value>,
}

/// Runs an extractor against a schema's fields and stores the result.
pub struct IngestPipeline {
    registry: SchemaRegistry,
    extractor: Arc<dyn FieldExtractor>,
}

impl IngestPipeline {
    pub fn new(registry: SchemaRegistry, extractor: Arc<dyn FieldExtractor>) -> Self {
        Self {
            registry,
            extractor,
        }
    }

    /// Extract values for `schema` from `source` and insert them for `owner`.
    pub async fn ingest(&self, schema: &str, owner: &str, source: &str) -> Result<IngestOutcome> {
        let fields = self.registry.get_fields(schema).await?;
        let prompt = build_extraction_prompt(&fields);
        debug!("Extracting {} fields for schema '{}'", fields.len(), schema);

        let extracted = self
            .extractor
            .extract(source, &prompt)
            .await
            .map_err(|e| match e {
                RegistryError::UpstreamFailure(_) => e,
                other => RegistryError::UpstreamFailure(format!("extraction failed: {}", other)),
            })?;

        if extracted.is_empty() {
            warn!("Extractor returned no values for schema '{}'", schema);
            return Err(RegistryError::UpstreamFailure(
                "extraction returned no values".to_string(),
            ));
        }

        let values = normalize_markers(extracted);
        let id = self.registry.insert_data(schema, owner, &values).await?;

        info!("Ingested row {} into schema '{}'", id, schema);
        Ok(IngestOutcome { id, values })
    }
}

/// Replace `Not Found` markers with JSON null.
fn normalize_markers(values: Map<String, Value>) -> Map<String, Value> {
    values
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) if s.trim().eq_ignore_ascii_case(NOT_FOUND_MARKER) => (k, Value::Null),
            other => (k, other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDefinition, NewSchema, RowFilter};
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeExtractor {
        response: Result<Map<String, Value>>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        fn returning(value: Value) -> Self {
            let map = match value {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            Self {
                response: Ok(map),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: RegistryError) -> Self {
            Self {
                response: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FieldExtractor for FakeExtractor {
        async fn extract(&self, _source: &str, prompt: &str) -> Result<Map<String, Value>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.response {
                Ok(map) => Ok(map.clone()),
                Err(e) => Err(RegistryError::Config(e.to_string())),
            }
        }
    }

    async fn receipts_registry() -> SchemaRegistry {
        let registry = SchemaRegistry::in_memory();
        registry
            .create_schema(NewSchema::new(
                "receipts",
                vec![
                    FieldDefinition::new("storeName", "text"),
                    FieldDefinition::new("total", "numeric"),
                ],
            ))
            .await
            .unwrap();
        registry
    }

    #[test]
    fn test_prompt_lists_fields_one_per_line() {
        let prompt = build_extraction_prompt(&["storeName".to_string(), "total".to_string()]);
        assert!(prompt.contains("Fields:\nstoreName\ntotal\n"));
        assert!(prompt.contains("\"Not Found\""));
    }

    #[test]
    fn test_normalize_markers() {
        let values = json!({"a": "Not Found", "b": " not found ", "c": "found", "d": 3});
        let normalized = normalize_markers(values.as_object().unwrap().clone());
        assert_eq!(normalized["a"], Value::Null);
        assert_eq!(normalized["b"], Value::Null);
        assert_eq!(normalized["c"], json!("found"));
        assert_eq!(normalized["d"], json!(3));
    }

    #[tokio::test]
    async fn test_ingest_stores_extracted_row() {
        let registry = receipts_registry().await;
        let extractor = Arc::new(FakeExtractor::returning(
            json!({"storeName": "Corner Shop", "total": "Not Found"}),
        ));
        let pipeline = IngestPipeline::new(registry.clone(), extractor.clone());

        let outcome = pipeline
            .ingest("receipts", "user1", "https://example.test/r.png")
            .await
            .unwrap();
        assert_eq!(outcome.values["total"], Value::Null);

        let rows = registry
            .query_data("receipts", &RowFilter::owner("user1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["storeName"], json!("Corner Shop"));
        assert_eq!(rows[0]["total"], Value::Null);

        let prompts = extractor.prompts.lock().unwrap();
        assert!(prompts[0].contains("storeName\ntotal"));
    }

    #[tokio::test]
    async fn test_empty_extraction_is_upstream_failure() {
        let registry = receipts_registry().await;
        let pipeline = IngestPipeline::new(
            registry.clone(),
            Arc::new(FakeExtractor::returning(json!({}))),
        );

        let err = pipeline.ingest("receipts", "user1", "src").await.unwrap_err();
        assert!(matches!(err, RegistryError::UpstreamFailure(_)));
        assert!(registry
            .query_data("receipts", &RowFilter::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_extractor_error_is_upstream_failure() {
        let pipeline = IngestPipeline::new(
            receipts_registry().await,
            Arc::new(FakeExtractor::failing(RegistryError::Config("model offline".into()))),
        );

        let err = pipeline.ingest("receipts", "user1", "src").await.unwrap_err();
        assert!(matches!(err, RegistryError::UpstreamFailure(_)));
        assert!(err.to_string().contains("model offline"));
    }

    #[tokio::test]
    async fn test_unknown_schema_is_not_found() {
        let pipeline = IngestPipeline::new(
            SchemaRegistry::in_memory(),
            Arc::new(FakeExtractor::returning(json!({"a": 1}))),
        );
        let err = pipeline.ingest("ghost", "user1", "src").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }
}
