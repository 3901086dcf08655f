use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::AssessmentRecord;
use crate::error::EngineError;
use crate::retrieve::ScoredAssessment;

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32000;
/// Embedding backend unavailable. Distinct from INTERNAL_ERROR so callers
/// can tell "the engine is broken" from every other failure — and an
/// error, never an empty result list.
pub const EMBEDDING_UNAVAILABLE: i64 = -32001;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Map an engine error to its wire code. Keeps the taxonomy visible to
/// collaborators: caller errors, backend outages, and internal failures
/// stay distinguishable.
pub fn error_code(err: &EngineError) -> i64 {
    match err {
        EngineError::InvalidQuery(_) => INVALID_PARAMS,
        EngineError::Embedding(_) => EMBEDDING_UNAVAILABLE,
        EngineError::CatalogLoad(_) | EngineError::Explanation(_) | EngineError::Store(_) => {
            INTERNAL_ERROR
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    /// Falls back to the engine's configured default when absent.
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub query: String,
}

/// Wire form of one recommended assessment — the only place the internal
/// record shape is translated for collaborators. Support flags render as
/// Yes/No strings and `test_type` always crosses as a list, regardless of
/// how the dataset spelled it.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendedAssessment {
    pub url: String,
    pub name: String,
    pub description: String,
    pub test_type: Vec<String>,
    pub duration: u32,
    pub remote_support: String,
    pub adaptive_support: String,
    pub score: f32,
}

impl RecommendedAssessment {
    pub fn from_scored(hit: &ScoredAssessment) -> Self {
        Self::from_record(&hit.record, hit.score)
    }

    pub fn from_record(record: &AssessmentRecord, score: f32) -> Self {
        Self {
            url: record.url.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            test_type: record.test_types.clone(),
            duration: record.duration_minutes,
            remote_support: yes_no(record.remote_support),
            adaptive_support: yes_no(record.adaptive_support),
            score,
        }
    }
}

pub fn yes_no(flag: bool) -> String {
    if flag { "Yes".into() } else { "No".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dataset::{RawRecord, normalize};
    use serde_json::json;

    #[test]
    fn jsonrpc_success_response() {
        let resp = JsonRpcResponse::success(Some(json!(1)), json!({"ok": true}));
        assert_eq!(resp.jsonrpc, "2.0");
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn jsonrpc_error_response() {
        let resp = JsonRpcResponse::error(Some(json!(2)), INVALID_PARAMS, "query is empty");
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "query is empty");
    }

    #[test]
    fn serialized_response_omits_null_members() {
        let resp = JsonRpcResponse::success(Some(json!(1)), json!("ok"));
        let text = serde_json::to_string(&resp).unwrap();
        assert!(!text.contains("error"));
    }

    #[test]
    fn parse_valid_request() {
        let text = r#"{"jsonrpc":"2.0","id":1,"method":"search","params":{"query":"analyst"}}"#;
        let req: JsonRpcRequest = serde_json::from_str(text).unwrap();
        assert_eq!(req.method, "search");
        assert_eq!(req.id, Some(json!(1)));
    }

    #[test]
    fn search_params_max_results_is_optional() {
        let params: SearchParams = serde_json::from_value(json!({"query": "analyst"})).unwrap();
        assert_eq!(params.max_results, None);
        let params: SearchParams =
            serde_json::from_value(json!({"query": "analyst", "max_results": 3})).unwrap();
        assert_eq!(params.max_results, Some(3));
    }

    #[test]
    fn taxonomy_maps_to_distinct_codes() {
        assert_eq!(
            error_code(&EngineError::InvalidQuery("empty".into())),
            INVALID_PARAMS
        );
        assert_eq!(
            error_code(&EngineError::Embedding("down".into())),
            EMBEDDING_UNAVAILABLE
        );
        assert_eq!(
            error_code(&EngineError::Store("bad".into())),
            INTERNAL_ERROR
        );
    }

    #[test]
    fn delimited_test_type_crosses_the_boundary_as_a_list() {
        let raw: RawRecord = serde_json::from_value(json!({
            "id": "r1",
            "name": "Graduate Battery",
            "url": "https://example.com/r1",
            "description": "Mixed battery.",
            "test_type": "A,B,C",
            "duration": 30,
            "remote_support": "Yes",
            "adaptive_support": "No"
        }))
        .unwrap();
        let record = normalize(raw, 0).unwrap();
        let wire = RecommendedAssessment::from_record(&record, 0.9);

        assert_eq!(wire.test_type, vec!["A", "B", "C"]);
        assert_eq!(wire.remote_support, "Yes");
        assert_eq!(wire.adaptive_support, "No");

        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["test_type"], json!(["A", "B", "C"]));
        assert_eq!(value["duration"], json!(30));
    }
}
