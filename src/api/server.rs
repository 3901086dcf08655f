use anyhow::Result;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::Path;

use super::protocol::*;
use crate::config::Config;
use crate::engine::{self, Engine};

/// Serve the engine over line-delimited JSON-RPC on stdin/stdout. The
/// engine is built before the loop starts: a broken catalog aborts
/// startup instead of failing every request.
pub fn run(config: &Config, root: &Path) -> Result<()> {
    let engine = engine::shared(config, root)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("parse error: {e}"));
                send(&mut stdout, &resp)?;
                continue;
            }
        };

        let response = dispatch(engine, &request);
        send(&mut stdout, &response)?;
    }

    Ok(())
}

fn send(out: &mut impl Write, response: &JsonRpcResponse) -> Result<()> {
    let text = serde_json::to_string(response)?;
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}

pub(crate) fn dispatch(engine: &Engine, request: &JsonRpcRequest) -> JsonRpcResponse {
    match request.method.as_str() {
        "ping" => JsonRpcResponse::success(request.id.clone(), json!({})),
        "search" => handle_search(engine, request),
        "recommend" => handle_recommend(engine, request),
        "status" => handle_status(engine, request),
        other => JsonRpcResponse::error(
            request.id.clone(),
            METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    }
}

fn handle_search(engine: &Engine, request: &JsonRpcRequest) -> JsonRpcResponse {
    let params: SearchParams = match serde_json::from_value(request.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::error(
                request.id.clone(),
                INVALID_PARAMS,
                format!("invalid params: {e}"),
            );
        }
    };

    let max_results = params.max_results.unwrap_or_else(|| engine.default_k());
    match engine.search(&params.query, max_results) {
        Ok(hits) => {
            let assessments: Vec<RecommendedAssessment> =
                hits.iter().map(RecommendedAssessment::from_scored).collect();
            JsonRpcResponse::success(
                request.id.clone(),
                json!({ "recommended_assessments": assessments }),
            )
        }
        Err(e) => JsonRpcResponse::error(request.id.clone(), error_code(&e), e.to_string()),
    }
}

fn handle_recommend(engine: &Engine, request: &JsonRpcRequest) -> JsonRpcResponse {
    let params: RecommendParams = match serde_json::from_value(request.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::error(
                request.id.clone(),
                INVALID_PARAMS,
                format!("invalid params: {e}"),
            );
        }
    };

    match engine.recommend(&params.query) {
        Ok(explanation) => {
            JsonRpcResponse::success(request.id.clone(), json!({ "explanation": explanation }))
        }
        Err(e) => JsonRpcResponse::error(request.id.clone(), error_code(&e), e.to_string()),
    }
}

fn handle_status(engine: &Engine, request: &JsonRpcRequest) -> JsonRpcResponse {
    let stats = engine.stats();
    let test_types: Vec<_> = stats
        .test_type_counts
        .iter()
        .map(|(name, count)| json!({ "name": name, "count": count }))
        .collect();
    JsonRpcResponse::success(
        request.id.clone(),
        json!({
            "records": stats.record_count,
            "dimensions": stats.dimensions,
            "embed_model": stats.embed_model,
            "explain_backend": stats.explain_backend,
            "db_size_bytes": stats.db_size_bytes,
            "test_types": test_types,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    const TEST_CATALOG: &str = r#"[
        {"id": "r1", "name": "Verbal reasoning test", "url": "https://example.com/r1",
         "description": "Evaluates verbal comprehension of written passages.",
         "test_type": "Verbal,Ability", "duration": 30, "remote_support": "Yes", "adaptive_support": "No"},
        {"id": "r2", "name": "Numerical reasoning test", "url": "https://example.com/r2",
         "description": "Evaluates numerical ability with charts and tables.",
         "test_type": "Numerical,Ability", "duration": 45, "remote_support": "Yes", "adaptive_support": "Yes"}
    ]"#;

    fn test_engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/catalog.json"), TEST_CATALOG).unwrap();
        let engine = Engine::new(&Config::default(), dir.path()).unwrap();
        (dir, engine)
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    #[test]
    fn ping_answers_with_empty_object() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(&engine, &request("ping", json!({})));
        assert_eq!(resp.result, Some(json!({})));
    }

    #[test]
    fn search_returns_wire_shaped_records() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(
            &engine,
            &request("search", json!({"query": "numerical ability", "max_results": 2})),
        );
        let result = resp.result.unwrap();
        let assessments = result["recommended_assessments"].as_array().unwrap();
        assert_eq!(assessments.len(), 2);
        assert_eq!(assessments[0]["name"], "Numerical reasoning test");
        assert_eq!(assessments[0]["test_type"], json!(["Numerical", "Ability"]));
        assert_eq!(assessments[0]["remote_support"], "Yes");
        assert_eq!(assessments[0]["adaptive_support"], "Yes");
    }

    #[test]
    fn empty_query_maps_to_invalid_params() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(&engine, &request("search", json!({"query": "   "})));
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn missing_params_map_to_invalid_params() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(&engine, &request("search", json!({})));
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn recommend_returns_an_explanation() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(
            &engine,
            &request("recommend", json!({"query": "assess numerical ability"})),
        );
        let result = resp.result.unwrap();
        let explanation = result["explanation"].as_str().unwrap();
        assert!(!explanation.trim().is_empty());
    }

    #[test]
    fn status_reports_catalog_shape() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(&engine, &request("status", json!({})));
        let result = resp.result.unwrap();
        assert_eq!(result["records"], 2);
        assert_eq!(result["embed_model"], "hash-256");
    }

    #[test]
    fn unknown_method_maps_to_method_not_found() {
        let (_dir, engine) = test_engine();
        let resp = dispatch(&engine, &request("explain", json!({})));
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }
}
