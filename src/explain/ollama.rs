use std::time::Duration;

use serde::Deserialize;

use super::TextGenerator;
use crate::error::EngineError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Generation backend talking to a local Ollama server. Requests carry a
/// hard timeout — a hung generation becomes an `Explanation` error the
/// engine can degrade from, never an indefinitely blocked call.
#[derive(Debug)]
pub struct OllamaGenerator {
    agent: ureq::Agent,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let timeout = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout)))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

impl TextGenerator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let mut response = match self.agent.post(&url).send_json(&body) {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(EngineError::Explanation(format!(
                    "ollama returned HTTP {code}"
                )));
            }
            Err(e) => {
                return Err(EngineError::Explanation(format!(
                    "ollama generate request failed: {e}"
                )));
            }
        };

        let resp: GenerateResponse = response.body_mut().read_json().map_err(|e| {
            EngineError::Explanation(format!("parsing ollama generate response: {e}"))
        })?;

        Ok(resp.response)
    }

    fn backend_name(&self) -> &str {
        &self.model
    }
}
