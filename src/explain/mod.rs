pub mod ollama;

use crate::error::EngineError;
use crate::retrieve::ScoredAssessment;

/// External generative-text capability. Injected so the explanation
/// pipeline is testable with a deterministic stub.
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    fn generate(&self, prompt: &str) -> Result<String, EngineError>;
    fn backend_name(&self) -> &str;
}

pub const DEFAULT_MAX_CHARS: usize = 4000;

/// Description text is trimmed to this many characters in the prompt so
/// prompt size stays bounded by k, not by catalog prose.
const DESCRIPTION_SNIPPET_CHARS: usize = 280;

/// Turns (query, ranked records) into a natural-language justification.
/// Owns the prompt contract and output validation; the actual text
/// generation is the injected backend's problem.
#[derive(Debug)]
pub struct Explainer {
    generator: Option<Box<dyn TextGenerator>>,
    max_chars: usize,
}

impl Explainer {
    pub fn new(generator: Option<Box<dyn TextGenerator>>, max_chars: usize) -> Self {
        Self {
            generator,
            max_chars,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.generator
            .as_ref()
            .map(|g| g.backend_name())
            .unwrap_or("template")
    }

    /// Produce the justification for a ranked result set. With no
    /// generation backend configured, the template is the answer, not a
    /// degraded fallback.
    pub fn explain(
        &self,
        query: &str,
        records: &[ScoredAssessment],
    ) -> Result<String, EngineError> {
        let generator = match &self.generator {
            Some(g) => g,
            None => return Ok(self.fallback(query, records)),
        };

        let prompt = build_prompt(query, records);
        let text = generator.generate(&prompt)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::Explanation(
                "generation backend returned empty text".into(),
            ));
        }
        if text.chars().count() > self.max_chars {
            return Err(EngineError::Explanation(format!(
                "generated text exceeds the {}-character limit",
                self.max_chars
            )));
        }
        Ok(text.to_string())
    }

    /// Templated listing built directly from the ranked records. Used when
    /// generation fails or no backend is configured; always non-empty.
    pub fn fallback(&self, query: &str, records: &[ScoredAssessment]) -> String {
        if records.is_empty() {
            return "No assessments in the catalog matched this request.".to_string();
        }

        let mut text = format!(
            "For the given requirements (\"{}\"), the closest matches in the catalog are:\n",
            snippet(query, 120)
        );
        for (i, hit) in records.iter().enumerate() {
            let record = &hit.record;
            text.push_str(&format!("{}. {}", i + 1, record.name));
            if !record.test_types.is_empty() {
                text.push_str(&format!(" — {}", record.test_types.join(", ")));
            }
            if record.duration_minutes > 0 {
                text.push_str(&format!(", {} minutes", record.duration_minutes));
            }
            text.push('\n');
        }
        text.push_str(
            "Each was selected for the similarity between its description and the stated requirements.",
        );
        text
    }
}

/// Deterministic prompt structure: same query and records always produce
/// the same prompt, so the backend sees consistent context.
pub fn build_prompt(query: &str, records: &[ScoredAssessment]) -> String {
    let mut prompt = String::from(
        "You are helping a recruiter pick assessments from a fixed catalog.\n\
         Explain in plain prose why each of the following assessments fits the job \
         description. Refer to each assessment by name and tie it to concrete skills \
         or competencies the description implies. Do not invent assessments.\n\n",
    );
    prompt.push_str("Job description:\n");
    prompt.push_str(query.trim());
    prompt.push_str("\n\nRecommended assessments:\n");
    for (i, hit) in records.iter().enumerate() {
        let record = &hit.record;
        prompt.push_str(&format!(
            "{}. {} | test types: {} | duration: {} minutes | remote: {} | adaptive: {}\n   {}\n",
            i + 1,
            record.name,
            if record.test_types.is_empty() {
                "unspecified".to_string()
            } else {
                record.test_types.join(", ")
            },
            record.duration_minutes,
            if record.remote_support { "Yes" } else { "No" },
            if record.adaptive_support { "Yes" } else { "No" },
            snippet(&record.description, DESCRIPTION_SNIPPET_CHARS),
        ));
    }
    prompt.push_str("\nExplanation:");
    prompt
}

/// Character-bounded prefix, safe on multibyte text.
fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
