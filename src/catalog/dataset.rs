use serde::Deserialize;

use super::AssessmentRecord;
use crate::error::EngineError;

/// One row of the raw dataset, before normalization. The dataset is lenient
/// about field shapes (delimited strings vs lists, numbers vs numeric
/// strings); everything internal uses the normalized `AssessmentRecord`.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub test_type: TestTypeField,
    #[serde(default)]
    pub duration: Option<DurationField>,
    #[serde(default = "FlagField::default_yes")]
    pub remote_support: FlagField,
    #[serde(default = "FlagField::default_no")]
    pub adaptive_support: FlagField,
}

/// `test_type` arrives either as a comma-delimited string or as a list.
/// Tags that legitimately contain commas must use the list form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestTypeField {
    List(Vec<String>),
    Text(String),
}

impl Default for TestTypeField {
    fn default() -> Self {
        TestTypeField::Text(String::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationField {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlagField {
    Bool(bool),
    Text(String),
}

impl FlagField {
    fn default_yes() -> Self {
        FlagField::Bool(true)
    }

    fn default_no() -> Self {
        FlagField::Bool(false)
    }
}

/// Normalize one raw row. Malformed rows fail the whole load with the row
/// index in the message; nothing is silently dropped.
pub fn normalize(raw: RawRecord, row: usize) -> Result<AssessmentRecord, EngineError> {
    let id = required(&raw.id, "id", row)?;
    let name = required(&raw.name, "name", row)?;
    let url = required(&raw.url, "url", row)?;
    let description = required(&raw.description, "description", row)?;

    Ok(AssessmentRecord {
        id,
        name,
        url,
        description,
        test_types: split_test_types(&raw.test_type),
        duration_minutes: parse_duration(raw.duration.as_ref(), row)?,
        remote_support: parse_flag(&raw.remote_support, "remote_support", row)?,
        adaptive_support: parse_flag(&raw.adaptive_support, "adaptive_support", row)?,
    })
}

fn required(value: &str, field: &str, row: usize) -> Result<String, EngineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::CatalogLoad(format!(
            "record {row}: field `{field}` is empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Split, trim, drop empties, dedupe keeping first occurrence. The comma
/// split applies only to the delimited-string form.
pub fn split_test_types(field: &TestTypeField) -> Vec<String> {
    let raw_tags: Vec<String> = match field {
        TestTypeField::Text(text) => text.split(',').map(str::to_string).collect(),
        TestTypeField::List(items) => items.clone(),
    };

    let mut tags = Vec::new();
    for tag in raw_tags {
        let tag = tag.trim();
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
    }
    tags
}

/// Absent or non-numeric duration coerces to 0; an explicit negative
/// number is a malformed record.
fn parse_duration(field: Option<&DurationField>, row: usize) -> Result<u32, EngineError> {
    let minutes = match field {
        None => 0.0,
        Some(DurationField::Number(n)) => *n,
        Some(DurationField::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                0.0
            } else {
                text.parse::<f64>().unwrap_or(0.0)
            }
        }
    };

    if !minutes.is_finite() {
        return Ok(0);
    }
    if minutes < 0.0 {
        return Err(EngineError::CatalogLoad(format!(
            "record {row}: duration must be non-negative, got {minutes}"
        )));
    }
    Ok(minutes.round() as u32)
}

fn parse_flag(field: &FlagField, name: &str, row: usize) -> Result<bool, EngineError> {
    match field {
        FlagField::Bool(b) => Ok(*b),
        FlagField::Text(text) => match text.trim().to_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            other => Err(EngineError::CatalogLoad(format!(
                "record {row}: field `{name}` must be Yes/No, got `{other}`"
            ))),
        },
    }
}
