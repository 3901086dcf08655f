pub mod dataset;

use std::collections::HashMap;
use std::path::Path;

use crate::error::EngineError;

/// One catalog entry, fully normalized. `test_types` is always a list
/// internally; the Yes/No string form exists only at the wire boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub test_types: Vec<String>,
    pub duration_minutes: u32,
    pub remote_support: bool,
    pub adaptive_support: bool,
}

/// The fixed set of assessment records, in dataset order. Insertion order
/// is the retrieval tie-break order, so it must be stable across loads.
#[derive(Debug)]
pub struct Catalog {
    records: Vec<AssessmentRecord>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Parse and normalize the dataset file. Any malformed row, duplicate
    /// id, or an empty dataset fails the load.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::CatalogLoad(format!("reading {}: {e}", path.display()))
        })?;
        let rows: Vec<dataset::RawRecord> = serde_json::from_str(&contents).map_err(|e| {
            EngineError::CatalogLoad(format!("parsing {}: {e}", path.display()))
        })?;
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<dataset::RawRecord>) -> Result<Self, EngineError> {
        if rows.is_empty() {
            return Err(EngineError::CatalogLoad("catalog is empty".into()));
        }

        let mut records = Vec::with_capacity(rows.len());
        let mut by_id = HashMap::with_capacity(rows.len());
        for (row, raw) in rows.into_iter().enumerate() {
            let record = dataset::normalize(raw, row)?;
            if by_id.contains_key(&record.id) {
                return Err(EngineError::CatalogLoad(format!(
                    "record {row}: duplicate id `{}`",
                    record.id
                )));
            }
            by_id.insert(record.id.clone(), records.len());
            records.push(record);
        }

        Ok(Self { records, by_id })
    }

    pub fn get(&self, id: &str) -> Option<&AssessmentRecord> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    /// All records in dataset order.
    pub fn records(&self) -> &[AssessmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tag frequency across the catalog, most common first, name as the
    /// tie-break so the output is stable.
    pub fn test_type_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            for tag in &record.test_types {
                *counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(tag, n)| (tag.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}
