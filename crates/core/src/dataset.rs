//! Training-dataset parsing, validation, and cleaning.
//!
//! Datasets arrive as CSV with `text` and `label` columns. Validation
//! follows a strict `(valid, error)` contract: the first violated rule
//! produces a specific message and nothing is partially accepted.
//! Cleaning is more forgiving: rows whose label cannot be normalized
//! are dropped, not errored.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::labels;

/// Minimum number of rows a training dataset must have.
pub const MIN_ROWS: usize = 10;
/// Minimum number of examples per class.
pub const MIN_CLASS_EXAMPLES: usize = 5;
/// Maximum length of a single training text.
pub const MAX_TEXT_CHARS: usize = 10_000;
/// Number of rows echoed back in a validation summary.
pub const SAMPLE_ROWS: usize = 3;
/// Seed for the stratified split, so one dataset always splits the same way.
pub const SPLIT_SEED: u64 = 42;

/// One raw CSV row, before label normalization.
#[derive(Debug, Clone, Serialize)]
pub struct RawRow {
    pub text: String,
    pub label: String,
}

/// A parsed (but not yet validated) dataset.
#[derive(Debug, Clone)]
pub struct ParsedDataset {
    /// Header columns in file order.
    pub columns: Vec<String>,
    /// Rows, present only when both required columns exist.
    pub rows: Vec<RawRow>,
}

/// One cleaned training example.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub text: String,
    pub label: u8,
}

/// Summary returned by [`validate`] for a well-formed dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    /// Raw label value -> row count.
    pub label_distribution: BTreeMap<String, usize>,
    /// The first few rows, for caller-side preview.
    pub sample: Vec<RawRow>,
}

/// Parse CSV bytes into a [`ParsedDataset`].
///
/// Structural CSV problems (bad quoting, inconsistent field counts)
/// surface as a validation error; column-level problems are left to
/// [`validate`].
pub fn parse_csv(bytes: &[u8]) -> CoreResult<ParsedDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CoreError::Validation(format!("Error reading CSV file: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let text_idx = columns.iter().position(|c| c == "text");
    let label_idx = columns.iter().position(|c| c == "label");

    let mut rows = Vec::new();
    if let (Some(ti), Some(li)) = (text_idx, label_idx) {
        for record in reader.records() {
            let record =
                record.map_err(|e| CoreError::Validation(format!("Error reading CSV file: {e}")))?;
            rows.push(RawRow {
                text: record.get(ti).unwrap_or_default().to_string(),
                label: record.get(li).unwrap_or_default().to_string(),
            });
        }
    }

    Ok(ParsedDataset { columns, rows })
}

/// Validate a parsed dataset against the training contract.
///
/// Checks, in order: required columns, non-emptiness, minimum size,
/// empty texts, missing labels, unknown label values, class count,
/// per-class minimum, and text length.
pub fn validate(parsed: &ParsedDataset) -> CoreResult<DatasetSummary> {
    let missing: Vec<&str> = ["text", "label"]
        .into_iter()
        .filter(|c| !parsed.columns.iter().any(|col| col == c))
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    if parsed.rows.is_empty() {
        return Err(CoreError::Validation("CSV file is empty".to_string()));
    }
    if parsed.rows.len() < MIN_ROWS {
        return Err(CoreError::Validation(format!(
            "Need at least {MIN_ROWS} rows for training"
        )));
    }

    if parsed.rows.iter().any(|r| r.text.trim().is_empty()) {
        return Err(CoreError::Validation("Found empty text values".to_string()));
    }
    if parsed.rows.iter().any(|r| r.label.trim().is_empty()) {
        return Err(CoreError::Validation(
            "Found missing label values".to_string(),
        ));
    }

    let unknown: BTreeSet<&str> = parsed
        .rows
        .iter()
        .map(|r| r.label.trim())
        .filter(|l| labels::normalize_label(l).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::Validation(format!(
            "Invalid label values. Expected 0/1 or deceptive/truthful, got: {}",
            unknown.into_iter().collect::<Vec<_>>().join(", ")
        )));
    }

    let mut class_counts: BTreeMap<u8, usize> = BTreeMap::new();
    let mut label_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for row in &parsed.rows {
        let raw = row.label.trim().to_string();
        *label_distribution.entry(raw).or_insert(0) += 1;
        if let Some(label) = labels::normalize_label(&row.label) {
            *class_counts.entry(label).or_insert(0) += 1;
        }
    }
    if class_counts.len() < 2 {
        return Err(CoreError::Validation(
            "Need at least 2 different classes for training".to_string(),
        ));
    }
    if let Some(min_count) = class_counts.values().min() {
        if *min_count < MIN_CLASS_EXAMPLES {
            return Err(CoreError::Validation(format!(
                "Each class needs at least {MIN_CLASS_EXAMPLES} examples, minimum found: {min_count}"
            )));
        }
    }

    let max_chars = parsed
        .rows
        .iter()
        .map(|r| r.text.chars().count())
        .max()
        .unwrap_or(0);
    if max_chars > MAX_TEXT_CHARS {
        return Err(CoreError::Validation(format!(
            "Text too long (max {max_chars} chars). Please limit to {MAX_TEXT_CHARS} characters per text."
        )));
    }

    Ok(DatasetSummary {
        rows: parsed.rows.len(),
        columns: parsed.columns.clone(),
        label_distribution,
        sample: parsed.rows.iter().take(SAMPLE_ROWS).cloned().collect(),
    })
}

/// Clean a parsed dataset into training examples.
///
/// Trims texts and normalizes labels; rows with unrecognized labels are
/// dropped silently.
pub fn clean(parsed: &ParsedDataset) -> Vec<Example> {
    parsed
        .rows
        .iter()
        .filter_map(|row| {
            labels::normalize_label(&row.label).map(|label| Example {
                text: row.text.trim().to_string(),
                label,
            })
        })
        .collect()
}

/// Split examples into `(train, validation)` sets, stratified by label.
///
/// Each class contributes `round(class_size * split)` examples to the
/// validation set, chosen by a seeded shuffle so the split is
/// reproducible. A `split` of 0 yields an empty validation set.
pub fn stratified_split(examples: &[Example], split: f64, seed: u64) -> (Vec<Example>, Vec<Example>) {
    if split <= 0.0 {
        return (examples.to_vec(), Vec::new());
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, ex) in examples.iter().enumerate() {
        by_class.entry(ex.label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut val = Vec::new();
    for indices in by_class.into_values() {
        let mut indices = indices;
        indices.shuffle(&mut rng);
        let val_n = (indices.len() as f64 * split).round() as usize;
        for (rank, idx) in indices.into_iter().enumerate() {
            if rank < val_n {
                val.push(examples[idx].clone());
            } else {
                train.push(examples[idx].clone());
            }
        }
    }
    (train, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_csv(rows_per_class: usize) -> Vec<u8> {
        let mut csv = String::from("text,label\n");
        for i in 0..rows_per_class {
            csv.push_str(&format!("an honest statement number {i},truthful\n"));
            csv.push_str(&format!("a misleading statement number {i},deceptive\n"));
        }
        csv.into_bytes()
    }

    #[test]
    fn valid_dataset_summarized() {
        let parsed = parse_csv(&balanced_csv(10)).unwrap();
        let summary = validate(&parsed).unwrap();
        assert_eq!(summary.rows, 20);
        assert_eq!(summary.columns, vec!["text", "label"]);
        assert_eq!(summary.label_distribution["truthful"], 10);
        assert_eq!(summary.label_distribution["deceptive"], 10);
        assert_eq!(summary.sample.len(), SAMPLE_ROWS);
    }

    #[test]
    fn missing_columns_rejected() {
        let parsed = parse_csv(b"body,tag\nhello,1\n").unwrap();
        let err = validate(&parsed).unwrap_err().to_string();
        assert!(err.contains("Missing required columns"));
    }

    #[test]
    fn too_few_rows_rejected() {
        let mut csv = String::from("text,label\n");
        for i in 0..9 {
            csv.push_str(&format!("row {i},{}\n", i % 2));
        }
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert!(validate(&parsed).is_err());
    }

    #[test]
    fn empty_text_rejected() {
        let mut csv = String::from("text,label\n  ,truthful\n");
        for i in 0..10 {
            csv.push_str(&format!("row {i},{}\n", i % 2));
        }
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        let err = validate(&parsed).unwrap_err().to_string();
        assert!(err.contains("empty text"));
    }

    #[test]
    fn unknown_label_values_rejected_by_validation() {
        let mut csv = String::from("text,label\n");
        for i in 0..10 {
            csv.push_str(&format!("row {i},{}\n", i % 2));
        }
        csv.push_str("odd row,unsure\n");
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        let err = validate(&parsed).unwrap_err().to_string();
        assert!(err.contains("Invalid label values"));
    }

    #[test]
    fn single_class_rejected() {
        let mut csv = String::from("text,label\n");
        for i in 0..12 {
            csv.push_str(&format!("row {i},truthful\n"));
        }
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        let err = validate(&parsed).unwrap_err().to_string();
        assert!(err.contains("2 different classes"));
    }

    #[test]
    fn undersized_class_rejected() {
        let mut csv = String::from("text,label\n");
        for i in 0..10 {
            csv.push_str(&format!("row {i},truthful\n"));
        }
        for i in 0..4 {
            csv.push_str(&format!("other {i},deceptive\n"));
        }
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        let err = validate(&parsed).unwrap_err().to_string();
        assert!(err.contains("at least 5 examples"));
    }

    #[test]
    fn clean_drops_unrecognized_labels() {
        let csv = b"text,label\nkeep me,truthful\ndrop me,unknown\nkeep too,0\n";
        let parsed = parse_csv(csv).unwrap();
        let examples = clean(&parsed);
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].label, 1);
        assert_eq!(examples[1].label, 0);
    }

    #[test]
    fn stratified_split_sizes() {
        let parsed = parse_csv(&balanced_csv(10)).unwrap();
        let examples = clean(&parsed);
        let (train, val) = stratified_split(&examples, 0.2, SPLIT_SEED);
        assert_eq!(train.len(), 16);
        assert_eq!(val.len(), 4);
        // Stratification: two examples of each class in the validation set.
        assert_eq!(val.iter().filter(|e| e.label == 1).count(), 2);
        assert_eq!(val.iter().filter(|e| e.label == 0).count(), 2);
    }

    #[test]
    fn zero_split_keeps_everything_in_train() {
        let parsed = parse_csv(&balanced_csv(10)).unwrap();
        let examples = clean(&parsed);
        let (train, val) = stratified_split(&examples, 0.0, SPLIT_SEED);
        assert_eq!(train.len(), 20);
        assert!(val.is_empty());
    }

    #[test]
    fn split_is_deterministic() {
        let parsed = parse_csv(&balanced_csv(10)).unwrap();
        let examples = clean(&parsed);
        let (a_train, a_val) = stratified_split(&examples, 0.2, SPLIT_SEED);
        let (b_train, b_val) = stratified_split(&examples, 0.2, SPLIT_SEED);
        assert_eq!(a_train, b_train);
        assert_eq!(a_val, b_val);
    }
}
