//! Table metadata drafts generated from a sample of CSV rows.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use crate::Result;

pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Coarse type guessed from sample values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedType {
    Numeric,
    Date,
    Boolean,
    String,
}

impl fmt::Display for DetectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectedType::Numeric => "numeric",
            DetectedType::Date => "date",
            DetectedType::Boolean => "boolean",
            DetectedType::String => "string",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    /// Up to five distinct values, in first-seen order
    pub sample_values: Vec<String>,
    pub non_null_count: usize,
    pub non_null_pct: f64,
    pub unique_count: usize,
    pub detected_type: DetectedType,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableAnalysis {
    pub headers: Vec<String>,
    /// Rows actually sampled
    pub total_rows: usize,
    pub columns: Vec<(String, ColumnProfile)>,
}

/// Profile the first `sample_size` data rows of a CSV file.
pub fn analyze_csv(path: &Path, sample_size: usize) -> Result<TableAnalysis> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(File::open(path)?);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if idx == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records().take(sample_size) {
        rows.push(record?);
    }
    let total_rows = rows.len();

    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let values: Vec<String> = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
            (header.clone(), profile_column(&values, total_rows))
        })
        .collect();

    Ok(TableAnalysis {
        headers,
        total_rows,
        columns,
    })
}

fn profile_column(values: &[String], total_rows: usize) -> ColumnProfile {
    let non_null_count = values.iter().filter(|v| !v.trim().is_empty()).count();

    let mut seen = HashSet::new();
    let distinct: Vec<&String> = values.iter().filter(|v| seen.insert(v.as_str())).collect();

    let non_null_pct = if total_rows > 0 {
        (non_null_count as f64 / total_rows as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    ColumnProfile {
        sample_values: distinct.iter().take(5).map(|v| v.to_string()).collect(),
        non_null_count,
        non_null_pct,
        unique_count: distinct.len(),
        detected_type: detect_type(values),
    }
}

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"^\d{4}-\d{2}-\d{2}", r"^\d{2}/\d{2}/\d{4}", r"^\d{4}/\d{2}/\d{2}"]
            .into_iter()
            .map(|p| Regex::new(p).expect("date pattern is valid"))
            .collect()
    })
}

/// Guess a column type: numeric from the first 20 values, date from the
/// first value, boolean from the first 10 values.
pub fn detect_type(values: &[String]) -> DetectedType {
    if values.is_empty() {
        return DetectedType::String;
    }

    let numeric = values
        .iter()
        .take(20)
        .filter(|v| !v.is_empty())
        .all(|v| v.trim().parse::<f64>().is_ok());
    if numeric {
        return DetectedType::Numeric;
    }

    if date_patterns().iter().any(|p| p.is_match(&values[0])) {
        return DetectedType::Date;
    }

    const BOOLEAN_VALUES: [&str; 8] = ["true", "false", "yes", "no", "y", "n", "0", "1"];
    let boolean = values
        .iter()
        .take(10)
        .filter(|v| !v.is_empty())
        .all(|v| BOOLEAN_VALUES.contains(&v.to_lowercase().as_str()));
    if boolean {
        return DetectedType::Boolean;
    }

    DetectedType::String
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_alpha = false;
    for c in name.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

/// Draft description from the column name and its profile.
pub fn generate_description(column_name: &str, profile: &ColumnProfile) -> String {
    let mut parts = vec![title_case(column_name)];

    match profile.detected_type {
        DetectedType::Date => parts.push("(date field)".to_string()),
        DetectedType::Numeric => parts.push("(numeric value)".to_string()),
        DetectedType::Boolean => parts.push("(yes/no flag)".to_string()),
        DetectedType::String => {}
    }

    if profile.non_null_count > 0 && profile.unique_count == profile.non_null_count {
        parts.push("- likely unique identifier".to_string());
    }

    if profile.unique_count < 20 && !profile.sample_values.is_empty() {
        let samples: Vec<&str> = profile.sample_values.iter().take(3).map(String::as_str).collect();
        parts.push(format!("(e.g., {})", samples.join(", ")));
    }

    parts.join(" ")
}

/// Metadata document with placeholder table description and queries.
pub fn metadata_json(analysis: &TableAnalysis, table_name: Option<&str>) -> Value {
    let columns: Map<String, Value> = analysis
        .columns
        .iter()
        .map(|(name, profile)| (name.to_lowercase(), Value::String(generate_description(name, profile))))
        .collect();

    let mut document = Map::new();
    if let Some(table_name) = table_name {
        document.insert("table_name".to_string(), Value::from(table_name));
    }
    document.insert(
        "table_description".to_string(),
        Value::String(format!(
            "Data table with {} columns and approximately {} rows (update this description)",
            analysis.headers.len(),
            analysis.total_rows
        )),
    );
    document.insert(
        "common_queries".to_string(),
        Value::from(vec![
            "common search term 1",
            "common search term 2",
            "common search term 3",
        ]),
    );
    document.insert("columns".to_string(), Value::Object(columns));
    Value::Object(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_detect_type() {
        assert_eq!(detect_type(&strings(&["1", "2.5", "-3"])), DetectedType::Numeric);
        assert_eq!(detect_type(&strings(&["2024-01-31", "n/a"])), DetectedType::Date);
        assert_eq!(detect_type(&strings(&["31/01/2024"])), DetectedType::Date);
        assert_eq!(detect_type(&strings(&["Yes", "no", "Y"])), DetectedType::Boolean);
        assert_eq!(detect_type(&strings(&["Ana", "Bob"])), DetectedType::String);
        assert_eq!(detect_type(&[]), DetectedType::String);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("past_due_AMOUNT"), "Past Due Amount");
        assert_eq!(title_case("uti_2_1"), "Uti 2 1");
    }

    #[test]
    fn test_analyze_and_describe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.csv");
        std::fs::write(
            &path,
            "cust_id,vip,balance\n1,yes,10\n2,no,\n3,yes,30\n4,no,40\n",
        )
        .unwrap();

        let analysis = analyze_csv(&path, DEFAULT_SAMPLE_SIZE).unwrap();
        assert_eq!(analysis.total_rows, 4);

        let (_, cust_id) = &analysis.columns[0];
        assert_eq!(cust_id.unique_count, 4);
        assert_eq!(cust_id.non_null_pct, 100.0);
        assert_eq!(
            generate_description("cust_id", cust_id),
            "Cust Id (numeric value) - likely unique identifier (e.g., 1, 2, 3)"
        );

        let (_, vip) = &analysis.columns[1];
        assert_eq!(vip.sample_values, vec!["yes", "no"]);
        assert_eq!(generate_description("vip", vip), "Vip (yes/no flag) (e.g., yes, no)");

        let (_, balance) = &analysis.columns[2];
        assert_eq!(balance.non_null_pct, 75.0);
    }

    #[test]
    fn test_sample_size_limits_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        let mut contents = String::from("Name\n");
        for i in 0..10 {
            contents.push_str(&format!("row{}\n", i));
        }
        std::fs::write(&path, contents).unwrap();

        let analysis = analyze_csv(&path, 3).unwrap();
        assert_eq!(analysis.total_rows, 3);

        let metadata = metadata_json(&analysis, Some("big"));
        assert_eq!(metadata["table_name"], "big");
        assert_eq!(
            metadata["table_description"],
            "Data table with 1 columns and approximately 3 rows (update this description)"
        );
        assert_eq!(metadata["common_queries"].as_array().unwrap().len(), 3);
        assert!(metadata["columns"]["name"]
            .as_str()
            .unwrap()
            .starts_with("Name - likely unique identifier"));
    }
}
