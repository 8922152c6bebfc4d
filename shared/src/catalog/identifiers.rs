//! Athena-safe identifiers derived from CSV headers and file names.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::{Error, Result};

/// A sanitized column name and the header it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    pub sanitized: String,
    pub original: String,
}

/// Return a lowercase identifier safe for Athena table/column names.
///
/// Runs of characters outside `[0-9A-Za-z_]` become a single `_`, surrounding
/// underscores are dropped, an empty result becomes `col` and a leading digit
/// gets a `col_` prefix.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' };
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        return "col".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("col_{}", trimmed);
    }
    trimmed.to_string()
}

/// Sanitize headers in order, suffixing collisions with `_2`, `_3`, ...
pub fn unique_identifiers<I, S>(headers: I) -> Vec<ColumnPair>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut pairs = Vec::new();

    for original in headers {
        let original = original.as_ref();
        let base = sanitize_identifier(original);

        let (candidate, counter) = match used.get(&base).copied() {
            Some(mut counter) if counter > 0 => loop {
                counter += 1;
                let candidate = format!("{}_{}", base, counter);
                if !used.contains_key(&candidate) {
                    break (candidate, counter);
                }
            },
            _ => (base.clone(), 1),
        };

        used.insert(base, counter);
        used.insert(candidate.clone(), 1);
        pairs.push(ColumnPair {
            sanitized: candidate,
            original: original.to_string(),
        });
    }

    pairs
}

/// Convert a delimiter/quote setting into the single byte the CSV reader expects.
pub fn ascii_byte(c: char, what: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::Config(format!("{} must be a single ASCII character, got {:?}", what, c)))
}

/// Read the header record of a CSV file.
pub fn read_csv_header(path: &Path, delimiter: char) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(ascii_byte(delimiter, "delimiter")?)
        .from_reader(file);

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(Error::Validation(format!("CSV file {} is empty", path.display())));
    }

    Ok(record
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if idx == 0 {
                field.trim_start_matches('\u{feff}').to_string()
            } else {
                field.to_string()
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sanitized(pairs: &[ColumnPair]) -> Vec<&str> {
        pairs.iter().map(|p| p.sanitized.as_str()).collect()
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Customer ID"), "customer_id");
        assert_eq!(sanitize_identifier("  Past--Due ($) "), "past_due");
        assert_eq!(sanitize_identifier("2024Sales"), "col_2024sales");
        assert_eq!(sanitize_identifier("***"), "col");
        assert_eq!(sanitize_identifier("UTI (2.1)"), "uti_2_1");
        assert_eq!(sanitize_identifier("Größe"), "gr_e");
    }

    #[test]
    fn test_unique_identifiers() {
        let pairs = unique_identifiers(["Customer ID", "Customer ID", "2024Sales"]);
        assert_eq!(sanitized(&pairs), vec!["customer_id", "customer_id_2", "col_2024sales"]);
        assert_eq!(pairs[1].original, "Customer ID");
    }

    #[test]
    fn test_unique_identifiers_skip_taken_suffix() {
        let pairs = unique_identifiers(["a_2", "a", "a", "a"]);
        assert_eq!(sanitized(&pairs), vec!["a_2", "a", "a_3", "a_4"]);
    }

    #[test]
    fn test_read_csv_header_strips_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}Customer ID;Balance\n1;20\n").unwrap();

        let header = read_csv_header(file.path(), ';').unwrap();
        assert_eq!(header, vec!["Customer ID", "Balance"]);
    }

    #[test]
    fn test_read_csv_header_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = read_csv_header(file.path(), ',').unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_ascii_byte_rejects_multibyte() {
        assert_eq!(ascii_byte('|', "delimiter").unwrap(), b'|');
        assert!(ascii_byte('§', "delimiter").is_err());
    }
}
