//! Catalog DDL statements and parsing of schema query results.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::identifiers::ColumnPair;

/// Everything needed to register a CSV-backed external table.
#[derive(Debug, Clone)]
pub struct TableDefinition<'a> {
    pub database: &'a str,
    pub table: &'a str,
    pub columns: &'a [ColumnPair],
    pub location: &'a str,
    pub delimiter: char,
    pub quote_char: char,
}

pub fn create_database_sql(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {};", database)
}

/// `CREATE EXTERNAL TABLE` over OpenCSVSerde with every column typed `STRING`.
pub fn create_table_sql(definition: &TableDefinition<'_>) -> String {
    let columns_block = definition
        .columns
        .iter()
        .map(|pair| format!("  {} STRING", pair.sanitized))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "CREATE EXTERNAL TABLE IF NOT EXISTS {db}.{table} (\n\
         {columns}\n\
         )\n\
         ROW FORMAT SERDE 'org.apache.hadoop.hive.serde2.OpenCSVSerde'\n\
         WITH SERDEPROPERTIES (\n\
         \x20 'separatorChar' = '{delimiter}',\n\
         \x20 'quoteChar' = '{quote}'\n\
         )\n\
         STORED AS TEXTFILE\n\
         LOCATION '{location}'\n\
         TBLPROPERTIES ('skip.header.line.count'='1');",
        db = definition.database,
        table = definition.table,
        columns = columns_block,
        delimiter = definition.delimiter,
        quote = definition.quote_char,
        location = definition.location,
    )
}

pub fn view_name(table: &str, view_suffix: &str) -> String {
    format!("{}_{}", table, view_suffix)
}

/// View exposing the original header names over the sanitized table.
pub fn create_view_sql(
    database: &str,
    table: &str,
    columns: &[ColumnPair],
    view_suffix: &str,
) -> String {
    let select_block = columns
        .iter()
        .map(|pair| format!("  \"{}\" AS \"{}\"", pair.sanitized, pair.original))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "CREATE OR REPLACE VIEW {db}.{view} AS\nSELECT\n{select}\nFROM {db}.{table};",
        db = database,
        view = view_name(table, view_suffix),
        select = select_block,
        table = table,
    )
}

/// Column `(name, type)` pairs from the rows of a `DESCRIBE` query.
///
/// Rows come either as separate cells or as a single tab-separated cell.
/// Header, blank and `#` comment rows are skipped.
pub fn parse_describe_rows(rows: &[Vec<String>]) -> Vec<(String, String)> {
    rows.iter()
        .filter_map(|row| {
            let cells: Vec<String> = if row.len() >= 2 {
                row.iter().map(|c| c.trim().to_string()).collect()
            } else {
                row.first()?
                    .split('\t')
                    .map(|c| c.trim().to_string())
                    .collect()
            };

            let name = cells.first()?;
            let data_type = cells.get(1)?;
            if name.is_empty() || data_type.is_empty() || name.starts_with('#') || name == "col_name" {
                return None;
            }
            Some((name.clone(), data_type.clone()))
        })
        .collect()
}

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)LOCATION\s+['"]([^'"]+)['"]"#).expect("location pattern is valid")
    })
}

/// The storage location quoted in `SHOW CREATE TABLE` output.
pub fn extract_location(lines: &[String]) -> Option<String> {
    let statement = lines.join("\n");
    location_pattern()
        .captures(&statement)
        .map(|caps| caps[1].to_string())
}

/// Schema statement for the agent's orchestration prompt.
pub fn schema_statement(
    database: &str,
    table: &str,
    columns: &[(String, String)],
    location: Option<&str>,
) -> String {
    let columns_block = columns
        .iter()
        .map(|(name, data_type)| format!("  `{}` {}", name, data_type))
        .collect::<Vec<_>>()
        .join(",\n");

    let mut statement = format!(
        "CREATE EXTERNAL TABLE {}.{} (\n{}\n)",
        database, table, columns_block
    );
    if let Some(location) = location {
        statement.push_str(&format!("\nLOCATION '{}'", location));
    }
    statement
}

/// Full table statement rebuilt offline from a persisted column map.
pub fn schema_from_column_map(
    database: &str,
    table: &str,
    column_map: &BTreeMap<String, String>,
    location: &str,
) -> String {
    let columns_block = column_map
        .keys()
        .map(|name| format!("  `{}` STRING", name))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "CREATE EXTERNAL TABLE {}.{} (\n{}\n)\n\
         ROW FORMAT SERDE 'org.apache.hadoop.hive.serde2.OpenCSVSerde'\n\
         WITH SERDEPROPERTIES (\n\
         \x20 'separatorChar' = ',',\n\
         \x20 'quoteChar' = '\"'\n\
         )\n\
         STORED AS TEXTFILE\n\
         LOCATION '{}'\n\
         TBLPROPERTIES ('skip.header.line.count'='1');",
        database, table, columns_block, location
    )
}

pub fn wrap_athena_schema(statement: &str) -> String {
    format!("<athena_schema>\n{}\n</athena_schema>", statement)
}
