//! Column descriptions in the Glue Data Catalog.

use aws_sdk_glue::types::{Column, StorageDescriptor, Table, TableInput};
use aws_sdk_glue::Client as GlueClient;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::{Error, Result};

/// `{table: {column: description}}`
pub type ColumnDescriptions = BTreeMap<String, BTreeMap<String, String>>;

/// Read a descriptions file.
pub fn load_descriptions(path: &Path) -> Result<ColumnDescriptions> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Set comments on the columns that have a description, matching names
/// case-insensitively. Returns how many columns were updated.
pub fn apply_descriptions(columns: &mut [Column], descriptions: &BTreeMap<String, String>) -> usize {
    let by_lowercase: BTreeMap<String, &String> = descriptions
        .iter()
        .map(|(name, description)| (name.to_lowercase(), description))
        .collect();

    let mut updated = 0;
    for column in columns.iter_mut() {
        if let Some(description) = by_lowercase.get(&column.name.to_lowercase()) {
            info!("  {}: {}", column.name, description);
            column.comment = Some((*description).clone());
            updated += 1;
        }
    }
    updated
}

/// Writable copy of a catalog table carrying a replacement storage descriptor.
/// `UpdateTable` replaces the whole definition, so every writable field is kept.
fn table_input(table: Table, storage_descriptor: StorageDescriptor) -> Result<TableInput> {
    TableInput::builder()
        .name(table.name)
        .set_description(table.description)
        .set_owner(table.owner)
        .set_last_access_time(table.last_access_time)
        .set_last_analyzed_time(table.last_analyzed_time)
        .retention(table.retention)
        .storage_descriptor(storage_descriptor)
        .set_partition_keys(table.partition_keys)
        .set_view_original_text(table.view_original_text)
        .set_view_expanded_text(table.view_expanded_text)
        .set_table_type(table.table_type)
        .set_parameters(table.parameters)
        .set_target_table(table.target_table)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build table input: {}", e)))
}

/// Glue catalog client limited to what the tooling needs.
pub struct GlueCatalog {
    client: GlueClient,
}

impl GlueCatalog {
    pub fn new(client: GlueClient) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(GlueClient::new(config))
    }

    /// Rewrite a table with column comments applied. Returns the number of
    /// columns that received a description.
    pub async fn update_column_descriptions(
        &self,
        database: &str,
        table_name: &str,
        descriptions: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let response = self
            .client
            .get_table()
            .database_name(database)
            .name(table_name)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to fetch table {}.{}: {}", database, table_name, e)))?;

        let mut table = response
            .table
            .ok_or_else(|| Error::Aws(format!("Table {}.{} not found", database, table_name)))?;

        let mut storage_descriptor = table
            .storage_descriptor
            .take()
            .ok_or_else(|| Error::Aws(format!("Table {} has no storage descriptor", table_name)))?;

        let updated = storage_descriptor
            .columns
            .as_deref_mut()
            .map(|columns| apply_descriptions(columns, descriptions))
            .unwrap_or(0);

        let input = table_input(table, storage_descriptor)?;

        self.client
            .update_table()
            .database_name(database)
            .table_input(input)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to update table {}.{}: {}", database, table_name, e)))?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_glue::primitives::DateTime;
    use aws_sdk_glue::types::TableIdentifier;

    fn column(name: &str) -> Column {
        Column::builder().name(name).r#type("string").build().unwrap()
    }

    #[test]
    fn test_apply_descriptions_case_insensitive() {
        let mut columns = vec![column("Cust_ID"), column("balance"), column("vip")];
        let descriptions: BTreeMap<String, String> = [
            ("cust_id", "Unique customer identifier (primary key)"),
            ("BALANCE", "Current account balance in dollars"),
            ("missing", "Not in the table"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(apply_descriptions(&mut columns, &descriptions), 2);
        assert_eq!(
            columns[0].comment.as_deref(),
            Some("Unique customer identifier (primary key)")
        );
        assert_eq!(columns[1].comment.as_deref(), Some("Current account balance in dollars"));
        assert_eq!(columns[2].comment, None);
    }

    #[test]
    fn test_table_input_keeps_writable_fields() {
        let target = TableIdentifier::builder()
            .catalog_id("123456789012")
            .database_name("shared_sales")
            .name("customers")
            .build();
        let accessed = DateTime::from_secs(1_700_000_000);
        let analyzed = DateTime::from_secs(1_700_000_600);

        let table = Table::builder()
            .name("customers")
            .database_name("sales")
            .description("Customer master data")
            .owner("analytics")
            .retention(7)
            .last_access_time(accessed)
            .last_analyzed_time(analyzed)
            .table_type("EXTERNAL_TABLE")
            .partition_keys(column("region"))
            .parameters("classification", "csv")
            .target_table(target.clone())
            .build()
            .unwrap();
        let storage_descriptor = StorageDescriptor::builder()
            .columns(column("cust_id"))
            .location("s3://data/customers/")
            .build();

        let input = table_input(table, storage_descriptor.clone()).unwrap();
        assert_eq!(input.name, "customers");
        assert_eq!(input.description.as_deref(), Some("Customer master data"));
        assert_eq!(input.owner.as_deref(), Some("analytics"));
        assert_eq!(input.retention, 7);
        assert_eq!(input.last_access_time, Some(accessed));
        assert_eq!(input.last_analyzed_time, Some(analyzed));
        assert_eq!(input.table_type.as_deref(), Some("EXTERNAL_TABLE"));
        assert_eq!(input.partition_keys.as_ref().map(Vec::len), Some(1));
        assert_eq!(input.parameters.as_ref().unwrap()["classification"], "csv");
        assert_eq!(input.target_table, Some(target));
        assert_eq!(input.storage_descriptor, Some(storage_descriptor));
    }

    #[test]
    fn test_load_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptions.json");
        std::fs::write(
            &path,
            r#"{"customers": {"cust_id": "Customer key"}, "procedures": {}}"#,
        )
        .unwrap();

        let descriptions = load_descriptions(&path).unwrap();
        assert_eq!(descriptions.len(), 2);
        assert_eq!(descriptions["customers"]["cust_id"], "Customer key");
    }
}
