//! Data catalog tooling: CSV ingestion into S3 and Athena, schema export,
//! Glue column descriptions and metadata drafts.

pub mod athena;
pub mod ddl;
pub mod glue;
pub mod identifiers;
pub mod ingest;
pub mod metadata;
pub mod storage;

pub use athena::{AthenaExecutor, QueryExecutor, QueryRunner, QueryState};
pub use glue::{ColumnDescriptions, GlueCatalog};
pub use identifiers::{sanitize_identifier, unique_identifiers, ColumnPair};
pub use ingest::{BatchOptions, BatchReport, IngestOptions, IngestionSummary, Ingestor};
pub use storage::{ObjectLayout, ObjectStore, S3Store};
