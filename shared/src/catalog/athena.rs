//! Athena query execution with a fixed-interval status poll.

use async_trait::async_trait;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client as AthenaClient;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::ddl::{extract_location, parse_describe_rows, schema_statement};
use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Lifecycle state of a query execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    /// Failed, with the state change reason
    Failed(String),
    /// Cancelled, with the state change reason
    Cancelled(String),
}

/// Low-level operations of an asynchronous query service.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Submit a query and return its execution ID.
    async fn start(&self, query: &str, database: Option<&str>, output_location: &str) -> Result<String>;

    async fn state(&self, execution_id: &str) -> Result<QueryState>;

    /// Result rows of a finished execution, one string per cell.
    async fn rows(&self, execution_id: &str) -> Result<Vec<Vec<String>>>;
}

/// [`QueryExecutor`] backed by Amazon Athena.
pub struct AthenaExecutor {
    client: AthenaClient,
}

impl AthenaExecutor {
    pub fn new(client: AthenaClient) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(AthenaClient::new(config))
    }
}

#[async_trait]
impl QueryExecutor for AthenaExecutor {
    async fn start(&self, query: &str, database: Option<&str>, output_location: &str) -> Result<String> {
        let response = self
            .client
            .start_query_execution()
            .query_string(query)
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(output_location)
                    .build(),
            )
            .set_query_execution_context(
                database.map(|db| QueryExecutionContext::builder().database(db).build()),
            )
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to start Athena query: {}", e)))?;

        response
            .query_execution_id()
            .map(String::from)
            .ok_or_else(|| Error::Aws("Athena returned no query execution ID".to_string()))
    }

    async fn state(&self, execution_id: &str) -> Result<QueryState> {
        let response = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to fetch Athena query status: {}", e)))?;

        let status = response.query_execution().and_then(|q| q.status());
        let reason = status
            .and_then(|s| s.state_change_reason())
            .unwrap_or_default()
            .to_string();

        Ok(match status.and_then(|s| s.state()) {
            Some(QueryExecutionState::Succeeded) => QueryState::Succeeded,
            Some(QueryExecutionState::Failed) => QueryState::Failed(reason),
            Some(QueryExecutionState::Cancelled) => QueryState::Cancelled(reason),
            Some(QueryExecutionState::Running) => QueryState::Running,
            _ => QueryState::Queued,
        })
    }

    async fn rows(&self, execution_id: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get_query_results()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to fetch Athena query results: {}", e)))?;

        Ok(response
            .result_set()
            .map(|set| {
                set.rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().unwrap_or_default().to_string())
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Runs queries to completion against a fixed result location.
pub struct QueryRunner<E> {
    executor: E,
    output_location: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl<E: QueryExecutor> QueryRunner<E> {
    pub fn new(executor: E, output_location: impl Into<String>) -> Self {
        Self {
            executor,
            output_location: output_location.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output_location(&self) -> &str {
        &self.output_location
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Submit a query and wait for it to succeed. Returns the execution ID.
    pub async fn run(&self, query: &str, database: Option<&str>) -> Result<String> {
        debug!("Submitting query: {}", query);
        let execution_id = self
            .executor
            .start(query, database, &self.output_location)
            .await?;
        info!("Query execution ID: {}", execution_id);

        self.wait(&execution_id).await?;
        Ok(execution_id)
    }

    /// Poll until the execution reaches a terminal state or the timeout elapses.
    pub async fn wait(&self, execution_id: &str) -> Result<()> {
        let started = Instant::now();

        loop {
            match self.executor.state(execution_id).await? {
                QueryState::Succeeded => return Ok(()),
                QueryState::Failed(reason) => {
                    return Err(Error::QueryFailed(format!(
                        "Athena query ended with state FAILED: {}",
                        reason
                    )))
                }
                QueryState::Cancelled(reason) => {
                    return Err(Error::QueryFailed(format!(
                        "Athena query ended with state CANCELLED: {}",
                        reason
                    )))
                }
                QueryState::Queued | QueryState::Running => {}
            }

            if started.elapsed() > self.timeout {
                return Err(Error::Timeout(format!(
                    "Athena query {} did not finish within {} seconds",
                    execution_id,
                    self.timeout.as_secs_f64()
                )));
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Run a query and return its result rows.
    pub async fn fetch_rows(&self, query: &str, database: Option<&str>) -> Result<Vec<Vec<String>>> {
        let execution_id = self.run(query, database).await?;
        self.executor.rows(&execution_id).await
    }

    /// `CREATE EXTERNAL TABLE` statement rebuilt from `DESCRIBE` output.
    ///
    /// The location comes from `SHOW CREATE TABLE` when that query succeeds
    /// and is left out otherwise.
    pub async fn table_schema(&self, database: &str, table: &str) -> Result<String> {
        let describe_rows = self
            .fetch_rows(&format!("DESCRIBE {}.{}", database, table), Some(database))
            .await?;
        let columns = parse_describe_rows(&describe_rows);

        let location = match self
            .fetch_rows(&format!("SHOW CREATE TABLE {}.{}", database, table), Some(database))
            .await
        {
            Ok(rows) => {
                let lines: Vec<String> = rows.into_iter().filter_map(|row| row.into_iter().next()).collect();
                extract_location(&lines)
            }
            Err(e) => {
                warn!("Could not read location of {}.{}: {}", database, table, e);
                None
            }
        };

        Ok(schema_statement(database, table, &columns, location.as_deref()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted executor recording every submitted statement.
    #[derive(Default)]
    pub struct FakeExecutor {
        pub statements: Mutex<Vec<(String, Option<String>, String)>>,
        pub states: Mutex<VecDeque<QueryState>>,
        pub result_rows: Vec<Vec<String>>,
        pub fail_on: Option<String>,
    }

    impl FakeExecutor {
        pub fn with_states(states: Vec<QueryState>) -> Self {
            Self {
                states: Mutex::new(states.into()),
                ..Default::default()
            }
        }

        pub fn statements(&self) -> Vec<String> {
            self.statements
                .lock()
                .unwrap()
                .iter()
                .map(|(query, _, _)| query.clone())
                .collect()
        }
    }

    #[async_trait]
    impl QueryExecutor for FakeExecutor {
        async fn start(&self, query: &str, database: Option<&str>, output_location: &str) -> Result<String> {
            if let Some(marker) = &self.fail_on {
                if query.contains(marker.as_str()) {
                    return Err(Error::Aws("Failed to start Athena query: denied".to_string()));
                }
            }
            let mut statements = self.statements.lock().unwrap();
            statements.push((
                query.to_string(),
                database.map(String::from),
                output_location.to_string(),
            ));
            Ok(format!("exec-{}", statements.len()))
        }

        async fn state(&self, _execution_id: &str) -> Result<QueryState> {
            Ok(self
                .states
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(QueryState::Succeeded))
        }

        async fn rows(&self, _execution_id: &str) -> Result<Vec<Vec<String>>> {
            Ok(self.result_rows.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeExecutor;
    use super::*;

    fn runner(executor: FakeExecutor) -> QueryRunner<FakeExecutor> {
        QueryRunner::new(executor, "s3://results/").with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_polls_until_success() {
        let runner = runner(FakeExecutor::with_states(vec![
            QueryState::Queued,
            QueryState::Running,
            QueryState::Succeeded,
        ]));

        let execution_id = runner.run("SELECT 1", Some("db")).await.unwrap();
        assert_eq!(execution_id, "exec-1");
        assert!(runner.executor.states.lock().unwrap().is_empty());

        let statements = runner.executor.statements.lock().unwrap();
        assert_eq!(
            statements[0],
            ("SELECT 1".to_string(), Some("db".to_string()), "s3://results/".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_state_carries_reason() {
        let runner = runner(FakeExecutor::with_states(vec![QueryState::Failed(
            "Table not found".to_string(),
        )]));

        let err = runner.run("SELECT 1", None).await.unwrap_err();
        assert!(matches!(err, Error::QueryFailed(_)));
        assert!(err.to_string().contains("FAILED: Table not found"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let states = std::iter::repeat(QueryState::Running).take(10_000).collect();
        let runner = runner(FakeExecutor::with_states(states)).with_timeout(Duration::from_millis(5));

        let err = runner.run("SELECT 1", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_rows() {
        let executor = FakeExecutor {
            result_rows: vec![vec!["cust_id\tstring".to_string()]],
            ..Default::default()
        };
        let rows = runner(executor).fetch_rows("DESCRIBE db.t", Some("db")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_table_schema_with_location() {
        let executor = FakeExecutor {
            result_rows: vec![
                vec!["cust_id\tstring".to_string()],
                vec!["LOCATION 's3://data/customers/'".to_string()],
            ],
            ..Default::default()
        };
        let runner = runner(executor);

        let schema = runner.table_schema("sales", "customers").await.unwrap();
        assert_eq!(
            schema,
            "CREATE EXTERNAL TABLE sales.customers (\n  `cust_id` string\n)\nLOCATION 's3://data/customers/'"
        );
        assert_eq!(
            runner.executor.statements(),
            vec!["DESCRIBE sales.customers", "SHOW CREATE TABLE sales.customers"]
        );
    }

    #[tokio::test]
    async fn test_table_schema_without_show_create() {
        let executor = FakeExecutor {
            result_rows: vec![vec!["cust_id\tstring".to_string()]],
            fail_on: Some("SHOW CREATE".to_string()),
            ..Default::default()
        };

        let schema = runner(executor).table_schema("sales", "customers_view").await.unwrap();
        assert_eq!(schema, "CREATE EXTERNAL TABLE sales.customers_view (\n  `cust_id` string\n)");
    }

    #[tokio::test]
    async fn test_table_schema_describe_failure() {
        let executor = FakeExecutor {
            fail_on: Some("DESCRIBE".to_string()),
            ..Default::default()
        };

        let err = runner(executor).table_schema("sales", "missing").await.unwrap_err();
        assert!(matches!(err, Error::Aws(_)));
    }
}
