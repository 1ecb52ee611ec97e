//! The `Database` facade: the entry point hosts and tests use.

use opal_sql::{Parser, Statement};
use tracing::debug;

use crate::catalog::{Catalog, Table};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::Executor;
use crate::result::QueryResult;

/// A diagnostic sink: called with every error a statement surfaces,
/// before the error is returned to the caller.
type DiagnosticSink = Box<dyn FnMut(&crate::error::EngineError) + Send>;

/// One in-memory database: a catalog plus its configuration.
///
/// ```rust
/// use opal_engine::Database;
///
/// let mut db = Database::new();
/// db.execute("CREATE TABLE users (id INT, name STRING)").unwrap();
/// db.execute("INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob')").unwrap();
/// let result = db.query("SELECT name FROM users WHERE id = 2").unwrap();
/// assert_eq!(result.row_count(), 1);
/// ```
#[derive(Default)]
pub struct Database {
    catalog: Catalog,
    config: EngineConfig,
    sink: Option<DiagnosticSink>,
}

impl Database {
    /// Creates an empty database with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            catalog: Catalog::new(),
            config,
            sink: None,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only access to the catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Finds a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.catalog.table(name)
    }

    /// Clears every table, index, and stats entry, re-initializing the
    /// catalog to its startup state.
    pub fn reset(&mut self) {
        self.catalog.reset();
    }

    /// Installs a sink that observes every surfaced error.
    pub fn set_diagnostic_sink(
        &mut self,
        sink: impl FnMut(&crate::error::EngineError) + Send + 'static,
    ) {
        self.sink = Some(Box::new(sink));
    }

    /// Executes one statement for its side effects.
    ///
    /// Returns the number of affected rows (0 for DDL, the result's
    /// row count for SELECT).
    ///
    /// # Errors
    ///
    /// Parse and engine errors; recoverable ones leave the catalog
    /// usable.
    pub fn execute(&mut self, sql: &str) -> Result<usize> {
        self.run(sql).map(|outcome| outcome.affected())
    }

    /// Executes one statement and returns its result table (empty for
    /// DDL and DML).
    ///
    /// # Errors
    ///
    /// Parse and engine errors; recoverable ones leave the catalog
    /// usable.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.run(sql).map(crate::executor::ExecOutcome::into_result)
    }

    /// Executes a semicolon-separated script, stopping at the first
    /// error.
    ///
    /// # Errors
    ///
    /// The first parse or engine error; statements before it have
    /// taken effect.
    pub fn run_script(&mut self, sql: &str) -> Result<()> {
        let statements = self
            .report(Parser::new(sql).parse_statements().map_err(Into::into))?;
        for statement in &statements {
            let outcome = {
                let mut executor = Executor::new(&mut self.catalog, &self.config);
                executor.execute(statement)
            };
            self.report(outcome)?;
        }
        Ok(())
    }

    fn run(&mut self, sql: &str) -> Result<crate::executor::ExecOutcome> {
        let statement: Result<Statement> =
            Parser::new(sql).parse_statement().map_err(Into::into);
        let statement = self.report(statement)?;
        debug!(kind = statement.kind_name(), "dispatching");
        let outcome = {
            let mut executor = Executor::new(&mut self.catalog, &self.config);
            executor.execute(&statement)
        };
        self.report(outcome)
    }

    /// Feeds errors through the diagnostic sink on their way out.
    fn report<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let (Err(error), Some(sink)) = (&outcome, self.sink.as_mut()) {
            sink(error);
        }
        outcome
    }
}
