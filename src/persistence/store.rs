//! SQLite-based persistence store

use crate::core::{ExecutionStatus, FailedAt};
use crate::persistence::{PersistenceBackend, RunSummary, StepSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS runs (
        id TEXT PRIMARY KEY,
        workflow_name TEXT NOT NULL,
        event TEXT NOT NULL,
        branch TEXT NOT NULL,
        revision TEXT NOT NULL,
        status TEXT NOT NULL,
        failed_step TEXT,
        started_at TEXT NOT NULL,
        completed_at TEXT,
        completed_steps INTEGER NOT NULL DEFAULT 0,
        total_steps INTEGER NOT NULL DEFAULT 0,
        steps TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_workflow_name ON runs(workflow_name)",
    "CREATE INDEX IF NOT EXISTS idx_started_at ON runs(started_at)",
];

const COLUMNS: &str = "id, workflow_name, event, branch, revision, status, failed_step, \
                       started_at, completed_at, completed_steps, total_steps, steps";

/// SQLite run history
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Failed to open history database: {}", db_path.display()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Open the store at the default path
    pub async fn with_default_path() -> Result<Self> {
        let db_path = Self::default_path();
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Self::open(&db_path).await
    }

    /// `<local data dir>/ci-pipeline/runs.db`
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ci-pipeline")
            .join("runs.db")
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize history database")?;
        }
        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn parse_status(status: &str) -> ExecutionStatus {
        match status {
            "Running" => ExecutionStatus::Running,
            "Succeeded" => ExecutionStatus::Succeeded,
            "Failed" => ExecutionStatus::Failed,
            "Skipped" => ExecutionStatus::Skipped,
            "Cancelled" => ExecutionStatus::Cancelled,
            _ => ExecutionStatus::Pending,
        }
    }

    fn from_row(row: &SqliteRow) -> Result<RunSummary> {
        let failed_step: Option<String> = row.try_get("failed_step")?;
        let failed_step = failed_step
            .map(|json| serde_json::from_str::<FailedAt>(&json))
            .transpose()
            .context("Corrupt failed_step column")?;
        let steps: String = row.try_get("steps")?;
        let steps: Vec<StepSummary> =
            serde_json::from_str(&steps).context("Corrupt steps column")?;

        Ok(RunSummary {
            run_id: Uuid::parse_str(&row.try_get::<String, _>("id")?)?,
            workflow_name: row.try_get("workflow_name")?,
            event: row.try_get("event")?,
            branch: row.try_get("branch")?,
            revision: row.try_get("revision")?,
            status: Self::parse_status(&row.try_get::<String, _>("status")?),
            failed_step,
            started_at: Self::from_naive(row.try_get("started_at")?),
            completed_at: row
                .try_get::<Option<NaiveDateTime>, _>("completed_at")?
                .map(Self::from_naive),
            completed_steps: row.try_get::<i64, _>("completed_steps")? as usize,
            total_steps: row.try_get::<i64, _>("total_steps")? as usize,
            steps,
        })
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let failed_step = run
            .failed_step
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, workflow_name, event, branch, revision, status, failed_step,
             started_at, completed_at, completed_steps, total_steps, steps)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(run.run_id.to_string())
        .bind(&run.workflow_name)
        .bind(&run.event)
        .bind(&run.branch)
        .bind(&run.revision)
        .bind(format!("{:?}", run.status))
        .bind(failed_step)
        .bind(Self::to_naive(run.started_at))
        .bind(run.completed_at.map(Self::to_naive))
        .bind(run.completed_steps as i64)
        .bind(run.total_steps as i64)
        .bind(serde_json::to_string(&run.steps)?)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let row = sqlx::query(&format!("SELECT {} FROM runs WHERE id = ?1", COLUMNS))
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load run")?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_runs(
        &self,
        workflow_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM runs WHERE ?1 IS NULL OR workflow_name = ?1 \
             ORDER BY started_at DESC LIMIT ?2",
            COLUMNS
        ))
        .bind(workflow_name)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT workflow_name FROM runs ORDER BY workflow_name ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list workflows")?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("workflow_name").map_err(anyhow::Error::from))
            .collect()
    }

    async fn count_runs(&self, workflow_name: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM runs WHERE workflow_name = ?1")
            .bind(workflow_name)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count runs")?;

        Ok(count as usize)
    }
}
