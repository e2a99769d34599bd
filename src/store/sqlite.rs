// SQLite store - durable ScanStore implementation on sqlx
//
// Completed-run selection deliberately funnels through the resolver in Rust
// instead of re-expressing the latest-per-cluster rule in SQL, so there is a
// single implementation of the aggregation contract.

use crate::classifier::CertStatus;
use crate::error::ScanError;
use crate::store::models::{
    CertificateFilter, CertificateRecord, ObjectKind, ScanRun, ScanState, ScanStatistics,
    ScanSummary,
};
use crate::store::{resolver, ScanStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scan_runs (
    id                  TEXT PRIMARY KEY,
    cluster_id          TEXT NOT NULL,
    cluster_name        TEXT NOT NULL,
    state               TEXT NOT NULL,
    started_at          TEXT NOT NULL,
    completed_at        TEXT,
    certificates_found  INTEGER NOT NULL DEFAULT 0,
    valid_count         INTEGER NOT NULL DEFAULT 0,
    warning_count       INTEGER NOT NULL DEFAULT 0,
    expired_count       INTEGER NOT NULL DEFAULT 0,
    namespaces          TEXT NOT NULL DEFAULT '[]',
    error               TEXT
);

CREATE INDEX IF NOT EXISTS idx_scan_runs_cluster_state ON scan_runs (cluster_id, state);

CREATE TABLE IF NOT EXISTS certificates (
    id                  TEXT PRIMARY KEY,
    scan_id             TEXT NOT NULL,
    cluster_id          TEXT NOT NULL,
    cluster_name        TEXT NOT NULL,
    namespace           TEXT NOT NULL,
    object_name         TEXT NOT NULL,
    object_kind         TEXT NOT NULL,
    certificate_key     TEXT NOT NULL,
    status              TEXT NOT NULL,
    not_valid_before    TEXT NOT NULL,
    not_valid_after     TEXT NOT NULL,
    days_remaining      INTEGER NOT NULL,
    issuer              TEXT NOT NULL,
    subject             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_certificates_scan ON certificates (scan_id);
CREATE INDEX IF NOT EXISTS idx_certificates_status ON certificates (status);
"#;

/// `ScanStore` backed by SQLite via sqlx
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database and create the schema if missing.
    /// URL form: `sqlite://certwatch.db?mode=rwc`
    pub async fn connect(url: &str) -> Result<Self, ScanError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| ScanError::Persistence(format!("failed to open database: {e}")))?;

        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| ScanError::Persistence(format!("failed to create schema: {e}")))?;
        }

        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn persistence(context: &str, e: sqlx::Error) -> ScanError {
    ScanError::Persistence(format!("{context}: {e}"))
}

fn parse_uuid(s: &str) -> Result<Uuid, ScanError> {
    Uuid::parse_str(s).map_err(|e| ScanError::Persistence(format!("malformed uuid {s}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, ScanError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ScanError::Persistence(format!("malformed timestamp {s}: {e}")))
}

fn run_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScanRun, ScanError> {
    let state: String = row.get("state");
    let namespaces: String = row.get("namespaces");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(ScanRun {
        id: parse_uuid(row.get("id"))?,
        cluster_id: parse_uuid(row.get("cluster_id"))?,
        cluster_name: row.get("cluster_name"),
        state: state
            .parse::<ScanState>()
            .map_err(ScanError::Persistence)?,
        started_at: parse_datetime(row.get("started_at"))?,
        completed_at: completed_at.as_deref().map(parse_datetime).transpose()?,
        certificates_found: row.get::<i64, _>("certificates_found") as u64,
        summary: ScanSummary {
            valid: row.get::<i64, _>("valid_count") as u64,
            warning: row.get::<i64, _>("warning_count") as u64,
            expired: row.get::<i64, _>("expired_count") as u64,
        },
        namespaces: serde_json::from_str(&namespaces)
            .map_err(|e| ScanError::Persistence(format!("malformed namespace list: {e}")))?,
        error: row.get("error"),
    })
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<CertificateRecord, ScanError> {
    let kind: String = row.get("object_kind");
    let status: String = row.get("status");

    Ok(CertificateRecord {
        id: parse_uuid(row.get("id"))?,
        scan_id: parse_uuid(row.get("scan_id"))?,
        cluster_id: parse_uuid(row.get("cluster_id"))?,
        cluster_name: row.get("cluster_name"),
        namespace: row.get("namespace"),
        object_name: row.get("object_name"),
        object_kind: kind
            .parse::<ObjectKind>()
            .map_err(ScanError::Persistence)?,
        certificate_key: row.get("certificate_key"),
        status: status
            .parse::<CertStatus>()
            .map_err(ScanError::Persistence)?,
        not_valid_before: parse_datetime(row.get("not_valid_before"))?,
        not_valid_after: parse_datetime(row.get("not_valid_after"))?,
        days_remaining: row.get("days_remaining"),
        issuer: row.get("issuer"),
        subject: row.get("subject"),
    })
}

/// `?, ?, ...` placeholder list for dynamic IN clauses
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[async_trait]
impl ScanStore for SqliteStore {
    async fn create_scan_run(&self, run: &ScanRun) -> Result<(), ScanError> {
        sqlx::query(
            r#"
            INSERT INTO scan_runs
                (id, cluster_id, cluster_name, state, started_at, namespaces)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.id.to_string())
        .bind(run.cluster_id.to_string())
        .bind(&run.cluster_name)
        .bind(run.state.as_str())
        .bind(run.started_at.to_rfc3339())
        .bind(serde_json::to_string(&run.namespaces).unwrap_or_else(|_| "[]".to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("failed to insert scan run", e))?;

        Ok(())
    }

    async fn finalize_scan_run(&self, run: &ScanRun) -> Result<(), ScanError> {
        if !run.state.is_terminal() {
            return Err(ScanError::Persistence(format!(
                "refusing to finalize scan run {} in non-terminal state {}",
                run.id,
                run.state.as_str()
            )));
        }

        // The state guard makes the terminal transition single-shot even if
        // two writers race.
        let result = sqlx::query(
            r#"
            UPDATE scan_runs
            SET state = ?, completed_at = ?, certificates_found = ?,
                valid_count = ?, warning_count = ?, expired_count = ?,
                namespaces = ?, error = ?
            WHERE id = ? AND state = 'in_progress'
            "#,
        )
        .bind(run.state.as_str())
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .bind(run.certificates_found as i64)
        .bind(run.summary.valid as i64)
        .bind(run.summary.warning as i64)
        .bind(run.summary.expired as i64)
        .bind(serde_json::to_string(&run.namespaces).unwrap_or_else(|_| "[]".to_string()))
        .bind(&run.error)
        .bind(run.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("failed to finalize scan run", e))?;

        if result.rows_affected() != 1 {
            return Err(ScanError::Persistence(format!(
                "scan run {} not found or already finalized",
                run.id
            )));
        }
        Ok(())
    }

    async fn bulk_insert_certificates(
        &self,
        records: &[CertificateRecord],
    ) -> Result<(), ScanError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persistence("failed to begin transaction", e))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO certificates
                    (id, scan_id, cluster_id, cluster_name, namespace, object_name,
                     object_kind, certificate_key, status, not_valid_before,
                     not_valid_after, days_remaining, issuer, subject)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.id.to_string())
            .bind(record.scan_id.to_string())
            .bind(record.cluster_id.to_string())
            .bind(&record.cluster_name)
            .bind(&record.namespace)
            .bind(&record.object_name)
            .bind(record.object_kind.as_str())
            .bind(&record.certificate_key)
            .bind(record.status.as_str())
            .bind(record.not_valid_before.to_rfc3339())
            .bind(record.not_valid_after.to_rfc3339())
            .bind(record.days_remaining)
            .bind(&record.issuer)
            .bind(&record.subject)
            .execute(&mut *tx)
            .await
            .map_err(|e| persistence("failed to insert certificate", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| persistence("failed to commit certificates", e))
    }

    async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>, ScanError> {
        let row = sqlx::query("SELECT * FROM scan_runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence("failed to fetch scan run", e))?;

        row.as_ref().map(run_from_row).transpose()
    }

    async fn recent_scan_runs(&self, limit: usize) -> Result<Vec<ScanRun>, ScanError> {
        let rows = sqlx::query("SELECT * FROM scan_runs ORDER BY started_at DESC, id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence("failed to fetch recent scan runs", e))?;

        rows.iter().map(run_from_row).collect()
    }

    async fn scan_statistics(&self) -> Result<ScanStatistics, ScanError> {
        let cutoff = (Utc::now() - chrono::Duration::hours(24)).to_rfc3339();

        // Boolean expressions evaluate to 0/1, so SUM counts matching rows
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(state = 'completed'), 0) AS completed,
                COALESCE(SUM(state = 'failed'), 0) AS failed,
                COALESCE(SUM(state = 'in_progress'), 0) AS in_progress,
                COALESCE(SUM(started_at >= ?), 0) AS last_24h
            FROM scan_runs
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| persistence("failed to aggregate scan statistics", e))?;

        Ok(ScanStatistics {
            total_scans: row.get::<i64, _>("total") as u64,
            completed_scans: row.get::<i64, _>("completed") as u64,
            failed_scans: row.get::<i64, _>("failed") as u64,
            in_progress_scans: row.get::<i64, _>("in_progress") as u64,
            scans_last_24h: row.get::<i64, _>("last_24h") as u64,
        })
    }

    async fn find_completed_scans(&self, cluster_ids: &[Uuid]) -> Result<Vec<ScanRun>, ScanError> {
        let rows = if cluster_ids.is_empty() {
            sqlx::query("SELECT * FROM scan_runs WHERE state = 'completed'")
                .fetch_all(&self.pool)
                .await
        } else {
            let sql = format!(
                "SELECT * FROM scan_runs WHERE state = 'completed' AND cluster_id IN ({})",
                placeholders(cluster_ids.len())
            );
            let mut query = sqlx::query(&sql);
            for cluster_id in cluster_ids {
                query = query.bind(cluster_id.to_string());
            }
            query.fetch_all(&self.pool).await
        }
        .map_err(|e| persistence("failed to fetch completed scan runs", e))?;

        let runs: Vec<ScanRun> = rows
            .iter()
            .map(run_from_row)
            .collect::<Result<_, _>>()?;

        Ok(resolver::latest_completed(runs.iter())
            .into_values()
            .cloned()
            .collect())
    }

    async fn query_certificates(
        &self,
        scan_ids: &[Uuid],
        filter: &CertificateFilter,
    ) -> Result<Vec<CertificateRecord>, ScanError> {
        if scan_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT * FROM certificates WHERE scan_id IN ({})",
            placeholders(scan_ids.len())
        );
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.cluster_name.is_some() {
            sql.push_str(" AND cluster_name = ?");
        }
        if filter.search.is_some() {
            sql.push_str(
                " AND (LOWER(object_name) LIKE ? OR LOWER(namespace) LIKE ? OR LOWER(cluster_name) LIKE ?)",
            );
        }
        // rfc3339 text sorts chronologically
        sql.push_str(" ORDER BY not_valid_after ASC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        for scan_id in scan_ids {
            query = query.bind(scan_id.to_string());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(cluster_name) = &filter.cluster_name {
            query = query.bind(cluster_name.clone());
        }
        if let Some(search) = &filter.search {
            let needle = format!("%{}%", search.to_lowercase());
            query = query.bind(needle.clone()).bind(needle.clone()).bind(needle);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence("failed to query certificates", e))?;

        rows.iter().map(record_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterConfig;

    async fn temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let store = SqliteStore::connect(&url)
            .await
            .expect("database should open");
        (store, dir)
    }

    #[tokio::test]
    async fn round_trips_a_scan_run() {
        let (store, _dir) = temp_store().await;
        let cluster = ClusterConfig::new(
            "prod".to_string(),
            "https://api.prod.example:6443".to_string(),
            "token".to_string(),
            vec![],
        );
        let mut run = ScanRun::new(&cluster);
        store.create_scan_run(&run).await.expect("create");

        let fetched = store.get_scan_run(run.id).await.expect("get").expect("exists");
        assert_eq!(fetched.state, ScanState::InProgress);
        assert_eq!(fetched.cluster_name, "prod");

        run.mark_completed(
            ScanSummary {
                valid: 1,
                warning: 0,
                expired: 0,
            },
            vec!["default".to_string()],
        );
        store.finalize_scan_run(&run).await.expect("finalize");

        let fetched = store.get_scan_run(run.id).await.expect("get").expect("exists");
        assert_eq!(fetched.state, ScanState::Completed);
        assert_eq!(fetched.certificates_found, 1);
        assert_eq!(fetched.namespaces, vec!["default".to_string()]);

        // Terminal runs are immutable
        assert!(store.finalize_scan_run(&run).await.is_err());
    }

    #[tokio::test]
    async fn scan_statistics_aggregates_counts() {
        let (store, _dir) = temp_store().await;
        let cluster = ClusterConfig::new(
            "prod".to_string(),
            "https://api.prod.example:6443".to_string(),
            "token".to_string(),
            vec![],
        );

        let mut completed = ScanRun::new(&cluster);
        store.create_scan_run(&completed).await.unwrap();
        completed.mark_completed(ScanSummary::default(), vec![]);
        store.finalize_scan_run(&completed).await.unwrap();

        let in_progress = ScanRun::new(&cluster);
        store.create_scan_run(&in_progress).await.unwrap();

        let stats = store.scan_statistics().await.unwrap();
        assert_eq!(stats.total_scans, 2);
        assert_eq!(stats.completed_scans, 1);
        assert_eq!(stats.in_progress_scans, 1);
        assert_eq!(stats.failed_scans, 0);
        assert_eq!(stats.scans_last_24h, 2);
    }

    #[tokio::test]
    async fn resolver_scoping_applies_to_sqlite_queries() {
        let (store, _dir) = temp_store().await;
        let cluster = ClusterConfig::new(
            "prod".to_string(),
            "https://api.prod.example:6443".to_string(),
            "token".to_string(),
            vec![],
        );

        let mut superseded = ScanRun::new(&cluster);
        store.create_scan_run(&superseded).await.unwrap();
        let mut latest = ScanRun::new(&cluster);
        latest.started_at = superseded.started_at + chrono::Duration::minutes(5);
        store.create_scan_run(&latest).await.unwrap();

        superseded.mark_completed(ScanSummary::default(), vec![]);
        store.finalize_scan_run(&superseded).await.unwrap();
        latest.mark_completed(ScanSummary::default(), vec![]);
        store.finalize_scan_run(&latest).await.unwrap();

        let selected = store.find_completed_scans(&[cluster.id]).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, latest.id);
    }
}
