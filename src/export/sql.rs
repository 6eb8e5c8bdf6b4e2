use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, SqliteExecutor};
use tracing::{debug, instrument};

use super::Exporter;
use crate::error::{AnalysisError, Result};
use crate::record::Sample;
use crate::report::{AggregatedGroup, AggregatedSummary};
use crate::Analysis;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS Testrun(
        testId INTEGER PRIMARY KEY AUTOINCREMENT,
        logFile TEXT, runTime TEXT, samples INTEGER, assertions INTEGER,
        samplesSuccessRate REAL, samplesSuccessRateInclAssertions REAL,
        assertionPassRate REAL, averageTime REAL, minTime INTEGER, maxTime INTEGER)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS Aggregated(
        aggId INTEGER PRIMARY KEY AUTOINCREMENT,
        testId INTEGER, label TEXT, samples INTEGER, averageTime REAL,
        minTime INTEGER, maxTime INTEGER, stDev REAL, error REAL,
        errorInclAssert REAL, throughput REAL, kbPerSec REAL, avgBytes REAL,
        median REAL, line90 INTEGER,
        FOREIGN KEY(testId) REFERENCES Testrun(testId))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS Sample(
        sampleId INTEGER PRIMARY KEY AUTOINCREMENT,
        aggId INTEGER, sampleTime INTEGER, respCode TEXT, respMsg TEXT,
        threadName TEXT, dataType TEXT, status TEXT, bytes INTEGER, latency INTEGER,
        FOREIGN KEY(aggId) REFERENCES Aggregated(aggId))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS Assert(
        assertId INTEGER PRIMARY KEY AUTOINCREMENT,
        sampleId INTEGER, name TEXT, failure TEXT, failureMsg TEXT, error TEXT,
        FOREIGN KEY(sampleId) REFERENCES Sample(sampleId))
    "#,
];

/// Stores a run in a SQLite file: one `Testrun` row, one `Aggregated`
/// row per label, every sample and every assertion.
#[derive(Debug, Clone, Default)]
pub struct SqlExporter;

#[async_trait]
impl Exporter for SqlExporter {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn suffix(&self) -> &'static str {
        ".sql"
    }

    #[instrument(skip(self, analysis))]
    async fn export(&self, analysis: &Analysis, target: &Path) -> Result<()> {
        store(analysis, target)
            .await
            .map_err(|e| AnalysisError::persistence(self.name(), target, e))
    }
}

async fn store(analysis: &Analysis, target: &Path) -> sqlx::Result<()> {
    let options = SqliteConnectOptions::new()
        .filename(target)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;
    let mut tx = conn.begin().await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    let report = &analysis.report;
    let test_id = insert_testrun(
        &mut *tx,
        &analysis.meta.log_display(),
        &analysis.meta.timestamp(),
        &report.summary,
    )
    .await?;

    let mut agg_ids = HashMap::with_capacity(report.groups.len());
    for group in report.label_groups() {
        let agg_id = insert_group(&mut *tx, test_id, group).await?;
        agg_ids.insert(group.name.as_str(), agg_id);
    }

    for sample in &report.samples {
        let Some(&agg_id) = agg_ids.get(sample.label.as_str()) else {
            continue;
        };
        insert_sample(&mut tx, agg_id, sample).await?;
    }

    tx.commit().await?;
    conn.close().await?;
    debug!(
        groups = agg_ids.len(),
        samples = report.samples.len(),
        "sqlite store written"
    );
    Ok(())
}

async fn insert_testrun(
    db: impl SqliteExecutor<'_>,
    log_file: &str,
    run_time: &str,
    summary: &AggregatedSummary,
) -> sqlx::Result<i64> {
    let done = sqlx::query(
        r#"
        INSERT INTO Testrun (logFile, runTime, samples, assertions, samplesSuccessRate,
            samplesSuccessRateInclAssertions, assertionPassRate, averageTime, minTime, maxTime)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(log_file)
    .bind(run_time)
    .bind(summary.samples as i64)
    .bind(summary.assertions as i64)
    .bind(summary.success_rate)
    .bind(summary.success_rate_incl_assertions)
    .bind(summary.assertion_pass_rate)
    .bind(summary.mean_time)
    .bind(summary.min_time.map(|t| t as i64))
    .bind(summary.max_time as i64)
    .execute(db)
    .await?;
    Ok(done.last_insert_rowid())
}

async fn insert_group(
    db: impl SqliteExecutor<'_>,
    test_id: i64,
    group: &AggregatedGroup,
) -> sqlx::Result<i64> {
    let done = sqlx::query(
        r#"
        INSERT INTO Aggregated (testId, label, samples, averageTime, minTime, maxTime, stDev,
            error, errorInclAssert, throughput, kbPerSec, avgBytes, median, line90)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(test_id)
    .bind(&group.name)
    .bind(group.summary.samples as i64)
    .bind(group.summary.mean_time)
    .bind(group.summary.min_time.map(|t| t as i64))
    .bind(group.summary.max_time as i64)
    .bind(group.percentiles.std_dev)
    .bind(group.error_rate)
    .bind(group.error_rate_incl_assertions)
    .bind(group.throughput)
    .bind(group.kb_per_sec)
    .bind(group.mean_bytes)
    .bind(group.percentiles.median as f64)
    .bind(group.percentiles.p90 as i64)
    .execute(db)
    .await?;
    Ok(done.last_insert_rowid())
}

async fn insert_sample(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    agg_id: i64,
    sample: &Sample,
) -> sqlx::Result<()> {
    let done = sqlx::query(
        r#"
        INSERT INTO Sample (aggId, sampleTime, respCode, respMsg, threadName, dataType,
            status, bytes, latency)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(agg_id)
    .bind(sample.elapsed_ms as i64)
    .bind(&sample.response_code)
    .bind(&sample.response_message)
    .bind(&sample.thread_name)
    .bind(&sample.data_type)
    .bind(&sample.status)
    .bind(sample.bytes as i64)
    .bind(sample.latency_ms as i64)
    .execute(&mut **tx)
    .await?;
    let sample_id = done.last_insert_rowid();

    for assertion in &sample.assertions {
        sqlx::query(
            r#"
            INSERT INTO Assert (sampleId, name, failure, failureMsg, error)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(sample_id)
        .bind(&assertion.name)
        .bind(assertion.failure.to_string())
        .bind(&assertion.failure_message)
        .bind(assertion.error.to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyze_str, AnalysisOptions, RunMetadata};

    const LOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testResults version="1.2">
<httpSample t="120" lt="30" ts="1443000000000" s="true" lb="Home" rc="200" rm="OK" tn="TG 1-1" dt="text" by="2048">
  <assertionResult><name>Size</name><failure>false</failure><error>false</error></assertionResult>
  <assertionResult><name>Body</name><failure>true</failure><error>false</error><failureMessage>missing</failureMessage></assertionResult>
</httpSample>
<httpSample t="80" lt="20" ts="1443000000500" s="false" lb="Cart" rc="500" rm="Server Error" tn="TG 1-2" dt="text" by="512"/>
<httpSample t="95" lt="25" ts="1443000001000" s="true" lb="Home" rc="200" rm="OK" tn="TG 1-1" dt="text" by="2048"/>
</testResults>
"#;

    async fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn writes_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run.jtl.sql");
        let analysis = Analysis {
            meta: RunMetadata::new(Some(&dir.path().join("run.jtl"))),
            report: analyze_str(LOG, &AnalysisOptions::default()).unwrap(),
        };

        SqlExporter.export(&analysis, &target).await.unwrap();

        let options = SqliteConnectOptions::new().filename(&target);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        assert_eq!(count(&mut conn, "Testrun").await, 1);
        // TOTAL is not stored as a group.
        assert_eq!(count(&mut conn, "Aggregated").await, 2);
        assert_eq!(count(&mut conn, "Sample").await, 3);
        assert_eq!(count(&mut conn, "Assert").await, 2);

        let failing: String =
            sqlx::query_scalar("SELECT failureMsg FROM Assert WHERE failure = 'true'")
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert_eq!(failing, "missing");

        let home_samples: i64 =
            sqlx::query_scalar("SELECT samples FROM Aggregated WHERE label = 'Home'")
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert_eq!(home_samples, 2);
    }

    #[tokio::test]
    async fn unwritable_target_is_a_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing-dir").join("run.jtl.sql");
        let analysis = Analysis {
            meta: RunMetadata::new(None),
            report: analyze_str(LOG, &AnalysisOptions::default()).unwrap(),
        };

        let err = SqlExporter.export(&analysis, &target).await.unwrap_err();
        assert!(matches!(err, AnalysisError::PersistenceFailure { exporter: "sql", .. }));
        assert!(!err.is_fatal_to_analysis());
    }
}
