//! SQLite-backed job run history.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use teamops_types::{JobKind, JobOutcome, JobTrigger};

use crate::JobRun;

/// Persistent record of finished job runs.
pub struct JobRunStore {
    conn: Mutex<Connection>,
}

impl JobRunStore {
    /// Open or create a run store.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS job_runs (
                 id TEXT PRIMARY KEY,
                 job TEXT NOT NULL,
                 trigger TEXT NOT NULL,
                 status TEXT NOT NULL,
                 message TEXT NOT NULL,
                 started_at TEXT NOT NULL,
                 finished_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_job_runs_started ON job_runs (started_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("job run store lock poisoned"))
    }

    /// Append a finished run.
    pub fn record(&self, run: &JobRun) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO job_runs (id, job, trigger, status, message, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                run.id,
                run.job.as_str(),
                run.trigger.as_str(),
                run.outcome.status(),
                run.outcome.message(),
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent runs first.
    pub fn recent(&self, limit: usize) -> Result<Vec<JobRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, job, trigger, status, message, started_at, finished_at
             FROM job_runs ORDER BY started_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(RunRow {
                    id: row.get(0)?,
                    job: row.get(1)?,
                    trigger: row.get(2)?,
                    status: row.get(3)?,
                    message: row.get(4)?,
                    started_at: row.get(5)?,
                    finished_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RunRow::into_run).collect()
    }
}

struct RunRow {
    id: String,
    job: String,
    trigger: String,
    status: String,
    message: String,
    started_at: String,
    finished_at: String,
}

impl RunRow {
    fn into_run(self) -> Result<JobRun> {
        let outcome = match self.status.as_str() {
            "skipped" => JobOutcome::Skipped {
                reason: self.message,
            },
            "succeeded" => JobOutcome::Succeeded {
                detail: self.message,
            },
            "failed" => JobOutcome::Failed {
                error: self.message,
            },
            other => return Err(anyhow!("unknown run status in history: {other}")),
        };
        Ok(JobRun {
            job: self.job.parse::<JobKind>().map_err(|e| anyhow!(e))?,
            trigger: self.trigger.parse::<JobTrigger>().map_err(|e| anyhow!(e))?,
            outcome,
            started_at: parse_time(&self.started_at)?,
            finished_at: parse_time(&self.finished_at)?,
            id: self.id,
        })
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad timestamp in history: {s}"))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(minutes: i64) -> DateTime<Utc> {
        "2025-06-09T02:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::minutes(minutes)
    }

    fn run(kind: JobKind, outcome: JobOutcome, minutes: i64) -> JobRun {
        JobRun::new(kind, JobTrigger::Scheduled, outcome, at(minutes), at(minutes + 1))
    }

    #[test]
    fn test_record_and_read_back() {
        let store = JobRunStore::open_in_memory().unwrap();
        let original = run(
            JobKind::WeeklyReport,
            JobOutcome::Succeeded {
                detail: "created".into(),
            },
            0,
        );
        store.record(&original).unwrap();

        let runs = store.recent(10).unwrap();
        assert_eq!(runs, vec![original]);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let store = JobRunStore::open_in_memory().unwrap();
        for (i, outcome) in [
            JobOutcome::Skipped {
                reason: "off".into(),
            },
            JobOutcome::Failed {
                error: "boom".into(),
            },
            JobOutcome::Succeeded {
                detail: "ok".into(),
            },
        ]
        .into_iter()
        .enumerate()
        {
            store.record(&run(JobKind::OnCall, outcome, i as i64 * 10)).unwrap();
        }

        let runs = store.recent(2).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].outcome.status(), "succeeded");
        assert_eq!(runs[1].outcome.message(), "boom");
    }

    #[test]
    fn test_open_file_store() {
        let path = std::env::temp_dir().join(format!("teamops-runs-{}.db", uuid::Uuid::new_v4()));
        {
            let store = JobRunStore::open(&path).unwrap();
            store
                .record(&run(
                    JobKind::OnCall,
                    JobOutcome::Skipped {
                        reason: "off".into(),
                    },
                    0,
                ))
                .unwrap();
        }
        let reopened = JobRunStore::open(&path).unwrap();
        assert_eq!(reopened.recent(5).unwrap().len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
