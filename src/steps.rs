//! Replay-safe step execution.
//!
//! Every unit of work in a run (a content load, an AI call, a persistence
//! write) executes through [`StepLog::run`] under a name that is unique
//! within the run. The first execution records the step's JSON-serialized
//! result; a replay of the same run (after a crash, or when a durable
//! orchestrator re-enters the function) returns the recorded result without
//! re-executing the work. Side effects therefore happen at most once per
//! recorded step, and persistence writes stay idempotent because they are
//! keyed by content id.
//!
//! The log itself is process-memory plus an exportable snapshot
//! ([`StepLog::snapshot`] / [`StepLog::with_recorded`]), which is what an
//! external durable-execution runtime would persist between replays.

use std::future::Future;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors from the step log itself (not from the wrapped work).
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// A step result could not be serialized for recording.
    #[error("failed to record step {name:?}: {source}")]
    #[diagnostic(code(copydesk::steps::record))]
    Record {
        name: String,
        source: serde_json::Error,
    },

    /// A recorded step result no longer matches the expected type.
    #[error("recorded result for step {name:?} does not deserialize: {source}")]
    #[diagnostic(
        code(copydesk::steps::replay),
        help("The step log predates a change to the step's result type; discard the run's log.")
    )]
    Replay {
        name: String,
        source: serde_json::Error,
    },
}

/// Memoizing step log for one workflow run.
#[derive(Debug)]
pub struct StepLog {
    run_id: String,
    recorded: Mutex<FxHashMap<String, Value>>,
}

impl StepLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            recorded: Mutex::new(FxHashMap::default()),
        }
    }

    /// Rebuild a log from previously recorded results, as a durable runtime
    /// does when replaying a crashed run.
    pub fn with_recorded(run_id: impl Into<String>, recorded: FxHashMap<String, Value>) -> Self {
        Self {
            run_id: run_id.into(),
            recorded: Mutex::new(recorded),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Execute `work` as the named durable step.
    ///
    /// If a result is already recorded under `name`, it is returned without
    /// executing `work`. Otherwise `work` runs, and on success its result is
    /// recorded before being returned. Failed steps record nothing, so a
    /// replay retries them: at-least-once execution, exactly-once recorded
    /// effect.
    pub async fn run<T, E, Fut>(&self, name: &str, work: Fut) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StepError>,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.recorded.lock().await.get(name).cloned() {
            debug!(run_id = %self.run_id, step = name, "replaying recorded step");
            return serde_json::from_value(value).map_err(|source| {
                E::from(StepError::Replay {
                    name: name.to_string(),
                    source,
                })
            });
        }

        debug!(run_id = %self.run_id, step = name, "executing step");
        let result = work.await?;
        let value = serde_json::to_value(&result).map_err(|source| {
            E::from(StepError::Record {
                name: name.to_string(),
                source,
            })
        })?;
        self.recorded.lock().await.insert(name.to_string(), value);
        Ok(result)
    }

    /// Export the recorded results, e.g. for external persistence.
    pub async fn snapshot(&self) -> FxHashMap<String, Value> {
        self.recorded.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn step_executes_once_and_replays() {
        let log = StepLog::new("run-1");
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let result: Result<String, StepError> = log
                .run("load", async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("loaded".to_string())
                })
                .await;
            assert_eq!(result.unwrap(), "loaded");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_step_is_retried() {
        let log = StepLog::new("run-1");
        let calls = AtomicU32::new(0);

        let first: Result<String, StepError> = log
            .run("flaky", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StepError::Record {
                    name: "flaky".into(),
                    source: serde_json::from_str::<()>("").unwrap_err(),
                })
            })
            .await;
        assert!(first.is_err());

        let second: Result<String, StepError> = log
            .run("flaky", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("ok".to_string())
            })
            .await;
        assert_eq!(second.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn seeded_log_replays_without_executing() {
        let mut recorded = FxHashMap::default();
        recorded.insert("load".to_string(), serde_json::json!("from-disk"));
        let log = StepLog::with_recorded("run-1", recorded);

        let result: Result<String, StepError> = log
            .run("load", async {
                panic!("must not execute");
            })
            .await;
        assert_eq!(result.unwrap(), "from-disk");
    }
}
