//! The Executor (spec §4.2): loads a task's payload from the store, hands
//! it to the `Evaluator`, and logs the outcome. Failure isolation is the
//! caller's responsibility — the engine's fire path swallows errors
//! returned here, while the facade's explicit `execute` propagates them.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::store::TaskStore;

pub struct Executor {
    store: Arc<dyn TaskStore>,
    evaluator: Arc<dyn Evaluator>,
}

impl Executor {
    pub fn new(store: Arc<dyn TaskStore>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self { store, evaluator }
    }

    /// Loads `task_id`'s payload and evaluates it. Returns `Error::NotFound`
    /// if the task no longer exists, or `Error::Evaluator` if evaluation
    /// fails; both are the caller's to handle (swallow at the engine
    /// boundary, surface at the facade boundary).
    pub async fn execute(&self, task_id: &str) -> Result<String> {
        let loaded = self.store.get_task(task_id, false).await.map_err(|e| {
            if e.is_not_found() {
                error!(task_id, "execute: task not found");
            }
            e
        })?;

        match self.evaluator.evaluate(&loaded.task.payload).await {
            Ok(output) => {
                info!(task_id, "task executed successfully");
                Ok(output)
            }
            Err(e) => {
                error!(task_id, error = %e, "task execution failed");
                Err(Error::Evaluator(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EchoEvaluator;
    use crate::model::NewTask;
    use crate::store::MemoryTaskStore;

    async fn setup() -> Executor {
        let store = Arc::new(MemoryTaskStore::new());
        store
            .create_task(NewTask {
                id: "t1".to_string(),
                description: None,
                payload: "hello".to_string(),
            })
            .await
            .unwrap();
        Executor::new(store, Arc::new(EchoEvaluator::new()))
    }

    #[tokio::test]
    async fn executes_known_task() {
        let executor = setup().await;
        let output = executor.execute("t1").await.unwrap();
        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let executor = setup().await;
        let result = executor.execute("ghost").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn evaluator_failure_is_surfaced_as_evaluator_error() {
        let store = Arc::new(MemoryTaskStore::new());
        store
            .create_task(NewTask {
                id: "t2".to_string(),
                description: None,
                payload: "fail: boom".to_string(),
            })
            .await
            .unwrap();
        let executor = Executor::new(store, Arc::new(EchoEvaluator::new()));
        let result = executor.execute("t2").await;
        assert!(matches!(result, Err(Error::Evaluator(_))));
    }
}
