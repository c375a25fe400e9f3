//! The public operations (spec §4.5): create, update, delete, get, list,
//! count, schedule, unschedule, execute, start, stop, next, running. Wire
//! framing, auth, and serialization are out of scope — these are plain
//! async methods.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::model::{NewTask, Task, TaskFilter, TaskUpdate, TaskWithSchedules};
use crate::pattern::Pattern;
use crate::store::TaskStore;
use crate::validation::{validate_payload, validate_schedule_request, validate_task_id};

const DEFAULT_LIST_LIMIT: i64 = 10;

/// Fields accepted by `create`, including an optionally bundled schedule.
#[derive(Debug, Clone, Default)]
pub struct CreateTaskRequest {
    pub id: String,
    pub description: Option<String>,
    pub payload: String,
    pub due: Option<DateTime<Utc>>,
    pub repeats: Option<String>,
    /// If `Some(false)`, a bundled schedule does not auto-start the engine.
    pub auto_start: Option<bool>,
}

pub struct Facade {
    store: Arc<dyn TaskStore>,
    executor: Arc<Executor>,
    engine: Arc<Engine>,
}

impl Facade {
    pub fn new(store: Arc<dyn TaskStore>, executor: Arc<Executor>, engine: Arc<Engine>) -> Self {
        Self { store, executor, engine }
    }

    pub async fn create(&self, request: CreateTaskRequest) -> Result<()> {
        validate_task_id(&request.id)?;
        validate_payload(&request.payload)?;
        if request.due.is_some() || request.repeats.is_some() {
            validate_schedule_request(request.due, request.repeats.as_deref(), Utc::now())?;
        }
        let pattern = request
            .repeats
            .as_deref()
            .map(Pattern::from_str_checked)
            .transpose()?;

        self.store
            .create_task(NewTask {
                id: request.id.clone(),
                description: request.description,
                payload: request.payload,
            })
            .await?;

        let scheduled = request.due.is_some() || pattern.is_some();
        if scheduled {
            let due = match request.due {
                Some(due) => due,
                None => pattern.as_ref().unwrap().next(Utc::now()),
            };
            let canonical_repeats = pattern.as_ref().map(Pattern::value);
            self.store.schedule(&request.id, due, canonical_repeats).await?;
        }

        if scheduled && request.auto_start != Some(false) {
            self.engine.start().await;
        }
        self.engine.rearm().await;
        Ok(())
    }

    pub async fn update(&self, id: &str, update: TaskUpdate) -> Result<()> {
        self.store.update_task(id, update).await?;
        self.engine.rearm().await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete_task(id).await?;
        self.engine.rearm().await;
        Ok(())
    }

    pub async fn get(&self, id: &str, include_schedules: bool) -> Result<TaskWithSchedules> {
        self.store.get_task(id, include_schedules).await
    }

    pub async fn list(&self, filter: Option<TaskFilter>, offset: Option<i64>, limit: Option<i64>) -> Result<Vec<Task>> {
        self.store
            .list_tasks(filter, offset.unwrap_or(0), limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await
    }

    pub async fn count(&self, filter: Option<TaskFilter>) -> Result<i64> {
        self.store.count_tasks(filter).await
    }

    pub async fn schedule(&self, task_id: &str, due: Option<DateTime<Utc>>, repeats: Option<String>) -> Result<i64> {
        validate_schedule_request(due, repeats.as_deref(), Utc::now())?;
        let pattern = repeats.as_deref().map(Pattern::from_str_checked).transpose()?;

        let due = match due {
            Some(due) => due,
            None => pattern.as_ref().unwrap().next(Utc::now()),
        };
        let canonical_repeats = pattern.as_ref().map(Pattern::value);

        let schedule_id = self.store.schedule(task_id, due, canonical_repeats).await?;
        self.engine.start().await;
        self.engine.rearm().await;
        Ok(schedule_id)
    }

    pub async fn unschedule(&self, schedule_id: i64) -> Result<()> {
        self.store.unschedule(schedule_id).await?;
        self.engine.rearm().await;
        Ok(())
    }

    /// Direct invocation, bypassing the scheduler; failures are surfaced to
    /// the caller (unlike engine-initiated fires, which swallow them).
    pub async fn execute(&self, task_id: &str) -> Result<String> {
        self.executor.execute(task_id).await
    }

    pub async fn start(&self) {
        self.engine.start().await;
    }

    pub async fn stop(&self) {
        self.engine.stop().await;
    }

    pub async fn next(&self) -> Result<Option<DateTime<Utc>>> {
        self.engine.next_due().await
    }

    pub fn running(&self) -> bool {
        self.engine.running()
    }
}

impl Pattern {
    fn from_str_checked(text: &str) -> Result<Pattern> {
        Pattern::parse(text).map_err(|e| match e {
            Error::Parse(msg) => Error::Validation(msg),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EchoEvaluator;
    use crate::store::MemoryTaskStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration as StdDuration;

    fn make_facade() -> Facade {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
        let executor = Arc::new(Executor::new(store.clone(), Arc::new(EchoEvaluator::new())));
        let engine = Engine::new(
            store.clone(),
            executor.clone(),
            StdDuration::from_millis(50),
            StdDuration::from_secs(45 * 86_400),
        );
        Facade::new(store, executor, engine)
    }

    /// Counts invocations instead of doing anything with the payload, so a
    /// test can assert a fire did or did not happen without inspecting logs.
    #[derive(Default)]
    struct CountingEvaluator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::evaluator::Evaluator for CountingEvaluator {
        async fn evaluate(&self, payload: &str) -> Result<String> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(payload.to_string())
        }
    }

    fn make_facade_with_counter() -> (Facade, Arc<CountingEvaluator>) {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
        let counter = Arc::new(CountingEvaluator::default());
        let evaluator: Arc<dyn crate::evaluator::Evaluator> = counter.clone();
        let executor = Arc::new(Executor::new(store.clone(), evaluator));
        let engine = Engine::new(
            store.clone(),
            executor.clone(),
            StdDuration::from_millis(50),
            StdDuration::from_secs(45 * 86_400),
        );
        (Facade::new(store, executor, engine), counter)
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let facade = make_facade();
        facade
            .create(CreateTaskRequest {
                id: "t1".to_string(),
                payload: "hi".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let fetched = facade.get("t1", false).await.unwrap();
        assert_eq!(fetched.task.id, "t1");
    }

    #[tokio::test]
    async fn create_rejects_invalid_id() {
        let facade = make_facade();
        let result = facade
            .create(CreateTaskRequest {
                id: "Bad/Id".to_string(),
                payload: "hi".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let facade = make_facade();
        facade
            .create(CreateTaskRequest {
                id: "t2".to_string(),
                payload: "hi".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        facade.delete("t2").await.unwrap();
        assert!(matches!(facade.get("t2", false).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn schedule_requires_exactly_one_of_due_or_repeats() {
        let facade = make_facade();
        facade
            .create(CreateTaskRequest {
                id: "t3".to_string(),
                payload: "hi".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let result = facade.schedule("t3", None, None).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn schedule_starts_the_engine() {
        let facade = make_facade();
        facade
            .create(CreateTaskRequest {
                id: "t4".to_string(),
                payload: "hi".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!facade.running());
        facade
            .schedule("t4", Some(Utc::now() + chrono::Duration::seconds(30)), None)
            .await
            .unwrap();
        assert!(facade.running());
    }

    #[tokio::test]
    async fn execute_bypasses_scheduler_and_surfaces_failure() {
        let facade = make_facade();
        facade
            .create(CreateTaskRequest {
                id: "t5".to_string(),
                payload: "fail: boom".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let result = facade.execute("t5").await;
        assert!(matches!(result, Err(Error::Evaluator(_))));
    }

    #[tokio::test]
    async fn list_defaults_to_offset_zero_limit_ten() {
        let facade = make_facade();
        for i in 0..15 {
            facade
                .create(CreateTaskRequest {
                    id: format!("t{}", i),
                    payload: "hi".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let page = facade.list(None, None, None).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(facade.count(None).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn deleting_a_task_cancels_its_pending_fire() {
        let (facade, counter) = make_facade_with_counter();
        facade
            .create(CreateTaskRequest {
                id: "t6".to_string(),
                payload: "hi".to_string(),
                due: Some(Utc::now() + chrono::Duration::milliseconds(200)),
                ..Default::default()
            })
            .await
            .unwrap();

        facade.delete("t6").await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(500)).await;

        assert_eq!(counter.calls.load(AtomicOrdering::SeqCst), 0);
    }
}
