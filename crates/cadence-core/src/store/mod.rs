//! The `TaskStore` collaborator contract (§4.3): a minimal persistent
//! storage surface for tasks and their schedules. `PgTaskStore` and
//! `MemoryTaskStore` both satisfy this trait and are exercised by the
//! same contract tests (see `store::contract_tests`).

mod memory;
mod postgres;

pub use memory::MemoryTaskStore;
pub use postgres::PgTaskStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{DueRow, NewTask, Task, TaskFilter, TaskUpdate, TaskWithSchedules};

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<()>;

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<()>;

    async fn delete_task(&self, id: &str) -> Result<()>;

    async fn get_task(&self, id: &str, include_schedules: bool) -> Result<TaskWithSchedules>;

    async fn list_tasks(&self, filter: Option<TaskFilter>, offset: i64, limit: i64) -> Result<Vec<Task>>;

    async fn count_tasks(&self, filter: Option<TaskFilter>) -> Result<i64>;

    async fn schedule(&self, task_id: &str, due: DateTime<Utc>, repeats: Option<String>) -> Result<i64>;

    async fn unschedule(&self, schedule_id: i64) -> Result<()>;

    /// Earliest-due row across all schedules, tie-broken by ascending id.
    async fn next_due(&self) -> Result<Option<DueRow>>;

    async fn advance_schedule(&self, schedule_id: i64, new_due: DateTime<Utc>) -> Result<()>;

    async fn delete_schedule(&self, schedule_id: i64) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod contract_tests {
    //! Shared black-box assertions run against every `TaskStore` impl.
    //! `MemoryTaskStore`'s own test module exercises these; `PgTaskStore`
    //! is exercised the same way behind a live-database test harness
    //! (see `postgres.rs`).

    use super::*;

    pub async fn create_then_get_roundtrips_fields(store: &dyn TaskStore) {
        store
            .create_task(NewTask {
                id: "t1".to_string(),
                description: Some("first task".to_string()),
                payload: "echo hi".to_string(),
            })
            .await
            .unwrap();

        let fetched = store.get_task("t1", false).await.unwrap();
        assert_eq!(fetched.task.id, "t1");
        assert_eq!(fetched.task.payload, "echo hi");
        assert_eq!(fetched.task.description.as_deref(), Some("first task"));
        assert!(fetched.schedules.is_empty());
    }

    pub async fn delete_task_cascades_schedules(store: &dyn TaskStore) {
        store
            .create_task(NewTask {
                id: "t2".to_string(),
                description: None,
                payload: "echo hi".to_string(),
            })
            .await
            .unwrap();
        let due = Utc::now() + chrono::Duration::seconds(60);
        store.schedule("t2", due, None).await.unwrap();

        store.delete_task("t2").await.unwrap();

        assert!(store.get_task("t2", false).await.is_err());
    }

    pub async fn unschedule_removes_from_next_due(store: &dyn TaskStore) {
        store
            .create_task(NewTask {
                id: "t3".to_string(),
                description: None,
                payload: "echo hi".to_string(),
            })
            .await
            .unwrap();
        let due = Utc::now() + chrono::Duration::seconds(60);
        let schedule_id = store.schedule("t3", due, None).await.unwrap();

        store.unschedule(schedule_id).await.unwrap();

        let next = store.next_due().await.unwrap();
        assert!(next.is_none() || next.unwrap().schedule_id != schedule_id);
    }

    pub async fn next_due_returns_earliest(store: &dyn TaskStore) {
        store
            .create_task(NewTask {
                id: "a".to_string(),
                description: None,
                payload: "echo a".to_string(),
            })
            .await
            .unwrap();
        store
            .create_task(NewTask {
                id: "b".to_string(),
                description: None,
                payload: "echo b".to_string(),
            })
            .await
            .unwrap();

        store
            .schedule("a", Utc::now() + chrono::Duration::seconds(60), None)
            .await
            .unwrap();
        store
            .schedule("b", Utc::now() + chrono::Duration::seconds(30), None)
            .await
            .unwrap();

        let next = store.next_due().await.unwrap().unwrap();
        assert_eq!(next.task_id, "b");
    }
}
