//! In-memory `TaskStore`, used in tests and anywhere a live database is
//! unavailable. Implements the same contract as `PgTaskStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{DueRow, NewTask, Schedule, Task, TaskFilter, TaskUpdate, TaskWithSchedules};

use super::TaskStore;

#[derive(Default)]
struct State {
    tasks: HashMap<String, Task>,
    schedules: HashMap<i64, Schedule>,
    next_schedule_id: i64,
}

pub struct MemoryTaskStore {
    state: RwLock<State>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(task: &Task, filter: &TaskFilter) -> bool {
    match &filter.prefix {
        None => true,
        Some(prefix) => {
            task.id.starts_with(prefix.as_str())
                || task
                    .description
                    .as_deref()
                    .is_some_and(|d| d.starts_with(prefix.as_str()))
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, task: NewTask) -> Result<()> {
        let mut state = self.state.write().await;
        if state.tasks.contains_key(&task.id) {
            return Err(Error::Conflict(format!("task '{}' already exists", task.id)));
        }
        state.tasks.insert(
            task.id.clone(),
            Task {
                id: task.id,
                description: task.description,
                payload: task.payload,
                created: Utc::now(),
            },
        );
        Ok(())
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("task '{}'", id)))?;
        if let Some(payload) = update.payload {
            task.payload = payload;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.tasks.remove(id).is_none() {
            return Err(Error::NotFound(format!("task '{}'", id)));
        }
        state.schedules.retain(|_, s| s.task_id != id);
        Ok(())
    }

    async fn get_task(&self, id: &str, include_schedules: bool) -> Result<TaskWithSchedules> {
        let state = self.state.read().await;
        let task = state
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task '{}'", id)))?;
        let schedules = if include_schedules {
            let mut s: Vec<Schedule> = state
                .schedules
                .values()
                .filter(|s| s.task_id == id)
                .cloned()
                .collect();
            s.sort_by_key(|s| s.id);
            s
        } else {
            Vec::new()
        };
        Ok(TaskWithSchedules { task, schedules })
    }

    async fn list_tasks(&self, filter: Option<TaskFilter>, offset: i64, limit: i64) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.as_ref().map(|f| matches_filter(t, f)).unwrap_or(true))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created);
        let offset = offset.max(0) as usize;
        let limit = limit.max(0) as usize;
        Ok(tasks.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_tasks(&self, filter: Option<TaskFilter>) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .tasks
            .values()
            .filter(|t| filter.as_ref().map(|f| matches_filter(t, f)).unwrap_or(true))
            .count();
        Ok(count as i64)
    }

    async fn schedule(&self, task_id: &str, due: DateTime<Utc>, repeats: Option<String>) -> Result<i64> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(task_id) {
            return Err(Error::NotFound(format!("task '{}'", task_id)));
        }
        state.next_schedule_id += 1;
        let id = state.next_schedule_id;
        state.schedules.insert(
            id,
            Schedule {
                id,
                task_id: task_id.to_string(),
                due,
                repeats,
            },
        );
        Ok(id)
    }

    async fn unschedule(&self, schedule_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        if state.schedules.remove(&schedule_id).is_none() {
            return Err(Error::NotFound(format!("schedule '{}'", schedule_id)));
        }
        Ok(())
    }

    async fn next_due(&self) -> Result<Option<DueRow>> {
        let state = self.state.read().await;
        let earliest = state
            .schedules
            .values()
            .min_by_key(|s| (s.due, s.id))
            .map(|s| DueRow {
                schedule_id: s.id,
                task_id: s.task_id.clone(),
                due: s.due,
                repeats: s.repeats.clone(),
            });
        Ok(earliest)
    }

    async fn advance_schedule(&self, schedule_id: i64, new_due: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        let schedule = state
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| Error::NotFound(format!("schedule '{}'", schedule_id)))?;
        schedule.due = new_due;
        Ok(())
    }

    async fn delete_schedule(&self, schedule_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        if state.schedules.remove(&schedule_id).is_none() {
            return Err(Error::NotFound(format!("schedule '{}'", schedule_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract_tests;

    #[tokio::test]
    async fn contract_create_then_get() {
        contract_tests::create_then_get_roundtrips_fields(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn contract_delete_cascades() {
        contract_tests::delete_task_cascades_schedules(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn contract_unschedule() {
        contract_tests::unschedule_removes_from_next_due(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn contract_next_due_ordering() {
        contract_tests::next_due_returns_earliest(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let store = MemoryTaskStore::new();
        store
            .create_task(NewTask {
                id: "dup".to_string(),
                description: None,
                payload: "echo hi".to_string(),
            })
            .await
            .unwrap();
        let result = store
            .create_task(NewTask {
                id: "dup".to_string(),
                description: None,
                payload: "echo hi".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn schedule_against_missing_task_is_not_found() {
        let store = MemoryTaskStore::new();
        let result = store.schedule("ghost", Utc::now() + chrono::Duration::seconds(1), None).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn list_respects_offset_and_limit_in_created_order() {
        let store = MemoryTaskStore::new();
        for id in ["a", "b", "c"] {
            store
                .create_task(NewTask {
                    id: id.to_string(),
                    description: None,
                    payload: "echo".to_string(),
                })
                .await
                .unwrap();
        }
        let page = store.list_tasks(None, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b");
    }

    #[tokio::test]
    async fn count_ignores_offset_and_limit() {
        let store = MemoryTaskStore::new();
        for id in ["a", "b"] {
            store
                .create_task(NewTask {
                    id: id.to_string(),
                    description: None,
                    payload: "echo".to_string(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.count_tasks(None).await.unwrap(), 2);
    }
}
