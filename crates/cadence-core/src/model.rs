//! Domain types for tasks and schedules, and their Diesel row mappings.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{task_due, tasks};

/// A named, persisted record carrying an opaque payload to be evaluated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub description: Option<String>,
    pub payload: String,
    pub created: DateTime<Utc>,
}

/// A persisted association of a task with a future due instant and an
/// optional recurrence pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub id: i64,
    pub task_id: String,
    pub due: DateTime<Utc>,
    pub repeats: Option<String>,
}

/// A task together with its schedules, returned by `get(id, includeSchedules=true)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskWithSchedules {
    pub task: Task,
    pub schedules: Vec<Schedule>,
}

/// Fields accepted by `create`.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub id: String,
    pub description: Option<String>,
    pub payload: String,
}

/// Fields accepted by `update`; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub description: Option<Option<String>>,
    pub payload: Option<String>,
}

/// Earliest-due row as returned by `TaskStore::next_due`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueRow {
    pub schedule_id: i64,
    pub task_id: String,
    pub due: DateTime<Utc>,
    pub repeats: Option<String>,
}

/// Optional prefix filter on `id` or `description`, applied as a single
/// parameterized query by the store (see `store/mod.rs`).
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = tasks)]
pub struct TaskRow {
    pub id: String,
    pub hyperlambda: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            description: row.description,
            payload: row.hyperlambda,
            created: row.created,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow<'a> {
    pub id: &'a str,
    pub hyperlambda: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = task_due)]
pub struct ScheduleRow {
    pub id: i64,
    pub task: String,
    pub due: DateTime<Utc>,
    pub repeats: Option<String>,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Schedule {
            id: row.id,
            task_id: row.task,
            due: row.due,
            repeats: row.repeats,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_due)]
pub struct NewScheduleRow<'a> {
    pub task: &'a str,
    pub due: DateTime<Utc>,
    pub repeats: Option<&'a str>,
}
