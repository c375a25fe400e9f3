//! PostgreSQL-backed `TaskStore`, using Diesel directly against a single
//! shared connection (mirrors the message-store pattern elsewhere in this
//! codebase: synchronous Diesel calls behind a `Mutex`, called from async
//! handlers).

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};
use crate::model::{
    DueRow, NewScheduleRow, NewTask, NewTaskRow, Schedule, ScheduleRow, Task, TaskFilter, TaskRow,
    TaskUpdate, TaskWithSchedules,
};
use crate::schema::{task_due, tasks};

use super::TaskStore;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct PgTaskStore {
    conn: Mutex<PgConnection>,
}

impl PgTaskStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut conn = PgConnection::establish(database_url)
            .map_err(|e| Error::Store(format!("connect: {}", e)))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Store(format!("migrations: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PgConnection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Store(format!("connection lock poisoned: {}", e)))
    }
}

fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}

fn is_fk_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create_task(&self, task: NewTask) -> Result<()> {
        let mut conn = self.lock()?;
        let row = NewTaskRow {
            id: &task.id,
            hyperlambda: &task.payload,
            description: task.description.as_deref(),
        };
        diesel::insert_into(tasks::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!("task '{}' already exists", task.id))
                } else {
                    Error::Store(e.to_string())
                }
            })?;
        Ok(())
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<()> {
        let mut conn = self.lock()?;
        let target = tasks::table.filter(tasks::id.eq(id));

        let affected = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let mut total = 0;
            if let Some(payload) = &update.payload {
                total += diesel::update(target.clone())
                    .set(tasks::hyperlambda.eq(payload))
                    .execute(conn)?;
            }
            if let Some(description) = &update.description {
                total += diesel::update(target.clone())
                    .set(tasks::description.eq(description.as_deref()))
                    .execute(conn)?;
            }
            Ok(total)
        });

        let affected = affected.map_err(|e| Error::Store(e.to_string()))?;
        if affected == 0 && !task_exists(&mut conn, id)? {
            return Err(Error::NotFound(format!("task '{}'", id)));
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let affected = diesel::delete(tasks::table.filter(tasks::id.eq(id)))
            .execute(&mut *conn)
            .map_err(|e| Error::Store(e.to_string()))?;
        if affected == 0 {
            return Err(Error::NotFound(format!("task '{}'", id)));
        }
        Ok(())
    }

    async fn get_task(&self, id: &str, include_schedules: bool) -> Result<TaskWithSchedules> {
        let mut conn = self.lock()?;
        let row: TaskRow = tasks::table
            .filter(tasks::id.eq(id))
            .first(&mut *conn)
            .optional()
            .map_err(|e| Error::Store(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("task '{}'", id)))?;

        let schedules = if include_schedules {
            task_due::table
                .filter(task_due::task.eq(id))
                .order(task_due::id.asc())
                .load::<ScheduleRow>(&mut *conn)
                .map_err(|e| Error::Store(e.to_string()))?
                .into_iter()
                .map(Schedule::from)
                .collect()
        } else {
            Vec::new()
        };

        Ok(TaskWithSchedules {
            task: row.into(),
            schedules,
        })
    }

    async fn list_tasks(&self, filter: Option<TaskFilter>, offset: i64, limit: i64) -> Result<Vec<Task>> {
        let mut conn = self.lock()?;
        let mut query = tasks::table.into_boxed();
        if let Some(prefix) = filter.and_then(|f| f.prefix) {
            let pattern = format!("{}%", prefix);
            query = query.filter(
                tasks::id
                    .like(pattern.clone())
                    .or(tasks::description.like(pattern)),
            );
        }
        let rows: Vec<TaskRow> = query
            .order(tasks::created.asc())
            .offset(offset)
            .limit(limit)
            .load(&mut *conn)
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn count_tasks(&self, filter: Option<TaskFilter>) -> Result<i64> {
        let mut conn = self.lock()?;
        let mut query = tasks::table.into_boxed();
        if let Some(prefix) = filter.and_then(|f| f.prefix) {
            let pattern = format!("{}%", prefix);
            query = query.filter(
                tasks::id
                    .like(pattern.clone())
                    .or(tasks::description.like(pattern)),
            );
        }
        query
            .count()
            .get_result(&mut *conn)
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn schedule(&self, task_id: &str, due: DateTime<Utc>, repeats: Option<String>) -> Result<i64> {
        let mut conn = self.lock()?;
        let row = NewScheduleRow {
            task: task_id,
            due,
            repeats: repeats.as_deref(),
        };
        diesel::insert_into(task_due::table)
            .values(&row)
            .returning(task_due::id)
            .get_result(&mut *conn)
            .map_err(|e| {
                if is_fk_violation(&e) {
                    Error::NotFound(format!("task '{}'", task_id))
                } else {
                    Error::Store(e.to_string())
                }
            })
    }

    async fn unschedule(&self, schedule_id: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let affected = diesel::delete(task_due::table.filter(task_due::id.eq(schedule_id)))
            .execute(&mut *conn)
            .map_err(|e| Error::Store(e.to_string()))?;
        if affected == 0 {
            return Err(Error::NotFound(format!("schedule '{}'", schedule_id)));
        }
        Ok(())
    }

    async fn next_due(&self) -> Result<Option<DueRow>> {
        let mut conn = self.lock()?;
        let row: Option<ScheduleRow> = task_due::table
            .order((task_due::due.asc(), task_due::id.asc()))
            .first(&mut *conn)
            .optional()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(row.map(|r| DueRow {
            schedule_id: r.id,
            task_id: r.task,
            due: r.due,
            repeats: r.repeats,
        }))
    }

    async fn advance_schedule(&self, schedule_id: i64, new_due: DateTime<Utc>) -> Result<()> {
        let mut conn = self.lock()?;
        let affected = diesel::update(task_due::table.filter(task_due::id.eq(schedule_id)))
            .set(task_due::due.eq(new_due))
            .execute(&mut *conn)
            .map_err(|e| Error::Store(e.to_string()))?;
        if affected == 0 {
            return Err(Error::NotFound(format!("schedule '{}'", schedule_id)));
        }
        Ok(())
    }

    async fn delete_schedule(&self, schedule_id: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let affected = diesel::delete(task_due::table.filter(task_due::id.eq(schedule_id)))
            .execute(&mut *conn)
            .map_err(|e| Error::Store(e.to_string()))?;
        if affected == 0 {
            return Err(Error::NotFound(format!("schedule '{}'", schedule_id)));
        }
        Ok(())
    }
}

fn task_exists(conn: &mut PgConnection, id: &str) -> Result<bool> {
    diesel::select(diesel::dsl::exists(tasks::table.filter(tasks::id.eq(id))))
        .get_result(conn)
        .map_err(|e| Error::Store(e.to_string()))
}
