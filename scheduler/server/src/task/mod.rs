use crate::nextdate::{self, NextDateError, RepeatRule};
use chrono::{NaiveDate, NaiveDateTime};
use mockable::Clock;
use std::sync::Arc;

pub mod api;
pub mod store;

pub use store::{DatabaseTaskStore, TaskStore, TaskStoreError};

/// A stored task.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Task {
    id: i64,
    date: String,
    title: String,
    comment: String,
    repeat: String,
}

impl Task {
    pub fn new(id: i64, date: String, title: String, comment: String, repeat: String) -> Self {
        Self {
            id,
            date,
            title,
            comment,
            repeat,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the next occurrence date as `YYYYMMDD`.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns the repeat rule, empty for a one-off task.
    pub fn repeat(&self) -> &str {
        &self.repeat
    }

    /// Returns the editable fields of the task.
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            date: self.date.clone(),
            title: self.title.clone(),
            comment: self.comment.clone(),
            repeat: self.repeat.clone(),
        }
    }
}

/// The editable fields of a task, as submitted for create and update.
#[derive(Debug, PartialEq, Clone, Eq, Default)]
pub struct TaskDraft {
    pub date: String,
    pub title: String,
    pub comment: String,
    pub repeat: String,
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The task has no title.
    #[error("Task title is not specified")]
    MissingTitle,
    /// The date or repeat rule of the task is invalid.
    #[error("Invalid task: {0}")]
    Invalid(#[from] NextDateError),
    /// No task with the given ID exists.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i64),
    /// The task store failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl TaskServiceError {
    /// Returns true for errors caused by the submitted task data.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TaskServiceError::MissingTitle | TaskServiceError::Invalid(_)
        )
    }
}

/// Applies the task date rules around store operations.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { store, clock }
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.local().naive_local()
    }

    /// Validates a draft and rewrites its date into the form that gets stored.
    ///
    /// An empty date becomes today. An overdue one-off task moves to today, an
    /// overdue repeating task to its next occurrence. The occurrence computed
    /// while validating the rule is the one that gets stored.
    fn normalize(&self, draft: TaskDraft) -> Result<TaskDraft, TaskServiceError> {
        if draft.title.trim().is_empty() {
            return Err(TaskServiceError::MissingTitle);
        }

        let now = self.now();
        let today = now.date();
        let date = if draft.date.is_empty() {
            today
        } else {
            nextdate::parse_date(&draft.date)?
        };

        let next_occurrence = if draft.repeat.is_empty() {
            None
        } else {
            let rule: RepeatRule = draft.repeat.parse()?;
            Some(nextdate::next_occurrence(now, date, rule)?)
        };

        let date: NaiveDate = if date < today {
            next_occurrence.unwrap_or(today)
        } else {
            date
        };

        Ok(TaskDraft {
            date: nextdate::format_date(date),
            ..draft
        })
    }

    /// Creates a new task and returns its ID.
    ///
    /// # Arguments
    ///
    /// * `draft` - The submitted task fields; an empty date means today.
    ///
    /// # Returns
    ///
    /// A `Result` containing the ID assigned by the store, or an error if the
    /// draft is invalid or the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, draft: TaskDraft) -> Result<i64, TaskServiceError> {
        let draft = self.normalize(draft)?;
        let id = self.store.insert(&draft).await?;
        tracing::info!("Created task {} for {}", id, draft.date);
        Ok(id)
    }

    /// Replaces the fields of an existing task, applying the same rules as
    /// [`TaskService::create_task`].
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: i64, draft: TaskDraft) -> Result<(), TaskServiceError> {
        let draft = self.normalize(draft)?;
        match self.store.update(id, &draft).await? {
            0 => Err(TaskServiceError::TaskNotFound(id)),
            _ => Ok(()),
        }
    }

    /// Marks a task as done.
    ///
    /// A one-off task is deleted. A repeating task stays and its date moves
    /// to the next occurrence; the other fields are left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn mark_done(&self, id: i64) -> Result<(), TaskServiceError> {
        let task = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;

        if task.repeat().is_empty() {
            return self.delete_task(id).await;
        }

        let next = nextdate::next_date(self.now(), task.date(), task.repeat())?;
        let draft = TaskDraft {
            date: next,
            ..task.to_draft()
        };
        match self.store.update(id, &draft).await? {
            0 => Err(TaskServiceError::TaskNotFound(id)),
            _ => {
                tracing::info!("Task {} advanced to {}", id, draft.date);
                Ok(())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: i64) -> Result<(), TaskServiceError> {
        match self.store.delete(id).await? {
            0 => Err(TaskServiceError::TaskNotFound(id)),
            _ => Ok(()),
        }
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i64) -> Result<Task, TaskServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Retrieves up to `limit` tasks, nearest date first.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks(&self, limit: u64) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.list_ordered_by_date(limit).await?)
    }
}

#[derive(Clone)]
pub struct TaskState {
    pub service: TaskService,
    pub list_limit: u64,
}
