use crate::entities::*;
use crate::task::{Task, TaskDraft};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::*;

/// Error type for task persistence.
#[derive(Debug, thiserror::Error)]
pub enum TaskStoreError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Row store for tasks, keyed by the integer id it assigns on insert.
///
/// Mutations report the number of affected rows; zero means no row matched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetches a single task, `None` if no row has this id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, TaskStoreError>;

    /// Inserts a new row and returns its id.
    async fn insert(&self, draft: &TaskDraft) -> Result<i64, TaskStoreError>;

    /// Overwrites every field of the row with the given id.
    async fn update(&self, id: i64, draft: &TaskDraft) -> Result<u64, TaskStoreError>;

    async fn delete(&self, id: i64) -> Result<u64, TaskStoreError>;

    /// Returns up to `limit` tasks in ascending date order.
    async fn list_ordered_by_date(&self, limit: u64) -> Result<Vec<Task>, TaskStoreError>;
}

/// [`TaskStore`] backed by the `scheduler` table.
#[derive(Clone, Debug)]
pub struct DatabaseTaskStore {
    db: DatabaseConnection,
}

impl DatabaseTaskStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.date,
            model.title,
            model.comment,
            model.repeat,
        )
    }
}

#[async_trait]
impl TaskStore for DatabaseTaskStore {
    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, TaskStoreError> {
        let model = task::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Task::from))
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&self, draft: &TaskDraft) -> Result<i64, TaskStoreError> {
        let active_model = task::ActiveModel {
            date: ActiveValue::Set(draft.date.clone()),
            title: ActiveValue::Set(draft.title.clone()),
            comment: ActiveValue::Set(draft.comment.clone()),
            repeat: ActiveValue::Set(draft.repeat.clone()),
            ..Default::default()
        };
        let result = task::Entity::insert(active_model).exec(&self.db).await?;
        Ok(result.last_insert_id)
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: i64, draft: &TaskDraft) -> Result<u64, TaskStoreError> {
        let result = task::Entity::update_many()
            .col_expr(task::Column::Date, Expr::value(draft.date.clone()))
            .col_expr(task::Column::Title, Expr::value(draft.title.clone()))
            .col_expr(task::Column::Comment, Expr::value(draft.comment.clone()))
            .col_expr(task::Column::Repeat, Expr::value(draft.repeat.clone()))
            .filter(task::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<u64, TaskStoreError> {
        let result = task::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    #[tracing::instrument(skip(self))]
    async fn list_ordered_by_date(&self, limit: u64) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = task::Entity::find()
            .order_by_asc(task::Column::Date)
            .order_by_asc(task::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }
}
