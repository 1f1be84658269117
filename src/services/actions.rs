use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{column, pillar_column};
use crate::error::{ServiceError, ServiceResult, ValidationErrors};
use crate::models::{ActionItem, ActionStatus, NewActionItem, Pillar, Priority};

const ACTION_COLUMNS: &str =
    "id, pillar, description, assignee, priority, status, created_date, due_date";

pub async fn create_action_item(pool: &PgPool, item: &NewActionItem) -> ServiceResult<ActionItem> {
    item.validate().map_err(ValidationErrors::from)?;

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO sqcdp.action_items
        (id, pillar, description, assignee, priority, status, created_date, due_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {ACTION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(item.pillar.as_str())
    .bind(item.description.trim())
    .bind(item.assignee.as_deref())
    .bind(item.priority.as_str())
    .bind(item.status.as_str())
    .bind(item.created_date)
    .bind(item.due_date)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to create action item"))?;

    let action = action_from_row(&row)?;
    info!(id = %action.id, pillar = %action.pillar, "action item created");
    Ok(action)
}

pub async fn update_action_status(
    pool: &PgPool,
    id: Uuid,
    status: ActionStatus,
) -> ServiceResult<ActionItem> {
    let row = sqlx::query(&format!(
        "UPDATE sqcdp.action_items SET status = $2 WHERE id = $1 RETURNING {ACTION_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
    .map_err(ServiceError::backend("failed to update action item"))?
    .ok_or_else(|| ServiceError::NotFound(format!("action item {id}")))?;

    info!(%id, %status, "action item status updated");
    action_from_row(&row)
}

/// Open work first, then by due date (undated last).
pub async fn fetch_action_items(
    pool: &PgPool,
    pillar: Option<Pillar>,
    status: Option<ActionStatus>,
) -> ServiceResult<Vec<ActionItem>> {
    let mut query = format!("SELECT {ACTION_COLUMNS} FROM sqcdp.action_items WHERE TRUE");
    let mut position = 0;
    if pillar.is_some() {
        position += 1;
        query.push_str(&format!(" AND pillar = ${position}"));
    }
    if status.is_some() {
        position += 1;
        query.push_str(&format!(" AND status = ${position}"));
    }
    query.push_str(
        " ORDER BY CASE status WHEN 'open' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END, \
         due_date ASC NULLS LAST, created_date DESC",
    );

    let mut rows = sqlx::query(&query);
    if let Some(value) = pillar {
        rows = rows.bind(value.as_str());
    }
    if let Some(value) = status {
        rows = rows.bind(value.as_str());
    }

    let records = rows
        .fetch_all(pool)
        .await
        .map_err(ServiceError::backend("failed to load action items"))?;
    debug!(count = records.len(), "action items loaded");

    records.iter().map(action_from_row).collect()
}

pub async fn delete_action_item(pool: &PgPool, id: Uuid) -> ServiceResult<bool> {
    let result = sqlx::query("DELETE FROM sqcdp.action_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(ServiceError::backend("failed to delete action item"))?;

    let deleted = result.rows_affected() > 0;
    info!(%id, deleted, "action item delete requested");
    Ok(deleted)
}

/// True when an item with the same pillar, creation date and description is
/// already stored.
pub async fn action_exists(pool: &PgPool, item: &NewActionItem) -> ServiceResult<bool> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM sqcdp.action_items
            WHERE pillar = $1 AND created_date = $2 AND description = $3
        ) AS present
        "#,
    )
    .bind(item.pillar.as_str())
    .bind(item.created_date)
    .bind(item.description.trim())
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to look up action item"))?;

    column(&row, "present")
}

fn action_from_row(row: &PgRow) -> ServiceResult<ActionItem> {
    let priority: String = column(row, "priority")?;
    let status: String = column(row, "status")?;
    Ok(ActionItem {
        id: column(row, "id")?,
        pillar: pillar_column(row)?,
        description: column(row, "description")?,
        assignee: column(row, "assignee")?,
        priority: priority.parse::<Priority>()?,
        status: status.parse::<ActionStatus>()?,
        created_date: column(row, "created_date")?,
        due_date: column(row, "due_date")?,
    })
}
