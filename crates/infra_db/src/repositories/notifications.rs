//! Notification inbox repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// A row of the `notifications` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub notification_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: String,
    pub related_claim_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &NotificationRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                notification_id, recipient_id, title, message, category,
                related_claim_id, is_read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.notification_id)
        .bind(row.recipient_id)
        .bind(&row.title)
        .bind(&row.message)
        .bind(&row.category)
        .bind(row.related_claim_id)
        .bind(row.is_read)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Newest first
    pub async fn recent_for(&self, recipient_id: Uuid, limit: i64) -> Result<Vec<NotificationRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT notification_id, recipient_id, title, message, category,
                   related_claim_id, is_read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
