//! In-app inbox backed by the `notifications` table

use async_trait::async_trait;
use tracing::instrument;

use core_kernel::{ClaimId, DomainPort, NotificationId, PartyId, PortError};
use domain_claims::{Notification, NotificationCategory, Notifier};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;
use crate::repositories::notifications::{NotificationRepository, NotificationRow};

/// Default page size for inbox reads
pub const INBOX_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct PostgresNotifier {
    repository: NotificationRepository,
}

impl PostgresNotifier {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            repository: NotificationRepository::new(pool),
        }
    }

    /// Latest notifications for a party, newest first
    pub async fn recent_for(&self, recipient: PartyId, limit: i64) -> Result<Vec<Notification>, PortError> {
        self.repository
            .recent_for(recipient.into(), limit)
            .await?
            .into_iter()
            .map(|row| notification_from_row(row).map_err(PortError::from))
            .collect()
    }
}

impl DomainPort for PostgresNotifier {}

#[async_trait]
impl Notifier for PostgresNotifier {
    #[instrument(skip(self, notification), fields(recipient = %notification.recipient, category = %notification.category.as_str()))]
    async fn notify(&self, notification: Notification) -> Result<(), PortError> {
        let row = NotificationRow {
            notification_id: notification.id.into(),
            recipient_id: notification.recipient.into(),
            title: notification.title,
            message: notification.message,
            category: notification.category.as_str().to_string(),
            related_claim_id: notification.related_claim.into(),
            is_read: false,
            created_at: notification.created_at,
        };
        Ok(self.repository.insert(&row).await?)
    }
}

fn notification_from_row(row: NotificationRow) -> Result<Notification, DatabaseError> {
    let category = row
        .category
        .parse::<NotificationCategory>()
        .map_err(|e| DatabaseError::corrupt("notifications.category", e))?;
    Ok(Notification {
        id: NotificationId::from(row.notification_id),
        recipient: PartyId::from(row.recipient_id),
        title: row.title,
        message: row.message,
        category,
        related_claim: ClaimId::from(row.related_claim_id),
        created_at: row.created_at,
    })
}
