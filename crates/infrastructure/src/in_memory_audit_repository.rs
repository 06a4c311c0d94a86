use async_trait::async_trait;
use chrono::Utc;
use orgrole_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use orgrole_core::AppResult;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory audit log; appends and reads the same entries.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Returns the number of recorded entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether nothing has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.entries.write().await.push(AuditLogEntry {
            event_id: Uuid::new_v4().to_string(),
            actor: event.actor,
            action: event.action.as_str().to_owned(),
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            detail: event.detail,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;

        Ok(entries
            .iter()
            .rev()
            .filter(|entry| {
                query
                    .action
                    .is_none_or(|action| entry.action == action.as_str())
            })
            .filter(|entry| query.actor.is_none_or(|actor| entry.actor == actor))
            .skip(query.offset.min(5_000))
            .take(query.limit.clamp(1, 200))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use orgrole_application::{AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository};
    use orgrole_core::UserId;
    use orgrole_domain::AuditAction;

    use super::InMemoryAuditRepository;

    fn event(actor: UserId, action: AuditAction, resource_id: &str) -> AuditEvent {
        AuditEvent {
            actor,
            action,
            resource_type: "role".to_owned(),
            resource_id: resource_id.to_owned(),
            detail: None,
        }
    }

    #[tokio::test]
    async fn list_recent_entries_returns_newest_first_with_filters() {
        let repository = InMemoryAuditRepository::new();
        let actor = UserId::new();
        let other = UserId::new();

        for value in [
            event(actor, AuditAction::SecurityRoleCreated, "first"),
            event(other, AuditAction::SecurityRoleCreated, "second"),
            event(actor, AuditAction::SecurityRoleDeleted, "third"),
            event(actor, AuditAction::SecurityRoleCreated, "fourth"),
        ] {
            assert!(repository.append_event(value).await.is_ok());
        }

        let by_actor = repository
            .list_recent_entries(AuditLogQuery {
                limit: 10,
                offset: 0,
                action: Some(AuditAction::SecurityRoleCreated),
                actor: Some(actor),
            })
            .await
            .unwrap_or_default();
        let ids: Vec<&str> = by_actor
            .iter()
            .map(|entry| entry.resource_id.as_str())
            .collect();
        assert_eq!(ids, ["fourth", "first"]);

        let paged = repository
            .list_recent_entries(AuditLogQuery {
                limit: 2,
                offset: 1,
                action: None,
                actor: None,
            })
            .await
            .unwrap_or_default();
        let ids: Vec<&str> = paged
            .iter()
            .map(|entry| entry.resource_id.as_str())
            .collect();
        assert_eq!(ids, ["third", "second"]);
    }
}
