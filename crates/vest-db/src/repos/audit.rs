//! Audit trail repository.
//!
//! Append-only audit entries recording every mutation, with dynamic filtering.

use vest_core::entities::AuditEntry;
use vest_core::enums::{AuditAction, EntityType};

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::VestService;

/// Filter criteria for audit queries.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

fn row_to_audit(row: &libsql::Row) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: row.get::<String>(0)?,
        actor_id: get_opt_string(row, 1)?,
        entity_type: parse_enum(&row.get::<String>(2)?)?,
        entity_id: row.get::<String>(3)?,
        action: parse_enum(&row.get::<String>(4)?)?,
        detail: parse_optional_json(get_opt_string(row, 5)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl VestService {
    /// Append an audit entry. Called by every mutation method.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn append_audit(&self, entry: &AuditEntry) -> Result<(), DatabaseError> {
        let detail = entry.detail.as_ref().map(ToString::to_string);
        self.db()
            .conn()
            .execute(
                "INSERT INTO audit_trail (id, actor_id, entity_type, entity_id, action, detail, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    entry.id.as_str(),
                    entry.actor_id.as_deref(),
                    entry.entity_type.as_str(),
                    entry.entity_id.as_str(),
                    entry.action.as_str(),
                    detail.as_deref(),
                    entry.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Query audit entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(et) = filter.entity_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(ref actor) = filter.actor_id {
            params.push(libsql::Value::Text(actor.clone()));
            conditions.push(format!("actor_id = ?{}", params.len()));
        }
        if let Some(action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT id, actor_id, entity_type, entity_id, action, detail, created_at
             FROM audit_trail {where_clause}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_audit(&row)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_admin, create_investor, test_service};

    #[tokio::test]
    async fn create_user_is_audited() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;

        let entries = svc
            .query_audit(&AuditFilter {
                entity_id: Some(user.id.clone()),
                action: Some(AuditAction::Created),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, EntityType::User);
    }

    #[tokio::test]
    async fn filter_by_actor() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let user = create_investor(&svc, "ada@example.com").await;

        svc.set_role(&admin.id, &user.id, vest_core::enums::Role::Admin)
            .await
            .unwrap();

        let entries = svc
            .query_audit(&AuditFilter {
                actor_id: Some(admin.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::RoleChanged);
        let detail = entries[0].detail.as_ref().unwrap();
        assert_eq!(detail["from"], "user");
        assert_eq!(detail["to"], "admin");
    }

    #[tokio::test]
    async fn limit_is_applied() {
        let svc = test_service().await;
        for i in 0..5 {
            create_investor(&svc, &format!("u{i}@example.com")).await;
        }
        let entries = svc
            .query_audit(&AuditFilter {
                limit: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
    }
}
