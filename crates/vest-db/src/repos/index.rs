//! Index repository: curated investment products and their lifecycle.

use chrono::Utc;

use vest_core::audit_detail::StatusChangedDetail;
use vest_core::entities::Index;
use vest_core::enums::{AuditAction, EntityType, IndexStatus, RiskLevel};
use vest_core::ids::PREFIX_INDEX;
use vest_core::money::BPS_SCALE;

use crate::error::{DatabaseError, conflict_on_unique};
use crate::helpers::{
    get_opt_string, get_u32, opt_text, parse_datetime, parse_enum, parse_optional_datetime,
    require_text,
};
use crate::service::VestService;
use crate::updates::index::IndexUpdate;

/// Columns plus the two aggregates computed over active investments.
const SELECT_COLS: &str = "i.id, i.name, i.slug, i.description, i.risk_level, \
     i.min_investment_cents, i.target_weekly_rate_bps, i.last_rate_bps, i.last_distributed_at, \
     i.status, \
     COALESCE((SELECT SUM(v.amount_cents) FROM investments v \
               WHERE v.index_id = i.id AND v.status = 'active'), 0), \
     (SELECT COUNT(DISTINCT v.user_id) FROM investments v \
      WHERE v.index_id = i.id AND v.status = 'active'), \
     i.created_at, i.updated_at";

/// Input for [`VestService::create_index`].
#[derive(Debug, Clone)]
pub struct NewIndex {
    pub name: String,
    pub description: Option<String>,
    pub risk_level: RiskLevel,
    pub min_investment_cents: i64,
    pub target_weekly_rate_bps: i64,
}

fn row_to_index(row: &libsql::Row) -> Result<Index, DatabaseError> {
    Ok(Index {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: get_opt_string(row, 3)?,
        risk_level: parse_enum(&row.get::<String>(4)?)?,
        min_investment_cents: row.get(5)?,
        target_weekly_rate_bps: row.get(6)?,
        last_rate_bps: row.get::<Option<i64>>(7)?,
        last_distributed_at: parse_optional_datetime(get_opt_string(row, 8)?.as_deref())?,
        status: parse_enum(&row.get::<String>(9)?)?,
        total_invested_cents: row.get(10)?,
        investor_count: get_u32(row, 11)?,
        created_at: parse_datetime(&row.get::<String>(12)?)?,
        updated_at: parse_datetime(&row.get::<String>(13)?)?,
    })
}

/// Derive a URL slug: lowercase ASCII alphanumeric runs joined by `-`.
///
/// `"Tech Growth 2026!"` → `"tech-growth-2026"`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn validate_terms(min_investment_cents: i64, target_weekly_rate_bps: i64) -> Result<(), DatabaseError> {
    if min_investment_cents <= 0 {
        return Err(DatabaseError::Validation(
            "min_investment_cents must be positive".into(),
        ));
    }
    if target_weekly_rate_bps.abs() > BPS_SCALE {
        return Err(DatabaseError::Validation(format!(
            "target_weekly_rate_bps must be within ±{BPS_SCALE}"
        )));
    }
    Ok(())
}

impl VestService {
    /// Create an `active` index.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name, a name without alphanumerics, or bad
    /// terms; `Conflict` when the slug is taken.
    pub async fn create_index(&self, actor_id: &str, new: NewIndex) -> Result<Index, DatabaseError> {
        let name = require_text("name", &new.name)?;
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(DatabaseError::Validation(
                "index name must contain letters or digits".into(),
            ));
        }
        validate_terms(new.min_investment_cents, new.target_weekly_rate_bps)?;
        let description = new
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        self.write(|| async move {
            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_INDEX).await?;
            self.db()
                .conn()
                .execute(
                    "INSERT INTO indices (id, name, slug, description, risk_level, min_investment_cents,
                                          target_weekly_rate_bps, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    libsql::params![
                        id.as_str(),
                        name.as_str(),
                        slug.as_str(),
                        description.as_deref(),
                        new.risk_level.as_str(),
                        new.min_investment_cents,
                        new.target_weekly_rate_bps,
                        IndexStatus::Active.as_str(),
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ],
                )
                .await
                .map_err(|e| conflict_on_unique(e, || format!("an index with slug '{slug}' already exists")))?;

            self.audit(Some(actor_id), EntityType::Index, &id, AuditAction::Created, None, now)
                .await?;

            tracing::info!(index_id = %id, %slug, "index created");
            Ok(Index {
                id,
                name,
                slug,
                description,
                risk_level: new.risk_level,
                min_investment_cents: new.min_investment_cents,
                target_weekly_rate_bps: new.target_weekly_rate_bps,
                last_rate_bps: None,
                last_distributed_at: None,
                status: IndexStatus::Active,
                total_invested_cents: 0,
                investor_count: 0,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    /// # Errors
    ///
    /// `NotFound` when no index has this id.
    pub async fn get_index(&self, id: &str) -> Result<Index, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM indices i WHERE i.id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("index", id))?;
        row_to_index(&row)
    }

    /// # Errors
    ///
    /// `NotFound` when no index has this slug.
    pub async fn get_index_by_slug(&self, slug: &str) -> Result<Index, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM indices i WHERE i.slug = ?1"), [slug])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("index", slug))?;
        row_to_index(&row)
    }

    /// Resolve an index by id, falling back to slug.
    ///
    /// # Errors
    ///
    /// `NotFound` when neither matches.
    pub async fn find_index(&self, id_or_slug: &str) -> Result<Index, DatabaseError> {
        match self.get_index(id_or_slug).await {
            Err(DatabaseError::NotFound { .. }) => self.get_index_by_slug(id_or_slug).await,
            other => other,
        }
    }

    /// List indices by name. Only `active` ones unless `include_inactive`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_indices(&self, include_inactive: bool) -> Result<Vec<Index>, DatabaseError> {
        let where_clause = if include_inactive {
            ""
        } else {
            "WHERE i.status = 'active'"
        };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM indices i {where_clause} ORDER BY i.name"),
                (),
            )
            .await?;
        let mut indices = Vec::new();
        while let Some(row) = rows.next().await? {
            indices.push(row_to_index(&row)?);
        }
        Ok(indices)
    }

    /// Apply a partial update. The slug never changes.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidState` for an archived index,
    /// `Validation` for bad terms.
    pub async fn update_index(
        &self,
        actor_id: &str,
        id: &str,
        update: IndexUpdate,
    ) -> Result<Index, DatabaseError> {
        if update.is_empty() {
            return self.get_index(id).await;
        }

        self.write(|| async move {
            let current = self.get_index(id).await?;
            if current.status == IndexStatus::Archived {
                return Err(DatabaseError::InvalidState(format!(
                    "index {id} is archived"
                )));
            }
            validate_terms(
                update.min_investment_cents.unwrap_or(current.min_investment_cents),
                update
                    .target_weekly_rate_bps
                    .unwrap_or(current.target_weekly_rate_bps),
            )?;

            let mut sets = Vec::new();
            let mut params: Vec<libsql::Value> = Vec::new();
            let mut idx = 1usize;

            if let Some(ref name) = update.name {
                sets.push(format!("name = ?{idx}"));
                params.push(require_text("name", name)?.into());
                idx += 1;
            }
            if let Some(ref description) = update.description {
                sets.push(format!("description = ?{idx}"));
                params.push(opt_text(
                    description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
                ));
                idx += 1;
            }
            if let Some(risk) = update.risk_level {
                sets.push(format!("risk_level = ?{idx}"));
                params.push(risk.as_str().into());
                idx += 1;
            }
            if let Some(min) = update.min_investment_cents {
                sets.push(format!("min_investment_cents = ?{idx}"));
                params.push(min.into());
                idx += 1;
            }
            if let Some(rate) = update.target_weekly_rate_bps {
                sets.push(format!("target_weekly_rate_bps = ?{idx}"));
                params.push(rate.into());
                idx += 1;
            }

            let now = Utc::now();
            sets.push(format!("updated_at = ?{idx}"));
            params.push(now.to_rfc3339().into());
            idx += 1;
            params.push(id.into());

            let sql = format!("UPDATE indices SET {} WHERE id = ?{idx}", sets.join(", "));
            self.db()
                .conn()
                .execute(&sql, libsql::params_from_iter(params))
                .await?;

            self.audit(
                Some(actor_id),
                EntityType::Index,
                id,
                AuditAction::Updated,
                Some(serde_json::to_value(&update)?),
                now,
            )
            .await?;

            self.get_index(id).await
        })
        .await
    }

    /// Move an index through its lifecycle (`active ↔ paused`, `→ archived`).
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidState` for a disallowed transition.
    pub async fn transition_index(
        &self,
        actor_id: &str,
        id: &str,
        new_status: IndexStatus,
    ) -> Result<Index, DatabaseError> {
        self.write(|| async move {
            let current = self.get_index(id).await?;
            if !current.status.can_transition_to(new_status) {
                return Err(DatabaseError::InvalidState(format!(
                    "Cannot transition index {id} from {} to {new_status}",
                    current.status
                )));
            }

            let now = Utc::now();
            self.db()
                .conn()
                .execute(
                    "UPDATE indices SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    libsql::params![new_status.as_str(), now.to_rfc3339(), id],
                )
                .await?;

            let detail = StatusChangedDetail {
                from: current.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
                reason: None,
            };
            self.audit(
                Some(actor_id),
                EntityType::Index,
                id,
                AuditAction::StatusChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(index_id = id, status = %new_status, "index status changed");
            Ok(Index {
                status: new_status,
                updated_at: now,
                ..current
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_admin, create_test_index, fund, test_service, verified_investor};
    use crate::updates::index::IndexUpdateBuilder;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Tech Growth", "tech-growth")]
    #[case("  Emerging   Markets 2026! ", "emerging-markets-2026")]
    #[case("S&P-Style (Large Cap)", "s-p-style-large-cap")]
    #[case("Énergie", "nergie")]
    #[case("!!!", "")]
    fn slugify_cases(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(slugify(name), expected);
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let index = create_test_index(&svc, &admin.id, "Tech Growth", 10_000).await;

        assert!(index.id.starts_with("idx-"));
        assert_eq!(index.slug, "tech-growth");
        assert_eq!(index.status, IndexStatus::Active);
        assert_eq!(svc.get_index(&index.id).await.unwrap(), index);
        assert_eq!(svc.get_index_by_slug("tech-growth").await.unwrap().id, index.id);
        assert_eq!(svc.find_index("tech-growth").await.unwrap().id, index.id);
        assert_eq!(svc.find_index(&index.id).await.unwrap().id, index.id);
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        create_test_index(&svc, &admin.id, "Tech Growth", 10_000).await;

        let result = svc
            .create_index(
                &admin.id,
                NewIndex {
                    name: "tech  GROWTH".into(),
                    description: None,
                    risk_level: RiskLevel::Low,
                    min_investment_cents: 1,
                    target_weekly_rate_bps: 100,
                },
            )
            .await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn non_positive_minimum_is_rejected() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let result = svc
            .create_index(
                &admin.id,
                NewIndex {
                    name: "Zero".into(),
                    description: None,
                    risk_level: RiskLevel::Low,
                    min_investment_cents: 0,
                    target_weekly_rate_bps: 100,
                },
            )
            .await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn aggregates_follow_active_investments() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let index = create_test_index(&svc, &admin.id, "Tech Growth", 10_000).await;
        let a = verified_investor(&svc, &admin.id, "a@example.com").await;
        let b = verified_investor(&svc, &admin.id, "b@example.com").await;

        fund(&svc, &admin.id, &a.id, &index.id, 50_000).await;
        fund(&svc, &admin.id, &a.id, &index.id, 20_000).await;
        let closing = fund(&svc, &admin.id, &b.id, &index.id, 30_000).await;

        let fetched = svc.get_index(&index.id).await.unwrap();
        assert_eq!(fetched.total_invested_cents, 100_000);
        assert_eq!(fetched.investor_count, 2);

        svc.close_investment(&admin.id, &closing.id).await.unwrap();
        let fetched = svc.get_index(&index.id).await.unwrap();
        assert_eq!(fetched.total_invested_cents, 70_000);
        assert_eq!(fetched.investor_count, 1);
    }

    #[tokio::test]
    async fn update_keeps_slug() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let index = create_test_index(&svc, &admin.id, "Tech Growth", 10_000).await;

        let updated = svc
            .update_index(
                &admin.id,
                &index.id,
                IndexUpdateBuilder::new()
                    .name("Tech Growth II")
                    .description(Some("Refreshed basket".into()))
                    .min_investment_cents(25_000)
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Tech Growth II");
        assert_eq!(updated.slug, "tech-growth");
        assert_eq!(updated.description.as_deref(), Some("Refreshed basket"));
        assert_eq!(updated.min_investment_cents, 25_000);
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let index = create_test_index(&svc, &admin.id, "Tech Growth", 10_000).await;

        let paused = svc
            .transition_index(&admin.id, &index.id, IndexStatus::Paused)
            .await
            .unwrap();
        assert_eq!(paused.status, IndexStatus::Paused);
        assert!(svc.list_indices(false).await.unwrap().is_empty());
        assert_eq!(svc.list_indices(true).await.unwrap().len(), 1);

        svc.transition_index(&admin.id, &index.id, IndexStatus::Archived)
            .await
            .unwrap();
        let revive = svc
            .transition_index(&admin.id, &index.id, IndexStatus::Active)
            .await;
        assert!(matches!(revive, Err(DatabaseError::InvalidState(_))));

        let edit = svc
            .update_index(&admin.id, &index.id, IndexUpdateBuilder::new().name("X").build())
            .await;
        assert!(matches!(edit, Err(DatabaseError::InvalidState(_))));
    }
}
