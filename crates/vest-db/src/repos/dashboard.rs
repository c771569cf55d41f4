//! Read-only aggregates for the investor dashboard and the admin overview.

use vest_core::entities::ReturnEntry;
use vest_core::responses::{PlatformStats, PortfolioSummary};

use crate::error::DatabaseError;
use crate::repos::investment::row_to_return;
use crate::service::VestService;

/// Return entries shown on the dashboard.
pub const RECENT_RETURNS_LIMIT: u32 = 10;

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl VestService {
    /// Balance, counts and the latest credited returns for one user.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn portfolio_summary(&self, user_id: &str) -> Result<PortfolioSummary, DatabaseError> {
        let balance = self.balance_for_user(user_id).await?;
        let active_investments = self
            .scalar_i64(
                "SELECT COUNT(*) FROM investments WHERE user_id = ?1 AND status = 'active'",
                [user_id],
            )
            .await?;
        let pending_payments = self
            .scalar_i64(
                "SELECT COUNT(*) FROM payment_requests WHERE user_id = ?1 AND status = 'pending'",
                [user_id],
            )
            .await?;
        let pending_withdrawals = self
            .scalar_i64(
                "SELECT COUNT(*) FROM withdrawals WHERE user_id = ?1 AND status IN ('pending', 'approved')",
                [user_id],
            )
            .await?;

        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT r.id, r.investment_id, r.distribution_id, r.period, r.rate_bps,
                            r.amount_cents, r.created_at
                     FROM return_entries r JOIN investments i ON i.id = r.investment_id
                     WHERE i.user_id = ?1
                     ORDER BY r.created_at DESC, r.rowid DESC
                     LIMIT {RECENT_RETURNS_LIMIT}"
                ),
                [user_id],
            )
            .await?;
        let mut recent_returns: Vec<ReturnEntry> = Vec::new();
        while let Some(row) = rows.next().await? {
            recent_returns.push(row_to_return(&row)?);
        }

        Ok(PortfolioSummary {
            balance,
            active_investments: to_u32(active_investments),
            pending_payments: to_u32(pending_payments),
            pending_withdrawals: to_u32(pending_withdrawals),
            recent_returns,
        })
    }

    /// Platform-wide counts and totals for the admin overview.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn platform_stats(&self) -> Result<PlatformStats, DatabaseError> {
        let count = |sql: &'static str| async move { self.scalar_i64(sql, ()).await };

        Ok(PlatformStats {
            total_users: to_u64(count("SELECT COUNT(*) FROM users").await?),
            kyc_pending: to_u64(
                count("SELECT COUNT(*) FROM kyc_submissions WHERE status = 'pending'").await?,
            ),
            active_indices: to_u64(
                count("SELECT COUNT(*) FROM indices WHERE status = 'active'").await?,
            ),
            assets_under_management_cents: count(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM investments WHERE status = 'active'",
            )
            .await?,
            total_returns_distributed_cents: count(
                "SELECT COALESCE(SUM(total_amount_cents), 0) FROM distributions",
            )
            .await?,
            pending_payments: to_u64(
                count("SELECT COUNT(*) FROM payment_requests WHERE status = 'pending'").await?,
            ),
            pending_withdrawals: to_u64(
                count("SELECT COUNT(*) FROM withdrawals WHERE status = 'pending'").await?,
            ),
        })
    }
}
