//! User repository: accounts, roles, profiles, and password reset tokens.

use chrono::{DateTime, Utc};

use vest_core::audit_detail::RoleChangedDetail;
use vest_core::entities::User;
use vest_core::enums::{AuditAction, EntityType, KycStatus, Role};
use vest_core::ids::{PREFIX_RESET, PREFIX_USER};
use vest_core::responses::Page;

use crate::error::{DatabaseError, conflict_on_unique};
use crate::helpers::{
    PageRequest, get_opt_string, opt_text, parse_datetime, parse_enum, require_text,
};
use crate::service::VestService;
use crate::updates::profile::ProfileUpdate;

const SELECT_COLS: &str = "id, name, email, phone, role, kyc_status, created_at, updated_at";

/// Input for [`VestService::create_user`]. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Filter for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub kyc_status: Option<KycStatus>,
}

fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: get_opt_string(row, 3)?,
        role: parse_enum(&row.get::<String>(4)?)?,
        kyc_status: parse_enum(&row.get::<String>(5)?)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

/// Trim and lowercase an email address, rejecting obviously malformed input.
///
/// # Errors
///
/// Returns `DatabaseError::Validation` unless the address has a non-empty
/// local part and a dotted domain with no whitespace.
pub fn normalize_email(email: &str) -> Result<String, DatabaseError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DatabaseError::Validation(format!("'{email}' is not a valid email address")));
    }
    Ok(email)
}

impl VestService {
    /// Register a user. New accounts start with `kyc_status = not_submitted`.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name or malformed email, `Conflict` when the
    /// email is already registered.
    pub async fn create_user(&self, new: NewUser) -> Result<User, DatabaseError> {
        let NewUser {
            name,
            email,
            phone,
            password_hash,
            role,
        } = new;
        let name = require_text("name", &name)?;
        let email = normalize_email(&email)?;
        let phone = phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        self.write(|| async move {
            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_USER).await?;

            self.db()
                .conn()
                .execute(
                    "INSERT INTO users (id, name, email, phone, password_hash, role, kyc_status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    libsql::params![
                        id.as_str(),
                        name.as_str(),
                        email.as_str(),
                        phone.as_deref(),
                        password_hash.as_str(),
                        role.as_str(),
                        KycStatus::NotSubmitted.as_str(),
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ],
                )
                .await
                .map_err(|e| conflict_on_unique(e, || format!("email {email} is already registered")))?;

            self.audit(Some(id.as_str()), EntityType::User, &id, AuditAction::Created, None, now)
                .await?;

            tracing::info!(user_id = %id, %role, "user created");
            Ok(User {
                id,
                name,
                email,
                phone,
                role,
                kyc_status: KycStatus::NotSubmitted,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    /// # Errors
    ///
    /// `NotFound` when no user has this id.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("user", id))?;
        row_to_user(&row)
    }

    /// Look up a user by email for login. Returns the user and the stored
    /// password hash, or `None` when the email is unknown.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, DatabaseError> {
        let email = email.trim().to_lowercase();
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS}, password_hash FROM users WHERE email = ?1"),
                [email.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some((row_to_user(&row)?, row.get::<String>(8)?))),
            None => Ok(None),
        }
    }

    /// Fetch the stored password hash for a user.
    ///
    /// # Errors
    ///
    /// `NotFound` when no user has this id.
    pub async fn password_hash(&self, user_id: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT password_hash FROM users WHERE id = ?1", [user_id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("user", user_id))?;
        Ok(row.get::<String>(0)?)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user, `Validation` for a blank name.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<User, DatabaseError> {
        if update.is_empty() {
            return self.get_user(user_id).await;
        }

        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1usize;

        if let Some(ref name) = update.name {
            sets.push(format!("name = ?{idx}"));
            params.push(require_text("name", name)?.into());
            idx += 1;
        }
        if let Some(ref phone) = update.phone {
            sets.push(format!("phone = ?{idx}"));
            let phone = phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
            params.push(opt_text(phone));
            idx += 1;
        }

        self.write(|| async move {
            self.get_user(user_id).await?;

            let now = Utc::now();
            sets.push(format!("updated_at = ?{idx}"));
            params.push(now.to_rfc3339().into());
            idx += 1;
            params.push(user_id.into());

            let sql = format!("UPDATE users SET {} WHERE id = ?{idx}", sets.join(", "));
            self.db()
                .conn()
                .execute(&sql, libsql::params_from_iter(params))
                .await?;

            self.audit(
                Some(user_id),
                EntityType::User,
                user_id,
                AuditAction::Updated,
                Some(serde_json::to_value(&update)?),
                now,
            )
            .await?;

            self.get_user(user_id).await
        })
        .await
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user.
    pub async fn set_password_hash(&self, user_id: &str, hash: &str) -> Result<(), DatabaseError> {
        self.write(|| async move { self.set_password_hash_inner(user_id, hash).await })
            .await
    }

    async fn set_password_hash_inner(&self, user_id: &str, hash: &str) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let changed = self
            .db()
            .conn()
            .execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![hash, now.to_rfc3339(), user_id],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("user", user_id));
        }
        self.audit(
            Some(user_id),
            EntityType::User,
            user_id,
            AuditAction::PasswordChanged,
            None,
            now,
        )
        .await?;
        tracing::info!(user_id, "password changed");
        Ok(())
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user, `InvalidState` when an admin demotes themselves.
    pub async fn set_role(
        &self,
        actor_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<User, DatabaseError> {
        self.write(|| async move {
            let current = self.get_user(user_id).await?;
            if current.role == role {
                return Ok(current);
            }
            if actor_id == user_id && role != Role::Admin {
                return Err(DatabaseError::InvalidState(
                    "administrators cannot remove their own admin role".into(),
                ));
            }

            let now = Utc::now();
            self.db()
                .conn()
                .execute(
                    "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
                    libsql::params![role.as_str(), now.to_rfc3339(), user_id],
                )
                .await?;

            let detail = RoleChangedDetail {
                from: current.role.as_str().to_string(),
                to: role.as_str().to_string(),
            };
            self.audit(
                Some(actor_id),
                EntityType::User,
                user_id,
                AuditAction::RoleChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(user_id, actor_id, role = %role, "role changed");
            Ok(User {
                role,
                updated_at: now,
                ..current
            })
        })
        .await
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(format!("%{}%", search.to_lowercase()).into());
            let n = params.len();
            conditions.push(format!("(lower(name) LIKE ?{n} OR email LIKE ?{n})"));
        }
        if let Some(role) = filter.role {
            params.push(role.as_str().into());
            conditions.push(format!("role = ?{}", params.len()));
        }
        if let Some(status) = filter.kyc_status {
            params.push(status.as_str().into());
            conditions.push(format!("kyc_status = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        self.fetch_page(
            &format!(
                "SELECT {SELECT_COLS} FROM users {where_clause} ORDER BY created_at DESC, rowid DESC"
            ),
            &format!("SELECT COUNT(*) FROM users {where_clause}"),
            params,
            page,
            row_to_user,
        )
        .await
    }

    /// Store the hash of a freshly issued reset token. Earlier unused tokens
    /// for the same user are invalidated.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user.
    pub async fn store_reset_token(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.write(|| async move {
            self.get_user(user_id).await?;
            let now = Utc::now();

            self.db()
                .conn()
                .execute(
                    "UPDATE password_resets SET used_at = ?1 WHERE user_id = ?2 AND used_at IS NULL",
                    libsql::params![now.to_rfc3339(), user_id],
                )
                .await?;

            let id = self.db().generate_id(PREFIX_RESET).await?;
            self.db()
                .conn()
                .execute(
                    "INSERT INTO password_resets (id, user_id, token_hash, expires_at, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    libsql::params![
                        id.as_str(),
                        user_id,
                        token_hash,
                        expires_at.to_rfc3339(),
                        now.to_rfc3339()
                    ],
                )
                .await?;
            Ok(())
        })
        .await
    }

    /// Mark a reset token used and return its user id.
    ///
    /// # Errors
    ///
    /// `Validation` when the token is unknown, already used, or expired.
    pub async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        self.write(|| async move { self.consume_reset_token_inner(token_hash, now).await })
            .await
    }

    /// Consume a reset token and set the new password hash in one transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::consume_reset_token`].
    pub async fn reset_password_with_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        self.write(|| async move {
            let user_id = self.consume_reset_token_inner(token_hash, now).await?;
            self.set_password_hash_inner(&user_id, new_password_hash)
                .await?;
            Ok(user_id)
        })
        .await
    }

    async fn consume_reset_token_inner(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let invalid = || DatabaseError::Validation("reset token is invalid or expired".into());

        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, user_id, expires_at, used_at FROM password_resets WHERE token_hash = ?1",
                [token_hash],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(invalid)?;
        let id: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let expires_at = parse_datetime(&row.get::<String>(2)?)?;
        if get_opt_string(&row, 3)?.is_some() || expires_at <= now {
            return Err(invalid());
        }

        self.db()
            .conn()
            .execute(
                "UPDATE password_resets SET used_at = ?1 WHERE id = ?2",
                libsql::params![now.to_rfc3339(), id.as_str()],
            )
            .await?;
        Ok(user_id)
    }

    /// Set a user's KYC status. Must run inside a write transaction.
    pub(crate) async fn set_kyc_status_inner(
        &self,
        user_id: &str,
        status: KycStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "UPDATE users SET kyc_status = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![status.as_str(), at.to_rfc3339(), user_id],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_admin, create_investor, test_service};
    use crate::updates::profile::ProfileUpdateBuilder;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[tokio::test]
    async fn create_user_normalizes_email() {
        let svc = test_service().await;
        let user = svc
            .create_user(NewUser {
                name: "  Ada Obi ".into(),
                email: "  Ada@Example.COM ".into(),
                phone: Some(" ".into()),
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await
            .unwrap();

        assert!(user.id.starts_with("usr-"));
        assert_eq!(user.name, "Ada Obi");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.phone, None);
        assert_eq!(user.kyc_status, KycStatus::NotSubmitted);
        assert_eq!(svc.get_user(&user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = test_service().await;
        create_investor(&svc, "ada@example.com").await;

        let result = svc
            .create_user(NewUser {
                name: "Other".into(),
                email: "ADA@example.com".into(),
                phone: None,
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
    }

    #[rstest]
    #[case("plain")]
    #[case("@example.com")]
    #[case("a@b")]
    #[case("a b@example.com")]
    #[case("a@@example.com")]
    fn malformed_emails_are_rejected(#[case] email: &str) {
        assert!(matches!(
            normalize_email(email),
            Err(DatabaseError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn find_user_by_email_returns_hash() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;

        let (found, hash) = svc
            .find_user_by_email(" ADA@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "test-hash");
        assert!(svc.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let svc = test_service().await;
        assert!(matches!(
            svc.get_user("usr-00000000").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_profile_partial() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;

        let updated = svc
            .update_profile(
                &user.id,
                ProfileUpdateBuilder::new()
                    .phone(Some("+234 800 000 0000".into()))
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+234 800 000 0000"));
        assert_eq!(updated.name, user.name);

        let cleared = svc
            .update_profile(&user.id, ProfileUpdateBuilder::new().phone(None).build())
            .await
            .unwrap();
        assert_eq!(cleared.phone, None);
    }

    #[tokio::test]
    async fn set_role_rejects_self_demotion() {
        let svc = test_service().await;
        let admin = create_admin(&svc).await;
        let result = svc.set_role(&admin.id, &admin.id, Role::User).await;
        assert!(matches!(result, Err(DatabaseError::InvalidState(_))));
    }

    #[tokio::test]
    async fn list_users_filters_and_pages() {
        let svc = test_service().await;
        create_admin(&svc).await;
        for i in 0..5 {
            create_investor(&svc, &format!("investor{i}@example.com")).await;
        }

        let page = svc
            .list_users(
                &UserFilter {
                    role: Some(Role::User),
                    ..Default::default()
                },
                PageRequest { page: 2, per_page: 2 },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);

        let search = svc
            .list_users(
                &UserFilter {
                    search: Some("INVESTOR3".into()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(search.total, 1);
        assert_eq!(search.items[0].email, "investor3@example.com");
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;
        let now = Utc::now();

        svc.store_reset_token(&user.id, "abc", now + Duration::hours(1))
            .await
            .unwrap();
        let uid = svc
            .reset_password_with_token("abc", "new-hash", now)
            .await
            .unwrap();
        assert_eq!(uid, user.id);
        assert_eq!(svc.password_hash(&user.id).await.unwrap(), "new-hash");

        let again = svc.consume_reset_token("abc", now).await;
        assert!(matches!(again, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;
        let now = Utc::now();

        svc.store_reset_token(&user.id, "old", now - Duration::minutes(1))
            .await
            .unwrap();
        let result = svc.consume_reset_token("old", now).await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn new_reset_token_invalidates_previous() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;
        let now = Utc::now();
        let later = now + Duration::hours(1);

        svc.store_reset_token(&user.id, "first", later).await.unwrap();
        svc.store_reset_token(&user.id, "second", later).await.unwrap();

        assert!(svc.consume_reset_token("first", now).await.is_err());
        assert_eq!(svc.consume_reset_token("second", now).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn failed_reset_leaves_password_untouched() {
        let svc = test_service().await;
        let user = create_investor(&svc, "ada@example.com").await;
        let result = svc
            .reset_password_with_token("missing", "new-hash", Utc::now())
            .await;
        assert!(result.is_err());
        assert_eq!(svc.password_hash(&user.id).await.unwrap(), "test-hash");
    }
}
