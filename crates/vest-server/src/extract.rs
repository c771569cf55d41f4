//! Request extractors: authenticated callers, JSON bodies, pagination.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use vest_core::entities::User;
use vest_core::enums::Role;
use vest_db::error::DatabaseError;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller behind a valid bearer token.
///
/// The user row is reloaded on every request, so a role change or a deleted
/// account takes effect immediately rather than when the token expires.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// An authenticated caller whose current role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;
        let token = vest_auth::bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".into()))?;
        let claims = state.signer().verify(token)?;

        match state.service().get_user(&claims.user_id).await {
            Ok(user) => Ok(Self(user)),
            Err(DatabaseError::NotFound { .. }) => {
                Err(ApiError::Unauthorized("account no longer exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// `Json<T>` whose rejection renders as an [`ApiError`].
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejection renders as an [`ApiError`].
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `?page=&per_page=`, clamped by [`AppState::page`].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);
        let null: Patch = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(null.phone, Some(None));
        let set: Patch = serde_json::from_str(r#"{"phone": "+1"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("+1".into())));
    }
}
