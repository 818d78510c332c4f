//! Session lifecycle: login, refresh, profile and logout.
//!
//! The service owns no state of its own; it is handed the user store and
//! the signing keys when constructed. Store faults are logged and turned
//! into a fixed 500 message per operation.

use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};

use super::{
    claims::TokenPayload,
    jwt::{IssuedToken, JwtKeys, TokenPair},
    password::verify_password,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{repo::UserStore, repo_types::User},
    validation::normalize_email,
};

pub const LOGOUT_MESSAGE: &str = "Logged out successfully";

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl FromRef<AppState> for SessionService {
    fn from_ref(state: &AppState) -> Self {
        SessionService::new(state.users.clone(), JwtKeys::from_ref(state))
    }
}

impl SessionService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        let email = normalize_email(email);

        let user = match self.users.find_by_email(&email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(email = %email, "login unknown email");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(AppError::internal("Login failed", e)),
        };

        if !verify_password(password, &user.password_hash) {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let payload = TokenPayload {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        };
        let tokens = self
            .keys
            .issue_pair(&payload)
            .map_err(|e| AppError::internal("Login failed", e))?;

        info!(user_id = user.id, username = %user.username, "user logged in");
        Ok(LoginOutcome { user, tokens })
    }

    /// Mints a new access token; the refresh token itself is not rotated.
    pub fn refresh(&self, refresh_token: &str) -> AppResult<IssuedToken> {
        let claims = self.keys.verify_refresh(refresh_token).map_err(|e| {
            warn!(reason = %e, "refresh rejected");
            AppError::InvalidToken
        })?;

        let access = self
            .keys
            .sign_access(&claims.payload)
            .map_err(|e| AppError::internal("Token refresh failed", e))?;

        info!(user_id = claims.payload.user_id, "access token refreshed");
        Ok(access)
    }

    pub async fn profile(&self, principal: &TokenPayload) -> AppResult<User> {
        self.users
            .find_by_id(principal.user_id)
            .await
            .map_err(|e| AppError::internal("Failed to get user profile", e))?
            .ok_or_else(|| {
                warn!(user_id = principal.user_id, "profile for missing user");
                AppError::UserNotFound
            })
    }

    /// Nothing is invalidated server-side: tokens stay valid until they expire.
    pub fn logout(&self, principal: &TokenPayload) -> &'static str {
        info!(user_id = principal.user_id, "user logged out");
        LOGOUT_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{claims::TokenKind, password::hash_password},
        config::JwtConfig,
        users::{
            memory::MemoryUserStore,
            repo::{StoreError, StoreResult},
            repo_types::{NewUser, UserChanges},
        },
    };
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use time::{Duration, OffsetDateTime};

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "session-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            expires_in: "24h".into(),
            refresh_expires_in: "7d".into(),
        })
    }

    async fn service_with_user() -> (SessionService, Arc<MemoryUserStore>, User) {
        let store = Arc::new(MemoryUserStore::new());
        let user = store
            .create(NewUser {
                username: "ada".into(),
                email: "ada@example.com".into(),
                password_hash: hash_password("secret123").expect("hash"),
            })
            .await
            .expect("create");
        (SessionService::new(store.clone(), keys()), store, user)
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn list(&self) -> StoreResult<Vec<User>> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn find_by_id(&self, _id: i64) -> StoreResult<Option<User>> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn create(&self, _new: NewUser) -> StoreResult<User> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn update(&self, _id: i64, _changes: UserChanges) -> StoreResult<Option<User>> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn delete(&self, _id: i64) -> StoreResult<bool> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn count(&self) -> StoreResult<i64> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
        async fn ping(&self) -> StoreResult<()> {
            Err(StoreError::Backend(anyhow::anyhow!("db down")))
        }
    }

    #[tokio::test]
    async fn login_issues_pair_for_the_user() {
        let (svc, _, user) = service_with_user().await;
        let outcome = svc.login("ada@example.com", "secret123").await.expect("login");
        assert_eq!(outcome.user.id, user.id);

        let access = keys().verify(&outcome.tokens.access.token).expect("access");
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(access.payload.user_id, user.id);
        assert_eq!(access.payload.email, "ada@example.com");
        assert_eq!(access.payload.username, "ada");

        let refresh = keys()
            .verify_refresh(&outcome.tokens.refresh.token)
            .expect("refresh");
        assert_eq!(refresh.payload, access.payload);

        assert_eq!(outcome.tokens.access.expires_in, "24h");
        assert_eq!(outcome.tokens.refresh.expires_in, "7d");
        assert_eq!(
            outcome.tokens.refresh.expires_at - outcome.tokens.access.expires_at,
            Duration::days(6)
        );
    }

    #[tokio::test]
    async fn login_with_out_of_range_expiry_falls_back_to_a_day() {
        let (_, store, _) = service_with_user().await;
        let keys = JwtKeys::new(&JwtConfig {
            secret: "session-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            expires_in: "3000000d".into(),
            refresh_expires_in: "3000000d".into(),
        });
        let svc = SessionService::new(store, keys.clone());

        let before = OffsetDateTime::now_utc();
        let outcome = svc.login("ada@example.com", "secret123").await.expect("login");
        let lifetime = outcome.tokens.access.expires_at - before;
        assert!(lifetime >= Duration::days(1));
        assert!(lifetime <= Duration::days(1) + Duration::minutes(1));
        assert!(keys.verify_access(&outcome.tokens.access.token).is_ok());
    }

    #[tokio::test]
    async fn login_normalizes_email() {
        let (svc, _, _) = service_with_user().await;
        assert!(svc.login("  ADA@example.com ", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (svc, _, _) = service_with_user().await;
        let wrong = svc.login("ada@example.com", "secret124").await.unwrap_err();
        let unknown = svc.login("a@b.com", "secret123").await.unwrap_err();
        let empty = svc.login("", "").await.unwrap_err();
        for err in [wrong, unknown, empty] {
            assert!(matches!(err, AppError::InvalidCredentials));
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.to_string(), "Invalid email or password");
        }
    }

    #[tokio::test]
    async fn store_fault_is_an_internal_failure() {
        let svc = SessionService::new(Arc::new(BrokenStore), keys());
        let err = svc.login("ada@example.com", "secret123").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Login failed");

        let principal = TokenPayload {
            user_id: 1,
            email: "ada@example.com".into(),
            username: "ada".into(),
        };
        let err = svc.profile(&principal).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to get user profile");
    }

    #[tokio::test]
    async fn refresh_mints_access_token_from_refresh_claims() {
        let (svc, _, user) = service_with_user().await;
        let outcome = svc.login("ada@example.com", "secret123").await.expect("login");
        let access = svc.refresh(&outcome.tokens.refresh.token).expect("refresh");
        assert_eq!(access.expires_in, "24h");
        let claims = keys().verify_access(&access.token).expect("new access");
        assert_eq!(claims.payload.user_id, user.id);
    }

    #[tokio::test]
    async fn refresh_rejects_bad_tokens() {
        let (svc, _, _) = service_with_user().await;
        let outcome = svc.login("ada@example.com", "secret123").await.expect("login");
        let payload = TokenPayload {
            user_id: 1,
            email: "ada@example.com".into(),
            username: "ada".into(),
        };

        let mut tampered = outcome.tokens.refresh.token.clone();
        tampered.push('x');
        let expired = keys()
            .sign_refresh_at(&payload, OffsetDateTime::now_utc() - Duration::days(8))
            .expect("sign");
        let foreign = JwtKeys::new(&JwtConfig {
            secret: "other-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            expires_in: "24h".into(),
            refresh_expires_in: "7d".into(),
        })
        .sign_refresh(&payload)
        .expect("sign");

        for token in [
            tampered,
            expired.token,
            foreign.token,
            outcome.tokens.access.token.clone(),
            "garbage".to_string(),
        ] {
            let err = svc.refresh(&token).unwrap_err();
            assert!(matches!(err, AppError::InvalidToken));
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn profile_of_deleted_user_is_not_found() {
        let (svc, store, user) = service_with_user().await;
        let principal = TokenPayload {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        };
        assert_eq!(svc.profile(&principal).await.expect("profile").id, user.id);

        store.delete(user.id).await.expect("delete");
        let err = svc.profile(&principal).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_always_succeeds() {
        let (svc, _, user) = service_with_user().await;
        let principal = TokenPayload {
            user_id: user.id,
            email: user.email,
            username: user.username,
        };
        assert_eq!(svc.logout(&principal), "Logged out successfully");
    }
}
