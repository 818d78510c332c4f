use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use time::OffsetDateTime;
use tracing::debug;

use super::{
    claims::{Claims, TokenKind, TokenPayload},
    duration,
};
use crate::{config::JwtConfig, state::AppState};

/// Why a token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("unexpected token kind")]
    WrongKind,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidSignature,
        }
    }
}

/// A signed token together with its expiration metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_expires_in: String,
    refresh_expires_in: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_expires_in: cfg.expires_in.clone(),
            refresh_expires_in: cfg.refresh_expires_in.clone(),
        }
    }

    fn sign_with_kind(
        &self,
        payload: &TokenPayload,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssuedToken> {
        let expires_in = match kind {
            TokenKind::Access => &self.access_expires_in,
            TokenKind::Refresh => &self.refresh_expires_in,
        };
        let expires_at = duration::expires_at(now, expires_in);
        let claims = Claims {
            payload: payload.clone(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = payload.user_id, kind = ?kind, "jwt signed");
        Ok(IssuedToken {
            token,
            expires_in: expires_in.clone(),
            expires_at,
        })
    }

    pub fn sign_access(&self, payload: &TokenPayload) -> anyhow::Result<IssuedToken> {
        self.sign_access_at(payload, OffsetDateTime::now_utc())
    }

    pub fn sign_access_at(
        &self,
        payload: &TokenPayload,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssuedToken> {
        self.sign_with_kind(payload, TokenKind::Access, now)
    }

    pub fn sign_refresh(&self, payload: &TokenPayload) -> anyhow::Result<IssuedToken> {
        self.sign_refresh_at(payload, OffsetDateTime::now_utc())
    }

    pub fn sign_refresh_at(
        &self,
        payload: &TokenPayload,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssuedToken> {
        self.sign_with_kind(payload, TokenKind::Refresh, now)
    }

    /// Access and refresh token sharing one issuance instant.
    pub fn issue_pair(&self, payload: &TokenPayload) -> anyhow::Result<TokenPair> {
        self.issue_pair_at(payload, OffsetDateTime::now_utc())
    }

    pub fn issue_pair_at(
        &self,
        payload: &TokenPayload,
        now: OffsetDateTime,
    ) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access: self.sign_access_at(payload, now)?,
            refresh: self.sign_refresh_at(payload, now)?,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature, issuer and audience, then expiry against `now`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if now.unix_timestamp() >= data.claims.exp {
            debug!(user_id = data.claims.payload.user_id, "jwt expired");
            return Err(TokenError::Expired);
        }
        debug!(user_id = data.claims.payload.user_id, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_refresh_at(token, OffsetDateTime::now_utc())
    }

    pub fn verify_refresh_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let claims = self.verify_at(token, now)?;
        if claims.kind != TokenKind::Refresh {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}
