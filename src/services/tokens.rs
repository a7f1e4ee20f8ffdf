use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Clock-skew tolerance for expiry checks, in seconds.
const VALIDATION_LEEWAY_SECS: u64 = 5;

/// Discriminates the two credential kinds so one can never stand in for
/// the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Session,
}

/// Claims carried by both token kinds.
///
/// `jti` makes every minted token unique, so rotation always produces a
/// session token that differs from the one it replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// Unique token id.
    pub jti: Uuid,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Which credential this token is.
    pub token_type: TokenKind,
}

/// The access/session token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub session_token: String,
}

/// Signing/verification material plus lifetimes, built once at startup.
#[derive(Clone)]
pub struct TokenKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    access_ttl: Duration,
    session_ttl: Duration,
}

impl TokenKeys {
    pub fn new(
        access_secret: &[u8],
        session_secret: &[u8],
        access_ttl: Duration,
        session_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            session_encoding: EncodingKey::from_secret(session_secret),
            session_decoding: DecodingKey::from_secret(session_secret),
            access_ttl,
            session_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.access_token_secret,
            &config.session_token_secret,
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.session_token_ttl_days),
        )
    }

    fn encoding(&self, kind: TokenKind) -> &EncodingKey {
        match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Session => &self.session_encoding,
        }
    }

    fn decoding(&self, kind: TokenKind) -> &DecodingKey {
        match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Session => &self.session_decoding,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Session => self.session_ttl,
        }
    }
}

/// Persistence seam for the single live session-token value per identity.
///
/// Implemented by the Postgres pool (see `repositories::user`) and by an
/// in-memory double in tests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The currently persisted session token, if any.
    async fn session_token(&self, user_id: Uuid) -> Result<Option<String>>;

    /// Unconditionally stores a new session token. Returns false when the
    /// identity does not exist.
    async fn store_session_token(&self, user_id: Uuid, token: &str) -> Result<bool>;

    /// Compare-and-swap: replaces `current` with `next` only if `current`
    /// is still the persisted value. Returns false on a lost race.
    async fn swap_session_token(&self, user_id: Uuid, current: &str, next: &str) -> Result<bool>;

    /// Clears the persisted session token (logout).
    async fn clear_session_token(&self, user_id: Uuid) -> Result<()>;
}

fn mint(keys: &TokenKeys, kind: TokenKind, user_id: Uuid) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        jti: Uuid::new_v4(),
        iat: now.timestamp(),
        exp: (now + keys.ttl(kind)).timestamp(),
        token_type: kind,
    };

    encode(&Header::new(Algorithm::HS256), &claims, keys.encoding(kind))
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
}

fn decode_token(keys: &TokenKeys, kind: TokenKind, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = VALIDATION_LEEWAY_SECS;

    let data = decode::<Claims>(token, keys.decoding(kind), &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        }
    })?;

    if data.claims.token_type != kind {
        return Err(AppError::InvalidToken);
    }

    Ok(data.claims)
}

/// Mints a fresh token pair and persists the session token.
///
/// Tokens are never returned unless the store also knows the session
/// value; a silent store miss here would leave a usable session token the
/// server could not later recognize as current.
pub async fn issue<S: SessionStore + ?Sized>(
    keys: &TokenKeys,
    store: &S,
    user_id: Uuid,
) -> Result<TokenPair> {
    let access_token = mint(keys, TokenKind::Access, user_id)?;
    let session_token = mint(keys, TokenKind::Session, user_id)?;

    if !store.store_session_token(user_id, &session_token).await? {
        return Err(AppError::Persistence(
            "Session token was not recorded".to_string(),
        ));
    }

    tracing::debug!("🔑 Issued token pair for user: {}", user_id);
    Ok(TokenPair {
        access_token,
        session_token,
    })
}

/// Rotates a session token, returning a fresh pair and the user id.
///
/// A presented token is valid only while it matches the persisted value
/// byte-for-byte; anything else (stale rotation, post-logout replay, or a
/// lost compare-and-swap race) is reported as `TokenReuse`.
pub async fn refresh<S: SessionStore + ?Sized>(
    keys: &TokenKeys,
    store: &S,
    presented: &str,
) -> Result<(TokenPair, Uuid)> {
    let claims = decode_token(keys, TokenKind::Session, presented)?;

    let persisted = match store.session_token(claims.sub).await {
        Ok(value) => value,
        // Signed token for an identity that no longer exists.
        Err(AppError::NotFound) => return Err(AppError::InvalidToken),
        Err(e) => return Err(e),
    };

    let Some(persisted) = persisted else {
        return Err(AppError::TokenReuse);
    };

    if !bool::from(presented.as_bytes().ct_eq(persisted.as_bytes())) {
        return Err(AppError::TokenReuse);
    }

    let access_token = mint(keys, TokenKind::Access, claims.sub)?;
    let session_token = mint(keys, TokenKind::Session, claims.sub)?;

    if !store
        .swap_session_token(claims.sub, presented, &session_token)
        .await?
    {
        return Err(AppError::TokenReuse);
    }

    tracing::debug!("🔁 Rotated session token for user: {}", claims.sub);
    Ok((
        TokenPair {
            access_token,
            session_token,
        },
        claims.sub,
    ))
}

/// Validates an access token. Stateless: signature and expiry only, no
/// store lookup.
pub fn validate_access(keys: &TokenKeys, token: &str) -> Result<Claims> {
    decode_token(keys, TokenKind::Access, token)
}

/// Clears the persisted session token (logout).
///
/// Outstanding access tokens stay valid until natural expiry; there is no
/// revocation list for them.
pub async fn revoke<S: SessionStore + ?Sized>(store: &S, user_id: Uuid) -> Result<()> {
    store.clear_session_token(user_id).await?;
    tracing::debug!("🚪 Session revoked for user: {}", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemStore {
        known_users: Vec<Uuid>,
        tokens: Mutex<HashMap<Uuid, String>>,
    }

    impl MemStore {
        fn with_user(user_id: Uuid) -> Self {
            Self {
                known_users: vec![user_id],
                tokens: Mutex::new(HashMap::new()),
            }
        }

        fn empty() -> Self {
            Self {
                known_users: Vec::new(),
                tokens: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl SessionStore for MemStore {
        async fn session_token(&self, user_id: Uuid) -> Result<Option<String>> {
            if !self.known_users.contains(&user_id) {
                return Err(AppError::NotFound);
            }
            Ok(self.tokens.lock().unwrap().get(&user_id).cloned())
        }

        async fn store_session_token(&self, user_id: Uuid, token: &str) -> Result<bool> {
            if !self.known_users.contains(&user_id) {
                return Ok(false);
            }
            self.tokens.lock().unwrap().insert(user_id, token.to_string());
            Ok(true)
        }

        async fn swap_session_token(
            &self,
            user_id: Uuid,
            current: &str,
            next: &str,
        ) -> Result<bool> {
            let mut tokens = self.tokens.lock().unwrap();
            match tokens.get(&user_id) {
                Some(value) if value == current => {
                    tokens.insert(user_id, next.to_string());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn clear_session_token(&self, user_id: Uuid) -> Result<()> {
            self.tokens.lock().unwrap().remove(&user_id);
            Ok(())
        }
    }

    fn test_keys() -> TokenKeys {
        TokenKeys::new(
            b"0123456789abcdef0123456789abcdef",
            b"fedcba9876543210fedcba9876543210",
            Duration::minutes(15),
            Duration::days(10),
        )
    }

    #[tokio::test]
    async fn issued_session_token_refreshes_exactly_once() {
        let keys = test_keys();
        let user = Uuid::new_v4();
        let store = MemStore::with_user(user);

        let pair = issue(&keys, &store, user).await.unwrap();

        let (rotated, sub) = refresh(&keys, &store, &pair.session_token).await.unwrap();
        assert_eq!(sub, user);
        assert_ne!(rotated.session_token, pair.session_token);

        let replay = refresh(&keys, &store, &pair.session_token).await;
        assert!(matches!(replay, Err(AppError::TokenReuse)));
    }

    #[tokio::test]
    async fn every_refresh_returns_a_different_session_token() {
        let keys = test_keys();
        let user = Uuid::new_v4();
        let store = MemStore::with_user(user);

        let mut current = issue(&keys, &store, user).await.unwrap().session_token;
        for _ in 0..5 {
            let (pair, _) = refresh(&keys, &store, &current).await.unwrap();
            assert_ne!(pair.session_token, current);
            current = pair.session_token;
        }
    }

    #[tokio::test]
    async fn refresh_after_revoke_is_reported_as_reuse() {
        let keys = test_keys();
        let user = Uuid::new_v4();
        let store = MemStore::with_user(user);

        let pair = issue(&keys, &store, user).await.unwrap();
        revoke(&store, user).await.unwrap();

        let result = refresh(&keys, &store, &pair.session_token).await;
        assert!(matches!(result, Err(AppError::TokenReuse)));
    }

    #[tokio::test]
    async fn issue_fails_when_store_does_not_record_the_session() {
        let keys = test_keys();
        let store = MemStore::empty();

        let result = issue(&keys, &store, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
    }

    #[test]
    fn expired_access_token_is_rejected_despite_valid_signature() {
        let keys = TokenKeys::new(
            b"0123456789abcdef0123456789abcdef",
            b"fedcba9876543210fedcba9876543210",
            Duration::hours(-2),
            Duration::days(10),
        );
        let token = mint(&keys, TokenKind::Access, Uuid::new_v4()).unwrap();

        let result = validate_access(&keys, &token);
        assert!(matches!(result, Err(AppError::ExpiredToken)));
    }

    #[test]
    fn access_validation_rejects_a_session_token() {
        // Same key material for both kinds: only the token_type claim can
        // tell them apart.
        let keys = TokenKeys::new(
            b"0123456789abcdef0123456789abcdef",
            b"0123456789abcdef0123456789abcdef",
            Duration::minutes(15),
            Duration::days(10),
        );
        let session = mint(&keys, TokenKind::Session, Uuid::new_v4()).unwrap();

        let result = validate_access(&keys, &session);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_a_different_secret_is_invalid() {
        let keys = test_keys();
        let other = TokenKeys::new(
            b"ffffffffffffffffffffffffffffffff",
            b"ffffffffffffffffffffffffffffffff",
            Duration::minutes(15),
            Duration::days(10),
        );
        let token = mint(&other, TokenKind::Access, Uuid::new_v4()).unwrap();

        let result = validate_access(&keys, &token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn lost_swap_race_is_an_explicit_reuse_error() {
        let keys = test_keys();
        let user = Uuid::new_v4();
        let store = MemStore::with_user(user);

        let pair = issue(&keys, &store, user).await.unwrap();

        // A concurrent refresh wins between validation and the swap.
        store
            .store_session_token(user, "winner-session-token")
            .await
            .unwrap();

        // Direct swap with the stale value mirrors the loser's write.
        let swapped = store
            .swap_session_token(user, &pair.session_token, "loser-session-token")
            .await
            .unwrap();
        assert!(!swapped);

        let result = refresh(&keys, &store, &pair.session_token).await;
        assert!(matches!(result, Err(AppError::TokenReuse)));
    }
}
