//! Server-side sessions
//!
//! Sessions are an opaque 32-byte id mapped to a lightweight principal
//! snapshot with a TTL. The store is a trait so tests run against an
//! in-memory map while production uses Redis. OAuth state nonces share the
//! store: a nonce is written when the flow starts and consumed exactly once
//! at the callback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    models::principal::SessionSnapshot,
    services::credentials,
};

const SESSION_PREFIX: &str = "session:";
const OAUTH_STATE_PREFIX: &str = "oauth_state:";

/// Nonces only need to survive the provider round-trip.
const OAUTH_STATE_TTL_SECS: u64 = 600;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, id: &str, snapshot: &SessionSnapshot, ttl_secs: u64) -> AppResult<()>;
    async fn get(&self, id: &str) -> AppResult<Option<SessionSnapshot>>;
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Record an OAuth state nonce.
    async fn put_state(&self, state: &str, ttl_secs: u64) -> AppResult<()>;
    /// Consume an OAuth state nonce, reporting whether it existed.
    async fn take_state(&self, state: &str) -> AppResult<bool>;
}

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
}

impl RedisSessionStore {
    /// Connect and verify the connection with a PING.
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::TransientStore(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn conn(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, id: &str, snapshot: &SessionSnapshot, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(snapshot)
            .map_err(|e| AppError::Internal(format!("Failed to serialize session: {}", e)))?;
        conn.set_ex::<_, _, ()>(format!("{}{}", SESSION_PREFIX, id), value, ttl_secs)
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to store session: {}", e)))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<SessionSnapshot>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(format!("{}{}", SESSION_PREFIX, id))
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to read session: {}", e)))?;

        match value {
            Some(json) => {
                let snapshot = serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Corrupt session snapshot: {}", e)))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .del(format!("{}{}", SESSION_PREFIX, id))
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    async fn put_state(&self, state: &str, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(format!("{}{}", OAUTH_STATE_PREFIX, state), "1", ttl_secs)
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to store OAuth state: {}", e)))?;
        Ok(())
    }

    async fn take_state(&self, state: &str) -> AppResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i64 = conn
            .del(format!("{}{}", OAUTH_STATE_PREFIX, state))
            .await
            .map_err(|e| AppError::TransientStore(format!("Failed to consume OAuth state: {}", e)))?;
        Ok(deleted > 0)
    }
}

/// In-memory session store for tests. TTLs are tracked but only enforced
/// on read.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: std::sync::RwLock<std::collections::HashMap<String, (SessionSnapshot, i64)>>,
    states: std::sync::RwLock<std::collections::HashSet<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, id: &str, snapshot: &SessionSnapshot, ttl_secs: u64) -> AppResult<()> {
        let expires = Utc::now().timestamp() + ttl_secs as i64;
        self.sessions
            .write()
            .unwrap()
            .insert(id.to_string(), (snapshot.clone(), expires));
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<SessionSnapshot>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions.get(id).and_then(|(snapshot, expires)| {
            if *expires > Utc::now().timestamp() {
                Some(snapshot.clone())
            } else {
                None
            }
        }))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.sessions.write().unwrap().remove(id);
        Ok(())
    }

    async fn put_state(&self, state: &str, _ttl_secs: u64) -> AppResult<()> {
        self.states.write().unwrap().insert(state.to_string());
        Ok(())
    }

    async fn take_state(&self, state: &str) -> AppResult<bool> {
        Ok(self.states.write().unwrap().remove(state))
    }
}

/// Session lifecycle on top of a [`SessionStore`]
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    ttl_secs: u64,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, ttl_days: i64) -> Self {
        Self {
            store,
            ttl_secs: (ttl_days * 86_400) as u64,
        }
    }

    /// Create a session, returning the opaque id handed to the cookie.
    pub async fn create(&self, snapshot: SessionSnapshot) -> AppResult<String> {
        let id = credentials::generate_token();
        self.store.put(&id, &snapshot, self.ttl_secs).await?;
        Ok(id)
    }

    pub async fn resolve(&self, id: &str) -> AppResult<Option<SessionSnapshot>> {
        self.store.get(id).await
    }

    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        self.store.delete(id).await
    }

    /// Issue a state nonce for an OAuth flow.
    pub async fn issue_oauth_state(&self) -> AppResult<String> {
        let state = credentials::generate_token();
        self.store.put_state(&state, OAUTH_STATE_TTL_SECS).await?;
        Ok(state)
    }

    /// Consume a callback's state nonce; false means unknown or reused.
    pub async fn consume_oauth_state(&self, state: &str) -> AppResult<bool> {
        self.store.take_state(state).await
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::principal::PrincipalKind;
    use uuid::Uuid;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            account_id: Uuid::new_v4(),
            kind: PrincipalKind::User,
            email: "a@x.com".to_string(),
            display_name: "Ada Lovelace".to_string(),
            is_admin: false,
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn session_round_trips_and_destroys() {
        let service = SessionService::new(Arc::new(InMemorySessionStore::new()), 14);

        let snap = snapshot();
        let id = service.create(snap.clone()).await.unwrap();
        assert_eq!(id.len(), 64);

        let resolved = service.resolve(&id).await.unwrap().unwrap();
        assert_eq!(resolved.account_id, snap.account_id);

        service.destroy(&id).await.unwrap();
        assert!(service.resolve(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_session_resolves_to_none() {
        let service = SessionService::new(Arc::new(InMemorySessionStore::new()), 14);
        assert!(service.resolve("no-such-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oauth_state_is_single_use() {
        let service = SessionService::new(Arc::new(InMemorySessionStore::new()), 14);

        let state = service.issue_oauth_state().await.unwrap();
        assert!(service.consume_oauth_state(&state).await.unwrap());
        // Second consumption fails: replayed callbacks are rejected.
        assert!(!service.consume_oauth_state(&state).await.unwrap());
        assert!(!service.consume_oauth_state("forged").await.unwrap());
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let mut mock = MockSessionStore::new();
        mock.expect_get()
            .returning(|_| Err(AppError::TransientStore("redis down".to_string())));

        let service = SessionService::new(Arc::new(mock), 14);
        assert!(matches!(
            service.resolve("any").await,
            Err(AppError::TransientStore(_))
        ));
    }
}
