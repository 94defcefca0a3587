//! In-memory repositories for service tests
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    api::error,
    configs::lazy_pool,
    modules::conversation::{
        model::ConversationRow,
        repository::{ConversationRepository, ReadCursorRepository},
        schema::{ConversationEntity, normalize_pair},
    },
};

pub fn conversation_between(a: Uuid, b: Uuid) -> ConversationEntity {
    let (user_low, user_high) = normalize_pair(a, b).unwrap();
    ConversationEntity { id: Uuid::now_v7(), user_low, user_high, created_at: chrono::Utc::now() }
}

pub struct MockConversationRepository {
    pool: sqlx::PgPool,
    rows: Mutex<Vec<ConversationEntity>>,
    unknown_users: HashSet<Uuid>,
    stale_pair_reads: AtomicUsize,
    first_lookup_delay: Option<Duration>,
    lookups: AtomicUsize,
    inserts: AtomicUsize,
}

impl MockConversationRepository {
    pub fn new() -> Self {
        Self {
            pool: lazy_pool(),
            rows: Mutex::new(Vec::new()),
            unknown_users: HashSet::new(),
            stale_pair_reads: AtomicUsize::new(0),
            first_lookup_delay: None,
            lookups: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn with_row(self, row: ConversationEntity) -> Self {
        self.rows.lock().unwrap().push(row);
        self
    }

    /// Inserting a pair with this user fails like a missing foreign key
    pub fn with_unknown_user(mut self, user_id: Uuid) -> Self {
        self.unknown_users.insert(user_id);
        self
    }

    /// The next `n` pair lookups miss, as if another request inserted the row right after
    pub fn with_stale_pair_reads(self, n: usize) -> Self {
        self.stale_pair_reads.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_slow_first_lookup(mut self, delay: Duration) -> Self {
        self.first_lookup_delay = Some(delay);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn by_pair(&self, low: &Uuid, high: &Uuid) -> Option<ConversationEntity> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.user_low == *low && c.user_high == *high)
            .cloned()
    }
}

#[async_trait::async_trait]
impl ConversationRepository for MockConversationRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn find_by_id<'e, E>(
        &self,
        conversation_id: &Uuid,
        _tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(delay) = self.first_lookup_delay {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == *conversation_id).cloned())
    }

    async fn find_by_pair<'e, E>(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        _tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let stale = self
            .stale_pair_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        Ok(self.by_pair(user_low, user_high))
    }

    async fn insert_if_absent<'e, E>(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        _tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.unknown_users.contains(user_low) || self.unknown_users.contains(user_high) {
            return Err(error::SystemError::not_found("users"));
        }
        if self.by_pair(user_low, user_high).is_some() {
            return Ok(None);
        }
        let row = ConversationEntity {
            id: Uuid::now_v7(),
            user_low: *user_low,
            user_high: *user_high,
            created_at: chrono::Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(Some(row))
    }

    async fn find_summaries_by_user<'e, E>(
        &self,
        _user_id: &Uuid,
        _tx: E,
    ) -> Result<Vec<ConversationRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct MockReadCursorRepository {
    cursors: Mutex<HashMap<(Uuid, Uuid), i64>>,
}

#[async_trait::async_trait]
impl ReadCursorRepository for MockReadCursorRepository {
    async fn lock_cursor<'e>(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        _tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<i64, error::SystemError> {
        let mut cursors = self.cursors.lock().unwrap();
        Ok(*cursors.entry((*conversation_id, *user_id)).or_insert(0))
    }

    async fn set_cursor<'e, E>(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        last_read_message_id: i64,
        _tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        self.cursors.lock().unwrap().insert((*conversation_id, *user_id), last_read_message_id);
        Ok(())
    }
}
