//! User progress persistence
//!
//! One `user_progress` row per user. The missed set and the category
//! counters are JSON text columns, decoded on read and encoded on write.
//! Decoding is lenient: NULL, empty, `null` or malformed text reads as empty.

use crate::dataset::RecordId;
use crate::progress::{CategoryTally, ProgressRecord};
use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use pokequiz_common::auth::UserId;
use pokequiz_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Per-user async mutexes serializing read-modify-write cycles in-process
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn get(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clone()
    }

    /// Give back a lock from `get`, dropping the entry once nobody else holds it
    async fn release(&self, user_id: UserId, user_lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(user_lock);

        let idle = locks
            .get(&user_id)
            .map_or(false, |lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&user_id);
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct ProgressStore {
    pool: SqlitePool,
    locks: UserLocks,
    max_lock_wait_ms: u64,
}

impl ProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: UserLocks::default(),
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load the user's progress, creating an empty row on first access
    pub async fn get_or_create(&self, user_id: UserId) -> Result<ProgressRecord> {
        let pool = &self.pool;

        retry_on_lock("progress load", self.max_lock_wait_ms, move || async move {
            let mut conn = pool.acquire().await?;
            load_or_insert(&mut conn, user_id).await
        })
        .await
    }

    /// Apply `mutate` to the user's progress as one atomic unit
    ///
    /// Load, mutation and save run in a single transaction while holding the
    /// user's lock, so concurrent updates for the same user cannot interleave.
    /// `mutate` runs again if the transaction is retried after a lock error.
    pub async fn update<F>(&self, user_id: UserId, mutate: F) -> Result<ProgressRecord>
    where
        F: Fn(&mut ProgressRecord),
    {
        let user_lock = self.locks.get(user_id).await;

        let result = {
            let _guard = user_lock.lock().await;

            let pool = &self.pool;
            let mutate = &mutate;

            retry_on_lock("progress update", self.max_lock_wait_ms, move || async move {
                let mut tx = pool.begin().await?;

                let mut progress = load_or_insert(&mut tx, user_id).await?;
                mutate(&mut progress);
                save(&mut tx, &progress).await?;

                tx.commit().await?;
                Ok(progress)
            })
            .await
        };

        self.locks.release(user_id, user_lock).await;
        result
    }
}

async fn load_or_insert(conn: &mut SqliteConnection, user_id: UserId) -> Result<ProgressRecord> {
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO user_progress (user_id, created_at, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query(
        r#"
        SELECT total_questions, total_correct, wrong_answers, regional_stats
        FROM user_progress
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    let total_questions: i64 = row.get("total_questions");
    let total_correct: i64 = row.get("total_correct");
    let wrong_answers: Option<String> = row.get("wrong_answers");
    let regional_stats: Option<String> = row.get("regional_stats");

    Ok(ProgressRecord {
        user_id,
        total_questions: clamp_counter(total_questions),
        total_correct: clamp_counter(total_correct),
        missed: decode_missed(user_id, wrong_answers.as_deref()),
        category_stats: decode_category_stats(user_id, regional_stats.as_deref()),
    })
}

async fn save(conn: &mut SqliteConnection, progress: &ProgressRecord) -> Result<()> {
    let wrong_answers = serde_json::to_string(&progress.missed)?;
    let regional_stats = serde_json::to_string(&progress.category_stats)?;

    sqlx::query(
        r#"
        UPDATE user_progress
        SET total_questions = ?, total_correct = ?, wrong_answers = ?,
            regional_stats = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(i64::from(progress.total_questions))
    .bind(i64::from(progress.total_correct))
    .bind(&wrong_answers)
    .bind(&regional_stats)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(progress.user_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn clamp_counter(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Payload text worth decoding, or `None` for absent/empty/`null`
fn payload(raw: Option<&str>) -> Option<&str> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => None,
        Some(text) => Some(text),
    }
}

/// Decode the missed-id column; duplicate ids collapse, first occurrence wins
pub fn decode_missed(user_id: UserId, raw: Option<&str>) -> Vec<RecordId> {
    let Some(text) = payload(raw) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<RecordId>>(text) {
        Ok(ids) => {
            let mut seen = HashSet::new();
            ids.into_iter().filter(|id| seen.insert(*id)).collect()
        }
        Err(e) => {
            warn!(user_id, error = %e, "Malformed wrong_answers payload, treating as empty");
            Vec::new()
        }
    }
}

pub fn decode_category_stats(user_id: UserId, raw: Option<&str>) -> BTreeMap<String, CategoryTally> {
    let Some(text) = payload(raw) else {
        return BTreeMap::new();
    };

    match serde_json::from_str(text) {
        Ok(stats) => stats,
        Err(e) => {
            warn!(user_id, error = %e, "Malformed regional_stats payload, treating as empty");
            BTreeMap::new()
        }
    }
}
