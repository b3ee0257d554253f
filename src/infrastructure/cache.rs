//! Persistent response cache backed by SQLite.
//!
//! Keys are the exact outbound request (`GET <url>`), so identical queries are
//! served from disk across runs, label lookups included. Expiry is logical:
//! entries older than the TTL read as absent until `purge_expired` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::domain::ResponseStore;
use crate::infrastructure::db;
use crate::models::response_cache::{self, Column, Entity as CacheEntity};

pub struct SqliteResponseCache {
    db: DatabaseConnection,
    ttl: chrono::Duration,
}

impl SqliteResponseCache {
    pub fn new(db: DatabaseConnection, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }

    /// Open (and migrate) the cache database.
    pub async fn open(database_url: &str, ttl: chrono::Duration) -> Result<Self, DbErr> {
        let db = db::init_db(database_url).await?;
        Ok(Self::new(db, ttl))
    }

    pub(crate) async fn get_at(
        &self,
        request_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<u8>>, DbErr> {
        let entry = CacheEntity::find_by_id(request_key.to_string())
            .one(&self.db)
            .await?;

        Ok(entry
            .filter(|e| e.stored_at > self.cutoff(now))
            .map(|e| e.body))
    }

    pub(crate) async fn put_at(
        &self,
        request_key: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let entry = response_cache::ActiveModel {
            request_key: Set(request_key.to_string()),
            body: Set(body.to_vec()),
            stored_at: Set(now.timestamp()),
        };

        CacheEntity::insert(entry)
            .on_conflict(
                OnConflict::column(Column::RequestKey)
                    .update_columns([Column::Body, Column::StoredAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    /// Physically delete expired rows. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64, DbErr> {
        let res = CacheEntity::delete_many()
            .filter(Column::StoredAt.lte(self.cutoff(Utc::now())))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn close(self) -> Result<(), DbErr> {
        self.db.close().await
    }

    fn cutoff(&self, now: DateTime<Utc>) -> i64 {
        (now - self.ttl).timestamp()
    }
}

#[async_trait]
impl ResponseStore for SqliteResponseCache {
    async fn get(&self, request_key: &str) -> Result<Option<Vec<u8>>, DbErr> {
        self.get_at(request_key, Utc::now()).await
    }

    async fn put(&self, request_key: &str, body: &[u8]) -> Result<(), DbErr> {
        self.put_at(request_key, body, Utc::now()).await
    }
}
