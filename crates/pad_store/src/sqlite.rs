//! Durable tier over SQLite via sqlx.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use pad_core::{Account, CredentialHash, Pad, PadGuard};

use crate::durable::DurableStore;
use crate::error::StoreError;

/// How long a call may wait for a pool connection before failing. Keeps the
/// bounded-timeout contract: a wedged database degrades durability instead of
/// parking request tasks forever.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`DurableStore`]. Cheap to clone (pool is an Arc internally).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run pending migrations.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time, not inside a migration — SQLite forbids changing
    /// `journal_mode` inside the transaction sqlx wraps migrations in.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct PadRow {
    code: String,
    title: String,
    content: String,
    created_at: i64,
    expires_at: i64,
    credential_hash: Option<String>,
    owner_id: Option<String>,
}

impl PadRow {
    fn into_pad(self) -> Result<Pad, StoreError> {
        let guard = match (self.owner_id, self.credential_hash) {
            (Some(owner_id), _) => PadGuard::Account { owner_id },
            (None, Some(phc)) => PadGuard::Password {
                credential: CredentialHash::from_phc(phc),
            },
            (None, None) => PadGuard::Open,
        };
        Ok(Pad {
            code: self.code,
            title: self.title,
            content: self.content,
            created_at: dt_from_millis(self.created_at)?,
            expires_at: dt_from_millis(self.expires_at)?,
            guard,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id_number: String,
    credential_hash: String,
    created_at: i64,
}

fn dt_from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {ms}")))
}

const SELECT_PAD: &str =
    "SELECT code, title, content, created_at, expires_at, credential_hash, owner_id FROM pads";

#[async_trait]
impl DurableStore for SqliteStore {
    async fn upsert_pad(&self, pad: &Pad) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO pads (code, title, content, created_at, expires_at, credential_hash, owner_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (code) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at,
                credential_hash = excluded.credential_hash,
                owner_id = excluded.owner_id
            "#,
        )
        .bind(&pad.code)
        .bind(&pad.title)
        .bind(&pad.content)
        .bind(pad.created_at.timestamp_millis())
        .bind(pad.expires_at.timestamp_millis())
        .bind(pad.credential_hash().map(CredentialHash::as_str))
        .bind(pad.owner_id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_by_code(&self, code: &str) -> Result<Option<Pad>, StoreError> {
        let row: Option<PadRow> =
            sqlx::query_as(&format!("{SELECT_PAD} WHERE code = ? LIMIT 1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        row.map(PadRow::into_pad).transpose()
    }

    async fn fetch_by_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<Pad>, StoreError> {
        let rows: Vec<PadRow> = sqlx::query_as(&format!(
            "{SELECT_PAD} WHERE owner_id = ? ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PadRow::into_pad).collect()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM pads WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_account(&self, id_number: &str) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id_number, credential_hash, created_at FROM accounts WHERE id_number = ? LIMIT 1",
        )
        .bind(id_number)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            Ok(Account {
                id_number: r.id_number,
                credential: CredentialHash::from_phc(r.credential_hash),
                created_at: dt_from_millis(r.created_at)?,
            })
        })
        .transpose()
    }

    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounts (id_number, credential_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(&account.id_number)
        .bind(account.credential.as_str())
        .bind(account.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn pad(code: &str, guard: PadGuard, expires_in: Duration) -> Pad {
        let now = Utc::now();
        Pad {
            code: code.into(),
            title: "title".into(),
            content: "content".into(),
            created_at: now,
            expires_at: now + expires_in,
            guard,
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        SqliteStore::open(&dir.path().join("pads.db"))
            .await
            .expect("open store")
    }

    #[tokio::test]
    async fn pad_round_trip_preserves_guard() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        let open = pad("AAAA22", PadGuard::Open, Duration::hours(1));
        let locked = pad(
            "BBBB33",
            PadGuard::Password {
                credential: CredentialHash::from_phc("$argon2id$fake".into()),
            },
            Duration::hours(1),
        );
        let owned = pad(
            "CCCC44",
            PadGuard::Account { owner_id: "S12".into() },
            Duration::days(365),
        );

        for p in [&open, &locked, &owned] {
            store.upsert_pad(p).await.unwrap();
        }

        for p in [&open, &locked, &owned] {
            let got = store.fetch_by_code(&p.code).await.unwrap().expect("row");
            assert_eq!(got.guard, p.guard);
            assert_eq!(got.content, p.content);
            assert_eq!(got.created_at.timestamp_millis(), p.created_at.timestamp_millis());
        }

        assert!(store.fetch_by_code("ZZZZ99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_code() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        let p = pad("AAAA22", PadGuard::Open, Duration::hours(1));
        store.upsert_pad(&p).await.unwrap();
        store.upsert_pad(&p).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pads")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn fetch_by_owner_orders_and_limits() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        let now = Utc::now();
        for (i, code) in ["AAAA22", "BBBB33", "CCCC44"].into_iter().enumerate() {
            let mut p = pad(code, PadGuard::Account { owner_id: "S12".into() }, Duration::days(1));
            p.created_at = now + Duration::seconds(i as i64);
            store.upsert_pad(&p).await.unwrap();
        }

        let pads = store.fetch_by_owner("S12", 2).await.unwrap();
        assert_eq!(pads.len(), 2);
        assert_eq!(pads[0].code, "CCCC44");
        assert_eq!(pads[1].code, "BBBB33");

        assert!(store.fetch_by_owner("S13", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_expired_removes_only_past_rows() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store
            .upsert_pad(&pad("AAAA22", PadGuard::Open, Duration::hours(-1)))
            .await
            .unwrap();
        store
            .upsert_pad(&pad("BBBB33", PadGuard::Open, Duration::hours(1)))
            .await
            .unwrap();

        let removed = store.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.fetch_by_code("AAAA22").await.unwrap().is_none());
        assert!(store.fetch_by_code("BBBB33").await.unwrap().is_some());

        // Idempotent: nothing left to remove.
        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn account_round_trip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        assert!(store.fetch_account("S12").await.unwrap().is_none());

        let account = Account {
            id_number: "S12".into(),
            credential: CredentialHash::from_phc("$argon2id$fake".into()),
            created_at: Utc::now(),
        };
        store.create_account(&account).await.unwrap();

        let got = store.fetch_account("S12").await.unwrap().expect("account");
        assert_eq!(got.id_number, "S12");
        assert_eq!(got.credential, account.credential);

        assert!(store.ping().await);
    }
}
