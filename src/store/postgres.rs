//! PostgreSQL ledger store
//!
//! Profiles and conversation states are stored as JSON documents; ledger
//! entries are plain rows. The schema is created lazily on first use.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tokio::sync::OnceCell;

use super::LedgerStore;
use crate::error::AgentError;
use crate::models::{EntryKind, LedgerEntry, NewEntry, UserProfile};
use crate::state::ConversationState;
use crate::Result;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
      id BIGSERIAL PRIMARY KEY,
      owner_id TEXT NOT NULL,
      kind TEXT NOT NULL,
      amount DOUBLE PRECISION NOT NULL,
      description TEXT NOT NULL,
      category TEXT NOT NULL,
      created_at TIMESTAMPTZ NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ledger_entries_owner
    ON ledger_entries (owner_id, id);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_profiles (
      owner_id TEXT PRIMARY KEY,
      profile TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversation_states (
      owner_id TEXT PRIMARY KEY,
      state TEXT NOT NULL,
      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AgentError {
    move |e| AgentError::StoreUnavailable(format!("Failed to {}: {}", context, e))
}

fn decode_kind(raw: &str) -> Result<EntryKind> {
    EntryKind::parse(raw)
        .ok_or_else(|| AgentError::StoreUnavailable(format!("Unknown entry kind in store: {}", raw)))
}

fn encode_profile(profile: &UserProfile) -> Result<String> {
    Ok(serde_json::to_string(profile)?)
}

fn decode_profile(raw: &str) -> Result<UserProfile> {
    Ok(serde_json::from_str(raw)?)
}

fn encode_state(state: &ConversationState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

fn decode_state(raw: &str) -> Result<ConversationState> {
    Ok(serde_json::from_str(raw)?)
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry> {
    let map = db_error("decode ledger entry");

    let id: i64 = row.try_get("id").map_err(&map)?;
    let kind: String = row.try_get("kind").map_err(&map)?;
    let timestamp: DateTime<Utc> = row.try_get("created_at").map_err(&map)?;

    Ok(LedgerEntry {
        id: id.max(0) as u64,
        owner_id: row.try_get("owner_id").map_err(&map)?,
        kind: decode_kind(&kind)?,
        amount: row.try_get("amount").map_err(&map)?,
        description: row.try_get("description").map_err(&map)?,
        category: row.try_get("category").map_err(&map)?,
        timestamp,
    })
}

pub struct PgStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    /// Build a pool without connecting; the first query opens a connection
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
            .map_err(db_error("configure postgres pool"))?;

        Ok(Self::new(pool))
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(db_error("initialize ledger schema"))?;

        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.ensure_schema().await?;
        self.pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))
    }

    /// Load (or default) a profile with its row locked for the transaction
    async fn lock_profile(
        tx: &mut Transaction<'static, Postgres>,
        owner_id: &str,
    ) -> Result<UserProfile> {
        let row = sqlx::query("SELECT profile FROM user_profiles WHERE owner_id = $1 FOR UPDATE")
            .bind(owner_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_error("lock user profile"))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("profile")
                    .map_err(db_error("decode user profile"))?;
                decode_profile(&raw)
            }
            None => Ok(UserProfile::new(owner_id)),
        }
    }

    async fn save_profile(
        tx: &mut Transaction<'static, Postgres>,
        profile: &UserProfile,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (owner_id, profile)
            VALUES ($1, $2)
            ON CONFLICT (owner_id) DO UPDATE SET profile = EXCLUDED.profile
            "#,
        )
        .bind(&profile.owner_id)
        .bind(encode_profile(profile)?)
        .execute(&mut **tx)
        .await
        .map_err(db_error("save user profile"))?;

        Ok(())
    }

    async fn insert_entry(
        tx: &mut Transaction<'static, Postgres>,
        owner_id: &str,
        entry: NewEntry,
    ) -> Result<LedgerEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries
              (owner_id, kind, amount, description, category, created_at)
            VALUES
              ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(&entry.category)
        .bind(entry.timestamp)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("insert ledger entry"))?;

        let id: i64 = row.try_get("id").map_err(db_error("read entry id"))?;
        Ok(entry.into_entry(id.max(0) as u64, owner_id))
    }

    async fn save_state<'e, E>(executor: E, owner_id: &str, state: &ConversationState) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO conversation_states (owner_id, state, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (owner_id) DO UPDATE
              SET state = EXCLUDED.state, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(encode_state(state)?)
        .execute(executor)
        .await
        .map_err(db_error("save conversation state"))?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn get_profile(&self, owner_id: &str) -> Result<UserProfile> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT profile FROM user_profiles WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load user profile"))?;

        if let Some(row) = row {
            let raw: String = row
                .try_get("profile")
                .map_err(db_error("decode user profile"))?;
            return decode_profile(&raw);
        }

        let profile = UserProfile::new(owner_id);
        sqlx::query(
            "INSERT INTO user_profiles (owner_id, profile) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(owner_id)
        .bind(encode_profile(&profile)?)
        .execute(&self.pool)
        .await
        .map_err(db_error("create user profile"))?;

        Ok(profile)
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut tx = self.begin().await?;
        Self::save_profile(&mut tx, profile).await?;
        tx.commit().await.map_err(db_error("commit profile update"))
    }

    async fn append_category(&self, owner_id: &str, kind: EntryKind, label: &str) -> Result<()> {
        let mut tx = self.begin().await?;
        let mut profile = Self::lock_profile(&mut tx, owner_id).await?;

        if profile.append_category(kind, label) {
            Self::save_profile(&mut tx, &profile).await?;
        }

        tx.commit().await.map_err(db_error("commit category append"))
    }

    async fn list_entries(&self, owner_id: &str) -> Result<Vec<LedgerEntry>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, kind, amount, description, category, created_at
            FROM ledger_entries
            WHERE owner_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list ledger entries"))?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn create_entry(&self, owner_id: &str, entry: NewEntry) -> Result<LedgerEntry> {
        let mut tx = self.begin().await?;
        let created = Self::insert_entry(&mut tx, owner_id, entry).await?;
        tx.commit().await.map_err(db_error("commit ledger entry"))?;
        Ok(created)
    }

    async fn commit_entry(
        &self,
        owner_id: &str,
        entry: NewEntry,
        next_state: &ConversationState,
    ) -> Result<LedgerEntry> {
        let mut tx = self.begin().await?;

        let mut profile = Self::lock_profile(&mut tx, owner_id).await?;
        if profile.append_category(entry.kind, &entry.category) {
            Self::save_profile(&mut tx, &profile).await?;
        }

        let created = Self::insert_entry(&mut tx, owner_id, entry).await?;
        Self::save_state(&mut *tx, owner_id, next_state).await?;
        tx.commit().await.map_err(db_error("commit ledger entry"))?;
        Ok(created)
    }

    async fn delete_entry(&self, owner_id: &str, entry_id: u64) -> Result<Option<LedgerEntry>> {
        self.ensure_schema().await?;

        let Ok(id) = i64::try_from(entry_id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            DELETE FROM ledger_entries
            WHERE owner_id = $1 AND id = $2
            RETURNING id, owner_id, kind, amount, description, category, created_at
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("delete ledger entry"))?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn get_state(&self, owner_id: &str) -> Result<Option<ConversationState>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT state FROM conversation_states WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load conversation state"))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("state")
                    .map_err(db_error("decode conversation state"))?;
                decode_state(&raw).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn put_state(&self, owner_id: &str, state: &ConversationState) -> Result<()> {
        self.ensure_schema().await?;
        Self::save_state(&self.pool, owner_id, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Intent;
    use crate::models::SavingsGoal;
    use crate::state::DialogState;
    use chrono::Utc;

    #[test]
    fn test_kind_column_decoding() {
        assert_eq!(decode_kind("expense").unwrap(), EntryKind::Expense);
        assert_eq!(decode_kind("income").unwrap(), EntryKind::Income);
        assert!(matches!(
            decode_kind("transfer"),
            Err(AgentError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_profile_document_round_trip() {
        let mut profile = UserProfile::new("ana");
        profile.append_category(EntryKind::Expense, "pets");
        profile.budgets.insert("moradia".to_string(), 1500.0);
        profile.goal = Some(SavingsGoal {
            label: "viagem".to_string(),
            target: 3000.0,
        });

        let raw = encode_profile(&profile).unwrap();
        assert!(raw.contains("\"moradia\":1500.0"));
        assert_eq!(decode_profile(&raw).unwrap(), profile);
    }

    #[test]
    fn test_profile_document_without_optional_fields() {
        let raw = r#"{"owner_id":"ana","income_categories":["salário"],"expense_categories":["outros"]}"#;

        let profile = decode_profile(raw).unwrap();
        assert!(profile.budgets.is_empty());
        assert!(profile.goal.is_none());
        assert!(profile.categorizer.is_none());
    }

    #[test]
    fn test_state_document_keeps_pending_fields() {
        let mut state = ConversationState::new("ana");
        state.remember(Intent::AddExpense, 5);
        state.transition(DialogState::CollectingCategory {
            kind: EntryKind::Income,
            amount: 3000.5,
            description: "salário de maio".to_string(),
            options: vec!["salário".to_string(), "freelance".to_string()],
        });

        let raw = encode_state(&state).unwrap();
        assert!(raw.contains("\"state\":\"collecting_category\""));
        assert_eq!(decode_state(&raw).unwrap(), state);
    }

    #[test]
    fn test_corrupt_state_document_is_an_error() {
        assert!(matches!(
            decode_state("{\"owner_id\":"),
            Err(AgentError::Serialization(_))
        ));
    }

    /// Needs a reachable database in `DATABASE_URL`
    #[tokio::test]
    #[ignore]
    async fn test_commit_entry_against_database() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let store = PgStore::connect_lazy(&url).unwrap();
        let owner = format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());

        let idle = ConversationState::new(&owner);
        let entry = store
            .commit_entry(
                &owner,
                NewEntry {
                    kind: EntryKind::Expense,
                    amount: 42.0,
                    description: "ração".to_string(),
                    category: "pets".to_string(),
                    timestamp: Utc::now(),
                },
                &idle,
            )
            .await
            .unwrap();

        let entries = store.list_entries(&owner).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, entry.id);
        assert_eq!(store.get_state(&owner).await.unwrap(), Some(idle));
        assert!(store
            .get_profile(&owner)
            .await
            .unwrap()
            .expense_categories
            .iter()
            .any(|c| c == "pets"));

        assert!(store.delete_entry(&owner, entry.id).await.unwrap().is_some());
    }
}
