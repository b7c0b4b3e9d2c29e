//! SQLite-based store implementation

use pushup_util::{RuleId, UNPAID_SENTINEL, UserId, ViolationId, format_db_timestamp};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{PushupConfig, StoreResult, ViolationStore};

/// Options fixed for the lifetime of a store
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// `parents.p_id` whose configuration rows apply
    pub policy_owner_id: i64,

    /// Returned by `get_config` when a child has no row
    pub fallback: PushupConfig,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            policy_owner_id: 10,
            fallback: PushupConfig::default(),
        }
    }
}

/// SQLite-based store.
///
/// Holds only the database path: each operation opens its own connection
/// and closes it before returning.
pub struct SqliteStore {
    path: PathBuf,
    options: StoreOptions,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            options,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> StoreResult<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            r#"
            -- Rule → child mapping (owned by the web application)
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL
            );

            -- Violations; date_paid holds the zero-date sentinel until paid
            CREATE TABLE IF NOT EXISTS violation (
                id INTEGER PRIMARY KEY,
                rule_id INTEGER NOT NULL,
                date_creation TEXT NOT NULL,
                date_paid TEXT NOT NULL DEFAULT '0000-00-00 00:00:00'
            );

            -- Per-child push-up settings history, newest row wins
            CREATE TABLE IF NOT EXISTS parents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                p_id INTEGER NOT NULL,
                ch_id INTEGER NOT NULL,
                push_ups INTEGER NOT NULL,
                time INTEGER NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_violation_rule ON violation(rule_id, date_creation);
            CREATE INDEX IF NOT EXISTS idx_rules_user ON rules(user_id);
            CREATE INDEX IF NOT EXISTS idx_parents_child ON parents(p_id, ch_id);
            "#,
        )?;

        debug!(path = %self.path.display(), "Store schema initialized");
        Ok(())
    }
}

impl ViolationStore for SqliteStore {
    fn resolve_owner(&self, rule_id: RuleId) -> StoreResult<Option<UserId>> {
        let conn = self.connect()?;

        let user: Option<i64> = conn
            .query_row(
                "SELECT user_id FROM rules WHERE id = ? LIMIT 1",
                [rule_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(user.map(UserId::new))
    }

    fn latest_rule_for_user(&self, user_id: UserId) -> StoreResult<Option<RuleId>> {
        let conn = self.connect()?;

        let rule: Option<i64> = conn
            .query_row(
                "SELECT id FROM rules WHERE user_id = ? ORDER BY id DESC LIMIT 1",
                [user_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(rule.map(RuleId::new))
    }

    fn find_unpaid_violation(&self, rule_id: RuleId) -> StoreResult<Option<ViolationId>> {
        let conn = self.connect()?;

        let violation: Option<i64> = conn
            .query_row(
                r#"
                SELECT id
                FROM violation
                WHERE rule_id = ?
                  AND date_paid = ?
                ORDER BY date_creation DESC
                LIMIT 1
                "#,
                params![rule_id.get(), UNPAID_SENTINEL],
                |row| row.get(0),
            )
            .optional()?;

        Ok(violation.map(ViolationId::new))
    }

    fn mark_paid(&self, violation_id: ViolationId) -> StoreResult<bool> {
        let conn = self.connect()?;
        let paid_at = format_db_timestamp(&pushup_util::now());

        let changed = conn.execute(
            r#"
            UPDATE violation
            SET date_paid = ?
            WHERE id = ?
              AND date_paid = ?
            "#,
            params![paid_at, violation_id.get(), UNPAID_SENTINEL],
        )?;

        debug!(violation_id = %violation_id, changed, paid_at = %paid_at, "mark_paid");
        Ok(changed > 0)
    }

    fn is_manually_paid(&self, rule_id: RuleId) -> StoreResult<bool> {
        let conn = self.connect()?;

        let date_paid: Option<Option<String>> = conn
            .query_row(
                r#"
                SELECT date_paid
                FROM violation
                WHERE rule_id = ?
                ORDER BY date_creation DESC
                LIMIT 1
                "#,
                [rule_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(date_paid
            .flatten()
            .is_some_and(|d| pushup_util::is_paid_timestamp(&d)))
    }

    fn oldest_unpaid_rule_for_user(&self, user_id: UserId) -> StoreResult<Option<RuleId>> {
        let conn = self.connect()?;

        let rule: Option<i64> = conn
            .query_row(
                r#"
                SELECT v.rule_id
                FROM violation v
                JOIN rules r ON r.id = v.rule_id
                WHERE r.user_id = ?
                  AND v.date_paid = ?
                ORDER BY v.date_creation ASC
                LIMIT 1
                "#,
                params![user_id.get(), UNPAID_SENTINEL],
                |row| row.get(0),
            )
            .optional()?;

        Ok(rule.map(RuleId::new))
    }

    fn get_config(&self, user_id: UserId) -> StoreResult<PushupConfig> {
        let conn = self.connect()?;

        let row: Option<(u32, u32)> = conn
            .query_row(
                r#"
                SELECT push_ups, time
                FROM parents
                WHERE p_id = ? AND ch_id = ?
                ORDER BY id DESC
                LIMIT 1
                "#,
                params![self.options.policy_owner_id, user_id.get()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((repetitions, rest_seconds)) => PushupConfig::new(repetitions, rest_seconds),
            None => {
                debug!(user_id = %user_id, "No push-up config row, using fallback");
                self.options.fallback
            }
        })
    }

    fn fallback_config(&self) -> PushupConfig {
        self.options.fallback
    }

    fn is_healthy(&self) -> bool {
        match self.connect() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(e) => {
                warn!(error = %e, "Store unreachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("cw.db"), StoreOptions::default()).unwrap();
        (dir, store)
    }

    fn seed(store: &SqliteStore, sql: &str) {
        Connection::open(store.path()).unwrap().execute_batch(sql).unwrap();
    }

    fn date_paid(store: &SqliteStore, id: i64) -> String {
        Connection::open(store.path())
            .unwrap()
            .query_row("SELECT date_paid FROM violation WHERE id = ?", [id], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_store_is_healthy() {
        let (_dir, store) = open_store();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cw.db");
        SqliteStore::open(&path, StoreOptions::default()).unwrap();
        assert!(SqliteStore::open(&path, StoreOptions::default()).is_ok());
    }

    #[test]
    fn test_resolve_owner() {
        let (_dir, store) = open_store();
        seed(&store, "INSERT INTO rules (id, user_id) VALUES (7, 42);");

        assert_eq!(store.resolve_owner(RuleId::new(7)).unwrap(), Some(UserId::new(42)));
        assert_eq!(store.resolve_owner(RuleId::new(8)).unwrap(), None);
    }

    #[test]
    fn test_latest_unpaid_violation_wins() {
        let (_dir, store) = open_store();
        seed(
            &store,
            r#"
            INSERT INTO violation (id, rule_id, date_creation, date_paid) VALUES
                (1, 7, '2025-01-01 10:00:00', '0000-00-00 00:00:00'),
                (2, 7, '2025-01-03 10:00:00', '0000-00-00 00:00:00'),
                (3, 7, '2025-01-05 10:00:00', '2025-01-05 11:00:00'),
                (4, 8, '2025-01-09 10:00:00', '0000-00-00 00:00:00');
            "#,
        );

        assert_eq!(
            store.find_unpaid_violation(RuleId::new(7)).unwrap(),
            Some(ViolationId::new(2))
        );
        assert_eq!(store.find_unpaid_violation(RuleId::new(9)).unwrap(), None);
    }

    #[test]
    fn test_mark_paid_is_idempotent() {
        let (_dir, store) = open_store();
        seed(
            &store,
            "INSERT INTO violation (id, rule_id, date_creation) VALUES (99, 7, '2025-01-01 10:00:00');",
        );

        assert!(store.mark_paid(ViolationId::new(99)).unwrap());
        let first = date_paid(&store, 99);
        assert_ne!(first, UNPAID_SENTINEL);

        assert!(!store.mark_paid(ViolationId::new(99)).unwrap());
        assert_eq!(date_paid(&store, 99), first);
        assert_eq!(store.find_unpaid_violation(RuleId::new(7)).unwrap(), None);
    }

    #[test]
    fn test_is_manually_paid_checks_latest_violation() {
        let (_dir, store) = open_store();
        seed(
            &store,
            r#"
            INSERT INTO violation (id, rule_id, date_creation, date_paid) VALUES
                (1, 7, '2025-01-01 10:00:00', '2025-01-01 12:00:00'),
                (2, 7, '2025-01-02 10:00:00', '0000-00-00 00:00:00');
            "#,
        );

        assert!(!store.is_manually_paid(RuleId::new(7)).unwrap());

        seed(&store, "UPDATE violation SET date_paid = '2025-01-02 11:00:00' WHERE id = 2;");
        assert!(store.is_manually_paid(RuleId::new(7)).unwrap());

        // No violations at all
        assert!(!store.is_manually_paid(RuleId::new(8)).unwrap());
    }

    #[test]
    fn test_get_config_latest_row_for_policy_owner() {
        let (_dir, store) = open_store();
        seed(
            &store,
            r#"
            INSERT INTO parents (p_id, ch_id, push_ups, time) VALUES
                (10, 42, 10, 60),
                (10, 42, 15, 30),
                (11, 42, 99, 99);
            "#,
        );

        assert_eq!(store.get_config(UserId::new(42)).unwrap(), PushupConfig::new(15, 30));
    }

    #[test]
    fn test_get_config_fallback() {
        let (_dir, store) = open_store();
        assert_eq!(store.get_config(UserId::new(42)).unwrap(), PushupConfig::new(20, 20));
        assert_eq!(store.fallback_config(), PushupConfig::new(20, 20));
    }

    #[test]
    fn test_custom_options() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreOptions {
            policy_owner_id: 11,
            fallback: PushupConfig::new(5, 45),
        };
        let store = SqliteStore::open(dir.path().join("cw.db"), options).unwrap();
        seed(&store, "INSERT INTO parents (p_id, ch_id, push_ups, time) VALUES (11, 42, 99, 10);");

        assert_eq!(store.get_config(UserId::new(42)).unwrap(), PushupConfig::new(99, 10));
        assert_eq!(store.get_config(UserId::new(43)).unwrap(), PushupConfig::new(5, 45));
    }

    #[test]
    fn test_rule_lookups_by_user() {
        let (_dir, store) = open_store();
        seed(
            &store,
            r#"
            INSERT INTO rules (id, user_id) VALUES (3, 42), (7, 42), (9, 50);
            INSERT INTO violation (id, rule_id, date_creation, date_paid) VALUES
                (1, 3, '2025-01-01 10:00:00', '2025-01-01 11:00:00'),
                (2, 7, '2025-01-02 10:00:00', '0000-00-00 00:00:00'),
                (3, 3, '2025-01-03 10:00:00', '0000-00-00 00:00:00');
            "#,
        );

        assert_eq!(store.latest_rule_for_user(UserId::new(42)).unwrap(), Some(RuleId::new(7)));
        assert_eq!(
            store.oldest_unpaid_rule_for_user(UserId::new(42)).unwrap(),
            Some(RuleId::new(7))
        );
        assert_eq!(store.oldest_unpaid_rule_for_user(UserId::new(50)).unwrap(), None);
        assert_eq!(store.latest_rule_for_user(UserId::new(77)).unwrap(), None);
    }

    #[test]
    fn test_unreachable_database_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("cw.db"), StoreOptions::default()).unwrap();
        drop(dir);

        assert!(store.resolve_owner(RuleId::new(7)).is_err());
        assert!(!store.is_healthy());
    }
}
