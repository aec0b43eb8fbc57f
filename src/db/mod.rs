use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
    SqliteConnection, SqlitePool,
};
use tracing::{debug, info};

use crate::model::preferences::{PreferencesUpdate, UserPreferences};

const CREATE_PREFERENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_preferences (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at        TEXT,
    updated_at        TEXT,
    deleted_at        TEXT,
    user_id           TEXT    NOT NULL,
    sort_order        TEXT    NOT NULL DEFAULT '',
    hidden_devices    TEXT    NOT NULL DEFAULT '[]',
    default_filters   TEXT    NOT NULL DEFAULT '',
    map_settings      TEXT    NOT NULL DEFAULT '',
    show_address      BOOLEAN NOT NULL DEFAULT 1,
    show_engine_hours BOOLEAN NOT NULL DEFAULT 1,
    show_odometer     BOOLEAN NOT NULL DEFAULT 1,
    show_vin          BOOLEAN NOT NULL DEFAULT 1,
    show_speed        BOOLEAN NOT NULL DEFAULT 1,
    show_heading      BOOLEAN NOT NULL DEFAULT 1,
    show_battery      BOOLEAN NOT NULL DEFAULT 1,
    show_satellites   BOOLEAN NOT NULL DEFAULT 1,
    show_last_update  BOOLEAN NOT NULL DEFAULT 1,
    last_updated      TEXT
)"#;

const CREATE_USER_ID_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_user_preferences_user_id \
     ON user_preferences (user_id)";

pub struct DBLayer {
    pool: SqlitePool,
}

impl DBLayer {
    /// Opens (creating if needed) the database at `dsn` and migrates it.
    pub async fn new(dsn: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(dsn)
            .with_context(|| format!("Invalid database DSN {dsn}"))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // SQLite has a single writer. One pooled connection serializes every
        // upsert transaction and keeps `sqlite::memory:` databases alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .context("Failed to connect to database")?;

        let layer = Self { pool };
        layer.migrate().await?;
        Ok(layer)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_PREFERENCES_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create user_preferences table")?;
        sqlx::query(CREATE_USER_ID_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to create user_preferences index")?;
        info!("Database schema up to date");
        Ok(())
    }

    // ============================================================
    // USER PREFERENCES
    // ============================================================

    /// Stored preferences for `user_id`, or an unsaved all-visible default.
    pub async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let row = sqlx::query_as::<_, UserPreferences>(
            "SELECT * FROM user_preferences WHERE user_id = ? AND deleted_at IS NULL LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load preferences for {user_id}"))?;

        match row {
            Some(prefs) => Ok(prefs),
            None => {
                debug!(user_id, "no stored preferences, returning defaults");
                Ok(UserPreferences::defaults_for(user_id))
            }
        }
    }

    /// Full-replace write of `update` for `user_id`, inserting the row on
    /// first write. Runs in one transaction; dropping it on error or panic
    /// rolls back.
    pub async fn upsert_preferences(
        &self,
        user_id: &str,
        update: &PreferencesUpdate,
    ) -> Result<UserPreferences> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        // Soft-deleted rows still hold the unique key, so they are revived
        // rather than duplicated.
        let existing = sqlx::query_as::<_, UserPreferences>(
            "SELECT * FROM user_preferences WHERE user_id = ? LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("Failed to look up preferences for {user_id}"))?;

        let saved = match existing {
            Some(mut row) => {
                row.replace_with(update);
                row.updated_at = Some(Utc::now());
                row.deleted_at = None;
                update_row(&mut *tx, &row).await?
            }
            None => {
                let mut row = UserPreferences::defaults_for(user_id);
                row.replace_with(update);
                let now = Utc::now();
                row.created_at = Some(now);
                row.updated_at = Some(now);
                insert_row(&mut *tx, &row).await?
            }
        };

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit preferences for {user_id}"))?;

        info!(user_id, id = saved.id, "preferences saved");
        Ok(saved)
    }

    #[cfg(test)]
    pub async fn count_preferences(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_preferences")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Makes every later insert or update on the table abort.
    #[cfg(test)]
    pub async fn reject_writes(&self) -> Result<()> {
        for event in ["INSERT", "UPDATE"] {
            sqlx::query(&format!(
                "CREATE TRIGGER reject_{event} BEFORE {event} ON user_preferences \
                 BEGIN SELECT RAISE(ABORT, 'writes disabled'); END"
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

async fn insert_row(conn: &mut SqliteConnection, row: &UserPreferences) -> Result<UserPreferences> {
    sqlx::query_as::<_, UserPreferences>(
        "INSERT INTO user_preferences (
            created_at, updated_at, deleted_at, user_id, sort_order, hidden_devices,
            default_filters, map_settings, show_address, show_engine_hours, show_odometer,
            show_vin, show_speed, show_heading, show_battery, show_satellites,
            show_last_update, last_updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *",
    )
    .bind(row.created_at)
    .bind(row.updated_at)
    .bind(row.deleted_at)
    .bind(&row.user_id)
    .bind(&row.sort_order)
    .bind(Json(&row.hidden_devices))
    .bind(&row.default_filters)
    .bind(&row.map_settings)
    .bind(row.show_address)
    .bind(row.show_engine_hours)
    .bind(row.show_odometer)
    .bind(row.show_vin)
    .bind(row.show_speed)
    .bind(row.show_heading)
    .bind(row.show_battery)
    .bind(row.show_satellites)
    .bind(row.show_last_update)
    .bind(row.last_updated)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert preferences for {}", row.user_id))
}

async fn update_row(conn: &mut SqliteConnection, row: &UserPreferences) -> Result<UserPreferences> {
    sqlx::query_as::<_, UserPreferences>(
        "UPDATE user_preferences SET
            created_at = ?, updated_at = ?, deleted_at = ?, user_id = ?, sort_order = ?,
            hidden_devices = ?, default_filters = ?, map_settings = ?, show_address = ?,
            show_engine_hours = ?, show_odometer = ?, show_vin = ?, show_speed = ?,
            show_heading = ?, show_battery = ?, show_satellites = ?, show_last_update = ?,
            last_updated = ?
        WHERE id = ?
        RETURNING *",
    )
    .bind(row.created_at)
    .bind(row.updated_at)
    .bind(row.deleted_at)
    .bind(&row.user_id)
    .bind(&row.sort_order)
    .bind(Json(&row.hidden_devices))
    .bind(&row.default_filters)
    .bind(&row.map_settings)
    .bind(row.show_address)
    .bind(row.show_engine_hours)
    .bind(row.show_odometer)
    .bind(row.show_vin)
    .bind(row.show_speed)
    .bind(row.show_heading)
    .bind(row.show_battery)
    .bind(row.show_satellites)
    .bind(row.show_last_update)
    .bind(row.last_updated)
    .bind(row.id)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("Failed to update preferences for {}", row.user_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use tokio::task::JoinSet;

    use super::*;

    async fn memory_db() -> DBLayer {
        DBLayer::new("sqlite::memory:").await.unwrap()
    }

    fn all_visible() -> PreferencesUpdate {
        PreferencesUpdate {
            sort_order: String::new(),
            hidden_devices: Vec::new(),
            default_filters: String::new(),
            map_settings: String::new(),
            show_address: true,
            show_engine_hours: true,
            show_odometer: true,
            show_vin: true,
            show_speed: true,
            show_heading: true,
            show_battery: true,
            show_satellites: true,
            show_last_update: true,
            last_updated: None,
        }
    }

    #[tokio::test]
    async fn get_for_unknown_user_synthesizes_without_writing() {
        let db = memory_db().await;

        let prefs = db.get_preferences("ghost").await.unwrap();

        assert_eq!(prefs, UserPreferences::defaults_for("ghost"));
        assert_eq!(db.count_preferences().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn first_upsert_inserts_one_row() {
        let db = memory_db().await;
        let mut update = all_visible();
        update.show_address = false;
        update.hidden_devices = vec!["dev-1".into(), "dev-2".into()];

        let saved = db.upsert_preferences("42", &update).await.unwrap();

        assert!(saved.id > 0);
        assert_eq!(saved.user_id, "42");
        assert!(!saved.show_address);
        assert!(saved.created_at.is_some());
        assert_eq!(saved.hidden_devices, vec!["dev-1".to_string(), "dev-2".to_string()]);
        assert_eq!(db.count_preferences().await.unwrap(), 1);
        assert_eq!(db.get_preferences("42").await.unwrap(), saved);
    }

    #[tokio::test]
    async fn second_upsert_replaces_every_field() {
        let db = memory_db().await;

        let mut first = all_visible();
        first.sort_order = "name".into();
        first.map_settings = "{\"zoom\":4}".into();
        first.hidden_devices = vec!["dev-1".into()];
        let created = db.upsert_preferences("u1", &first).await.unwrap();

        let mut second = all_visible();
        second.show_vin = false;
        second.show_speed = false;
        second.last_updated = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let updated = db.upsert_preferences("u1", &second).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.sort_order, "");
        assert_eq!(updated.map_settings, "");
        assert!(updated.hidden_devices.is_empty());
        assert!(!updated.show_vin);
        assert!(!updated.show_speed);
        assert!(updated.show_address);
        assert_eq!(updated.last_updated, second.last_updated);
        assert_eq!(db.count_preferences().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upserts_for_different_users_stay_separate() {
        let db = memory_db().await;
        let mut hidden = all_visible();
        hidden.show_battery = false;

        db.upsert_preferences("a", &all_visible()).await.unwrap();
        db.upsert_preferences("b", &hidden).await.unwrap();

        assert!(db.get_preferences("a").await.unwrap().show_battery);
        assert!(!db.get_preferences("b").await.unwrap().show_battery);
        assert_eq!(db.count_preferences().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_upserts_leave_a_single_row() {
        let db = Arc::new(memory_db().await);
        let mut tasks = JoinSet::new();

        for i in 0..16 {
            let db = db.clone();
            tasks.spawn(async move {
                let mut update = all_visible();
                update.sort_order = format!("writer-{i}");
                db.upsert_preferences("shared", &update).await
            });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(db.count_preferences().await.unwrap(), 1);
        let stored = db.get_preferences("shared").await.unwrap();
        assert!(stored.sort_order.starts_with("writer-"));
    }

    #[tokio::test]
    async fn soft_deleted_row_is_hidden_then_revived() {
        let db = memory_db().await;
        let mut update = all_visible();
        update.show_heading = false;
        let saved = db.upsert_preferences("u9", &update).await.unwrap();

        sqlx::query("UPDATE user_preferences SET deleted_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(saved.id)
            .execute(&db.pool)
            .await
            .unwrap();

        assert!(db.get_preferences("u9").await.unwrap().show_heading);

        let revived = db.upsert_preferences("u9", &update).await.unwrap();
        assert_eq!(revived.id, saved.id);
        assert!(revived.deleted_at.is_none());
        assert!(!db.get_preferences("u9").await.unwrap().show_heading);
        assert_eq!(db.count_preferences().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_update_rolls_back_to_last_commit() {
        let db = memory_db().await;
        let mut first = all_visible();
        first.sort_order = "committed".into();
        let committed = db.upsert_preferences("u5", &first).await.unwrap();

        db.reject_writes().await.unwrap();
        let mut second = all_visible();
        second.sort_order = "lost".into();
        second.show_odometer = false;
        let err = db.upsert_preferences("u5", &second).await.unwrap_err();

        assert!(format!("{err:#}").contains("Failed to update preferences for u5"));
        assert_eq!(db.get_preferences("u5").await.unwrap(), committed);
        assert_eq!(db.count_preferences().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_row() {
        let db = memory_db().await;
        db.reject_writes().await.unwrap();

        let err = db.upsert_preferences("u6", &all_visible()).await.unwrap_err();

        assert!(format!("{err:#}").contains("Failed to insert preferences for u6"));
        assert_eq!(db.count_preferences().await.unwrap(), 0);
        assert_eq!(
            db.get_preferences("u6").await.unwrap(),
            UserPreferences::defaults_for("u6")
        );
    }
}
