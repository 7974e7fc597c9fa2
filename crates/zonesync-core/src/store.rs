//! The authoritative record store, backed by SQLite through sqlx.
//!
//! Uniqueness of the identity tuple (zone, resource, rtype, rdata) is
//! enforced by the storage layer: concurrent inserts of the same tuple race
//! at the UNIQUE index and exactly one wins. Every write runs inside a
//! transaction and rolls back fully on failure. All filters are bound as
//! parameters; no predicate is ever built from strings.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use zonesync_types::{resource_within, NewRecord, Record, RecordPatch, RecordType, StoreError};

use crate::validator;

/// SQL expression yielding the fully-qualified name of a row.
const FQDN_EXPR: &str = "CASE WHEN resource = '' THEN zone ELSE resource || '.' || zone END";

const SELECT_COLUMNS: &str =
    "SELECT record_id, zone, resource, rtype, ttl, rdata, created, updated FROM records";

/// Optional filters for [`RecordStore::list`]; all absent means everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub zone: Option<String>,
    pub rtype: Option<RecordType>,
    /// Fully-qualified name.
    pub rname: Option<String>,
    /// Strictly-greater-than watermark on the `updated` column.
    pub updated_after: Option<i64>,
}

/// Handle on the records database. Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Open (creating if absent) the database at `path` and ensure the schema.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(map_db)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                record_id INTEGER PRIMARY KEY AUTOINCREMENT,
                zone TEXT NOT NULL,
                resource TEXT NOT NULL,
                rtype TEXT NOT NULL,
                ttl INTEGER NOT NULL DEFAULT 3600,
                rdata TEXT NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db)?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_records_identity
             ON records (zone, resource, rtype, rdata)",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_updated ON records (updated)")
            .execute(&self.pool)
            .await
            .map_err(map_db)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_zone ON records (zone)")
            .execute(&self.pool)
            .await
            .map_err(map_db)?;

        Ok(())
    }

    /// List records matching the filter, in a stable order.
    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("{SELECT_COLUMNS} WHERE 1 = 1"));
        if let Some(zone) = &filter.zone {
            qb.push(" AND zone = ").push_bind(zone);
        }
        if let Some(rtype) = filter.rtype {
            qb.push(" AND rtype = ").push_bind(rtype.as_str());
        }
        if let Some(rname) = &filter.rname {
            qb.push(" AND ").push(FQDN_EXPR).push(" = ").push_bind(rname);
        }
        if let Some(after) = filter.updated_after {
            qb.push(" AND updated > ").push_bind(after);
        }
        qb.push(" ORDER BY zone, resource, rtype, rdata");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_db)?;
        rows.iter().map(record_from_row).collect()
    }

    /// Every record whose `updated` timestamp is strictly greater than
    /// `watermark`, across all zones.
    pub async fn changed_since(&self, watermark: i64) -> Result<Vec<Record>, StoreError> {
        self.list(&RecordFilter { updated_after: Some(watermark), ..Default::default() }).await
    }

    /// The authoritative zone list: every zone with at least one record.
    pub async fn zones(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT zone FROM records ORDER BY zone")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db)?;
        rows.iter().map(|row| row.try_get::<String, _>("zone").map_err(map_db)).collect()
    }

    /// Validate and insert a record. Duplicate identity tuple is a conflict,
    /// never an overwrite.
    pub async fn create(&self, new: &NewRecord) -> Result<Record, StoreError> {
        validator::validate(&new.zone, &new.resource, new.rtype, &new.rdata)?;
        check_ttl(new.ttl)?;

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(map_db)?;

        let result = sqlx::query(
            "INSERT INTO records (zone, resource, rtype, ttl, rdata, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(&new.zone)
        .bind(&new.resource)
        .bind(new.rtype.as_str())
        .bind(new.ttl)
        .bind(&new.rdata)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

        let id = result.last_insert_rowid();
        tx.commit().await.map_err(map_db)?;

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::Database("inserted record vanished".to_string()))
    }

    /// Update rows matching the (rtype, fqdn) key; insert instead when the
    /// key matches nothing, applying `default_ttl` when the patch carries no
    /// ttl. Returns the record and whether it was inserted.
    pub async fn upsert(
        &self,
        rtype: RecordType,
        rname: &str,
        patch: &RecordPatch,
        default_ttl: i64,
    ) -> Result<(Record, bool), StoreError> {
        if let Some(ttl) = patch.ttl {
            check_ttl(ttl)?;
        }

        let existing = self
            .list(&RecordFilter {
                rtype: Some(rtype),
                rname: Some(rname.to_string()),
                ..Default::default()
            })
            .await?;

        if existing.is_empty() {
            let zone = patch.zone.clone().ok_or_else(|| {
                StoreError::InvalidRecord("\"zone\" is required when inserting a new record".into())
            })?;
            let resource = resource_within(&zone, rname).ok_or_else(|| {
                StoreError::InvalidRecord(format!(
                    "zone \"{zone}\" does not match record name \"{rname}\""
                ))
            })?;
            let rdata = patch.rdata.clone().ok_or_else(|| {
                StoreError::InvalidRecord(
                    "\"rdata\" is required when inserting a new record".into(),
                )
            })?;

            let record = self
                .create(&NewRecord {
                    zone,
                    resource,
                    rtype,
                    rdata,
                    ttl: patch.ttl.unwrap_or(default_ttl),
                })
                .await?;
            return Ok((record, true));
        }

        // Re-validate the new rdata against the key's zone before touching
        // any row.
        let sample = &existing[0];
        if let Some(rdata) = &patch.rdata {
            validator::validate(&sample.zone, &sample.resource, rtype, rdata)?;
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(map_db)?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE records SET updated = ");
        qb.push_bind(now);
        if let Some(rdata) = &patch.rdata {
            qb.push(", rdata = ").push_bind(rdata);
        }
        if let Some(ttl) = patch.ttl {
            qb.push(", ttl = ").push_bind(ttl);
        }
        qb.push(" WHERE rtype = ").push_bind(rtype.as_str());
        qb.push(" AND ").push(FQDN_EXPR).push(" = ").push_bind(rname);

        qb.build().execute(&mut *tx).await.map_err(map_write_err)?;
        tx.commit().await.map_err(map_db)?;

        let refreshed = self
            .list(&RecordFilter {
                rtype: Some(rtype),
                rname: Some(rname.to_string()),
                ..Default::default()
            })
            .await?;
        refreshed
            .into_iter()
            .next()
            .map(|record| (record, false))
            .ok_or_else(|| StoreError::Database("updated record vanished".to_string()))
    }

    /// Remove rows matching the (rtype, fqdn) key. Zero removals is a normal
    /// outcome, not an error.
    pub async fn delete(&self, rtype: RecordType, rname: &str) -> Result<u64, StoreError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("DELETE FROM records WHERE rtype = ");
        qb.push_bind(rtype.as_str());
        qb.push(" AND ").push(FQDN_EXPR).push(" = ").push_bind(rname);

        let result = qb.build().execute(&self.pool).await.map_err(map_db)?;
        Ok(result.rows_affected())
    }

    async fn get(&self, id: i64) -> Result<Option<Record>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE record_id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db)?;
        row.as_ref().map(record_from_row).transpose()
    }
}

fn check_ttl(ttl: i64) -> Result<(), StoreError> {
    if ttl <= 0 {
        return Err(StoreError::InvalidRecord(format!("ttl must be positive, got {ttl}")));
    }
    Ok(())
}

fn record_from_row(row: &SqliteRow) -> Result<Record, StoreError> {
    let rtype: String = row.try_get("rtype").map_err(map_db)?;
    Ok(Record {
        id: row.try_get("record_id").map_err(map_db)?,
        zone: row.try_get("zone").map_err(map_db)?,
        resource: row.try_get("resource").map_err(map_db)?,
        rtype: rtype
            .parse()
            .map_err(|_| StoreError::Database(format!("corrupt rtype column \"{rtype}\"")))?,
        ttl: row.try_get("ttl").map_err(map_db)?,
        rdata: row.try_get("rdata").map_err(map_db)?,
        created: row.try_get("created").map_err(map_db)?,
        updated: row.try_get("updated").map_err(map_db)?,
    })
}

fn map_db(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn map_write_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => map_db(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (RecordStore, TempDir) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let store = RecordStore::connect(&tmp.path().join("records.sqlite"))
            .await
            .expect("failed to open test store");
        (store, tmp)
    }

    fn www_a() -> NewRecord {
        NewRecord {
            zone: "example.com".into(),
            resource: "www".into(),
            rtype: RecordType::A,
            rdata: "10.0.0.5".into(),
            ttl: 3600,
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let (store, _tmp) = test_store().await;
        let record = store.create(&www_a()).await.unwrap();
        assert_eq!(record.fqdn(), "www.example.com");
        assert_eq!(record.created, record.updated);

        let all = store.list(&RecordFilter::default()).await.unwrap();
        assert_eq!(all, vec![record]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict_not_an_overwrite() {
        let (store, _tmp) = test_store().await;
        store.create(&www_a()).await.unwrap();

        let err = store.create(&www_a()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        // The conflict message is fixed and distinct from validation reasons.
        assert_eq!(err.to_string(), "record already exists");

        assert_eq!(store.list(&RecordFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_is_distinct_from_duplicate() {
        let (store, _tmp) = test_store().await;
        let mut bad = www_a();
        bad.rdata = "not-an-ip".into();
        let err = store.create(&bad).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_ne!(err.to_string(), StoreError::Duplicate.to_string());
    }

    #[tokio::test]
    async fn non_positive_ttl_is_rejected() {
        let (store, _tmp) = test_store().await;
        let mut bad = www_a();
        bad.ttl = 0;
        assert!(matches!(store.create(&bad).await, Err(StoreError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn changed_since_is_strictly_greater_than() {
        let (store, _tmp) = test_store().await;
        let record = store.create(&www_a()).await.unwrap();

        assert_eq!(store.changed_since(0).await.unwrap().len(), 1);
        assert_eq!(store.changed_since(record.updated - 1).await.unwrap().len(), 1);
        assert!(store.changed_since(record.updated).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn changed_since_on_empty_store_is_empty() {
        let (store, _tmp) = test_store().await;
        assert!(store.changed_since(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_updates_existing_rows_and_bumps_updated() {
        let (store, _tmp) = test_store().await;
        let created = store.create(&www_a()).await.unwrap();

        let patch =
            RecordPatch { rdata: Some("10.0.0.9".into()), ttl: Some(60), zone: None };
        let (updated, inserted) =
            store.upsert(RecordType::A, "www.example.com", &patch, 3600).await.unwrap();

        assert!(!inserted);
        assert_eq!(updated.rdata, "10.0.0.9");
        assert_eq!(updated.ttl, 60);
        assert_eq!(updated.created, created.created);
        assert!(updated.updated >= updated.created);
    }

    #[tokio::test]
    async fn upsert_inserts_when_key_matches_nothing() {
        let (store, _tmp) = test_store().await;
        let patch = RecordPatch {
            zone: Some("example.com".into()),
            rdata: Some("fd00::1".into()),
            ttl: None,
        };
        let (record, inserted) =
            store.upsert(RecordType::Aaaa, "api.example.com", &patch, 3600).await.unwrap();

        assert!(inserted);
        assert_eq!(record.resource, "api");
        assert_eq!(record.ttl, 3600);
    }

    #[tokio::test]
    async fn upsert_insert_applies_the_configured_default_ttl() {
        let (store, _tmp) = test_store().await;
        let patch = RecordPatch {
            zone: Some("example.com".into()),
            rdata: Some("10.0.0.9".into()),
            ttl: None,
        };
        let (record, inserted) =
            store.upsert(RecordType::A, "db.example.com", &patch, 300).await.unwrap();

        assert!(inserted);
        assert_eq!(record.ttl, 300);

        // An explicit ttl in the patch still wins over the default.
        let explicit = RecordPatch {
            zone: Some("example.com".into()),
            rdata: Some("10.0.0.10".into()),
            ttl: Some(120),
        };
        let (record, _) =
            store.upsert(RecordType::A, "cache.example.com", &explicit, 300).await.unwrap();
        assert_eq!(record.ttl, 120);
    }

    #[tokio::test]
    async fn upsert_insert_requires_zone_and_rdata() {
        let (store, _tmp) = test_store().await;
        let err = store
            .upsert(RecordType::A, "www.example.com", &RecordPatch::default(), 3600)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_replacement_rdata() {
        let (store, _tmp) = test_store().await;
        store.create(&www_a()).await.unwrap();

        let patch = RecordPatch { rdata: Some("not-an-ip".into()), ..Default::default() };
        let err =
            store.upsert(RecordType::A, "www.example.com", &patch, 3600).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));

        // And the row is untouched.
        let all = store.list(&RecordFilter::default()).await.unwrap();
        assert_eq!(all[0].rdata, "10.0.0.5");
    }

    #[tokio::test]
    async fn delete_returns_removed_count_and_zero_is_normal() {
        let (store, _tmp) = test_store().await;
        store.create(&www_a()).await.unwrap();
        let mut second = www_a();
        second.rdata = "10.0.0.6".into();
        store.create(&second).await.unwrap();

        assert_eq!(store.delete(RecordType::A, "www.example.com").await.unwrap(), 2);
        assert_eq!(store.delete(RecordType::A, "www.example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn filters_are_combined() {
        let (store, _tmp) = test_store().await;
        store.create(&www_a()).await.unwrap();
        store
            .create(&NewRecord {
                zone: "example.org".into(),
                resource: "mail".into(),
                rtype: RecordType::Mx,
                rdata: "10 mail.example.org".into(),
                ttl: 3600,
            })
            .await
            .unwrap();

        let by_zone = store
            .list(&RecordFilter { zone: Some("example.org".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_zone.len(), 1);
        assert_eq!(by_zone[0].rtype, RecordType::Mx);

        let by_name = store
            .list(&RecordFilter {
                rname: Some("www.example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].resource, "www");
    }

    #[tokio::test]
    async fn zones_lists_distinct_zones() {
        let (store, _tmp) = test_store().await;
        store.create(&www_a()).await.unwrap();
        let mut second = www_a();
        second.resource = "db".into();
        store.create(&second).await.unwrap();
        store
            .create(&NewRecord {
                zone: "example.org".into(),
                resource: "".into(),
                rtype: RecordType::A,
                rdata: "10.0.0.7".into(),
                ttl: 3600,
            })
            .await
            .unwrap();

        assert_eq!(store.zones().await.unwrap(), vec!["example.com", "example.org"]);
    }

    #[tokio::test]
    async fn apex_records_match_the_bare_zone_as_rname() {
        let (store, _tmp) = test_store().await;
        store
            .create(&NewRecord {
                zone: "example.com".into(),
                resource: "".into(),
                rtype: RecordType::A,
                rdata: "10.0.0.1".into(),
                ttl: 3600,
            })
            .await
            .unwrap();

        let found = store
            .list(&RecordFilter { rname: Some("example.com".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.delete(RecordType::A, "example.com").await.unwrap(), 1);
    }
}
