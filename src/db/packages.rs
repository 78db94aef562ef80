use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::{instrument, Instrument};

use crate::{
    error::Error,
    models::package::Package,
    registry::SearchResult,
    telemetry::{instrument_query, Operation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub restored: bool,
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Insert-or-update keyed by unique `name`. Overwrites all listing fields
    /// and clears the soft-delete marker; `restored` reports whether the row
    /// had been soft-deleted before this call.
    async fn upsert_package(&self, record: &SearchResult) -> Result<UpsertOutcome, Error>;

    /// Soft-delete every live row whose id is not in `seen_ids`. Returns the
    /// number of rows marked.
    async fn prune_missing(&self, seen_ids: &[i64]) -> Result<u64, Error>;
}

pub struct PgPackageStore {
    pool: Pool<Postgres>,
}

impl PgPackageStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackageStore for PgPackageStore {
    #[instrument(name = "upsert_package", skip(self, record), fields(package.name = %record.name))]
    async fn upsert_package(&self, record: &SearchResult) -> Result<UpsertOutcome, Error> {
        let mut transaction = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Package>(
            r#"SELECT * FROM packages WHERE name = $1 FOR UPDATE;"#,
        )
        .bind(&record.name)
        .fetch_optional(&mut *transaction)
        .instrument(instrument_query(Operation::Select, "packages"))
        .await?;

        let outcome = match existing {
            Some(package) => {
                let result = sqlx::query(
                    r#"UPDATE packages SET description = $1, url = $2, repository = $3, downloads = $4, favers = $5, deleted_at = NULL, updated_at = now() WHERE id = $6;"#,
                )
                .bind(&record.description)
                .bind(&record.url)
                .bind(&record.repository)
                .bind(record.downloads)
                .bind(record.favers)
                .bind(package.id)
                .execute(&mut *transaction)
                .instrument(instrument_query(Operation::Update, "packages"))
                .await?;

                if result.rows_affected() != 1 {
                    return Err(Error::InconsistentUpsert {
                        name: record.name.clone(),
                    });
                }

                UpsertOutcome {
                    id: package.id,
                    restored: package.is_deleted(),
                }
            }
            None => {
                let (id,): (i64,) = sqlx::query_as(
                    r#"INSERT INTO packages (name, description, url, repository, downloads, favers) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id;"#,
                )
                .bind(&record.name)
                .bind(&record.description)
                .bind(&record.url)
                .bind(&record.repository)
                .bind(record.downloads)
                .bind(record.favers)
                .fetch_one(&mut *transaction)
                .instrument(instrument_query(Operation::Insert, "packages"))
                .await?;

                UpsertOutcome {
                    id,
                    restored: false,
                }
            }
        };

        transaction.commit().await?;

        Ok(outcome)
    }

    #[instrument(name = "prune_missing", skip(self, seen_ids), fields(seen = seen_ids.len()))]
    async fn prune_missing(&self, seen_ids: &[i64]) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"UPDATE packages SET deleted_at = now(), updated_at = now() WHERE deleted_at IS NULL AND id <> ALL($1);"#,
        )
        .bind(seen_ids)
        .execute(&self.pool)
        .instrument(instrument_query(Operation::Update, "packages"))
        .await?;

        Ok(result.rows_affected())
    }
}
