use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::{DatabaseSettings, Settings},
    db::PgPackageStore,
    error::Error,
    registry::PackagistClient,
    sync::{SyncJob, SyncReport},
};

pub struct Application {
    client: PackagistClient,
    store: PgPackageStore,
}

impl Application {
    pub fn build(configuration: Settings) -> Result<Self> {
        let db_pool = get_db_pool(&configuration.database);
        let store = PgPackageStore::new(db_pool);
        let client = PackagistClient::build(configuration.registry)?;

        Ok(Self { client, store })
    }

    pub async fn run_until_synced(&self) -> Result<SyncReport, Error> {
        SyncJob::new(&self.client, &self.store).run().await
    }
}

pub fn get_db_pool(settings: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new().connect_lazy_with(settings.connect_options())
}
