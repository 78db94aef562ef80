use tracing::instrument;

use crate::{
    db::PackageStore,
    error::Error,
    registry::{decode_next_url, SearchClient, SearchResult},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub seen: usize,
    pub pruned: u64,
}

/// Drives one full listing sync: fetch pages until the listing ends, upsert
/// every record, then soft-delete whatever the run did not see.
pub struct SyncJob<'a, C, S> {
    client: &'a C,
    store: &'a S,
}

impl<'a, C, S> SyncJob<'a, C, S>
where
    C: SearchClient,
    S: PackageStore,
{
    pub fn new(client: &'a C, store: &'a S) -> Self {
        Self { client, store }
    }

    #[instrument(name = "sync_package_list", skip(self))]
    pub async fn run(&self) -> Result<SyncReport, Error> {
        let mut seen_ids: Vec<i64> = Vec::new();
        let mut url = self.client.first_page_url();

        loop {
            let Some(page) = self.client.fetch_page(&url).await? else {
                break;
            };

            tracing::debug!(
                total = page.total,
                results = page.results.len(),
                url = %url,
                "fetched search page"
            );

            self.save(&page.results, &mut seen_ids).await?;

            match page.next {
                Some(next) => url = decode_next_url(&next)?,
                None => break,
            }
        }

        let pruned = if seen_ids.is_empty() {
            0
        } else {
            self.store.prune_missing(&seen_ids).await?
        };

        Ok(SyncReport {
            seen: seen_ids.len(),
            pruned,
        })
    }

    async fn save(&self, results: &[SearchResult], seen_ids: &mut Vec<i64>) -> Result<(), Error> {
        for record in results {
            let outcome = match self.store.upsert_package(record).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(
                        batch = %serde_json::to_string(results).unwrap_or_default(),
                        "failed to save package batch"
                    );
                    return Err(error);
                }
            };

            if outcome.restored {
                tracing::info!(package.name = %record.name, "restored soft-deleted package");
            }

            seen_ids.push(outcome.id);
        }

        Ok(())
    }
}
