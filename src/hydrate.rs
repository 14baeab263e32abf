use std::collections::BTreeMap;

use tracing::info;

use crate::domain::{CanonicalId, DisplayMetadata};
use crate::fetch::BatchFetcher;
use crate::openalex::MetadataApi;
use crate::progress::ProgressTracker;

pub async fn hydrate_metadata<A: MetadataApi>(
    fetcher: &BatchFetcher<'_, A>,
    ids: &[CanonicalId],
    progress: &mut ProgressTracker<'_>,
) -> BTreeMap<CanonicalId, DisplayMetadata> {
    progress.set_stage("Hydrating metadata");
    progress.set_total(fetcher.group_count(ids));

    let records = fetcher.fetch_bulk_full(ids, progress).await;
    info!(requested = ids.len(), hydrated = records.len(), "metadata hydrated");

    records
        .into_iter()
        .map(|(id, record)| (id, record.metadata))
        .collect()
}
