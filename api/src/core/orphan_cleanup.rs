//! Removes chunks of files no session knows about.

use std::collections::BTreeSet;

use rag_store::ChunkStore;
use tracing::{info, warn};

/// Deletes every stored file that is not in `active`, returning the names removed.
///
/// Never fails: listing or deletion errors are logged and skipped.
pub async fn cleanup_orphans(store: &dyn ChunkStore, active: &BTreeSet<String>) -> Vec<String> {
    let stored = match store.list_file_names().await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "orphan cleanup skipped: cannot list stored files");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for name in stored.difference(active) {
        match store.delete_file(name).await {
            Ok(chunks) => {
                info!(file_name = %name, chunks, "orphaned file removed");
                removed.push(name.clone());
            }
            Err(e) => warn!(file_name = %name, error = %e, "failed to remove orphaned file"),
        }
    }
    removed
}
