use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bookmarks::BookmarkRecord;
use crate::extractor::{ContentExtractor, ExtractError};
use crate::note;
use crate::runs::{ConversionResult, PreviousResults, upsert};
use crate::vault::Vault;

/// Message recorded for failures carried over from a resumed run until they
/// are retried.
pub const RETRY_PENDING: &str = "Retrying from previous run";

/// How a batch stopped.
#[derive(Debug)]
pub enum BatchEnd {
    Completed,
    Cancelled { remaining: usize },
    Fatal(ExtractError),
}

/// Split the export into work for this run. URLs that succeeded before are
/// skipped; earlier failures are seeded as results so they stay recorded if
/// this run never reaches them.
pub fn plan_resume(
    items: Vec<BookmarkRecord>,
    previous: &PreviousResults,
) -> (Vec<BookmarkRecord>, Vec<ConversionResult>) {
    let pending = items
        .into_iter()
        .filter(|item| !previous.successful.contains(&item.url))
        .collect();
    let seeded = previous
        .failed
        .iter()
        .cloned()
        .map(|record| ConversionResult::failed(record, RETRY_PENDING))
        .collect();
    (pending, seeded)
}

/// Clip `items` one after another into `vault`, recording each outcome in
/// `results`. Stops before the next item once `shutdown` is cancelled, and
/// immediately on an error that no later item could survive.
pub async fn process_batch(
    extractor: &mut ContentExtractor,
    vault: &Vault,
    items: &[BookmarkRecord],
    results: &mut Vec<ConversionResult>,
    shutdown: &CancellationToken,
) -> BatchEnd {
    let total = items.len();

    for (index, record) in items.iter().enumerate() {
        if shutdown.is_cancelled() {
            warn!(remaining = total - index, "stopping early on shutdown request");
            return BatchEnd::Cancelled {
                remaining: total - index,
            };
        }

        let retry = results.iter().any(|r| r.record.url == record.url);
        info!(
            progress = %format!("{}/{}", index + 1, total),
            retry,
            title = %record.title,
            url = %record.url,
            "clipping"
        );

        match extractor.extract(&record.url).await {
            Ok(content) => {
                let markdown = note::render(record, &content);
                match vault.write_note(record, &markdown) {
                    Ok(path) => {
                        info!(path = %path.display(), "clipped");
                        upsert(results, ConversionResult::success(record.clone(), path));
                    }
                    Err(err) => {
                        warn!(url = %record.url, "writing note failed: {}", err);
                        upsert(
                            results,
                            ConversionResult::failed(record.clone(), format!("write failed: {err}")),
                        );
                    }
                }
            }
            Err(err) if err.is_fatal() => {
                error!(url = %record.url, "aborting batch: {}", err);
                upsert(results, ConversionResult::failed(record.clone(), err.to_string()));
                return BatchEnd::Fatal(err);
            }
            Err(err) => {
                warn!(url = %record.url, kind = ?err.kind(), "clipping failed: {}", err);
                upsert(results, ConversionResult::failed(record.clone(), err.to_string()));
            }
        }
    }

    BatchEnd::Completed
}
