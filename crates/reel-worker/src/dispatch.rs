//! Bounded parallel clip dispatch.
//!
//! Workers run in a pool of `min(max_parallel, N)` and finish in any order;
//! each result lands in the slot of its request index, so the returned
//! vector is always in reel order.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use reel_models::ClipRequest;

use crate::error::ClipError;

/// Run `work` for every request with bounded concurrency.
///
/// The first fatal error (in completion order) wins. Remaining workers
/// still run to completion, then every partial result is dropped.
pub async fn dispatch_all<T, F, Fut>(
    requests: Vec<ClipRequest>,
    max_parallel: usize,
    work: F,
) -> Result<Vec<T>, ClipError>
where
    F: Fn(ClipRequest) -> Fut,
    Fut: Future<Output = Result<T, ClipError>>,
{
    let total = requests.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let pool = max_parallel.max(1).min(total);
    debug!(clips = total, pool, "Dispatching clip workers");

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut first_error: Option<ClipError> = None;

    let mut results = stream::iter(requests)
        .map(|request| {
            let index = request.index;
            let fut = work(request);
            async move { (index, fut.await) }
        })
        .buffer_unordered(pool);

    while let Some((index, result)) = results.next().await {
        match result {
            Ok(item) => {
                if let Err(e) = fill_slot(&mut slots, index, item) {
                    first_error.get_or_insert(e);
                }
            }
            Err(e) => {
                warn!(clip_index = e.index, error = %e.message, "Clip worker failed");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        // Partial results are dropped here with their temp files.
        drop(slots);
        return Err(e);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or_else(|| ClipError::new(index, "no result produced for clip")))
        .collect()
}

fn fill_slot<T>(slots: &mut [Option<T>], index: usize, item: T) -> Result<(), ClipError> {
    match slots.get_mut(index) {
        None => Err(ClipError::new(index, "clip index out of range")),
        Some(Some(_)) => Err(ClipError::new(index, "duplicate result for clip")),
        Some(slot) => {
            *slot = Some(item);
            Ok(())
        }
    }
}
