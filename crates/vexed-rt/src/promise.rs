//! Awaiting registered host futures.
//!
//! When a reduction round reaches a fixed point with promises still
//! registered, the evaluator hands every one of them to [`await_batch`] at
//! once. The futures run concurrently on a `JoinSet` and each result is
//! recorded as `Settled`; the reducer converts it into a tree node the next
//! time it meets the promise.

use tokio::task::JoinSet;
use tracing::{debug, warn};
use vexed_common::PromiseId;

use crate::heap::{Heap, PromiseState};

/// Await the registered promises among `ids`. Returns how many were
/// awaited.
pub async fn await_batch(heap: &mut Heap, ids: &[PromiseId]) -> usize {
    let mut set = JoinSet::new();
    let mut in_flight = Vec::new();
    for &id in ids {
        let ty = match heap.promise(id) {
            PromiseState::Registered { ty, .. } => *ty,
            _ => continue,
        };
        let PromiseState::Registered { future, .. } =
            std::mem::replace(heap.promise_mut(id), PromiseState::InFlight { ty })
        else {
            continue;
        };
        set.spawn(async move { (id, future.await) });
        in_flight.push(id);
    }
    debug!(count = in_flight.len(), "awaiting promise batch");

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((id, result)) => {
                if let Err(message) = &result {
                    debug!(promise = %id, %message, "promise rejected");
                }
                *heap.promise_mut(id) = PromiseState::Settled(result);
            }
            Err(err) => warn!(error = %err, "promise task failed"),
        }
    }

    // A task that panicked never reported back.
    for &id in &in_flight {
        if let PromiseState::InFlight { .. } = heap.promise(id) {
            *heap.promise_mut(id) = PromiseState::Settled(Err(format!("promise task failed: {id}")));
        }
    }
    in_flight.len()
}
