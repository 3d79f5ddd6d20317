//! Scavenger (§4.10): a fixed-interval sweep that reclaims allocations left
//! behind by payments nobody ever settled, cancelled, or waited on.

use std::sync::Arc;
use std::time::Duration;

use nanorelay_core::{unix_now, ALLOCATION_EXPIRY_SECS, SCAVENGER_TICK_SECS};

use crate::lifecycle::LifecycleController;

pub async fn run(controller: Arc<LifecycleController>) {
    let mut interval = tokio::time::interval(Duration::from_secs(SCAVENGER_TICK_SECS));
    loop {
        interval.tick().await;
        sweep(&controller).await;
    }
}

#[cfg(test)]
pub(crate) async fn run_once_for_test(controller: &Arc<LifecycleController>) {
    sweep(controller).await;
}

async fn sweep(controller: &LifecycleController) {
    let cutoff = unix_now() - ALLOCATION_EXPIRY_SECS;
    let stale = match controller.store().expired(cutoff) {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(error = %e, "scavenger: listing expired allocations failed");
            return;
        }
    };
    for id in stale {
        controller.scavenge_one(&id).await;
    }
}
