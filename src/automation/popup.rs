//! Popup window detection over the CDP event stream.
//!
//! Subscribe before triggering the action that may open a popup, then wait
//! here; events emitted between the action and the wait are not lost.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::cdp::{CdpEvent, TargetInfo};

const TARGET_CREATED: &str = "Target.targetCreated";
const TARGET_DESTROYED: &str = "Target.targetDestroyed";

/// Wait for a new page target. `None` if none appears within `limit`.
pub async fn wait_for_new_page(
    events: &mut broadcast::Receiver<CdpEvent>,
    limit: Duration,
) -> Option<TargetInfo> {
    let deadline = Instant::now() + limit;
    loop {
        let event = next_event(events, deadline).await?;
        if event.method != TARGET_CREATED {
            continue;
        }
        match serde_json::from_value::<TargetInfo>(event.params["targetInfo"].clone()) {
            Ok(info) if info.is_page() => {
                debug!(target_id = %info.target_id, url = %info.url, "New page opened");
                return Some(info);
            }
            Ok(_) => {}
            Err(e) => warn!("Malformed targetCreated event: {}", e),
        }
    }
}

/// Wait for `target_id` to be destroyed. `false` on timeout.
pub async fn wait_for_target_closed(
    events: &mut broadcast::Receiver<CdpEvent>,
    target_id: &str,
    limit: Duration,
) -> bool {
    let deadline = Instant::now() + limit;
    while let Some(event) = next_event(events, deadline).await {
        if event.method == TARGET_DESTROYED && event.params["targetId"].as_str() == Some(target_id) {
            return true;
        }
    }
    false
}

async fn next_event(
    events: &mut broadcast::Receiver<CdpEvent>,
    deadline: Instant,
) -> Option<CdpEvent> {
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => return Some(event),
            Ok(Err(RecvError::Lagged(skipped))) => {
                warn!(skipped, "CDP event subscriber lagged");
            }
            Ok(Err(RecvError::Closed)) | Err(_) => return None,
        }
    }
}
