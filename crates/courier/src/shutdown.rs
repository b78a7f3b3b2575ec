//! Shutdown signalling shared by the long-running tasks.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

/// Create the process-wide shutdown channel; flipping the sender to `true`
/// stops every task watching the receiver.
pub fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Sleep for `duration`, returning `true` if shutdown was signalled first.
///
/// A dropped sender counts as shutdown.
pub async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    // Pin the branch futures and select over `&mut` references so the borrow
    // of `shutdown` is captured in a shape that stays `Send` when callers are
    // spawned onto the runtime (rust-lang/rust#102211).
    let sleep = time::sleep(duration);
    let changed = shutdown.changed();
    tokio::pin!(sleep, changed);
    tokio::select! {
        _ = &mut sleep => false,
        _ = &mut changed => true,
    }
}
