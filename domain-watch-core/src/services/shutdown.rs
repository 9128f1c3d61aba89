//! Shutdown signalling shared by the background loops.

use tokio::sync::watch;

/// Resolve once the monitor has been asked to stop.
///
/// A dropped sender counts as a stop request.
pub(crate) async fn stopped(signal: &mut watch::Receiver<bool>) {
    // The borrowed value is not held past this statement.
    let _ = signal.wait_for(|stop| *stop).await;
}
