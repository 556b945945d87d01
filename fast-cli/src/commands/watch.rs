//! Follow a running fast until it ends.

use anyhow::Result;
use fast_client::{FastingController, FastingStore};
use std::future::Future;

use super::status;

/// Run the watch command.
///
/// Prints the status now and again whenever the controller's poller brings
/// a new snapshot. Returns when the fast leaves `InProgress` or `stop`
/// resolves.
pub async fn run<S, F>(controller: &FastingController<S>, stop: F) -> Result<()>
where
    S: FastingStore + 'static,
    F: Future<Output = ()>,
{
    let mut snapshots = controller.subscribe();
    let snapshot = controller.refresh_progress().await?;
    snapshots.borrow_and_update();

    print_status(controller, &snapshot).await?;
    if !snapshot.state.is_in_progress() {
        return Ok(());
    }

    tokio::pin!(stop);
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = snapshots.borrow_and_update().clone() else {
                    continue;
                };
                print_status(controller, &snapshot).await?;
                if !snapshot.state.is_in_progress() {
                    break;
                }
            }
            _ = &mut stop => break,
        }
    }

    controller.shutdown();
    Ok(())
}

async fn print_status<S: FastingStore + 'static>(
    controller: &FastingController<S>,
    snapshot: &fast_client::SessionSnapshot,
) -> Result<()> {
    let content = controller.content().await?;
    let count = content.hourly_encouragement.len();
    let progress = fast_core::FastProgress::from_state(&snapshot.state, count);
    println!("{}", status::render(snapshot, progress.as_ref(), content));
    Ok(())
}
