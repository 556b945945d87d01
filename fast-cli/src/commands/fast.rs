//! Start, cancel and complete a fast.

use anyhow::Result;
use fast_client::{FastOutcome, FastingController, FastingStore};

/// Start a fast of `goal_hours`, replacing any session on record.
pub async fn start<S: FastingStore + 'static>(
    controller: &FastingController<S>,
    goal_hours: u32,
) -> Result<()> {
    applied(controller.start_fast(goal_hours).await?)?;

    println!("Fast started: goal {goal_hours}h.");
    println!("Check in with: unplugged status");
    Ok(())
}

/// Abandon the running fast. Nothing is added to history.
pub async fn cancel<S: FastingStore + 'static>(controller: &FastingController<S>) -> Result<()> {
    applied(controller.cancel_fast().await?)?;

    println!("Fast cancelled.");
    Ok(())
}

/// Complete the running fast with a reflection.
pub async fn complete<S: FastingStore + 'static>(
    controller: &FastingController<S>,
    reflection: &str,
) -> Result<()> {
    applied(controller.complete_fast(reflection).await?)?;

    let content = controller.content().await?;
    println!("Fast completed!");
    println!();
    println!("{}", content.completion_encouragement);
    Ok(())
}

fn applied(outcome: FastOutcome) -> Result<()> {
    match outcome {
        FastOutcome::Applied => Ok(()),
        FastOutcome::Rejected(rejection) => anyhow::bail!("{rejection}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast_client::{ControllerConfig, MemoryStore};
    use fast_types::{FastStatus, Time};

    fn controller() -> FastingController<MemoryStore> {
        FastingController::new(
            MemoryStore::new(Time::from_secs(1_700_000_000)),
            ControllerConfig::default(),
        )
    }

    #[tokio::test]
    async fn start_records_session() {
        let controller = controller();
        start(&controller, 12).await.unwrap();

        let session = controller.store().get_fasting_progress().await.unwrap();
        assert_eq!(session.status, FastStatus::InProgress { elapsed_hours: 0 });
        assert_eq!(session.goal_hours, 12);
        controller.shutdown();
    }

    #[tokio::test]
    async fn start_rejects_out_of_range_goal() {
        let controller = controller();
        let err = start(&controller, 80).await.unwrap_err();

        assert!(err.to_string().contains("got 80"));
        assert_eq!(controller.store().call_count("startNewFast"), 0);
    }

    #[tokio::test]
    async fn cancel_without_fast_fails() {
        let controller = controller();
        let err = cancel(&controller).await.unwrap_err();
        assert!(err.to_string().contains("no fast is in progress"));
    }

    #[tokio::test]
    async fn fresh_controller_can_complete_existing_fast() {
        let store = MemoryStore::new(Time::from_secs(1_700_000_000));
        store.start_new_fast(8).await.unwrap();

        // A new process knows nothing until it refreshes
        let controller = FastingController::new(store, ControllerConfig::default());
        complete(&controller, "Grateful").await.unwrap();

        assert_eq!(controller.store().history_len(), 1);
        let session = controller.store().get_fasting_progress().await.unwrap();
        assert_eq!(session.reflection_journal, "Grateful");
    }

    #[tokio::test]
    async fn cancel_leaves_history_alone() {
        let store = MemoryStore::new(Time::from_secs(1_700_000_000));
        store.start_new_fast(8).await.unwrap();
        let controller = FastingController::new(store, ControllerConfig::default());

        cancel(&controller).await.unwrap();

        assert_eq!(controller.store().history_len(), 0);
        let session = controller.store().get_fasting_progress().await.unwrap();
        assert_eq!(session.status, FastStatus::NotStarted);
    }
}
