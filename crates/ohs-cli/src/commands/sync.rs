use ohs_core::{ConnectivityState, SyncOutcome, SyncReconciler};

use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_sync(context: &AppContext) -> Result<(), CliError> {
    let client = context.client()?;
    let reconciler = SyncReconciler::new(client.clone());

    if context.offline || client.check_connectivity().await == ConnectivityState::Offline {
        let pending = reconciler.pending_sync_count().await;
        println!("API unreachable: {pending} request(s) left in the queue");
        return Ok(());
    }

    match reconciler.sync_offline_requests().await? {
        SyncOutcome::Completed(report) if report.replayed + report.failed == 0 => {
            println!("Nothing to sync");
        }
        SyncOutcome::Completed(report) => {
            println!(
                "Sync completed: {} replayed, {} failed, {} remaining",
                report.replayed, report.failed, report.remaining
            );
        }
        SyncOutcome::AlreadyRunning => println!("A sync is already running"),
    }
    Ok(())
}
