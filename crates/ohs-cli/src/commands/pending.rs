use chrono::Utc;

use crate::commands::common::{format_pending_lines, pending_to_item, AppContext, PendingItem};
use crate::error::CliError;

pub async fn run_pending(context: &AppContext, list: bool, as_json: bool) -> Result<(), CliError> {
    let store = context.store();

    if !list {
        let count = store.pending_count().await?;
        if as_json {
            println!("{}", serde_json::json!({ "pending": count }));
        } else {
            println!("{count}");
        }
        return Ok(());
    }

    let pending = store.pending_mutations().await?;
    if as_json {
        let json_items = pending
            .iter()
            .map(pending_to_item)
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("No queued requests.");
        return Ok(());
    }

    for line in format_pending_lines(&pending, Utc::now()) {
        println!("{line}");
    }
    Ok(())
}
