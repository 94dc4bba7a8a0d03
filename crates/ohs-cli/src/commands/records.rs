use ohs_core::{Collection, LocalStore};
use serde_json::Value;

use crate::commands::common::{format_record_lines, AppContext};
use crate::error::CliError;

const PREVIEW_CHARS: usize = 80;

pub async fn run_records(
    context: &AppContext,
    collection: Collection,
    id: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let records = load_records(&context.store(), collection, id).await?;

    if as_json || id.is_some() {
        let output = match (id, records.as_slice()) {
            (Some(_), [record]) => record.clone(),
            _ => Value::Array(records),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No {collection} stored locally.");
        return Ok(());
    }

    for line in format_record_lines(&records, PREVIEW_CHARS) {
        println!("{line}");
    }
    Ok(())
}

pub async fn load_records(
    store: &LocalStore,
    collection: Collection,
    id: Option<&str>,
) -> Result<Vec<Value>, CliError> {
    let Some(id) = id.map(str::trim) else {
        return Ok(store.get_all(collection).await?);
    };

    store
        .get(collection, id)
        .await?
        .map(|record| vec![record])
        .ok_or_else(|| CliError::RecordNotFound(format!("{collection}/{id}")))
}
