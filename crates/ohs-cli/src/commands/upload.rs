use std::path::Path;

use ohs_core::{ApiResponse, HttpMethod};

use crate::commands::common::{mirror_online, parse_form_fields, read_upload_file, AppContext};
use crate::error::CliError;

pub async fn run_upload(
    context: &AppContext,
    endpoint: &str,
    file_path: &Path,
    fields: &[String],
    content_type: Option<String>,
) -> Result<(), CliError> {
    let fields = parse_form_fields(fields)?;
    let file = read_upload_file(file_path, content_type)?;
    let client = context.client()?;

    let response = ApiResponse::Online(client.upload(endpoint, file, fields).await?);
    mirror_online(client.store(), HttpMethod::Post, endpoint, &response).await;
    println!("{}", serde_json::to_string_pretty(&response.into_json())?);
    Ok(())
}
