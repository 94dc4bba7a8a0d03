use ohs_core::{ApiResponse, HttpMethod, RequestOptions};

use crate::commands::common::{mirror_online, parse_json_data, AppContext};
use crate::error::CliError;

pub async fn run_request(
    context: &AppContext,
    method: HttpMethod,
    endpoint: &str,
    data: Option<&str>,
) -> Result<(), CliError> {
    let body = parse_json_data(data)?;
    let client = context.client()?;
    let response = client
        .request(method, endpoint, body, RequestOptions::default())
        .await?;

    match &response {
        ApiResponse::Online(_) => {
            mirror_online(client.store(), method, endpoint, &response).await;
        }
        ApiResponse::Queued { id } => {
            eprintln!("Offline: {method} {endpoint} queued as #{id}. Run `ohs sync` when back online.");
        }
        ApiResponse::Cached { cached_at, .. } => {
            eprintln!("Offline: showing cached response from {}", cached_at.to_rfc3339());
        }
    }

    println!("{}", serde_json::to_string_pretty(&response.into_json())?);
    Ok(())
}
