use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ohs_core::api::{ReqwestTransport, UploadFile};
use ohs_core::config::{normalize_base_url, ClientConfig};
use ohs_core::util::compact_text;
use ohs_core::{
    ApiClient, ApiResponse, ConnectivityMonitor, ConnectivityState, HttpMethod, LocalStore,
    PendingMutation,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;
use crate::session_store::KeyringSessionStore;

pub type OhsClient = ApiClient<ReqwestTransport, KeyringSessionStore>;

/// Resolved global options shared by every command.
pub struct AppContext {
    pub config: ClientConfig,
    pub offline: bool,
}

impl AppContext {
    pub fn new(
        api_url: Option<String>,
        db_path: Option<PathBuf>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env().map_err(CliError::Config)?;
        if let Some(api_url) = api_url {
            config.api_base_url =
                normalize_base_url(&api_url).map_err(CliError::Config)?;
        }
        let db_path = resolve_db_path(db_path, config.database_path.take());
        Ok(Self {
            config: config.with_database_path(db_path),
            offline,
        })
    }

    pub fn db_path(&self) -> &Path {
        self.config
            .database_path
            .as_deref()
            .unwrap_or_else(|| Path::new("ohs.db"))
    }

    pub fn store(&self) -> LocalStore {
        LocalStore::open_path(self.db_path())
    }

    pub fn session_store(&self) -> KeyringSessionStore {
        KeyringSessionStore::for_api(&self.config.api_base_url)
    }

    pub fn client(&self) -> Result<OhsClient, CliError> {
        let transport =
            ReqwestTransport::new(self.config.request_timeout).map_err(CliError::Config)?;
        let monitor = ConnectivityMonitor::new(if self.offline {
            ConnectivityState::Offline
        } else {
            ConnectivityState::Online
        });

        Ok(ApiClient::new(
            self.config.clone(),
            transport,
            self.session_store(),
            self.store(),
            monitor,
        )
        .with_login_redirect(|| {
            eprintln!("Session expired. Run `ohs auth login` to sign in again.");
        }))
    }
}

/// Copy an online response into the local records; queued and cached
/// responses are left alone. Returns the number of records touched.
pub async fn mirror_online(
    store: &LocalStore,
    method: HttpMethod,
    endpoint: &str,
    response: &ApiResponse,
) -> usize {
    let ApiResponse::Online(payload) = response else {
        return 0;
    };
    match store.mirror(method, endpoint, payload).await {
        Ok(touched) => touched,
        Err(error) => {
            tracing::warn!(
                "Failed to mirror {} {} into local records: {}",
                method,
                endpoint,
                error
            );
            0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: i64,
    pub method: String,
    pub endpoint: String,
    pub url: String,
    pub queued_at: String,
    pub has_body: bool,
}

pub fn pending_to_item(mutation: &PendingMutation) -> PendingItem {
    PendingItem {
        id: mutation.id,
        method: mutation.kind.to_string(),
        endpoint: mutation.endpoint.clone(),
        url: mutation.url.clone(),
        queued_at: mutation.timestamp.to_rfc3339(),
        has_body: mutation.data.is_some(),
    }
}

pub fn format_pending_lines(pending: &[PendingMutation], now: DateTime<Utc>) -> Vec<String> {
    pending
        .iter()
        .map(|mutation| {
            format!(
                "#{:<4} {:<6} {}  ({})",
                mutation.id,
                mutation.kind,
                mutation.endpoint,
                format_relative_time(mutation.timestamp, now)
            )
        })
        .collect()
}

pub fn format_record_lines(records: &[Value], max_chars: usize) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let id = ohs_core::models::record_key(record).unwrap_or_else(|| "?".to_string());
            format!("{id:<12} {}", record_preview(record, max_chars))
        })
        .collect()
}

pub fn record_preview(record: &Value, max_chars: usize) -> String {
    let compact = compact_text(&record.to_string());
    let mut preview = compact.chars().take(max_chars).collect::<String>();
    if compact.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds().max(0);

    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

pub fn parse_json_data(raw: Option<&str>) -> Result<Option<Value>, CliError> {
    raw.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| serde_json::from_str(raw).map_err(|error| CliError::InvalidJson(error.to_string())))
        .transpose()
}

pub fn parse_form_fields(raw: &[String]) -> Result<Vec<(String, String)>, CliError> {
    raw.iter()
        .map(|field| {
            let (key, value) = field
                .split_once('=')
                .ok_or_else(|| CliError::InvalidField(field.clone()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::InvalidField(field.clone()));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

pub fn read_upload_file(path: &Path, content_type: Option<String>) -> Result<UploadFile, CliError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
    let content_type = content_type.or_else(|| guess_content_type(path).map(str::to_string));

    let file = UploadFile::new(file_name, bytes);
    Ok(match content_type {
        Some(content_type) => file.with_content_type(content_type),
        None => file,
    })
}

pub fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    };
    Some(content_type)
}

/// `--db-path`, then `OHS_DB_PATH`, then the per-user data directory.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>, env_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path.or(env_db_path).unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ohs")
        .join("ohs.db")
}
