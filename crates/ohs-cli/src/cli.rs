use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use ohs_core::{Collection, HttpMethod};

#[derive(Parser)]
#[command(name = "ohs")]
#[command(about = "Offline-capable client for the OHS management platform")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// API base URL (overrides OHS_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Treat the network as unavailable: queue writes and read from cache
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a request to the API (queued or served from cache when offline)
    Request {
        /// HTTP method
        #[arg(value_parser = parse_method)]
        method: HttpMethod,
        /// Endpoint relative to the API base URL, e.g. /incidents
        endpoint: String,
        /// JSON request body
        #[arg(short, long, value_name = "JSON")]
        data: Option<String>,
    },
    /// Upload a file as multipart form data
    Upload {
        /// Endpoint relative to the API base URL, e.g. /documents/upload
        endpoint: String,
        /// File to upload
        file: PathBuf,
        /// Extra form field as key=value (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        /// Content type of the file (guessed from the extension when omitted)
        #[arg(long, value_name = "MIME")]
        content_type: Option<String>,
    },
    /// Replay queued offline requests
    Sync,
    /// Show queued offline requests
    Pending {
        /// List every queued request instead of the count
        #[arg(long)]
        list: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show records held in the local store
    Records {
        /// Collection name (incidents, documents, inspections, correctiveActions)
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        /// Show a single record
        #[arg(long)]
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the stored API session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store an access token (and optional refresh token) in the keychain
    Login {
        /// Bearer access token
        #[arg(long, value_name = "TOKEN")]
        token: String,
        /// Refresh token used to renew an expired access token
        #[arg(long, value_name = "TOKEN")]
        refresh_token: Option<String>,
    },
    /// Show whether a session is stored
    Status,
    /// Remove the stored session
    Logout,
}

fn parse_method(raw: &str) -> Result<HttpMethod, String> {
    raw.parse()
}

fn parse_collection(raw: &str) -> Result<Collection, String> {
    raw.parse()
}
