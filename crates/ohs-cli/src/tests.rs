use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use clap::Parser;
use ohs_core::auth::{Session, SessionPersistence};
use ohs_core::{ApiResponse, Collection, HttpMethod, LocalStore, MutationKind};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{AuthCommands, Cli, Commands, CompletionShell};
use crate::commands::common::{
    format_pending_lines, format_relative_time, guess_content_type, mirror_online, parse_form_fields,
    parse_json_data, pending_to_item, read_upload_file, record_preview, resolve_db_path,
    AppContext,
};
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::records::load_records;
use crate::error::CliError;
use crate::session_store::KeyringSessionStore;

#[test]
fn parses_request_with_global_flags() {
    let cli = Cli::try_parse_from([
        "ohs",
        "request",
        "post",
        "/incidents",
        "--data",
        r#"{"title":"Fall"}"#,
        "--offline",
        "--api-url",
        "https://staging.example.com/api/",
    ])
    .unwrap();

    assert!(cli.offline);
    assert_eq!(cli.api_url.as_deref(), Some("https://staging.example.com/api/"));
    match cli.command {
        Commands::Request {
            method,
            endpoint,
            data,
        } => {
            assert_eq!(method, HttpMethod::Post);
            assert_eq!(endpoint, "/incidents");
            assert_eq!(data.as_deref(), Some(r#"{"title":"Fall"}"#));
        }
        _ => panic!("expected request command"),
    }
}

#[test]
fn rejects_unknown_method_and_collection() {
    assert!(Cli::try_parse_from(["ohs", "request", "fetch", "/incidents"]).is_err());
    assert!(Cli::try_parse_from(["ohs", "records", "permits"]).is_err());
}

#[test]
fn records_accepts_storage_and_endpoint_names() {
    for name in ["correctiveActions", "corrective-actions"] {
        let cli = Cli::try_parse_from(["ohs", "records", name]).unwrap();
        match cli.command {
            Commands::Records { collection, .. } => {
                assert_eq!(collection, Collection::CorrectiveActions);
            }
            _ => panic!("expected records command"),
        }
    }
}

#[test]
fn parses_upload_fields_and_auth_login() {
    let cli = Cli::try_parse_from([
        "ohs",
        "upload",
        "/documents/upload",
        "permit.pdf",
        "--field",
        "title=Hot work permit",
        "-f",
        "category=permits",
    ])
    .unwrap();
    match cli.command {
        Commands::Upload { fields, file, .. } => {
            assert_eq!(file, PathBuf::from("permit.pdf"));
            assert_eq!(
                parse_form_fields(&fields).unwrap(),
                vec![
                    ("title".to_string(), "Hot work permit".to_string()),
                    ("category".to_string(), "permits".to_string()),
                ]
            );
        }
        _ => panic!("expected upload command"),
    }

    let cli = Cli::try_parse_from(["ohs", "auth", "login", "--token", "abc"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommands::Login { refresh_token: None, .. }
        }
    ));
}

#[test]
fn parse_form_fields_rejects_missing_separator_or_key() {
    assert!(matches!(
        parse_form_fields(&["novalue".to_string()]),
        Err(CliError::InvalidField(_))
    ));
    assert!(matches!(
        parse_form_fields(&["=value".to_string()]),
        Err(CliError::InvalidField(_))
    ));
    assert_eq!(
        parse_form_fields(&["note=a=b".to_string()]).unwrap(),
        vec![("note".to_string(), "a=b".to_string())]
    );
}

#[test]
fn parse_json_data_handles_empty_and_invalid_input() {
    assert_eq!(parse_json_data(None).unwrap(), None);
    assert_eq!(parse_json_data(Some("  ")).unwrap(), None);
    assert_eq!(
        parse_json_data(Some(r#"{"title":"Fall"}"#)).unwrap(),
        Some(json!({"title": "Fall"}))
    );
    assert!(matches!(
        parse_json_data(Some("{title")),
        Err(CliError::InvalidJson(_))
    ));
}

#[test]
fn format_relative_time_units() {
    let now = Utc::now();
    assert_eq!(format_relative_time(now, now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m ago");
    assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h ago");
    assert_eq!(format_relative_time(now - Duration::days(2), now), "2d ago");
    assert_eq!(format_relative_time(now + Duration::minutes(5), now), "just now");
}

#[test]
fn record_preview_truncates_with_ellipsis() {
    let record = json!({"id": "inc-1", "title": "Slip on wet floor near loading dock"});
    let preview = record_preview(&record, 20);
    assert_eq!(preview.chars().count(), 23);
    assert!(preview.ends_with("..."));
    assert_eq!(record_preview(&json!({"id": 1}), 20), r#"{"id":1}"#);
}

#[test]
fn guess_content_type_by_extension() {
    assert_eq!(guess_content_type(Path::new("a/report.PDF")), Some("application/pdf"));
    assert_eq!(guess_content_type(Path::new("photo.jpeg")), Some("image/jpeg"));
    assert_eq!(guess_content_type(Path::new("archive.xyz")), None);
    assert_eq!(guess_content_type(Path::new("README")), None);
}

#[test]
fn read_upload_file_uses_file_name_and_explicit_type() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("inspection.txt");
    std::fs::write(&path, b"all clear").unwrap();

    let guessed = read_upload_file(&path, None).unwrap();
    assert_eq!(guessed.file_name, "inspection.txt");
    assert_eq!(guessed.content_type.as_deref(), Some("text/plain"));
    assert_eq!(guessed.bytes, b"all clear".to_vec());

    let explicit = read_upload_file(&path, Some("application/octet-stream".to_string())).unwrap();
    assert_eq!(
        explicit.content_type.as_deref(),
        Some("application/octet-stream")
    );
}

#[test]
fn resolve_db_path_prefers_cli_then_env() {
    let cli = PathBuf::from("/tmp/cli.db");
    let env = PathBuf::from("/tmp/env.db");
    assert_eq!(resolve_db_path(Some(cli.clone()), Some(env.clone())), cli);
    assert_eq!(resolve_db_path(None, Some(env.clone())), env);
    assert!(resolve_db_path(None, None).ends_with("ohs/ohs.db"));
}

#[test]
fn app_context_applies_overrides() {
    let context = AppContext::new(
        Some("https://ohs.example.com/api/".to_string()),
        Some(PathBuf::from("/tmp/ohs-test.db")),
        true,
    )
    .unwrap();

    assert_eq!(context.config.api_base_url, "https://ohs.example.com/api");
    assert_eq!(context.db_path(), Path::new("/tmp/ohs-test.db"));
    assert!(context.offline);

    assert!(matches!(
        AppContext::new(Some("ohs.example.com".to_string()), None, false),
        Err(CliError::Config(_))
    ));
}

#[test]
fn session_store_roundtrip_is_scoped_per_api() {
    let staging = KeyringSessionStore::for_api("https://staging.example.com/api");
    let production = KeyringSessionStore::for_api("https://prod.example.com/api");

    staging
        .save_session(&Session::new("t-1", Some("r-1".to_string())))
        .unwrap();

    assert_eq!(staging.load_session().unwrap().unwrap().token, "t-1");
    assert!(production.load_session().unwrap().is_none());

    staging.clear_session().unwrap();
    assert!(staging.load_session().unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn pending_listing_reflects_queue_order() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open_path(tmp.path().join("ohs.db"));
    store
        .enqueue(
            MutationKind::Post,
            "/incidents",
            Some(&json!({"title": "Fall"})),
            "http://localhost:5000/api/incidents",
        )
        .await
        .unwrap();
    store
        .enqueue(
            MutationKind::Delete,
            "/documents/4",
            None,
            "http://localhost:5000/api/documents/4",
        )
        .await
        .unwrap();

    let pending = store.pending_mutations().await.unwrap();
    let lines = format_pending_lines(&pending, Utc::now());
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("POST") && lines[0].contains("/incidents"));
    assert!(lines[1].contains("DELETE") && lines[1].contains("/documents/4"));

    let items: Vec<_> = pending.iter().map(pending_to_item).collect();
    assert!(items[0].has_body);
    assert!(!items[1].has_body);
    assert_eq!(items[1].method, "DELETE");
}

#[tokio::test(flavor = "multi_thread")]
async fn load_records_returns_all_or_single_record() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open_path(tmp.path().join("ohs.db"));
    store
        .put(Collection::Inspections, &json!({"id": "insp-1", "site": "Dock 4"}))
        .await
        .unwrap();
    store
        .put(Collection::Inspections, &json!({"id": "insp-2", "site": "Yard"}))
        .await
        .unwrap();

    let all = load_records(&store, Collection::Inspections, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let single = load_records(&store, Collection::Inspections, Some("insp-2"))
        .await
        .unwrap();
    assert_eq!(single, vec![json!({"id": "insp-2", "site": "Yard"})]);

    let missing = load_records(&store, Collection::Inspections, Some("nope")).await;
    assert!(matches!(missing, Err(CliError::RecordNotFound(_))));
}

#[test]
fn completions_render_for_every_shell() {
    for shell in [
        CompletionShell::Bash,
        CompletionShell::Zsh,
        CompletionShell::Fish,
        CompletionShell::PowerShell,
    ] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("ohs"), "{shell:?} script should mention the binary");
    }
}

#[test]
fn run_completions_writes_bash_script_file() {
    let tmp = tempfile::tempdir().unwrap();
    let output_path = tmp.path().join("ohs.bash");

    run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("_ohs"));
    assert!(script.contains("sync"));
}

#[tokio::test(flavor = "multi_thread")]
async fn online_request_is_visible_in_local_records() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open_path(tmp.path().join("ohs.db"));

    let created = ApiResponse::Online(json!({"id": "i1", "title": "Fall"}));
    assert_eq!(
        mirror_online(&store, HttpMethod::Post, "/incidents", &created).await,
        1
    );

    let queued = ApiResponse::Queued { id: 3 };
    assert_eq!(
        mirror_online(&store, HttpMethod::Post, "/incidents", &queued).await,
        0
    );

    let records = load_records(&store, Collection::Incidents, None)
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id": "i1", "title": "Fall"})]);

    let removed = ApiResponse::Online(serde_json::Value::Null);
    mirror_online(&store, HttpMethod::Delete, "/incidents/i1", &removed).await;
    assert!(load_records(&store, Collection::Incidents, None)
        .await
        .unwrap()
        .is_empty());
}
