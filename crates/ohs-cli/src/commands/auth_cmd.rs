use ohs_core::auth::{Session, SessionPersistence};
use ohs_core::util::normalize_text_option;

use crate::cli::AuthCommands;
use crate::commands::common::AppContext;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, context: &AppContext) -> Result<(), CliError> {
    let store = context.session_store();
    let api = &context.config.api_base_url;

    match command {
        AuthCommands::Login {
            token,
            refresh_token,
        } => {
            let token = normalize_text_option(Some(token))
                .ok_or_else(|| CliError::Auth("Access token must not be empty".to_string()))?;
            let session = Session::new(token, normalize_text_option(refresh_token));
            store
                .save_session(&session)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Stored session for {api}");
        }
        AuthCommands::Status => {
            let session = store
                .load_session()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            match session {
                Some(session) => {
                    let refresh = if session.refresh_token.is_some() {
                        "with refresh token"
                    } else {
                        "without refresh token"
                    };
                    println!("Signed in to {api} ({refresh})");
                }
                None => println!("Not signed in to {api}"),
            }
        }
        AuthCommands::Logout => {
            store
                .clear_session()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Signed out of {api}");
        }
    }
    Ok(())
}
