//! CLI smoke entry point.
//!
//! Loads `USERSTORE_*` settings (optionally from `.env`), opens the store and
//! prints a short status report.

use std::process::ExitCode;
use userstore_core::{core_version, SqliteUserRepository, StoreConfig, UserService};

fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("event=cli_run module=cli status=error error={message}");
            eprintln!("userstore: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = StoreConfig::from_env().map_err(|err| err.to_string())?;
    let logging = config.init_logging()?;

    let conn = config.open().map_err(|err| err.to_string())?;
    let repo = SqliteUserRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = UserService::new(repo);
    let users = service.count_users().map_err(|err| err.to_string())?;

    println!("userstore_core version={}", core_version());
    println!(
        "store={}",
        config
            .db_path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |path| path.display().to_string())
    );
    println!("logging={}", if logging { "file" } else { "off" });
    println!("users={users}");
    Ok(())
}
