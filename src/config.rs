//! File-system and environment defaults shared by the programs.

use std::path::{Path, PathBuf};

use clap::Args;
use env_logger::{Builder, Env};

use crate::auth::CredentialStore;

/// OAuth token cache written after a successful authorization.
pub const TOKEN_FILE: &str = "token.json";
/// OAuth client registration downloaded from the Google Cloud console.
pub const CLIENT_SECRET_FILE: &str = "client_secret.json";
/// Directory holding the JSON metadata documents.
pub const DATA_DIR: &str = "YouTube_Data";
pub const LATEST_VIDEOS_FILE: &str = "latest_videos_detailed.json";
pub const UPDATE_VIDEOS_FILE: &str = "update_videos_info.json";

pub const API_KEY_ENV: &str = "API_KEY";
pub const CHANNEL_ID_ENV: &str = "CHANNEL_ID";

/// Command-line options locating the OAuth files, shared by the OAuth programs.
#[derive(Debug, Clone, Args)]
pub struct CredentialArgs {
    /// Token cache written after authorization
    #[arg(long, default_value = TOKEN_FILE)]
    pub token_file: PathBuf,

    /// OAuth client registration
    #[arg(long, default_value = CLIENT_SECRET_FILE)]
    pub client_secret_file: PathBuf,
}

impl CredentialArgs {
    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(&self.token_file, &self.client_secret_file)
    }
}

/// `YouTube_Data/latest_videos_detailed.json`
pub fn latest_videos_path() -> PathBuf {
    PathBuf::from(DATA_DIR).join(LATEST_VIDEOS_FILE)
}

/// `YouTube_Data/update_videos_info.json`
pub fn update_videos_path() -> PathBuf {
    PathBuf::from(DATA_DIR).join(UPDATE_VIDEOS_FILE)
}

/// Read `.env` from the working directory (or a parent) into the process environment.
///
/// Call after [`init_logger`]. A missing file is not an error. Returns whether a file was loaded.
pub fn load_environment() -> bool {
    report_env_file(dotenv::dotenv().map(|_| ()))
}

/// Read a specific env file into the process environment.
pub fn load_environment_from(path: impl AsRef<Path>) -> bool {
    report_env_file(dotenv::from_path(path.as_ref()))
}

fn report_env_file(result: dotenv::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) if err.not_found() => {
            log::debug!("no .env file found");
            false
        }
        Err(err) => {
            log::warn!("failed to read .env: {err}");
            false
        }
    }
}

/// Initialize `env_logger` at `info`, overridable with `RUST_LOG`.
pub fn init_logger() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_target(false)
        .try_init();
}
