use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use youtube_data_client::auth::SCOPE_FORCE_SSL;
use youtube_data_client::config::{self, CredentialArgs};
use youtube_data_client::metadata::{self, MetadataDocument, UpdateDefaults};
use youtube_data_client::YouTubeClient;

const FETCH_PARTS: [&str; 3] = ["snippet", "localizations", "status"];

/// Apply titles, descriptions, tags, localizations and publish schedules from a JSON document.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Update document
    #[arg(long, default_value_os_t = config::update_videos_path())]
    input: PathBuf,

    /// Default language written to every updated snippet
    #[arg(long, default_value = "en")]
    default_language: String,

    /// Category written to every updated snippet (10 = Music)
    #[arg(long, default_value = "10")]
    category_id: String,
}

fn load_update_data(path: &Path) -> MetadataDocument {
    if !path.exists() {
        println!("File not found: {}", path.display());
        return MetadataDocument::new();
    }
    metadata::load_document(path).unwrap_or_else(|err| {
        println!("Error loading JSON data: {err}");
        MetadataDocument::new()
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    config::init_logger();
    config::load_environment();
    let cli = Cli::parse();

    let document = load_update_data(&cli.input);
    if document.is_empty() {
        println!("No update data found.");
        return Ok(ExitCode::SUCCESS);
    }

    if let Err(err) = metadata::validate_scheduled_publish_times(&document, Utc::now()) {
        log::debug!("{err}");
        println!("Error: scheduledPublishTime must be a future date.");
        return Ok(ExitCode::FAILURE);
    }

    let credentials = match cli.credentials.store().authorize(&[SCOPE_FORCE_SSL]).await {
        Ok(credentials) => credentials,
        Err(err) => {
            println!("Authentication error: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let client = YouTubeClient::builder()
        .access_token(credentials.access_token())
        .build()?;

    let defaults = UpdateDefaults {
        default_language: cli.default_language,
        category_id: Some(cli.category_id),
    };

    for (identifier, entry) in &document {
        let video_id = metadata::extract_video_id(identifier);

        let current = match client.get_video(video_id, &FETCH_PARTS).await {
            Ok(Some(video)) => video,
            Ok(None) => {
                println!("Video not found: {video_id}");
                continue;
            }
            Err(err) => {
                println!("Error fetching video details for {video_id}: {err}");
                continue;
            }
        };

        let Some(update) = entry.build_update(video_id, &current, &defaults) else {
            println!("No data to update for video: {video_id}");
            continue;
        };

        println!("Sending update request for video {video_id}.");
        match client.update_video(&update).await {
            Ok(_) => println!("Video updated successfully: {video_id}"),
            Err(err) => println!("An HTTP error occurred while updating video {video_id}: {err}"),
        }
    }

    Ok(ExitCode::SUCCESS)
}
