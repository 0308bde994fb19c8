use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::Parser;

use youtube_data_client::auth::SCOPE_UPLOAD;
use youtube_data_client::config::{self, CredentialArgs};
use youtube_data_client::metadata;
use youtube_data_client::upload::{DEFAULT_CHUNK_SIZE, ProgressReporter};
use youtube_data_client::{PrivacyStatus, Video, VideoSnippet, VideoStatus, YouTubeClient};

/// Upload a video and schedule its publication, with progress feedback.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Video file to upload
    #[arg(default_value = "example_video.mp4")]
    file: PathBuf,

    /// Scheduled publish time, ISO 8601 (YYYY-MM-DDTHH:MM:SSZ)
    #[arg(long, default_value = "2025-06-15T16:30:00Z")]
    publish_at: String,

    /// Privacy status: private, public or unlisted. Scheduling needs private.
    #[arg(long, default_value_t = PrivacyStatus::Private)]
    privacy: PrivacyStatus,

    /// Title; defaults to the file name
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Category (22 = People & Blogs)
    #[arg(long, default_value = "22")]
    category_id: String,

    /// Upload chunk size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    config::init_logger();
    config::load_environment();
    let cli = Cli::parse();

    let Ok(publish_at) = metadata::normalize_timestamp(&cli.publish_at) else {
        println!("Invalid scheduled date format. Use ISO 8601 format: YYYY-MM-DDTHH:MM:SSZ.");
        return Ok(ExitCode::FAILURE);
    };
    let publish_at = if cli.privacy == PrivacyStatus::Private {
        Some(publish_at)
    } else {
        log::warn!(
            "publish time {publish_at} ignored: only private videos can be scheduled (privacy is {})",
            cli.privacy
        );
        None
    };
    if !cli.file.is_file() {
        println!("Video file not found: {}", cli.file.display());
        return Ok(ExitCode::FAILURE);
    }

    let title = match cli.title {
        Some(title) => title,
        None => cli
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let video = Video {
        snippet: Some(VideoSnippet {
            title,
            description: cli.description,
            tags: Some(cli.tags),
            category_id: Some(cli.category_id),
            ..VideoSnippet::default()
        }),
        status: Some(VideoStatus {
            privacy_status: Some(cli.privacy),
            publish_at,
            ..VideoStatus::default()
        }),
        ..Video::default()
    };

    let credentials = cli.credentials.store().authorize(&[SCOPE_UPLOAD]).await?;
    let client = YouTubeClient::builder()
        .access_token(credentials.access_token())
        .chunk_size(cli.chunk_size)
        .build()?;

    println!("Upload started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let reporter = ProgressReporter::stdout();
    let result = client
        .upload_video(&cli.file, &video, |progress| reporter.update(&progress))
        .await;
    reporter.finish();

    match result {
        Ok(created) => {
            println!("Video uploaded successfully! Video ID: {}", created.id);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("An HTTP error occurred while uploading the video: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
