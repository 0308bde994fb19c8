use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use youtube_data_client::auth::SCOPE_READONLY;
use youtube_data_client::config::{self, CredentialArgs};
use youtube_data_client::metadata::{self, MetadataDocument, VideoEntry};
use youtube_data_client::{ChannelSelector, YouTubeClient, YouTubeError};

const DETAIL_PARTS: [&str; 5] = [
    "snippet",
    "contentDetails",
    "statistics",
    "topicDetails",
    "localizations",
];

/// Export detailed metadata of the authenticated channel's latest uploads to JSON.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Number of latest uploads to export
    #[arg(long, default_value_t = 25)]
    max_results: usize,

    /// Output document
    #[arg(long, default_value_os_t = config::latest_videos_path())]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    config::init_logger();
    config::load_environment();
    let cli = Cli::parse();

    let credentials = cli.credentials.store().authorize(&[SCOPE_READONLY]).await?;
    let client = YouTubeClient::builder()
        .access_token(credentials.access_token())
        .build()?;

    let document = match export(&client, cli.max_results).await {
        Ok(document) => document,
        Err(err) => {
            println!("An HTTP error occurred: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    metadata::save_document(&cli.output, &document)?;
    println!("Data saved to {}", cli.output.display());
    Ok(ExitCode::SUCCESS)
}

async fn export(
    client: &YouTubeClient,
    limit: usize,
) -> Result<MetadataDocument, YouTubeError> {
    let playlist = client.uploads_playlist_id(&ChannelSelector::Mine).await?;
    let items = client.latest_uploads(&playlist, limit).await?;

    let ids: Vec<&str> = items.iter().filter_map(|item| item.video_id()).collect();
    let videos = client.list_videos(&ids, &DETAIL_PARTS).await?;
    log::info!("fetched details for {} of {} videos", videos.len(), ids.len());

    Ok(videos
        .iter()
        .map(|video| (video.id.clone(), VideoEntry::from_video(video)))
        .collect())
}
