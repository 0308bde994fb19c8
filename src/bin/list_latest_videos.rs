use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use youtube_data_client::config::{self, API_KEY_ENV, CHANNEL_ID_ENV};
use youtube_data_client::{ChannelSelector, YouTubeClient};

/// List the latest uploads of a channel using an API key.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// YouTube Data API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Channel ID (UC...)
    #[arg(long, env = CHANNEL_ID_ENV)]
    channel_id: Option<String>,

    /// Number of videos to list
    #[arg(long, default_value_t = 20)]
    max_results: usize,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    config::init_logger();
    config::load_environment();
    let cli = Cli::parse();

    let (Some(api_key), Some(channel_id)) = (
        cli.api_key.filter(|v| !v.is_empty()),
        cli.channel_id.filter(|v| !v.is_empty()),
    ) else {
        println!("Make sure to set API_KEY and CHANNEL_ID in the .env file");
        return Ok(ExitCode::FAILURE);
    };

    let client = YouTubeClient::builder().api_key(api_key).build()?;

    let items = match client
        .uploads_playlist_id(&ChannelSelector::Id(channel_id))
        .await
    {
        Ok(playlist) => client.latest_uploads(&playlist, cli.max_results).await,
        Err(err) => Err(err),
    };
    let items = match items {
        Ok(items) => items,
        Err(err) => {
            println!("An HTTP error occurred: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("Latest {} videos from the channel:", cli.max_results);
    for item in &items {
        let Some(snippet) = &item.snippet else {
            continue;
        };
        println!("Title: {}", snippet.title);
        println!("Video ID: {}", item.video_id().unwrap_or_default());
        println!("Published Date: {}", snippet.published_at);
        println!("{}", "-".repeat(40));
    }

    Ok(ExitCode::SUCCESS)
}
