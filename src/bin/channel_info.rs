use anyhow::Result;
use clap::Parser;

use youtube_data_client::auth::SCOPE_READONLY;
use youtube_data_client::config::{self, CredentialArgs};
use youtube_data_client::{ChannelSelector, YouTubeClient, YouTubeError};

/// Print the authenticated user's channel (snippet, content details and statistics).
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    credentials: CredentialArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::init_logger();
    config::load_environment();
    let cli = Cli::parse();

    let credentials = cli.credentials.store().authorize(&[SCOPE_READONLY]).await?;
    let client = YouTubeClient::builder()
        .access_token(credentials.access_token())
        .build()?;

    match client
        .list_channels(
            &ChannelSelector::Mine,
            &["snippet", "contentDetails", "statistics"],
        )
        .await
    {
        Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
        Err(
            err @ (YouTubeError::AuthenticationFailed { .. }
            | YouTubeError::RequestFailed { .. }
            | YouTubeError::Http(_)),
        ) => println!("An HTTP error occurred: {err}"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
