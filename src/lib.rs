//! Async client for the YouTube Data API v3 and the building blocks of the bundled programs.
//!
//! - [`YouTubeClient`]: channels, playlist items, videos, `videos.update` and resumable
//!   `videos.insert` uploads, authorized with an API key or an OAuth access token.
//! - [`auth`]: the installed-app OAuth flow and the `token.json` credential cache.
//! - [`metadata`]: the local JSON documents exported and consumed by the programs.
//! - [`upload`]: progress and ETA reporting for uploads.
//!
//! ```no_run
//! use youtube_data_client::{ChannelSelector, YouTubeClient};
//!
//! # async fn run() -> Result<(), youtube_data_client::YouTubeError> {
//! let client = YouTubeClient::builder().api_key("API_KEY").build()?;
//! let uploads = client
//!     .uploads_playlist_id(&ChannelSelector::Id("UC_x5XG1OV2P6uZZ5FSM9Ttw".into()))
//!     .await?;
//! for item in client.latest_uploads(&uploads, 20).await? {
//!     println!("{}", item.video_id().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod client;
pub mod config;
mod error;
pub mod metadata;
mod models;
mod transport;
pub mod upload;
mod utils;

pub use client::{ChannelSelector, YouTubeClient, YouTubeClientBuilder};
pub use error::YouTubeError;
pub use models::{
    Channel, ChannelContentDetails, ChannelSnippet, ListResponse, Localization, Page, PageInfo,
    PlaylistItem, PlaylistItemSnippet, PrivacyStatus, RelatedPlaylists, ResourceId, Video,
    VideoSnippet, VideoStatus,
};
pub use upload::UploadProgress;
