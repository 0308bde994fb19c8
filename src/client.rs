use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Url, redirect};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::models::{Channel, ListResponse, Page, PlaylistItem, Video};
use crate::transport::{ChunkOutcome, Credential, Transport};
use crate::upload::{DEFAULT_CHUNK_SIZE, UploadProgress};
use crate::utils::default_user_agent;
use crate::YouTubeError;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PAGE_SIZE: u32 = 50;
const MAX_IDS_PER_REQUEST: usize = 50;

/// Which channel a `channels.list` call addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// The channel of the authenticated user (`mine=true`, OAuth only).
    Mine,
    /// A channel by ID (`UC...`).
    Id(String),
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelector::Mine => f.write_str("mine"),
            ChannelSelector::Id(id) => f.write_str(id),
        }
    }
}

/// Async client for the subset of the YouTube Data API v3 used by the bundled programs.
///
/// Read calls work with either an API key or an OAuth access token; `mine=true` lookups, updates
/// and uploads require an access token. Non-2xx responses are mapped to [`YouTubeError`]. For raw
/// access where you want to inspect status codes and bodies directly, use [`YouTubeClient::get`].
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    transport: Transport,
    chunk_size: u64,
}

/// Builder for [`YouTubeClient`].
#[derive(Debug)]
pub struct YouTubeClientBuilder {
    base_url: Option<Url>,
    upload_url: Option<Url>,
    user_agent: Option<String>,
    timeout: Duration,
    credential: Option<Credential>,
    chunk_size: u64,
    builder: ClientBuilder,
}

impl YouTubeClient {
    /// Build a client with a custom API base URL and no credentials.
    ///
    /// `base_url` is used as the base for relative API paths via [`Url::join`], so a trailing
    /// slash is recommended.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, YouTubeError> {
        YouTubeClientBuilder::new().base_url(base_url)?.build()
    }

    /// Start configuring a client with the crate's defaults.
    ///
    /// Defaults:
    /// - Base URL: `https://www.googleapis.com/youtube/v3/`
    /// - Upload URL: `https://www.googleapis.com/upload/youtube/v3/`
    /// - Timeout: 30 seconds
    /// - Upload chunk size: 1 MiB
    pub fn builder() -> YouTubeClientBuilder {
        YouTubeClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    pub fn upload_url(&self) -> &Url {
        self.transport.upload_url()
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Whether requests are authorized with an OAuth access token.
    pub fn has_access_token(&self) -> bool {
        self.transport.has_access_token()
    }

    /// Return this client authorized with an OAuth access token instead of its current
    /// credential.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.transport = self
            .transport
            .with_credential(Credential::AccessToken(token.into()));
        self
    }

    /// Execute a GET request against a relative path on the API base URL.
    ///
    /// This method returns the raw [`reqwest::Response`] and does **not** convert non-2xx status
    /// codes into errors. The configured credential is attached if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`YouTubeError::Http`] on transport failures (including timeouts).
    pub async fn get(&self, path: impl AsRef<str>) -> Result<reqwest::Response, YouTubeError> {
        self.transport.get_raw(path.as_ref()).await
    }

    /// `channels.list` for the selector, returning the whole response envelope.
    ///
    /// An empty `items` list is not an error here; see [`YouTubeClient::channel`].
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::MissingAccessToken`] for [`ChannelSelector::Mine`] without a token
    /// - [`YouTubeError::AuthenticationFailed`] / [`YouTubeError::RequestFailed`] for non-2xx statuses
    /// - [`YouTubeError::Http`] for transport failures (including timeouts)
    pub async fn list_channels(
        &self,
        selector: &ChannelSelector,
        parts: &[&str],
    ) -> Result<ListResponse<Channel>, YouTubeError> {
        let mut query = vec![("part", parts.join(","))];
        match selector {
            ChannelSelector::Mine => {
                if !self.has_access_token() {
                    return Err(YouTubeError::MissingAccessToken);
                }
                query.push(("mine", "true".to_string()));
            }
            ChannelSelector::Id(id) => query.push(("id", id.clone())),
        }

        self.transport.get_json("channels", &query).await
    }

    /// Fetch one channel with the given `parts`.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::ChannelNotFound`] if the API returns no item for the selector
    /// - any error from [`YouTubeClient::list_channels`]
    pub async fn channel(
        &self,
        selector: &ChannelSelector,
        parts: &[&str],
    ) -> Result<Channel, YouTubeError> {
        self.list_channels(selector, parts)
            .await?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| YouTubeError::ChannelNotFound(selector.to_string()))
    }

    /// ID of the playlist holding every upload of the channel.
    ///
    /// # Errors
    ///
    /// Any error from [`YouTubeClient::channel`], or [`YouTubeError::MissingField`] if the
    /// channel has no uploads playlist.
    pub async fn uploads_playlist_id(
        &self,
        selector: &ChannelSelector,
    ) -> Result<String, YouTubeError> {
        let channel = self.channel(selector, &["contentDetails"]).await?;
        String::try_from(channel)
    }

    /// One page of `playlistItems.list` with the `snippet` part.
    ///
    /// `max_results` is clamped to the API's accepted range of `1..=50`.
    pub async fn list_playlist_items_page(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<Page<PlaylistItem>, YouTubeError> {
        let mut query = vec![
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", max_results.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<PlaylistItem> =
            self.transport.get_json("playlistItems", &query).await?;
        Ok(Page::from(response))
    }

    /// The first `limit` items of a playlist, newest first for an uploads playlist.
    ///
    /// Pages forward with [`YouTubeClient::list_playlist_items_page`] and stops when:
    /// - `limit` items have been collected, or
    /// - the API reports no further page, or
    /// - a page yields no new item IDs.
    pub async fn latest_uploads(
        &self,
        playlist_id: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistItem>, YouTubeError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut available = None::<u64>;

        while items.len() < limit {
            let wanted = (limit - items.len()).min(MAX_PAGE_SIZE as usize) as u32;
            let page = self
                .list_playlist_items_page(playlist_id, wanted, page_token.as_deref())
                .await?;
            if available.is_none() {
                available = page.total_results;
            }

            let mut added = 0usize;
            for item in page.items {
                if items.len() >= limit {
                    break;
                }
                if seen.insert(item.id.clone()) {
                    items.push(item);
                    added += 1;
                }
            }

            if added == 0 {
                break;
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        match available {
            Some(total) => log::debug!(
                "collected {} of {total} items from playlist {playlist_id}",
                items.len()
            ),
            None => log::debug!("collected {} items from playlist {playlist_id}", items.len()),
        }
        Ok(items)
    }

    /// Look up videos by ID with the given `parts`.
    ///
    /// IDs are sent in batches of at most 50. The result follows the order of `ids`; IDs the API
    /// does not return (deleted or private videos) are skipped.
    pub async fn list_videos(
        &self,
        ids: &[&str],
        parts: &[&str],
    ) -> Result<Vec<Video>, YouTubeError> {
        let part = parts.join(",");
        let mut found: HashMap<String, Video> = HashMap::with_capacity(ids.len());

        for batch in ids.chunks(MAX_IDS_PER_REQUEST) {
            let query = [("part", part.clone()), ("id", batch.join(","))];
            let response: ListResponse<Video> = self.transport.get_json("videos", &query).await?;
            for video in response.items {
                found.insert(video.id.clone(), video);
            }
        }

        Ok(ids.iter().filter_map(|id| found.remove(*id)).collect())
    }

    /// Fetch a single video, or `None` if the API does not return it.
    pub async fn get_video(&self, id: &str, parts: &[&str]) -> Result<Option<Video>, YouTubeError> {
        Ok(self.list_videos(&[id], parts).await?.into_iter().next())
    }

    /// Replace the parts carried by `video` on the API side (`videos.update`).
    ///
    /// `part=` is derived from [`Video::parts`]; parts absent from `video` are left untouched.
    /// Requires an access token.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::MissingField`] if `video.id` is empty
    /// - [`YouTubeError::Api`] if `video` carries no writable part
    /// - [`YouTubeError::MissingAccessToken`] if the client has no access token
    /// - [`YouTubeError::AuthenticationFailed`] / [`YouTubeError::RequestFailed`] for non-2xx statuses
    pub async fn update_video(&self, video: &Video) -> Result<Video, YouTubeError> {
        if video.id.is_empty() {
            return Err(YouTubeError::MissingField("video update requires an id"));
        }
        let parts = video.parts();
        if parts.is_empty() {
            return Err(YouTubeError::Api(format!(
                "video {} carries no writable part",
                video.id
            )));
        }

        self.transport
            .put_json("videos", &[("part", parts.join(","))], video)
            .await
    }

    /// Upload a video file with a resumable `videos.insert` session.
    ///
    /// `video` supplies the metadata (typically `snippet` and `status`). The file is read one
    /// chunk at a time, never whole, and chunks are sent strictly in order. `on_progress` is
    /// called after every chunk the server acknowledges and once more on completion.
    ///
    /// Requires an access token.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::InvalidFileName`] if `path` has no valid UTF-8 file name
    /// - [`YouTubeError::EmptyUpload`] if the file is empty
    /// - [`YouTubeError::Io`] if reading the file fails
    /// - [`YouTubeError::MissingField`] if the session response lacks a `Location` header
    /// - [`YouTubeError::Api`] if the session stops advancing
    /// - [`YouTubeError::AuthenticationFailed`] / [`YouTubeError::RequestFailed`] for non-2xx statuses
    pub async fn upload_video<F>(
        &self,
        path: impl AsRef<Path>,
        video: &Video,
        mut on_progress: F,
    ) -> Result<Video, YouTubeError>
    where
        F: FnMut(UploadProgress),
    {
        let path = path.as_ref();
        path.file_name()
            .and_then(|name| name.to_str())
            .ok_or(YouTubeError::InvalidFileName)?;

        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");

        let mut file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        if total == 0 {
            return Err(YouTubeError::EmptyUpload);
        }

        let session = self
            .transport
            .start_resumable_upload(
                "videos",
                &[("part", video.parts().join(","))],
                video,
                mime,
                total,
            )
            .await?;
        log::debug!("opened upload session for {} ({total} bytes)", path.display());

        let mut offset = 0u64;
        loop {
            let len = self.chunk_size.min(total - offset);
            let mut chunk = vec![0u8; len as usize];
            file.seek(SeekFrom::Start(offset)).await?;
            file.read_exact(&mut chunk).await?;

            match self
                .transport
                .put_chunk::<Video>(&session, chunk, offset, total)
                .await?
            {
                ChunkOutcome::Complete(created) => {
                    on_progress(UploadProgress {
                        bytes_sent: total,
                        total_bytes: total,
                    });
                    return Ok(created);
                }
                ChunkOutcome::Incomplete { next_offset } => {
                    if next_offset <= offset || next_offset > total {
                        return Err(YouTubeError::Api(format!(
                            "upload session stalled at byte {offset} of {total}"
                        )));
                    }
                    offset = next_offset;
                    on_progress(UploadProgress {
                        bytes_sent: offset,
                        total_bytes: total,
                    });
                }
            }
        }
    }
}

impl Default for YouTubeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl YouTubeClientBuilder {
    /// Create a new builder using the crate defaults.
    ///
    /// This is equivalent to [`YouTubeClient::builder`].
    pub fn new() -> Self {
        Self {
            base_url: None,
            upload_url: None,
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            credential: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            builder: Client::builder(),
        }
    }

    /// Override the base URL used for API requests.
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, YouTubeError> {
        self.base_url = Some(Url::parse(base_url.as_ref())?);
        Ok(self)
    }

    /// Override the base URL used to open resumable upload sessions.
    pub fn upload_url(mut self, upload_url: impl AsRef<str>) -> Result<Self, YouTubeError> {
        self.upload_url = Some(Url::parse(upload_url.as_ref())?);
        Ok(self)
    }

    /// Set a custom user agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Authorize requests with an API key, sent as the `key` query parameter.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.credential = Some(Credential::ApiKey(key.into()));
        self
    }

    /// Authorize requests with an OAuth access token, sent as bearer auth.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(Credential::AccessToken(token.into()));
        self
    }

    /// Configure the request timeout.
    ///
    /// This sets [`reqwest::ClientBuilder::timeout`], which applies a single deadline per request
    /// (each upload chunk is its own request). Timeout failures surface as [`YouTubeError::Http`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Size of each upload chunk in bytes.
    ///
    /// The API expects a multiple of 256 KiB for every chunk except the last one.
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Build a [`YouTubeClient`].
    ///
    /// Redirects are not followed: resumable uploads answer intermediate chunks with
    /// `308 Resume Incomplete`, which must reach the upload loop.
    pub fn build(self) -> Result<YouTubeClient, YouTubeError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        let upload_url = match self.upload_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_UPLOAD_URL)?,
        };

        let client = self
            .builder
            .timeout(self.timeout)
            .redirect(redirect::Policy::none())
            .user_agent(self.user_agent.unwrap_or_else(default_user_agent))
            .build()?;

        Ok(YouTubeClient {
            transport: Transport::new(client, base_url, upload_url, self.credential),
            chunk_size: self.chunk_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_google_endpoints_by_default() {
        let client = YouTubeClient::builder().build().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.upload_url().as_str(), DEFAULT_UPLOAD_URL);
        assert_eq!(client.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert!(!client.has_access_token());
    }

    #[test]
    fn builder_rejects_invalid_urls() {
        assert!(matches!(
            YouTubeClient::builder().base_url("not a url"),
            Err(YouTubeError::InvalidUrl(_))
        ));
        assert!(matches!(
            YouTubeClient::builder().upload_url("::"),
            Err(YouTubeError::InvalidUrl(_))
        ));
    }

    #[test]
    fn chunk_size_is_never_zero() {
        let client = YouTubeClient::builder().chunk_size(0).build().unwrap();
        assert_eq!(client.chunk_size(), 1);
    }

    #[test]
    fn access_token_replaces_api_key() {
        let client = YouTubeClient::builder()
            .api_key("k3y")
            .build()
            .unwrap()
            .with_access_token("ya29.token");
        assert!(client.has_access_token());
    }

    #[tokio::test]
    async fn own_channel_needs_access_token() {
        let client = YouTubeClient::builder().api_key("k3y").build().unwrap();
        let err = client
            .channel(&ChannelSelector::Mine, &["snippet"])
            .await
            .unwrap_err();
        assert!(matches!(err, YouTubeError::MissingAccessToken));
    }

    #[tokio::test]
    async fn update_requires_id_and_parts() {
        let client = YouTubeClient::builder()
            .access_token("ya29.token")
            .build()
            .unwrap();

        let err = client.update_video(&Video::default()).await.unwrap_err();
        assert!(matches!(err, YouTubeError::MissingField(_)));

        let err = client.update_video(&Video::with_id("abc")).await.unwrap_err();
        assert!(matches!(err, YouTubeError::Api(_)));
    }

    #[tokio::test]
    async fn empty_file_is_rejected_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp4");
        std::fs::write(&path, b"").unwrap();

        let client = YouTubeClient::builder()
            .access_token("ya29.token")
            .base_url("http://127.0.0.1:9/youtube/v3/")
            .unwrap()
            .build()
            .unwrap();
        let err = client
            .upload_video(&path, &Video::default(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, YouTubeError::EmptyUpload));
    }

    #[test]
    fn selector_displays_target() {
        assert_eq!(ChannelSelector::Mine.to_string(), "mine");
        assert_eq!(ChannelSelector::Id("UC123".into()).to_string(), "UC123");
    }
}
