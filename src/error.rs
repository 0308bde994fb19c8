use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a YouTube Data API call, the OAuth flow or a local metadata operation.
///
/// A non-2xx answer is split by status: `401` and `403` become
/// [`YouTubeError::AuthenticationFailed`], anything else [`YouTubeError::RequestFailed`], both
/// carrying the message from Google's JSON error body (or the raw body). A response that
/// never arrived (DNS, TLS, timeout) stays a [`YouTubeError::Http`].
///
/// Schedule checks report [`YouTubeError::InvalidTimestamp`] or [`YouTubeError::ScheduleInPast`]
/// before any request is sent. A resumable upload that stops making progress ends in
/// [`YouTubeError::Api`].
#[derive(Debug, Error)]
pub enum YouTubeError {
    /// An invalid URL was provided or returned.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The server returned `401 Unauthorized` or `403 Forbidden`.
    #[error("authentication failed with status {status}: {message}")]
    AuthenticationFailed { status: StatusCode, message: String },
    /// A request completed but returned a non-success HTTP status (other than `401`/`403`).
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: StatusCode, message: String },
    /// A request was attempted on a client configured with neither an API key nor a token.
    #[error("an API key or OAuth access token is required")]
    MissingCredentials,
    /// An endpoint requiring an OAuth access token was called without one.
    #[error("an OAuth access token is required for this request")]
    MissingAccessToken,
    /// `channels.list` returned no channel for the selector.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    /// A required field was missing in an API response body.
    #[error("{0}")]
    MissingField(&'static str),
    /// The API returned an unexpected response shape.
    #[error("api error: {0}")]
    Api(String),
    /// The OAuth authorization or token exchange failed.
    #[error("oauth error: {0}")]
    OAuth(String),
    /// A timestamp could not be parsed as ISO 8601.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// A scheduled publish time is not in the future.
    #[error("scheduled publish time for {video_id} is not in the future: {timestamp}")]
    ScheduleInPast { video_id: String, timestamp: String },
    /// The provided file path did not yield a valid UTF-8 file name.
    #[error("invalid file name")]
    InvalidFileName,
    /// The file selected for upload is empty.
    #[error("refusing to upload an empty file")]
    EmptyUpload,
    /// An underlying I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A JSON document could not be read or written.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// An underlying HTTP client operation failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
