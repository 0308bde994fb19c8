use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::YouTubeError;

/// Channel resource as returned by `channels.list`.
///
/// Only the parts requested through `part=` are populated; everything the crate does not model
/// explicitly is kept in [`Channel::extra`] so a response can be printed back without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Channel ID (`UC...`).
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<ChannelSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<ChannelContentDetails>,
    /// View/subscriber/video counters, kept as returned (the API encodes them as strings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

/// Platform-managed playlists of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPlaylists {
    /// Playlist holding every video published by the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<String>,
}

/// Entry of a playlist as returned by `playlistItems.list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<PlaylistItemSnippet>,
}

impl PlaylistItem {
    /// ID of the video this item points at, if the snippet part was requested.
    pub fn video_id(&self) -> Option<&str> {
        self.snippet
            .as_ref()
            .and_then(|snippet| snippet.resource_id.video_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// Video resource used for `videos.list`, `videos.update` and `videos.insert`.
///
/// Absent parts are skipped when serializing, so the same type doubles as a request body: see
/// [`Video::parts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localizations: Option<IndexMap<String, Localization>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_details: Option<Map<String, Value>>,
}

impl Video {
    /// Empty resource addressing `id`, ready to receive the parts to update.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Writable parts present on this resource, in the order the API documents them.
    ///
    /// `videos.update` replaces every part named in `part=`, so the request must name exactly the
    /// parts carried in the body.
    pub fn parts(&self) -> Vec<&'static str> {
        let mut parts = Vec::new();
        if self.snippet.is_some() {
            parts.push("snippet");
        }
        if self.localizations.is_some() {
            parts.push("localizations");
        }
        if self.status.is_some() {
            parts.push("status");
        }
        parts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_audio_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
}

impl VideoSnippet {
    /// Copy of this snippet with the read-only fields removed, suitable for a write request.
    pub fn writable(&self) -> Self {
        Self {
            published_at: None,
            channel_id: None,
            channel_title: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<PrivacyStatus>,
    /// Scheduled publication time; only honored while the video is private.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_declared_made_for_kids: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_stats_viewable: Option<bool>,
    /// Disclosure of realistic altered or synthetic content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_synthetic_media: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,
}

impl VideoStatus {
    /// Copy of this status with the read-only fields removed.
    pub fn writable(&self) -> Self {
        Self {
            upload_status: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Private,
    Public,
    Unlisted,
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PrivacyStatus::Private => "private",
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
        };
        f.write_str(value)
    }
}

impl FromStr for PrivacyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(PrivacyStatus::Private),
            "public" => Ok(PrivacyStatus::Public),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            other => Err(format!(
                "unknown privacy status '{other}' (expected private, public or unlisted)"
            )),
        }
    }
}

/// Per-language override of a video's title and description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localization {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
    /// Total number of results as reported by the API, if any.
    pub total_results: Option<u64>,
}

/// Envelope of a list endpoint, as returned on the wire.
///
/// Unmodelled envelope fields (`kind`, `etag`, ...) are kept in [`ListResponse::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_per_page: Option<u64>,
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(body: ListResponse<T>) -> Self {
        Page {
            items: body.items,
            next_page_token: body.next_page_token.filter(|token| !token.is_empty()),
            total_results: body.page_info.and_then(|info| info.total_results),
        }
    }
}

impl TryFrom<Channel> for String {
    type Error = YouTubeError;

    /// Extract the uploads playlist ID from a channel fetched with `contentDetails`.
    fn try_from(channel: Channel) -> Result<Self, Self::Error> {
        channel
            .content_details
            .and_then(|details| details.related_playlists.uploads)
            .ok_or(YouTubeError::MissingField(
                "channel response missing contentDetails.relatedPlaylists.uploads",
            ))
    }
}

/// Error envelope returned by Google APIs on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorEnvelope {
    pub(crate) error: GoogleError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleError {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorDetail {
    #[serde(default)]
    pub(crate) reason: String,
}

impl GoogleErrorEnvelope {
    /// Human-readable summary: the message followed by the first machine reason, if any.
    pub(crate) fn summary(&self) -> String {
        match self.error.errors.first() {
            Some(detail) if !detail.reason.is_empty() => {
                format!("{} ({})", self.error.message, detail.reason)
            }
            _ => self.error.message.clone(),
        }
    }
}
