//! Local JSON documents mapping video identifiers to metadata.
//!
//! The same shape serves as the output of the "latest videos" export and as the input of the
//! batch update: every field is optional, key order is preserved and unknown fields survive a
//! load/save round-trip.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::YouTubeError;
use crate::models::{Localization, PrivacyStatus, Video, VideoSnippet, VideoStatus};

const SHORT_LINK_PREFIX: &str = "https://youtu.be/";

const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Ordered mapping from video identifier to its metadata entry.
pub type MetadataDocument = IndexMap<String, VideoEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localizations: Option<IndexMap<String, LocalizedText>>,
    /// ISO 8601 time at which a private video should go public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_publish_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Default-language title, description and tags of a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Values stamped onto every snippet sent by a batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDefaults {
    /// `snippet.defaultLanguage`; required by the API whenever localizations are set.
    pub default_language: String,
    /// `snippet.categoryId`; `None` keeps the video's current category.
    pub category_id: Option<String>,
}

impl Default for UpdateDefaults {
    fn default() -> Self {
        Self {
            default_language: "en".into(),
            category_id: Some("10".into()),
        }
    }
}

impl VideoEntry {
    /// Project a video fetched with `snippet,contentDetails,statistics,topicDetails,localizations`.
    pub fn from_video(video: &Video) -> Self {
        let snippet = video.snippet.clone().unwrap_or_default();
        let localizations = video
            .localizations
            .iter()
            .flatten()
            .map(|(lang, localization)| {
                (
                    lang.clone(),
                    LocalizedText {
                        title: Some(localization.title.clone()),
                        description: Some(localization.description.clone()),
                    },
                )
            })
            .collect();

        Self {
            default: Some(DefaultInfo {
                title: Some(snippet.title),
                description: Some(snippet.description.unwrap_or_default()),
                published_at: Some(snippet.published_at.unwrap_or_default()),
                tags: Some(snippet.tags.unwrap_or_default()),
                channel_title: Some(snippet.channel_title.unwrap_or_default()),
                extra: Map::new(),
            }),
            statistics: Some(video.statistics.clone().unwrap_or_default()),
            content_details: Some(video.content_details.clone().unwrap_or_default()),
            topic_details: Some(video.topic_details.clone().unwrap_or_default()),
            localizations: Some(localizations),
            scheduled_publish_time: None,
            extra: Map::new(),
        }
    }

    /// Build the `videos.update` body for this entry on top of the video's current state.
    ///
    /// - `default` rewrites the snippet: given title/description/tags replace the current ones,
    ///   the language and category come from `defaults`.
    /// - `localizations` are merged into the current ones (the API replaces the whole map).
    /// - `scheduledPublishTime` sets `status.publishAt` and makes the video private, which the
    ///   API requires for scheduled publication.
    ///
    /// Returns `None` when the entry carries nothing to update.
    pub fn build_update(
        &self,
        video_id: &str,
        current: &Video,
        defaults: &UpdateDefaults,
    ) -> Option<Video> {
        let mut update = Video::with_id(video_id);

        if let Some(info) = &self.default {
            let mut snippet = current
                .snippet
                .as_ref()
                .map(VideoSnippet::writable)
                .unwrap_or_default();
            if let Some(title) = &info.title {
                snippet.title = title.clone();
            }
            if let Some(description) = &info.description {
                snippet.description = Some(description.clone());
            }
            if let Some(tags) = &info.tags {
                snippet.tags = Some(tags.clone());
            }
            snippet.default_language = Some(defaults.default_language.clone());
            if let Some(category) = &defaults.category_id {
                snippet.category_id = Some(category.clone());
            }
            update.snippet = Some(snippet);
        }

        if let Some(localizations) = self.localizations.as_ref().filter(|l| !l.is_empty()) {
            let mut merged = current.localizations.clone().unwrap_or_default();
            for (lang, text) in localizations {
                let entry = merged.entry(lang.clone()).or_insert_with(Localization::default);
                if let Some(title) = &text.title {
                    entry.title = title.clone();
                }
                if let Some(description) = &text.description {
                    entry.description = description.clone();
                }
            }
            update.localizations = Some(merged);
        }

        if let Some(publish_at) = &self.scheduled_publish_time {
            let mut status = current
                .status
                .as_ref()
                .map(VideoStatus::writable)
                .unwrap_or_default();
            status.publish_at = Some(publish_at.clone());
            status.privacy_status = Some(PrivacyStatus::Private);
            update.status = Some(status);
        }

        if update.parts().is_empty() {
            None
        } else {
            Some(update)
        }
    }
}

/// Read a metadata document.
///
/// # Errors
///
/// - [`YouTubeError::Io`] if the file cannot be read (including when it does not exist)
/// - [`YouTubeError::Json`] if the file is not a JSON object of entries
pub fn load_document(path: impl AsRef<Path>) -> Result<MetadataDocument, YouTubeError> {
    let raw = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write a metadata document with four-space indentation, creating the parent directory.
pub fn save_document(
    path: impl AsRef<Path>,
    document: &MetadataDocument,
) -> Result<(), YouTubeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut serializer)?;

    let mut file = fs::File::create(path)?;
    file.write_all(&buf)?;
    Ok(())
}

/// Video ID from either a bare ID or a `https://youtu.be/<id>` short link.
pub fn extract_video_id(identifier: &str) -> &str {
    identifier
        .strip_prefix(SHORT_LINK_PREFIX)
        .unwrap_or(identifier)
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts a trailing `Z`, an explicit offset (with or without a colon), or no zone at all (read
/// as UTC). Seconds and fractions are optional, and a bare date means midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, YouTubeError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let zoned = match value.strip_suffix(['Z', 'z']) {
        Some(local) => format!("{local}+00:00"),
        None => value.to_string(),
    };
    let with_offset = ZONED_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&zoned, format).ok())
        .map(|parsed| parsed.with_timezone(&Utc));
    if let Some(parsed) = with_offset {
        return Ok(parsed);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| YouTubeError::InvalidTimestamp(value.to_string()))
}

/// Rewrite any form [`parse_timestamp`] accepts as `YYYY-MM-DDTHH:MM:SSZ`, the form the API
/// expects for `publishAt`.
pub fn normalize_timestamp(value: &str) -> Result<String, YouTubeError> {
    Ok(parse_timestamp(value)?.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Whether `value` is strictly after `now`. Invalid timestamps are never in the future.
pub fn is_future_date(value: &str, now: DateTime<Utc>) -> bool {
    match parse_timestamp(value) {
        Ok(timestamp) => timestamp > now,
        Err(err) => {
            log::warn!("{err}");
            false
        }
    }
}

/// Check that every `scheduledPublishTime` in the document lies in the future.
///
/// # Errors
///
/// [`YouTubeError::ScheduleInPast`] for the first entry whose schedule is in the past or
/// unparsable.
pub fn validate_scheduled_publish_times(
    document: &MetadataDocument,
    now: DateTime<Utc>,
) -> Result<(), YouTubeError> {
    for (identifier, entry) in document {
        if let Some(timestamp) = &entry.scheduled_publish_time {
            if !is_future_date(timestamp, now) {
                return Err(YouTubeError::ScheduleInPast {
                    video_id: extract_video_id(identifier).to_string(),
                    timestamp: timestamp.clone(),
                });
            }
        }
    }
    Ok(())
}
