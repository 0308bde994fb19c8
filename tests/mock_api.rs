use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use youtube_data_client::{
    ChannelSelector, PrivacyStatus, UploadProgress, Video, VideoSnippet, VideoStatus,
    YouTubeClient, YouTubeError,
};

const TOKEN: &str = "test-token";
const PLAYLIST_LEN: usize = 5;
const SERVER_PAGE_LIMIT: usize = 2;

#[derive(Default)]
struct MockState {
    keys: Mutex<Vec<Option<String>>>,
    video_batches: Mutex<Vec<usize>>,
    updates: Mutex<Vec<(String, Value)>>,
    upload_init: Mutex<Option<(String, String, String)>>,
    content_ranges: Mutex<Vec<String>>,
    received: Mutex<Vec<u8>>,
    stall: AtomicBool,
    /// Most bytes persisted from each chunk; zero keeps whole chunks.
    accept_limit: AtomicUsize,
}

fn google_error(status: StatusCode, message: &str, reason: &str) -> Response {
    let body = json!({
        "error": { "code": status.as_u16(), "message": message, "errors": [{ "reason": reason }] }
    });
    (status, Json(body)).into_response()
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

async fn channels(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.keys.lock().unwrap().push(query.get("key").cloned());

    let id = match (query.get("mine"), query.get("id")) {
        (Some(_), _) if !is_authorized(&headers) => {
            return google_error(StatusCode::UNAUTHORIZED, "Login Required", "required");
        }
        (Some(_), _) => "UCmine".to_string(),
        (None, Some(id)) if id == "UCmissing" => return Json(json!({ "items": [] })).into_response(),
        (None, Some(id)) => id.clone(),
        (None, None) => return google_error(StatusCode::BAD_REQUEST, "No filter selected", "missingRequiredParameter"),
    };

    let uploads = id.replacen("UC", "UU", 1);
    Json(json!({
        "kind": "youtube#channelListResponse",
        "etag": "mock-etag",
        "pageInfo": { "totalResults": 1, "resultsPerPage": 5 },
        "items": [{
            "kind": "youtube#channel",
            "id": id,
            "contentDetails": { "relatedPlaylists": { "likes": "", "uploads": uploads } }
        }]
    }))
    .into_response()
}

async fn playlist_items(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.keys.lock().unwrap().push(query.get("key").cloned());

    let max_results: usize = query
        .get("maxResults")
        .and_then(|value| value.parse().ok())
        .unwrap_or(5);
    let start: usize = query
        .get("pageToken")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let end = (start + max_results.min(SERVER_PAGE_LIMIT)).min(PLAYLIST_LEN);

    let items: Vec<Value> = (start..end)
        .map(|index| {
            json!({
                "id": format!("item{index}"),
                "snippet": {
                    "title": format!("Video {index}"),
                    "publishedAt": format!("2025-01-0{}T10:00:00Z", 9 - index),
                    "resourceId": { "kind": "youtube#video", "videoId": format!("vid{index}") }
                }
            })
        })
        .collect();

    let mut body = json!({ "items": items, "pageInfo": { "totalResults": PLAYLIST_LEN } });
    if end < PLAYLIST_LEN {
        body["nextPageToken"] = json!(end.to_string());
    }
    Json(body).into_response()
}

async fn list_videos(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let ids: Vec<&str> = query
        .get("id")
        .map(|ids| ids.split(',').collect())
        .unwrap_or_default();
    state.video_batches.lock().unwrap().push(ids.len());

    if ids.contains(&"forbidden") {
        return google_error(StatusCode::FORBIDDEN, "Forbidden", "forbidden");
    }

    let items: Vec<Value> = ids
        .iter()
        .rev()
        .filter(|id| !id.starts_with("gone"))
        .map(|id| {
            json!({
                "id": id,
                "snippet": {
                    "title": format!("Title of {id}"),
                    "description": "",
                    "publishedAt": "2025-01-01T00:00:00Z",
                    "channelTitle": "Mock Channel",
                    "categoryId": "22"
                },
                "status": { "privacyStatus": "public", "uploadStatus": "processed" }
            })
        })
        .collect();
    Json(json!({ "items": items })).into_response()
}

async fn update_video(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if !is_authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Login Required", "required");
    }
    let part = query.get("part").cloned().unwrap_or_default();
    state.updates.lock().unwrap().push((part, body.clone()));
    Json(body).into_response()
}

async fn start_upload(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(_body): Json<Value>,
) -> Response {
    if !is_authorized(&headers) {
        return google_error(StatusCode::UNAUTHORIZED, "Login Required", "required");
    }
    if query.get("uploadType").map(String::as_str) != Some("resumable") {
        return google_error(StatusCode::BAD_REQUEST, "Media upload required", "badContent");
    }

    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    *state.upload_init.lock().unwrap() = Some((
        query.get("part").cloned().unwrap_or_default(),
        header_value("x-upload-content-type"),
        header_value("x-upload-content-length"),
    ));

    (StatusCode::OK, [(header::LOCATION, "/upload/session/abc")]).into_response()
}

/// `bytes <start>-<end>/<total>` as `(start, total)`.
fn parse_content_range(range: &str) -> Option<(usize, usize)> {
    let (span, total) = range.strip_prefix("bytes ")?.split_once('/')?;
    let (start, _end) = span.split_once('-')?;
    Some((start.parse().ok()?, total.parse().ok()?))
}

async fn upload_chunk(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    let range = headers
        .get(header::CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.content_ranges.lock().unwrap().push(range.clone());

    if state.stall.load(Ordering::SeqCst) {
        return StatusCode::PERMANENT_REDIRECT.into_response();
    }

    let Some((start, total)) = parse_content_range(&range) else {
        return google_error(StatusCode::BAD_REQUEST, "Invalid Content-Range", "badRequest");
    };

    let limit = state.accept_limit.load(Ordering::SeqCst);
    let kept = if limit == 0 { body.len() } else { body.len().min(limit) };

    let mut received = state.received.lock().unwrap();
    received.truncate(start);
    received.extend_from_slice(&body[..kept]);

    if received.len() >= total {
        return (
            StatusCode::OK,
            Json(json!({
                "id": "uploaded1",
                "snippet": { "title": "clip.mp4" },
                "status": { "privacyStatus": "private", "uploadStatus": "uploaded" }
            })),
        )
            .into_response();
    }

    let range = format!("bytes=0-{}", received.len() - 1);
    (StatusCode::PERMANENT_REDIRECT, [(header::RANGE, range)]).into_response()
}

async fn spawn_mock() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/youtube/v3/channels", get(channels))
        .route("/youtube/v3/playlistItems", get(playlist_items))
        .route("/youtube/v3/videos", get(list_videos).put(update_video))
        .route("/upload/youtube/v3/videos", post(start_upload))
        .route("/upload/session/abc", put(upload_chunk))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn api_key_client(base: &str) -> YouTubeClient {
    YouTubeClient::builder()
        .api_key("k3y")
        .base_url(format!("{base}/youtube/v3/"))
        .unwrap()
        .upload_url(format!("{base}/upload/youtube/v3/"))
        .unwrap()
        .build()
        .unwrap()
}

fn oauth_client(base: &str, chunk_size: u64) -> YouTubeClient {
    YouTubeClient::builder()
        .access_token(TOKEN)
        .base_url(format!("{base}/youtube/v3/"))
        .unwrap()
        .upload_url(format!("{base}/upload/youtube/v3/"))
        .unwrap()
        .chunk_size(chunk_size)
        .build()
        .unwrap()
}

#[tokio::test]
async fn resolves_uploads_playlist_with_api_key() {
    let (base, state) = spawn_mock().await;
    let client = api_key_client(&base);

    let playlist = client
        .uploads_playlist_id(&ChannelSelector::Id("UCchannel".into()))
        .await
        .unwrap();
    assert_eq!(playlist, "UUchannel");
    assert_eq!(*state.keys.lock().unwrap(), vec![Some("k3y".to_string())]);
}

#[tokio::test]
async fn own_channel_uses_bearer_token() {
    let (base, state) = spawn_mock().await;
    let client = oauth_client(&base, 4);

    let channel = client
        .channel(&ChannelSelector::Mine, &["contentDetails"])
        .await
        .unwrap();
    assert_eq!(channel.id, "UCmine");
    assert_eq!(*state.keys.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn own_channel_listing_keeps_envelope() {
    let (base, _state) = spawn_mock().await;
    let client = oauth_client(&base, 4);

    let response = client
        .list_channels(&ChannelSelector::Mine, &["snippet", "contentDetails", "statistics"])
        .await
        .unwrap();
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].id, "UCmine");

    let printed = serde_json::to_value(&response).unwrap();
    assert_eq!(printed["kind"], "youtube#channelListResponse");
    assert_eq!(printed["etag"], "mock-etag");
    assert_eq!(printed["pageInfo"]["totalResults"], 1);

    let missing = client
        .list_channels(&ChannelSelector::Id("UCmissing".into()), &["snippet"])
        .await
        .unwrap();
    assert!(missing.items.is_empty());
}

#[tokio::test]
async fn unknown_channel_is_reported() {
    let (base, _state) = spawn_mock().await;
    let client = api_key_client(&base);

    match client
        .channel(&ChannelSelector::Id("UCmissing".into()), &["snippet"])
        .await
    {
        Err(YouTubeError::ChannelNotFound(id)) => assert_eq!(id, "UCmissing"),
        other => panic!("expected ChannelNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn latest_uploads_pages_until_limit() {
    let (base, _state) = spawn_mock().await;
    let client = api_key_client(&base);

    let items = client.latest_uploads("UUchannel", 3).await.unwrap();
    let ids: Vec<_> = items.iter().filter_map(|item| item.video_id()).collect();
    assert_eq!(ids, ["vid0", "vid1", "vid2"]);
}

#[tokio::test]
async fn latest_uploads_stops_at_end_of_playlist() {
    let (base, _state) = spawn_mock().await;
    let client = api_key_client(&base);

    let items = client.latest_uploads("UUchannel", 20).await.unwrap();
    assert_eq!(items.len(), PLAYLIST_LEN);
    assert_eq!(items[4].snippet.as_ref().unwrap().title, "Video 4");

    assert!(client.latest_uploads("UUchannel", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_videos_batches_and_keeps_request_order() {
    let (base, state) = spawn_mock().await;
    let client = api_key_client(&base);

    let mut ids: Vec<String> = (0..120).map(|index| format!("vid{index}")).collect();
    ids.insert(7, "gone7".to_string());
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let videos = client.list_videos(&id_refs, &["snippet"]).await.unwrap();
    let returned: Vec<&str> = videos.iter().map(|video| video.id.as_str()).collect();
    let expected: Vec<&str> = id_refs
        .iter()
        .copied()
        .filter(|id| !id.starts_with("gone"))
        .collect();

    assert_eq!(returned, expected);
    assert_eq!(*state.video_batches.lock().unwrap(), vec![50, 50, 21]);

    assert_eq!(client.get_video("gone1", &["snippet"]).await.unwrap(), None);
}

#[tokio::test]
async fn forbidden_is_an_authentication_failure() {
    let (base, _state) = spawn_mock().await;
    let client = api_key_client(&base);

    match client.get_video("forbidden", &["snippet"]).await {
        Err(YouTubeError::AuthenticationFailed { status, message }) => {
            assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
            assert_eq!(message, "Forbidden (forbidden)");
        }
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn update_names_exactly_the_parts_sent() {
    let (base, state) = spawn_mock().await;
    let client = oauth_client(&base, 4);

    let mut video = Video::with_id("vid3");
    video.snippet = Some(VideoSnippet {
        title: "New title".into(),
        category_id: Some("10".into()),
        ..VideoSnippet::default()
    });
    video.status = Some(VideoStatus {
        privacy_status: Some(PrivacyStatus::Private),
        publish_at: Some("2030-01-01T00:00:00Z".into()),
        ..VideoStatus::default()
    });

    let updated = client.update_video(&video).await.unwrap();
    assert_eq!(updated.id, "vid3");

    let updates = state.updates.lock().unwrap();
    let (part, body) = &updates[0];
    assert_eq!(part, "snippet,status");
    assert_eq!(body["snippet"]["title"], "New title");
    assert_eq!(body["status"]["privacyStatus"], "private");
    assert!(body.get("localizations").is_none());
}

#[tokio::test]
async fn update_without_token_is_refused_locally() {
    let (base, state) = spawn_mock().await;
    let client = api_key_client(&base);

    let mut video = Video::with_id("vid3");
    video.snippet = Some(VideoSnippet::default());
    let err = client.update_video(&video).await.unwrap_err();

    assert!(matches!(err, YouTubeError::MissingAccessToken));
    assert!(state.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn resumable_upload_sends_file_in_chunks() {
    let (base, state) = spawn_mock().await;
    let client = oauth_client(&base, 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"0123456789").unwrap();

    let video = Video {
        snippet: Some(VideoSnippet {
            title: "clip.mp4".into(),
            category_id: Some("22".into()),
            ..VideoSnippet::default()
        }),
        status: Some(VideoStatus {
            privacy_status: Some(PrivacyStatus::Private),
            publish_at: Some("2030-06-15T16:30:00Z".into()),
            ..VideoStatus::default()
        }),
        ..Video::default()
    };

    let mut events: Vec<UploadProgress> = Vec::new();
    let created = client
        .upload_video(&path, &video, |progress| events.push(progress))
        .await
        .unwrap();

    assert_eq!(created.id, "uploaded1");
    assert_eq!(state.received.lock().unwrap().as_slice(), b"0123456789");
    assert_eq!(
        *state.content_ranges.lock().unwrap(),
        vec!["bytes 0-3/10", "bytes 4-7/10", "bytes 8-9/10"]
    );
    assert_eq!(
        state.upload_init.lock().unwrap().clone(),
        Some((
            "snippet,status".to_string(),
            "video/mp4".to_string(),
            "10".to_string()
        ))
    );

    let sent: Vec<u64> = events.iter().map(|event| event.bytes_sent).collect();
    assert_eq!(sent, vec![4, 8, 10]);
    assert!(events.last().unwrap().is_complete());
}

#[tokio::test]
async fn partially_acknowledged_chunks_are_resent() {
    let (base, state) = spawn_mock().await;
    state.accept_limit.store(3, Ordering::SeqCst);
    let client = oauth_client(&base, 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"0123456789").unwrap();

    let mut events: Vec<UploadProgress> = Vec::new();
    let created = client
        .upload_video(&path, &Video::default(), |progress| events.push(progress))
        .await
        .unwrap();

    assert_eq!(created.id, "uploaded1");
    assert_eq!(
        *state.content_ranges.lock().unwrap(),
        vec!["bytes 0-3/10", "bytes 3-6/10", "bytes 6-9/10", "bytes 9-9/10"]
    );
    assert_eq!(state.received.lock().unwrap().as_slice(), b"0123456789");

    let sent: Vec<u64> = events.iter().map(|event| event.bytes_sent).collect();
    assert_eq!(sent, vec![3, 6, 9, 10]);
}

#[tokio::test]
async fn stalled_upload_session_is_an_error() {
    let (base, state) = spawn_mock().await;
    state.stall.store(true, Ordering::SeqCst);
    let client = oauth_client(&base, 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"0123456789").unwrap();

    let err = client
        .upload_video(&path, &Video::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, YouTubeError::Api(_)));
    assert_eq!(state.content_ranges.lock().unwrap().len(), 1);
}
