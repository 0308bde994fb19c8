use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode, Url,
    header::{ACCEPT, CONTENT_RANGE, HeaderName, LOCATION, RANGE},
};
use serde::de::DeserializeOwned;

use crate::YouTubeError;
use crate::models::GoogleErrorEnvelope;

const X_UPLOAD_CONTENT_TYPE: HeaderName = HeaderName::from_static("x-upload-content-type");
const X_UPLOAD_CONTENT_LENGTH: HeaderName = HeaderName::from_static("x-upload-content-length");

/// How requests are authorized.
///
/// API keys only grant access to public data; anything touching the authenticated user's
/// channel, and every write, needs an OAuth access token.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Credential {
    ApiKey(String),
    AccessToken(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credential::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

/// Outcome of sending one chunk to a resumable upload session.
#[derive(Debug)]
pub(crate) enum ChunkOutcome<T> {
    /// The server persisted bytes up to (excluding) `next_offset` and expects more.
    Incomplete { next_offset: u64 },
    /// The upload finished and the server returned the created resource.
    Complete(T),
}

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) upload_url: Url,
    pub(crate) credential: Option<Credential>,
}

impl Transport {
    pub(crate) fn new(
        client: Client,
        base_url: Url,
        upload_url: Url,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            client,
            base_url,
            upload_url,
            credential,
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub(crate) fn has_access_token(&self) -> bool {
        matches!(self.credential, Some(Credential::AccessToken(_)))
    }

    pub(crate) fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub(crate) async fn get_raw(&self, path: &str) -> Result<Response, YouTubeError> {
        let builder = self.client.get(self.join_path(path)?);
        let builder = match &self.credential {
            Some(_) => self.apply_auth(builder, false)?,
            None => builder,
        };
        builder.send().await.map_err(YouTubeError::from)
    }

    pub(crate) async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, YouTubeError>
    where
        T: DeserializeOwned,
    {
        let builder = self
            .build_request(Method::GET, self.join_path(path)?, false)?
            .query(query);
        self.send_json(builder).await
    }

    pub(crate) async fn put_json<B, T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, YouTubeError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .build_request(Method::PUT, self.join_path(path)?, true)?
            .query(query)
            .json(body);
        self.send_json(builder).await
    }

    /// Open a resumable upload session and return its session URI.
    pub(crate) async fn start_resumable_upload<B>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
        content_type: &str,
        content_length: u64,
    ) -> Result<Url, YouTubeError>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.upload_url.join(path)?;
        let builder = self
            .build_request(Method::POST, url, true)?
            .query(&[("uploadType", "resumable")])
            .query(query)
            .header(X_UPLOAD_CONTENT_TYPE, content_type)
            .header(X_UPLOAD_CONTENT_LENGTH, content_length)
            .json(body);

        let response = Self::check(builder.send().await?).await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(YouTubeError::MissingField(
                "resumable upload response missing Location header",
            ))?;

        Ok(self.upload_url.join(location)?)
    }

    /// Send `data` as the chunk starting at `offset` of a `total`-byte upload.
    pub(crate) async fn put_chunk<T>(
        &self,
        session: &Url,
        data: Vec<u8>,
        offset: u64,
        total: u64,
    ) -> Result<ChunkOutcome<T>, YouTubeError>
    where
        T: DeserializeOwned,
    {
        let len = data.len() as u64;
        let builder = self
            .build_request(Method::PUT, session.clone(), true)?
            .header(CONTENT_RANGE, content_range(offset, len, total))
            .body(data);

        let response = builder.send().await?;
        if response.status() == StatusCode::PERMANENT_REDIRECT {
            let next_offset = response
                .headers()
                .get(RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_range_end)
                .map(|end| end + 1)
                .unwrap_or(0);
            return Ok(ChunkOutcome::Incomplete { next_offset });
        }

        let response = Self::check(response).await?;
        Ok(ChunkOutcome::Complete(response.json().await?))
    }

    async fn send_json<T>(&self, builder: RequestBuilder) -> Result<T, YouTubeError>
    where
        T: DeserializeOwned,
    {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        requires_oauth: bool,
    ) -> Result<RequestBuilder, YouTubeError> {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        self.apply_auth(builder, requires_oauth)
    }

    async fn check(response: Response) -> Result<Response, YouTubeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::map_error(status, &body))
    }

    fn map_error(status: StatusCode, body: &str) -> YouTubeError {
        let message = serde_json::from_str::<GoogleErrorEnvelope>(body)
            .map(|envelope| envelope.summary())
            .unwrap_or_else(|_| body.trim().to_string());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            YouTubeError::AuthenticationFailed { status, message }
        } else {
            YouTubeError::RequestFailed { status, message }
        }
    }

    pub(crate) fn join_path(&self, path: &str) -> Result<Url, YouTubeError> {
        Ok(self.base_url.join(path)?)
    }

    fn apply_auth(
        &self,
        builder: RequestBuilder,
        requires_oauth: bool,
    ) -> Result<RequestBuilder, YouTubeError> {
        match (&self.credential, requires_oauth) {
            (Some(Credential::AccessToken(token)), _) => Ok(builder.bearer_auth(token)),
            (Some(Credential::ApiKey(key)), false) => Ok(builder.query(&[("key", key)])),
            (Some(Credential::ApiKey(_)), true) | (None, true) => {
                Err(YouTubeError::MissingAccessToken)
            }
            (None, false) => Err(YouTubeError::MissingCredentials),
        }
    }
}

fn content_range(offset: u64, len: u64, total: u64) -> String {
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{}", offset, offset + len - 1, total)
    }
}

/// Last persisted byte from a resumable `Range: bytes=0-N` header.
pub(crate) fn parse_range_end(value: &str) -> Option<u64> {
    value
        .trim()
        .strip_prefix("bytes=")?
        .split_once('-')
        .and_then(|(_, end)| end.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_with(credential: Option<Credential>) -> Transport {
        Transport::new(
            Client::new(),
            Url::parse("https://example.test/youtube/v3/").unwrap(),
            Url::parse("https://example.test/upload/youtube/v3/").unwrap(),
            credential,
        )
    }

    #[test]
    fn join_path_appends_relative_segment() {
        let transport = transport_with(None);
        let url = transport.join_path("videos").unwrap();
        assert_eq!(url.as_str(), "https://example.test/youtube/v3/videos");
    }

    #[test]
    fn api_key_is_sent_as_query_parameter() {
        let transport = transport_with(Some(Credential::ApiKey("k3y".into())));
        let request = transport
            .build_request(Method::GET, transport.join_path("channels").unwrap(), false)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().query(), Some("key=k3y"));
        assert!(!request.headers().contains_key("authorization"));
    }

    #[test]
    fn access_token_is_sent_as_bearer() {
        let transport = transport_with(Some(Credential::AccessToken("ya29.token".into())));
        let request = transport
            .build_request(Method::PUT, transport.join_path("videos").unwrap(), true)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer ya29.token"
        );
        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn writes_require_an_access_token() {
        let transport = transport_with(Some(Credential::ApiKey("k3y".into())));
        let err = transport
            .build_request(Method::PUT, transport.join_path("videos").unwrap(), true)
            .unwrap_err();
        assert!(matches!(err, YouTubeError::MissingAccessToken));

        let transport = transport_with(None);
        let err = transport
            .build_request(Method::GET, transport.join_path("videos").unwrap(), false)
            .unwrap_err();
        assert!(matches!(err, YouTubeError::MissingCredentials));
    }

    #[test]
    fn map_error_classifies_status_and_decodes_envelope() {
        let body = r#"{"error":{"code":403,"message":"Forbidden","errors":[{"reason":"forbidden"}]}}"#;
        match Transport::map_error(StatusCode::FORBIDDEN, body) {
            YouTubeError::AuthenticationFailed { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "Forbidden (forbidden)");
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }

        match Transport::map_error(StatusCode::BAD_GATEWAY, " upstream down \n") {
            YouTubeError::RequestFailed { status, message } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[test]
    fn content_range_covers_chunk() {
        assert_eq!(content_range(0, 1024, 4096), "bytes 0-1023/4096");
        assert_eq!(content_range(3072, 1024, 4096), "bytes 3072-4095/4096");
        assert_eq!(content_range(4096, 0, 4096), "bytes */4096");
    }

    #[test]
    fn parses_range_header() {
        assert_eq!(parse_range_end("bytes=0-1048575"), Some(1_048_575));
        assert_eq!(parse_range_end(" bytes=0-42 "), Some(42));
        assert_eq!(parse_range_end("0-42"), None);
        assert_eq!(parse_range_end("bytes=0-"), None);
    }

    #[test]
    fn credential_debug_hides_secret() {
        let debug = format!("{:?}", Credential::AccessToken("ya29.secret".into()));
        assert!(!debug.contains("secret"));
    }
}
