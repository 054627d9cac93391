//! Backend HTTP client: metadata lookup and merge trigger

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tracing::debug;

use crate::error::{Result, SaverError};
use crate::types::{ApiEnvelope, InfoRequest, MergeRequest, VideoInfo};

/// Default public backend
pub const DEFAULT_API_URL: &str = "https://jenisaverbackend.onrender.com";

/// The remote service that extracts formats and assembles files
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch title, duration, thumbnail and formats for a video URL
    async fn get_info(&self, url: &str) -> Result<VideoInfo>;

    /// Ask the backend to build the file for one format; the body is the file
    async fn merge(&self, request: &MergeRequest) -> Result<Bytes>;
}

/// `reqwest` implementation of [`Backend`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| SaverError::InvalidConfig(format!("bad API URL '{base_url}': {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Underlying HTTP client, shared with the thumbnail probe
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn get_info(&self, url: &str) -> Result<VideoInfo> {
        let endpoint = self.endpoint("getinfo");
        debug!(%endpoint, %url, "Requesting video info");

        let response = self
            .client
            .post(&endpoint)
            .json(&InfoRequest { url })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SaverError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                endpoint
            )));
        }

        parse_info_response(&response.text().await?)
    }

    async fn merge(&self, request: &MergeRequest) -> Result<Bytes> {
        let endpoint = self.endpoint("merge");
        debug!(%endpoint, itag = request.itag, audio = request.is_audio_only, "Requesting merge");

        let response = self.client.post(&endpoint).json(request).send().await?;

        if !response.status().is_success() {
            return Err(SaverError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                endpoint
            )));
        }

        Ok(response.bytes().await?)
    }
}

/// Decode a `/getinfo` body, mapping `ok: false` to [`SaverError::Api`]
pub fn parse_info_response(body: &str) -> Result<VideoInfo> {
    let envelope: ApiEnvelope<VideoInfo> = serde_json::from_str(body)
        .map_err(|e| SaverError::MalformedResponse(e.to_string()))?;
    envelope.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer a single HTTP request and hand back what was sent
    async fn serve_once(status: &'static str, body: &'static [u8]) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let mut response = head.into_bytes();
            response.extend_from_slice(body);
            // the client may hang up early on error statuses
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&buf).to_string()
        });

        (addr, handle)
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            ApiClient::new("no scheme here"),
            Err(SaverError::InvalidConfig(_))
        ));
        let client = ApiClient::new("http://localhost:4000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(client.endpoint("merge"), "http://localhost:4000/merge");
    }

    #[test]
    fn test_parse_info_response_rejects_non_json() {
        assert!(matches!(
            parse_info_response("<html>502</html>"),
            Err(SaverError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_get_info_posts_url() {
        let (addr, server) = serve_once(
            "200 OK",
            br#"{"ok":true,"data":{"title":"Clip","duration":"0:42","thumbnail":"","videoFormats":[],"audioFormats":[]}}"#,
        )
        .await;

        let client = ApiClient::new(&format!("http://{addr}")).unwrap();
        let info = client.get_info("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert_eq!(info.title, "Clip");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /getinfo "));
        assert!(request.contains(r#"{"url":"https://youtu.be/dQw4w9WgXcQ"}"#));
    }

    #[tokio::test]
    async fn test_get_info_non_success_status_fails() {
        let (addr, server) = serve_once("500 Internal Server Error", b"oops").await;
        let client = ApiClient::new(&format!("http://{addr}")).unwrap();

        let err = client.get_info("https://youtu.be/x").await.unwrap_err();
        assert!(matches!(err, SaverError::Network(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_info_backend_error_flag() {
        let (addr, server) = serve_once("200 OK", br#"{"ok":false,"error":"Invalid URL"}"#).await;
        let client = ApiClient::new(&format!("http://{addr}")).unwrap();

        let err = client.get_info("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Backend error: Invalid URL");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_returns_body_bytes() {
        let (addr, server) = serve_once("200 OK", b"\x00\x00\x00\x18ftypmp42").await;
        let client = ApiClient::new(&format!("http://{addr}")).unwrap();

        let bytes = client
            .merge(&MergeRequest {
                url: "https://youtu.be/dQw4w9WgXcQ".into(),
                itag: 137,
                is_audio_only: false,
                sid: "sid-1".into(),
            })
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"\x00\x00\x00\x18ftypmp42");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /merge "));
        assert!(request.contains(r#""isAudioOnly":false"#));
        assert!(request.contains(r#""sid":"sid-1""#));
    }
}
