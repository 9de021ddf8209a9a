//! S3-compatible HTTP store client (path-style, unauthenticated).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::{Method, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use edgesync_core::{StoreUri, VersionTag};
use edgesync_rollout::{ArtifactStore, StoreError};

use super::{ensure_parent, finish_partial, partial_path};

const VERSION_ID_HEADER: &str = "x-amz-version-id";

pub struct HttpArtifactStore {
    uri: StoreUri,
    authority: String,
    socket_addr: String,
    timeout: Duration,
}

impl HttpArtifactStore {
    /// `timeout` bounds each connect, the wait for response headers, and
    /// each gap between body frames.
    pub fn new(uri: StoreUri, timeout: Duration) -> Result<Self, StoreError> {
        let (authority, socket_addr) = match (&uri, uri.socket_addr()) {
            (StoreUri::Http { authority, .. }, Some(addr)) => (authority.clone(), addr),
            _ => {
                return Err(StoreError::Transport(format!(
                    "{} store is not an HTTP endpoint",
                    uri.scheme()
                )));
            }
        };
        Ok(Self {
            uri,
            authority,
            socket_addr,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.authority, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        if_match: Option<&VersionTag>,
    ) -> Result<Response<Incoming>, StoreError> {
        let url = self.url(path);
        let exchange = async {
            let stream = tokio::net::TcpStream::connect(&self.socket_addr)
                .await
                .map_err(|e| StoreError::Transport(format!("connect {}: {e}", self.socket_addr)))?;

            let io = hyper_util::rt::TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| {
                    StoreError::Transport(format!("handshake with {}: {e}", self.socket_addr))
                })?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, "store connection closed with error");
                }
            });

            let mut req = http::Request::builder()
                .method(method.clone())
                .uri(encode_path(path))
                .header(http::header::HOST, &self.authority)
                .header(http::header::USER_AGENT, "edgesync/0.1");
            if let Some(version) = if_match {
                req = req.header(http::header::IF_MATCH, format!("\"{version}\""));
            }
            let req = req
                .body(Empty::<Bytes>::new())
                .map_err(|e| StoreError::Transport(format!("building request for {url}: {e}")))?;

            sender
                .send_request(req)
                .await
                .map_err(|e| StoreError::Transport(format!("{method} {url}: {e}")))
        };

        let resp = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;
        debug!(%method, %url, status = %resp.status(), "store response");
        Ok(resp)
    }

    fn check_status(
        resp: &Response<Incoming>,
        bucket: &str,
        key: &str,
        url: String,
    ) -> Result<(), StoreError> {
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            s => Err(StoreError::Status {
                status: s.as_u16(),
                url,
            }),
        }
    }

    async fn write_body(
        &self,
        resp: Response<Incoming>,
        partial: &Path,
    ) -> Result<u64, StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: partial.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;
        let mut body = resp.into_body();
        let mut written = 0u64;

        loop {
            let frame = tokio::time::timeout(self.timeout, body.frame())
                .await
                .map_err(|_| StoreError::Timeout(self.timeout))?;
            let Some(frame) = frame else { break };
            let frame = frame.map_err(|e| StoreError::Transport(format!("reading body: {e}")))?;
            if let Ok(data) = frame.into_data() {
                file.write_all(&data).await.map_err(io_err)?;
                written += data.len() as u64;
            }
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        Ok(written)
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn head_version(&self, bucket: &str, key: &str) -> Result<VersionTag, StoreError> {
        let path = self.uri.object_path(bucket, key);
        let resp = self.send(Method::HEAD, &path, None).await?;
        Self::check_status(&resp, bucket, key, self.url(&path))?;
        version_from_headers(resp.headers()).ok_or_else(|| StoreError::MissingVersion {
            url: self.url(&path),
        })
    }

    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), StoreError> {
        self.download(bucket, key, None, dest).await
    }

    async fn fetch_version(
        &self,
        bucket: &str,
        key: &str,
        version: &VersionTag,
        dest: &Path,
    ) -> Result<(), StoreError> {
        self.download(bucket, key, Some(version), dest).await
    }
}

impl HttpArtifactStore {
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        expected: Option<&VersionTag>,
        dest: &Path,
    ) -> Result<(), StoreError> {
        let path = self.uri.object_path(bucket, key);
        let resp = self.send(Method::GET, &path, expected).await?;
        if let (StatusCode::PRECONDITION_FAILED, Some(expected)) = (resp.status(), expected) {
            return Err(StoreError::VersionChanged {
                bucket: bucket.to_string(),
                key: key.to_string(),
                expected: expected.clone(),
            });
        }
        Self::check_status(&resp, bucket, key, self.url(&path))?;

        ensure_parent(dest).await?;
        let partial = partial_path(dest);
        let written = self.write_body(resp, &partial).await;
        let bytes = finish_partial(&partial, dest, written).await?;
        debug!(dest = %dest.display(), bytes, "object downloaded");
        Ok(())
    }
}

/// ETag with quotes and any weak marker removed, else the S3 version id.
fn version_from_headers(headers: &http::HeaderMap) -> Option<VersionTag> {
    let etag = headers
        .get(http::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_start_matches("W/").trim_matches('"'))
        .filter(|v| !v.is_empty());
    let version_id = || {
        headers
            .get(VERSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    etag.or_else(version_id).map(VersionTag::from)
}

/// Percent-encode everything outside RFC 3986 unreserved characters and `/`.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for b in path.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'/') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
