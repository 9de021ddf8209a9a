//! Artifact store location parsing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreUri {
    /// S3-compatible endpoint, path-style: http://minio.local:9000/prefix
    Http { authority: String, prefix: String },
    /// Local mirror directory: file:///srv/models or ./mirror
    Local { root: PathBuf },
}

#[derive(Debug, Error)]
pub enum StoreUriError {
    #[error("unsupported store scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid store URI: {0}")]
    InvalidUri(String),
}

impl StoreUri {
    pub fn parse(uri: &str) -> Result<Self, StoreUriError> {
        if let Some(rest) = uri.strip_prefix("http://") {
            let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
            if authority.is_empty() {
                return Err(StoreUriError::InvalidUri(uri.to_string()));
            }
            Ok(StoreUri::Http {
                authority: authority.to_string(),
                prefix: path.trim_matches('/').to_string(),
            })
        } else if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(StoreUriError::InvalidUri(uri.to_string()));
            }
            Ok(StoreUri::Local { root: PathBuf::from(path) })
        } else if uri.starts_with('/') || uri.starts_with("./") || uri.starts_with("../") {
            Ok(StoreUri::Local { root: PathBuf::from(uri) })
        } else {
            let scheme = uri.split_once("://").map(|(s, _)| s).unwrap_or(uri);
            Err(StoreUriError::UnsupportedScheme(scheme.to_string()))
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            StoreUri::Http { .. } => "http",
            StoreUri::Local { .. } => "file",
        }
    }

    /// `host:port` to dial for an HTTP store. Port 80 is implied when absent.
    pub fn socket_addr(&self) -> Option<String> {
        match self {
            StoreUri::Http { authority, .. } if authority.contains(':') => Some(authority.clone()),
            StoreUri::Http { authority, .. } => Some(format!("{authority}:80")),
            StoreUri::Local { .. } => None,
        }
    }

    /// Request path for `bucket/key` under this store, starting with `/`.
    pub fn object_path(&self, bucket: &str, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self {
            StoreUri::Http { prefix, .. } if prefix.is_empty() => format!("/{bucket}/{key}"),
            StoreUri::Http { prefix, .. } => format!("/{prefix}/{bucket}/{key}"),
            StoreUri::Local { root } => root.join(bucket).join(key).display().to_string(),
        }
    }
}
