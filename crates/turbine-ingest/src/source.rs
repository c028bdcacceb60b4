//! Source references and fetching

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use url::Url;

/// Default timeout for a single source download.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Where to fetch one batch file from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Url(Url),
    Path(PathBuf),
}

#[derive(Debug, Error)]
pub enum SourceRefError {
    #[error("source reference is empty")]
    Empty,

    #[error("invalid source URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

impl FromStr for SourceRef {
    type Err = SourceRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SourceRefError::Empty);
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Url::parse(s)
                .map(SourceRef::Url)
                .map_err(|source| SourceRefError::InvalidUrl {
                    input: s.to_string(),
                    source,
                })
        } else {
            Ok(SourceRef::Path(PathBuf::from(s)))
        }
    }
}

impl SourceRef {
    /// The part of the reference that names the file. For URLs this is the
    /// last path segment, percent-decoded, so query strings and fragments
    /// never leak into turbine ids and a URL names the same turbine as the
    /// equivalent local file.
    pub fn file_label(&self) -> String {
        match self {
            SourceRef::Url(url) => {
                let segment = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .unwrap_or_default();
                percent_decode_str(segment).decode_utf8_lossy().into_owned()
            },
            SourceRef::Path(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Url(url) => write!(f, "{}", url),
            SourceRef::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Io(_) => None,
        }
    }
}

/// Retrieves the raw bytes behind a [`SourceRef`]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceRef) -> Result<Vec<u8>, FetchError>;
}

/// Fetches URLs with `reqwest` and paths from the local filesystem
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("turbine-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(&self, source: &SourceRef) -> Result<Vec<u8>, FetchError> {
        match source {
            SourceRef::Url(url) => {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            },
            SourceRef::Path(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::normalizer::turbine_id_from_label;

    #[test]
    fn test_parse_url_and_path() {
        let url: SourceRef = "https://example.com/s/abc/download/Turbine1.csv?x=1".parse().unwrap();
        assert!(matches!(url, SourceRef::Url(_)));
        assert_eq!(url.file_label(), "Turbine1.csv");

        let path: SourceRef = " data/Turbine2.csv ".parse().unwrap();
        assert_eq!(path, SourceRef::Path(PathBuf::from("data/Turbine2.csv")));
        assert_eq!(path.to_string(), "data/Turbine2.csv");
    }

    #[test]
    fn test_url_label_is_percent_decoded() {
        let url: SourceRef = "https://example.com/download/Windpark M\u{00FC}ller.csv".parse().unwrap();
        let path = SourceRef::Path(PathBuf::from("download/Windpark M\u{00FC}ller.csv"));

        assert_eq!(url.file_label(), "Windpark M\u{00FC}ller.csv");
        assert_eq!(
            turbine_id_from_label(&url.file_label()),
            turbine_id_from_label(&path.file_label())
        );

        let encoded: SourceRef = "https://example.com/download/Turbine%201.csv".parse().unwrap();
        assert_eq!(turbine_id_from_label(&encoded.file_label()).as_deref(), Some("Turbine 1"));
    }

    #[test]
    fn test_url_without_file_name_has_empty_label() {
        let url: SourceRef = "https://example.com/download/".parse().unwrap();
        assert_eq!(url.file_label(), "");
        assert_eq!(turbine_id_from_label(&url.file_label()), None);
    }

    #[test]
    fn test_parse_rejects_empty_and_bad_urls() {
        assert!(matches!("   ".parse::<SourceRef>(), Err(SourceRefError::Empty)));
        assert!(matches!(
            "http://exa mple.com/a.csv".parse::<SourceRef>(),
            Err(SourceRefError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_fetch_error_status() {
        assert_eq!(FetchError::Status { status: 404 }.status(), Some(404));
        let io = FetchError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert_eq!(io.status(), None);
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Turbine1.csv");
        std::fs::write(&path, b"Dat/Zeit\n\n").unwrap();

        let fetcher = DefaultFetcher::new(Duration::from_secs(5)).unwrap();
        let bytes = fetcher.fetch(&SourceRef::Path(path)).await.unwrap();
        assert_eq!(bytes, b"Dat/Zeit\n\n");
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_io_error() {
        let fetcher = DefaultFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&SourceRef::Path(PathBuf::from("/definitely/not/here/Turbine9.csv")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }
}
