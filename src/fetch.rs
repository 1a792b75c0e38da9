use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

use crate::error::FetchError;

/// Downloads remote media into the per-install drag cache.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl RemoteFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_client(reqwest::Client::new(), cache_dir)
    }

    pub fn with_client(client: reqwest::Client, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Fetch `url` to `<cache_dir>/<last path segment>` and return that path.
    ///
    /// The body lands in a `.part` sibling first and replaces any existing file
    /// with the same name only once it is complete. No timeout is set.
    pub async fn fetch(&self, url: &Url) -> Result<PathBuf, FetchError> {
        let file_name = cache_file_name(url)?;
        let target = self.cache_dir.join(&file_name);

        log::info!("Fetching {} into {}", url, target.display());

        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|source| FetchError::Write {
                path: self.cache_dir.clone(),
                source,
            })?;

        let partial = self
            .cache_dir
            .join(format!("{file_name}.{}.part", Uuid::new_v4()));
        let written = match stream_to(response, &partial).await {
            Ok(written) => written,
            Err(err) => {
                discard(&partial).await;
                return Err(err);
            }
        };

        if let Err(source) = tokio::fs::rename(&partial, &target).await {
            discard(&partial).await;
            return Err(FetchError::Write {
                path: target,
                source,
            });
        }

        log::info!("Fetched {} bytes from {}", written, url);
        Ok(target)
    }
}

async fn stream_to(mut response: reqwest::Response, path: &Path) -> Result<usize, FetchError> {
    let write_err = |source| FetchError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::create(path).await.map_err(write_err)?;

    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len();
    }
    file.sync_all().await.map_err(write_err)?;
    Ok(written)
}

async fn discard(partial: &Path) {
    if let Err(err) = tokio::fs::remove_file(partial).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove partial download {}: {}", partial.display(), err);
        }
    }
}

/// Cache file name for `url`: its last path segment, percent-decoded.
pub fn cache_file_name(url: &Url) -> Result<String, FetchError> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let decoded = urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    if decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains(['/', '\\', '\0'])
    {
        return Err(FetchError::NoFileName(url.to_string()));
    }

    Ok(decoded)
}

/// Remote sources are plain `http`/`https` URLs.
pub fn parse_remote(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(
            cache_file_name(&url("https://cdn.example.com/data/sample/abc.jpg?download=1")).unwrap(),
            "abc.jpg"
        );
    }

    #[test]
    fn file_name_is_percent_decoded() {
        assert_eq!(
            cache_file_name(&url("https://cdn.example.com/a/b%20c.png")).unwrap(),
            "b c.png"
        );
    }

    #[test]
    fn unusable_file_names_are_rejected() {
        for raw in [
            "https://cdn.example.com/",
            "https://cdn.example.com/dir/",
            "https://cdn.example.com/a/..%2Fetc%2Fpasswd",
            "https://cdn.example.com/a/%2E%2E",
        ] {
            assert!(
                matches!(cache_file_name(&url(raw)), Err(FetchError::NoFileName(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn only_http_urls_are_remote() {
        assert!(parse_remote("https://example.com/a.jpg").is_some());
        assert!(parse_remote("http://example.com/a.jpg").is_some());
        assert!(parse_remote("/cache/a.jpg").is_none());
        assert!(parse_remote("file:///cache/a.jpg").is_none());
        assert!(parse_remote("C:\\cache\\a.jpg").is_none());
    }
}
