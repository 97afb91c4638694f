use anyhow::{Error, anyhow, bail};
use bytes::Bytes;
use log::debug;
use tokio_stream::StreamExt as _;
use url::Url;

/// Fetch the full document behind a URL.
///
/// Supported URL schemes:
/// - `http`, `https`: fetched via `reqwest`, collected from the response
///   byte stream
/// - `file`: read from the local filesystem
///
/// # Errors
///
/// - Returns `Err` if the URL scheme is unsupported
/// - Returns `Err` if the HTTP fetch fails or returns a non-success status
/// - Returns `Err` if the file path is invalid or the file cannot be read
pub async fn fetch_url(url: &Url) -> Result<Bytes, Error> {
    match url.scheme() {
        "http" | "https" => {
            let response = reqwest::get(url.clone())
                .await
                .map_err(|err| anyhow!("failed to fetch {url}: {err}"))?;
            if !response.status().is_success() {
                bail!("failed to fetch {url} (status: {})", response.status());
            }
            let mut stream = response.bytes_stream();
            let mut body = Vec::new();
            while let Some(chunk) = stream.next().await {
                body.extend_from_slice(&chunk?);
            }
            debug!("fetch: {url} -> {} bytes", body.len());
            Ok(Bytes::from(body))
        }
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| anyhow!("invalid file path for file url {url}"))?;
            let data = tokio::fs::read(path).await.map(Bytes::from)?;
            debug!("fetch: {url} -> {} bytes", data.len());
            Ok(data)
        }
        scheme => bail!("unsupported url scheme {scheme}"),
    }
}
