use std::io::{Read, Write};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};

use crate::dispatch::Downloader;
use crate::error::ClipsortError;
use crate::store;

const DRIVE_DOWNLOAD_BASE: &str = "https://drive.google.com/uc";
const DRIVE_CONFIRM_BASE: &str = "https://drive.usercontent.google.com/download";

static FILE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/d/([^/?#]+)").expect("valid file id regex"));
static CONFIRM_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="confirm"\s+value="([^"]+)""#).expect("valid confirm regex")
});
static CONFIRM_QUERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"confirm=([0-9A-Za-z_-]+)").expect("valid confirm query regex")
});
static UUID_INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="uuid"\s+value="([^"]+)""#).expect("valid uuid regex"));

/// Longest response body kept in a `DriveStatus` error.
const STATUS_MESSAGE_LIMIT: usize = 200;

/// Base URLs for the direct and the confirmed download requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveEndpoints {
    pub download_base: String,
    pub confirm_base: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            download_base: DRIVE_DOWNLOAD_BASE.to_string(),
            confirm_base: DRIVE_CONFIRM_BASE.to_string(),
        }
    }
}

impl DriveEndpoints {
    pub fn direct_download_url(&self, file_id: &str) -> String {
        format!("{}?export=download&id={file_id}", self.download_base)
    }

    pub fn confirmed_download_url(&self, file_id: &str, token: &ConfirmToken) -> String {
        let mut url = format!(
            "{}?id={file_id}&export=download&confirm={}",
            self.confirm_base, token.confirm
        );
        if let Some(uuid) = &token.uuid {
            url.push_str("&uuid=");
            url.push_str(uuid);
        }
        url
    }

    /// `.../file/d/<id>/view` becomes the direct download URL.
    /// Links without a `/d/<id>` segment are requested as given.
    pub fn target(&self, share_url: &str) -> DriveTarget {
        match extract_file_id(share_url) {
            Some(file_id) => DriveTarget {
                url: self.direct_download_url(&file_id),
                file_id: Some(file_id),
            },
            None => DriveTarget {
                file_id: None,
                url: share_url.to_string(),
            },
        }
    }
}

/// Resolved download target for a shared Drive link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveTarget {
    pub file_id: Option<String>,
    pub url: String,
}

impl DriveTarget {
    pub fn from_share_url(url: &str) -> Self {
        DriveEndpoints::default().target(url)
    }
}

pub fn extract_file_id(url: &str) -> Option<String> {
    FILE_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn direct_download_url(file_id: &str) -> String {
    DriveEndpoints::default().direct_download_url(file_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmToken {
    pub confirm: String,
    pub uuid: Option<String>,
}

/// Large files get a "can't scan for viruses" page; pull the token that unlocks the real file.
pub fn find_confirm_token(html: &str) -> Option<ConfirmToken> {
    let confirm = CONFIRM_INPUT_RE
        .captures(html)
        .or_else(|| CONFIRM_QUERY_RE.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())?;
    let uuid = UUID_INPUT_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    Some(ConfirmToken { confirm, uuid })
}

pub fn confirmed_download_url(file_id: &str, token: &ConfirmToken) -> String {
    DriveEndpoints::default().confirmed_download_url(file_id, token)
}

#[derive(Clone)]
pub struct DriveHttpClient {
    client: Client,
    endpoints: DriveEndpoints,
}

impl DriveHttpClient {
    pub fn new() -> Result<Self, ClipsortError> {
        Self::with_endpoints(DriveEndpoints::default())
    }

    pub fn with_endpoints(endpoints: DriveEndpoints) -> Result<Self, ClipsortError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("clipsort/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ClipsortError::DriveHttp(err.to_string()))?,
        );
        // The blocking client applies `timeout` to each wait (headers, every body read),
        // so long transfers are only cut off when the stream stalls.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|err| ClipsortError::DriveHttp(err.to_string()))?;
        Ok(Self { client, endpoints })
    }

    fn handle_status(response: Response) -> Result<Response, ClipsortError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("request failed");
        // Error pages are HTML documents; only plain-text bodies are worth quoting.
        let message = if is_html(&response) {
            reason.to_string()
        } else {
            match response.text() {
                Ok(body) if !body.trim().is_empty() => status_excerpt(&body),
                _ => reason.to_string(),
            }
        };
        Err(ClipsortError::DriveStatus {
            status: status.as_u16(),
            message,
        })
    }

    fn send_with_retries(&self, url: &str) -> Result<Response, ClipsortError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 500;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Self::handle_status(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(ClipsortError::DriveHttp(err.to_string()));
                }
            }
        }
    }

    fn write_response(mut response: Response, destination: &Utf8Path) -> Result<(), ClipsortError> {
        let mut temp = store::temp_file_beside(destination, ".clipsort-drive")?;
        std::io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| ClipsortError::DriveHttp(err.to_string()))?;
        temp.flush()
            .map_err(|err| ClipsortError::Filesystem(err.to_string()))?;
        store::persist_temp(temp, destination)
    }
}

impl Downloader for DriveHttpClient {
    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), ClipsortError> {
        let target = self.endpoints.target(url);
        let mut response = self.send_with_retries(&target.url)?;
        if !is_html(&response) {
            return Self::write_response(response, destination);
        }

        let mut page = String::new();
        response
            .read_to_string(&mut page)
            .map_err(|err| ClipsortError::DriveHttp(err.to_string()))?;
        let (Some(file_id), Some(token)) = (target.file_id.as_deref(), find_confirm_token(&page))
        else {
            return Err(ClipsortError::DriveInterstitial(target.url));
        };

        let confirmed = self.endpoints.confirmed_download_url(file_id, &token);
        tracing::debug!(file_id, "following Drive download confirmation");
        let response = self.send_with_retries(&confirmed)?;
        if is_html(&response) {
            return Err(ClipsortError::DriveInterstitial(confirmed));
        }
        Self::write_response(response, destination)
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/html"))
        .unwrap_or(false)
}

fn status_excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(STATUS_MESSAGE_LIMIT) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_url_is_kept_without_file_segment() {
        let target = DriveTarget::from_share_url("https://drive.google.com/open?id=XYZ");
        assert_eq!(target.file_id, None);
        assert_eq!(target.url, "https://drive.google.com/open?id=XYZ");
    }

    #[test]
    fn confirm_token_from_form() {
        let html = r#"<form action="https://drive.usercontent.google.com/download">
            <input type="hidden" name="confirm" value="t">
            <input type="hidden" name="uuid" value="1234-abcd"></form>"#;
        let token = find_confirm_token(html).unwrap();
        assert_eq!(token.confirm, "t");
        assert_eq!(token.uuid.as_deref(), Some("1234-abcd"));
        assert_eq!(
            confirmed_download_url("ABC", &token),
            "https://drive.usercontent.google.com/download?id=ABC&export=download&confirm=t&uuid=1234-abcd"
        );
    }

    #[test]
    fn confirm_token_from_link() {
        let html = r#"<a href="/uc?export=download&amp;confirm=Xy_9&amp;id=ABC">Download anyway</a>"#;
        let token = find_confirm_token(html).unwrap();
        assert_eq!(token.confirm, "Xy_9");
        assert_eq!(token.uuid, None);
    }

    #[test]
    fn long_status_bodies_are_cut() {
        let body = "x".repeat(5000);
        let excerpt = status_excerpt(&body);
        assert_eq!(excerpt.len(), STATUS_MESSAGE_LIMIT + 3);
        assert!(excerpt.ends_with("..."));
        assert_eq!(status_excerpt("  quota exceeded \n"), "quota exceeded");
    }

    #[test]
    fn endpoints_can_point_elsewhere() {
        let endpoints = DriveEndpoints {
            download_base: "http://127.0.0.1:9/uc".to_string(),
            confirm_base: "http://127.0.0.1:9/download".to_string(),
        };
        let target = endpoints.target("https://drive.google.com/file/d/F1/view");
        assert_eq!(target.url, "http://127.0.0.1:9/uc?export=download&id=F1");
    }

    #[test]
    fn plain_page_has_no_token() {
        assert!(find_confirm_token("<html><body>Sign in</body></html>").is_none());
    }
}
