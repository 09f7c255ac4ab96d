use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::future::Future;

#[cfg(feature = "cli")]
use reqwest::{Client, StatusCode};
#[cfg(feature = "cli")]
use tracing::debug;

pub const APOD_ENDPOINT: &str = "https://api.nasa.gov/planetary/apod";
pub const DEMO_KEY: &str = "DEMO_KEY";

/// Date of the first Astronomy Picture of the Day.
pub const FIRST_APOD_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1995, 6, 16) {
    Some(date) => date,
    None => panic!("invalid first APOD date"),
};

/// Metadata for one APOD entry, as returned by the remote API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApodInfo {
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    pub media_type: String,
    pub url: Option<String>,
    #[serde(rename = "hdurl")]
    pub hd_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other(String),
}

impl ApodInfo {
    pub fn media_kind(&self) -> MediaKind {
        match self.media_type.as_str() {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            other => MediaKind::Other(other.to_string()),
        }
    }
}

/// URL of the binary worth caching for an entry: the HD image for images,
/// the thumbnail for videos, nothing for anything else.
pub fn image_url(info: &ApodInfo) -> Option<&str> {
    match info.media_kind() {
        MediaKind::Image => info.hd_url.as_deref().or(info.url.as_deref()),
        MediaKind::Video => info.thumbnail_url.as_deref(),
        MediaKind::Other(_) => None,
    }
}

/// Parses a `YYYY-MM-DD` string into a date that has an APOD, i.e. one between
/// the first APOD and `today` inclusive.
pub fn parse_apod_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidDate(format!("{}. Use YYYY-MM-DD", input.trim()))
    })?;

    if date < FIRST_APOD_DATE || date > today {
        return Err(Error::InvalidDate(format!(
            "{} is outside {} to {}",
            date, FIRST_APOD_DATE, today
        )));
    }

    Ok(date)
}

/// Parses a metadata response body. A body that is not a usable APOD entry
/// counts as a failed fetch for `date`.
pub fn decode_info(date: NaiveDate, body: &str) -> Result<ApodInfo> {
    serde_json::from_str(body).map_err(|e| Error::FetchFailed {
        date: date.to_string(),
        status: format!("invalid response: {}", e),
    })
}

/// Where the cache manager gets APOD metadata and image bytes from.
pub trait ApodSource {
    fn fetch_info(&self, date: NaiveDate) -> impl Future<Output = Result<ApodInfo>>;
    fn download(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

#[cfg(feature = "cli")]
pub struct ApodClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[cfg(feature = "cli")]
impl ApodClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &crate::ApodConfig) -> Self {
        Self::new(config.endpoint.clone(), config.effective_api_key())
    }

    fn info_url(&self, date: NaiveDate) -> String {
        format!(
            "{}?api_key={}&date={}&thumbs=true",
            self.endpoint,
            self.api_key,
            date.format("%Y-%m-%d")
        )
    }
}

#[cfg(feature = "cli")]
impl ApodSource for ApodClient {
    async fn fetch_info(&self, date: NaiveDate) -> Result<ApodInfo> {
        debug!(%date, endpoint = %self.endpoint, "requesting APOD metadata");

        let response = self
            .client
            .get(self.info_url(date))
            .send()
            .await
            .map_err(|e| Error::FetchFailed {
                date: date.to_string(),
                status: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let status = if status == StatusCode::FORBIDDEN {
                "API rate limit exceeded or invalid API key".to_string()
            } else {
                format!("HTTP {}", status)
            };
            return Err(Error::FetchFailed {
                date: date.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|e| Error::FetchFailed {
            date: date.to_string(),
            status: e.to_string(),
        })?;
        decode_info(date, &body)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading APOD image");

        let failed = |e: reqwest::Error| Error::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;
        let bytes = response.bytes().await.map_err(failed)?;

        Ok(bytes.to_vec())
    }
}
