//! URL parsing for storage backends.

use object_store::path::Path;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{LocalConfig, S3Config};

static S3_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$",
        r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$",
        r"^[sS]3[aA]?::(?P<protocol>https?)://(?P<endpoint>[^:/]+):(?P<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$",
        r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("S3 URL pattern is valid"))
    .collect()
});

static LOCAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^file://(?P<path>.*)$", r"^file:(?P<path>.*)$", r"^/(?P<path>.*)$"]
        .into_iter()
        .map(|p| Regex::new(p).expect("local path pattern is valid"))
        .collect()
});

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a storage URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        if let Some(caps) = S3_PATTERNS.iter().find_map(|r| r.captures(url)) {
            return Ok(Self::parse_s3(&caps));
        }
        if let Some(caps) = LOCAL_PATTERNS.iter().find_map(|r| r.captures(url)) {
            return Ok(Self::parse_local(&caps));
        }
        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_s3(caps: &regex::Captures) -> Self {
        let bucket = caps["bucket"].to_string();

        let region = std::env::var("AWS_DEFAULT_REGION")
            .ok()
            .or_else(|| caps.name("region").map(|m| m.as_str().to_string()));

        let endpoint = std::env::var("AWS_ENDPOINT").ok().or_else(|| {
            caps.name("endpoint").map(|endpoint| {
                let port = caps
                    .name("port")
                    .and_then(|p| p.as_str().parse::<u16>().ok())
                    .unwrap_or(443);
                let protocol = caps.name("protocol").map_or("https", |p| p.as_str());
                format!("{protocol}://{}:{port}", endpoint.as_str())
            })
        });

        BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket,
            key: key_of(caps),
        })
    }

    fn parse_local(caps: &regex::Captures) -> Self {
        let path = caps.name("path").map_or("", |m| m.as_str());
        let path = format!("/{}", path.trim_start_matches('/'));
        BackendConfig::Local(LocalConfig { path })
    }

    /// The key prefix inside the bucket, if any.
    pub fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(config) => config.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}

fn key_of(caps: &regex::Captures) -> Option<Path> {
    caps.name("key")
        .map(|m| m.as_str().trim_end_matches('/'))
        .filter(|k| !k.is_empty())
        .map(Path::from)
}
