// src/scanner.rs
//! QR / scan payload resolution to a canonical asset identifier

use std::fmt;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

lazy_static! {
    static ref DIGITS_ONLY: Regex = Regex::new(r"^\d+$").unwrap();
    static ref ASSET_PREFIX: Regex = Regex::new(r"(?i)ASSET:(\d+)").unwrap();
    static ref ASSET_PATH: Regex = Regex::new(r"(?i)assets/(\d+)").unwrap();
    static ref ABSOLUTE_URL: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub i64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ResolvedAssetRef = ClientResult<AssetId>;

// ==================== MATCHERS ====================

type Matcher = fn(&str) -> Option<AssetId>;

/// Tried in order; the first matcher yielding an id wins.
const MATCHERS: &[(&str, Matcher)] = &[
    ("digits", match_digits),
    ("asset-prefix", match_asset_prefix),
    ("asset-path", match_asset_path),
];

fn parse_id(digits: &str) -> Option<AssetId> {
    digits.parse::<i64>().ok().filter(|id| *id > 0).map(AssetId)
}

fn match_digits(text: &str) -> Option<AssetId> {
    if DIGITS_ONLY.is_match(text) {
        parse_id(text)
    } else {
        None
    }
}

fn match_asset_prefix(text: &str) -> Option<AssetId> {
    ASSET_PREFIX
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_id(m.as_str()))
}

// last occurrence: URLs put the id in the final segment
fn match_asset_path(text: &str) -> Option<AssetId> {
    ASSET_PATH
        .captures_iter(text)
        .last()
        .and_then(|c| c.get(1))
        .and_then(|m| parse_id(m.as_str()))
}

/// Resolves raw scan text. Stateless and deterministic.
pub fn resolve(text: &str) -> ResolvedAssetRef {
    let text = text.trim();
    MATCHERS
        .iter()
        .find_map(|(name, matcher)| {
            matcher(text).map(|id| {
                debug!(matcher = *name, %id, "scan payload resolved");
                id
            })
        })
        .ok_or_else(ClientError::unrecognized_scan)
}

// ==================== SCAN SESSION ====================

/// Suppresses repeated lookups when the scanner reports the same code again.
#[derive(Debug, Default, Clone)]
pub struct ScanSession {
    last_text: Option<String>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the text is empty or identical to the previous scan;
    /// otherwise the resolution of the new text.
    pub fn observe(&mut self, text: &str) -> Option<ResolvedAssetRef> {
        if text.is_empty() || self.last_text.as_deref() == Some(text) {
            return None;
        }
        self.last_text = Some(text.to_string());
        Some(resolve(text))
    }

    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    pub fn clear(&mut self) {
        self.last_text = None;
    }
}

// ==================== QR IMAGE URLS ====================

/// Public URL for a stored QR image path.
pub fn qr_image_url(api_origin: &str, raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }
    if ABSOLUTE_URL.is_match(value) {
        return value.to_string();
    }
    let file = value.rsplit('/').next().filter(|f| !f.is_empty()).unwrap_or(value);
    format!("{}/api/uploads/{}", api_origin.trim_end_matches('/'), file)
}

/// Secondary location to try once when the uploads URL fails to load.
pub fn qr_fallback_url(api_origin: &str, failed_url: &str) -> String {
    let last = failed_url.rsplit('/').next().unwrap_or("");
    let file = last.split('?').next().unwrap_or("");
    format!("{}/api/qr/{}", api_origin.trim_end_matches('/'), file)
}

// ==================== SCAN SOURCES ====================

/// Camera/scanner collaborator yielding decoded text.
#[async_trait]
pub trait ScanSource: Send {
    async fn next_text(&mut self) -> ClientResult<String>;
}

/// Decode-from-still-image collaborator.
pub trait ImageDecoder {
    fn decode(&self, image: &[u8]) -> ClientResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_digits() {
        assert_eq!(resolve("12345"), Ok(AssetId(12345)));
        assert_eq!(resolve(" 42\n"), Ok(AssetId(42)));
    }

    #[test]
    fn test_asset_prefix() {
        assert_eq!(resolve("ASSET:77"), Ok(AssetId(77)));
        assert_eq!(resolve("smartasset asset:5 v1"), Ok(AssetId(5)));
    }

    #[test]
    fn test_asset_path_last_occurrence() {
        assert_eq!(resolve("https://x/assets/9"), Ok(AssetId(9)));
        assert_eq!(resolve("https://x/assets/9/assets/14"), Ok(AssetId(14)));
        assert_eq!(resolve("http://host/api/Assets/3?src=qr"), Ok(AssetId(3)));
    }

    #[test]
    fn test_priority_prefix_before_path() {
        assert_eq!(resolve("ASSET:1 https://x/assets/2"), Ok(AssetId(1)));
    }

    #[test]
    fn test_unrecognized() {
        assert!(matches!(resolve("hello"), Err(ClientError::Resolution(_))));
        assert!(resolve("").is_err());
        assert!(resolve("assets/").is_err());
        assert!(resolve("ASSET:abc").is_err());
    }

    #[test]
    fn test_unparseable_and_zero_ids_fail() {
        assert!(resolve("99999999999999999999999").is_err());
        assert!(resolve("0").is_err());
        assert!(resolve("ASSET:0").is_err());
    }

    #[test]
    fn test_deterministic() {
        for text in ["12", "ASSET:3", "x/assets/4", "nope"] {
            assert_eq!(resolve(text), resolve(text));
        }
    }

    #[test]
    fn test_scan_session_suppresses_duplicates() {
        let mut session = ScanSession::new();
        assert_eq!(session.observe("ASSET:7"), Some(Ok(AssetId(7))));
        assert_eq!(session.observe("ASSET:7"), None);
        assert_eq!(session.observe(""), None);

        assert_eq!(session.observe("ASSET:8"), Some(Ok(AssetId(8))));
        assert_eq!(session.observe("ASSET:7"), Some(Ok(AssetId(7))));
    }

    #[test]
    fn test_scan_session_repeated_bad_scan_reported_once() {
        let mut session = ScanSession::new();
        assert!(matches!(session.observe("junk"), Some(Err(_))));
        assert_eq!(session.observe("junk"), None);

        session.clear();
        assert!(matches!(session.observe("junk"), Some(Err(_))));
    }

    #[test]
    fn test_qr_image_url() {
        let origin = "http://localhost:5000/";
        assert_eq!(qr_image_url(origin, ""), "");
        assert_eq!(
            qr_image_url(origin, "https://cdn.example.com/qr/1.png"),
            "https://cdn.example.com/qr/1.png"
        );
        assert_eq!(
            qr_image_url(origin, "static/qr_codes/asset_1.png"),
            "http://localhost:5000/api/uploads/asset_1.png"
        );
        assert_eq!(
            qr_fallback_url(origin, "http://localhost:5000/api/uploads/asset_1.png?v=2"),
            "http://localhost:5000/api/qr/asset_1.png"
        );
    }
}
