//! Listing entry types and URL resolution

use serde::{Deserialize, Deserializer};
use url::{ParseError, Url};

/// One item description returned by the remote listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingEntry {
    /// Stable remote identifier, the sole dedup key
    #[serde(deserialize_with = "deserialize_remote_id")]
    pub id: i64,

    /// Absolute URL or root-relative path of the asset
    #[serde(rename = "thumbnail", default, deserialize_with = "deserialize_non_empty")]
    pub thumbnail_path: Option<String>,

    #[serde(default = "default_title", deserialize_with = "deserialize_title")]
    pub title: String,

    /// Original file name, used only to infer the extension
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub filename: String,

    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub view_count: i64,

    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub download_count: i64,

    #[serde(default = "default_classification", deserialize_with = "deserialize_classification")]
    pub duration: String,

    #[serde(default = "default_classification", deserialize_with = "deserialize_classification")]
    pub image_type: String,

    /// Source-reported timestamp (advisory)
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub mtime: i64,
}

/// A decoded listing page
///
/// Entries that could not be decoded are counted in `malformed` so they still
/// contribute to the number of images found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
    pub malformed: usize,
}

impl Listing {
    /// Total number of items the remote listed, decodable or not
    pub fn len(&self) -> usize {
        self.entries.len() + self.malformed
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
pub(crate) struct ListingResponse {
    #[serde(default)]
    pub images: Vec<serde_json::Value>,
}

impl ListingResponse {
    pub(crate) fn into_listing(self) -> Listing {
        let mut listing = Listing::default();
        for value in self.images {
            match serde_json::from_value::<ListingEntry>(value) {
                Ok(entry) => listing.entries.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping malformed listing entry: {}", e);
                    listing.malformed += 1;
                }
            }
        }
        listing
    }
}

/// Resolves an asset path against the remote base URL
///
/// Paths that already carry a scheme are returned unchanged; anything else is
/// joined onto `base`.
pub fn resolve_asset_url(base: &Url, path: &str) -> Result<Url, ParseError> {
    match Url::parse(path) {
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => base.join(path),
        Err(e) => Err(e),
    }
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_classification() -> String {
    "static".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteId {
    Number(i64),
    Text(String),
}

fn deserialize_remote_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RemoteId::deserialize(deserializer)? {
        RemoteId::Number(n) => Ok(n),
        RemoteId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid remote id '{}'", s))),
    }
}

fn deserialize_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

fn deserialize_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_title))
}

fn deserialize_classification<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_classification))
}
