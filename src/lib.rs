//! iconbg page loader
//!
//! Turns the request URL of an icon background page into the data the
//! renderer needs. Query parameters carrying superjson payloads are decoded
//! into structured values, and an icon archive embedded in
//! `options.configs` (percent-encoded base64 of a zip file) is unpacked into
//! `unzippedIconConfigs`.
//!
//! # Example
//!
//! ```no_run
//! use iconbg::{LoaderConfig, PageLoader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = PageLoader::new(LoaderConfig::default());
//! let page = loader.load_url("https://bg.example/?options=%7B%22json%22%3A%7B%7D%7D")?;
//! println!("{}", serde_json::to_string_pretty(&page)?);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod error;
pub mod page;
pub mod query;
pub mod rendering;
pub mod superjson;

pub use error::{Error, Result};
pub use page::{BackgroundOptions, IconConfig, PageData};
pub use query::{ParamValue, QueryParams};
pub use superjson::StructuredValue;

use url::Url;

/// What to do when `options.configs` is present but cannot be unpacked
/// (bad percent-encoding, bad base64, corrupt or oversized archive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFailurePolicy {
    /// Fail the whole load
    #[default]
    Fail,
    /// Log a warning and treat the archive as holding no icons
    Degrade,
}

/// Configuration for the page loader
///
/// ```
/// let cfg = iconbg::LoaderConfig::default();
/// assert_eq!(cfg.entry_name, "minified_configs.json");
/// ```
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Archive entry holding the icon config list
    pub entry_name: String,
    /// Behaviour for unreadable archives
    pub archive_failure: ArchiveFailurePolicy,
    /// Largest decompressed entry accepted, in bytes
    pub max_entry_bytes: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            entry_name: archive::DEFAULT_ENTRY_NAME.to_string(),
            archive_failure: ArchiveFailurePolicy::Fail,
            max_entry_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Base used for request URLs given as a bare path or query string
const FALLBACK_BASE: &str = "http://localhost/";

/// Parse a request URL, accepting relative forms such as `/?a=1` or `?a=1`.
pub fn parse_request_url(input: &str) -> Result<Url> {
    match Url::parse(input) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(FALLBACK_BASE)?.join(input)?),
        Err(e) => Err(e.into()),
    }
}

/// Loads page data from request URLs.
#[derive(Debug, Clone, Default)]
pub struct PageLoader {
    config: LoaderConfig,
}

impl PageLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load page data from a request URL string.
    pub fn load_url(&self, url: &str) -> Result<PageData> {
        self.load_parsed(&parse_request_url(url)?)
    }

    pub fn load_parsed(&self, url: &Url) -> Result<PageData> {
        self.load_query(url.query_pairs())
    }

    /// Load page data from already split query pairs.
    pub fn load_query<I, K, V>(&self, pairs: I) -> Result<PageData>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let params = query::decode_pairs(pairs)?;
        let mut page = PageData::from_params(params);
        archive::attach_icon_configs(&mut page, &self.config)?;
        Ok(page)
    }

    /// Async variant of [`PageLoader::load_url`]. Archive inflation runs on
    /// tokio's blocking pool and is awaited before the page is returned.
    #[cfg(feature = "async")]
    pub async fn load_url_async(&self, url: &str) -> Result<PageData> {
        let url = parse_request_url(url)?;
        let params = query::decode_query(&url)?;
        let mut page = PageData::from_params(params);

        if let Some(encoded) = page.take_configs() {
            let config = self.config.clone();
            let extracted = tokio::task::spawn_blocking(move || {
                archive::extract_icon_configs(&encoded, &config)
            })
            .await
            .map_err(|e| Error::Task(e.to_string()))?;
            page.unzipped_icon_configs = Some(archive::settle(extracted, &self.config)?);
        }

        Ok(page)
    }
}

/// Load a URL with the default configuration.
pub fn load_url(url: &str) -> Result<PageData> {
    PageLoader::default().load_url(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.entry_name, "minified_configs.json");
        assert_eq!(config.archive_failure, ArchiveFailurePolicy::Fail);
        assert!(config.max_entry_bytes > 0);
    }

    #[test]
    fn relative_request_urls_are_accepted() {
        let url = parse_request_url("/?a=1").unwrap();
        assert_eq!(url.query(), Some("a=1"));
        let url = parse_request_url("?b=2").unwrap();
        assert_eq!(url.query(), Some("b=2"));
    }

    #[test]
    fn page_without_options_has_no_icon_configs() {
        let page = load_url("https://bg.example/?title=hello").unwrap();
        assert!(page.options.is_none());
        assert!(page.unzipped_icon_configs.is_none());
        assert_eq!(page.get("title").and_then(ParamValue::as_raw), Some("hello"));
    }
}
