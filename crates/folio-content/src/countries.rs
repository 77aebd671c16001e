//! Country list for the phone-country selector of the rating form.

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::CountryError;

pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com/v3.1/all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryOption {
    pub name: String,
    /// Flag and name, as shown in the selector.
    pub label: String,
    /// ISO 3166-1 alpha-2 code.
    pub value: String,
    pub flag: String,
    /// International dialing prefix such as `+44`.
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct RawCountry {
    name: RawName,
    cca2: String,
    #[serde(default)]
    flag: String,
    #[serde(default)]
    idd: RawIdd,
}

#[derive(Debug, Deserialize)]
struct RawName {
    common: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawIdd {
    #[serde(default)]
    root: String,
    #[serde(default)]
    suffixes: Vec<String>,
}

impl From<RawCountry> for CountryOption {
    fn from(raw: RawCountry) -> Self {
        let suffix = raw.idd.suffixes.into_iter().next().unwrap_or_default();
        Self {
            label: format!("{} {}", raw.flag, raw.name.common).trim().to_string(),
            code: format!("{}{}", raw.idd.root, suffix),
            name: raw.name.common,
            value: raw.cca2,
            flag: raw.flag,
        }
    }
}

/// Fetched once, then served from memory.
pub struct CountryDirectory {
    http: reqwest::Client,
    url: String,
    cache: OnceCell<Vec<CountryOption>>,
}

impl CountryDirectory {
    pub fn new(url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            cache: OnceCell::new(),
        }
    }

    /// Pre-populated directory that never touches the network.
    pub fn from_options(options: Vec<CountryOption>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: String::new(),
            cache: OnceCell::new_with(Some(options)),
        }
    }

    /// All countries sorted by name. A failed fetch is not cached.
    pub async fn countries(&self) -> Result<&[CountryOption], CountryError> {
        let options = self.cache.get_or_try_init(|| self.fetch()).await?;
        Ok(options.as_slice())
    }

    pub async fn find(&self, value: &str) -> Result<Option<&CountryOption>, CountryError> {
        Ok(self.countries().await?.iter().find(|c| c.value == value))
    }

    async fn fetch(&self) -> Result<Vec<CountryOption>, CountryError> {
        debug!(url = %self.url, "fetching country list");
        let raw: Vec<RawCountry> = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let options = to_options(raw);
        info!(count = options.len(), "country list loaded");
        Ok(options)
    }
}

fn to_options(raw: Vec<RawCountry>) -> Vec<CountryOption> {
    let mut options: Vec<CountryOption> = raw.into_iter().map(CountryOption::from).collect();
    options.sort_by(|a, b| a.name.cmp(&b.name));
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "name": { "common": "United Kingdom", "official": "UK" },
            "cca2": "GB",
            "flag": "🇬🇧",
            "idd": { "root": "+4", "suffixes": ["4"] }
        },
        {
            "name": { "common": "Antarctica" },
            "cca2": "AQ",
            "idd": {}
        },
        {
            "name": { "common": "United States" },
            "cca2": "US",
            "flag": "🇺🇸",
            "idd": { "root": "+1", "suffixes": ["201", "202"] }
        }
    ]"#;

    #[test]
    fn test_maps_and_sorts() {
        let raw: Vec<RawCountry> = serde_json::from_str(SAMPLE).unwrap();
        let options = to_options(raw);

        let names: Vec<&str> = options.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Antarctica", "United Kingdom", "United States"]);

        assert_eq!(options[1].code, "+44");
        assert_eq!(options[1].label, "🇬🇧 United Kingdom");
        assert_eq!(options[2].code, "+1201");
        assert_eq!(options[0].code, "");
        assert_eq!(options[0].label, "Antarctica");
    }

    #[tokio::test]
    async fn test_preloaded_directory() {
        let raw: Vec<RawCountry> = serde_json::from_str(SAMPLE).unwrap();
        let directory = CountryDirectory::from_options(to_options(raw));

        assert_eq!(directory.countries().await.unwrap().len(), 3);
        let us = directory.find("US").await.unwrap().unwrap();
        assert_eq!(us.flag, "🇺🇸");
        assert!(directory.find("FR").await.unwrap().is_none());
    }
}
