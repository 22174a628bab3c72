//! City → page URL resolution for the weather site.

use crate::error::{Result, WxError};
use std::collections::HashMap;
use url::Url;

/// Cities the weather site is known to serve, with their country path segment.
pub const DEFAULT_CITY_SLUGS: &[(&str, &str)] = &[
    ("London", "uk"),
    ("Paris", "france"),
    ("New York", "usa"),
    ("Tokyo", "japan"),
    ("Sydney", "australia"),
    ("Berlin", "germany"),
    ("Rome", "italy"),
    ("Madrid", "spain"),
    ("Moscow", "russia"),
    ("Dubai", "uae"),
    ("Singapore", "singapore"),
    ("Hong Kong", "hong-kong"),
    ("Toronto", "canada"),
    ("Seoul", "south-korea"),
    ("Istanbul", "turkey"),
    ("Bangkok", "thailand"),
    ("Amsterdam", "netherlands"),
    ("Vienna", "austria"),
    ("Stockholm", "sweden"),
    ("Cairo", "egypt"),
];

/// Lowercase, trimmed join key used everywhere cities are compared.
pub fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Maps city names to weather page URLs.
#[derive(Debug, Clone)]
pub struct CityResolver {
    base: Url,
    /// city_key → country segment.
    slugs: HashMap<String, String>,
}

impl CityResolver {
    /// Build a resolver over `base` (e.g. `https://www.timeanddate.com/weather/`).
    pub fn new<'a, I>(base: &str, slugs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut base =
            Url::parse(base).map_err(|e| WxError::Config(format!("invalid web base URL {base:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let slugs = slugs
            .into_iter()
            .map(|(city, country)| (city_key(city), country.trim().to_string()))
            .collect();

        Ok(Self { base, slugs })
    }

    /// Resolver over the built-in table.
    pub fn with_defaults(base: &str) -> Result<Self> {
        Self::new(base, DEFAULT_CITY_SLUGS.iter().copied())
    }

    pub fn supports(&self, city: &str) -> bool {
        self.slugs.contains_key(&city_key(city))
    }

    /// `<base>/<country>/<city-lowercase-hyphenated>`, or `UnsupportedCity`.
    pub fn resolve(&self, city: &str) -> Result<String> {
        let country = self
            .slugs
            .get(&city_key(city))
            .ok_or_else(|| WxError::UnsupportedCity(city.to_string()))?;

        let city_segment = city_key(city).split_whitespace().collect::<Vec<_>>().join("-");
        let url = self
            .base
            .join(&format!("{country}/{city_segment}"))
            .map_err(|e| WxError::Config(format!("cannot build URL for {city}: {e}")))?;
        Ok(url.to_string())
    }
}
