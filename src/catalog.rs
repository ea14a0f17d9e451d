use std::collections::BTreeMap;
use std::fmt;

pub static DEFAULT_BASE_URL: &str = "http://kachelmannwetter.com/images/data/cache/";

/// Numeric id the image cache uses for a region in its tile filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where tiles are fetched from and which regions the cache knows about.
///
/// Built once at startup and passed down, so tests can point at a different endpoint or region
/// set.
#[derive(Debug, Clone)]
pub struct Catalog {
    base_url: String,
    regions: BTreeMap<String, RegionId>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(
            DEFAULT_BASE_URL,
            [("germany", RegionId(2)), ("bavaria", RegionId(38))],
        )
    }
}

impl Catalog {
    pub fn new<'a>(
        base_url: &str,
        regions: impl IntoIterator<Item = (&'a str, RegionId)>,
    ) -> Self {
        Catalog {
            base_url: base_url.to_string(),
            regions: regions
                .into_iter()
                .map(|(name, id)| (name.to_string(), id))
                .collect(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn region_id(&self, name: &str) -> Option<RegionId> {
        self.regions.get(name).copied()
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn tile_url(&self, remote_filename: &str) -> String {
        format!("{}{}", self.base_url, remote_filename)
    }
}
