//! Spectral index registry
//!
//! An index is anything that turns a composite [`Image`] into a
//! single-band index image. Closures qualify, so adding an index is one
//! `register` call:
//!
//! ```
//! use geefetch_core::graph::Image;
//! use geefetch_core::imagery::IndexRegistry;
//!
//! let mut registry = IndexRegistry::new();
//! registry.register("GNDVI", |img: &Image| {
//!     img.normalized_difference("B8", "B3").rename(&["GNDVI"])
//! });
//! assert!(registry.contains("GNDVI"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::graph::Image;

/// A named band-math transform.
pub trait SpectralIndex: Send + Sync {
    /// Build the index image from a composite.
    fn apply(&self, image: &Image) -> Image;
}

impl<F> SpectralIndex for F
where
    F: Fn(&Image) -> Image + Send + Sync,
{
    fn apply(&self, image: &Image) -> Image {
        self(image)
    }
}

/// Lookup table from index name to transform.
#[derive(Default)]
pub struct IndexRegistry {
    entries: BTreeMap<String, Box<dyn SpectralIndex>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an index.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        index: impl SpectralIndex + 'static,
    ) -> &mut Self {
        self.entries.insert(name.into(), Box::new(index));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, index: impl SpectralIndex + 'static) -> Self {
        self.register(name, index);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn SpectralIndex> {
        self.entries.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the index called `name` to `image`.
    pub fn apply(&self, name: &str, image: &Image) -> Result<Image> {
        self.get(name)
            .map(|index| index.apply(image))
            .ok_or_else(|| self.unknown(name))
    }

    /// Check that every name is registered.
    pub fn validate<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        match names.into_iter().find(|n| !self.contains(n)) {
            Some(name) => Err(self.unknown(name)),
            None => Ok(()),
        }
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownIndex {
            name: name.to_string(),
            available: self.names().collect::<Vec<_>>().join(", "),
        }
    }
}

impl fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> IndexRegistry {
        IndexRegistry::new()
            .with("NDVI", |img: &Image| {
                img.normalized_difference("B8", "B4").rename(&["NDVI"])
            })
            .with("NBR", |img: &Image| {
                img.normalized_difference("B8", "B12").rename(&["NBR"])
            })
    }

    #[test]
    fn apply_known_index() {
        let out = registry().apply("NDVI", &Image::load("X")).unwrap();
        assert_eq!(out.value().function_name(), Some("Image.rename"));
    }

    #[test]
    fn unknown_index_lists_available_names() {
        let err = registry().apply("EVI", &Image::load("X")).unwrap_err();
        match err {
            Error::UnknownIndex { name, available } => {
                assert_eq!(name, "EVI");
                assert_eq!(available, "NBR, NDVI");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_stops_at_first_unknown() {
        let r = registry();
        assert!(r.validate(["NDVI", "NBR"]).is_ok());
        assert!(matches!(
            r.validate(["NDVI", "ndvi"]),
            Err(Error::UnknownIndex { name, .. }) if name == "ndvi"
        ));
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut r = registry();
        r.register("NDVI", |img: &Image| img.to_float());
        assert_eq!(r.len(), 2);
        let out = r.apply("NDVI", &Image::load("X")).unwrap();
        assert_eq!(out.value().function_name(), Some("Image.toFloat"));
    }
}
