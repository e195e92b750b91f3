//! Page and facility catalog.
//!
//! Dashboard sub-pages and facility pages are pure data, looked up by slug.
//! Files in the content directory (`pages.json`, `facilities.json`) replace
//! the built-in copies compiled into the binary.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::section::{Section, SectionView};

const BUILTIN_PAGES: &str = include_str!("../../assets/content/pages.json");
const BUILTIN_FACILITIES: &str = include_str!("../../assets/content/facilities.json");

pub const PAGES_FILE: &str = "pages.json";
pub const FACILITIES_FILE: &str = "facilities.json";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error reading {0}: {1}")]
    IoError(String, String),
    #[error("Parse error in {0}: {1}")]
    ParseError(String, String),
    #[error("Validation error for '{0}': {1}")]
    ValidationError(String, String),
}

/// A dashboard sub-page such as `parking` or `gym`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Page {
    pub fn intro(&self) -> String {
        self.intro
            .clone()
            .unwrap_or_else(|| format!("This is the {} page. Add details here.", self.title))
    }

    pub fn section_views(&self) -> Vec<SectionView> {
        self.sections.iter().map(Section::view).collect()
    }
}

/// Prefilled values for a facility's report form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDefaults {
    pub filter_water: u8,
    pub hot_water: u8,
    pub regular_water: u8,
    pub flushing: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub intro: Option<String>,
    /// Present when the facility takes condition reports
    #[serde(default)]
    pub report: Option<ReportDefaults>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Facility {
    pub fn section_views(&self) -> Vec<SectionView> {
        self.sections.iter().map(Section::view).collect()
    }
}

#[derive(Deserialize)]
struct PagesFile {
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct FacilitiesFile {
    facilities: Vec<Facility>,
}

/// Immutable slug → dataset lookup shared by all requests.
#[derive(Debug, Clone)]
pub struct PageCatalog {
    pages: Vec<Page>,
    facilities: Vec<Facility>,
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

fn check_slugs<'a>(kind: &str, slugs: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for slug in slugs {
        if !valid_slug(slug) {
            return Err(CatalogError::ValidationError(
                slug.to_string(),
                format!("{} slug must be lowercase letters, digits, '-' or '_'", kind),
            ));
        }
        if !seen.insert(slug) {
            return Err(CatalogError::ValidationError(
                slug.to_string(),
                format!("duplicate {} slug", kind),
            ));
        }
    }
    Ok(())
}

fn warn_missing_cells(owner: &str, sections: &[Section]) {
    for section in sections {
        for (row, key) in section.missing_cells() {
            tracing::warn!("{}: table row {} has no '{}' value", owner, row, key);
        }
    }
}

/// Read an override file from the content directory, or fall back to the built-in copy
fn read_or_builtin(dir: &Path, file: &str, builtin: &'static str) -> Result<String, CatalogError> {
    let path = dir.join(file);
    if !path.exists() {
        tracing::debug!("No {} override, using built-in content", path.display());
        return Ok(builtin.to_string());
    }
    tracing::info!("Loading content from {}", path.display());
    fs::read_to_string(&path).map_err(|e| CatalogError::IoError(path.display().to_string(), e.to_string()))
}

impl PageCatalog {
    /// Parse and validate catalog JSON
    pub fn from_json(pages_json: &str, facilities_json: &str) -> Result<Self, CatalogError> {
        let pages: PagesFile = serde_json::from_str(pages_json)
            .map_err(|e| CatalogError::ParseError(PAGES_FILE.to_string(), e.to_string()))?;
        let facilities: FacilitiesFile = serde_json::from_str(facilities_json)
            .map_err(|e| CatalogError::ParseError(FACILITIES_FILE.to_string(), e.to_string()))?;

        check_slugs("page", pages.pages.iter().map(|p| p.slug.as_str()))?;
        check_slugs("facility", facilities.facilities.iter().map(|f| f.slug.as_str()))?;

        for page in &pages.pages {
            warn_missing_cells(&page.slug, &page.sections);
        }
        for facility in &facilities.facilities {
            warn_missing_cells(&facility.slug, &facility.sections);
        }

        Ok(Self {
            pages: pages.pages,
            facilities: facilities.facilities,
        })
    }

    /// Catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_PAGES, BUILTIN_FACILITIES)
    }

    /// Load from a content directory, falling back per file to the built-in content
    pub fn load(content_dir: &Path) -> Result<Self, CatalogError> {
        let pages = read_or_builtin(content_dir, PAGES_FILE, BUILTIN_PAGES)?;
        let facilities = read_or_builtin(content_dir, FACILITIES_FILE, BUILTIN_FACILITIES)?;
        let catalog = Self::from_json(&pages, &facilities)?;
        tracing::debug!(
            "Catalog loaded: {} pages, {} facilities",
            catalog.pages.len(),
            catalog.facilities.len()
        );
        Ok(catalog)
    }

    pub fn page(&self, slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.slug == slug)
    }

    pub fn facility(&self, slug: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.slug == slug)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }
}
