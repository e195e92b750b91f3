//! Static society content: dashboard pages and facility datasets.
//!
//! # Content Locations
//!
//! - Built-in: `assets/content/{pages,facilities}.json`, compiled in
//! - Override: `{DATA_DIR}/content/{pages,facilities}.json`, read at startup

pub mod catalog;
pub mod section;

pub use catalog::{CatalogError, Facility, Page, PageCatalog, ReportDefaults};
pub use section::{Column, DetailRow, Link, Section, SectionView};
