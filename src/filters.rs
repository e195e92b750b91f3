//! Askama template filters for asset management

// Include compile-time generated asset hashes
include!(concat!(env!("OUT_DIR"), "/asset_hashes.rs"));

/// Append cache-busting hash to static asset URLs.
///
/// Usage in templates:
/// ```html
/// <link rel="stylesheet" href="{{ "/static/css/society.css"|asset_url }}">
/// ```
#[askama::filter_fn]
pub fn asset_url(path: impl std::fmt::Display, _: &dyn askama::Values) -> askama::Result<String> {
    let path_str = path.to_string();
    Ok(versioned(&path_str))
}

fn versioned(path: &str) -> String {
    match path {
        "/static/css/society.css" => format!("{}?v={}", path, SOCIETY_CSS_HASH),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_gets_hash() {
        let url = versioned("/static/css/society.css");
        assert!(url.starts_with("/static/css/society.css?v="));
        assert_eq!(url.len(), "/static/css/society.css?v=".len() + 8);
    }

    #[test]
    fn test_unknown_asset_unchanged() {
        assert_eq!(versioned("/static/img/logo.png"), "/static/img/logo.png");
    }
}
