//! Harvesting raw values from plain-text and HTML source files.
//!
//! A harvest scans a source directory for files whose name contains the
//! requested category (case-insensitive) and extracts candidate values:
//! non-blank trimmed lines from `*.txt`, trimmed anchor `href` values from
//! `*.html`.
//!
//! A single unreadable or malformed file never aborts the harvest: it is
//! logged at `warn` level, recorded in [`Harvest::skipped`], and contributes
//! nothing. The missing source directory itself, by contrast, is a
//! configuration error raised immediately.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sync::types::{Harvest, SourceKind};

impl SourceKind {
    fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Html => "html",
        }
    }
}

/// Harvest one kind of source file from `source_dir` for `category`.
///
/// # Errors
///
/// Returns [`Error::Config`] if `source_dir` is missing or not a directory.
/// Per-file failures are soft: they end up in [`Harvest::skipped`].
pub fn harvest(kind: SourceKind, source_dir: &Path, category: &str) -> Result<Harvest> {
    if !source_dir.is_dir() {
        return Err(Error::Config(format!(
            "source directory not available for harvesting: {}",
            source_dir.display()
        )));
    }

    let category_lower = category.to_lowercase();
    let mut outcome = Harvest::default();

    for entry in fs::read_dir(source_dir)? {
        let path = entry?.path();
        if !path.extension().is_some_and(|ext| ext == kind.extension()) {
            continue;
        }
        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_lowercase().contains(&category_lower));
        if !name_matches {
            continue;
        }

        let values = match kind {
            SourceKind::Text => read_text_source(&path),
            SourceKind::Html => read_html_source(&path),
        };
        match values {
            Ok(values) => {
                debug!(path = %path.display(), count = values.len(), "source harvested");
                outcome.values.extend(values);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable source");
                outcome.skipped.push(path);
            }
        }
    }

    Ok(outcome)
}

/// Harvest both text and HTML sources for `category`, like repeated
/// [`harvest`] calls with the results merged.
///
/// # Errors
///
/// Returns [`Error::Config`] if `source_dir` is missing or not a directory.
pub fn harvest_all(source_dir: &Path, category: &str) -> Result<Harvest> {
    let mut outcome = harvest(SourceKind::Text, source_dir, category)?;
    let html = harvest(SourceKind::Html, source_dir, category)?;
    outcome.values.extend(html.values);
    outcome.skipped.extend(html.skipped);
    Ok(outcome)
}

/// Non-blank trimmed lines of a text file.
fn read_text_source(path: &Path) -> std::io::Result<BTreeSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Trimmed `href` attribute values of anchor elements in an HTML file.
fn read_html_source(path: &Path) -> std::io::Result<BTreeSet<String>> {
    let content = fs::read_to_string(path)?;
    let document = Html::parse_document(&content);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Ok(BTreeSet::new());
    };

    Ok(document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_text_harvest_trims_and_skips_blanks() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("urls_seed.txt"),
            "  a.com  \n\n   \nb.com\n",
        )
        .unwrap();

        let outcome = harvest(SourceKind::Text, dir.path(), "urls").unwrap();
        let values: Vec<_> = outcome.values.iter().cloned().collect();
        assert_eq!(values, vec!["a.com", "b.com"]);
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_category_filter_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("URLS_2024.txt"), "match.com\n").unwrap();
        fs::write(dir.path().join("domains.txt"), "other.org\n").unwrap();

        let outcome = harvest(SourceKind::Text, dir.path(), "urls").unwrap();
        assert!(outcome.values.contains("match.com"));
        assert!(!outcome.values.contains("other.org"));
    }

    #[test]
    fn test_html_harvest_extracts_hrefs() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("urls_scrape.html"),
            r#"<html><body>
                <a href=" https://a.com ">first</a>
                <a href="https://b.com">second</a>
                <a>no href</a>
                <p href="https://not-an-anchor.com">ignored</p>
            </body></html>"#,
        )
        .unwrap();

        let outcome = harvest(SourceKind::Html, dir.path(), "urls").unwrap();
        let values: Vec<_> = outcome.values.iter().cloned().collect();
        assert_eq!(values, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn test_unreadable_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        // Invalid UTF-8 makes read_to_string fail for this file only.
        fs::write(dir.path().join("urls_bad.txt"), [0xff, 0xfe, 0xfd]).unwrap();
        fs::write(dir.path().join("urls_good.txt"), "survivor.com\n").unwrap();

        let outcome = harvest(SourceKind::Text, dir.path(), "urls").unwrap();
        assert!(outcome.values.contains("survivor.com"));
        assert_eq!(outcome.skipped.len(), 1);
        assert!(!outcome.is_clean());
    }

    #[test]
    fn test_missing_source_dir_is_config_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = harvest(SourceKind::Text, &missing, "urls").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_harvest_all_merges_both_kinds() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("urls_list.txt"), "text.com\n").unwrap();
        fs::write(
            dir.path().join("urls_page.html"),
            r#"<a href="html.com">x</a>"#,
        )
        .unwrap();

        let outcome = harvest_all(dir.path(), "urls").unwrap();
        assert!(outcome.values.contains("text.com"));
        assert!(outcome.values.contains("html.com"));
    }
}
