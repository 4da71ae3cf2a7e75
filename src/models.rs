//! Data models for feed snapshots, merged collections and remote artifacts.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: One news item as produced by the crawling job
//! - [`Snapshot`]: One crawl run's output, source name to articles
//! - [`MergedFeeds`]: Deduplicated union of every snapshot processed in a run
//! - [`CategorizedView`]: Keyword buckets used by the keyword digest
//! - [`Artifact`] / [`ArtifactPage`]: Shapes returned by the artifact listing API

use clap::ValueEnum;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single news item as stored in a snapshot file.
///
/// Identity is the `link` field: two articles with the same link are the
/// same article, whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// The headline shown as link text in the digest.
    pub title: String,
    /// The article URL. Used as the deduplication key.
    pub link: String,
    /// Publication time as an ISO-8601 string, kept verbatim.
    pub published: String,
    /// Topic keywords the crawler matched against this article.
    #[serde(default)]
    pub matched_keywords: Vec<String>,
}

/// One crawl run's output: source name mapped to its articles, in file order.
pub type Snapshot = IndexMap<String, Vec<Article>>;

/// Articles from every snapshot of a run, deduplicated by link.
///
/// Sources keep the order in which they were first seen and articles keep
/// the order of their first occurrence.
pub type MergedFeeds = IndexMap<String, Vec<Article>>;

/// One row in a keyword bucket of the categorized view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedEntry {
    /// Display timestamp (`DD/MM HH:MM`), or the raw `published` value when it
    /// cannot be parsed.
    pub when: String,
    pub title: String,
    pub link: String,
}

/// Keyword mapped to the articles that matched it. Keys iterate alphabetically.
pub type CategorizedView = BTreeMap<String, Vec<CategorizedEntry>>;

/// How the digest groups its articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One section per originating source, articles sorted by publication time.
    #[default]
    Source,
    /// One section per matched keyword, sections sorted alphabetically.
    Keyword,
}

/// A downloadable archive as described by the artifact listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    pub archive_download_url: String,
}

/// One page of the artifact listing response.
#[derive(Debug, Deserialize, Serialize)]
pub struct ArtifactPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Total number of articles across all sources.
pub fn article_count(merged: &MergedFeeds) -> usize {
    merged.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_deserialization_defaults_keywords() {
        let json = r#"{
            "title": "Soja en alza",
            "link": "https://example.com/soja",
            "published": "2024-01-01T10:00:00"
        }"#;

        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "Soja en alza");
        assert!(article.matched_keywords.is_empty());
    }

    #[test]
    fn test_article_ignores_unknown_fields() {
        let json = r#"{
            "title": "t",
            "link": "u",
            "published": "2024-01-01T10:00:00",
            "summary": "extra field from the crawler",
            "matched_keywords": ["grain"]
        }"#;

        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.matched_keywords, vec!["grain".to_string()]);
    }

    #[test]
    fn test_article_requires_link() {
        let json = r#"{"title": "t", "published": "2024-01-01T10:00:00"}"#;
        assert!(serde_json::from_str::<Article>(json).is_err());
    }

    #[test]
    fn test_snapshot_preserves_source_order() {
        let json = r#"{
            "Zeta": [],
            "Alpha": [],
            "Mid": []
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let sources: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(sources, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_artifact_page_deserialization() {
        let json = r#"{
            "total_count": 1,
            "artifacts": [{
                "id": 42,
                "name": "rss-feeds",
                "archive_download_url": "https://api.github.com/zip/42",
                "expired": false
            }]
        }"#;

        let page: ArtifactPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_count, Some(1));
        assert_eq!(page.artifacts[0].id, 42);
        assert_eq!(page.artifacts[0].name, "rss-feeds");
    }

    #[test]
    fn test_artifact_page_without_artifacts_key() {
        let page: ArtifactPage = serde_json::from_str("{}").unwrap();
        assert!(page.artifacts.is_empty());
    }

    #[test]
    fn test_group_by_from_yaml() {
        let group_by: GroupBy = serde_yaml::from_str("keyword").unwrap();
        assert_eq!(group_by, GroupBy::Keyword);
        assert_eq!(GroupBy::default(), GroupBy::Source);
    }

    #[test]
    fn test_article_count() {
        let mut merged = MergedFeeds::new();
        let article = Article {
            title: "t".to_string(),
            link: "u".to_string(),
            published: "2024-01-01T10:00:00".to_string(),
            matched_keywords: vec![],
        };
        merged.insert("A".to_string(), vec![article.clone()]);
        merged.insert(
            "B".to_string(),
            vec![Article { link: "u2".to_string(), ..article }],
        );
        assert_eq!(article_count(&merged), 2);
    }
}
