//! HTML digest rendering.
//!
//! Turns a [`MergedFeeds`] into the HTML body of the digest email. Two
//! layouts are available, selected by [`GroupBy`]:
//!
//! - **By source**: one section per source in merge order, articles sorted
//!   by publication time (earliest first)
//! - **By keyword**: one section per matched keyword in alphabetical order,
//!   articles in the order they were fanned out (not time-sorted)
//!
//! Titles and links are inserted verbatim; no HTML escaping is applied.

use crate::models::{Article, CategorizedEntry, CategorizedView, GroupBy, MergedFeeds};
use crate::utils::{display_timestamp, parse_published};
use chrono::NaiveDateTime;
use itertools::Itertools;
use tracing::{debug, warn};

/// Heading, period and generation time wrapped around the digest sections.
#[derive(Debug, Clone)]
pub struct DigestFrame {
    pub title: String,
    pub period: String,
    pub generated_at: NaiveDateTime,
}

/// Render the complete digest document.
pub fn render_digest(merged: &MergedFeeds, group_by: GroupBy, frame: &DigestFrame) -> String {
    let sections = match group_by {
        GroupBy::Source => render_by_source(merged),
        GroupBy::Keyword => render_by_keyword(merged),
    };

    let mut body = String::new();
    body.push_str(&format!("<h2>{}</h2>\n", frame.title));
    body.push_str(&format!(
        "<p>🗓️ Noticias de {} (mail generado: {})</p>\n",
        frame.period,
        frame.generated_at.format("%d/%m/%Y %H:%M")
    ));
    body.push_str(&sections);
    body.push_str("<hr><p style='font-size:small;color:gray;'>Email generado automáticamente</p>");
    body
}

/// Sections grouped by source, each sorted by publication time.
pub fn render_by_source(merged: &MergedFeeds) -> String {
    let mut html = String::new();

    for (source, articles) in merged {
        html.push_str(&format!("<h3>🔵 {source}</h3><ul>\n"));
        for article in sort_by_published(articles) {
            let when = display_timestamp(&article.published).unwrap_or_else(|| {
                warn!(
                    %source,
                    link = %article.link,
                    published = %article.published,
                    "Unparseable publication time; showing raw value"
                );
                article.published.clone()
            });
            html.push_str(&list_item(&when, &article.title, &article.link));
        }
        html.push_str("</ul>\n");
    }

    html
}

/// Sections grouped by keyword, alphabetically.
pub fn render_by_keyword(merged: &MergedFeeds) -> String {
    let view = categorize(merged);
    debug!(keywords = view.len(), "Built categorized view");

    let mut html = String::new();
    for (keyword, entries) in &view {
        html.push_str(&format!("<h3>🏷️ {keyword}</h3><ul>\n"));
        for entry in entries {
            html.push_str(&list_item(&entry.when, &entry.title, &entry.link));
        }
        html.push_str("</ul>\n");
    }
    html
}

/// Fan every article out into one bucket per matched keyword.
///
/// Articles without keywords are left out. A keyword repeated within one
/// article only files it once.
pub fn categorize(merged: &MergedFeeds) -> CategorizedView {
    let mut view = CategorizedView::new();

    for article in merged.values().flatten() {
        let when = display_timestamp(&article.published)
            .unwrap_or_else(|| article.published.clone());

        for keyword in article.matched_keywords.iter().unique() {
            view.entry(keyword.clone())
                .or_default()
                .push(CategorizedEntry {
                    when: when.clone(),
                    title: article.title.clone(),
                    link: article.link.clone(),
                });
        }
    }

    view
}

/// Stable sort by parsed publication time; unparseable values go last.
fn sort_by_published(articles: &[Article]) -> Vec<&Article> {
    articles
        .iter()
        .sorted_by_key(|a| {
            let parsed = parse_published(&a.published);
            (parsed.is_none(), parsed)
        })
        .collect()
}

fn list_item(when: &str, title: &str, link: &str) -> String {
    format!("<li>📰 [{when}] <a href='{link}' target='_blank'>{title}</a></li>\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn article(link: &str, title: &str, published: &str, keywords: &[&str]) -> Article {
        Article {
            title: title.to_string(),
            link: link.to_string(),
            published: published.to_string(),
            matched_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn frame() -> DigestFrame {
        DigestFrame {
            title: "Digest".to_string(),
            period: "el último período".to_string(),
            generated_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(7, 5, 0)
                .unwrap(),
        }
    }

    fn position(html: &str, needle: &str) -> usize {
        html.find(needle)
            .unwrap_or_else(|| panic!("{needle} not found in {html}"))
    }

    #[test]
    fn test_by_source_sorts_by_published() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "SourceA".to_string(),
            vec![
                article("u1", "t1", "2024-01-01T10:00:00", &[]),
                article("u2", "t2", "2024-01-01T09:00:00", &[]),
                article("u3", "t3", "2023-12-31T23:59:00", &[]),
            ],
        );

        let html = render_by_source(&merged);
        assert!(position(&html, "'u3'") < position(&html, "'u2'"));
        assert!(position(&html, "'u2'") < position(&html, "'u1'"));
        assert!(html.contains("[01/01 09:00]"));
    }

    #[test]
    fn test_sort_by_published_is_non_decreasing() {
        let articles = vec![
            article("a", "a", "2024-03-01T00:00:00", &[]),
            article("b", "b", "2024-01-01T00:00:00", &[]),
            article("c", "c", "2024-02-01T12:30:00", &[]),
            article("d", "d", "2024-01-01T00:00:00", &[]),
        ];

        let sorted = sort_by_published(&articles);
        let times: Vec<_> = sorted
            .iter()
            .map(|a| parse_published(&a.published).unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        // Equal timestamps keep their stored order.
        let links: Vec<&str> = sorted.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(links, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_by_source_unparseable_falls_back_to_raw() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "S".to_string(),
            vec![
                article("bad", "b", "sometime today", &[]),
                article("good", "g", "2024-01-01T10:00:00", &[]),
            ],
        );

        let html = render_by_source(&merged);
        assert!(html.contains("[sometime today]"));
        assert!(position(&html, "'good'") < position(&html, "'bad'"));
    }

    #[test]
    fn test_by_source_keeps_source_order() {
        let mut merged = MergedFeeds::new();
        merged.insert("Zeta".to_string(), vec![article("z", "z", "2024-01-01T10:00:00", &[])]);
        merged.insert("Alpha".to_string(), vec![article("a", "a", "2024-01-01T10:00:00", &[])]);

        let html = render_by_source(&merged);
        assert!(position(&html, "🔵 Zeta") < position(&html, "🔵 Alpha"));
    }

    #[test]
    fn test_list_item_markup() {
        assert_eq!(
            list_item("01/01 10:00", "Title", "https://x"),
            "<li>📰 [01/01 10:00] <a href='https://x' target='_blank'>Title</a></li>\n"
        );
    }

    #[test]
    fn test_no_escaping_of_titles() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "S".to_string(),
            vec![article("u", "<b>Bold</b> & co", "2024-01-01T10:00:00", &[])],
        );
        assert!(render_by_source(&merged).contains("<b>Bold</b> & co"));
    }

    #[test]
    fn test_categorize_fans_out_and_drops_untagged() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "S".to_string(),
            vec![
                article("multi", "m", "2024-01-01T10:00:00", &["grain", "export"]),
                article("none", "n", "2024-01-01T11:00:00", &[]),
            ],
        );

        let view = categorize(&merged);
        let keys: Vec<&str> = view.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["export", "grain"]);
        assert_eq!(view["grain"][0].link, "multi");
        assert_eq!(view["export"][0].link, "multi");
        assert!(view.values().flatten().all(|e| e.link != "none"));
    }

    #[test]
    fn test_categorize_repeated_keyword_files_once() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "S".to_string(),
            vec![article("u", "t", "2024-01-01T10:00:00", &["grain", "grain"])],
        );
        assert_eq!(categorize(&merged)["grain"].len(), 1);
    }

    #[test]
    fn test_categorize_keeps_fan_out_order_and_raw_fallback() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "A".to_string(),
            vec![article("late", "l", "2024-01-02T10:00:00", &["wheat"])],
        );
        merged.insert(
            "B".to_string(),
            vec![article("early", "e", "not-a-date", &["wheat"])],
        );

        let view = categorize(&merged);
        let entries = &view["wheat"];
        assert_eq!(entries[0].link, "late");
        assert_eq!(entries[0].when, "02/01 10:00");
        assert_eq!(entries[1].link, "early");
        assert_eq!(entries[1].when, "not-a-date");
    }

    #[test]
    fn test_by_keyword_sections_alphabetical() {
        let mut merged = MergedFeeds::new();
        merged.insert(
            "S".to_string(),
            vec![article("u", "t", "2024-01-01T10:00:00", &["zinc", "apple"])],
        );

        let html = render_by_keyword(&merged);
        assert!(position(&html, "🏷️ apple") < position(&html, "🏷️ zinc"));
    }

    #[test]
    fn test_by_keyword_empty_when_no_keywords() {
        let mut merged = MergedFeeds::new();
        merged.insert("S".to_string(), vec![article("u", "t", "2024-01-01T10:00:00", &[])]);
        assert_eq!(render_by_keyword(&merged), "");
    }

    #[test]
    fn test_render_digest_frame() {
        let mut merged = MergedFeeds::new();
        merged.insert("S".to_string(), vec![article("u", "t", "2024-01-01T10:00:00", &["k"])]);

        let html = render_digest(&merged, GroupBy::Source, &frame());
        assert!(html.starts_with("<h2>Digest</h2>\n"));
        assert!(html.contains("Noticias de el último período (mail generado: 02/01/2024 07:05)"));
        assert!(html.contains("🔵 S"));
        assert!(!html.contains("🏷️"));
        assert!(html.ends_with("Email generado automáticamente</p>"));

        let html = render_digest(&merged, GroupBy::Keyword, &frame());
        assert!(html.contains("🏷️ k"));
        assert!(!html.contains("🔵"));
    }

    #[test]
    fn test_end_to_end_two_snapshots() {
        use crate::models::Snapshot;
        use crate::sources::snapshots::merge_snapshots;

        let first: Snapshot = serde_json::from_str(
            r#"{"SourceA":[{"link":"u1","title":"t1","published":"2024-01-01T10:00:00"}]}"#,
        )
        .unwrap();
        let second: Snapshot = serde_json::from_str(
            r#"{"SourceA":[
                {"link":"u1","title":"t1","published":"2024-01-01T10:00:00"},
                {"link":"u2","title":"t2","published":"2024-01-01T09:00:00"}
            ]}"#,
        )
        .unwrap();

        let merged = merge_snapshots(vec![first, second]);
        assert_eq!(merged["SourceA"].len(), 2);

        let html = render_digest(&merged, GroupBy::Source, &frame());
        assert_eq!(html.matches("href='u1'").count(), 1);
        assert_eq!(html.matches("href='u2'").count(), 1);
        assert!(position(&html, "href='u2'") < position(&html, "href='u1'"));
    }
}
