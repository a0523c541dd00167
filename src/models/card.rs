use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Card {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A card row together with the ids of its associated tags.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct CardWithTags {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub card: Card,
    pub tag_ids: Vec<i32>,
}

/// Fields accepted by card create and update. `tag_ids` fully replaces the
/// card's tag set on update; duplicates are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub search: Option<String>,
    pub tag_ids: Vec<i32>,
}

impl CardFilter {
    pub fn new(search: Option<String>, tag_ids: Vec<i32>) -> Self {
        let search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self { search, tag_ids }
    }

    /// Case-insensitive substring match against title or description.
    pub fn matches_text(&self, card: &Card) -> bool {
        let Some(needle) = &self.search else {
            return true;
        };
        let needle = needle.to_lowercase();
        card.title.to_lowercase().contains(&needle)
            || card
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }

    /// Match-any over the requested tag ids; an empty filter matches everything.
    pub fn matches_tags(&self, tag_ids: &[i32]) -> bool {
        self.tag_ids.is_empty() || tag_ids.iter().any(|id| self.tag_ids.contains(id))
    }
}

/// Escapes LIKE wildcards so user search text is matched literally.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Removes duplicate tag ids while keeping first-seen order.
pub fn dedup_tag_ids(tag_ids: &[i32]) -> Vec<i32> {
    let mut unique = Vec::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, description: Option<&str>) -> Card {
        Card {
            id: 1,
            title: title.to_string(),
            description: description.map(str::to_string),
            icon: None,
            color: None,
            thumbnail_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn blank_search_is_dropped() {
        assert!(CardFilter::new(Some("   ".into()), vec![]).search.is_none());
    }

    #[test]
    fn text_match_is_case_insensitive_over_title_and_description() {
        let filter = CardFilter::new(Some("DOCS".into()), vec![]);
        assert!(filter.matches_text(&card("Rust docs", None)));
        assert!(filter.matches_text(&card("Rust", Some("official docs"))));
        assert!(!filter.matches_text(&card("Rust", None)));
    }

    #[test]
    fn tag_match_is_match_any() {
        let filter = CardFilter::new(None, vec![2, 5]);
        assert!(filter.matches_tags(&[1, 5]));
        assert!(!filter.matches_tags(&[1, 3]));
        assert!(CardFilter::default().matches_tags(&[]));
    }

    #[test]
    fn card_with_tags_serializes_flat() {
        let value = serde_json::to_value(CardWithTags { card: card("A", None), tag_ids: vec![3] }).unwrap();
        assert_eq!(value["title"], "A");
        assert_eq!(value["tag_ids"][0], 3);
    }

    #[test]
    fn duplicate_tag_ids_collapse() {
        assert_eq!(dedup_tag_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
