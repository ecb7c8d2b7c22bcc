use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Category
// ============================================================================

/// Fixed set of post categories, serialized as upper-case labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Finance,
    Tech,
    Career,
    Education,
    Regulations,
    Lifestyle,
}

impl Category {
    /// All categories in display order (also the order of the `1`-`6` filter keys).
    pub const ALL: [Category; 6] = [
        Category::Finance,
        Category::Tech,
        Category::Career,
        Category::Education,
        Category::Regulations,
        Category::Lifestyle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Finance => "FINANCE",
            Self::Tech => "TECH",
            Self::Career => "CAREER",
            Self::Education => "EDUCATION",
            Self::Regulations => "REGULATIONS",
            Self::Lifestyle => "LIFESTYLE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Post
// ============================================================================

/// A blog post as stored by the data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_image: String,
    #[serde(default)]
    pub category: Vec<Category>,
    #[serde(deserialize_with = "date_from_timestamp_or_day")]
    pub date: DateTime<Utc>,
}

/// Average reading speed used for the reading-time estimate.
const WORDS_PER_MINUTE: usize = 200;

impl Post {
    /// Content split into display paragraphs on blank lines.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Estimated reading time in whole minutes (never zero).
    pub fn reading_minutes(&self) -> usize {
        let words = self.content.split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1)
    }

    /// Publish date formatted like `Jan 15, 2024`.
    pub fn display_date(&self) -> String {
        self.date.format("%b %-d, %Y").to_string()
    }

    /// True when the cover is an embedded `data:` URL rather than a remote address.
    pub fn has_embedded_cover(&self) -> bool {
        self.cover_image.starts_with("data:")
    }
}

/// Body of a create request: every field except `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_image: String,
    pub category: Vec<Category>,
    pub date: DateTime<Utc>,
}

/// Body of a partial update. Absent fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<Category>>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.cover_image.is_none()
            && self.category.is_none()
    }
}

// ============================================================================
// Lenient decoders
// ============================================================================

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

fn date_from_timestamp_or_day<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_post_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` days (midnight UTC).
pub fn parse_post_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_json() -> &'static str {
        r#"{
            "id": 7,
            "title": "Budgeting basics",
            "description": "How to plan a monthly budget without spreadsheets",
            "content": "First paragraph.\n\nSecond paragraph.\n\n\n\nThird.",
            "coverImage": "https://images.example.com/cover.jpg",
            "category": ["FINANCE", "LIFESTYLE"],
            "date": "2024-01-15T10:30:00.000Z"
        }"#
    }

    #[test]
    fn decodes_numeric_id_and_camel_case_fields() {
        let post: Post = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(post.id, "7");
        assert_eq!(post.cover_image, "https://images.example.com/cover.jpg");
        assert_eq!(post.category, vec![Category::Finance, Category::Lifestyle]);
        assert_eq!(post.display_date(), "Jan 15, 2024");
    }

    #[test]
    fn decodes_bare_day_dates() {
        let date = parse_post_date("2024-06-01").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert!(parse_post_date("June 1st").is_none());
    }

    #[test]
    fn unknown_category_fails_decoding() {
        let json = sample_json().replace("LIFESTYLE", "GARDENING");
        assert!(serde_json::from_str::<Post>(&json).is_err());
    }

    #[test]
    fn paragraphs_skip_empty_segments() {
        let post: Post = serde_json::from_str(sample_json()).unwrap();
        let paragraphs: Vec<&str> = post.paragraphs().collect();
        assert_eq!(
            paragraphs,
            vec!["First paragraph.", "Second paragraph.", "Third."]
        );
    }

    #[test]
    fn reading_time_rounds_up_and_never_zero() {
        let mut post: Post = serde_json::from_str(sample_json()).unwrap();
        post.content = String::new();
        assert_eq!(post.reading_minutes(), 1);
        post.content = "word ".repeat(201);
        assert_eq!(post.reading_minutes(), 2);
    }

    #[test]
    fn patch_omits_absent_fields() {
        let patch = PostPatch {
            title: Some("New title".to_string()),
            ..PostPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "New title" }));
        assert!(PostPatch::default().is_empty());
    }
}
