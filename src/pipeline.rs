//! Filter-sort-search derivation of the visible post list.
//!
//! Stages run in a fixed order: search, then category, then sort. The
//! derivation is pure; callers recompute whenever an input changes.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::api::{Category, Post};

// ============================================================================
// Sort Order
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl SortOrder {
    /// Cycle newest → oldest → title → newest.
    pub fn next(self) -> Self {
        match self {
            Self::Newest => Self::Oldest,
            Self::Oldest => Self::Title,
            Self::Title => Self::Newest,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Oldest => "Oldest",
            Self::Title => "Title A-Z",
        }
    }
}

// ============================================================================
// Filter Inputs
// ============================================================================

/// Everything the visible list depends on besides the collection itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub search: String,
    pub categories: BTreeSet<Category>,
    pub sort: SortOrder,
}

impl PostFilter {
    /// Search text after trimming, or `None` when it is blank.
    pub fn search_term(&self) -> Option<&str> {
        let term = self.search.trim();
        (!term.is_empty()).then_some(term)
    }

    pub fn is_filtering(&self) -> bool {
        self.search_term().is_some() || !self.categories.is_empty()
    }

    /// Toggle one category in or out of the selection.
    pub fn toggle_category(&mut self, category: Category) {
        if !self.categories.remove(&category) {
            self.categories.insert(category);
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Indices into `posts` of the visible entries, in display order.
pub fn visible_indices(posts: &[Post], filter: &PostFilter) -> Vec<usize> {
    let needle = filter.search_term().map(str::to_lowercase);

    let mut indices: Vec<usize> = posts
        .iter()
        .enumerate()
        .filter(|(_, post)| needle.as_deref().map_or(true, |n| matches_search(post, n)))
        .filter(|(_, post)| matches_categories(post, &filter.categories))
        .map(|(i, _)| i)
        .collect();

    match filter.sort {
        SortOrder::Newest => indices.sort_by(|&a, &b| posts[b].date.cmp(&posts[a].date)),
        SortOrder::Oldest => indices.sort_by(|&a, &b| posts[a].date.cmp(&posts[b].date)),
        SortOrder::Title => indices.sort_by(|&a, &b| compare_titles(&posts[a].title, &posts[b].title)),
    }
    indices
}

/// Visible posts, borrowed from `posts`, in display order.
pub fn filter_posts<'a>(posts: &'a [Post], filter: &PostFilter) -> Vec<&'a Post> {
    visible_indices(posts, filter)
        .into_iter()
        .map(|i| &posts[i])
        .collect()
}

/// `needle` must already be lowercased.
pub fn matches_search(post: &Post, needle: &str) -> bool {
    post.title.to_lowercase().contains(needle)
        || post.description.to_lowercase().contains(needle)
        || post.content.to_lowercase().contains(needle)
        || post
            .category
            .iter()
            .any(|c| c.label().to_lowercase().contains(needle))
}

/// Empty selection keeps everything; otherwise any overlap keeps the post.
pub fn matches_categories(post: &Post, selected: &BTreeSet<Category>) -> bool {
    selected.is_empty() || post.category.iter().any(|c| selected.contains(c))
}

/// Case-folded comparison, raw text as the tie-break.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

// ============================================================================
// Stats
// ============================================================================

/// Counts shown above the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlogStats {
    pub total: usize,
    pub visible: usize,
    pub filtered: bool,
}

impl BlogStats {
    pub fn summary(&self) -> String {
        let noun = if self.total == 1 { "blog" } else { "blogs" };
        if self.filtered {
            format!("{} of {} {}", self.visible, self.total, noun)
        } else {
            format!("{} {}", self.total, noun)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn post(id: &str, title: &str, day: u32, categories: &[Category]) -> Post {
        Post {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("About {title}"),
            content: format!("The body of {title}."),
            cover_image: "https://images.example.com/x.jpg".to_string(),
            category: categories.to_vec(),
            date: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    fn titles(posts: &[Post], filter: &PostFilter) -> Vec<String> {
        filter_posts(posts, filter)
            .into_iter()
            .map(|p| p.title.clone())
            .collect()
    }

    #[test]
    fn search_matches_title_description_content_case_insensitively() {
        let mut posts = vec![
            post("1", "Rust Tips", 1, &[Category::Tech]),
            post("2", "Savings", 2, &[Category::Finance]),
            post("3", "Commute", 3, &[Category::Lifestyle]),
        ];
        posts[1].description = "Why RUST-proof your budget".to_string();
        posts[2].content = "trust the process".to_string();

        let filter = PostFilter {
            search: "  rust ".to_string(),
            sort: SortOrder::Oldest,
            ..PostFilter::default()
        };
        assert_eq!(titles(&posts, &filter), vec!["Rust Tips", "Savings", "Commute"]);
    }

    #[test]
    fn search_matches_whole_category_label() {
        let posts = vec![
            post("1", "Alpha", 1, &[Category::Tech]),
            post("2", "Beta", 2, &[Category::Finance]),
        ];
        let filter = PostFilter {
            search: "finance".to_string(),
            ..PostFilter::default()
        };
        assert_eq!(titles(&posts, &filter), vec!["Beta"]);
    }

    #[test]
    fn search_matches_part_of_category_label() {
        let posts = vec![
            post("1", "Alpha", 1, &[Category::Tech]),
            post("2", "Beta", 2, &[Category::Finance]),
        ];
        for (query, expected) in [("tec", "Alpha"), ("NANCE", "Beta")] {
            let filter = PostFilter {
                search: query.to_string(),
                ..PostFilter::default()
            };
            assert_eq!(titles(&posts, &filter), vec![expected], "query {query:?}");
        }
    }

    #[test]
    fn whitespace_search_is_a_no_op() {
        let posts = vec![post("1", "Alpha", 1, &[]), post("2", "Beta", 2, &[])];
        let filter = PostFilter {
            search: "   ".to_string(),
            ..PostFilter::default()
        };
        assert_eq!(titles(&posts, &filter), vec!["Beta", "Alpha"]);
        assert!(!filter.is_filtering());
    }

    #[test]
    fn categories_combine_with_or() {
        let posts = vec![
            post("1", "A", 1, &[Category::Tech]),
            post("2", "B", 2, &[Category::Finance, Category::Career]),
            post("3", "C", 3, &[Category::Lifestyle]),
        ];
        let mut filter = PostFilter::default();
        filter.toggle_category(Category::Tech);
        filter.toggle_category(Category::Career);
        assert_eq!(titles(&posts, &filter), vec!["B", "A"]);

        filter.toggle_category(Category::Career);
        assert_eq!(titles(&posts, &filter), vec!["A"]);
    }

    #[test]
    fn title_sort_ignores_case() {
        let posts = vec![
            post("1", "banana", 1, &[]),
            post("2", "Apple", 2, &[]),
            post("3", "cherry", 3, &[]),
        ];
        let filter = PostFilter {
            sort: SortOrder::Title,
            ..PostFilter::default()
        };
        assert_eq!(titles(&posts, &filter), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn date_ties_keep_collection_order() {
        let posts = vec![
            post("1", "First", 5, &[]),
            post("2", "Second", 5, &[]),
            post("3", "Third", 5, &[]),
        ];
        for sort in [SortOrder::Newest, SortOrder::Oldest] {
            let filter = PostFilter {
                sort,
                ..PostFilter::default()
            };
            assert_eq!(titles(&posts, &filter), vec!["First", "Second", "Third"]);
        }
    }

    #[test]
    fn sort_cycles_through_all_orders() {
        assert_eq!(SortOrder::Newest.next(), SortOrder::Oldest);
        assert_eq!(SortOrder::Oldest.next(), SortOrder::Title);
        assert_eq!(SortOrder::Title.next(), SortOrder::Newest);
    }

    #[test]
    fn stats_summary() {
        let all = BlogStats {
            total: 12,
            visible: 12,
            filtered: false,
        };
        assert_eq!(all.summary(), "12 blogs");
        let some = BlogStats {
            total: 12,
            visible: 3,
            filtered: true,
        };
        assert_eq!(some.summary(), "3 of 12 blogs");
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    fn arb_category() -> impl Strategy<Value = Category> {
        prop::sample::select(Category::ALL.to_vec())
    }

    fn arb_post() -> impl Strategy<Value = Post> {
        (
            "[a-zA-Z ]{0,12}",
            "[a-zA-Z ]{0,20}",
            "[a-zA-Z ]{0,30}",
            prop::collection::vec(arb_category(), 0..3),
            0i64..1_000_000,
        )
            .prop_map(|(title, description, content, category, secs)| Post {
                id: String::new(),
                title,
                description,
                content,
                cover_image: String::new(),
                category,
                date: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            })
    }

    fn arb_posts() -> impl Strategy<Value = Vec<Post>> {
        prop::collection::vec(arb_post(), 0..20).prop_map(|mut posts| {
            for (i, p) in posts.iter_mut().enumerate() {
                p.id = i.to_string();
            }
            posts
        })
    }

    /// Random short text, or a slice of a category label in random case.
    fn arb_query() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z]{1,3}",
            (arb_category(), 0usize..12, 1usize..12, any::<bool>()).prop_map(
                |(category, start, len, upper)| {
                    let label = category.label();
                    let start = start % label.len();
                    let end = (start + len).min(label.len());
                    let part = &label[start..end];
                    if upper {
                        part.to_uppercase()
                    } else {
                        part.to_lowercase()
                    }
                }
            ),
        ]
    }

    fn arb_sort() -> impl Strategy<Value = SortOrder> {
        prop::sample::select(vec![SortOrder::Newest, SortOrder::Oldest, SortOrder::Title])
    }

    proptest! {
        #[test]
        fn search_keeps_exactly_the_matching_posts(posts in arb_posts(), q in arb_query()) {
            let filter = PostFilter { search: q.clone(), ..PostFilter::default() };
            let visible = visible_indices(&posts, &filter);
            let needle = q.to_lowercase();
            for (i, p) in posts.iter().enumerate() {
                let expected = [&p.title, &p.description, &p.content]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
                    || p.category.iter().any(|c| {
                        let label = match c {
                            Category::Finance => "finance",
                            Category::Tech => "tech",
                            Category::Career => "career",
                            Category::Education => "education",
                            Category::Regulations => "regulations",
                            Category::Lifestyle => "lifestyle",
                        };
                        label.contains(&needle)
                    });
                prop_assert_eq!(visible.contains(&i), expected, "post {} query {:?}", i, q);
            }
        }

        #[test]
        fn category_filter_keeps_exactly_the_overlapping_posts(
            posts in arb_posts(),
            selected in prop::collection::btree_set(arb_category(), 1..4),
        ) {
            let filter = PostFilter { categories: selected.clone(), ..PostFilter::default() };
            let visible = visible_indices(&posts, &filter);
            for (i, p) in posts.iter().enumerate() {
                let overlaps = p.category.iter().any(|c| selected.contains(c));
                prop_assert_eq!(visible.contains(&i), overlaps);
            }
        }

        #[test]
        fn newest_is_reverse_of_oldest_for_distinct_dates(posts in arb_posts()) {
            let mut seen = std::collections::HashSet::new();
            let distinct: Vec<Post> = posts.into_iter().filter(|p| seen.insert(p.date)).collect();

            let newest = visible_indices(&distinct, &PostFilter { sort: SortOrder::Newest, ..PostFilter::default() });
            let mut oldest = visible_indices(&distinct, &PostFilter { sort: SortOrder::Oldest, ..PostFilter::default() });
            oldest.reverse();
            prop_assert_eq!(newest, oldest);
        }

        #[test]
        fn pipeline_is_idempotent(
            posts in arb_posts(),
            q in "[a-z]{0,2}",
            selected in prop::collection::btree_set(arb_category(), 0..3),
            sort in arb_sort(),
        ) {
            let filter = PostFilter { search: q, categories: selected, sort };
            prop_assert_eq!(visible_indices(&posts, &filter), visible_indices(&posts, &filter));
        }
    }
}
