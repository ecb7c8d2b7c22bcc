//! Text measurement for terminal rendering and URL shape checks.

mod text;
mod url_validator;

pub use text::{display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{parse_http_url, UrlCheckError};

/// Longest search query the search field accepts, in characters.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
