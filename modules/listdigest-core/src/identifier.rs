use std::sync::LazyLock;

use regex::Regex;

static RE_LIST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/lists/(\d+)").expect("list id pattern"));
static RE_LIST_OWNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:x|twitter)\.com/([^/?#]+)/lists/").expect("list owner pattern")
});

/// A collection reference as the user typed it, reduced to canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListIdentifier {
    /// Numeric list id, or the raw input when no id can be found in it.
    pub id: String,
    /// Owner handle when the input is a `.../<owner>/lists/<id>` locator.
    pub owner: Option<String>,
    /// Locator used for the report link.
    pub url: String,
}

impl ListIdentifier {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let id = if input.chars().all(|c| c.is_ascii_digit()) && !input.is_empty() {
            input.to_string()
        } else {
            RE_LIST_ID
                .captures(input)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| input.to_string())
        };
        let url = if input.starts_with("http") {
            input.to_string()
        } else {
            format!("https://x.com/i/lists/{id}")
        };
        Self {
            owner: owner_from_url(input),
            id,
            url,
        }
    }
}

/// Owner handle from a list locator. The `/i/lists/` form carries none.
pub fn owner_from_url(url: &str) -> Option<String> {
    RE_LIST_OWNER
        .captures(url)
        .map(|c| c[1].to_string())
        .filter(|owner| owner != "i")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_numeric_id() {
        let id = ListIdentifier::parse(" 1234 ");
        assert_eq!(id.id, "1234");
        assert_eq!(id.owner, None);
        assert_eq!(id.url, "https://x.com/i/lists/1234");
    }

    #[test]
    fn locator_with_owner() {
        let id = ListIdentifier::parse("https://twitter.com/ferris/lists/987?s=20");
        assert_eq!(id.id, "987");
        assert_eq!(id.owner.as_deref(), Some("ferris"));
    }

    #[test]
    fn anonymous_locator_has_no_owner() {
        let id = ListIdentifier::parse("https://x.com/i/lists/555");
        assert_eq!(id.id, "555");
        assert_eq!(id.owner, None);
    }

    #[test]
    fn unrecognized_input_passes_through() {
        assert_eq!(ListIdentifier::parse("rustlang").id, "rustlang");
    }
}
