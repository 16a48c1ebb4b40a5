use ai_client::truncate_chars;
use listdigest_common::{AggregationResult, LinkGroup, Post};
use tracing::{info, warn};

pub const TRUNCATION_MARKER: &str = "[TRUNCATED DUE TO SIZE]";

/// How much of an aggregation a prompt may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    pub max_groups: usize,
    pub posts_per_group: usize,
    pub chars_per_post: usize,
    pub max_unlinked: usize,
    /// Overall ceiling in characters, excluding the truncation marker.
    pub max_chars: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            max_groups: 20,
            posts_per_group: 5,
            chars_per_post: 200,
            max_unlinked: 10,
            max_chars: 30_000,
        }
    }
}

impl PromptBudget {
    /// For hosted backends with small per-minute token allowances.
    pub fn tight() -> Self {
        Self {
            max_chars: 12_000,
            ..Self::default()
        }
    }
}

const INSTRUCTIONS: &str = "\
Strictly provide the summary in the following structure for premium reporting. \
Important: Use ' :: ' (space-colon-colon-space) as the separator for table rows. \
Do NOT use markdown table syntax like '| --- |'.

### TL;DR - What the list is talking about
Format: Group Name - Item 1, Item 2 :: Detailed synthesis of significance. \
(Do NOT include prefixes like 'X/Twitter List - ' in the Group Name. Provide 5-8 rows)

### 1. Main Topics & Themes
Format: 1. Theme Name – Detailed synthesis. (Use the '–' separator)

### 2. Most Shared Content & Why
Format: Content Title (or Domain) :: Mention count (e.g. 10 tweets) :: \
Why it's trending and sentiment. (Exactly 3 parts separated by ' :: ')";

fn post_line(post: &Post, max_chars: usize) -> String {
    let text = truncate_chars(&post.text, max_chars).replace(['\n', '\r'], " ");
    format!("  - @{}: {}", post.author, text)
}

/// Summarization prompt for `aggregation` within `budget`.
pub fn build_prompt(aggregation: &AggregationResult, budget: &PromptBudget) -> String {
    let mut parts: Vec<String> = vec![
        "Analyze and summarize the following tweets from an X/Twitter list.".to_string(),
        "Focus on the main themes, discussions, and shared content.\n".to_string(),
    ];

    if !aggregation.groups.is_empty() {
        // Most-discussed first, independent of engagement ranking.
        let mut groups: Vec<&LinkGroup> = aggregation.groups.iter().collect();
        groups.sort_by(|a, b| b.posts.len().cmp(&a.posts.len()));
        groups.truncate(budget.max_groups);

        parts.push(format!(
            "TWEETS GROUPED BY SHARED LINKS (Top {}):",
            budget.max_groups
        ));
        for group in groups {
            parts.push(format!("\nLink: {}", group.link));
            parts.push(format!("({} tweets about this link)", group.posts.len()));
            for post in group.posts.iter().take(budget.posts_per_group) {
                parts.push(post_line(post, budget.chars_per_post));
            }
        }
    }

    if !aggregation.unlinked.is_empty() {
        parts.push("\n\nOTHER TWEETS:".to_string());
        for post in aggregation.unlinked.iter().take(budget.max_unlinked) {
            parts.push(post_line(post, budget.chars_per_post));
        }
    }

    parts.push(format!("\n{INSTRUCTIONS}"));

    let prompt = parts.join("\n");
    let length = prompt.chars().count();
    if length > budget.max_chars {
        warn!(length, max_chars = budget.max_chars, "Prompt too large, truncating");
        return format!(
            "{}\n\n{TRUNCATION_MARKER}",
            truncate_chars(&prompt, budget.max_chars)
        );
    }
    info!(length, "Prompt built");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::testing::post;

    #[test]
    fn groups_ordered_by_post_count_and_sampled() {
        let mut posts = vec![post("solo", &["https://solo.example/"], 1000)];
        for i in 0..8 {
            posts.push(post(&format!("p{i}"), &["https://busy.example/"], 0));
        }
        let prompt = build_prompt(&aggregate(&posts), &PromptBudget::default());

        let busy = prompt.find("Link: https://busy.example/").unwrap();
        let solo = prompt.find("Link: https://solo.example/").unwrap();
        assert!(busy < solo);
        assert!(prompt.contains("(8 tweets about this link)"));
        assert_eq!(prompt.matches("  - @author: ").count(), 5 + 1);
    }

    #[test]
    fn post_text_is_flattened_and_clipped() {
        let mut p = post("1", &[], 0);
        p.text = format!("line one\nline two {}", "x".repeat(500));
        let line = post_line(&p, 200);
        assert!(!line.contains('\n'));
        assert_eq!(line.chars().count(), "  - @author: ".len() + 200);
    }

    #[test]
    fn unlinked_posts_are_limited() {
        let posts: Vec<_> = (0..25).map(|i| post(&i.to_string(), &[], 0)).collect();
        let prompt = build_prompt(&aggregate(&posts), &PromptBudget::default());
        assert!(prompt.contains("OTHER TWEETS:"));
        assert_eq!(prompt.matches("  - @author: ").count(), 10);
    }

    #[test]
    fn oversized_prompt_is_truncated_with_marker() {
        let posts: Vec<_> = (0..200)
            .map(|i| {
                let link = format!("https://site{i}.example/{}", "p".repeat(100));
                let mut p = post(&i.to_string(), &[link.as_str()], 0);
                p.text = "y".repeat(300);
                p
            })
            .collect();
        let budget = PromptBudget {
            max_groups: 200,
            ..PromptBudget::tight()
        };
        let prompt = build_prompt(&aggregate(&posts), &budget);
        assert!(prompt.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            prompt.chars().count(),
            12_000 + 2 + TRUNCATION_MARKER.len()
        );
    }

    #[test]
    fn instructions_name_all_three_sections() {
        let prompt = build_prompt(&AggregationResult::default(), &PromptBudget::default());
        assert!(prompt.contains("### TL;DR"));
        assert!(prompt.contains("### 1. Main Topics & Themes"));
        assert!(prompt.contains("### 2. Most Shared Content & Why"));
        assert!(prompt.contains(" :: "));
    }
}
