use std::collections::HashMap;

use listdigest_common::{AggregationResult, LinkGroup, Post};
use tracing::debug;

/// Side-bucket ceiling. Timelines arrive newest first, so the oldest are dropped.
pub const MAX_UNLINKED_POSTS: usize = 500;

/// Group posts by each external link they carry and rank groups by score.
///
/// A post with N links lands in N groups. Ties keep first-seen order.
/// No truncation of groups happens here.
pub fn aggregate(posts: &[Post]) -> AggregationResult {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(String, Vec<Post>)> = Vec::new();
    let mut unlinked = Vec::new();

    for post in posts {
        if !post.has_links() {
            if unlinked.len() < MAX_UNLINKED_POSTS {
                unlinked.push(post.clone());
            }
            continue;
        }
        for link in &post.links {
            let slot = *index.entry(link.as_str()).or_insert_with(|| {
                buckets.push((link.clone(), Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].1.push(post.clone());
        }
    }

    let mut groups: Vec<LinkGroup> = buckets
        .into_iter()
        .map(|(link, posts)| LinkGroup::new(link, posts))
        .collect();
    groups.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!(
        posts = posts.len(),
        groups = groups.len(),
        unlinked = unlinked.len(),
        "Aggregated posts by link"
    );

    AggregationResult { groups, unlinked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::post;

    #[test]
    fn post_with_two_links_lands_in_both_groups() {
        let p = post("1", &["https://a.example/", "https://b.example/"], 1);
        let result = aggregate(&[p]);
        assert_eq!(result.groups.len(), 2);
        assert!(result.groups.iter().all(|g| g.posts[0].id == "1"));
        assert!(result.unlinked.is_empty());
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let result = aggregate(&[
            post("1", &["https://first.example/"], 5),
            post("2", &["https://second.example/"], 5),
            post("3", &["https://third.example/"], 9),
        ]);
        let links: Vec<_> = result.groups.iter().map(|g| g.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://third.example/", "https://first.example/", "https://second.example/"]
        );
    }

    #[test]
    fn groups_are_non_increasing_by_score() {
        let posts: Vec<_> = (0..30)
            .map(|i| {
                let link = format!("https://l{}.example/", i % 7);
                post(&i.to_string(), &[link.as_str()], (i * 13 % 11) as u64)
            })
            .collect();
        let result = aggregate(&posts);
        assert!(result.groups.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn unlinked_bucket_is_capped() {
        let posts: Vec<_> = (0..MAX_UNLINKED_POSTS + 10)
            .map(|i| post(&i.to_string(), &[], 0))
            .collect();
        let result = aggregate(&posts);
        assert_eq!(result.unlinked.len(), MAX_UNLINKED_POSTS);
        assert_eq!(result.unlinked[0].id, "0");
        assert!(result.groups.is_empty());
    }
}
