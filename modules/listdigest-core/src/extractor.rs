//! Raw timeline payload → canonical [`Post`].
//!
//! Pure and total: malformed sub-fields were already degraded to defaults by
//! the lenient payload types, so extraction cannot fail. Links, media and
//! cards are unioned across the post and the posts it reshares or quotes,
//! one level deep.

use std::collections::HashSet;

use listdigest_common::{Engagement, LinkCard, MediaItem, MediaKind, Post};
use x_client::{RawMedia, RawTweet};

/// The outer post plus one level of embedded posts.
pub const MAX_EMBED_DEPTH: usize = 2;

/// Hosts whose links point back at the platform itself.
const PLATFORM_DOMAINS: &[&str] = &["x.com", "twitter.com", "twimg.com", "t.co"];

/// A payload that can embed other payloads of the same shape.
pub trait EmbeddedPosts {
    /// Directly embedded payloads, reshare before quote.
    fn embedded(&self) -> Vec<&Self>;
}

impl EmbeddedPosts for RawTweet {
    fn embedded(&self) -> Vec<&Self> {
        self.retweeted_tweet
            .as_deref()
            .into_iter()
            .chain(self.quote.as_deref())
            .collect()
    }
}

/// Pre-order walk of `root` and its embeds, `max_depth` levels including the root.
pub fn visit<T: EmbeddedPosts>(root: &T, max_depth: usize) -> Vec<&T> {
    fn walk<'a, T: EmbeddedPosts>(node: &'a T, depth: usize, max: usize, out: &mut Vec<&'a T>) {
        out.push(node);
        if depth >= max {
            return;
        }
        for child in node.embedded() {
            walk(child, depth + 1, max, out);
        }
    }

    let mut out = Vec::new();
    if max_depth > 0 {
        walk(root, 1, max_depth, &mut out);
    }
    out
}

/// True when `url` parses and its host is not one of the platform's own domains.
pub fn is_external(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    !PLATFORM_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

struct ShortLink {
    short: String,
    expanded: String,
    display: String,
}

pub fn extract(raw: &RawTweet) -> Post {
    let levels = visit(raw, MAX_EMBED_DEPTH);

    let short_links = short_links(&levels);

    let mut links: Vec<String> = Vec::new();
    for link in &short_links {
        if is_external(&link.expanded) && !links.contains(&link.expanded) {
            links.push(link.expanded.clone());
        }
    }

    let mut text = raw.text.clone();
    for link in &short_links {
        if text.contains(&link.short) {
            let target = if is_external(&link.expanded) {
                &link.expanded
            } else {
                &link.display
            };
            text = text.replace(&link.short, target);
        }
    }

    let mut seen_media = HashSet::new();
    let media = levels
        .iter()
        .flat_map(|t| t.media_entities())
        .filter_map(|m| {
            let item = media_item(m)?;
            let key = m
                .id_str
                .clone()
                .or_else(|| m.media_url_https.clone())
                .unwrap_or_else(|| item.url.clone());
            seen_media.insert(key).then_some(item)
        })
        .collect();

    Post {
        id: raw.id.clone(),
        author: raw.author_handle().unwrap_or("unknown").to_string(),
        text,
        links,
        media,
        card: levels.iter().find_map(|t| card(t)),
        engagement: Engagement {
            likes: raw.favorite_count,
            reshares: raw.retweet_count,
            replies: raw.reply_count,
            quotes: raw.quote_count,
            bookmarks: raw.bookmark_count,
        },
    }
}

fn short_links(levels: &[&RawTweet]) -> Vec<ShortLink> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entity in levels.iter().flat_map(|t| t.url_entities()) {
        let Some(short) = entity.url.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        if !seen.insert(short.to_string()) {
            continue;
        }
        let expanded = entity
            .expanded_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(short);
        let display = entity
            .display_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(expanded);
        out.push(ShortLink {
            short: short.to_string(),
            expanded: expanded.to_string(),
            display: display.to_string(),
        });
    }
    out
}

fn media_item(media: &RawMedia) -> Option<MediaItem> {
    let poster = media.media_url_https.clone().filter(|u| !u.is_empty());
    match media.kind.as_deref()? {
        "photo" => Some(MediaItem {
            kind: MediaKind::Image,
            url: poster?,
            thumbnail: None,
        }),
        kind @ ("video" | "animated_gif") => {
            let best = media
                .video_info
                .as_ref()?
                .variants
                .iter()
                .filter(|v| v.content_type.as_deref() == Some("video/mp4"))
                .filter(|v| v.url.as_deref().is_some_and(|u| !u.is_empty()))
                .max_by_key(|v| v.bitrate.unwrap_or(0))?;
            Some(MediaItem {
                kind: if kind == "video" {
                    MediaKind::Video
                } else {
                    MediaKind::LoopingClip
                },
                url: best.url.clone()?,
                thumbnail: poster,
            })
        }
        _ => None,
    }
}

fn card(tweet: &RawTweet) -> Option<LinkCard> {
    let card = tweet.card.as_ref()?;
    let title = card.string_value("title").filter(|t| !t.trim().is_empty())?;
    Some(LinkCard {
        title: Some(title.to_string()),
        description: card.string_value("description").map(String::from),
        image: card
            .image_url("thumbnail_image")
            .or_else(|| card.image_url("player_image"))
            .map(String::from),
    })
}
