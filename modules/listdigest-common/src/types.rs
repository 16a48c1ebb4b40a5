use std::collections::HashSet;

use serde::{Deserialize, Serialize};

// --- Posts ---

/// Engagement counters as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub reshares: u64,
    pub replies: u64,
    pub quotes: u64,
    pub bookmarks: u64,
}

impl Engagement {
    pub const RESHARE_WEIGHT: f64 = 1.5;
    pub const REPLY_WEIGHT: f64 = 2.0;

    /// likes + 1.5 reshares + 2 replies + quotes + bookmarks
    pub fn weighted(&self) -> f64 {
        self.likes as f64
            + Self::RESHARE_WEIGHT * self.reshares as f64
            + Self::REPLY_WEIGHT * self.replies as f64
            + self.quotes as f64
            + self.bookmarks as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    LoopingClip,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::LoopingClip => write!(f, "looping_clip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// Display URL for images, playback URL for videos and clips.
    pub url: String,
    pub thumbnail: Option<String>,
}

impl MediaItem {
    /// Thumbnail when present, else the primary URL.
    pub fn dedup_key(&self) -> &str {
        self.thumbnail.as_deref().unwrap_or(&self.url)
    }
}

/// Rich link preview metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCard {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// One post after normalization. Built once by the extractor and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    /// Text with short links replaced by their expanded or display form.
    pub text: String,
    /// External links in first-seen order, without duplicates.
    pub links: Vec<String>,
    pub media: Vec<MediaItem>,
    pub card: Option<LinkCard>,
    pub engagement: Engagement,
}

impl Post {
    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }
}

// --- Aggregation ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkGroup {
    pub link: String,
    /// Contributing posts in insertion order.
    pub posts: Vec<Post>,
    pub score: f64,
}

impl LinkGroup {
    pub fn new(link: String, posts: Vec<Post>) -> Self {
        let score = posts.iter().map(|p| p.engagement.weighted()).sum();
        Self { link, posts, score }
    }

    /// Media across every contributing post, one item per dedup key.
    pub fn unique_media(&self) -> Vec<&MediaItem> {
        let mut seen = HashSet::new();
        self.posts
            .iter()
            .flat_map(|p| p.media.iter())
            .filter(|m| seen.insert(m.dedup_key()))
            .collect()
    }

    /// First card any contributing post carries.
    pub fn card(&self) -> Option<&LinkCard> {
        self.posts.iter().find_map(|p| p.card.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Sorted by score, highest first.
    pub groups: Vec<LinkGroup>,
    /// Posts without any external link.
    pub unlinked: Vec<Post>,
}

impl AggregationResult {
    pub fn top(&self, n: usize) -> &[LinkGroup] {
        &self.groups[..n.min(self.groups.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.unlinked.is_empty()
    }
}

// --- Collections ---

pub const DEFAULT_COLLECTION_NAME: &str = "X List Summary";

/// Metadata folded across every collection fetched in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub display_name: String,
    pub names: Vec<String>,
    pub member_count: u64,
    pub owner_handle: Option<String>,
    pub owner_name: Option<String>,
    pub owner_avatar: Option<String>,
}

impl Default for CollectionMetadata {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_COLLECTION_NAME.to_string(),
            names: Vec::new(),
            member_count: 0,
            owner_handle: None,
            owner_name: None,
            owner_avatar: None,
        }
    }
}

impl CollectionMetadata {
    /// The first real list name replaces the default display name. Counts add up.
    pub fn absorb_list(&mut self, name: Option<&str>, member_count: u64) {
        self.member_count += member_count;
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return;
        };
        if self.names.is_empty() {
            self.display_name = name.to_string();
        }
        self.names.push(name.to_string());
    }

    pub fn has_owner(&self) -> bool {
        self.owner_handle.is_some()
    }

    pub fn set_owner(&mut self, handle: &str, name: Option<String>, avatar: Option<String>) {
        self.owner_handle = Some(handle.trim_start_matches('@').to_string());
        self.owner_name = name;
        self.owner_avatar = avatar;
    }
}
