//! Light post-parse of a summary: `key :: text` rows become a lookup table
//! used to annotate link groups with why they are being shared.

use std::collections::HashMap;

use serde::Serialize;

const ROW_SEPARATOR: &str = " :: ";
const LIST_MARKERS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ' ', '-', '*', '#', '[', ']',
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Insights {
    entries: HashMap<String, String>,
}

impl Insights {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insight for the domain of `url`, falling back to its base domain.
    pub fn for_link(&self, url: &str) -> Option<&str> {
        let domain = domain_of(url)?;
        self.get(&domain).or_else(|| self.get(&base_domain(&domain)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Last two labels of a host with at least two dots, else the host itself.
fn base_domain(domain: &str) -> String {
    if domain.matches('.').count() >= 2 {
        let labels: Vec<&str> = domain.rsplitn(3, '.').collect();
        format!("{}.{}", labels[1], labels[0])
    } else {
        domain.to_string()
    }
}

/// Host of `url` without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

pub fn parse_insights(summary: &str) -> Insights {
    let mut entries = HashMap::new();
    for line in summary.lines().map(str::trim) {
        let Some((key, text)) = line.split_once(ROW_SEPARATOR) else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let key = key.trim_start_matches(LIST_MARKERS);
        let text = text.trim();
        if key.is_empty() || text.is_empty() {
            continue;
        }
        entries.insert(key.to_string(), text.to_string());
        entries
            .entry(base_domain(key))
            .or_insert_with(|| text.to_string());
    }
    Insights { entries }
}
