use dashmap::DashMap;

use crate::audio::Track;

/// Personal theme tracks, keyed by user id
#[derive(Debug, Default)]
pub struct ThemeMap {
    themes: DashMap<u64, Track>,
}

impl ThemeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a theme link. Only `http://` and `https://` links are accepted.
    pub fn set(&self, user: u64, link: &str) -> bool {
        let link = link.trim();
        if !is_http_link(link) {
            return false;
        }
        self.themes.insert(user, Track::new(link));
        true
    }

    pub fn get(&self, user: u64) -> Option<Track> {
        self.themes.get(&user).map(|t| t.value().clone())
    }
}

fn is_http_link(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    (lower.starts_with("http://") && lower.len() > "http://".len())
        || (lower.starts_with("https://") && lower.len() > "https://".len())
}
