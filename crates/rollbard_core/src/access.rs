//! In-memory admin, ban and test-mode lists.

use std::{collections::HashSet, sync::LazyLock};

use parking_lot::RwLock;
use regex::Regex;

use crate::config::AccessConfig;

static USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{15,20}").expect("user id pattern"));

/// Process-wide permission lists, mutated by admin commands
#[derive(Debug, Default)]
pub struct AccessLists {
    admins: RwLock<HashSet<u64>>,
    banned: RwLock<HashSet<u64>>,
    testers: RwLock<HashSet<u64>>,
}

impl AccessLists {
    pub fn new(
        admins: impl IntoIterator<Item = u64>,
        banned: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            admins: RwLock::new(admins.into_iter().collect()),
            banned: RwLock::new(banned.into_iter().collect()),
            testers: RwLock::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.admins.iter().copied(), config.banned.iter().copied())
    }

    pub fn is_admin(&self, user: u64) -> bool {
        self.admins.read().contains(&user)
    }

    pub fn is_banned(&self, user: u64) -> bool {
        self.banned.read().contains(&user)
    }

    pub fn is_tester(&self, user: u64) -> bool {
        self.testers.read().contains(&user)
    }

    /// Returns false if the user already was an admin
    pub fn add_admin(&self, user: u64) -> bool {
        self.admins.write().insert(user)
    }

    /// Returns false if the user already was banned
    pub fn ban(&self, user: u64) -> bool {
        self.banned.write().insert(user)
    }

    /// Returns false if the user was not banned
    pub fn unban(&self, user: u64) -> bool {
        self.banned.write().remove(&user)
    }

    /// Flip test mode for a user; returns whether it is now enabled
    pub fn toggle_test_mode(&self, user: u64) -> bool {
        let mut testers = self.testers.write();
        if testers.remove(&user) {
            false
        } else {
            testers.insert(user);
            true
        }
    }
}

/// First 15-20 digit run in free text, read as a user id
pub fn extract_user_id(text: &str) -> Option<u64> {
    USER_ID
        .find(text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Pick a command target: an explicit mention wins over an id typed in the text
pub fn resolve_target(mentioned: Option<u64>, text: Option<&str>) -> Option<u64> {
    mentioned.or_else(|| text.and_then(extract_user_id))
}
