use killwatch_core::Policy;

/// Renders match announcements.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    killboard_base_url: String,
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self::new("https://zkillboard.com")
    }
}

impl MessageFormat {
    pub fn new(killboard_base_url: impl Into<String>) -> Self {
        Self {
            killboard_base_url: killboard_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn kill_url(&self, killmail_id: u64) -> String {
        format!("{}/kill/{}", self.killboard_base_url, killmail_id)
    }

    pub fn match_text(&self, policy: &Policy, killmail_id: u64) -> String {
        format!(
            "Match Found with Policy {} ({})\n{}",
            policy.name,
            policy.id,
            self.kill_url(killmail_id)
        )
    }
}
