use crate::ConfigError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "threadcast.toml";
pub const MAX_MESSAGE_CHARS: usize = 280;
/// Widest accepted time window: one year.
pub const MAX_TIME_RANGE_HOURS: u32 = 24 * 365;

/// Which items count as textual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRule {
    /// Self posts with a non-blank body only. Link and media posts are dropped.
    SelfPost,
    /// Any item whose body is non-blank.
    NonEmptyBody,
    /// Every item. Link posts are summarized from title and url alone.
    Any,
}

/// Where comments by bots, moderators and deleted accounts are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorExclusion {
    Disabled,
    TopLevel,
    AllLevels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPreset {
    /// Hourly single-post pipeline: six hour window, deep comment trees.
    Scheduled,
    /// Continuous bot: two hour window, flat list of top-level comments.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TweetExtraction {
    /// First non-blank line after the tweet marker.
    FirstLine,
    /// Everything after the tweet marker, with leading hashtags and
    /// punctuation stripped.
    Remainder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    Memory,
    Sqlite,
}

/// Everything that decides which item is picked and how much of its thread
/// is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub time_range_hours: u32,
    pub content_rule: ContentRule,
    pub author_exclusion: AuthorExclusion,
    /// Branching limit for top-level comments.
    pub num_comments_to_fetch: usize,
    /// Branching limit for every reply level.
    pub num_replies_to_fetch: usize,
    /// Deepest comment level kept. Top-level comments are level 1.
    pub depth_limit: u32,
}

impl SelectionPolicy {
    pub fn scheduled() -> Self {
        Self {
            time_range_hours: 6,
            content_rule: ContentRule::SelfPost,
            author_exclusion: AuthorExclusion::Disabled,
            num_comments_to_fetch: 5,
            num_replies_to_fetch: 3,
            depth_limit: 3,
        }
    }

    pub fn continuous() -> Self {
        Self {
            time_range_hours: 2,
            content_rule: ContentRule::NonEmptyBody,
            author_exclusion: AuthorExclusion::TopLevel,
            num_comments_to_fetch: 20,
            num_replies_to_fetch: 0,
            depth_limit: 1,
        }
    }

    pub fn from_preset(preset: SelectionPreset) -> Self {
        match preset {
            SelectionPreset::Scheduled => Self::scheduled(),
            SelectionPreset::Continuous => Self::continuous(),
        }
    }

    /// Oldest creation time still inside the window.
    /// Saturates at the earliest representable time instead of overflowing.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::hours(i64::from(self.time_range_hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::scheduled()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub subreddit: String,
    /// Number of newest items to scan. Defaults per preset.
    pub fetch_limit: Option<u32>,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            subreddit: "PathOfExile2".to_string(),
            fetch_limit: None,
            user_agent: format!("threadcast/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Preset plus optional per-field overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub preset: SelectionPreset,
    pub time_range_hours: Option<u32>,
    pub content_rule: Option<ContentRule>,
    pub author_exclusion: Option<AuthorExclusion>,
    pub num_comments_to_fetch: Option<usize>,
    pub num_replies_to_fetch: Option<usize>,
    pub depth_limit: Option<u32>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            preset: SelectionPreset::Scheduled,
            time_range_hours: None,
            content_rule: None,
            author_exclusion: None,
            num_comments_to_fetch: None,
            num_replies_to_fetch: None,
            depth_limit: None,
        }
    }
}

impl SelectionConfig {
    pub fn policy(&self) -> SelectionPolicy {
        let base = SelectionPolicy::from_preset(self.preset);
        SelectionPolicy {
            time_range_hours: self.time_range_hours.unwrap_or(base.time_range_hours),
            content_rule: self.content_rule.unwrap_or(base.content_rule),
            author_exclusion: self.author_exclusion.unwrap_or(base.author_exclusion),
            num_comments_to_fetch: self
                .num_comments_to_fetch
                .unwrap_or(base.num_comments_to_fetch),
            num_replies_to_fetch: self
                .num_replies_to_fetch
                .unwrap_or(base.num_replies_to_fetch),
            depth_limit: self.depth_limit.unwrap_or(base.depth_limit),
        }
    }

    fn default_fetch_limit(&self) -> u32 {
        match self.preset {
            SelectionPreset::Scheduled => 500,
            SelectionPreset::Continuous => 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub base_url: String,
    pub role_description: String,
    pub focus: String,
    pub tweet_instructions: String,
    pub tweet_extraction: TweetExtraction,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            role_description: "You are an active, knowledgeable member of this community. \
                Your goal is to write concise and insightful posts that resonate with fellow fans. \
                The tone should reflect genuine interest and expertise."
                .to_string(),
            focus: "the latest updates, notable discussions, and the collective sentiment of the community"
                .to_string(),
            tweet_instructions: "Write a tweet aimed at this community on social media. \
                Use natural, conversational language that avoids exaggeration or hype. \
                Avoid emojis, excessive punctuation, or generic phrases. \
                Make sure the tweet stands alone without requiring Reddit context. \
                Limit the tweet to 280 characters or less."
                .to_string(),
            tweet_extraction: TweetExtraction::FirstLine,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub base_url: String,
    pub max_chars: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            max_chars: MAX_MESSAGE_CHARS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Sqlite,
            path: "threadcast.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub selection: SelectionConfig,
    pub generation: GenerationConfig,
    pub publish: PublishConfig,
    pub ledger: LedgerConfig,
    pub poll: PollConfig,
}

impl AppConfig {
    /// Reads and validates the file at `path`. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Like [`AppConfig::from_file`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.selection.policy()
    }

    pub fn fetch_limit(&self) -> u32 {
        self.source
            .fetch_limit
            .unwrap_or_else(|| self.selection.default_fetch_limit())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.subreddit.trim().is_empty() {
            return Err(invalid("source.subreddit", &self.source.subreddit));
        }
        if self.fetch_limit() == 0 {
            return Err(invalid("source.fetch_limit", "0"));
        }
        let time_range_hours = self.policy().time_range_hours;
        if time_range_hours > MAX_TIME_RANGE_HOURS {
            return Err(invalid(
                "selection.time_range_hours",
                &time_range_hours.to_string(),
            ));
        }
        if self.policy().num_comments_to_fetch == 0 {
            return Err(invalid("selection.num_comments_to_fetch", "0"));
        }
        if self.poll.interval_secs == 0 {
            return Err(invalid("poll.interval_secs", "0"));
        }
        if self.publish.max_chars == 0 || self.publish.max_chars > MAX_MESSAGE_CHARS {
            return Err(invalid(
                "publish.max_chars",
                &self.publish.max_chars.to_string(),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Secrets for the three external services. Read from the environment only.
#[derive(Clone)]
pub struct Credentials {
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: Option<String>,
    pub openai_api_key: String,
    pub x_api_key: String,
    pub x_api_secret: String,
    pub x_access_token: String,
    pub x_access_secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: name.to_string(),
                })
        };

        Ok(Self {
            reddit_client_id: require("REDDIT_CLIENT_ID")?,
            reddit_client_secret: require("REDDIT_CLIENT_SECRET")?,
            reddit_user_agent: lookup("REDDIT_USER_AGENT").filter(|ua| !ua.trim().is_empty()),
            openai_api_key: require("OPENAI_API_KEY")?,
            x_api_key: require("X_API_KEY")?,
            x_api_secret: require("X_API_SECRET")?,
            x_access_token: require("X_ACCESS_TOKEN")?,
            x_access_secret: require("X_ACCESS_SECRET")?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("reddit_client_id", &self.reddit_client_id)
            .field("reddit_client_secret", &"<redacted>")
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("openai_api_key", &"<redacted>")
            .field("x_api_key", &"<redacted>")
            .field("x_api_secret", &"<redacted>")
            .field("x_access_token", &"<redacted>")
            .field("x_access_secret", &"<redacted>")
            .finish()
    }
}
