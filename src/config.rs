use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Generative Language API key
    pub gemini_api_key: String,

    /// Generative Language API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Model used for recommendations, viewing tips and chat
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Timeout for model requests, in seconds
    ///
    /// Covers the whole of a once-off request. For streamed replies it limits
    /// opening the stream and the wait for each subsequent chunk.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sessions untouched for this long are discarded, in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Most viewing tips kept in memory before the oldest are evicted
    #[serde(default = "default_viewing_tips_cache_size")]
    pub viewing_tips_cache_size: usize,

    /// Optional JSON file replacing the built-in question bank
    #[serde(default)]
    pub questions_path: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_viewing_tips_cache_size() -> usize {
    256
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
