use std::time::Duration;

use crate::layout::LayoutOptions;

/// How plain-text payloads are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Render through the markdown pipeline.
    Clean,
    /// Preformatted text, exactly as received.
    Raw,
}

impl DisplayMode {
    fn from_env(value: &str) -> anyhow::Result<Self> {
        match value {
            "clean" => Ok(Self::Clean),
            "raw" => Ok(Self::Raw),
            other => Err(anyhow::anyhow!(
                "Invalid FLOWSCOPE_DISPLAY_MODE '{other}'. Expected 'clean' or 'raw'"
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the execution service.
    pub service_url: String,
    /// Display mode for plain-text payloads.
    pub display_mode: DisplayMode,
    /// Connect timeout for service requests. Streams carry no overall
    /// timeout since a run keeps the body open.
    pub connect_timeout: Duration,
    /// Layout spacing, overridable per deployment.
    pub layout: LayoutOptions,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let service_url = std::env::var("FLOWSCOPE_SERVICE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:2024".to_string());

        let display_mode = match std::env::var("FLOWSCOPE_DISPLAY_MODE") {
            Ok(value) => DisplayMode::from_env(&value)?,
            Err(_) => DisplayMode::Clean,
        };

        let connect_timeout = Duration::from_secs(env_parse("FLOWSCOPE_CONNECT_TIMEOUT_SECS", 10)?);

        let defaults = LayoutOptions::default();
        let layout = LayoutOptions {
            rank_gap: env_parse("FLOWSCOPE_RANK_GAP", defaults.rank_gap)?,
            node_gap: env_parse("FLOWSCOPE_NODE_GAP", defaults.node_gap)?,
            fit_debounce: Duration::from_millis(env_parse(
                "FLOWSCOPE_FIT_DEBOUNCE_MS",
                defaults.fit_debounce.as_millis() as u64,
            )?),
            ..defaults
        };

        Ok(Self {
            service_url,
            display_mode,
            connect_timeout,
            layout,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {key} '{value}': {e}")),
        Err(_) => Ok(default),
    }
}
