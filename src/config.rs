//! Configuration parsing for the dashboard
//!
//! Parses an optional YAML file; every field falls back to the built-in default.

use crate::statistic::Statistic;
use crate::table::{Palette, HIGHLIGHT_BACKGROUND, ZEBRA_BACKGROUND};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Local web server
    #[serde(default)]
    pub server: ServerConfig,

    /// Look and initial state of the page
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Open the page in the default browser on start
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Statistic selected in the dropdown on load (column name, e.g. "Mean")
    #[serde(default = "default_statistic")]
    pub default_statistic: String,

    #[serde(default = "default_background")]
    pub background: String,

    #[serde(default = "default_text")]
    pub text: String,

    /// Stripe colour for odd table rows
    #[serde(default = "default_zebra")]
    pub zebra: String,

    /// Background of selected table rows
    #[serde(default = "default_highlight")]
    pub highlight: String,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8050
}

fn default_true() -> bool {
    true
}

fn default_statistic() -> String {
    Statistic::default().to_string()
}

fn default_background() -> String {
    "#f8f8f8".to_string()
}

fn default_text() -> String {
    "#000000".to_string()
}

fn default_zebra() -> String {
    ZEBRA_BACKGROUND.to_string()
}

fn default_highlight() -> String {
    HIGHLIGHT_BACKGROUND.to_string()
}

fn default_chart_height() -> u32 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open_browser: default_true(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_statistic: default_statistic(),
            background: default_background(),
            text: default_text(),
            zebra: default_zebra(),
            highlight: default_highlight(),
            chart_height: default_chart_height(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be non-zero");
        }
        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host must not be empty");
        }

        self.default_statistic()?;

        for (name, colour) in [
            ("background", &self.display.background),
            ("text", &self.display.text),
            ("zebra", &self.display.zebra),
            ("highlight", &self.display.highlight),
        ] {
            if colour.trim().is_empty() {
                anyhow::bail!("Display colour '{}' must not be empty", name);
            }
        }

        Ok(())
    }

    pub fn default_statistic(&self) -> Result<Statistic> {
        Ok(self.display.default_statistic.parse::<Statistic>()?)
    }

    pub fn palette(&self) -> Palette {
        Palette {
            zebra: self.display.zebra.clone(),
            highlight: self.display.highlight.clone(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
