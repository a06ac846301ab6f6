use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub data: DataConfig,
    pub display: DisplayConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// Workbook opened when no path is given on the command line
    pub default_path: Option<String>,
    /// Worksheet selected by name or 0-based index
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub histogram_bins: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { histogram_bins: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Overrides for named UI colors, e.g. `border = "#5f87af"`
    pub colors: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            data: DataConfig::default(),
            display: DisplayConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the user config directory, falling back to
    /// defaults when no config file exists. Sections not present in the file
    /// keep their default values.
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager.config_path("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| eyre!("invalid config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.histogram_bins == 0 {
            return Err(eyre!("display.histogram_bins must be at least 1"));
        }
        Ok(())
    }
}

/// Named UI colors with config overrides on top of the defaults.
#[derive(Debug, Clone)]
pub struct Theme {
    colors: HashMap<String, Color>,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut colors = default_colors();
        for (key, value) in &config.colors {
            if let Ok(color) = value.parse::<Color>() {
                colors.insert(key.clone(), color);
            }
        }
        Self { colors }
    }

    /// Look up a named color; unknown names render as the terminal default.
    pub fn get(&self, key: &str) -> Color {
        self.colors.get(key).copied().unwrap_or(Color::Reset)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: default_colors(),
        }
    }
}

fn default_colors() -> HashMap<String, Color> {
    HashMap::from([
        ("text_primary".to_string(), Color::White),
        ("text_secondary".to_string(), Color::DarkGray),
        ("border".to_string(), Color::DarkGray),
        ("border_active".to_string(), Color::Cyan),
        ("table_header".to_string(), Color::Yellow),
        ("controls_bg".to_string(), Color::Black),
        ("highlight".to_string(), Color::Cyan),
        ("chart_line".to_string(), Color::Cyan),
        ("chart_bar".to_string(), Color::Blue),
        ("chart_scatter".to_string(), Color::Magenta),
    ])
}
