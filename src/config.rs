use crate::capability::summarizer::SummarizerOptions;
use crate::error::InquiraError;
use color_eyre::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub summarizer: SummarizerOptions,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local Ollama daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
}

/// Models backing each capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub summarizer: String,
    pub language_model: String,
}

/// Fallback sampling parameters when the model publishes none
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub top_k: u32,
    pub temperature: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            temperature: 1.0,
        }
    }
}

/// Where the notes storage file lives. Empty means the platform data dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub directory: String,
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            file_name: "notes.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig {
                url: "http://localhost:11434".to_string(),
            },
            models: ModelsConfig {
                summarizer: "gemma3:4b".to_string(),
                language_model: "gemma3:4b".to_string(),
            },
            summarizer: SummarizerOptions::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from disk or creates default if not found
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents).map_err(|err| {
            InquiraError::Config(format!("{}: {}", config_path.display(), err))
        })?;
        Ok(config)
    }

    /// Saves configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Returns the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Directory holding `storage.json` and the log file
    pub fn data_dir(&self) -> Result<PathBuf> {
        if !self.storage.data_dir.trim().is_empty() {
            return Ok(PathBuf::from(self.storage.data_dir.trim()));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Default target of the notes export
    pub fn export_path(&self) -> Result<PathBuf> {
        let directory = if self.export.directory.trim().is_empty() {
            std::env::current_dir()?
        } else {
            PathBuf::from(self.export.directory.trim())
        };
        Ok(directory.join(&self.export.file_name))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "inquira")
            .ok_or_else(|| InquiraError::Config("Could not determine config directory".into()).into())
    }
}
