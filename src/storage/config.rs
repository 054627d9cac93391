//! Configuration management

use crate::error::{Result, SaverError};
use crate::types::Config;
use crate::utils::paths::{default_download_dir, ensure_dir, expand_home, get_config_dir, get_config_path};
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

/// Load configuration from file, merging with defaults
pub async fn load_config() -> Result<Config> {
    load_config_from(Path::new(&get_config_path())).await
}

/// Load configuration from an explicit path
pub async fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(finalize(Config::default()));
    }

    let content = fs::read_to_string(path).await?;
    parse_config(&content)
}

/// Parse config JSON; missing keys take their defaults
pub fn parse_config(content: &str) -> Result<Config> {
    let user_config: Config = serde_json::from_str(content)
        .map_err(|e| SaverError::InvalidConfig(e.to_string()))?;

    if user_config.api_url.trim().is_empty() {
        return Err(SaverError::InvalidConfig("api_url must not be empty".into()));
    }

    Ok(finalize(user_config))
}

/// Fill in runtime defaults (download dir)
fn finalize(mut config: Config) -> Config {
    config.download_dir = if config.download_dir.is_empty() {
        default_download_dir()
    } else {
        expand_home(&config.download_dir)
    };
    config
}

/// Save configuration to file
pub async fn save_config(config: &Config) -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(get_config_path(), content).await?;
    Ok(())
}

/// Open config file in editor
pub async fn edit_config(editor: &str) -> Result<()> {
    let config_path = get_config_path();

    // Ensure config file exists
    if !Path::new(&config_path).exists() {
        save_config(&Config::default()).await?;
    }

    Command::new(editor)
        .arg(&config_path)
        .status()
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SelectorType;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(r#"{"socket_url": "http://localhost:4000", "selector": "fuzzy"}"#).unwrap();
        assert_eq!(config.api_url, "https://jenisaverbackend.onrender.com");
        assert_eq!(config.push_origin(), "http://localhost:4000");
        assert_eq!(config.selector, SelectorType::Fuzzy);
        assert_eq!(config.display_delay_secs, 3);
        assert!(!config.download_dir.is_empty());
    }

    #[test]
    fn test_push_origin_defaults_to_api() {
        let config = parse_config(r#"{"api_url": "http://127.0.0.1:8080", "socket_url": ""}"#).unwrap();
        assert_eq!(config.push_origin(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(parse_config("{"), Err(SaverError::InvalidConfig(_))));
        assert!(matches!(
            parse_config(r#"{"api_url": " "}"#),
            Err(SaverError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_config(r#"{"selector": "rofi"}"#),
            Err(SaverError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).await.unwrap();
        assert_eq!(config.editor, "nvim");
        assert_eq!(config.socket_url, None);
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"download_dir": "/srv/media", "display_delay_secs": 0}"#).unwrap();

        let config = load_config_from(&path).await.unwrap();
        assert_eq!(config.download_dir, "/srv/media");
        assert_eq!(config.display_delay_secs, 0);
    }
}
