//! Configuration management for scrapsmith
//!
//! Stores settings in ~/.config/scrapsmith/config.json

use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    /// Model used for plan analysis and chat
    #[serde(default = "default_text_model")]
    pub text_model: String,
    /// Primary model for step illustrations
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Fallback model when the primary refuses or fails
    #[serde(default = "default_image_fallback_model")]
    pub image_fallback_model: String,
    /// Model used for narration synthesis
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    /// Prebuilt voice name for narration
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
    /// Longest edge (px) photos are downscaled to before upload
    #[serde(default = "default_photo_edge")]
    pub photo_edge: u32,
    /// JPEG re-encode quality for uploaded photos (0-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// If true, narrate every step as soon as the plan arrives
    #[serde(default)]
    pub narrate_by_default: bool,
}

const KEYRING_SERVICE: &str = "scrapsmith";
const KEYRING_USERNAME: &str = "gemini_api_key";

/// Photos are capped to this range so uploads stay small without
/// starving the model of detail.
pub const PHOTO_EDGE_MIN: u32 = 512;
pub const PHOTO_EDGE_MAX: u32 = 1536;
pub const JPEG_QUALITY_MIN: u8 = 70;
pub const JPEG_QUALITY_MAX: u8 = 85;

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

fn read_keyring_key() -> Result<Option<String>, keyring::Error> {
    let entry = keyring_entry()?;
    match entry.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err),
    }
}

fn write_keyring_key(key: &str) -> Result<(), keyring::Error> {
    let entry = keyring_entry()?;
    entry.set_password(key)
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_image_fallback_model() -> String {
    "gemini-2.0-flash-preview-image-generation".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_tts_voice() -> String {
    "Charon".to_string()
}

fn default_photo_edge() -> u32 {
    1024
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            text_model: default_text_model(),
            image_model: default_image_model(),
            image_fallback_model: default_image_fallback_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
            photo_edge: default_photo_edge(),
            jpeg_quality: default_jpeg_quality(),
            narrate_by_default: false,
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scrapsmith"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if let Ok(content) = fs::read_to_string(&path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(err) => {
                        preserve_corrupt_config(&path, &content);
                        eprintln!(
                            "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                            err
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir()
            .ok_or_else(|| "Could not determine config directory".to_string())?;

        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)) {
                eprintln!("  Warning: Failed to set config directory permissions: {}", e);
            }
        }

        let path = dir.join("config.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        #[cfg(unix)]
        {
            write_config_atomic(&path, &content)
                .map_err(|e| format!("Failed to write config: {}", e))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, content)
                .map_err(|e| format!("Failed to write config: {}", e))?;
        }

        Ok(())
    }

    /// Get the Gemini API key (from environment or keychain)
    pub fn get_api_key(&mut self) -> Option<String> {
        // Environment variables take precedence
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            return Some(key);
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            return Some(key);
        }

        // Try keychain
        match read_keyring_key() {
            Ok(Some(key)) => return Some(key),
            Ok(None) => {} // No key stored, continue
            Err(err) => {
                eprintln!(
                    "  Warning: Failed to read API key from system keychain: {}",
                    err
                );
                eprintln!("  Tip: Set the GEMINI_API_KEY environment variable as a workaround.");
            }
        }

        // DEPRECATED: Legacy migration of plaintext API keys to system keychain.
        // This code path exists to migrate users who stored keys in config before
        // keychain support was added. Once migrated, the plaintext key is removed.
        // TODO: Remove this migration code after 2026-12-01 (6 months from keychain release)
        if let Some(key) = self.gemini_api_key.clone() {
            eprintln!("  Migrating API key from config file to system keychain...");
            match write_keyring_key(&key) {
                Ok(()) => {
                    // Verify migration succeeded
                    if let Ok(Some(stored)) = read_keyring_key() {
                        if stored == key {
                            self.gemini_api_key = None;
                            let _ = self.save();
                            eprintln!("  + API key migrated successfully.");
                        }
                    }
                }
                Err(err) => {
                    eprintln!("  Warning: Failed to migrate API key to keychain: {}", err);
                }
            }
            return Some(key);
        }

        None
    }

    /// Set and save the API key
    pub fn set_api_key(&mut self, key: &str) -> Result<(), String> {
        // Try to write to keychain
        if let Err(write_err) = write_keyring_key(key) {
            return Err(format!(
                "Failed to store API key in system keychain: {}. \
                 You can set the GEMINI_API_KEY environment variable instead.",
                write_err
            ));
        }

        // Verify the write succeeded by reading it back
        match read_keyring_key() {
            Ok(Some(stored_key)) if stored_key == key => {
                // Successfully verified - clear any legacy plaintext key from config
                self.gemini_api_key = None;
                self.save()
            }
            Ok(Some(_)) => Err(
                "API key verification failed: stored key doesn't match. \
                 You can set the GEMINI_API_KEY environment variable instead."
                    .to_string(),
            ),
            Ok(None) => Err(
                "API key verification failed: key was not persisted to keychain. \
                 You can set the GEMINI_API_KEY environment variable instead."
                    .to_string(),
            ),
            Err(read_err) => Err(format!(
                "API key verification failed: couldn't read back from keychain ({}). \
                 You can set the GEMINI_API_KEY environment variable instead.",
                read_err
            )),
        }
    }

    /// Validate API key format (Google AI Studio keys start with AIza)
    pub fn validate_api_key_format(key: &str) -> bool {
        key.starts_with("AIza")
    }

    /// Photo edge with the configured value clamped into the supported range.
    pub fn photo_edge_px(&self) -> u32 {
        self.photo_edge.clamp(PHOTO_EDGE_MIN, PHOTO_EDGE_MAX)
    }

    /// JPEG quality with the configured value clamped into the supported range.
    pub fn jpeg_quality_pct(&self) -> u8 {
        self.jpeg_quality.clamp(JPEG_QUALITY_MIN, JPEG_QUALITY_MAX)
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/scrapsmith/config.json".to_string())
    }
}

/// Interactive prompt to set up API key
pub fn setup_api_key_interactive() -> Result<String, String> {
    use std::io::{self, Write};

    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  GEMINI SETUP                                           │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!();
    println!("  scrapsmith uses Google Gemini for plan analysis, step");
    println!("  illustrations, and narration.");
    println!();
    println!("  1. Get a free API key at: https://aistudio.google.com/app/apikey");
    println!("  2. Paste it below (saved in your system keychain when available)");
    println!();
    print!("  API Key: ");
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut key = String::new();
    io::stdin().read_line(&mut key).map_err(|e| e.to_string())?;
    let key = key.trim().to_string();

    if key.is_empty() {
        return Err("No API key provided".to_string());
    }

    // Validate key format
    if !Config::validate_api_key_format(&key) {
        println!();
        println!("  Warning: Key doesn't look like a Gemini key (should start with AIza)");
        println!("     Saving anyway...");
    }

    // Save the key
    let mut config = Config::load();
    config.set_api_key(&key)?;

    println!();
    println!("  + API key saved to {}", Config::config_location());
    println!();

    Ok(key)
}

fn preserve_corrupt_config(path: &std::path::Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_config_atomic(path: &std::path::Path, content: &str) -> Result<(), String> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| e.to_string())?;

    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        eprintln!("  Warning: Failed to set temp config file permissions: {}", e);
    }

    file.write_all(content.as_bytes())
        .map_err(|e| e.to_string())?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.text_model, "gemini-2.5-flash");
        assert!(!config.narrate_by_default);
    }

    #[test]
    fn test_photo_tunables_clamped() {
        let config = Config {
            photo_edge: 99_999,
            jpeg_quality: 10,
            ..Config::default()
        };
        assert_eq!(config.photo_edge_px(), PHOTO_EDGE_MAX);
        assert_eq!(config.jpeg_quality_pct(), JPEG_QUALITY_MIN);
    }

    #[test]
    fn test_key_format_check() {
        assert!(Config::validate_api_key_format("AIzaSyExample"));
        assert!(!Config::validate_api_key_format("sk-or-v1-abc"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"photo_edge": 800}"#).unwrap();
        assert_eq!(config.photo_edge, 800);
        assert_eq!(config.image_model, "gemini-2.5-flash-image-preview");
        assert_eq!(config.tts_voice, "Charon");
    }
}
