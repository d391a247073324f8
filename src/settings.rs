use std::path::{Path, PathBuf};

use crate::components::DEFAULT_CAPACITY;

/// Settings that persist across sessions, stored as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Versions kept by the edit history, baseline included.
    pub history_capacity: usize,
    /// JPEG quality used when saving (1-100).
    pub jpeg_quality: u8,
    /// Imgur application id for anonymous uploads.
    pub imgur_client_id: String,
    /// OAuth token; when set, uploads go to the user's account instead.
    pub imgur_access_token: String,
    pub upload_timeout_secs: u64,
    pub log_to_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            jpeg_quality: 90,
            imgur_client_id: String::new(),
            imgur_access_token: String::new(),
            upload_timeout_secs: 30,
            log_to_file: true,
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/photofe/photofe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PhotoFE\photofe_settings.cfg
    /// On macOS:   ~/Library/Application Support/PhotoFE/photofe_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("photofe");
            return Some(config_dir.join("photofe_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("PhotoFE").join("photofe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PhotoFE")
                    .join("photofe_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("photofe_settings.cfg")))
        }
    }

    /// Load from the default location. Unreadable files give defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_or_create(&path),
            None => Self::default(),
        }
    }

    /// Like [`Settings::load_from`], but a missing file is written out with
    /// the defaults so there is something to edit.
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            return Self::load_from(path);
        }
        let s = Self::default();
        if let Err(e) = s.save_to(path) {
            crate::log_warn!("Settings: could not write {}: {}", path.display(), e);
        }
        s
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys and bad values are skipped.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "history_capacity" => {
                    s.history_capacity = val.parse().unwrap_or(DEFAULT_CAPACITY);
                }
                "jpeg_quality" => {
                    s.jpeg_quality = val.parse::<u8>().map(|q| q.clamp(1, 100)).unwrap_or(90);
                }
                "imgur_client_id" => {
                    s.imgur_client_id = val.to_string();
                }
                "imgur_access_token" => {
                    s.imgur_access_token = val.to_string();
                }
                "upload_timeout_secs" => {
                    s.upload_timeout_secs = val.parse().unwrap_or(30);
                }
                "log_to_file" => {
                    s.log_to_file = val == "true";
                }
                other => {
                    crate::log_warn!("Settings: ignoring unknown key '{}'", other);
                }
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "history_capacity={}\n\
             jpeg_quality={}\n\
             imgur_client_id={}\n\
             imgur_access_token={}\n\
             upload_timeout_secs={}\n\
             log_to_file={}\n",
            self.history_capacity,
            self.jpeg_quality,
            self.imgur_client_id,
            self.imgur_access_token,
            self.upload_timeout_secs,
            self.log_to_file,
        )
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}
