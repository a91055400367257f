use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub name: String,
    pub date_format: String,
    pub source_dir: String,
    pub target_dir: String,
    pub geocode_live: bool,
    pub geocode_user_agent: String,
    pub geocode_timeout_secs: u64,
    pub overlay_text_color: String,
    pub overlay_font_size: f32,
    pub overlay_font_family: String,
    pub overlay_font_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "Max Mustermann".to_string(),
            date_format: "[day].[month].[year] [hour]:[minute]:[second]".to_string(),
            source_dir: "source".to_string(),
            target_dir: "meta".to_string(),
            geocode_live: true,
            geocode_user_agent: "metastamp/0.2".to_string(),
            geocode_timeout_secs: 5,
            overlay_text_color: "#ede6d3".to_string(),
            overlay_font_size: 70.0,
            overlay_font_family: "Courier New".to_string(),
            overlay_font_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    annotate: Option<AnnotateSettings>,
    paths: Option<PathSettings>,
    geocoding: Option<GeocodingSettings>,
    overlay: Option<OverlaySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateSettings {
    name: Option<String>,
    date_format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PathSettings {
    source_dir: Option<String>,
    target_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodingSettings {
    live: Option<bool>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    text_color: Option<String>,
    font_size: Option<f32>,
    font_family: Option<String>,
    font_path: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(annotate) = incoming.annotate {
            if let Some(name) = annotate.name {
                if !name.trim().is_empty() {
                    self.name = name;
                }
            }
            if let Some(pattern) = annotate.date_format {
                if !pattern.trim().is_empty() {
                    self.date_format = pattern;
                }
            }
        }
        if let Some(paths) = incoming.paths {
            if let Some(dir) = paths.source_dir {
                if !dir.trim().is_empty() {
                    self.source_dir = dir;
                }
            }
            if let Some(dir) = paths.target_dir {
                if !dir.trim().is_empty() {
                    self.target_dir = dir;
                }
            }
        }
        if let Some(geocoding) = incoming.geocoding {
            if let Some(live) = geocoding.live {
                self.geocode_live = live;
            }
            if let Some(agent) = geocoding.user_agent {
                if !agent.trim().is_empty() {
                    self.geocode_user_agent = agent;
                }
            }
            if let Some(secs) = geocoding.timeout_secs {
                if secs > 0 {
                    self.geocode_timeout_secs = secs;
                }
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = overlay.text_color {
                if !color.trim().is_empty() {
                    self.overlay_text_color = color;
                }
            }
            if let Some(size) = overlay.font_size {
                if size > 0.0 {
                    self.overlay_font_size = size;
                }
            }
            if let Some(family) = overlay.font_family {
                if !family.trim().is_empty() {
                    self.overlay_font_family = family;
                }
            }
            if let Some(path) = overlay.font_path {
                if !path.trim().is_empty() {
                    self.overlay_font_path = Some(path);
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".metastamp"))
        }
    })
}
