use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

pub mod coords;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod metadata;
pub mod overlay;
pub mod pipeline;
pub mod settings;

use geocode::{GeocoderImpl, Nominatim, Offline};
use overlay::OverlayStyle;

/// CLI-level overrides applied on top of the layered settings files.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub source_dir: Option<String>,
    pub target_dir: Option<String>,
    pub name: Option<String>,
    pub offline: bool,
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Annotates every file in the source directory, one at a time. Per-file
/// failures are reported and skipped; only an unusable source or target
/// directory (or broken configuration) aborts the run.
pub async fn run(config: Config) -> Result<RunSummary> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(dir) = config.source_dir {
        settings.source_dir = dir;
    }
    if let Some(dir) = config.target_dir {
        settings.target_dir = dir;
    }
    if let Some(name) = config.name {
        settings.name = name;
    }

    let date_format = time::format_description::parse_owned::<2>(&settings.date_format)
        .with_context(|| format!("invalid date format '{}'", settings.date_format))?;

    let source_dir = PathBuf::from(&settings.source_dir);
    let target_dir = PathBuf::from(&settings.target_dir);
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("failed to create target directory {}", target_dir.display()))?;

    let geocoder = if config.offline || !settings.geocode_live {
        GeocoderImpl::Offline(Offline)
    } else {
        GeocoderImpl::Nominatim(Nominatim::new(
            &settings.geocode_user_agent,
            Duration::from_secs(settings.geocode_timeout_secs),
        )?)
    };
    let style = OverlayStyle {
        text_color: settings.overlay_text_color.clone(),
        font_size: settings.overlay_font_size,
        font_family: settings.overlay_font_family.clone(),
        font_path: settings.overlay_font_path.clone().map(PathBuf::from),
    };

    let mut files = Vec::new();
    let entries = fs::read_dir(&source_dir)
        .with_context(|| format!("failed to read source directory {}", source_dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to list {}", source_dir.display()))?;
        if entry
            .file_type()
            .map(|kind| kind.is_file())
            .unwrap_or(false)
        {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut summary = RunSummary {
        succeeded: 0,
        failed: 0,
    };
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        println!("processing {name}");
        match pipeline::annotate_file(
            &file,
            &target_dir,
            &geocoder,
            &settings,
            &date_format,
            &style,
        )
        .await
        {
            Ok(()) => summary.succeeded += 1,
            Err(err) => {
                eprintln!("skipping {name}: {err}");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
