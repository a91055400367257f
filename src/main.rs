use anyhow::Result;
use clap::Parser;

use metastamp::Config;

#[derive(Parser, Debug)]
#[command(
    name = "metastamp",
    version,
    about = "Annotate photos with EXIF capture metadata and a reverse-geocoded place overlay"
)]
struct Cli {
    /// Directory of photos to annotate (overrides settings)
    #[arg(short = 's', long = "source")]
    source: Option<String>,

    /// Output directory for annotated copies (overrides settings)
    #[arg(short = 't', long = "target")]
    target: Option<String>,

    /// Display name stamped onto each photo (overrides settings)
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Use the deterministic offline geocoder instead of Nominatim
    #[arg(long = "offline")]
    offline: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    metastamp::logging::init(cli.verbose)?;

    let summary = metastamp::run(Config {
        source_dir: cli.source,
        target_dir: cli.target,
        name: cli.name,
        offline: cli.offline,
        settings_path: cli.read_settings,
    })
    .await?;

    println!(
        "annotated {} file(s), {} failed",
        summary.succeeded, summary.failed
    );
    Ok(())
}
