use std::path::Path;

use time::format_description::OwnedFormatItem;
use tracing::{debug, warn};

use crate::coords::Coordinate;
use crate::error::AnnotateError;
use crate::geocode::{Geocoder, GeocoderImpl};
use crate::metadata;
use crate::overlay::{self, OverlayStyle, PLACE_WRAP_WIDTH};
use crate::settings::Settings;

/// Annotates a single photo: extract tags, convert coordinates, reverse
/// geocode, compose the overlay and write the result into `target_dir`
/// under the same filename.
///
/// A geocoding failure degrades to a coordinates-only overlay; every other
/// error aborts this file and is reported by the caller.
pub async fn annotate_file(
    source: &Path,
    target_dir: &Path,
    geocoder: &GeocoderImpl,
    settings: &Settings,
    date_format: &OwnedFormatItem,
    style: &OverlayStyle,
) -> Result<(), AnnotateError> {
    let bytes = std::fs::read(source).map_err(|err| {
        AnnotateError::Decode(format!("failed to read {}: {err}", source.display()))
    })?;
    let format =
        image::guess_format(&bytes).map_err(|err| AnnotateError::Decode(err.to_string()))?;
    // Full decode up front rejects truncated or corrupt files before any
    // tag is trusted.
    let image =
        image::load_from_memory(&bytes).map_err(|err| AnnotateError::Decode(err.to_string()))?;

    let meta = metadata::extract(&bytes)?;
    let gps = meta.gps.as_ref().ok_or(AnnotateError::MissingGeoData)?;
    let coord = Coordinate::from_gps(gps)?;

    let place = match geocoder.reverse(coord).await {
        Ok(place) => Some(place),
        Err(err @ (AnnotateError::GeocodingUnavailable(_) | AnnotateError::GeocodingNotFound)) => {
            warn!("{}: {err}; keeping coordinates only", source.display());
            None
        }
        Err(err) => return Err(err),
    };

    let taken = meta
        .taken_at
        .format(date_format)
        .map_err(|err| AnnotateError::MissingMetadata(format!("DateTime: {err}")))?;

    let mut rows = vec![
        ("Name:", settings.name.clone()),
        ("Time:", taken),
        ("Lat, Lon:", format!("{}, {}", coord.lat, coord.lon)),
    ];
    if let Some(place) = place {
        rows.push((
            "Place:",
            overlay::wrap_words(&place, PLACE_WRAP_WIDTH).join("\n"),
        ));
    }
    let block = overlay::format_rows(&rows);

    let fixed = overlay::fix_orientation(image, meta.orientation);
    let placement = overlay::text_anchor(meta.height, meta.width, meta.orientation);
    let annotated = overlay::draw_overlay(&fixed, &block, placement, style, format)?;

    let file_name = source
        .file_name()
        .ok_or_else(|| AnnotateError::Write("source has no file name".into()))?;
    let dest = target_dir.join(file_name);
    std::fs::write(&dest, annotated)
        .map_err(|err| AnnotateError::Write(format!("{}: {err}", dest.display())))?;
    debug!("wrote {}", dest.display());
    Ok(())
}
