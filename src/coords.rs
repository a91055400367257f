use tracing::debug;

use crate::error::AnnotateError;
use crate::metadata::GpsTags;

/// A signed decimal position in degrees, rounded to 5 decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn from_gps(gps: &GpsTags) -> Result<Coordinate, AnnotateError> {
        let lat = convert_to_decimal(&gps.latitude, gps.latitude_ref)?;
        let lon = convert_to_decimal(&gps.longitude, gps.longitude_ref)?;
        // Ranges are deliberately not clamped; the converter mirrors the
        // permissive behavior cameras rely on.
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            debug!("coordinate out of range: {}, {}", lat, lon);
        }
        Ok(Coordinate { lat, lon })
    }
}

/// Converts a degrees/minutes/seconds triple plus hemisphere reference into
/// signed decimal degrees: `deg + min/60 + sec/3600`, negated for S/W.
pub fn convert_to_decimal(dms: &[f64], hemisphere: char) -> Result<f64, AnnotateError> {
    let &[degrees, minutes, seconds] = dms else {
        return Err(AnnotateError::MalformedCoordinate(format!(
            "expected 3 components, got {}",
            dms.len()
        )));
    };
    for value in [degrees, minutes, seconds] {
        if !value.is_finite() || value < 0.0 {
            return Err(AnnotateError::MalformedCoordinate(format!(
                "invalid component {value} in {degrees}/{minutes}/{seconds}"
            )));
        }
    }
    let sign = match hemisphere {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        other => {
            return Err(AnnotateError::MalformedCoordinate(format!(
                "unknown hemisphere reference '{other}'"
            )));
        }
    };
    Ok(round5(sign * (degrees + minutes / 60.0 + seconds / 3600.0)))
}

fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}
