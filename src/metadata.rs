use std::io::Cursor;

use exif::{Exif, In, Reader, Tag, Value};
use time::PrimitiveDateTime;
use time::macros::format_description;
use tracing::debug;

use crate::error::AnnotateError;

/// Typed view of the EXIF tags the pipeline needs, validated once at
/// extraction time.
#[derive(Debug, Clone)]
pub struct PhotoMetadata {
    pub width: u32,
    pub height: u32,
    pub orientation: u32,
    pub taken_at: PrimitiveDateTime,
    pub gps: Option<GpsTags>,
}

/// The flattened GPS sub-block: raw degree/minute/second triples plus
/// hemisphere references. Shape validation happens in the coordinate
/// converter.
#[derive(Debug, Clone)]
pub struct GpsTags {
    pub latitude: Vec<f64>,
    pub latitude_ref: char,
    pub longitude: Vec<f64>,
    pub longitude_ref: char,
}

/// Reads the EXIF block out of raw image bytes and extracts the required
/// tags. The caller is expected to have decoded the image already, so a
/// missing EXIF container here means the file carries no metadata at all.
pub fn extract(bytes: &[u8]) -> Result<PhotoMetadata, AnnotateError> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .map_err(|err| AnnotateError::Decode(format!("no EXIF metadata: {err}")))?;

    let width = uint_value(&exif, &[Tag::ImageWidth, Tag::PixelXDimension])
        .ok_or_else(|| AnnotateError::MissingMetadata("ImageWidth".into()))?;
    let height = uint_value(&exif, &[Tag::ImageLength, Tag::PixelYDimension])
        .ok_or_else(|| AnnotateError::MissingMetadata("ImageLength".into()))?;
    let orientation = uint_value(&exif, &[Tag::Orientation])
        .ok_or_else(|| AnnotateError::MissingMetadata("Orientation".into()))?;
    let raw_datetime = ascii_value(&exif, Tag::DateTime)
        .or_else(|| ascii_value(&exif, Tag::DateTimeOriginal))
        .ok_or_else(|| AnnotateError::MissingMetadata("DateTime".into()))?;
    let taken_at = parse_exif_datetime(raw_datetime.trim())?;

    let gps = assemble_gps(
        gps_triple(&exif, Tag::GPSLatitude),
        gps_ref(&exif, Tag::GPSLatitudeRef),
        gps_triple(&exif, Tag::GPSLongitude),
        gps_ref(&exif, Tag::GPSLongitudeRef),
    );

    Ok(PhotoMetadata {
        width,
        height,
        orientation,
        taken_at,
        gps,
    })
}

/// Parses the EXIF timestamp format `YYYY:MM:DD HH:MM:SS`.
pub fn parse_exif_datetime(raw: &str) -> Result<PrimitiveDateTime, AnnotateError> {
    let format = format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(raw, format)
        .map_err(|err| AnnotateError::MissingMetadata(format!("DateTime '{raw}': {err}")))
}

fn assemble_gps(
    latitude: Option<Vec<f64>>,
    latitude_ref: Option<char>,
    longitude: Option<Vec<f64>>,
    longitude_ref: Option<char>,
) -> Option<GpsTags> {
    match (latitude, latitude_ref, longitude, longitude_ref) {
        (Some(latitude), Some(latitude_ref), Some(longitude), Some(longitude_ref)) => {
            Some(GpsTags {
                latitude,
                latitude_ref,
                longitude,
                longitude_ref,
            })
        }
        (None, None, None, None) => None,
        _ => {
            debug!("incomplete GPS sub-block, ignoring");
            None
        }
    }
}

fn uint_value(exif: &Exif, tags: &[Tag]) -> Option<u32> {
    tags.iter().find_map(|tag| {
        exif.get_field(*tag, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
    })
}

fn ascii_value(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|part| String::from_utf8_lossy(part).into_owned()),
        _ => None,
    }
}

fn gps_triple(exif: &Exif, tag: Tag) -> Option<Vec<f64>> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(parts) => Some(parts.iter().map(|part| part.to_f64()).collect()),
        _ => None,
    }
}

fn gps_ref(exif: &Exif, tag: Tag) -> Option<char> {
    ascii_value(exif, tag)?.trim().chars().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exif_datetime() {
        let parsed = parse_exif_datetime("2021:06:15 14:30:00").unwrap();
        assert_eq!(parsed.year(), 2021);
        assert_eq!(u8::from(parsed.month()), 6);
        assert_eq!(parsed.day(), 15);
        assert_eq!(parsed.hour(), 14);
        assert_eq!(parsed.minute(), 30);
    }

    #[test]
    fn rejects_garbled_datetime() {
        let err = parse_exif_datetime("yesterday").unwrap_err();
        assert!(matches!(err, AnnotateError::MissingMetadata(_)));
    }

    #[test]
    fn gps_requires_all_four_tags() {
        let full = assemble_gps(
            Some(vec![52.0, 31.0, 12.0]),
            Some('N'),
            Some(vec![13.0, 24.0, 36.0]),
            Some('E'),
        );
        assert!(full.is_some());

        let partial = assemble_gps(Some(vec![52.0, 31.0, 12.0]), Some('N'), None, None);
        assert!(partial.is_none());

        assert!(assemble_gps(None, None, None, None).is_none());
    }

    #[test]
    fn extract_fails_without_exif_container() {
        let err = extract(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnnotateError::Decode(_)));
    }
}
