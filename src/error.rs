use thiserror::Error;

/// Everything that can go wrong while annotating a single photo.
///
/// None of these abort the batch; the pipeline boundary logs them with the
/// filename and moves on. Only failure to create the target directory itself
/// is fatal to the whole run.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// The file is not a readable image or carries no EXIF block.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// A required tag (dimensions, capture time, orientation) is absent or
    /// unparseable.
    #[error("missing or invalid metadata tag: {0}")]
    MissingMetadata(String),

    /// The EXIF data has no usable GPS sub-block.
    #[error("no GPS data found in EXIF")]
    MissingGeoData,

    /// A GPS triple or hemisphere reference has the wrong shape.
    #[error("malformed GPS coordinate: {0}")]
    MalformedCoordinate(String),

    /// The geocoding service could not be reached.
    #[error("reverse geocoding unavailable: {0}")]
    GeocodingUnavailable(String),

    /// The geocoding service resolved no place for the coordinates.
    #[error("no place found for coordinates")]
    GeocodingNotFound,

    /// Overlay rasterization failed.
    #[error("failed to render overlay: {0}")]
    Render(String),

    /// The annotated image could not be written out.
    #[error("failed to write annotated image: {0}")]
    Write(String),
}
