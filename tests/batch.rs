use std::fs;
use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use metastamp::{Config, run};

/// Encodes a small JPEG and splices in an APP1 segment carrying the given
/// EXIF payload, yielding a photo the whole pipeline can process.
fn jpeg_with_exif(width: u32, height: u32) -> Vec<u8> {
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 3) as u8, (y * 5) as u8, 90])
    }))
    .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
    .expect("encode jpeg");

    let fields = [
        Field {
            tag: Tag::ImageWidth,
            ifd_num: In::PRIMARY,
            value: Value::Long(vec![width]),
        },
        Field {
            tag: Tag::ImageLength,
            ifd_num: In::PRIMARY,
            value: Value::Long(vec![height]),
        },
        Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![1]),
        },
        Field {
            tag: Tag::DateTime,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"2021:06:15 14:30:00".to_vec()]),
        },
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational { num: 52, denom: 1 },
                Rational { num: 31, denom: 1 },
                Rational { num: 12, denom: 1 },
            ]),
        },
        Field {
            tag: Tag::GPSLatitudeRef,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"N".to_vec()]),
        },
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational { num: 13, denom: 1 },
                Rational { num: 24, denom: 1 },
                Rational { num: 36, denom: 1 },
            ]),
        },
        Field {
            tag: Tag::GPSLongitudeRef,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"E".to_vec()]),
        },
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).expect("encode exif");

    let mut app1 = Vec::new();
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff.into_inner());

    // SOI, then APP1 (length covers the two length bytes), then the rest.
    let mut out = Vec::new();
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

#[tokio::test]
async fn batch_annotates_valid_files_and_skips_corrupt_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source");
    let target = dir.path().join("meta");
    fs::create_dir_all(&source).expect("source dir");

    fs::write(source.join("photo.jpg"), jpeg_with_exif(64, 48)).expect("write photo");
    fs::write(source.join("corrupt.jpg"), b"not really a jpeg").expect("write corrupt");

    let summary = run(Config {
        source_dir: Some(source.to_string_lossy().into_owned()),
        target_dir: Some(target.to_string_lossy().into_owned()),
        name: None,
        offline: true,
        settings_path: None,
    })
    .await
    .expect("run should not abort on per-file failures");

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let outputs: Vec<_> = fs::read_dir(&target)
        .expect("target dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(outputs, vec!["photo.jpg"]);

    let annotated = image::open(target.join("photo.jpg")).expect("decode annotated output");
    assert_eq!(annotated.dimensions(), (64, 48));
}

#[tokio::test]
async fn batch_continues_past_failing_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source");
    let target = dir.path().join("meta");
    fs::create_dir_all(&source).expect("source dir");

    // A decodable image that carries no EXIF block.
    DynamicImage::ImageRgba8(RgbaImage::new(8, 8))
        .save(source.join("no_exif.png"))
        .expect("write png");
    // Not an image at all.
    fs::write(source.join("corrupt.jpg"), b"not really a jpeg").expect("write corrupt");

    let summary = run(Config {
        source_dir: Some(source.to_string_lossy().into_owned()),
        target_dir: Some(target.to_string_lossy().into_owned()),
        name: None,
        offline: true,
        settings_path: None,
    })
    .await
    .expect("run should not abort on per-file failures");

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
    assert!(target.exists());
    assert_eq!(fs::read_dir(&target).expect("target dir").count(), 0);
}

#[tokio::test]
async fn run_creates_target_directory_for_empty_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source");
    let target = dir.path().join("meta");
    fs::create_dir_all(&source).expect("source dir");

    let summary = run(Config {
        source_dir: Some(source.to_string_lossy().into_owned()),
        target_dir: Some(target.to_string_lossy().into_owned()),
        name: None,
        offline: true,
        settings_path: None,
    })
    .await
    .expect("run");

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert!(target.is_dir());
}

#[tokio::test]
async fn run_fails_without_source_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = run(Config {
        source_dir: Some(dir.path().join("missing").to_string_lossy().into_owned()),
        target_dir: Some(dir.path().join("meta").to_string_lossy().into_owned()),
        name: None,
        offline: true,
        settings_path: None,
    })
    .await;
    assert!(result.is_err());
}
