//! Upload handling: formats, limits and downscaling.

mod common;

use bodyfat::{DecoderConfig, EstimationError, Estimator, EstimatorConfig, ImageDecoder};
use common::{encode, photo, request, Figure, BACKDROP};
use image::{imageops::FilterType, ImageFormat, RgbImage};

#[test]
fn mime_mismatch_is_a_decode_error() {
    let png = encode(&photo(&Figure::default()), ImageFormat::Png);
    let mut request = request("male", &png);
    request.mime_type = "image/jpeg".to_string();

    let err = Estimator::default().estimate(&request).unwrap_err();
    assert!(matches!(err, EstimationError::Decode(_)));
    assert_eq!(err.status_code(), 415);
}

#[test]
fn unsupported_mime_is_rejected() {
    let png = encode(&photo(&Figure::default()), ImageFormat::Png);
    let mut request = request("male", &png);
    request.mime_type = "image/webp".to_string();

    let err = Estimator::default().estimate(&request).unwrap_err();
    assert!(matches!(err, EstimationError::Decode(_)));
}

#[test]
fn invalid_base64_is_a_decode_error() {
    let mut request = request("male", &[]);
    request.image_base64 = "***".to_string();

    let err = Estimator::default().estimate(&request).unwrap_err();
    assert!(matches!(err, EstimationError::Decode(_)));
}

#[test]
fn tiny_images_are_rejected() {
    let png = encode(&RgbImage::from_pixel(32, 32, BACKDROP), ImageFormat::Png);
    let err = ImageDecoder::default().decode(&png, "image/png").unwrap_err();
    assert!(matches!(err, EstimationError::Decode(_)));
}

#[test]
fn oversized_payload_is_rejected() {
    let config = EstimatorConfig {
        decoder: DecoderConfig { max_bytes: 64, ..DecoderConfig::default() },
        ..EstimatorConfig::default()
    };
    let estimator = Estimator::new(config).unwrap();
    let png = encode(&photo(&Figure::default()), ImageFormat::Png);
    assert!(png.len() > 64);

    let err = estimator.estimate(&request("male", &png)).unwrap_err();
    assert!(matches!(err, EstimationError::Decode(_)));
}

#[test]
fn large_photo_is_downscaled_before_measuring() {
    let large = image::imageops::resize(&photo(&Figure::default()), 800, 1600, FilterType::Nearest);
    let png = encode(&large, ImageFormat::Png);

    let raster = ImageDecoder::default().decode(&png, "image/png").unwrap();
    assert_eq!((raster.width(), raster.height()), (512, 1024));

    // Measurements are calibrated on height, so the scale change cancels out
    let small = Estimator::default()
        .estimate(&request("male", &encode(&photo(&Figure::default()), ImageFormat::Png)))
        .unwrap();
    let downscaled = Estimator::default().estimate(&request("male", &png)).unwrap();
    assert!((small.measurements.waist_cm - downscaled.measurements.waist_cm).abs() < 2.0);
}
