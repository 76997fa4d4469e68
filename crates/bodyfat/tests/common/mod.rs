//! Synthetic photos for the integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use base64::Engine;
use bodyfat::EstimationRequest;
use image::{ImageFormat, Rgb, RgbImage};

pub const SUBJECT: Rgb<u8> = Rgb([40, 45, 50]);
pub const BACKDROP: Rgb<u8> = Rgb([230, 230, 225]);

/// Frontal figure, 360 px tall (rows 20..380), centered on `center_x`.
///
/// At 180 cm the scale is 0.5 cm/px, so the neck is 13 cm wide, the waist
/// `waist_px / 2` cm and the hip 35 cm.
pub struct Figure {
    pub waist_px: u32,
    pub center_x: u32,
}

impl Default for Figure {
    fn default() -> Self {
        Self { waist_px: 60, center_x: 100 }
    }
}

impl Figure {
    pub const NECK_PX: u32 = 26;
    pub const HIP_PX: u32 = 70;

    fn blocks(&self) -> [(u32, u32, u32); 6] {
        [
            (40, 20, 60),
            (Self::NECK_PX, 60, 80),
            (80, 80, 150),
            (self.waist_px, 150, 185),
            (Self::HIP_PX, 185, 230),
            (50, 230, 380),
        ]
    }

    pub fn paint(&self, image: &mut RgbImage, color: Rgb<u8>) {
        for (width, y0, y1) in self.blocks() {
            for y in y0..y1 {
                for x in (self.center_x - width / 2)..(self.center_x + width / 2) {
                    image.put_pixel(x, y, color);
                }
            }
        }
    }
}

/// One figure on a plain backdrop
pub fn photo(figure: &Figure) -> RgbImage {
    let mut image = RgbImage::from_pixel(200, 400, BACKDROP);
    figure.paint(&mut image, SUBJECT);
    image
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode synthetic photo");
    bytes
}

pub fn request(sex: &str, png: &[u8]) -> EstimationRequest {
    EstimationRequest {
        sex: sex.to_string(),
        age: 30,
        height_cm: 180.0,
        weight_kg: 75.0,
        image_base64: base64::engine::general_purpose::STANDARD.encode(png),
        mime_type: "image/png".to_string(),
    }
}
