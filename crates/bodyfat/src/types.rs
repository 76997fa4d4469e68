use geo_types::{Coord, LineString, Polygon};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
    analysis::{BodyShape, BodyType, HealthStatus},
    classifier::Classification,
    error::{EstimationError, Result},
};

/// Fixed educational disclaimer attached to every result
pub const DISCLAIMER: &str = "Educational estimate based on visual analysis of a single photo. \
It does not replace a clinical or professional body composition assessment.";

/// Decoded, normalized RGB raster owned by a single estimation call
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Luminance representation used by the silhouette pipeline
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.pixels)
    }
}

/// Inclusive row range covered by the subject, head to foot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalExtent {
    pub top: u32,
    pub bottom: u32,
}

impl VerticalExtent {
    /// Number of pixel rows spanned by the subject
    pub fn span(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Row at a relative height measured from the top of the extent
    pub fn row_at(&self, fraction: f64) -> f64 {
        self.top as f64 + fraction * (self.span() - 1) as f64
    }
}

/// Outer boundary of the selected subject region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectOutline {
    pub exterior: Vec<[f32; 2]>,
}

impl SubjectOutline {
    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f32> {
        let exterior_coords: Vec<Coord<f32>> = self.exterior
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();

        Polygon::new(LineString::new(exterior_coords), vec![])
    }

    pub fn area(&self) -> f32 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    pub fn bounding_box(&self) -> ([f32; 2], [f32; 2]) {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for &[x, y] in &self.exterior {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        ([min_x, min_y], [max_x, max_y])
    }

    pub fn centroid(&self) -> [f32; 2] {
        use geo::Centroid;
        match self.to_geo_polygon().centroid() {
            Some(centroid) if centroid.x().is_finite() && centroid.y().is_finite() => {
                [centroid.x(), centroid.y()]
            }
            _ => {
                // Degenerate outlines (single rows or columns) have no polygon centroid
                let (min, max) = self.bounding_box();
                [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0]
            }
        }
    }
}

/// Binary subject mask plus the geometry derived from it
#[derive(Debug, Clone)]
pub struct Silhouette {
    /// 255 for subject pixels, 0 elsewhere; same dimensions as the raster
    pub mask: GrayImage,
    pub extent: VerticalExtent,
    pub area_px: u64,
    pub outline: SubjectOutline,
}

impl Silhouette {
    /// Build a silhouette from a binary mask. Fails when the mask is empty.
    pub fn from_mask(mask: GrayImage) -> Result<Self> {
        let mut area_px = 0u64;
        let mut top = None;
        let mut bottom = 0;

        for (y, row) in mask.enumerate_rows() {
            let count = row.filter(|(_, _, p)| p[0] > 0).count() as u64;
            if count > 0 {
                top.get_or_insert(y);
                bottom = y;
                area_px += count;
            }
        }

        let top = top.ok_or_else(|| {
            EstimationError::NoSubjectDetected("silhouette mask is empty".to_string())
        })?;

        let outline = trace_outline(&mask);

        Ok(Self {
            mask,
            extent: VerticalExtent { top, bottom },
            area_px,
            outline,
        })
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.mask.get_pixel(x, y)[0] > 0
    }

    /// Column of the body's vertical axis
    pub fn axis_column(&self) -> f32 {
        self.outline.centroid()[0]
    }
}

fn trace_outline(mask: &GrayImage) -> SubjectOutline {
    use imageproc::contours::{find_contours, BorderType};

    let exterior = find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .max_by_key(|contour| contour.points.len())
        .map(|contour| {
            contour.points
                .iter()
                .map(|p| [p.x as f32, p.y as f32])
                .collect()
        })
        .unwrap_or_default();

    SubjectOutline { exterior }
}

/// Horizontal cross-section of the body used for width measurement
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS,
    Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnatomicalBand {
    Neck,
    Shoulder,
    Waist,
    Hip,
}

/// One foreground run at a scanned row; `left` and `right` are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSection {
    pub row: u32,
    pub left: u32,
    pub right: u32,
}

impl CrossSection {
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandContour {
    pub band: AnatomicalBand,
    /// Ordered top to bottom
    pub sections: Vec<CrossSection>,
}

impl BandContour {
    /// Median cross-section width in pixels
    pub fn median_width(&self) -> Option<f64> {
        let mut widths: Vec<u32> = self.sections.iter().map(CrossSection::width).collect();
        if widths.is_empty() {
            return None;
        }
        widths.sort_unstable();
        let mid = widths.len() / 2;
        let median = if widths.len() % 2 == 0 {
            (widths[mid - 1] + widths[mid]) as f64 / 2.0
        } else {
            widths[mid] as f64
        };
        Some(median)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyContour {
    pub bands: Vec<BandContour>,
}

impl BodyContour {
    pub fn band(&self, band: AnatomicalBand) -> Option<&BandContour> {
        self.bands.iter().find(|contour| contour.band == band)
    }
}

/// Circumferences in centimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS)]
#[ts(export)]
pub struct DerivedMeasurements {
    pub neck_cm: f64,
    pub waist_cm: f64,
    pub hip_cm: Option<f64>,
}

/// Frontal proportions relative to shoulder width, rounded to three decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema, ts_rs::TS)]
#[ts(export)]
pub struct BodyRatios {
    pub waist_to_shoulder: f64,
    pub hip_to_shoulder: f64,
    /// Shoulder-to-hip distance over shoulder width
    pub torso_to_shoulder: f64,
}

impl BodyRatios {
    /// All arguments in the same unit; `None` when the shoulder width is not positive
    pub fn from_widths(shoulder: f64, waist: f64, hip: f64, torso_height: f64) -> Option<Self> {
        if shoulder.is_nan() || shoulder <= 0.0 {
            return None;
        }
        let ratio = |value: f64| (value / shoulder * 1000.0).round() / 1000.0;
        Some(Self {
            waist_to_shoulder: ratio(waist),
            hip_to_shoulder: ratio(hip),
            torso_to_shoulder: ratio(torso_height),
        })
    }
}

/// Final record of one estimation
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema, ts_rs::TS)]
#[ts(export)]
pub struct EstimationResult {
    /// Rounded to one decimal, always within the configured clamp range
    pub body_fat_percentage: f64,
    pub classification: Classification,
    pub classification_description: String,
    pub message: String,
    pub bmi: f64,
    pub fat_mass_kg: f64,
    pub lean_mass_kg: f64,
    pub measurements: DerivedMeasurements,
    /// Whether the raw formula output had to be clamped
    pub clamped: bool,
    /// Absent when the shoulder band could not be measured
    pub ratios: Option<BodyRatios>,
    pub body_type: Option<BodyType>,
    pub body_shape: Option<BodyShape>,
    pub health_status: HealthStatus,
    /// Advisory consistency warnings; they never change the estimate
    pub alerts: Vec<String>,
}
