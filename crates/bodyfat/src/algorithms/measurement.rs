use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::{
    error::{EstimationError, Result},
    formula::FormulaVariant,
    types::{AnatomicalBand, BandContour, BodyContour, BodyRatios, CrossSection, DerivedMeasurements, Silhouette},
};

/// Where and how one anatomical band is measured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BandConfig {
    /// Relative height from the top of the silhouette (0 = crown, 1 = feet)
    pub position: f64,
    /// Assumed body depth as a fraction of the frontal width
    pub depth_ratio: f64,
    /// Plausible circumference range in centimeters
    pub min_cm: f64,
    pub max_cm: f64,
}

impl BandConfig {
    /// Circumference of the ellipse with this band's depth ratio and the given frontal width
    pub fn circumference(&self, width_cm: f64) -> f64 {
        ellipse_perimeter(width_cm / 2.0, self.depth_ratio * width_cm / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct MeasurementConfig {
    pub neck: BandConfig,
    /// Only feeds the body ratios; an implausible shoulder never fails a request
    pub shoulder: BandConfig,
    pub waist: BandConfig,
    pub hip: BandConfig,
    /// Half the height of the scanned band, as a fraction of the silhouette height
    pub band_half_height: f64,
    /// Measure the hip even when the formula variant does not use it
    pub always_measure_hip: bool,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            neck: BandConfig { position: 0.13, depth_ratio: 0.90, min_cm: 20.0, max_cm: 70.0 },
            shoulder: BandConfig { position: 0.18, depth_ratio: 0.55, min_cm: 60.0, max_cm: 200.0 },
            waist: BandConfig { position: 0.40, depth_ratio: 0.75, min_cm: 40.0, max_cm: 200.0 },
            hip: BandConfig { position: 0.50, depth_ratio: 0.70, min_cm: 50.0, max_cm: 220.0 },
            band_half_height: 0.01,
            always_measure_hip: false,
        }
    }
}

impl MeasurementConfig {
    pub fn band(&self, band: AnatomicalBand) -> &BandConfig {
        match band {
            AnatomicalBand::Neck => &self.neck,
            AnatomicalBand::Shoulder => &self.shoulder,
            AnatomicalBand::Waist => &self.waist,
            AnatomicalBand::Hip => &self.hip,
        }
    }
}

/// Ramanujan's approximation of an ellipse perimeter
pub fn ellipse_perimeter(semi_major: f64, semi_minor: f64) -> f64 {
    let (a, b) = (semi_major, semi_minor);
    PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt())
}

#[derive(Debug, Clone)]
pub struct MeasurementReport {
    pub contour: BodyContour,
    pub measurements: DerivedMeasurements,
    pub ratios: Option<BodyRatios>,
    pub cm_per_pixel: f64,
}

/// Turns a silhouette into circumferences, calibrated on the subject's height
#[derive(Debug, Clone)]
pub struct MeasurementEstimator {
    config: MeasurementConfig,
}

impl MeasurementEstimator {
    pub fn new(config: MeasurementConfig) -> Self {
        Self { config }
    }

    pub fn estimate(
        &self,
        silhouette: &Silhouette,
        height_cm: f64,
        variant: FormulaVariant,
    ) -> Result<MeasurementReport> {
        let cm_per_pixel = height_cm / silhouette.extent.span() as f64;
        let mut contour = BodyContour::default();

        let neck_cm = self.measure(silhouette, AnatomicalBand::Neck, cm_per_pixel, &mut contour)?;
        let waist_cm = self.measure(silhouette, AnatomicalBand::Waist, cm_per_pixel, &mut contour)?;
        let hip_cm = if variant.requires(AnatomicalBand::Hip) || self.config.always_measure_hip {
            Some(self.measure(silhouette, AnatomicalBand::Hip, cm_per_pixel, &mut contour)?)
        } else {
            None
        };

        let measurements = DerivedMeasurements { neck_cm, waist_cm, hip_cm };
        let ratios = self.body_ratios(silhouette, cm_per_pixel, &mut contour);
        debug!(cm_per_pixel, ?measurements, ?ratios, "derived measurements");

        Ok(MeasurementReport { contour, measurements, ratios, cm_per_pixel })
    }

    /// Width ratios against the shoulder band, or `None` when the shoulder is unusable
    fn body_ratios(
        &self,
        silhouette: &Silhouette,
        cm_per_pixel: f64,
        contour: &mut BodyContour,
    ) -> Option<BodyRatios> {
        if let Err(err) = self.measure(silhouette, AnatomicalBand::Shoulder, cm_per_pixel, contour) {
            debug!(%err, "skipping body ratios");
            return None;
        }

        let width = |band: AnatomicalBand| {
            match contour.band(band) {
                Some(measured) => measured.median_width(),
                None => self.scan_band(silhouette, band).median_width(),
            }
        };
        let torso_px = (self.config.hip.position - self.config.shoulder.position) * silhouette.extent.span() as f64;

        BodyRatios::from_widths(
            width(AnatomicalBand::Shoulder)?,
            width(AnatomicalBand::Waist)?,
            width(AnatomicalBand::Hip)?,
            torso_px,
        )
    }

    fn measure(
        &self,
        silhouette: &Silhouette,
        band: AnatomicalBand,
        cm_per_pixel: f64,
        contour: &mut BodyContour,
    ) -> Result<f64> {
        let band_config = self.config.band(band);
        let band_contour = self.scan_band(silhouette, band);

        let circumference = band_contour
            .median_width()
            .map(|width_px| band_config.circumference(width_px * cm_per_pixel))
            .unwrap_or(0.0);
        contour.bands.push(band_contour);

        if circumference < band_config.min_cm || circumference > band_config.max_cm {
            return Err(EstimationError::MeasurementOutOfRange {
                band,
                value_cm: circumference,
                min_cm: band_config.min_cm,
                max_cm: band_config.max_cm,
            });
        }
        Ok(circumference)
    }

    /// Scan the rows of one band and keep the run crossing the body axis in each
    pub fn scan_band(&self, silhouette: &Silhouette, band: AnatomicalBand) -> BandContour {
        let extent = silhouette.extent;
        let center = extent.row_at(self.config.band(band).position);
        let half = self.config.band_half_height * extent.span() as f64;

        let first = ((center - half).round().max(extent.top as f64)) as u32;
        let last = ((center + half).round().min(extent.bottom as f64)) as u32;
        let axis = silhouette.axis_column() as f64;

        let sections = (first..=last)
            .filter_map(|row| axis_run(silhouette, row, axis))
            .collect();

        BandContour { band, sections }
    }
}

impl Default for MeasurementEstimator {
    fn default() -> Self {
        Self::new(MeasurementConfig::default())
    }
}

/// The foreground run containing `axis`, or the closest one to it
fn axis_run(silhouette: &Silhouette, row: u32, axis: f64) -> Option<CrossSection> {
    let width = silhouette.mask.width();
    let mut best: Option<(f64, CrossSection)> = None;
    let mut x = 0;

    while x < width {
        if !silhouette.is_foreground(x, row) {
            x += 1;
            continue;
        }
        let left = x;
        while x < width && silhouette.is_foreground(x, row) {
            x += 1;
        }
        let section = CrossSection { row, left, right: x - 1 };

        let distance = if axis < left as f64 {
            left as f64 - axis
        } else if axis > section.right as f64 {
            axis - section.right as f64
        } else {
            0.0
        };
        if best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, section));
        }
    }

    best.map(|(_, section)| section)
}
