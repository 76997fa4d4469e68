use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use crate::{
    error::{EstimationError, Result},
    traits::RegionSelector,
    types::Silhouette,
};

/// Picks the largest 8-connected foreground region as the subject.
///
/// Refuses to guess: fails when the largest region is too small, or when a
/// second region comes close to it in size.
#[derive(Debug, Clone)]
pub struct LargestComponentSelector {
    pub min_area_fraction: f64,
    pub ambiguity_ratio: f64,
}

impl Default for LargestComponentSelector {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.02,
            ambiguity_ratio: 0.5,
        }
    }
}

impl RegionSelector for LargestComponentSelector {
    fn select(&self, mask: &GrayImage) -> Result<Silhouette> {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        let mut areas: Vec<u64> = Vec::new();
        for pixel in labels.pixels() {
            let label = pixel[0] as usize;
            if label == 0 {
                continue;
            }
            if label >= areas.len() {
                areas.resize(label + 1, 0);
            }
            areas[label] += 1;
        }

        let mut regions: Vec<(u32, u64)> = areas
            .iter()
            .enumerate()
            .filter(|(_, area)| **area > 0)
            .map(|(label, area)| (label as u32, *area))
            .collect();
        regions.sort_by(|a, b| b.1.cmp(&a.1));

        let Some(&(subject_label, subject_area)) = regions.first() else {
            return Err(EstimationError::NoSubjectDetected(
                "no foreground region found".to_string(),
            ));
        };

        let frame_area = mask.width() as u64 * mask.height() as u64;
        let fraction = subject_area as f64 / frame_area as f64;
        if fraction < self.min_area_fraction {
            return Err(EstimationError::NoSubjectDetected(format!(
                "largest region covers {:.1}% of the frame, below the {:.1}% minimum",
                fraction * 100.0,
                self.min_area_fraction * 100.0
            )));
        }

        if let Some(&(_, runner_up)) = regions.get(1) {
            if runner_up as f64 >= self.ambiguity_ratio * subject_area as f64 {
                return Err(EstimationError::NoSubjectDetected(format!(
                    "ambiguous scene: two comparable regions ({subject_area} px and {runner_up} px)"
                )));
            }
        }

        tracing::debug!(
            regions = regions.len(),
            subject_area,
            "selected subject region"
        );

        let subject = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
            if labels.get_pixel(x, y)[0] == subject_label {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        Silhouette::from_mask(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(mask: &mut GrayImage, x0: u32, x1: u32, y0: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, Luma([255u8]));
            }
        }
    }

    #[test]
    fn test_keeps_largest_region_only() {
        let mut mask = GrayImage::new(100, 100);
        fill(&mut mask, 40, 60, 10, 90);
        fill(&mut mask, 5, 10, 5, 10);

        let silhouette = LargestComponentSelector::default().select(&mask).unwrap();
        assert_eq!(silhouette.area_px, 20 * 80);
        assert!(!silhouette.is_foreground(7, 7));
        assert_eq!(silhouette.extent.top, 10);
        assert_eq!(silhouette.extent.bottom, 89);
    }

    #[test]
    fn test_rejects_comparable_regions() {
        let mut mask = GrayImage::new(100, 100);
        fill(&mut mask, 10, 30, 10, 90);
        fill(&mut mask, 60, 80, 10, 85);

        let err = LargestComponentSelector::default().select(&mask).unwrap_err();
        assert!(matches!(err, EstimationError::NoSubjectDetected(msg) if msg.contains("ambiguous")));
    }

    #[test]
    fn test_rejects_tiny_region() {
        let mut mask = GrayImage::new(100, 100);
        fill(&mut mask, 10, 20, 10, 20);

        let err = LargestComponentSelector::default().select(&mask).unwrap_err();
        assert!(matches!(err, EstimationError::NoSubjectDetected(_)));
    }

    #[test]
    fn test_rejects_empty_mask() {
        let err = LargestComponentSelector::default().select(&GrayImage::new(64, 64)).unwrap_err();
        assert!(matches!(err, EstimationError::NoSubjectDetected(_)));
    }
}
