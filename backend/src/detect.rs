use std::{
    fmt::Debug,
    sync::{Arc, LazyLock},
};

use anyhow::Result;
use log::debug;
#[cfg(test)]
use mockall::automock;
use opencv::{
    core::{
        BORDER_CONSTANT, Mat, MatTraitConst, ModifyInplace, Point as CvPoint, Rect, Scalar, Size,
        ToInputArray, Vector, bitwise_or_def, find_non_zero, in_range,
    },
    imgproc::{
        COLOR_BGRA2BGR, MORPH_CLOSE, MORPH_OPEN, MORPH_RECT, cvt_color_def,
        get_structuring_element_def, morphology_default_border_value, morphology_ex,
    },
};
use strum::Display;

use crate::{
    MarkerDetection, MobDetection, Rgb,
    geometry::{Axis, Bounds, Point, PointCloud},
    mat::OwnedMat,
};

/// Name-plate category of a mob, in decreasing targeting priority.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum MobKind {
    Aggressive,
    Passive,
    Violet,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum TargetKind {
    Mob(MobKind),
    SelectionMarker,
}

/// A detected entity on screen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Target {
    pub kind: TargetKind,
    pub bounds: Bounds,
}

impl Target {
    /// The point to click, `offset` pixels below the bottom center of the name plate.
    pub fn attack_point(&self, offset: i32) -> Point {
        self.bounds.lowest_center_point().offset(0, offset)
    }
}

/// A trait for detecting game information from a captured frame.
///
/// Detection never fails: an absent match yields an empty result.
#[cfg_attr(test, automock)]
pub trait Detector: Debug + Send + Sync {
    /// Width and height of the frame.
    fn size(&self) -> (u32, u32);

    /// Collects every pixel inside `region` within `tolerance` of any of `colors`.
    fn detect_color_points(&self, region: Bounds, colors: &[Rgb], tolerance: u8) -> PointCloud;

    /// Detects mob name plates ordered by [`MobKind`] priority.
    fn detect_mobs(&self, config: &MobDetection) -> Vec<Target>;

    /// Detects the selection marker above the currently selected entity.
    fn detect_marker(&self, config: &MarkerDetection) -> Option<Target>;
}

type MatFn = Box<dyn FnOnce() -> Mat + Send>;

#[derive(Debug)]
pub struct DefaultDetector {
    bgra: Arc<OwnedMat>,
    bgr: LazyLock<Mat, MatFn>,
}

impl DefaultDetector {
    /// Creates a default implementation of [`Detector`] from the given BGRA `mat`.
    pub fn new(mat: OwnedMat) -> Self {
        let bgra = Arc::new(mat);
        let cloned = bgra.clone();
        let bgr = LazyLock::<Mat, MatFn>::new(Box::new(move || to_bgr(&*cloned)));

        Self { bgra, bgr }
    }

    fn bgr(&self) -> &Mat {
        &self.bgr
    }

    /// The search region of the selection marker, the upper-middle part of the screen.
    fn marker_region(&self) -> Bounds {
        let (width, height) = self.size();
        Bounds::new(width / 4, height / 6, width / 2, height / 3)
    }
}

impl Detector for DefaultDetector {
    fn size(&self) -> (u32, u32) {
        self.bgra.size()
    }

    fn detect_color_points(&self, region: Bounds, colors: &[Rgb], tolerance: u8) -> PointCloud {
        let (width, height) = self.size();
        let region = region.clip(width, height);
        if region.area() == 0 || colors.is_empty() {
            return PointCloud::default();
        }

        detect_color_points(self.bgr(), region, colors, tolerance).unwrap_or_else(|err| {
            debug!(target: "detect", "color points detection failed {err}");
            PointCloud::default()
        })
    }

    fn detect_mobs(&self, config: &MobDetection) -> Vec<Target> {
        let (width, height) = self.size();
        let region = Bounds::new(0, 0, width, height.saturating_sub(config.bottom_band));
        if region.area() == 0 {
            return vec![];
        }

        [
            (MobKind::Aggressive, config.aggressive),
            (MobKind::Passive, config.passive),
            (MobKind::Violet, config.violet),
        ]
        .into_iter()
        .flat_map(|(kind, color)| {
            detect_mob_plates(self.bgr(), region, color, config).unwrap_or_else(|err| {
                debug!(target: "detect", "{kind} mobs detection failed {err}");
                vec![]
            })
            .into_iter()
            .map(move |bounds| Target {
                kind: TargetKind::Mob(kind),
                bounds,
            })
        })
        .collect()
    }

    fn detect_marker(&self, config: &MarkerDetection) -> Option<Target> {
        let region = self.marker_region();
        config.colors.iter().find_map(|color| {
            let points =
                self.detect_color_points(region, std::slice::from_ref(color), config.tolerance);
            if points.len() <= config.min_points {
                return None;
            }

            points.to_bounds().map(|bounds| Target {
                kind: TargetKind::SelectionMarker,
                bounds,
            })
        })
    }
}

fn detect_color_points(
    bgr: &Mat,
    region: Bounds,
    colors: &[Rgb],
    tolerance: u8,
) -> Result<PointCloud> {
    let roi = bgr.roi(Rect::from(region))?.clone_pointee();
    let mask = color_mask(&roi, colors, tolerance)?;
    let mut points = Vector::<CvPoint>::new();
    find_non_zero(&mask, &mut points)?;

    Ok(points
        .into_iter()
        .map(|point| Point::from(point).offset(region.x as i32, region.y as i32))
        .collect())
}

/// Finds name plates of `color` in `region` of `bgr`.
///
/// The mask is closed to merge glyphs of one plate then opened to remove isolated noise. The
/// remaining pixels are clustered along x then y and each cluster is filtered by plate size.
fn detect_mob_plates(
    bgr: &Mat,
    region: Bounds,
    color: Rgb,
    config: &MobDetection,
) -> Result<Vec<Bounds>> {
    let roi = bgr.roi(Rect::from(region))?.clone_pointee();
    let mut mask = color_mask(&roi, &[color], config.tolerance)?;
    let size = config.kernel_size.max(1) as i32;
    let kernel = get_structuring_element_def(MORPH_RECT, Size::new(size, size))?;
    let border = morphology_default_border_value()?;
    let anchor = CvPoint::new(-1, -1);
    unsafe {
        // SAFETY: morphology can be called in place.
        mask.modify_inplace(|mat, mat_mut| {
            let _ = morphology_ex(
                mat,
                mat_mut,
                MORPH_CLOSE,
                &kernel,
                anchor,
                config.close_iterations as i32,
                BORDER_CONSTANT,
                border,
            );
        });
        mask.modify_inplace(|mat, mat_mut| {
            let _ = morphology_ex(
                mat,
                mat_mut,
                MORPH_OPEN,
                &kernel,
                anchor,
                config.open_iterations as i32,
                BORDER_CONSTANT,
                border,
            );
        });
    }

    let mut points = Vector::<CvPoint>::new();
    find_non_zero(&mask, &mut points)?;
    let cloud = points
        .into_iter()
        .map(|point| Point::from(point).offset(region.x as i32, region.y as i32))
        .collect::<PointCloud>();

    let plates = cloud
        .cluster_by_distance(config.cluster_gap_x, Axis::X)
        .into_iter()
        .flat_map(|column| column.cluster_by_distance(config.cluster_gap_y, Axis::Y))
        .filter_map(|cluster| cluster.to_bounds())
        .filter(|bounds| is_plate_sized(*bounds, config))
        .filter(|bounds| {
            !config
                .ignore_region
                .contains(Point::new(bounds.x, bounds.y))
        })
        .collect();

    Ok(plates)
}

#[inline]
fn is_plate_sized(bounds: Bounds, config: &MobDetection) -> bool {
    bounds.w > config.min_width
        && bounds.w < config.max_width
        && (config.min_height..=config.max_height).contains(&bounds.h)
}

/// Builds a mask of pixels within `tolerance` of any of `colors` on every channel.
fn color_mask(bgr: &impl ToInputArray, colors: &[Rgb], tolerance: u8) -> Result<Mat> {
    let mut mask = Mat::default();
    for (i, color) in colors.iter().enumerate() {
        let (lower, upper) = color_range(*color, tolerance);
        let mut matched = Mat::default();
        in_range(bgr, &lower, &upper, &mut matched)?;
        if i == 0 {
            mask = matched;
        } else {
            let mut combined = Mat::default();
            bitwise_or_def(&mask, &matched, &mut combined)?;
            mask = combined;
        }
    }
    Ok(mask)
}

/// Inclusive BGR bounds of `color` with `tolerance`.
#[inline]
fn color_range(color: Rgb, tolerance: u8) -> (Scalar, Scalar) {
    let Rgb(r, g, b) = color;
    let lower = |value: u8| value.saturating_sub(tolerance) as f64;
    let upper = |value: u8| value.saturating_add(tolerance) as f64;

    (
        Scalar::new(lower(b), lower(g), lower(r), 0.0),
        Scalar::new(upper(b), upper(g), upper(r), 0.0),
    )
}

/// Converts a BGRA `Mat` image to BGR.
#[inline]
fn to_bgr(mat: &OwnedMat) -> Mat {
    let mut mat = mat.as_mat().clone_pointee();
    unsafe {
        // SAFETY: can be modified inplace
        mat.modify_inplace(|mat, mat_mut| {
            let _ = cvt_color_def(mat, mat_mut, COLOR_BGRA2BGR);
        });
    }
    mat
}

#[cfg(test)]
mod tests {
    use opencv::{
        core::CV_8UC4,
        imgproc::{FILLED, LINE_8, rectangle},
    };

    use super::*;

    const WIDTH: i32 = 800;
    const HEIGHT: i32 = 600;

    fn fill(mat: &mut Mat, rect: Rect, color: Rgb) {
        let Rgb(r, g, b) = color;
        rectangle(
            mat,
            rect,
            Scalar::new(b as f64, g as f64, r as f64, 255.0),
            FILLED,
            LINE_8,
            0,
        )
        .unwrap();
    }

    fn detector(draw: impl FnOnce(&mut Mat)) -> DefaultDetector {
        let black = Scalar::new(0.0, 0.0, 0.0, 255.0);
        let mut mat = Mat::new_rows_cols_with_default(HEIGHT, WIDTH, CV_8UC4, black).unwrap();
        draw(&mut mat);
        DefaultDetector::new(OwnedMat::try_from(&mat).unwrap())
    }

    #[test]
    fn detect_color_points_bar_extent() {
        let detector = detector(|mat| {
            fill(mat, Rect::new(40, 10, 101, 4), Rgb(174, 18, 55));
            fill(mat, Rect::new(300, 10, 20, 4), Rgb(10, 200, 10));
        });

        let points = detector.detect_color_points(
            Bounds::new(0, 0, 400, 20),
            &[Rgb(220, 36, 78), Rgb(176, 17, 56)],
            2,
        );

        assert_eq!(points.len(), 101 * 4);
        assert_eq!(points.width(), 101);
        assert_eq!(points.to_bounds(), Some(Bounds::new(40, 10, 101, 4)));
    }

    #[test]
    fn detect_color_points_outside_frame_is_empty() {
        let detector = detector(|_| ());

        assert!(
            detector
                .detect_color_points(Bounds::new(900, 700, 10, 10), &[Rgb(0, 0, 0)], 0)
                .is_empty()
        );
    }

    #[test]
    fn detect_mobs_filters_and_orders_by_priority() {
        let config = MobDetection::default();
        let detector = detector(|mat| {
            fill(mat, Rect::new(600, 300, 40, 10), config.passive);
            fill(mat, Rect::new(400, 250, 60, 10), config.aggressive);
            fill(mat, Rect::new(200, 400, 30, 8), config.violet);
            // Too small
            fill(mat, Rect::new(100, 300, 8, 8), config.aggressive);
            // Overlaps own resource panel
            fill(mat, Rect::new(20, 20, 60, 10), config.passive);
            // Inside bottom band
            fill(mat, Rect::new(300, 550, 60, 10), config.aggressive);
        });

        let mobs = detector.detect_mobs(&config);

        assert_eq!(
            mobs,
            vec![
                Target {
                    kind: TargetKind::Mob(MobKind::Aggressive),
                    bounds: Bounds::new(400, 250, 60, 10),
                },
                Target {
                    kind: TargetKind::Mob(MobKind::Passive),
                    bounds: Bounds::new(600, 300, 40, 10),
                },
                Target {
                    kind: TargetKind::Mob(MobKind::Violet),
                    bounds: Bounds::new(200, 400, 30, 8),
                },
            ]
        );
        assert_eq!(mobs[0].attack_point(15), Point::new(430, 275));
    }

    #[test]
    fn detect_marker_requires_enough_points() {
        let config = MarkerDetection::default();
        let found = detector(|mat| fill(mat, Rect::new(390, 150, 10, 10), Rgb(131, 148, 205)));
        let sparse = detector(|mat| fill(mat, Rect::new(390, 150, 4, 4), Rgb(246, 90, 106)));

        assert_eq!(
            found.detect_marker(&config),
            Some(Target {
                kind: TargetKind::SelectionMarker,
                bounds: Bounds::new(390, 150, 10, 10),
            })
        );
        assert_eq!(sparse.detect_marker(&config), None);
    }
}
