use opencv::core::{Point as CvPoint, Rect};
use serde::{Deserialize, Serialize};

/// A pixel coordinate relative to the top-left of a frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offsets this point by `(dx, dy)` saturating at zero.
    pub fn offset(self, dx: i32, dy: i32) -> Point {
        Point {
            x: self.x.saturating_add_signed(dx),
            y: self.y.saturating_add_signed(dy),
        }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<CvPoint> for Point {
    fn from(value: CvPoint) -> Self {
        Self {
            x: value.x.max(0) as u32,
            y: value.y.max(0) as u32,
        }
    }
}

/// An axis-aligned rectangle with non-negative extents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Bounds {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// The point at the horizontal center of the bottom edge.
    pub fn lowest_center_point(&self) -> Point {
        Point::new(self.x + self.w / 2, self.bottom())
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Expands symmetrically by `px` on each side.
    ///
    /// The top-left corner saturates at zero while the bottom-right corner keeps moving outward.
    pub fn grow_by(&self, px: u32) -> Bounds {
        let x = self.x.saturating_sub(px);
        let y = self.y.saturating_sub(px);
        Bounds {
            x,
            y,
            w: self.right().saturating_add(px) - x,
            h: self.bottom().saturating_add(px) - y,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Clips this bounds so it lies within a `width` x `height` frame.
    pub fn clip(&self, width: u32, height: u32) -> Bounds {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Bounds {
            x,
            y,
            w: self.right().min(width) - x,
            h: self.bottom().min(height) - y,
        }
    }
}

impl From<Bounds> for Rect {
    fn from(value: Bounds) -> Self {
        Rect::new(
            value.x as i32,
            value.y as i32,
            value.w as i32,
            value.h as i32,
        )
    }
}

/// The axis to sort and cluster a [`PointCloud`] on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn of(self, point: Point) -> u32 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
        }
    }
}

/// A set of matched pixels under analysis.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct PointCloud {
    points: Vec<Point>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reduces to the smallest [`Bounds`] enclosing every point.
    ///
    /// Returns [`None`] for an empty cloud.
    pub fn to_bounds(&self) -> Option<Bounds> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in &self.points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Some(Bounds::new(
            min_x,
            min_y,
            max_x - min_x + 1,
            max_y - min_y + 1,
        ))
    }

    /// Horizontal pixel extent `max_x - min_x + 1`, or `0` when empty.
    pub fn width(&self) -> u32 {
        self.to_bounds().map(|bounds| bounds.w).unwrap_or_default()
    }

    /// Partitions the cloud along `axis` so every adjacent gap inside a cluster is at most
    /// `threshold` and every gap between clusters is larger.
    pub fn cluster_by_distance(&self, threshold: u32, axis: Axis) -> Vec<PointCloud> {
        let mut sorted = self.points.clone();
        sorted.sort_by_key(|point| axis.of(*point));

        let mut clusters = Vec::<PointCloud>::new();
        let mut last = None::<u32>;
        for point in sorted {
            let value = axis.of(point);
            let within = last.is_some_and(|prev| value - prev <= threshold);
            last = Some(value);
            match clusters.last_mut() {
                Some(cluster) if within => cluster.push(point),
                _ => clusters.push(PointCloud::new(vec![point])),
            }
        }
        clusters
    }
}

impl FromIterator<Point> for PointCloud {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs(cloud: &PointCloud) -> Vec<u32> {
        cloud.points().iter().map(|point| point.x).collect()
    }

    #[test]
    fn cluster_by_distance_splits_on_gap_above_threshold() {
        let cloud = [0, 15, 5, 17, 9]
            .into_iter()
            .map(|x| Point::new(x, 3))
            .collect::<PointCloud>();

        let clusters = cloud.cluster_by_distance(5, Axis::X);

        assert_eq!(clusters.len(), 2);
        assert_eq!(xs(&clusters[0]), vec![0, 5, 9]);
        assert_eq!(xs(&clusters[1]), vec![15, 17]);
    }

    #[test]
    fn cluster_by_distance_gaps_respect_threshold() {
        let cloud = [3, 40, 4, 12, 22, 30, 31, 50, 61]
            .into_iter()
            .map(|y| Point::new(1, y))
            .collect::<PointCloud>();
        let threshold = 8;

        let clusters = cloud.cluster_by_distance(threshold, Axis::Y);
        for cluster in &clusters {
            for pair in cluster.points().windows(2) {
                assert!(pair[1].y - pair[0].y <= threshold);
            }
        }
        for pair in clusters.windows(2) {
            let last = pair[0].points().last().unwrap().y;
            let first = pair[1].points().first().unwrap().y;
            assert!(first - last > threshold);
        }
        assert_eq!(clusters.iter().map(PointCloud::len).sum::<usize>(), 9);
    }

    #[test]
    fn cluster_empty_cloud() {
        assert!(PointCloud::default().cluster_by_distance(5, Axis::X).is_empty());
        assert_eq!(PointCloud::default().to_bounds(), None);
        assert_eq!(PointCloud::default().width(), 0);
    }

    #[test]
    fn to_bounds_and_width() {
        let cloud = PointCloud::new(vec![Point::new(40, 5), Point::new(140, 7), Point::new(90, 6)]);

        assert_eq!(cloud.to_bounds(), Some(Bounds::new(40, 5, 101, 3)));
        assert_eq!(cloud.width(), 101);
    }

    #[test]
    fn bounds_grow_saturates_at_zero() {
        let bounds = Bounds::new(3, 10, 20, 5);

        assert_eq!(bounds.grow_by(5), Bounds::new(0, 5, 28, 15));
    }

    #[test]
    fn bounds_points() {
        let bounds = Bounds::new(100, 200, 50, 20);

        assert_eq!(bounds.center(), Point::new(125, 210));
        assert_eq!(bounds.lowest_center_point(), Point::new(125, 220));
        assert_eq!(bounds.area(), 1000);
        assert!(bounds.contains(Point::new(100, 200)));
        assert!(!bounds.contains(Point::new(150, 210)));
        assert_eq!(bounds.clip(120, 210), Bounds::new(100, 200, 20, 10));
    }

    #[test]
    fn point_offset_and_distance() {
        assert_eq!(Point::new(5, 5).offset(-10, 15), Point::new(0, 20));
        assert_eq!(Point::new(0, 0).distance(Point::new(3, 4)), 5.0);
    }
}
