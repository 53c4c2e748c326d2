//! Mapping platform coordinates into a pixel view.

use crate::types::Point;

/// Margin applied around the data extent when the caller has no preference.
pub const DEFAULT_MARGIN_PERCENT: f64 = 10.0;

/// Affine view fit produced by `fit_view`. The scale is width-driven: data
/// always fills the view width, and the block is centered vertically when
/// its scaled height leaves room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ViewTransform {
    /// Map a data point into view coordinates. The y axis flips so larger
    /// data y draws higher on screen: vy = offset_y + (2*min_y - y) * scale.
    pub fn transform_point(&self, point: Point) -> Point {
        let vx = self.offset_x + (point.x - self.min_x) * self.scale;
        let vy = self.offset_y + (2.0 * self.min_y - point.y) * self.scale;
        Point::new(vx, vy)
    }
}

/// Fit `points` into a view of the given size.
///
/// The margin is added symmetrically around the data extent before scaling.
/// A degenerate axis (single distinct value) is padded by one unit first so
/// the extent never collapses. No points at all yields a fixed fallback
/// transform.
pub fn fit_view(
    points: &[Point],
    view_width: f64,
    view_height: f64,
    margin_percent: f64,
) -> ViewTransform {
    if points.is_empty() {
        return ViewTransform {
            scale: 1.0,
            offset_x: view_width / 2.0,
            offset_y: 0.0,
            min_x: -1.0,
            min_y: -1.0,
            max_x: 1.0,
            max_y: 1.0,
        };
    }

    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    if min_x == max_x {
        min_x -= 1.0;
        max_x += 1.0;
    }
    if min_y == max_y {
        min_y -= 1.0;
        max_y += 1.0;
    }

    let data_width = max_x - min_x;
    let data_height = max_y - min_y;

    let margin_x = data_width * (margin_percent / 100.0);
    let margin_y = data_height * (margin_percent / 100.0);
    min_x -= margin_x;
    max_x += margin_x;
    min_y -= margin_y;
    max_y += margin_y;

    let data_width = max_x - min_x;
    let data_height = max_y - min_y;

    let scale = view_width / data_width;
    let required_height = data_height * scale;
    let offset_x = 0.0;
    let offset_y = if view_height > required_height {
        (view_height - required_height) / 2.0
    } else {
        0.0
    };

    ViewTransform {
        scale,
        offset_x,
        offset_y,
        min_x,
        min_y,
        max_x,
        max_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_the_fixed_fallback() {
        let t = fit_view(&[], 800.0, 600.0, DEFAULT_MARGIN_PERCENT);
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.offset_x, 400.0);
        assert_eq!(t.offset_y, 0.0);
        assert_eq!((t.min_x, t.min_y, t.max_x, t.max_y), (-1.0, -1.0, 1.0, 1.0));
    }

    #[test]
    fn width_is_always_filled() {
        let pts = [Point::new(-10.0, 0.0), Point::new(10.0, 5.0)];
        let t = fit_view(&pts, 400.0, 400.0, 10.0);
        // scaled data width equals the view width
        assert!(((t.max_x - t.min_x) * t.scale - 400.0).abs() < 1e-9);
        assert_eq!(t.offset_x, 0.0);
    }

    #[test]
    fn degenerate_axis_is_padded_before_margining() {
        let pts = [Point::new(3.0, -2.0), Point::new(3.0, 2.0)];
        let t = fit_view(&pts, 100.0, 100.0, 0.0);
        assert_eq!(t.min_x, 2.0);
        assert_eq!(t.max_x, 4.0);
    }

    #[test]
    fn short_data_is_centered_vertically() {
        // wide flat strip: scaled height far below view height
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 1.0)];
        let t = fit_view(&pts, 100.0, 200.0, 0.0);
        let required = (t.max_y - t.min_y) * t.scale;
        assert!(required < 200.0);
        assert!((t.offset_y - (200.0 - required) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn tall_data_pins_to_the_top() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 100.0)];
        let t = fit_view(&pts, 100.0, 50.0, 0.0);
        assert_eq!(t.offset_y, 0.0);
    }

    #[test]
    fn y_axis_flips_in_view_space() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        let t = fit_view(&pts, 100.0, 100.0, 0.0);
        let low = t.transform_point(Point::new(5.0, 0.0));
        let high = t.transform_point(Point::new(5.0, 10.0));
        // larger data y lands at a smaller view y
        assert!(high.y < low.y);
        // pinned formula
        let p = Point::new(5.0, 3.0);
        let v = t.transform_point(p);
        assert!((v.y - (t.offset_y + (2.0 * t.min_y - p.y) * t.scale)).abs() < 1e-12);
    }
}
