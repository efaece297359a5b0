//! Rotated box overlap on the ground plane and in 3D.
//!
//! Boxes are reduced to a rotated rectangle on the ground plane (bird's-eye
//! view) plus a vertical interval. Intersection of two rotated rectangles is
//! computed by clipping one against the other (Sutherland-Hodgman) and taking
//! the shoelace area of the result.

use glam::Vec2;

/// Rotated rectangle on the ground plane.
///
/// Coordinates are (x, z); `yaw` is zero when the front axis points at +z
/// and grows toward +x. `half` holds half-extents (along left, along front).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevRect {
    pub center: Vec2,
    pub half: Vec2,
    pub yaw: f32,
}

impl BevRect {
    pub fn new(center: Vec2, half: Vec2, yaw: f32) -> Self {
        Self { center, half, yaw }
    }

    /// Footprint area.
    pub fn area(&self) -> f32 {
        4.0 * self.half.x * self.half.y
    }

    /// Corners in counter-clockwise order.
    pub fn corners(&self) -> [Vec2; 4] {
        let (sin, cos) = self.yaw.sin_cos();
        let left = Vec2::new(cos, -sin);
        let front = Vec2::new(sin, cos);
        let h = self.half;
        [
            self.center + left * h.x + front * h.y,
            self.center - left * h.x + front * h.y,
            self.center - left * h.x - front * h.y,
            self.center + left * h.x - front * h.y,
        ]
    }
}

/// Signed area of a polygon (positive when counter-clockwise).
fn signed_area(poly: &[Vec2]) -> f32 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

/// Clip a convex polygon against one half-plane: keep points on the left of
/// the directed edge a -> b.
fn clip_edge(poly: &[Vec2], a: Vec2, b: Vec2) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    let edge = b - a;
    let n = poly.len();
    for i in 0..n {
        let cur = poly[i];
        let next = poly[(i + 1) % n];
        let cur_in = edge.perp_dot(cur - a) >= 0.0;
        let next_in = edge.perp_dot(next - a) >= 0.0;
        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in {
            // Edge crossing: interpolate the intersection point.
            let d = next - cur;
            let denom = edge.perp_dot(d);
            if denom.abs() > f32::EPSILON {
                let t = edge.perp_dot(a - cur) / denom;
                out.push(cur + d * t);
            }
        }
    }
    out
}

/// Area of the intersection of two rotated rectangles.
pub fn intersection_area(a: &BevRect, b: &BevRect) -> f32 {
    let clip = b.corners();
    let mut poly: Vec<Vec2> = a.corners().to_vec();
    for i in 0..4 {
        if poly.len() < 3 {
            return 0.0;
        }
        poly = clip_edge(&poly, clip[i], clip[(i + 1) % 4]);
    }
    signed_area(&poly).abs()
}

/// Intersection over union of two ground-plane footprints.
pub fn iou_bev(a: &BevRect, b: &BevRect) -> f32 {
    let inter = intersection_area(a, b);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Intersection over union of two boxes in full 3D.
///
/// `ay` and `by` are the vertical (min, max) intervals of the boxes.
pub fn iou_3d(a: &BevRect, ay: (f32, f32), b: &BevRect, by: (f32, f32)) -> f32 {
    let inter_area = intersection_area(a, b);
    let y_overlap = (ay.1.min(by.1) - ay.0.max(by.0)).max(0.0);
    let inter = inter_area * y_overlap;
    let vol_a = a.area() * (ay.1 - ay.0);
    let vol_b = b.area() * (by.1 - by.0);
    let union = vol_a + vol_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(cx: f32, cz: f32, hw: f32, hd: f32, yaw: f32) -> BevRect {
        BevRect::new(Vec2::new(cx, cz), Vec2::new(hw, hd), yaw)
    }

    #[test]
    fn identical_rects_have_iou_one() {
        let a = rect(0.0, 0.0, 1.0, 2.0, 0.3);
        assert!((iou_bev(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn disjoint_rects_have_iou_zero() {
        let a = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = rect(10.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(iou_bev(&a, &b), 0.0);
    }

    #[test]
    fn axis_aligned_half_overlap() {
        // Two 2x2 squares offset by 1 along x: intersection 2, union 6.
        let a = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = rect(1.0, 0.0, 1.0, 1.0, 0.0);
        assert!((intersection_area(&a, &b) - 2.0).abs() < 1e-5);
        assert!((iou_bev(&a, &b) - 2.0 / 6.0).abs() < 1e-5);
    }

    #[test]
    fn quarter_turn_of_a_square_is_identity() {
        let a = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = rect(0.0, 0.0, 1.0, 1.0, std::f32::consts::FRAC_PI_2);
        assert!((iou_bev(&a, &b) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rotated_diamond_over_square() {
        // Unit square vs the same square rotated 45 degrees: the
        // intersection is a regular octagon with area 8*(sqrt(2)-1).
        let a = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        let b = rect(0.0, 0.0, 1.0, 1.0, std::f32::consts::FRAC_PI_4);
        let expected = 8.0 * (std::f32::consts::SQRT_2 - 1.0);
        assert!((intersection_area(&a, &b) - expected).abs() < 1e-3);
    }

    #[test]
    fn full_3d_iou_accounts_for_height() {
        let a = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        // Same footprint, half the height overlapping.
        let v = iou_3d(&a, (0.0, 2.0), &a, (1.0, 3.0));
        // inter = 4*1, union = 8+8-4 = 12.
        assert!((v - 4.0 / 12.0).abs() < 1e-5);
    }

    #[test]
    fn non_overlapping_heights_give_zero() {
        let a = rect(0.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(iou_3d(&a, (0.0, 1.0), &a, (2.0, 3.0)), 0.0);
    }
}
