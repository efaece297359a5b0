//! Wireframe geometry for rendering bounding boxes.
//!
//! Produces plain CPU-side line sets; uploading them to a renderer is the
//! caller's concern.

use crate::bbox::BoundingBox3d;
use glam::Vec3;

/// Vertices allocated per box. The first eight are the corners, vertex 8 is
/// the front-face center used as the heading-arrow anchor; the remainder are
/// reserved for arrow geometry.
pub const VERTS_PER_BOX: usize = 14;
/// Edges per box (the twelve box edges).
pub const LINES_PER_BOX: usize = 12;

/// Default per-box color palette, cycled when no lookup table is given.
pub const PALETTE: [[f32; 3]; 34] = [
    [0.0, 0.0, 0.0],
    [0.960_784_31, 0.588_235_29, 0.392_156_86],
    [0.960_784_31, 0.901_960_78, 0.392_156_86],
    [0.588_235_29, 0.235_294_12, 0.117_647_06],
    [0.705_882_35, 0.117_647_06, 0.313_725_49],
    [1.0, 0.0, 0.0],
    [0.117_647_06, 0.117_647_06, 1.0],
    [0.784_313_73, 0.156_862_75, 1.0],
    [0.352_941_18, 0.117_647_06, 0.588_235_29],
    [1.0, 0.0, 1.0],
    [1.0, 0.588_235_29, 1.0],
    [0.294_117_65, 0.0, 0.294_117_65],
    [0.294_117_65, 0.0, 0.686_274_51],
    [0.0, 0.784_313_73, 1.0],
    [0.196_078_43, 0.470_588_24, 1.0],
    [0.0, 0.686_274_51, 0.0],
    [0.0, 0.235_294_12, 0.529_411_76],
    [0.313_725_49, 0.941_176_47, 0.588_235_29],
    [0.588_235_29, 0.941_176_47, 1.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.25],
    [0.5, 1.0, 0.25],
    [0.25, 1.0, 0.25],
    [0.25, 1.0, 0.5],
    [0.25, 1.0, 1.25],
    [0.25, 0.5, 1.25],
    [0.25, 0.25, 1.0],
    [0.125, 0.125, 0.125],
    [0.25, 0.25, 0.25],
    [0.375, 0.375, 0.375],
    [0.5, 0.5, 0.5],
    [0.625, 0.625, 0.625],
    [0.75, 0.75, 0.75],
    [0.875, 0.875, 0.875],
];

/// A renderable set of line segments.
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    /// Vertex positions.
    pub points: Vec<Vec3>,
    /// Pairs of vertex indices, one per segment.
    pub lines: Vec<[u32; 2]>,
    /// Per-segment RGB color.
    pub colors: Vec<Vec3>,
}

impl LineSet {
    /// Build the wireframes for a list of boxes.
    ///
    /// `lut` maps box index to color; it is used only when it covers every
    /// box, otherwise colors cycle through [`PALETTE`] keyed by the box's
    /// class label.
    pub fn from_boxes(boxes: &[BoundingBox3d], lut: Option<&[Vec3]>) -> Self {
        let mut points = vec![Vec3::ZERO; VERTS_PER_BOX * boxes.len()];
        let mut lines = Vec::with_capacity(LINES_PER_BOX * boxes.len());
        let mut colors = Vec::with_capacity(LINES_PER_BOX * boxes.len());

        for (i, b) in boxes.iter().enumerate() {
            let pidx = VERTS_PER_BOX * i;
            let x = 0.5 * b.size.x * b.left;
            let y = 0.5 * b.size.y * b.up;
            let z = 0.5 * b.size.z * b.front;
            points[pidx] = b.center + x + y + z;
            points[pidx + 1] = b.center - x + y + z;
            points[pidx + 2] = b.center - x + y - z;
            points[pidx + 3] = b.center + x + y - z;
            points[pidx + 4] = b.center + x - y + z;
            points[pidx + 5] = b.center - x - y + z;
            points[pidx + 6] = b.center - x - y - z;
            points[pidx + 7] = b.center + x - y - z;
            points[pidx + 8] = b.center + z;
        }

        for (i, b) in boxes.iter().enumerate() {
            let p = (VERTS_PER_BOX * i) as u32;
            let edges = [
                [p, p + 1],
                [p + 1, p + 2],
                [p + 2, p + 3],
                [p + 3, p],
                [p + 4, p + 5],
                [p + 5, p + 6],
                [p + 6, p + 7],
                [p + 7, p + 4],
                [p, p + 4],
                [p + 1, p + 5],
                [p + 2, p + 6],
                [p + 3, p + 7],
            ];
            let color = match lut {
                Some(lut) if lut.len() == boxes.len() => lut[i],
                _ => {
                    let c = PALETTE[b.label_class.unsigned_abs() as usize % PALETTE.len()];
                    Vec3::from_array(c)
                }
            };
            for edge in edges {
                lines.push(edge);
                colors.push(color);
            }
        }

        Self {
            points,
            lines,
            colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoxIdGen;

    fn unit_box(ids: &mut BoxIdGen) -> BoundingBox3d {
        BoundingBox3d::axis_aligned(Vec3::ZERO, Vec3::ONE, 1, 1.0, ids.next_id())
    }

    #[test]
    fn counts_per_box() {
        let mut ids = BoxIdGen::new();
        let boxes = vec![unit_box(&mut ids), unit_box(&mut ids)];
        let ls = LineSet::from_boxes(&boxes, None);
        assert_eq!(ls.points.len(), 2 * VERTS_PER_BOX);
        assert_eq!(ls.lines.len(), 2 * LINES_PER_BOX);
        assert_eq!(ls.colors.len(), 2 * LINES_PER_BOX);
    }

    #[test]
    fn corner_positions_of_unit_box() {
        let mut ids = BoxIdGen::new();
        let ls = LineSet::from_boxes(&[unit_box(&mut ids)], None);
        assert_eq!(ls.points[0], Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(ls.points[6], Vec3::new(-0.5, -0.5, -0.5));
        // Heading anchor sits on the front face center.
        assert_eq!(ls.points[8], Vec3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn lut_overrides_palette() {
        let mut ids = BoxIdGen::new();
        let boxes = vec![unit_box(&mut ids)];
        let lut = vec![Vec3::new(0.1, 0.2, 0.3)];
        let ls = LineSet::from_boxes(&boxes, Some(&lut));
        assert!(ls.colors.iter().all(|c| *c == Vec3::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn short_lut_falls_back_to_palette() {
        let mut ids = BoxIdGen::new();
        let boxes = vec![unit_box(&mut ids), unit_box(&mut ids)];
        let lut = vec![Vec3::ONE];
        let ls = LineSet::from_boxes(&boxes, Some(&lut));
        let expected = Vec3::from_array(PALETTE[1]);
        assert_eq!(ls.colors[0], expected);
    }
}
