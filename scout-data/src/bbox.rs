//! Oriented 3D bounding boxes for object detection.

use glam::Vec3;
use std::fmt;

/// Unique identifier for a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(u64);

impl BoxId {
    /// Wrap a caller-chosen raw identifier.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box:{}", self.0)
    }
}

/// Allocates sequential box identifiers.
///
/// Identifiers are unique per generator, not per process. Callers that need
/// globally-unique ids should share one generator.
#[derive(Debug)]
pub struct BoxIdGen {
    next: u64,
}

impl BoxIdGen {
    /// Create a generator starting at id 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next identifier.
    pub fn next_id(&mut self) -> BoxId {
        let id = BoxId(self.next);
        self.next += 1;
        id
    }
}

impl Default for BoxIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// An oriented 3D bounding box.
///
/// `front`, `up` and `left` define the axes of the box and must be normalized
/// and mutually orthogonal; constructors do not validate this. `size` is
/// (width, height, depth) measured edge to edge along `left`, `up` and
/// `front` respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox3d {
    /// Center of the box in world space.
    pub center: Vec3,
    /// Normalized front direction.
    pub front: Vec3,
    /// Normalized up direction.
    pub up: Vec3,
    /// Normalized left direction.
    pub left: Vec3,
    /// (width, height, depth) along (left, up, front).
    pub size: Vec3,
    /// Classification label.
    pub label_class: i32,
    /// Confidence of the detection (ground truth uses 1.0).
    pub confidence: f32,
    /// Optional user-defined metadata.
    pub meta: Option<String>,
    /// Unique identifier.
    pub id: BoxId,
}

impl BoundingBox3d {
    /// Create a bounding box with an explicit orientation basis.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        center: Vec3,
        front: Vec3,
        up: Vec3,
        left: Vec3,
        size: Vec3,
        label_class: i32,
        confidence: f32,
        id: BoxId,
    ) -> Self {
        Self {
            center,
            front,
            up,
            left,
            size,
            label_class,
            confidence,
            meta: None,
            id,
        }
    }

    /// Create an axis-aligned box (front = +Z, up = +Y, left = +X).
    pub fn axis_aligned(center: Vec3, size: Vec3, label_class: i32, confidence: f32, id: BoxId) -> Self {
        Self::new(center, Vec3::Z, Vec3::Y, Vec3::X, size, label_class, confidence, id)
    }

    /// Attach a metadata string.
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Heading angle of the front vector around the world up axis, in radians.
    ///
    /// Zero when the box faces +Z; positive toward +X.
    pub fn yaw(&self) -> f32 {
        self.front.x.atan2(self.front.z)
    }

    /// Width of the box (extent along `left`).
    pub fn width(&self) -> f32 {
        self.size.x
    }

    /// Height of the box (extent along `up`).
    pub fn height(&self) -> f32 {
        self.size.y
    }

    /// Depth of the box (extent along `front`).
    pub fn depth(&self) -> f32 {
        self.size.z
    }

    /// Volume of the box.
    pub fn volume(&self) -> f32 {
        self.size.x * self.size.y * self.size.z
    }
}

impl fmt::Display for BoundingBox3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (class={}, conf={}",
            self.id, self.label_class, self.confidence
        )?;
        if let Some(meta) = &self.meta {
            write!(f, ", meta={meta}")?;
        }
        write!(f, ")")
    }
}
