/// Axis-aligned box over world coordinates. `min` is the top-left corner in
/// screen space (grid x grows right, grid y grows down).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self { min, max }
    }

    /// World rectangle for a `length` x `width` tile grid.
    pub fn from_grid(length: usize, width: usize) -> Self {
        Self::new([0.0, 0.0], [length as f64, width as f64])
    }

    pub fn around(center: [f64; 2], half_extent: f64) -> Self {
        Self::new(
            [center[0] - half_extent, center[1] - half_extent],
            [center[0] + half_extent, center[1] + half_extent],
        )
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// Smaller side; the split-size test uses this so thin boxes stop early.
    pub fn size(&self) -> f64 {
        self.width().min(self.height())
    }

    pub fn center(&self) -> [f64; 2] {
        [
            self.min[0] + self.width() * 0.5,
            self.min[1] + self.height() * 0.5,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }

    /// Closed containment: points on any edge count as inside.
    pub fn contains_point(&self, p: [f64; 2]) -> bool {
        self.min[0] <= p[0] && p[0] <= self.max[0] && self.min[1] <= p[1] && p[1] <= self.max[1]
    }

    /// Closed intersection: boxes that only touch along an edge intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min[0] <= other.max[0]
            && other.min[0] <= self.max[0]
            && self.min[1] <= other.max[1]
            && other.min[1] <= self.max[1]
    }

    pub fn clamp_point(&self, p: [f64; 2]) -> [f64; 2] {
        [
            p[0].clamp(self.min[0], self.max[0]),
            p[1].clamp(self.min[1], self.max[1]),
        ]
    }

    /// The four equal quadrants, ordered top-left, top-right, bottom-left,
    /// bottom-right. Index `i` covers the x half `i & 1` and the y half `i >> 1`.
    pub fn quadrants(&self) -> [Aabb; 4] {
        let [mid_x, mid_y] = self.center();
        [
            Aabb::new(self.min, [mid_x, mid_y]),
            Aabb::new([mid_x, self.min[1]], [self.max[0], mid_y]),
            Aabb::new([self.min[0], mid_y], [mid_x, self.max[1]]),
            Aabb::new([mid_x, mid_y], self.max),
        ]
    }
}

pub fn distance_sq(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

pub fn magnitude(v: [f64; 2]) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// Unit vector along `v`; the zero vector (or anything non-finite) maps to zero.
pub fn normalised(v: [f64; 2]) -> [f64; 2] {
    let len = magnitude(v);
    if len > 0.0 && len.is_finite() {
        [v[0] / len, v[1] / len]
    } else {
        [0.0, 0.0]
    }
}
