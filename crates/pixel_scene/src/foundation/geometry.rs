//! Culling geometry
//!
//! Bounding boxes, planes, plane sets (view frustums), convex polygons and
//! screen-space rectangles used by the visibility query and the render passes.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{transform_point, Mat4, Vec2, Vec3, Vec4};

/// Tolerance used by the plane side classification.
///
/// Kept at the value the polygon and plane side tests historically used. It is
/// tighter than `f32::EPSILON`-scaled tolerances used elsewhere, so portals lying
/// almost exactly on the camera position may flip sides between frames.
pub const PLANE_EPSILON: f32 = 0.000_01;

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Degenerate box containing a single point
    pub fn point(point: Vec3) -> Self {
        Self { min: point, max: point }
    }

    /// Smallest box enclosing all points, `None` for an empty iterator
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::point(first), |aabb, p| aabb.union(&Self::point(*p))))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Check if this AABB intersects a sphere
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = Vec3::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
            center.z.clamp(self.min.z, self.max.z),
        );
        (closest - center).magnitude_squared() <= radius * radius
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing this box after transforming it by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let corners = self.corners().map(|c| transform_point(matrix, &c));
        Self::from_points(corners.iter()).unwrap_or(*self)
    }
}

/// Classification of a point against a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Point lies on the side the normal points to
    InFront,
    /// Point lies on the opposite side
    Behind,
    /// Point lies on the plane (within [`PLANE_EPSILON`])
    Coinciding,
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Plane through three points, normal following the right-hand rule (a, b, c)
    pub fn from_points(a: &Vec3, b: &Vec3, c: &Vec3) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            return None;
        }
        let normal = normal / length;
        Some(Self { normal, distance: -normal.dot(a) })
    }

    /// Plane from the `(a, b, c, d)` coefficients of `ax + by + cz + d = 0`
    pub fn from_coefficients(coefficients: &Vec4) -> Option<Self> {
        let normal = coefficients.xyz();
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            return None;
        }
        Some(Self { normal: normal / length, distance: coefficients.w / length })
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Classify a point against this plane
    pub fn side(&self, point: Vec3) -> Side {
        let distance = self.distance_to_point(point);
        if distance > PLANE_EPSILON {
            Side::InFront
        } else if distance < -PLANE_EPSILON {
            Side::Behind
        } else {
            Side::Coinciding
        }
    }

    /// Same plane with the opposite orientation
    pub fn flipped(&self) -> Self {
        Self { normal: -self.normal, distance: -self.distance }
    }

    /// Plane after mapping space by `matrix` (points transform as `matrix * p`)
    pub fn transformed(&self, matrix: &Mat4) -> Option<Self> {
        let inverse_transpose = matrix.try_inverse()?.transpose();
        self.transformed_by_inverse_transpose(&inverse_transpose)
    }

    fn transformed_by_inverse_transpose(&self, inverse_transpose: &Mat4) -> Option<Self> {
        let coefficients = Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.distance);
        Self::from_coefficients(&(inverse_transpose * coefficients))
    }
}

/// Bit mask of the planes of a [`PlaneSet`] a volume straddles
pub type ClipMask = u32;

/// Ordered set of inward facing planes, usually a view frustum
///
/// Index [`PlaneSet::NEAR`] is the near plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaneSet {
    planes: Vec<Plane>,
}

impl PlaneSet {
    /// Index of the near plane
    pub const NEAR: usize = 0;

    /// Create a plane set from planes, the first one being the near plane
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    /// Extract the six frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for OpenGL style clip space (`-w <= z <= w`).
    /// Plane order: near, far, left, right, bottom, top.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row = |i: usize| {
            Vec4::new(
                view_projection[(i, 0)],
                view_projection[(i, 1)],
                view_projection[(i, 2)],
                view_projection[(i, 3)],
            )
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let coefficients = [r3 + r2, r3 - r2, r3 + r0, r3 - r0, r3 + r1, r3 - r1];
        Self {
            planes: coefficients.iter().filter_map(Plane::from_coefficients).collect(),
        }
    }

    /// Build view planes from the camera through a convex polygon
    ///
    /// The near plane is the polygon plane, oriented so the eye lies behind it;
    /// then one side plane per polygon edge, all facing the polygon interior.
    /// Returns `None` for fewer than three vertices or when the eye lies on the
    /// polygon plane.
    pub fn create_view_planes(vertices: &[Vec3], eye: &Vec3) -> Option<Self> {
        let polygon = Polygon::new(vertices.to_vec());
        let mut near = polygon.plane()?;
        match near.side(*eye) {
            Side::Coinciding => return None,
            Side::InFront => near = near.flipped(),
            Side::Behind => {}
        }

        let centroid = polygon.centroid()?;
        let mut planes = Vec::with_capacity(vertices.len() + 1);
        planes.push(near);
        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            let Some(plane) = Plane::from_points(eye, a, b) else {
                continue;
            };
            let plane = if plane.distance_to_point(centroid) < 0.0 { plane.flipped() } else { plane };
            planes.push(plane);
        }
        if planes.len() < 4 {
            return None;
        }
        Some(Self { planes })
    }

    /// Planes of this set
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Number of planes
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Whether the set has no planes (such a set contains everything)
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Test a box against the set
    ///
    /// Returns `None` when the box is completely outside one plane. Otherwise
    /// bit `i` of the mask is set when the box straddles plane `i`; a zero mask
    /// means the box is completely inside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<ClipMask> {
        let mut mask = 0;
        for (i, plane) in self.planes.iter().enumerate() {
            // Corner furthest along the normal
            let mut p = aabb.min;
            let mut n = aabb.max;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; n.x = aabb.min.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; n.y = aabb.min.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; n.z = aabb.min.z; }

            if plane.distance_to_point(p) < 0.0 {
                return None;
            }
            if plane.distance_to_point(n) < 0.0 && i < 32 {
                mask |= 1 << i;
            }
        }
        Some(mask)
    }

    /// Test a sphere against the set
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(center) >= -radius)
    }

    /// Whether the convex hull of `points` may reach into the set
    ///
    /// Only rejects when every point lies behind one and the same plane.
    pub fn intersects_points(&self, points: &[Vec3]) -> bool {
        !points.is_empty()
            && self
                .planes
                .iter()
                .all(|plane| points.iter().any(|point| plane.distance_to_point(*point) >= 0.0))
    }

    /// Plane set after mapping space by `matrix`
    ///
    /// Returns `None` if the matrix is not invertible.
    pub fn transformed(&self, matrix: &Mat4) -> Option<Self> {
        let inverse_transpose = matrix.try_inverse()?.transpose();
        let planes = self
            .planes
            .iter()
            .map(|plane| plane.transformed_by_inverse_transpose(&inverse_transpose))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { planes })
    }
}

/// Planar convex polygon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Vec3>,
}

impl Polygon {
    /// Create a polygon from its vertices in winding order
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// Axis aligned rectangle in the local XY plane, facing +Z (counter-clockwise)
    pub fn rectangle_xy(half_width: f32, half_height: f32) -> Self {
        Self::new(vec![
            Vec3::new(-half_width, -half_height, 0.0),
            Vec3::new(half_width, -half_height, 0.0),
            Vec3::new(half_width, half_height, 0.0),
            Vec3::new(-half_width, half_height, 0.0),
        ])
    }

    /// Vertices in winding order
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the polygon has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Average of the vertices
    pub fn centroid(&self) -> Option<Vec3> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self.vertices.iter().fold(Vec3::zeros(), |acc, v| acc + v);
        Some(sum / self.vertices.len() as f32)
    }

    /// Supporting plane (Newell's method), normal by the right-hand rule
    pub fn plane(&self) -> Option<Plane> {
        if self.vertices.len() < 3 {
            return None;
        }
        let mut normal = Vec3::zeros();
        for (i, current) in self.vertices.iter().enumerate() {
            let next = &self.vertices[(i + 1) % self.vertices.len()];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            return None;
        }
        let normal = normal / length;
        let centroid = self.centroid()?;
        Some(Plane { normal, distance: -normal.dot(&centroid) })
    }

    /// Clip the polygon, keeping the part in front of (or on) the plane
    pub fn clip(&self, plane: &Plane) -> Polygon {
        let mut clipped = Vec::with_capacity(self.vertices.len() + 1);
        for (i, current) in self.vertices.iter().enumerate() {
            let next = &self.vertices[(i + 1) % self.vertices.len()];
            let dc = plane.distance_to_point(*current);
            let dn = plane.distance_to_point(*next);
            if dc >= 0.0 {
                clipped.push(*current);
            }
            if (dc >= 0.0) != (dn >= 0.0) {
                let t = dc / (dc - dn);
                clipped.push(current + (next - current) * t);
            }
        }
        Polygon { vertices: clipped }
    }

    /// Whether every vertex lies behind the plane
    pub fn is_behind(&self, plane: &Plane) -> bool {
        !self.vertices.is_empty()
            && self.vertices.iter().all(|v| plane.side(*v) == Side::Behind)
    }

    /// Polygon with every vertex transformed by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Polygon {
        Polygon {
            vertices: self.vertices.iter().map(|v| transform_point(matrix, v)).collect(),
        }
    }

    /// Bounding box of the vertices
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter())
    }
}

/// Screen-space rectangle in pixels, origin at the top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub min: Vec2,
    /// Bottom-right corner
    pub max: Vec2,
}

impl Default for Rect {
    fn default() -> Self {
        Self { min: Vec2::zeros(), max: Vec2::zeros() }
    }
}

impl Rect {
    /// Create a rectangle from its corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create a rectangle from position and size
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { min: Vec2::new(x, y), max: Vec2::new(x + width, y + height) }
    }

    /// Width, never negative
    pub fn width(&self) -> f32 {
        (self.max.x - self.min.x).max(0.0)
    }

    /// Height, never negative
    pub fn height(&self) -> f32 {
        (self.max.y - self.min.y).max(0.0)
    }

    /// Whether the rectangle covers no area
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Intersection with another rectangle (may be empty)
    pub fn clip_by(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.sup(&other.min),
            max: self.max.inf(&other.max),
        }
    }

    /// Grow the rectangle by `amount` on every side
    pub fn expand(&self, amount: f32) -> Rect {
        Rect {
            min: self.min.add_scalar(-amount),
            max: self.max.add_scalar(amount),
        }
    }

    /// Screen rectangle covered by the projected vertices
    ///
    /// `model_view_projection` maps the vertices into clip space. If any vertex
    /// lies behind the eye the projection is unbounded and the whole viewport
    /// is returned.
    pub fn screen_rectangle(vertices: &[Vec3], model_view_projection: &Mat4, viewport: &Rect) -> Rect {
        let mut min = Vec2::new(f32::MAX, f32::MAX);
        let mut max = Vec2::new(f32::MIN, f32::MIN);
        if vertices.is_empty() {
            return Rect::default();
        }
        for vertex in vertices {
            let clip = model_view_projection * Vec4::new(vertex.x, vertex.y, vertex.z, 1.0);
            if clip.w <= PLANE_EPSILON {
                return *viewport;
            }
            let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
            let screen = Vec2::new(
                viewport.min.x + (ndc.x * 0.5 + 0.5) * viewport.width(),
                viewport.min.y + (0.5 - ndc.y * 0.5) * viewport.height(),
            );
            min = min.inf(&screen);
            max = max.sup(&screen);
        }
        Rect { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_frustum() -> PlaneSet {
        let view = Mat4::look_at_rh(
            &Vec3::new(0.0, 0.0, -5.0).into(),
            &Vec3::new(0.0, 0.0, 5.0).into(),
            &Vec3::y(),
        );
        let projection = Mat4::new_perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 100.0);
        PlaneSet::from_view_projection(&(projection * view))
    }

    #[test]
    fn test_frustum_against_points() {
        let frustum = test_frustum();
        let ahead = [Vec3::new(-20.0, 0.0, 5.0), Vec3::new(20.0, 0.0, 5.0)];
        assert!(frustum.intersects_points(&ahead));

        let behind = [Vec3::new(0.0, 0.0, -6.0), Vec3::new(3.0, 3.0, -7.0)];
        assert!(!frustum.intersects_points(&behind));
        assert!(!frustum.intersects_points(&[]));
    }

    #[test]
    fn test_aabb_transformed_by_translation() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let moved = aabb.transformed(&Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0)));
        assert_relative_eq!(moved.min, Vec3::new(9.0, -1.0, -1.0));
        assert_relative_eq!(moved.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_aabb_sphere_intersection() {
        let aabb = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        assert!(aabb.intersects_sphere(Vec3::new(1.4, 0.5, 0.5), 0.5));
        assert!(!aabb.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 0.5));
    }

    #[test]
    fn test_frustum_classifies_boxes() {
        let frustum = test_frustum();
        assert_eq!(frustum.len(), 6);

        let ahead = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(frustum.intersects_aabb(&ahead), Some(0));

        let behind = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -20.0), Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(frustum.intersects_aabb(&behind), None);

        let around_eye = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 1.0, 1.0));
        let mask = frustum.intersects_aabb(&around_eye).unwrap();
        assert_ne!(mask & (1 << PlaneSet::NEAR), 0);
    }

    #[test]
    fn test_plane_set_transform_follows_points() {
        let frustum = test_frustum();
        let shift = Mat4::new_translation(&Vec3::new(100.0, 0.0, 0.0));
        let moved = frustum.transformed(&shift).unwrap();

        let ahead = Aabb::from_center_extents(Vec3::new(100.0, 0.0, 5.0), Vec3::new(0.5, 0.5, 0.5));
        assert!(moved.intersects_aabb(&ahead).is_some());
        let old_place = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.5, 0.5, 0.5));
        assert!(moved.intersects_aabb(&old_place).is_none());
    }

    #[test]
    fn test_polygon_clip_halves_square() {
        let square = Polygon::rectangle_xy(1.0, 1.0);
        let plane = Plane::new(Vec3::x(), 0.0);
        let clipped = square.clip(&plane);

        assert_eq!(clipped.len(), 4);
        assert!(clipped.vertices().iter().all(|v| v.x >= -1e-6));
        assert!(square.clip(&plane.flipped()).vertices().iter().all(|v| v.x <= 1e-6));
    }

    #[test]
    fn test_polygon_plane_and_behind() {
        let square = Polygon::rectangle_xy(1.0, 1.0);
        let plane = square.plane().unwrap();
        assert_relative_eq!(plane.normal, Vec3::z());
        assert_eq!(plane.side(Vec3::new(0.0, 0.0, 2.0)), Side::InFront);
        assert_eq!(plane.side(Vec3::new(0.0, 0.0, 0.0)), Side::Coinciding);

        let far_plane = Plane::new(Vec3::z(), -5.0);
        assert!(square.is_behind(&far_plane));
        assert!(!square.is_behind(&far_plane.flipped()));
    }

    #[test]
    fn test_view_planes_through_window() {
        let window = Polygon::rectangle_xy(1.0, 1.0);
        let eye = Vec3::new(0.0, 0.0, -5.0);
        let planes = PlaneSet::create_view_planes(window.vertices(), &eye).unwrap();
        assert_eq!(planes.len(), 5);

        // Straight behind the window
        let seen = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.1, 0.1, 0.1));
        assert!(planes.intersects_aabb(&seen).is_some());
        // Off to the side, hidden by the wall around the window
        let hidden = Aabb::from_center_extents(Vec3::new(8.0, 0.0, 5.0), Vec3::new(0.1, 0.1, 0.1));
        assert!(planes.intersects_aabb(&hidden).is_none());
        // Between the eye and the window
        let in_front = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.1, 0.1, 0.1));
        assert!(planes.intersects_aabb(&in_front).is_none());
    }

    #[test]
    fn test_view_planes_reject_eye_on_polygon_plane() {
        let window = Polygon::rectangle_xy(1.0, 1.0);
        assert!(PlaneSet::create_view_planes(window.vertices(), &Vec3::new(3.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_rect_clip_and_expand() {
        let a = Rect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let b = Rect::from_xywh(50.0, 50.0, 100.0, 100.0);
        let c = a.clip_by(&b);
        assert_relative_eq!(c.width(), 50.0);
        assert_relative_eq!(c.height(), 50.0);

        let disjoint = a.clip_by(&Rect::from_xywh(200.0, 0.0, 10.0, 10.0));
        assert!(disjoint.is_empty());

        let grown = c.expand(1.0);
        assert_relative_eq!(grown.width(), 52.0);
    }

    #[test]
    fn test_screen_rectangle_of_centered_window() {
        let view = Mat4::look_at_rh(
            &Vec3::new(0.0, 0.0, -5.0).into(),
            &Vec3::new(0.0, 0.0, 5.0).into(),
            &Vec3::y(),
        );
        let projection = Mat4::new_perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 100.0);
        let viewport = Rect::from_xywh(0.0, 0.0, 800.0, 800.0);
        let window = Polygon::rectangle_xy(1.0, 1.0);

        let rect = Rect::screen_rectangle(window.vertices(), &(projection * view), &viewport);
        assert_relative_eq!(rect.min, Vec2::new(320.0, 320.0), epsilon = 1e-2);
        assert_relative_eq!(rect.max, Vec2::new(480.0, 480.0), epsilon = 1e-2);
    }
}
