//! Orthographic view frame: model space to paper space.

use bimdraw_ir::Camera;

use crate::error::{ProjectionError, Result};
use crate::types::{BoundingBox2D, Point2D, Point3, Vec3};

/// Orthonormal camera frame plus the paper mapping.
///
/// Paper coordinates are millimetres with the origin at the top-left corner
/// of the view and Y growing downwards, ready for SVG.
#[derive(Debug, Clone)]
pub struct ViewFrame {
    origin: Point3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    width: f64,
    height: f64,
    paper_scale: f64,
}

impl ViewFrame {
    /// Build the frame for `camera` at `paper_scale` paper millimetres per model unit.
    pub fn new(camera: &Camera, paper_scale: f64) -> Result<Self> {
        let [lx, ly, lz] = camera.location;
        let [dx, dy, dz] = camera.direction;
        let [ux, uy, uz] = camera.up;

        let forward = Vec3::new(dx, dy, dz)
            .try_normalize(1e-12)
            .ok_or_else(|| ProjectionError::DegenerateCamera("zero view direction".into()))?;
        let up_hint = Vec3::new(ux, uy, uz);

        // right = forward × up, then recompute up to ensure orthogonality
        let right = forward
            .cross(&up_hint)
            .try_normalize(1e-12)
            .ok_or_else(|| {
                ProjectionError::DegenerateCamera("up vector parallel to view direction".into())
            })?;
        let up = right.cross(&forward);

        if !(camera.width > 0.0 && camera.height > 0.0) {
            return Err(ProjectionError::DegenerateCamera(format!(
                "view extent {}x{}",
                camera.width, camera.height
            )));
        }
        if !(paper_scale > 0.0) {
            return Err(ProjectionError::InvalidSettings(format!(
                "paper scale {paper_scale}"
            )));
        }

        Ok(Self {
            origin: Point3::new(lx, ly, lz),
            right,
            up,
            forward,
            width: camera.width,
            height: camera.height,
            paper_scale,
        })
    }

    /// Unit viewing direction.
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Camera position, which is also a point on the cut plane.
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// Paper millimetres per model unit.
    pub fn paper_scale(&self) -> f64 {
        self.paper_scale
    }

    /// Signed distance in front of the cut plane. Negative is behind the camera.
    pub fn depth(&self, p: &Point3) -> f64 {
        (*p - self.origin).dot(&self.forward)
    }

    /// In-plane model coordinates relative to the view centre.
    pub fn to_view(&self, p: &Point3) -> (f64, f64) {
        let d = *p - self.origin;
        (d.dot(&self.right), d.dot(&self.up))
    }

    /// Paper coordinates of a model point.
    pub fn to_paper(&self, p: &Point3) -> Point2D {
        let (u, v) = self.to_view(p);
        Point2D::new(
            (u + self.width / 2.0) * self.paper_scale,
            (self.height / 2.0 - v) * self.paper_scale,
        )
    }

    /// Paper size in millimetres.
    pub fn paper_size(&self) -> (f64, f64) {
        (self.width * self.paper_scale, self.height * self.paper_scale)
    }

    /// The paper rectangle.
    pub fn paper_bounds(&self) -> BoundingBox2D {
        let (w, h) = self.paper_size();
        BoundingBox2D {
            min_x: 0.0,
            min_y: 0.0,
            max_x: w,
            max_y: h,
        }
    }
}

/// Clip a 3D segment to the half-space in front of the cut plane.
///
/// Returns `None` when the segment lies entirely behind the camera.
pub fn clip_to_front(frame: &ViewFrame, a: Point3, b: Point3) -> Option<(Point3, Point3)> {
    let da = frame.depth(&a);
    let db = frame.depth(&b);
    match (da >= 0.0, db >= 0.0) {
        (true, true) => Some((a, b)),
        (false, false) => None,
        _ => {
            let t = da / (da - db);
            let m = a + (b - a) * t;
            if da >= 0.0 {
                Some((a, m))
            } else {
                Some((m, b))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plan_frame() -> ViewFrame {
        let camera = Camera::plan([5.0, 5.0, 3.0], 10.0, 10.0);
        ViewFrame::new(&camera, 10.0).unwrap()
    }

    #[test]
    fn test_plan_paper_mapping() {
        let frame = plan_frame();
        // View centre lands in the middle of a 100x100 mm sheet
        let c = frame.to_paper(&Point3::new(5.0, 5.0, 0.0));
        assert_relative_eq!(c.x, 50.0);
        assert_relative_eq!(c.y, 50.0);

        // North (+Y) is up on paper, so it has a smaller paper Y
        let north = frame.to_paper(&Point3::new(5.0, 9.0, 0.0));
        assert_relative_eq!(north.y, 10.0);
        let east = frame.to_paper(&Point3::new(9.0, 5.0, 0.0));
        assert_relative_eq!(east.x, 90.0);
    }

    #[test]
    fn test_depth_sign() {
        let frame = plan_frame();
        assert!(frame.depth(&Point3::new(0.0, 0.0, 1.0)) > 0.0);
        assert!(frame.depth(&Point3::new(0.0, 0.0, 4.0)) < 0.0);
    }

    #[test]
    fn test_elevation_axes() {
        let camera = Camera::horizontal([0.0, -10.0, 1.0], [0.0, 1.0, 0.0], 4.0, 2.0);
        let frame = ViewFrame::new(&camera, 1.0).unwrap();
        let (u, v) = frame.to_view(&Point3::new(1.0, 0.0, 2.0));
        assert_relative_eq!(u, 1.0);
        assert_relative_eq!(v, 1.0);
    }

    #[test]
    fn test_degenerate_camera() {
        let mut camera = Camera::plan([0.0; 3], 1.0, 1.0);
        camera.up = [0.0, 0.0, 1.0];
        assert!(matches!(
            ViewFrame::new(&camera, 1.0),
            Err(ProjectionError::DegenerateCamera(_))
        ));
        let flat = Camera::plan([0.0; 3], 0.0, 1.0);
        assert!(ViewFrame::new(&flat, 1.0).is_err());
    }

    #[test]
    fn test_clip_to_front() {
        let frame = plan_frame();
        let (a, b) = clip_to_front(
            &frame,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 5.0),
        )
        .unwrap();
        assert_relative_eq!(a.z, 0.0);
        assert_relative_eq!(b.z, 3.0);
        assert!(clip_to_front(&frame, Point3::new(0.0, 0.0, 4.0), Point3::new(1.0, 0.0, 5.0)).is_none());
    }
}
