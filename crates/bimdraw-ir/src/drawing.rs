//! Drawing definition: target view, camera, scale, and style.

use serde::{Deserialize, Serialize};

use crate::element::Guid;
use crate::error::{IrError, Result};
use crate::units::LengthUnit;

/// Drafting convention a drawing (or context) targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetView {
    /// Floor plan, looking down.
    PlanView,
    /// Reflected ceiling plan, looking up.
    ReflectedPlanView,
    /// Vertical cut.
    SectionView,
    /// Uncut exterior view.
    ElevationView,
    /// General 3D model view; also the fallback tag on contexts.
    ModelView,
    /// Graph, sketch, user-defined, ... Never matches a drawing.
    #[serde(other)]
    Other,
}

impl TargetView {
    /// Plan-like views prefer plan drafting contexts.
    pub fn is_plan(self) -> bool {
        matches!(self, TargetView::PlanView | TargetView::ReflectedPlanView)
    }
}

/// Drawing scale as shown to humans and as a numeric ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingScale {
    /// Label printed on the drawing, e.g. `1:100` or `NTS`.
    pub human: String,
    /// Paper length per real length, e.g. `0.01` for 1:100.
    pub ratio: f64,
}

impl DrawingScale {
    /// Parse the `"<label>|<numerator>/<denominator>"` notation.
    ///
    /// ```
    /// use bimdraw_ir::DrawingScale;
    /// let scale = DrawingScale::parse("1:50|1/50").unwrap();
    /// assert_eq!(scale.human, "1:50");
    /// assert!((scale.ratio - 0.02).abs() < 1e-12);
    /// ```
    pub fn parse(notation: &str) -> Result<Self> {
        let invalid = || IrError::InvalidScale(notation.to_string());
        let (human, fraction) = notation.split_once('|').ok_or_else(invalid)?;
        let (num, den) = fraction.split_once('/').ok_or_else(invalid)?;
        let num: f64 = num.trim().parse().map_err(|_| invalid())?;
        let den: f64 = den.trim().parse().map_err(|_| invalid())?;
        if den == 0.0 || num <= 0.0 {
            return Err(invalid());
        }
        Ok(Self {
            human: human.trim().to_string(),
            ratio: num / den,
        })
    }

    /// Same ratio, labelled "not to scale".
    pub fn not_to_scale(mut self) -> Self {
        self.human = "NTS".to_string();
        self
    }
}

impl Default for DrawingScale {
    fn default() -> Self {
        Self {
            human: "1:100".to_string(),
            ratio: 0.01,
        }
    }
}

/// How the external renderer produced the underlay raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderType {
    /// Full render engine output.
    #[default]
    Default,
    /// Viewport (OpenGL) capture.
    Viewport,
}

/// Rendering options for a drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingStyle {
    /// Style name.
    pub name: String,
    /// Raster render mode for the underlay.
    pub render_type: RenderType,
    /// Produce the raster underlay layer.
    pub include_underlay: bool,
    /// Produce the vector linework layer.
    pub include_linework: bool,
    /// Produce the annotation layer.
    pub include_annotation: bool,
    /// External CSS referenced by the final document.
    pub stylesheet: Option<String>,
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self {
            name: "Technical".to_string(),
            render_type: RenderType::Default,
            include_underlay: false,
            include_linework: true,
            include_annotation: true,
            stylesheet: None,
        }
    }
}

/// Orthographic camera. Vectors are stored as arrays for serialization.
///
/// The camera location is also the cut plane: geometry behind it is
/// discarded, geometry crossing it is cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera position in model coordinates.
    pub location: [f64; 3],
    /// Viewing direction (from camera into the model).
    pub direction: [f64; 3],
    /// Up direction on paper.
    pub up: [f64; 3],
    /// View width in model units.
    pub width: f64,
    /// View height in model units.
    pub height: f64,
}

impl Camera {
    /// Plan camera at `location`, looking down.
    pub fn plan(location: [f64; 3], width: f64, height: f64) -> Self {
        Self {
            location,
            direction: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            width,
            height,
        }
    }

    /// Reflected plan camera at `location`, looking up.
    pub fn reflected_plan(location: [f64; 3], width: f64, height: f64) -> Self {
        Self {
            location,
            direction: [0.0, 0.0, 1.0],
            up: [0.0, 1.0, 0.0],
            width,
            height,
        }
    }

    /// Horizontal camera looking along `direction` with +Z up.
    pub fn horizontal(location: [f64; 3], direction: [f64; 3], width: f64, height: f64) -> Self {
        Self {
            location,
            direction,
            up: [0.0, 0.0, 1.0],
            width,
            height,
        }
    }

    /// Size the view from an orthographic scale and the raster resolution.
    ///
    /// Landscape rasters span the ortho scale horizontally, portrait rasters
    /// vertically; the other side follows the aspect ratio.
    pub fn from_ortho_scale(
        location: [f64; 3],
        direction: [f64; 3],
        up: [f64; 3],
        ortho_scale: f64,
        resolution: (u32, u32),
    ) -> Self {
        let (res_x, res_y) = (resolution.0.max(1) as f64, resolution.1.max(1) as f64);
        let (width, height) = if res_x > res_y {
            (ortho_scale, ortho_scale / res_x * res_y)
        } else {
            (ortho_scale / res_y * res_x, ortho_scale)
        };
        Self {
            location,
            direction,
            up,
            width,
            height,
        }
    }

    /// Paper size in millimetres.
    pub fn paper_size(&self, unit: LengthUnit, scale: &DrawingScale) -> (f64, f64) {
        let k = unit.paper_mm_per_unit(scale.ratio);
        (self.width * k, self.height * k)
    }
}

/// A drawing to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    /// Drawing id in the host document.
    pub id: u64,
    /// Drawing name; also names the per-layer cache files.
    pub name: String,
    /// GUID of the camera element in the model.
    pub camera_guid: Guid,
    /// Drafting convention.
    pub target_view: TargetView,
    /// Drawing scale.
    #[serde(default)]
    pub scale: DrawingScale,
    /// Rendering options.
    #[serde(default)]
    pub style: DrawingStyle,
    /// View volume.
    pub camera: Camera,
    /// Explicit element filter; `None` draws every element.
    #[serde(default)]
    pub include: Option<Vec<Guid>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_scale() {
        let scale = DrawingScale::parse("1:100|1/100").unwrap();
        assert_eq!(scale.human, "1:100");
        assert_relative_eq!(scale.ratio, 0.01);

        let nts = DrawingScale::parse("1:20|1/20").unwrap().not_to_scale();
        assert_eq!(nts.human, "NTS");
        assert_relative_eq!(nts.ratio, 0.05);
    }

    #[test]
    fn test_parse_scale_rejects_garbage() {
        assert!(DrawingScale::parse("1:100").is_err());
        assert!(DrawingScale::parse("1:100|1-100").is_err());
        assert!(DrawingScale::parse("x|1/0").is_err());
    }

    #[test]
    fn test_camera_from_ortho_scale() {
        let landscape =
            Camera::from_ortho_scale([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0], 20.0, (2000, 1000));
        assert_relative_eq!(landscape.width, 20.0);
        assert_relative_eq!(landscape.height, 10.0);

        let portrait =
            Camera::from_ortho_scale([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0], 20.0, (1000, 2000));
        assert_relative_eq!(portrait.width, 10.0);
        assert_relative_eq!(portrait.height, 20.0);
    }

    #[test]
    fn test_paper_size() {
        let camera = Camera::plan([0.0, 0.0, 1.0], 30.0, 20.0);
        let (w, h) = camera.paper_size(LengthUnit::default(), &DrawingScale::default());
        assert_relative_eq!(w, 300.0);
        assert_relative_eq!(h, 200.0);
    }

    #[test]
    fn test_target_view_tags() {
        let tv: TargetView = serde_json::from_str("\"REFLECTED_PLAN_VIEW\"").unwrap();
        assert!(tv.is_plan());
        let other: TargetView = serde_json::from_str("\"SKETCH_VIEW\"").unwrap();
        assert_eq!(other, TargetView::Other);
        assert!(!TargetView::SectionView.is_plan());
    }
}
