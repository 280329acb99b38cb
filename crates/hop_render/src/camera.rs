use glam::{Mat4, Vec2};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Screen-space camera: `position` is the top-left corner of the view and the
/// y axis grows downward, matching pixel coordinates on a canvas.
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    /// Logical size of the drawing surface, independent of window pixels.
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        let view_w = self.viewport.0 as f32 / self.zoom;
        let view_h = self.viewport.1 as f32 / self.zoom;

        Mat4::orthographic_rh(
            self.position.x,
            self.position.x + view_w,
            self.position.y + view_h,
            self.position.y,
            -1.0,
            1.0,
        )
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_proj().to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn project(camera: &Camera2D, x: f32, y: f32) -> Vec3 {
        camera.view_proj().project_point3(Vec3::new(x, y, 0.0))
    }

    #[test]
    fn top_left_maps_to_upper_left_corner() {
        let camera = Camera2D::new(800, 600);
        let ndc = project(&camera, 0.0, 0.0);
        assert!((ndc.x + 1.0).abs() < 1e-5);
        assert!((ndc.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bottom_right_maps_to_lower_right_corner() {
        let camera = Camera2D::new(800, 600);
        let ndc = project(&camera, 800.0, 600.0);
        assert!((ndc.x - 1.0).abs() < 1e-5);
        assert!((ndc.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn center_maps_to_origin() {
        let camera = Camera2D::new(800, 600);
        let ndc = project(&camera, 400.0, 300.0);
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
    }

    #[test]
    fn zoom_shrinks_visible_area() {
        let mut camera = Camera2D::new(800, 600);
        camera.zoom = 2.0;
        let ndc = project(&camera, 400.0, 300.0);
        assert!((ndc.x - 1.0).abs() < 1e-5);
        assert!((ndc.y + 1.0).abs() < 1e-5);
    }
}
