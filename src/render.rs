// render.rs — 渲染器接口：核心只输出相机参数，由外部渲染器出图

use glam::Vec3;

/// Camera parameters for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// 水平角 (rad)
    pub theta: f64,
    /// 垂直角 (rad)
    pub phi: f64,
    /// 垂直视场角（度）
    pub fov_deg: f64,
    /// 宽 / 高
    pub ratio: f64,
}

impl FrameParams {
    /// Orthonormal camera basis `(forward, right, up)` for a Y-up sphere,
    /// theta measured from +Z towards -X so that growing theta drags the
    /// panorama to the right.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let (st, ct) = (self.theta as f32).sin_cos();
        let (sp, cp) = (self.phi as f32).sin_cos();
        let forward = Vec3::new(-st * cp, sp, ct * cp);
        let right = Vec3::new(ct, 0.0, st);
        let up = forward.cross(right);
        (forward, right, up)
    }
}

/// Rendering capability consumed by the controller.
///
/// `render_frame` is a request: implementations may defer the actual draw to
/// the next redraw of their surface.
pub trait Renderer {
    fn set_viewport(&mut self, width: u32, height: u32);
    fn render_frame(&mut self, frame: &FrameParams);

    /// Receives a freshly composed panorama texture.
    fn upload_panorama(&mut self, _canvas: &image::RgbaImage) {}
}
