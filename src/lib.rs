// lib.rs — 全景导航与投影核心
//
// 相机状态、自动旋转调度、速度解析、全景画布构建、设备方向换算。
// 实际绘制由外部渲染器完成（见 render::Renderer）。

pub mod actions;
pub mod angle;
pub mod autorotate;
pub mod camera;
pub mod config;
pub mod error;
pub mod loader;
pub mod navbar;
pub mod orientation;
pub mod panorama;
pub mod render;
pub mod speed;
pub mod viewer;

pub use config::{ViewerConfig, ViewerOptions};
pub use error::{Result, ViewerError};
pub use render::{FrameParams, Renderer};
pub use viewer::ViewerController;
