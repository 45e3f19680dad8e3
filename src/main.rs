// main.rs — 桌面端：winit 事件循环 + wgpu 渲染 + egui 导航栏

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod i18n;
mod renderer;
mod ui;

use panorama_sphere::angle::{rad_to_deg, wrap_radians};
use panorama_sphere::loader::{load_panorama, LoadedPanorama, PanoramaSource};
use panorama_sphere::navbar::{NavBar, NavCommand};
use panorama_sphere::orientation::Platform;
use panorama_sphere::viewer::LoadTicket;
use panorama_sphere::{ViewerController, ViewerError, ViewerOptions};
use renderer::GpuRenderer;
use ui::{StatusInfo, UiEvent};

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

type LoadResult = (LoadTicket, panorama_sphere::Result<LoadedPanorama>);

#[derive(Debug, Parser)]
#[command(name = "panorama_sphere", version, about = "Interactive equirectangular panorama viewer")]
struct Cli {
    /// Panorama image to open on startup
    panorama: Option<PathBuf>,

    /// JSON file with viewer options
    #[arg(long)]
    config: Option<PathBuf>,

    /// UI language (en, zh-Hans, ...)
    #[arg(long)]
    lang: Option<String>,

    #[arg(long)]
    min_fov: Option<f64>,

    #[arg(long)]
    max_fov: Option<f64>,

    /// e.g. "2rpm", "10dps", "0.5 radians per second"
    #[arg(long)]
    anim_speed: Option<String>,

    /// Idle delay before autorotate in ms; 0 disables it
    #[arg(long)]
    time_anim: Option<u64>,

    #[arg(long)]
    fps: Option<u32>,
}

impl Cli {
    fn options(&self) -> anyhow::Result<ViewerOptions> {
        let file = match &self.config {
            Some(path) => ViewerOptions::from_json_file(path)?,
            None => ViewerOptions::default(),
        };
        let overrides = ViewerOptions {
            min_fov: self.min_fov,
            max_fov: self.max_fov,
            anim_speed: self.anim_speed.clone(),
            time_anim: self.time_anim.map(|ms| {
                if ms == 0 {
                    panorama_sphere::config::TimeAnim::Enabled(false)
                } else {
                    panorama_sphere::config::TimeAnim::Millis(ms)
                }
            }),
            fps: self.fps,
            ..Default::default()
        };
        Ok(file.merged_with(overrides))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut current_lang = i18n::resolve_lang(cli.lang.as_deref());
    i18n::init(&current_lang);

    let config = cli.options()?.validate().context("invalid viewer options")?;

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating window")?,
    );

    let renderer = pollster::block_on(GpuRenderer::new(window.clone()))?;
    let max_texture = renderer.max_texture_dimension();
    let platform = Platform::detect(std::env::consts::OS, false);
    let mut viewer = ViewerController::new(config, renderer, platform);
    viewer.limit_texture_width(max_texture);

    let navbar = NavBar::new(viewer.actions_mut());
    // 桌面端没有方向传感器
    viewer.probe_orientation(None);

    let size = window.inner_size();
    viewer.resize(Some(size.width), Some(size.height));

    let (tx, rx): (Sender<LoadResult>, Receiver<LoadResult>) = channel();
    if let Some(path) = cli.panorama.clone() {
        start_load_image(&mut viewer, path, tx.clone());
    }

    let mut cursor: Option<PhysicalPosition<f64>> = None;
    let mut last_error: Option<String> = None;
    let mut show_fps = false;
    let mut last_frame_time = Instant::now();
    let mut frame_count = 0u32;
    let mut fps = 0.0f32;

    event_loop.run(move |event, _, control_flow| {
        // 加载线程的结果回到事件循环线程后才触碰 viewer
        while let Ok((ticket, result)) = rx.try_recv() {
            match viewer.finish_load(ticket, result, Instant::now()) {
                Ok(true) => last_error = None,
                Ok(false) => {}
                Err(e) => {
                    let args = [("err", e.to_string())];
                    last_error = Some(i18n::tr_with("error.load_failed", &args));
                }
            }
            window.request_redraw();
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let egui_ctx = viewer.renderer().egui_ctx.clone();
                let response = viewer.renderer_mut().egui_state.on_event(&egui_ctx, &event);
                if response.repaint {
                    window.request_redraw();
                }
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                    WindowEvent::Resized(new_size) => {
                        viewer.resize(Some(new_size.width), Some(new_size.height));
                    }

                    WindowEvent::KeyboardInput { input, .. }
                        if input.state == ElementState::Pressed =>
                    {
                        let command = match input.virtual_keycode {
                            Some(VirtualKeyCode::O) => {
                                if let Some(path) = ui::pick_image() {
                                    start_load_image(&mut viewer, path, tx.clone());
                                }
                                None
                            }
                            Some(VirtualKeyCode::F11) => Some(NavCommand::ToggleFullscreen),
                            Some(VirtualKeyCode::Space) => Some(NavCommand::ToggleAutorotate),
                            Some(VirtualKeyCode::Equals | VirtualKeyCode::NumpadAdd) => {
                                Some(NavCommand::ZoomIn)
                            }
                            Some(VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract) => {
                                Some(NavCommand::ZoomOut)
                            }
                            _ => None,
                        };
                        if let Some(command) = command {
                            run_command(&mut viewer, &window, command, &mut last_error);
                        }
                    }

                    WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                        match state {
                            ElementState::Pressed => {
                                if let Some(p) = cursor {
                                    viewer.pointer_down(p.x, p.y);
                                }
                            }
                            ElementState::Released => viewer.pointer_up(),
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = Some(position);
                        viewer.pointer_move(position.x, position.y);
                    }

                    WindowEvent::Touch(touch) => {
                        let (x, y) = (touch.location.x, touch.location.y);
                        match touch.phase {
                            TouchPhase::Started => viewer.pointer_down(x, y),
                            TouchPhase::Moved => viewer.pointer_move(x, y),
                            TouchPhase::Ended | TouchPhase::Cancelled => viewer.pointer_up(),
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => f64::from(y),
                            MouseScrollDelta::PixelDelta(pos) => pos.y,
                        };
                        viewer.wheel(scroll);
                    }

                    WindowEvent::DroppedFile(path) => {
                        start_load_image(&mut viewer, path, tx.clone());
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame_time).as_secs_f32();
                if elapsed >= 1.0 {
                    fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_frame_time = now;
                }

                let camera = viewer.camera();
                let status = StatusInfo {
                    fov: camera.fov(),
                    zoom_level: camera.zoom_level(),
                    theta_deg: rad_to_deg(wrap_radians(camera.theta())),
                    phi_deg: rad_to_deg(camera.phi()),
                    loading: viewer.is_loading(),
                    fps: Some(fps),
                    error: last_error.clone(),
                    pano_size: viewer.panorama().map(|p| (p.full_width, p.full_height)),
                    show_navbar: viewer.config().navbar,
                };

                let mut events = Vec::new();
                let render_result = viewer.renderer_mut().render_with_ui(&window, |ctx| {
                    ui::draw_ui(ctx, &navbar, &status, &mut show_fps, &current_lang, &mut events);
                });

                match render_result {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => viewer.renderer_mut().reconfigure(),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("render error: {e:?}"),
                }

                for event in events {
                    match event {
                        UiEvent::Nav(command) => {
                            run_command(&mut viewer, &window, command, &mut last_error)
                        }
                        UiEvent::OpenImage(path) => {
                            start_load_image(&mut viewer, path, tx.clone());
                        }
                        UiEvent::ResetView => {
                            let (long, lat, zoom) = {
                                let c = viewer.config();
                                (c.default_long, c.default_lat, c.zoom_level)
                            };
                            viewer.stop_autorotate();
                            viewer.rotate(long, lat);
                            viewer.zoom(f64::from(zoom));
                        }
                        UiEvent::SetLang(lang) => {
                            i18n::init(&lang);
                            window.set_title(&i18n::tr("app.title"));
                            current_lang = lang;
                        }
                        UiEvent::Exit => *control_flow = ControlFlow::Exit,
                    }
                }
            }

            Event::MainEventsCleared => {
                viewer.poll(Instant::now());
                if viewer.renderer().needs_redraw() {
                    window.request_redraw();
                }
                if *control_flow != ControlFlow::Exit {
                    *control_flow = match viewer.next_deadline() {
                        Some(deadline) => ControlFlow::WaitUntil(deadline),
                        None if viewer.is_loading() => ControlFlow::Poll,
                        None => ControlFlow::Wait,
                    };
                }
            }

            _ => {}
        }
    });
}

fn run_command(
    viewer: &mut ViewerController<GpuRenderer>,
    window: &winit::window::Window,
    command: NavCommand,
    last_error: &mut Option<String>,
) {
    match viewer.execute(command, Instant::now()) {
        Ok(()) => {}
        Err(ViewerError::UnsupportedCapability(what)) => {
            log::warn!("{what} unavailable");
            *last_error = Some(i18n::tr("error.orientation_unsupported"));
        }
        Err(e) => *last_error = Some(e.to_string()),
    }

    // 同步窗口状态
    let stereo = viewer.is_stereo();
    viewer.renderer_mut().set_stereo(stereo);
    let fullscreen = viewer.is_fullscreen();
    if fullscreen != window.fullscreen().is_some() {
        window.set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
    }
    window.request_redraw();
}

fn start_load_image(
    viewer: &mut ViewerController<GpuRenderer>,
    path: PathBuf,
    tx: Sender<LoadResult>,
) {
    let ticket = viewer.begin_load();
    let max_width = viewer.config().max_texture_width;
    let use_xmp = viewer.config().use_xmp_data;
    thread::spawn(move || {
        log::info!("loading {} in background", path.display());
        let result = load_panorama(&PanoramaSource::Path(path), max_width, use_xmp);
        if tx.send((ticket, result)).is_err() {
            log::error!("viewer is gone, dropping loaded panorama");
        }
    });
}
