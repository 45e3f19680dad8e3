// viewer.rs — 控制器：接收输入事件与生命周期调用，驱动相机/自动旋转/传感器

use crate::actions::{self, ActionArg, ActionBus};
use crate::autorotate::{AutorotateEvent, AutorotateScheduler};
use crate::camera::{wheel_step, CameraState};
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::loader::{load_panorama, LoadedPanorama, PanoramaSource};
use crate::navbar::NavCommand;
use crate::orientation::{OrientationTracker, Platform, RawOrientation, ScreenOrientation, Support};
use crate::panorama::{PanoBuffer, PanoDescriptor};
use crate::render::Renderer;
use crate::speed::AnimationSpeed;
use std::time::Instant;

/// Identifies one [`ViewerController::begin_load`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// The single panorama viewer. Owns all camera state; every mutation issues
/// exactly one render request on the renderer it wraps.
pub struct ViewerController<R: Renderer> {
    config: ViewerConfig,
    camera: CameraState,
    autorotate: AutorotateScheduler,
    orientation: OrientationTracker,
    actions: ActionBus,
    renderer: R,

    pano: Option<PanoBuffer>,
    pano_data: Option<PanoDescriptor>,
    load_seq: u64,
    pending_load: Option<u64>,

    // 拖拽中：上一次指针位置
    drag_from: Option<(f64, f64)>,
    screen: Option<ScreenOrientation>,
    fullscreen: bool,
    stereo: bool,
}

impl<R: Renderer> ViewerController<R> {
    pub fn new(config: ViewerConfig, renderer: R, platform: Platform) -> Self {
        let camera = CameraState::from_config(&config);
        let autorotate = AutorotateScheduler::new(config.time_anim, config.anim_speed, config.fps);
        Self {
            config,
            camera,
            autorotate,
            orientation: OrientationTracker::new(platform),
            actions: ActionBus::new(),
            renderer,
            pano: None,
            pano_data: None,
            load_seq: 0,
            pending_load: None,
            drag_from: None,
            screen: None,
            fullscreen: false,
            stereo: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn autorotate(&self) -> &AutorotateScheduler {
        &self.autorotate
    }

    pub fn orientation(&self) -> &OrientationTracker {
        &self.orientation
    }

    pub fn actions_mut(&mut self) -> &mut ActionBus {
        &mut self.actions
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn panorama(&self) -> Option<&PanoBuffer> {
        self.pano.as_ref()
    }

    pub fn pano_data(&self) -> Option<&PanoDescriptor> {
        self.pano_data.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_stereo(&self) -> bool {
        self.stereo
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    fn render(&mut self) {
        let frame = self.camera.frame();
        self.renderer.render_frame(&frame);
    }

    // ---- 相机 ----

    pub fn rotate(&mut self, theta: f64, phi: f64) {
        self.camera.rotate(theta, phi);
        self.render();
        self.actions.publish(
            actions::POSITION_UPDATED,
            ActionArg::Position { longitude: self.camera.theta(), latitude: self.camera.phi() },
        );
    }

    pub fn zoom(&mut self, level: f64) {
        self.camera.zoom(level);
        self.zoom_changed();
    }

    /// No-op when already fully zoomed in.
    pub fn zoom_in(&mut self) {
        if self.camera.zoom_in() {
            self.zoom_changed();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.camera.zoom_out() {
            self.zoom_changed();
        }
    }

    fn zoom_changed(&mut self) {
        self.render();
        self.actions.publish(actions::ZOOM_UPDATED, ActionArg::Level(self.camera.zoom_level()));
    }

    /// Only the given dimensions change. An unchanged size renders nothing.
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) {
        if !self.camera.resize(width, height) {
            return;
        }
        let size = self.camera.size();
        log::debug!("viewer resized to {}x{}", size.width, size.height);
        self.renderer.set_viewport(size.width, size.height);
        self.render();
    }

    // ---- 指针 / 滚轮 ----

    /// Start of a drag or touch. Cancels any autorotate timer first.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.stop_autorotate();
        if self.config.mousemove {
            self.drag_from = Some((x, y));
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some((last_x, last_y)) = self.drag_from else {
            return;
        };
        self.drag_from = Some((x, y));
        let (dx, dy) = (x - last_x, y - last_y);
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let theta = self.camera.theta() + dx * self.config.long_offset;
        let phi = self.camera.phi() + dy * self.config.lat_offset;
        self.rotate(theta, phi);
    }

    pub fn pointer_up(&mut self) {
        self.drag_from = None;
    }

    /// Positive deltas zoom in by one level.
    pub fn wheel(&mut self, delta: f64) {
        if !self.config.mousewheel {
            return;
        }
        match wheel_step(delta) {
            Some(1) => self.zoom_in(),
            Some(_) => self.zoom_out(),
            None => {}
        }
    }

    // ---- 自动旋转 ----

    pub fn start_autorotate(&mut self, now: Instant) {
        if self.autorotate.is_rotating() {
            return;
        }
        self.autorotate.start(now);
        self.actions.publish(actions::AUTOROTATE, ActionArg::Bool(true));
        self.poll(now);
    }

    pub fn stop_autorotate(&mut self) {
        if self.autorotate.interrupt() {
            self.actions.publish(actions::AUTOROTATE, ActionArg::Bool(false));
        }
    }

    pub fn toggle_autorotate(&mut self, now: Instant) {
        if self.autorotate.is_rotating() {
            self.stop_autorotate();
        } else {
            self.start_autorotate(now);
        }
    }

    /// Takes effect from the next tick on.
    pub fn set_fps(&mut self, fps: u32) {
        self.config.fps = fps.clamp(1, crate::config::MAX_FPS);
        self.autorotate.set_fps(self.config.fps);
    }

    /// Unknown units leave the current speed untouched.
    pub fn set_anim_speed(&mut self, speed: &str) -> Result<()> {
        let speed = AnimationSpeed::parse(speed)?;
        self.config.anim_speed = speed;
        self.autorotate.set_speed(speed);
        Ok(())
    }

    /// Fires due timers. Call from the event loop whenever
    /// [`next_deadline`](Self::next_deadline) has passed.
    pub fn poll(&mut self, now: Instant) {
        loop {
            match self.autorotate.poll(now, self.camera.theta(), self.camera.phi()) {
                Some(AutorotateEvent::Started) => {
                    log::debug!("autorotate started after idle delay");
                    self.actions.publish(actions::AUTOROTATE, ActionArg::Bool(true));
                }
                Some(AutorotateEvent::Tick { theta, phi }) => {
                    self.rotate(theta, phi);
                    break;
                }
                None => break,
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.autorotate.next_deadline()
    }

    // ---- 设备方向 ----

    /// Resolves sensor support from the first event the platform delivers.
    pub fn probe_orientation(&mut self, first: Option<&RawOrientation>) -> Support {
        self.orientation.probe(first)
    }

    pub fn set_screen_orientation(&mut self, screen: Option<ScreenOrientation>) {
        self.screen = screen;
    }

    pub fn screen_orientation(&self) -> ScreenOrientation {
        self.screen.unwrap_or_else(|| {
            let size = self.camera.size();
            ScreenOrientation::from_viewport(size.width, size.height)
        })
    }

    pub fn start_orientation(&mut self) -> Result<()> {
        if self.orientation.is_tracking() {
            return Ok(());
        }
        self.orientation.start()?;
        self.stop_autorotate();
        self.actions.publish(actions::ORIENTATION, ActionArg::Bool(true));
        Ok(())
    }

    pub fn stop_orientation(&mut self) {
        if self.orientation.is_tracking() {
            self.orientation.stop();
            self.actions.publish(actions::ORIENTATION, ActionArg::Bool(false));
        }
    }

    pub fn toggle_orientation(&mut self) -> Result<()> {
        if self.orientation.is_tracking() {
            self.stop_orientation();
            Ok(())
        } else {
            self.start_orientation()
        }
    }

    /// Sensor event; must be delivered on the thread that owns the viewer.
    pub fn orientation_sample(&mut self, raw: &RawOrientation) {
        let screen = self.screen_orientation();
        if let Some(angles) = self.orientation.update(raw, screen) {
            self.rotate(angles.longitude, angles.latitude);
        }
    }

    // ---- 全屏 / 立体 ----

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.actions.publish(actions::FULLSCREEN_UPDATED, ActionArg::Bool(self.fullscreen));
        self.fullscreen
    }

    /// Keeps the platform-driven state in sync (e.g. window manager exit).
    pub fn set_fullscreen(&mut self, on: bool) {
        if self.fullscreen != on {
            self.toggle_fullscreen();
        }
    }

    pub fn toggle_stereo(&mut self) -> bool {
        self.stereo = !self.stereo;
        self.actions.publish(actions::STEREO, ActionArg::Bool(self.stereo));
        self.render();
        self.stereo
    }

    pub fn execute(&mut self, command: NavCommand, now: Instant) -> Result<()> {
        match command {
            NavCommand::ToggleAutorotate => self.toggle_autorotate(now),
            NavCommand::ZoomIn => self.zoom_in(),
            NavCommand::ZoomOut => self.zoom_out(),
            NavCommand::ToggleFullscreen => {
                self.toggle_fullscreen();
            }
            NavCommand::ToggleOrientation => self.toggle_orientation()?,
            NavCommand::ToggleStereo => {
                self.toggle_stereo();
            }
        }
        Ok(())
    }

    // ---- 加载 ----

    /// Starts a new load. Only the result for the most recent ticket is
    /// applied; anything older that finishes later is dropped.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_seq += 1;
        self.pending_load = Some(self.load_seq);
        self.stop_autorotate();
        LoadTicket(self.load_seq)
    }

    /// Completes a load started with [`begin_load`](Self::begin_load).
    /// Failures are handed back untouched; the previous panorama stays.
    /// Returns `Ok(false)` for a superseded ticket.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<LoadedPanorama>,
        now: Instant,
    ) -> Result<bool> {
        if self.pending_load != Some(ticket.0) {
            log::debug!("dropping stale load #{} (latest #{})", ticket.0, self.load_seq);
            return Ok(false);
        }
        self.pending_load = None;

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("panorama load failed: {e}");
                return Err(e);
            }
        };

        self.renderer.upload_panorama(&loaded.canvas);
        self.pano = Some(loaded.buffer);
        self.pano_data = loaded.pano_data;
        self.render();
        self.actions.publish(actions::READY, ActionArg::None);

        if self.autorotate.arm(now) {
            log::debug!("autorotate armed");
        }
        Ok(true)
    }

    /// Synchronous load, for callers without a worker thread.
    pub fn load(&mut self, source: &PanoramaSource, now: Instant) -> Result<()> {
        let ticket = self.begin_load();
        let result = load_panorama(source, self.config.max_texture_width, self.config.use_xmp_data);
        self.finish_load(ticket, result, now).map(|_| ())
    }

    /// Lowers the texture width cap, e.g. to the GPU limit.
    pub fn limit_texture_width(&mut self, max: u32) {
        self.config.max_texture_width = self.config.max_texture_width.min(max.max(1));
    }
}

impl<R: Renderer> std::fmt::Debug for ViewerController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerController")
            .field("camera", &self.camera)
            .field("autorotate", &self.autorotate.state())
            .field("orientation", &self.orientation.state())
            .field("pano", &self.pano)
            .field("fullscreen", &self.fullscreen)
            .field("stereo", &self.stereo)
            .finish_non_exhaustive()
    }
}
