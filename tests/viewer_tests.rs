use approx::assert_abs_diff_eq;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use panorama_sphere::actions::{self, ActionArg};
use panorama_sphere::autorotate::AutorotateState;
use panorama_sphere::loader::{load_panorama, PanoramaSource};
use panorama_sphere::navbar::{NavBar, NavButton, NavCommand};
use panorama_sphere::orientation::{
    OrientationSample, Platform, RawOrientation, ScreenOrientation, Support,
};
use panorama_sphere::{FrameParams, Renderer, ViewerConfig, ViewerController, ViewerError};
use std::cell::RefCell;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::io::Cursor;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct RecordingRenderer {
    frames: Vec<FrameParams>,
    viewports: Vec<(u32, u32)>,
    uploads: Vec<(u32, u32)>,
}

impl Renderer for RecordingRenderer {
    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewports.push((width, height));
    }

    fn render_frame(&mut self, frame: &FrameParams) {
        self.frames.push(*frame);
    }

    fn upload_panorama(&mut self, canvas: &RgbaImage) {
        self.uploads.push(canvas.dimensions());
    }
}

fn viewer_with(config: ViewerConfig) -> ViewerController<RecordingRenderer> {
    ViewerController::new(config, RecordingRenderer::default(), Platform::default())
}

fn viewer() -> ViewerController<RecordingRenderer> {
    viewer_with(ViewerConfig::default())
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_pixel(w, h, Rgba([200, 100, 50, 255]));
    let img = image::DynamicImage::ImageRgba8(pixels);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

fn record(
    viewer: &mut ViewerController<RecordingRenderer>,
    name: &str,
) -> Rc<RefCell<Vec<ActionArg>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    viewer.actions_mut().subscribe(name, move |arg| sink.borrow_mut().push(*arg));
    seen
}

#[test]
fn test_initial_state() {
    let v = viewer();
    assert_eq!(v.camera().theta(), 0.0);
    assert_eq!(v.camera().phi(), 0.0);
    assert_eq!(v.camera().zoom_level(), 0);
    assert_eq!(v.camera().fov(), 90.0);
    assert!(v.renderer().frames.is_empty());
}

#[test]
fn test_every_mutation_renders_once() {
    let mut v = viewer();
    v.rotate(1.0, 0.5);
    assert_eq!(v.renderer().frames.len(), 1);
    v.zoom(40.0);
    assert_eq!(v.renderer().frames.len(), 2);
    v.resize(Some(800), Some(600));
    assert_eq!(v.renderer().frames.len(), 3);
    assert_eq!(v.renderer().viewports, vec![(800, 600)]);

    let last = v.renderer().frames.last().copied().unwrap();
    assert_eq!(last.theta, 1.0);
    assert_eq!(last.phi, 0.5);
    assert_abs_diff_eq!(last.ratio, 800.0 / 600.0, epsilon = 1e-12);
    assert_abs_diff_eq!(last.fov_deg, 90.0 + 0.4 * (30.0 - 90.0), epsilon = 1e-12);
}

#[test]
fn test_resize_same_size_is_idempotent() {
    let mut v = viewer();
    v.resize(Some(1024), Some(512));
    let before = v.camera().size();
    v.resize(Some(1024), Some(512));
    assert_eq!(v.camera().size(), before);
    assert_eq!(v.renderer().frames.len(), 1);
    assert_eq!(v.renderer().viewports.len(), 1);

    v.resize(None, Some(1024));
    assert_eq!(v.camera().size().width, 1024);
    assert_abs_diff_eq!(v.camera().size().ratio, 1.0);
}

#[test]
fn test_rotate_clamps_phi() {
    let mut v = viewer();
    for phi in [-10.0, -FRAC_PI_2, 0.2, 3.0, 1e9] {
        v.rotate(0.0, phi);
        assert!(v.camera().phi().abs() <= FRAC_PI_2);
    }
}

#[test]
fn test_zoom_publishes_level() {
    let mut v = viewer();
    let seen = record(&mut v, actions::ZOOM_UPDATED);
    v.zoom(120.7);
    v.zoom_out();
    v.zoom(0.0);
    v.zoom_out(); // 已到下限
    assert_eq!(
        *seen.borrow(),
        vec![ActionArg::Level(100), ActionArg::Level(99), ActionArg::Level(0)]
    );
    assert_eq!(v.renderer().frames.len(), 3);
}

#[test]
fn test_wheel_steps_zoom() {
    let mut v = viewer();
    v.wheel(3.0);
    v.wheel(0.5);
    assert_eq!(v.camera().zoom_level(), 2);
    v.wheel(-10.0);
    assert_eq!(v.camera().zoom_level(), 1);
    v.wheel(0.0);
    assert_eq!(v.renderer().frames.len(), 3);

    let mut v = viewer_with(ViewerConfig { mousewheel: false, ..ViewerConfig::default() });
    v.wheel(1.0);
    assert_eq!(v.camera().zoom_level(), 0);
}

#[test]
fn test_drag_rotates_by_offsets() {
    let cfg = ViewerConfig { long_offset: 0.01, lat_offset: 0.005, ..ViewerConfig::default() };
    let mut v = viewer_with(cfg);
    v.pointer_move(10.0, 10.0); // 未按下
    assert!(v.renderer().frames.is_empty());

    v.pointer_down(100.0, 100.0);
    v.pointer_move(120.0, 80.0);
    assert_abs_diff_eq!(v.camera().theta(), 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(v.camera().phi(), -0.1, epsilon = 1e-12);
    v.pointer_up();
    v.pointer_move(500.0, 500.0);
    assert_eq!(v.renderer().frames.len(), 1);
}

#[test]
fn test_load_arms_autorotate_and_emits_ready() {
    let mut v = viewer();
    let ready = record(&mut v, actions::READY);
    let autorotate = record(&mut v, actions::AUTOROTATE);

    let t0 = Instant::now();
    v.load(&PanoramaSource::Bytes(png_bytes(64, 32)), t0).unwrap();
    assert_eq!(ready.borrow().len(), 1);
    assert_eq!(v.renderer().uploads, vec![(64, 32)]);
    assert_eq!(v.panorama().map(|p| p.full_width), Some(64));
    assert!(v.autorotate().is_armed());
    assert_eq!(v.next_deadline(), Some(t0 + Duration::from_millis(2000)));

    let frames = v.renderer().frames.len();
    v.poll(t0 + Duration::from_millis(1000));
    assert_eq!(v.renderer().frames.len(), frames);

    // 到期：开始旋转并立刻执行第一个 tick
    v.poll(t0 + Duration::from_millis(2000));
    assert!(v.autorotate().is_rotating());
    assert_eq!(*autorotate.borrow(), vec![ActionArg::Bool(true)]);
    assert_eq!(v.renderer().frames.len(), frames + 1);
    assert_abs_diff_eq!(v.camera().theta(), v.autorotate().increment(), epsilon = 1e-12);
}

#[test]
fn test_failed_load_is_reported() {
    let mut v = viewer();
    let err = v.load(&PanoramaSource::Bytes(b"nope".to_vec()), Instant::now());
    assert!(err.is_err());
    assert!(!v.is_loading());
    assert!(v.panorama().is_none());
    assert_eq!(v.autorotate().state(), AutorotateState::Idle);
    assert!(v.renderer().frames.is_empty());
}

#[test]
fn test_superseded_load_is_dropped() {
    let mut v = viewer();
    let t0 = Instant::now();
    let decode = |w, h| load_panorama(&PanoramaSource::Bytes(png_bytes(w, h)), 4096, false);

    let older = v.begin_load();
    let newer = v.begin_load();
    assert_ne!(older, newer);

    // 新的先完成，旧的后到
    assert!(v.finish_load(newer, decode(64, 32), t0).unwrap());
    assert!(!v.is_loading());
    assert!(!v.finish_load(older, decode(32, 16), t0).unwrap());

    assert_eq!(v.renderer().uploads, vec![(64, 32)]);
    assert_eq!(v.panorama().map(|p| p.full_width), Some(64));
}

#[test]
fn test_stale_result_keeps_newer_load_pending() {
    let mut v = viewer();
    let t0 = Instant::now();
    let older = v.begin_load();
    let newer = v.begin_load();

    let stale = load_panorama(&PanoramaSource::Bytes(png_bytes(32, 16)), 4096, false);
    assert!(!v.finish_load(older, stale, t0).unwrap());
    assert!(v.is_loading());
    assert!(v.renderer().uploads.is_empty());

    let err = v.finish_load(newer, Err(ViewerError::AssetLoad("gone".into())), t0);
    assert!(err.is_err());
    assert!(!v.is_loading());
}

#[test]
fn test_autorotate_ticks_decay_phi() {
    let mut v = viewer();
    v.rotate(0.0, 0.6);
    let t0 = Instant::now();
    v.start_autorotate(t0);

    let mut now = t0;
    let mut prev_phi = v.camera().phi();
    let mut prev_theta = v.camera().theta();
    let inc = v.autorotate().increment();
    for _ in 0..50 {
        now = v.next_deadline().unwrap();
        v.poll(now);
        let phi = v.camera().phi();
        let theta = v.camera().theta();
        assert!(phi.abs() <= prev_phi.abs());
        assert_abs_diff_eq!((theta - prev_theta).rem_euclid(TAU), inc, epsilon = 1e-9);
        assert!((0.0..TAU).contains(&theta));
        prev_phi = phi;
        prev_theta = theta;
    }
    assert!(now > t0);
}

#[test]
fn test_drag_stops_autorotate() {
    let mut v = viewer();
    let seen = record(&mut v, actions::AUTOROTATE);
    let t0 = Instant::now();
    v.start_autorotate(t0);
    let frames = v.renderer().frames.len();

    v.pointer_down(0.0, 0.0);
    assert_eq!(v.autorotate().state(), AutorotateState::Idle);
    assert_eq!(v.next_deadline(), None);
    v.poll(t0 + Duration::from_secs(5));
    assert_eq!(v.renderer().frames.len(), frames);
    assert_eq!(*seen.borrow(), vec![ActionArg::Bool(true), ActionArg::Bool(false)]);

    v.toggle_autorotate(t0 + Duration::from_secs(6));
    assert!(v.autorotate().is_rotating());
}

#[test]
fn test_drag_cancels_pending_start_timer() {
    let mut v = viewer();
    let t0 = Instant::now();
    v.load(&PanoramaSource::Bytes(png_bytes(8, 4)), t0).unwrap();
    v.pointer_down(0.0, 0.0);
    v.pointer_up();
    v.poll(t0 + Duration::from_secs(10));
    assert!(!v.autorotate().is_rotating());
}

#[test]
fn test_disabled_time_anim_never_starts() {
    let mut v = viewer_with(ViewerConfig { time_anim: None, ..ViewerConfig::default() });
    let t0 = Instant::now();
    v.load(&PanoramaSource::Bytes(png_bytes(8, 4)), t0).unwrap();
    assert_eq!(v.next_deadline(), None);
}

#[test]
fn test_bad_speed_keeps_previous() {
    let mut v = viewer();
    let before = v.autorotate().speed();
    assert!(matches!(v.set_anim_speed("bogus"), Err(ViewerError::Configuration(_))));
    assert_eq!(v.autorotate().speed(), before);
    assert_eq!(v.config().anim_speed, before);

    v.set_anim_speed("10dps").unwrap();
    let speed = v.autorotate().speed().radians_per_second();
    assert_abs_diff_eq!(speed, 10f64.to_radians(), epsilon = 1e-12);
}

#[test]
fn test_set_fps_rederives_increment() {
    let mut v = viewer();
    v.set_anim_speed("1 rad per second").unwrap();
    v.set_fps(50);
    assert_abs_diff_eq!(v.autorotate().increment(), 0.02, epsilon = 1e-12);
}

#[test]
fn test_orientation_unsupported() {
    let mut v = viewer();
    let seen = record(&mut v, actions::ORIENTATION);
    assert_eq!(v.probe_orientation(None), Support::Unsupported);
    assert!(matches!(
        v.execute(NavCommand::ToggleOrientation, Instant::now()),
        Err(ViewerError::UnsupportedCapability(_))
    ));
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_orientation_drives_camera() {
    let mut v = viewer();
    let seen = record(&mut v, actions::ORIENTATION);
    let sample = OrientationSample { alpha: 90.0, beta: 100.0, gamma: 10.0 };
    v.probe_orientation(Some(&sample.into()));
    v.set_screen_orientation(Some(ScreenOrientation::PortraitPrimary));

    v.orientation_sample(&sample.into());
    assert!(v.renderer().frames.is_empty());

    v.toggle_orientation().unwrap();
    v.orientation_sample(&sample.into());
    assert_abs_diff_eq!(v.camera().theta(), 100f64.to_radians(), epsilon = 1e-12);
    assert_abs_diff_eq!(v.camera().phi(), 10f64.to_radians(), epsilon = 1e-12);
    assert_eq!(v.renderer().frames.len(), 1);

    v.orientation_sample(&RawOrientation { alpha: Some(1.0), beta: None, gamma: Some(2.0) });
    assert_eq!(v.renderer().frames.len(), 1);

    v.toggle_orientation().unwrap();
    assert_eq!(*seen.borrow(), vec![ActionArg::Bool(true), ActionArg::Bool(false)]);
}

#[test]
fn test_screen_orientation_follows_viewport() {
    let mut v = viewer();
    v.resize(Some(600), Some(900));
    assert_eq!(v.screen_orientation(), ScreenOrientation::PortraitPrimary);
    v.resize(Some(1600), None);
    assert_eq!(v.screen_orientation(), ScreenOrientation::LandscapePrimary);
}

#[test]
fn test_navbar_tracks_controller() {
    let mut v = viewer();
    let bar = NavBar::new(v.actions_mut());
    let now = Instant::now();

    let clicks = [
        NavButton::Autorotate,
        NavButton::Fullscreen,
        NavButton::ZoomIn,
        NavButton::ZoomIn,
    ];
    for button in clicks {
        v.execute(button.command(), now).unwrap();
    }
    assert!(bar.is_active(NavButton::Autorotate));
    assert!(bar.is_active(NavButton::Fullscreen));
    assert!(v.is_fullscreen());
    assert_eq!(bar.zoom_level(), 2);

    v.execute(NavButton::VirtualReality.command(), now).unwrap();
    assert!(v.is_stereo());
    assert!(bar.is_active(NavButton::VirtualReality));

    v.execute(NavCommand::ToggleFullscreen, now).unwrap();
    assert!(!bar.is_active(NavButton::Fullscreen));
    v.set_fullscreen(false);
    assert!(!v.is_fullscreen());
}

#[test]
fn test_limit_texture_width() {
    let mut v = viewer();
    v.limit_texture_width(16);
    v.load(&PanoramaSource::Bytes(png_bytes(64, 32)), Instant::now()).unwrap();
    let pano = v.panorama().copied().unwrap();
    assert_eq!((pano.full_width, pano.full_height), (16, 8));
    assert_eq!(v.renderer().uploads, vec![(16, 8)]);
}
