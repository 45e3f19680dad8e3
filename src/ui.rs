// ui.rs — 菜单栏、导航栏、状态栏（egui）
//
// UI 不直接修改查看器：点击收集为 UiEvent，帧结束后由 main 执行。

use crate::i18n::{tr, tr_with};
use panorama_sphere::navbar::{NavBar, NavButton, NavCommand};
use std::path::PathBuf;

/// 运行时搜索可覆盖 CJK 的字体；找不到就用 egui 默认字体
pub fn setup_fonts(ctx: &egui::Context) {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if cfg!(windows) {
        let dir = PathBuf::from(r"C:\Windows\Fonts");
        for f in ["msyh.ttf", "simhei.ttf", "meiryo.ttf", "malgun.ttf"] {
            candidates.push(dir.join(f));
        }
    } else if cfg!(target_os = "macos") {
        for p in [
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
            "/Library/Fonts/Arial Unicode.ttf",
        ] {
            candidates.push(PathBuf::from(p));
        }
    } else {
        for p in [
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        ] {
            candidates.push(PathBuf::from(p));
        }
    }
    candidates.push(PathBuf::from("assets").join("NotoSansSC-Regular.ttf"));

    let chosen = candidates.into_iter().find_map(|p| {
        let bytes = std::fs::read(&p).ok()?;
        ab_glyph::FontArc::try_from_vec(bytes.clone()).ok()?;
        Some((p, bytes))
    });

    let Some((path, bytes)) = chosen else {
        log::warn!("{}", tr("font.not_found"));
        return;
    };
    log::info!("{}", tr_with("font.using", &[("path", path.display().to_string())]));

    let mut fonts = egui::FontDefinitions::default();
    fonts.font_data.insert("ui".to_owned(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.insert(0, "ui".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Nav(NavCommand),
    OpenImage(PathBuf),
    ResetView,
    SetLang(String),
    Exit,
}

/// Read-only view of the viewer for one UI frame.
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub fov: f64,
    pub zoom_level: u8,
    pub theta_deg: f64,
    pub phi_deg: f64,
    pub loading: bool,
    pub fps: Option<f32>,
    pub error: Option<String>,
    pub pano_size: Option<(u32, u32)>,
    pub show_navbar: bool,
}

pub fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&tr("file.filter.images"), &["jpg", "jpeg", "png", "bmp"])
        .pick_file()
}

fn button_glyph(button: NavButton) -> &'static str {
    match button {
        NavButton::Autorotate => "⟳",
        NavButton::ZoomOut => "−",
        NavButton::ZoomIn => "+",
        NavButton::Fullscreen => "⛶",
        NavButton::Orientation => "📱",
        NavButton::VirtualReality => "👓",
    }
}

pub fn draw_ui(
    ctx: &egui::Context,
    navbar: &NavBar,
    status: &StatusInfo,
    show_fps: &mut bool,
    current_lang: &str,
    events: &mut Vec<UiEvent>,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(tr("menu.file"), |ui| {
                if ui.button(tr("menu.open_image")).clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_image() {
                        events.push(UiEvent::OpenImage(path));
                    }
                }
                if ui.button(tr("menu.exit")).clicked() {
                    events.push(UiEvent::Exit);
                }
            });

            ui.menu_button(tr("menu.view"), |ui| {
                if ui.button(tr("view.reset")).clicked() {
                    events.push(UiEvent::ResetView);
                    ui.close_menu();
                }
                ui.separator();
                if ui.checkbox(show_fps, tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
            });

            ui.menu_button(tr("menu.language"), |ui| {
                for (code, name) in [("en", "English"), ("zh-Hans", "简体中文")] {
                    if ui.radio(current_lang == code, name).clicked() {
                        events.push(UiEvent::SetLang(code.to_owned()));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        if status.show_navbar {
            ui.horizontal(|ui| {
                for (button, active) in navbar.buttons() {
                    let label = egui::SelectableLabel::new(active, button_glyph(button));
                    if ui.add(label).on_hover_text(tr(button.label_key())).clicked() {
                        events.push(UiEvent::Nav(button.command()));
                    }
                    if button == NavButton::ZoomIn {
                        ui.label(format!("{}%", navbar.zoom_level()));
                    }
                }
            });
            ui.separator();
        }

        ui.horizontal(|ui| {
            if status.loading {
                let loading = egui::RichText::new(tr("status.loading_image"));
                ui.label(loading.color(egui::Color32::YELLOW));
                ui.label("|");
            }
            if let Some(err) = &status.error {
                ui.label(egui::RichText::new(err).color(egui::Color32::LIGHT_RED));
                ui.label("|");
            }
            if let Some((w, h)) = status.pano_size {
                ui.label(format!("{w}×{h}"));
                ui.label("|");
            }
            ui.label(format!("FOV: {:.1}°", status.fov));
            ui.label("|");
            ui.label(format!("{} {}", tr("status.zoom_prefix"), status.zoom_level));
            ui.label("|");
            ui.label(format!("θ: {:.1}°", status.theta_deg));
            ui.label("|");
            ui.label(format!("φ: {:.1}°", status.phi_deg));

            if let (true, Some(fps)) = (*show_fps, status.fps) {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {fps:.1}")).color(egui::Color32::GREEN));
            }
        });
    });
}
