// navbar.rs — 导航栏按钮（封闭枚举），状态由事件总线驱动

use crate::actions::{self, ActionArg, ActionBus};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavButton {
    Autorotate,
    ZoomOut,
    ZoomIn,
    Fullscreen,
    Orientation,
    VirtualReality,
}

/// What a button asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    ToggleAutorotate,
    ZoomIn,
    ZoomOut,
    ToggleFullscreen,
    ToggleOrientation,
    ToggleStereo,
}

impl NavButton {
    pub const ALL: [NavButton; 6] = [
        NavButton::Autorotate,
        NavButton::ZoomOut,
        NavButton::ZoomIn,
        NavButton::Fullscreen,
        NavButton::Orientation,
        NavButton::VirtualReality,
    ];

    pub fn command(self) -> NavCommand {
        match self {
            Self::Autorotate => NavCommand::ToggleAutorotate,
            Self::ZoomOut => NavCommand::ZoomOut,
            Self::ZoomIn => NavCommand::ZoomIn,
            Self::Fullscreen => NavCommand::ToggleFullscreen,
            Self::Orientation => NavCommand::ToggleOrientation,
            Self::VirtualReality => NavCommand::ToggleStereo,
        }
    }

    /// Action whose boolean payload mirrors this button's active style.
    pub fn toggle_action(self) -> Option<&'static str> {
        match self {
            Self::Autorotate => Some(actions::AUTOROTATE),
            Self::Fullscreen => Some(actions::FULLSCREEN_UPDATED),
            Self::Orientation => Some(actions::ORIENTATION),
            Self::VirtualReality => Some(actions::STEREO),
            Self::ZoomIn | Self::ZoomOut => None,
        }
    }

    /// i18n key for the tooltip.
    pub fn label_key(self) -> &'static str {
        match self {
            Self::Autorotate => "navbar.autorotate",
            Self::ZoomOut => "navbar.zoom_out",
            Self::ZoomIn => "navbar.zoom_in",
            Self::Fullscreen => "navbar.fullscreen",
            Self::Orientation => "navbar.orientation",
            Self::VirtualReality => "navbar.stereo",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NavBarState {
    active: [bool; 6],
    zoom_level: u8,
}

// 所有开关类按钮共用
fn set_active(state: &RefCell<NavBarState>, button: NavButton, active: bool) {
    state.borrow_mut().active[button.index()] = active;
}

/// Button states kept in sync with the controller through the action bus.
#[derive(Debug, Clone)]
pub struct NavBar {
    state: Rc<RefCell<NavBarState>>,
}

impl NavBar {
    pub fn new(bus: &mut ActionBus) -> Self {
        let state = Rc::new(RefCell::new(NavBarState::default()));

        for button in NavButton::ALL {
            let Some(action) = button.toggle_action() else {
                continue;
            };
            let state = state.clone();
            bus.subscribe(action, move |arg| {
                if let Some(on) = arg.as_bool() {
                    set_active(&state, button, on);
                }
            });
        }

        let zoom_state = state.clone();
        bus.subscribe(actions::ZOOM_UPDATED, move |arg: &ActionArg| {
            if let Some(level) = arg.as_level() {
                zoom_state.borrow_mut().zoom_level = level;
            }
        });

        Self { state }
    }

    pub fn is_active(&self, button: NavButton) -> bool {
        self.state.borrow().active[button.index()]
    }

    pub fn zoom_level(&self) -> u8 {
        self.state.borrow().zoom_level
    }

    pub fn buttons(&self) -> impl Iterator<Item = (NavButton, bool)> + '_ {
        NavButton::ALL.into_iter().map(|b| (b, self.is_active(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_bus_actions() {
        let mut bus = ActionBus::new();
        let bar = NavBar::new(&mut bus);
        assert!(!bar.is_active(NavButton::Autorotate));

        bus.publish(actions::AUTOROTATE, ActionArg::Bool(true));
        bus.publish(actions::FULLSCREEN_UPDATED, ActionArg::Bool(true));
        bus.publish(actions::ZOOM_UPDATED, ActionArg::Level(12));
        assert!(bar.is_active(NavButton::Autorotate));
        assert!(bar.is_active(NavButton::Fullscreen));
        assert!(!bar.is_active(NavButton::Orientation));
        assert_eq!(bar.zoom_level(), 12);

        bus.publish(actions::AUTOROTATE, ActionArg::Bool(false));
        assert!(!bar.is_active(NavButton::Autorotate));
    }

    #[test]
    fn every_button_has_a_command() {
        let commands: Vec<_> = NavButton::ALL.iter().map(|b| b.command()).collect();
        assert_eq!(commands.len(), 6);
        assert_eq!(NavButton::VirtualReality.command(), NavCommand::ToggleStereo);
        assert_eq!(NavButton::ZoomIn.toggle_action(), None);
    }
}
