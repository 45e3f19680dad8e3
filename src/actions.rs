// actions.rs — 命名事件总线：向导航栏等外部 UI 通知状态变化

use std::collections::HashMap;

pub const ZOOM_UPDATED: &str = "zoom-updated";
pub const AUTOROTATE: &str = "autorotate";
pub const FULLSCREEN_UPDATED: &str = "fullscreen-updated";
pub const ORIENTATION: &str = "orientation";
pub const STEREO: &str = "stereo";
pub const POSITION_UPDATED: &str = "position-updated";
pub const READY: &str = "ready";

/// Payload passed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionArg {
    None,
    Bool(bool),
    Level(u8),
    Position { longitude: f64, latitude: f64 },
}

impl ActionArg {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_level(&self) -> Option<u8> {
        match *self {
            Self::Level(l) => Some(l),
            _ => None,
        }
    }
}

type Callback = Box<dyn FnMut(&ActionArg)>;

/// Append-only publish/subscribe registry. Dispatch is synchronous and in
/// subscription order.
#[derive(Default)]
pub struct ActionBus {
    subscribers: HashMap<String, Vec<Callback>>,
}

impl ActionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, name: &str, callback: impl FnMut(&ActionArg) + 'static) {
        self.subscribers
            .entry(name.to_owned())
            .or_default()
            .push(Box::new(callback));
    }

    pub fn publish(&mut self, name: &str, arg: ActionArg) {
        let Some(callbacks) = self.subscribers.get_mut(name) else {
            return;
        };
        log::trace!("action {name} -> {} subscriber(s): {arg:?}", callbacks.len());
        for cb in callbacks.iter_mut() {
            cb(&arg);
        }
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers.get(name).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for ActionBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> =
            self.subscribers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        names.sort_unstable();
        f.debug_struct("ActionBus").field("subscribers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn dispatches_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ActionBus::new();
        for id in 0..3 {
            let log = log.clone();
            bus.subscribe(ZOOM_UPDATED, move |arg| log.borrow_mut().push((id, arg.as_level())));
        }
        bus.publish(ZOOM_UPDATED, ActionArg::Level(42));
        assert_eq!(*log.borrow(), vec![(0, Some(42)), (1, Some(42)), (2, Some(42))]);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let mut bus = ActionBus::new();
        bus.publish(AUTOROTATE, ActionArg::Bool(true));
        assert_eq!(bus.subscriber_count(AUTOROTATE), 0);
    }

    #[test]
    fn names_are_independent() {
        let hits = Rc::new(RefCell::new(0));
        let mut bus = ActionBus::new();
        let h = hits.clone();
        bus.subscribe(FULLSCREEN_UPDATED, move |_| *h.borrow_mut() += 1);
        bus.publish(AUTOROTATE, ActionArg::Bool(true));
        bus.publish(FULLSCREEN_UPDATED, ActionArg::Bool(true));
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(bus.subscriber_count(FULLSCREEN_UPDATED), 1);
    }
}
