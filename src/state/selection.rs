//! Selection shared between the canvas and the attribute panel.
//!
//! Both sides observe each other's output, so a naive implementation bounces
//! a selection back and forth. Each change records which side originated it;
//! while that update is being processed the other side cannot push a
//! selection of its own back through the bridge. The owner calls
//! [`SelectionBridge::settle`] once the update has fully propagated.

use crate::model::ShapeKey;

/// Side that originated a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Canvas,
    Panel,
}

impl Provenance {
    /// The side that has to hear about a change made here.
    pub fn other(self) -> Provenance {
        match self {
            Provenance::Canvas => Provenance::Panel,
            Provenance::Panel => Provenance::Canvas,
        }
    }
}

/// Notification for the side that did not originate a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionNotice {
    pub key: Option<ShapeKey>,
    pub origin: Provenance,
    pub target: Provenance,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionBridge {
    selected: Option<ShapeKey>,
    provenance: Option<Provenance>,
    /// Originator of the update currently propagating
    active: Option<Provenance>,
}

impl SelectionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<ShapeKey> {
        self.selected
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.provenance
    }

    /// Change the selection on behalf of one side.
    ///
    /// Returns the notice to deliver to the other side, or `None` when nothing
    /// changed or the call is an echo of an update still propagating from the
    /// other side.
    pub fn select(&mut self, key: Option<ShapeKey>, origin: Provenance) -> Option<SelectionNotice> {
        if let Some(active) = self.active.filter(|a| *a != origin) {
            log::trace!(
                "Suppressed {:?} selection echo while {:?} update propagates",
                origin,
                active
            );
            return None;
        }
        if self.selected == key {
            return None;
        }

        self.selected = key;
        self.provenance = Some(origin);
        self.active = Some(origin);
        log::debug!("Selection -> {:?} from {:?}", key, origin);
        Some(SelectionNotice {
            key,
            origin,
            target: origin.other(),
        })
    }

    /// The current update has reached every observer.
    pub fn settle(&mut self) {
        self.active = None;
    }

    /// Drop a selection that no longer refers to a live shape.
    ///
    /// The other side always hears about it, even mid-propagation: its index
    /// would otherwise point at whichever shape moved into the freed slot.
    pub fn forget(&mut self, key: ShapeKey, origin: Provenance) -> Option<SelectionNotice> {
        if self.selected != Some(key) {
            return None;
        }
        self.selected = None;
        self.provenance = Some(origin);
        self.active = Some(origin);
        log::debug!("Selection {:?} removed by {:?}", key, origin);
        Some(SelectionNotice {
            key: None,
            origin,
            target: origin.other(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_selection_notifies_panel() {
        let mut bridge = SelectionBridge::new();
        let notice = bridge.select(Some(ShapeKey(3)), Provenance::Canvas).unwrap();
        assert_eq!(notice.target, Provenance::Panel);
        assert_eq!(notice.key, Some(ShapeKey(3)));
        assert_eq!(bridge.provenance(), Some(Provenance::Canvas));
    }

    #[test]
    fn test_echo_is_suppressed_until_settled() {
        let mut bridge = SelectionBridge::new();
        assert!(bridge.select(Some(ShapeKey(1)), Provenance::Panel).is_some());

        // The canvas reacts by re-announcing the selection it just received
        assert!(bridge.select(Some(ShapeKey(1)), Provenance::Canvas).is_none());
        // Even a different id cannot bounce back during propagation
        assert!(bridge.select(Some(ShapeKey(2)), Provenance::Canvas).is_none());
        assert_eq!(bridge.selected(), Some(ShapeKey(1)));

        bridge.settle();
        let notice = bridge.select(Some(ShapeKey(2)), Provenance::Canvas).unwrap();
        assert_eq!(notice.target, Provenance::Panel);
    }

    #[test]
    fn test_same_selection_is_not_reannounced() {
        let mut bridge = SelectionBridge::new();
        bridge.select(Some(ShapeKey(1)), Provenance::Canvas);
        bridge.settle();
        assert!(bridge.select(Some(ShapeKey(1)), Provenance::Canvas).is_none());
        assert!(bridge.select(Some(ShapeKey(1)), Provenance::Panel).is_none());
    }

    #[test]
    fn test_originator_can_update_again_before_settling() {
        let mut bridge = SelectionBridge::new();
        bridge.select(Some(ShapeKey(1)), Provenance::Canvas);
        let notice = bridge.select(None, Provenance::Canvas).unwrap();
        assert_eq!(notice.key, None);
    }

    #[test]
    fn test_forget_removed_shape_notifies_other_side() {
        let mut bridge = SelectionBridge::new();
        bridge.select(Some(ShapeKey(4)), Provenance::Canvas);
        bridge.settle();

        let notice = bridge.forget(ShapeKey(4), Provenance::Canvas).unwrap();
        assert_eq!(notice.key, None);
        assert_eq!(notice.target, Provenance::Panel);
        assert_eq!(bridge.selected(), None);
        // The deselect that follows the removal is not announced twice
        assert!(bridge.select(None, Provenance::Canvas).is_none());
    }

    #[test]
    fn test_forget_unselected_shape_is_silent() {
        let mut bridge = SelectionBridge::new();
        bridge.select(Some(ShapeKey(1)), Provenance::Canvas);
        assert!(bridge.forget(ShapeKey(2), Provenance::Canvas).is_none());
        assert_eq!(bridge.selected(), Some(ShapeKey(1)));
    }
}
