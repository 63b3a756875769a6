//! Keyboard focus trapping and ARIA bookkeeping for the link modal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{Event, EventBus, Topic};

/// An element that can hold keyboard focus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusTarget {
    /// The document body, i.e. nothing in particular is focused.
    #[default]
    Body,
    /// An element identified by its DOM id.
    Element(String),
}

impl FocusTarget {
    pub fn element(id: impl Into<String>) -> Self {
        FocusTarget::Element(id.into())
    }
}

/// Static description of the modal dialog markup.
#[derive(Debug, Clone)]
pub struct ModalDialog {
    pub id: String,
    pub labelled_by: Option<String>,
    /// Focusable descendants in tab order.
    pub focusables: Vec<String>,
    /// Element to focus on open; the first focusable when `None`.
    pub initial_focus: Option<String>,
}

impl ModalDialog {
    /// The link manager modal as rendered by the dashboard template.
    pub fn link_modal() -> Self {
        ModalDialog {
            id: "link-modal".to_string(),
            labelled_by: Some("link-modal__title".to_string()),
            focusables: [
                "link-modal__close",
                "link-modal__add",
                "link-modal__remove",
                "link-modal__header__name",
                "link-modal__form__favorite",
                "link-modal__form__url",
                "link-modal__form__description",
                "link-modal__form__reset",
                "link-modal__form__submit",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            initial_focus: Some("link-modal__form__url".to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct FocusInner {
    trapping: bool,
    focused: FocusTarget,
    restore_to: Option<FocusTarget>,
    attributes: Vec<(&'static str, String)>,
}

#[derive(Debug)]
pub struct FocusController {
    dialog: ModalDialog,
    inner: Mutex<FocusInner>,
}

impl FocusController {
    pub fn new(dialog: ModalDialog) -> Self {
        FocusController {
            dialog,
            inner: Mutex::new(FocusInner::default()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, FocusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dialog(&self) -> &ModalDialog {
        &self.dialog
    }

    /// Reacts to `modal-opened` and `modal-closed`.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        let this = Arc::downgrade(self);
        bus.subscribe(Topic::ModalOpened, move |event| {
            if let (Some(this), Event::ModalOpened { focus_element }) = (this.upgrade(), event) {
                this.activate(focus_element.clone());
            }
            Ok(())
        });

        let this = Arc::downgrade(self);
        bus.subscribe(Topic::ModalClosed, move |event| {
            if let (Some(this), Event::ModalClosed { previous_focused_element }) =
                (this.upgrade(), event)
            {
                this.deactivate(Some(previous_focused_element.clone()));
            }
            Ok(())
        });
    }

    /// Starts trapping focus inside the dialog and returns the element that
    /// now has focus.
    pub fn activate(&self, previously_focused: FocusTarget) -> FocusTarget {
        let mut inner = self.inner();

        let mut attributes = vec![
            ("role", "dialog".to_string()),
            ("aria-modal", "true".to_string()),
        ];
        if let Some(label) = &self.dialog.labelled_by {
            attributes.push(("aria-labelledby", label.clone()));
        }

        let target = self
            .dialog
            .initial_focus
            .clone()
            .filter(|id| self.dialog.focusables.contains(id))
            .or_else(|| self.dialog.focusables.first().cloned())
            .unwrap_or_else(|| self.dialog.id.clone());

        inner.trapping = true;
        inner.restore_to = Some(previously_focused);
        inner.attributes = attributes;
        inner.focused = FocusTarget::Element(target);
        debug!(focused = ?inner.focused, "Focus trap activated");
        inner.focused.clone()
    }

    /// Releases the trap and restores focus. `restore` overrides the element
    /// captured on activation; with neither, focus returns to the body.
    pub fn deactivate(&self, restore: Option<FocusTarget>) -> FocusTarget {
        let mut inner = self.inner();
        let target = restore
            .or_else(|| inner.restore_to.take())
            .unwrap_or(FocusTarget::Body);

        inner.trapping = false;
        inner.restore_to = None;
        inner.attributes.clear();
        inner.focused = target.clone();
        debug!(focused = ?target, "Focus trap released");
        target
    }

    /// Moves focus for a Tab (or Shift+Tab) keypress, wrapping at the ends
    /// while the trap is active. Returns `None` when no trap is active so the
    /// browser default applies.
    pub fn handle_tab(&self, shift: bool) -> Option<FocusTarget> {
        let mut inner = self.inner();
        if !inner.trapping {
            return None;
        }

        let order = &self.dialog.focusables;
        if order.is_empty() {
            return Some(inner.focused.clone());
        }

        let position = match &inner.focused {
            FocusTarget::Element(id) => order.iter().position(|f| f == id),
            FocusTarget::Body => None,
        };
        let next = match (position, shift) {
            (Some(i), false) => (i + 1) % order.len(),
            (Some(0), true) => order.len() - 1,
            (Some(i), true) => i - 1,
            (None, false) => 0,
            (None, true) => order.len() - 1,
        };

        inner.focused = FocusTarget::Element(order[next].clone());
        Some(inner.focused.clone())
    }

    /// Records a focus change that did not come from Tab, e.g. a click.
    pub fn focus(&self, target: FocusTarget) {
        self.inner().focused = target;
    }

    pub fn focused(&self) -> FocusTarget {
        self.inner().focused.clone()
    }

    pub fn is_trapping(&self) -> bool {
        self.inner().trapping
    }

    /// ARIA attributes currently applied to the dialog element.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        self.inner().attributes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialog(focusables: &[&str]) -> ModalDialog {
        ModalDialog {
            id: "dialog".to_string(),
            labelled_by: Some("dialog-title".to_string()),
            focusables: focusables.iter().map(|s| s.to_string()).collect(),
            initial_focus: None,
        }
    }

    #[test]
    fn test_activate_sets_aria_and_focuses_first() {
        let focus = FocusController::new(dialog(&["a", "b", "c"]));
        let focused = focus.activate(FocusTarget::element("opener"));

        assert_eq!(focused, FocusTarget::element("a"));
        assert!(focus.is_trapping());
        let attributes = focus.attributes();
        assert!(attributes.contains(&("role", "dialog".to_string())));
        assert!(attributes.contains(&("aria-modal", "true".to_string())));
        assert!(attributes.contains(&("aria-labelledby", "dialog-title".to_string())));
    }

    #[test]
    fn test_activate_prefers_designated_element() {
        let mut d = dialog(&["a", "b", "c"]);
        d.initial_focus = Some("b".to_string());
        let focus = FocusController::new(d);
        assert_eq!(focus.activate(FocusTarget::Body), FocusTarget::element("b"));
    }

    #[test]
    fn test_tab_wraps_in_both_directions() {
        let focus = FocusController::new(dialog(&["a", "b", "c"]));
        focus.activate(FocusTarget::Body);

        assert_eq!(focus.handle_tab(false), Some(FocusTarget::element("b")));
        assert_eq!(focus.handle_tab(false), Some(FocusTarget::element("c")));
        assert_eq!(focus.handle_tab(false), Some(FocusTarget::element("a")));
        assert_eq!(focus.handle_tab(true), Some(FocusTarget::element("c")));
        assert_eq!(focus.handle_tab(true), Some(FocusTarget::element("b")));
    }

    #[test]
    fn test_tab_from_outside_the_order_enters_at_the_edge() {
        let focus = FocusController::new(dialog(&["a", "b", "c"]));
        focus.activate(FocusTarget::Body);
        focus.focus(FocusTarget::element("not-focusable"));
        assert_eq!(focus.handle_tab(true), Some(FocusTarget::element("c")));
        focus.focus(FocusTarget::Body);
        assert_eq!(focus.handle_tab(false), Some(FocusTarget::element("a")));
    }

    #[test]
    fn test_tab_without_trap_is_ignored() {
        let focus = FocusController::new(dialog(&["a"]));
        assert_eq!(focus.handle_tab(false), None);
    }

    #[test]
    fn test_deactivate_restores_previous_focus() {
        let focus = FocusController::new(dialog(&["a", "b"]));
        focus.activate(FocusTarget::element("more-button"));

        assert_eq!(focus.deactivate(None), FocusTarget::element("more-button"));
        assert!(!focus.is_trapping());
        assert!(focus.attributes().is_empty());
        assert_eq!(focus.handle_tab(false), None);
    }

    #[test]
    fn test_deactivate_without_capture_restores_body() {
        let focus = FocusController::new(dialog(&["a"]));
        assert_eq!(focus.deactivate(None), FocusTarget::Body);

        focus.activate(FocusTarget::Body);
        assert_eq!(focus.deactivate(None), FocusTarget::Body);
        assert_eq!(focus.focused(), FocusTarget::Body);
    }

    #[test]
    fn test_dialog_without_focusables_focuses_itself() {
        let focus = FocusController::new(dialog(&[]));
        assert_eq!(focus.activate(FocusTarget::Body), FocusTarget::element("dialog"));
        assert_eq!(focus.handle_tab(false), Some(FocusTarget::element("dialog")));
    }

    #[test]
    fn test_reacts_to_modal_events() {
        let bus = EventBus::new();
        let focus = Arc::new(FocusController::new(dialog(&["a", "b"])));
        focus.attach(&bus);

        bus.publish(Event::ModalOpened {
            focus_element: FocusTarget::element("opener"),
        });
        assert!(focus.is_trapping());
        assert_eq!(focus.focused(), FocusTarget::element("a"));

        bus.publish(Event::ModalClosed {
            previous_focused_element: FocusTarget::element("opener"),
        });
        assert!(!focus.is_trapping());
        assert_eq!(focus.focused(), FocusTarget::element("opener"));
    }
}
