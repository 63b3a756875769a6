use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::events::{Event, EventBus};
use crate::ui::focus::FocusTarget;

/// The editable fields of the link form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl FormData {
    /// Field values as the form submits them, surrounding whitespace removed.
    pub fn trimmed(&self) -> FormData {
        FormData {
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Modal {
    #[default]
    Closed,
    Open { restore_focus: FocusTarget },
}

#[derive(Debug, Default)]
struct Inner {
    selected_link_id: Option<i64>,
    is_form_dirty: bool,
    original_form_data: FormData,
    modal: Modal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub selected_link_id: Option<i64>,
    pub is_form_dirty: bool,
    pub original_form_data: FormData,
    pub is_modal_open: bool,
}

/// Session-scoped editor state: selection, dirty tracking and modal
/// visibility.
///
/// Events are published after the internal lock is released, so handlers may
/// call back into this type.
#[derive(Debug)]
pub struct LinkAppState {
    inner: Mutex<Inner>,
    bus: Arc<EventBus>,
}

impl LinkAppState {
    pub fn new(bus: Arc<EventBus>) -> Self {
        LinkAppState {
            inner: Mutex::new(Inner::default()),
            bus,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn selected_link_id(&self) -> Option<i64> {
        self.inner().selected_link_id
    }

    pub fn set_selected_link(&self, link_id: i64) {
        self.select(Some(link_id));
    }

    pub fn clear_selected_link(&self) {
        self.select(None);
    }

    fn select(&self, link_id: Option<i64>) {
        let previous_id = std::mem::replace(&mut self.inner().selected_link_id, link_id);
        self.bus.publish(Event::LinkSelected {
            link_id,
            previous_id,
        });
    }

    pub fn is_form_dirty(&self) -> bool {
        self.inner().is_form_dirty
    }

    /// Returns whether the flag changed; `form-dirty-changed` fires only then.
    pub fn set_form_dirty(&self, is_dirty: bool) -> bool {
        let changed = {
            let mut inner = self.inner();
            let changed = inner.is_form_dirty != is_dirty;
            inner.is_form_dirty = is_dirty;
            changed
        };
        if changed {
            self.bus.publish(Event::FormDirtyChanged { is_dirty });
        }
        changed
    }

    pub fn set_original_form_data(&self, data: FormData) {
        self.inner().original_form_data = data;
    }

    pub fn original_form_data(&self) -> FormData {
        self.inner().original_form_data.clone()
    }

    pub fn has_form_changes(&self, current: &FormData) -> bool {
        self.inner().original_form_data != *current
    }

    pub fn is_modal_open(&self) -> bool {
        matches!(self.inner().modal, Modal::Open { .. })
    }

    /// Opens the modal, remembering `focused` for restoration. Returns
    /// `false` without publishing when it was already open.
    pub fn open_modal(&self, focused: FocusTarget) -> bool {
        {
            let mut inner = self.inner();
            if matches!(inner.modal, Modal::Open { .. }) {
                return false;
            }
            inner.modal = Modal::Open {
                restore_focus: focused.clone(),
            };
        }
        self.bus.publish(Event::ModalOpened {
            focus_element: focused,
        });
        true
    }

    /// Closes the modal. Returns `false` without publishing when it was
    /// already closed.
    pub fn close_modal(&self) -> bool {
        let restore = match std::mem::take(&mut self.inner().modal) {
            Modal::Open { restore_focus } => restore_focus,
            Modal::Closed => return false,
        };
        self.bus.publish(Event::ModalClosed {
            previous_focused_element: restore,
        });
        true
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner();
        StateSnapshot {
            selected_link_id: inner.selected_link_id,
            is_form_dirty: inner.is_form_dirty,
            original_form_data: inner.original_form_data.clone(),
            is_modal_open: matches!(inner.modal, Modal::Open { .. }),
        }
    }
}
