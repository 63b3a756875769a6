//! User-facing flows of the link modal: selecting, editing, saving, resetting
//! and removing links.
//!
//! The editor never renders anything itself. It drives the [`LinkManager`] and
//! [`LinkAppState`]; the projection picks the results up from the bus.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::events::{ErrorNotice, Event, Operation};
use crate::models::{Link, LinkPatch};
use crate::services::{LinkManager, NewLink, DEFAULT_FAVICON};
use crate::ui::focus::FocusTarget;
use crate::ui::projection::{EditForm, Projection};
use crate::ui::state::{FormData, LinkAppState};

pub const DISCARD_CHANGES_PROMPT: &str = "You have unsaved changes. Select another link anyway?";
pub const DISCARD_FORM_PROMPT: &str = "You have unsaved changes. Discard them?";
pub const DELETE_PROMPT: &str = "Delete the selected link?";

/// Answers a yes/no question before a discarding or destructive action.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

/// A pre-recorded answer, as sent along with an HTTP request.
impl Confirm for bool {
    fn confirm(&self, _message: &str) -> bool {
        *self
    }
}

/// The form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_favorite: bool,
}

impl FormSubmission {
    fn form_data(&self) -> FormData {
        FormData {
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
        }
        .trimmed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Selection {
    Selected { form: EditForm },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Removal {
    Removed { id: i64 },
    Cancelled,
}

/// Outcome of leaving the form, which asks first when it holds unsaved
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Discard {
    Discarded,
    Cancelled,
}

/// Values to put back into the form on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormReset {
    pub form: FormData,
    pub favicon: String,
    pub is_favorite: bool,
}

#[derive(Clone)]
pub struct LinkEditor {
    links: LinkManager,
    state: Arc<LinkAppState>,
    projection: Arc<Projection>,
}

impl LinkEditor {
    pub fn new(links: LinkManager, state: Arc<LinkAppState>, projection: Arc<Projection>) -> Self {
        LinkEditor {
            links,
            state,
            projection,
        }
    }

    fn reject<T>(&self, operation: Operation, err: AppError) -> AppResult<T> {
        self.links.bus().publish(Event::Error(ErrorNotice {
            operation,
            kind: err.kind(),
            message: err.to_string(),
        }));
        Err(err)
    }

    /// Opens the modal, remembering `focused` for when it closes, and loads
    /// both lists. Returns `false` when the modal was already open.
    pub async fn open_modal(&self, focused: FocusTarget) -> AppResult<bool> {
        let opened = self.state.open_modal(focused);
        self.refresh().await?;
        Ok(opened)
    }

    /// Closes the modal and discards whatever the form held. A dirty form is
    /// only discarded once `confirm` agrees.
    pub fn close_modal(&self, confirm: &impl Confirm) -> Discard {
        if !self.may_discard(confirm) {
            debug!("Close declined, keeping unsaved changes");
            return Discard::Cancelled;
        }
        self.state.close_modal();
        self.reset_selection();
        Discard::Discarded
    }

    fn may_discard(&self, confirm: &impl Confirm) -> bool {
        !self.state.is_form_dirty() || confirm.confirm(DISCARD_FORM_PROMPT)
    }

    pub async fn refresh(&self) -> AppResult<()> {
        tokio::try_join!(self.links.get_all(), self.links.get_favorites())?;
        Ok(())
    }

    pub async fn select_link(&self, id: i64, confirm: &impl Confirm) -> AppResult<Selection> {
        if self.state.is_form_dirty() {
            if self.state.selected_link_id() == Some(id) {
                return Ok(Selection::Selected {
                    form: self.projection.form(),
                });
            }
            if !confirm.confirm(DISCARD_CHANGES_PROMPT) {
                debug!(id, "Selection declined, keeping unsaved changes");
                return Ok(Selection::Cancelled);
            }
        }

        if !self.projection.contains(id) {
            self.links.get_all().await?;
            if !self.projection.contains(id) {
                return Err(AppError::LinkNotFound);
            }
        }

        self.state.set_form_dirty(false);
        self.state.set_selected_link(id);
        Ok(Selection::Selected {
            form: self.projection.form(),
        })
    }

    /// Tracks whether `current` differs from the loaded values. Returns the
    /// resulting dirty flag.
    pub fn edit_form(&self, current: &FormData) -> bool {
        let dirty = self.state.has_form_changes(&current.trimmed());
        self.state.set_form_dirty(dirty);
        dirty
    }

    /// Empties the form for a new link, asking first when it is dirty.
    pub fn clear_form(&self, confirm: &impl Confirm) -> Discard {
        if !self.may_discard(confirm) {
            return Discard::Cancelled;
        }
        self.reset_selection();
        Discard::Discarded
    }

    fn reset_selection(&self) {
        self.state.clear_selected_link();
        self.state.set_form_dirty(false);
    }

    /// Saves the form: updates the selected link, or adds a new one when
    /// nothing is selected. The form is cleared and both lists reloaded on
    /// success; on failure the form is left as it was.
    pub async fn submit(&self, submission: FormSubmission) -> AppResult<Link> {
        let data = submission.form_data();
        let selected = self.state.selected_link_id();

        if data.url.is_empty() {
            let operation = match selected {
                Some(_) => Operation::Update,
                None => Operation::Add,
            };
            return self.reject(operation, AppError::UrlRequired);
        }

        let link = match selected {
            Some(id) => {
                let patch = LinkPatch {
                    url: Some(data.url),
                    title: Some(data.title),
                    description: Some(data.description),
                    is_favorite: Some(submission.is_favorite),
                };
                self.links.update(id, patch).await?
            }
            None => {
                let input = NewLink {
                    url: data.url,
                    title: Some(data.title),
                    description: Some(data.description),
                    is_favorite: submission.is_favorite,
                };
                self.links.add(input).await?
            }
        };

        self.reset_selection();
        self.refresh().await?;
        Ok(link)
    }

    /// Values the form had when the selection was made. The stored favorite
    /// flag is looked up again; a failed lookup leaves it unchecked.
    pub async fn reset_form(&self) -> FormReset {
        let form = self.state.original_form_data();
        let favicon = if form.url.is_empty() {
            DEFAULT_FAVICON.to_string()
        } else {
            self.links.favicon_url(&form.url)
        };

        let is_favorite = match self.state.selected_link_id() {
            Some(id) => match self.links.get_by_id(id).await {
                Ok(link) => link.is_favorite,
                Err(e) => {
                    warn!(id, "Failed to look up link during form reset: {}", e);
                    false
                }
            },
            None => false,
        };

        self.state.set_form_dirty(false);
        FormReset {
            form,
            favicon,
            is_favorite,
        }
    }

    pub async fn remove_selected(&self, confirm: &impl Confirm) -> AppResult<Removal> {
        let Some(id) = self.state.selected_link_id() else {
            return self.reject(Operation::Delete, AppError::NoLinkSelected);
        };
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(Removal::Cancelled);
        }

        self.links.delete(id).await?;
        self.reset_selection();
        self.refresh().await?;
        Ok(Removal::Removed { id })
    }
}
