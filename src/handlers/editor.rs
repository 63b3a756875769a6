use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::links::LinkResponse;
use crate::ui::editor::{Discard, FormReset, FormSubmission, Removal, Selection};
use crate::ui::projection::{EditForm, Notice};
use crate::ui::state::{FormData, StateSnapshot};
use crate::ui::FocusTarget;
use crate::AppContext;

#[derive(Debug, Serialize)]
pub struct EditorResponse {
    pub state: StateSnapshot,
    pub form: EditForm,
    pub focused: FocusTarget,
    pub focus_trapped: bool,
    pub notice: Option<Notice>,
    pub busy: bool,
}

#[derive(Debug, Deserialize)]
pub struct OpenModalRequest {
    #[serde(default)]
    pub focused: FocusTarget,
}

#[derive(Debug, Serialize)]
pub struct ModalResponse {
    pub changed: bool,
    pub is_modal_open: bool,
    pub focused: FocusTarget,
}

#[derive(Debug, Serialize)]
pub struct CloseModalResponse {
    #[serde(flatten)]
    pub discard: Discard,
    pub changed: bool,
    pub is_modal_open: bool,
    pub focused: FocusTarget,
}

#[derive(Debug, Deserialize)]
pub struct TabRequest {
    #[serde(default)]
    pub shift: bool,
    /// Where focus is now, when it moved by other means than Tab.
    #[serde(default)]
    pub current: Option<FocusTarget>,
}

#[derive(Debug, Serialize)]
pub struct TabResponse {
    /// `None` when no trap is active and the browser default applies.
    pub focused: Option<FocusTarget>,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub id: i64,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct DirtyResponse {
    pub is_dirty: bool,
}

pub async fn get_state(State(context): State<AppContext>) -> Json<EditorResponse> {
    Json(EditorResponse {
        state: context.ui_state.snapshot(),
        form: context.projection.form(),
        focused: context.focus.focused(),
        focus_trapped: context.focus.is_trapping(),
        notice: context.projection.notice(),
        busy: context.projection.is_busy(),
    })
}

pub async fn open_modal(
    State(context): State<AppContext>,
    Json(req): Json<OpenModalRequest>,
) -> AppResult<Json<ModalResponse>> {
    let changed = context.editor.open_modal(req.focused).await?;
    Ok(Json(ModalResponse {
        changed,
        is_modal_open: context.ui_state.is_modal_open(),
        focused: context.focus.focused(),
    }))
}

pub async fn close_modal(
    State(context): State<AppContext>,
    Json(req): Json<ConfirmRequest>,
) -> Json<CloseModalResponse> {
    let was_open = context.ui_state.is_modal_open();
    let discard = context.editor.close_modal(&req.confirm);
    let is_modal_open = context.ui_state.is_modal_open();
    Json(CloseModalResponse {
        discard,
        changed: was_open != is_modal_open,
        is_modal_open,
        focused: context.focus.focused(),
    })
}

pub async fn tab(
    State(context): State<AppContext>,
    Json(req): Json<TabRequest>,
) -> Json<TabResponse> {
    if let Some(current) = req.current {
        context.focus.focus(current);
    }
    Json(TabResponse {
        focused: context.focus.handle_tab(req.shift),
    })
}

pub async fn select_link(
    State(context): State<AppContext>,
    Json(req): Json<SelectRequest>,
) -> AppResult<Json<Selection>> {
    let selection = context.editor.select_link(req.id, &req.confirm).await?;
    Ok(Json(selection))
}

pub async fn clear_selection(
    State(context): State<AppContext>,
    Json(req): Json<ConfirmRequest>,
) -> Json<Discard> {
    Json(context.editor.clear_form(&req.confirm))
}

pub async fn edit_form(
    State(context): State<AppContext>,
    Json(current): Json<FormData>,
) -> Json<DirtyResponse> {
    Json(DirtyResponse {
        is_dirty: context.editor.edit_form(&current),
    })
}

pub async fn submit_form(
    State(context): State<AppContext>,
    Json(submission): Json<FormSubmission>,
) -> AppResult<Json<LinkResponse>> {
    let link = context.editor.submit(submission).await?;
    Ok(Json(link.into()))
}

pub async fn reset_form(State(context): State<AppContext>) -> Json<FormReset> {
    Json(context.editor.reset_form().await)
}

pub async fn remove_link(
    State(context): State<AppContext>,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<Json<Removal>> {
    let removal = context.editor.remove_selected(&req.confirm).await?;
    Ok(Json(removal))
}
