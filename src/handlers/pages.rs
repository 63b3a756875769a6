use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::warn;

use crate::ui::projection::NoticeKind;
use crate::AppContext;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub favorites: String,
    pub link_list: String,
    pub form: String,
    pub dialog_id: String,
    pub modal_open: bool,
    pub modal_attributes: Vec<(&'static str, String)>,
    pub notice_kind: &'static str,
    pub notice_text: String,
    pub busy: bool,
}

impl IntoResponse for DashboardTemplate {
    fn into_response(self) -> Response {
        match self.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// The start page. Both lists are reloaded first so the page reflects the
/// store; a failed load still renders, with the error in the notice region.
pub async fn dashboard(State(context): State<AppContext>) -> DashboardTemplate {
    if let Err(e) = context.editor.refresh().await {
        warn!("Failed to load links for the dashboard: {}", e);
    }

    let projection = &context.projection;
    let notice = projection.notice();

    DashboardTemplate {
        favorites: projection.favorites_html(),
        link_list: projection.link_list_html(),
        form: projection.form_html(),
        dialog_id: context.focus.dialog().id.clone(),
        modal_open: context.ui_state.is_modal_open(),
        modal_attributes: context.focus.attributes(),
        notice_kind: match notice.as_ref().map(|n| n.kind) {
            Some(NoticeKind::Error) => "error",
            Some(NoticeKind::Success) => "success",
            None => "empty",
        },
        notice_text: notice.map(|n| n.message).unwrap_or_default(),
        busy: projection.is_busy(),
    }
}

pub async fn link_list_fragment(State(context): State<AppContext>) -> Html<String> {
    Html(context.projection.link_list_html())
}

pub async fn favorites_fragment(State(context): State<AppContext>) -> Html<String> {
    Html(context.projection.favorites_html())
}

pub async fn form_fragment(State(context): State<AppContext>) -> Html<String> {
    Html(context.projection.form_html())
}
