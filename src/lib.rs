use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod services;
pub mod ui;
pub mod version;

pub use config::Config;
pub use models::Link;

use db::ObjectStore;
use events::EventBus;
use services::LinkManager;
use ui::{FocusController, LinkAppState, LinkEditor, ModalDialog, Projection};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<ObjectStore>,
    pub bus: Arc<EventBus>,
    pub links: LinkManager,
    pub ui_state: Arc<LinkAppState>,
    pub projection: Arc<Projection>,
    pub focus: Arc<FocusController>,
    pub editor: LinkEditor,
}

impl AppContext {
    /// Wires the store, bus, manager and UI layers together. The store
    /// connects lazily on first use.
    pub fn new(config: Config) -> Self {
        let store = Arc::new(ObjectStore::new(config.database_url.clone()));
        let bus = Arc::new(EventBus::new());
        let links = LinkManager::new(store.clone(), bus.clone(), config.favicon_strategy);

        let ui_state = Arc::new(LinkAppState::new(bus.clone()));
        let projection = Arc::new(Projection::new(ui_state.clone()));
        projection.attach(&bus);
        let focus = Arc::new(FocusController::new(ModalDialog::link_modal()));
        focus.attach(&bus);

        let editor = LinkEditor::new(links.clone(), ui_state.clone(), projection.clone());

        AppContext {
            config: Arc::new(config),
            store,
            bus,
            links,
            ui_state,
            projection,
            focus,
            editor,
        }
    }
}

pub fn create_router(context: AppContext) -> Router {
    Router::new()
        .route("/", get(handlers::pages::dashboard))
        .route("/health", get(handlers::health::health_check))
        .route("/favicon.png", get(handlers::favicon::favicon_png))
        .route("/favicon.ico", get(handlers::favicon::favicon_ico))
        // Fragments
        .route("/fragments/links", get(handlers::pages::link_list_fragment))
        .route(
            "/fragments/favorites",
            get(handlers::pages::favorites_fragment),
        )
        .route("/fragments/form", get(handlers::pages::form_fragment))
        // Link routes
        .route(
            "/api/links",
            get(handlers::links::list_links).post(handlers::links::create_link),
        )
        .route("/api/links/favorites", get(handlers::links::list_favorites))
        .route("/api/links/lookup", get(handlers::links::lookup_link))
        .route(
            "/api/links/{id}",
            get(handlers::links::get_link)
                .put(handlers::links::update_link)
                .delete(handlers::links::delete_link),
        )
        .route(
            "/api/links/{id}/favorite",
            put(handlers::links::toggle_favorite),
        )
        // Editor routes
        .route("/api/editor", get(handlers::editor::get_state))
        .route("/api/editor/modal/open", post(handlers::editor::open_modal))
        .route(
            "/api/editor/modal/close",
            post(handlers::editor::close_modal),
        )
        .route("/api/editor/focus/tab", post(handlers::editor::tab))
        .route(
            "/api/editor/selection",
            put(handlers::editor::select_link).delete(handlers::editor::clear_selection),
        )
        .route("/api/editor/form", put(handlers::editor::edit_form))
        .route(
            "/api/editor/form/submit",
            post(handlers::editor::submit_form),
        )
        .route("/api/editor/form/reset", post(handlers::editor::reset_form))
        .route("/api/editor/remove", post(handlers::editor::remove_link))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::FaviconStrategy;

    #[test]
    fn test_context_keeps_favicon_strategy() {
        let strategy = FaviconStrategy::Google { size: 32 };
        let context = AppContext::new(Config {
            favicon_strategy: strategy,
            ..Config::in_memory()
        });

        assert_eq!(context.config.favicon_strategy, strategy);
        assert_eq!(
            context.links.favicon_url("https://example.com/path"),
            "https://www.google.com/s2/favicons?domain=example.com&sz=32"
        );
    }
}
