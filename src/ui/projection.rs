//! Event-driven rendering of the link views.
//!
//! The projection keeps the HTML for the all-links list, the favorites list
//! and the edit form current by listening to the bus. It holds no state of its
//! own beyond what those events carry: the id → link read model is rebuilt
//! from `all-loaded` and patched by `added`/`updated`/`deleted`.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use askama::Template;
use serde::Serialize;
use tracing::warn;

use crate::events::{Event, EventBus, HandlerResult, Topic};
use crate::models::Link;
use crate::services::DEFAULT_FAVICON;
use crate::ui::sanitize::sanitize_fragment;
use crate::ui::state::{FormData, LinkAppState};

pub const FAVORITE_ADD_LABEL: &str = "Add to favorites";
pub const FAVORITE_REMOVE_LABEL: &str = "Remove from favorites";

pub fn favorite_label(is_favorite: bool) -> &'static str {
    if is_favorite {
        FAVORITE_REMOVE_LABEL
    } else {
        FAVORITE_ADD_LABEL
    }
}

pub struct LinkItem {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub is_favorite: bool,
    pub is_selected: bool,
}

impl LinkItem {
    fn new(link: &Link, selected: Option<i64>) -> Self {
        LinkItem {
            id: link.id,
            url: link.url.clone(),
            title: link.title.clone(),
            description: link.description.clone(),
            favicon: link.favicon.clone(),
            is_favorite: link.is_favorite,
            is_selected: selected == Some(link.id),
        }
    }
}

/// What the edit form currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditForm {
    pub link_id: Option<i64>,
    pub title: String,
    pub url: String,
    pub description: String,
    pub favicon: String,
    pub is_favorite: bool,
}

impl Default for EditForm {
    fn default() -> Self {
        EditForm {
            link_id: None,
            title: String::new(),
            url: String::new(),
            description: String::new(),
            favicon: DEFAULT_FAVICON.to_string(),
            is_favorite: false,
        }
    }
}

impl EditForm {
    fn from_link(link: &Link) -> Self {
        EditForm {
            link_id: Some(link.id),
            title: link.title.clone(),
            url: link.url.clone(),
            description: link.description.clone(),
            favicon: link.favicon.clone(),
            is_favorite: link.is_favorite,
        }
    }

    pub fn form_data(&self) -> FormData {
        FormData {
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "fragments/link_list.html")]
struct LinkListTemplate<'a> {
    items: &'a [LinkItem],
}

#[derive(Template)]
#[template(path = "fragments/favorites.html")]
struct FavoritesTemplate<'a> {
    items: &'a [LinkItem],
}

struct FormView {
    link_id: String,
    title: String,
    url: String,
    description: String,
    favicon: String,
    header_href: String,
    is_favorite: bool,
    favorite_label: &'static str,
}

#[derive(Template)]
#[template(path = "fragments/link_form.html")]
struct LinkFormTemplate {
    form: FormView,
}

pub fn render_link_list(links: &[Link], selected: Option<i64>) -> Result<String, askama::Error> {
    let items: Vec<LinkItem> = links.iter().map(|l| LinkItem::new(l, selected)).collect();
    let html = LinkListTemplate { items: &items }.render()?;
    Ok(sanitize_fragment(&html))
}

pub fn render_favorites(links: &[Link]) -> Result<String, askama::Error> {
    let items: Vec<LinkItem> = links.iter().map(|l| LinkItem::new(l, None)).collect();
    let html = FavoritesTemplate { items: &items }.render()?;
    Ok(sanitize_fragment(&html))
}

pub fn render_form(form: &EditForm) -> Result<String, askama::Error> {
    LinkFormTemplate {
        form: FormView {
            link_id: form.link_id.map(|id| id.to_string()).unwrap_or_default(),
            title: form.title.clone(),
            url: form.url.clone(),
            description: form.description.clone(),
            favicon: form.favicon.clone(),
            header_href: if form.url.is_empty() {
                "#".to_string()
            } else {
                form.url.clone()
            },
            is_favorite: form.is_favorite,
            favorite_label: favorite_label(form.is_favorite),
        },
    }
    .render()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Default)]
struct Views {
    catalog: BTreeMap<i64, Link>,
    listed: Vec<i64>,
    link_list: String,
    favorites: String,
    form: EditForm,
    form_html: String,
    notice: Option<Notice>,
    busy: usize,
}

pub struct Projection {
    state: Arc<LinkAppState>,
    views: RwLock<Views>,
}

impl Projection {
    pub fn new(state: Arc<LinkAppState>) -> Self {
        let form = EditForm::default();
        let views = Views {
            link_list: render_link_list(&[], None).unwrap_or_default(),
            favorites: render_favorites(&[]).unwrap_or_default(),
            form_html: render_form(&form).unwrap_or_default(),
            form,
            ..Views::default()
        };

        Projection {
            state,
            views: RwLock::new(views),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Views> {
        self.views.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Views> {
        self.views.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        for topic in [
            Topic::AllLoaded,
            Topic::FavoritesLoaded,
            Topic::Added,
            Topic::Updated,
            Topic::Deleted,
            Topic::LinkSelected,
            Topic::LoadingStarted,
            Topic::LoadingEnded,
            Topic::Success,
            Topic::Error,
        ] {
            let this = Arc::downgrade(self);
            bus.subscribe(topic, move |event| match this.upgrade() {
                Some(this) => this.apply(event),
                None => Ok(()),
            });
        }
    }

    fn apply(&self, event: &Event) -> HandlerResult {
        match event {
            Event::AllLoaded(links) => {
                let html = render_link_list(links, self.state.selected_link_id())?;
                let mut views = self.write();
                views.catalog = links.iter().map(|l| (l.id, l.clone())).collect();
                views.listed = links.iter().map(|l| l.id).collect();
                views.link_list = html;
            }
            Event::FavoritesLoaded(links) => {
                let html = render_favorites(links)?;
                let mut views = self.write();
                for link in links {
                    views.catalog.insert(link.id, link.clone());
                }
                views.favorites = html;
            }
            Event::Added(link) => {
                let mut views = self.write();
                views.catalog.insert(link.id, link.clone());
                views.listed.push(link.id);
                self.rerender_lists(&mut views)?;
            }
            Event::Updated(link) => {
                {
                    let mut views = self.write();
                    views.catalog.insert(link.id, link.clone());
                    self.rerender_lists(&mut views)?;
                }
                if self.state.selected_link_id() == Some(link.id) {
                    self.show_selection(Some(link.id))?;
                }
            }
            Event::Deleted { id } => {
                {
                    let mut views = self.write();
                    views.catalog.remove(id);
                    views.listed.retain(|listed| listed != id);
                    self.rerender_lists(&mut views)?;
                }
                // The form must not keep pointing at a removed link.
                if self.state.selected_link_id() == Some(*id) {
                    self.state.set_form_dirty(false);
                    self.state.clear_selected_link();
                }
            }
            Event::LinkSelected { link_id, .. } => self.show_selection(*link_id)?,
            Event::LoadingStarted(_) => self.write().busy += 1,
            Event::LoadingEnded(_) => {
                let mut views = self.write();
                views.busy = views.busy.saturating_sub(1);
            }
            Event::Success(notice) => {
                self.write().notice = Some(Notice {
                    kind: NoticeKind::Success,
                    message: notice.message.to_string(),
                });
            }
            Event::Error(notice) => {
                self.write().notice = Some(Notice {
                    kind: NoticeKind::Error,
                    message: notice.message.clone(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Rebuilds both lists from the read model after a single-link change.
    /// Favorites follow store order, which is id order.
    fn rerender_lists(&self, views: &mut Views) -> HandlerResult {
        let listed: Vec<Link> = views
            .listed
            .iter()
            .filter_map(|id| views.catalog.get(id).cloned())
            .collect();
        let favorites: Vec<Link> = views
            .catalog
            .values()
            .filter(|l| l.is_favorite)
            .cloned()
            .collect();

        views.link_list = render_link_list(&listed, self.state.selected_link_id())?;
        views.favorites = render_favorites(&favorites)?;
        Ok(())
    }

    fn show_selection(&self, link_id: Option<i64>) -> HandlerResult {
        let mut views = self.write();

        let form = match link_id {
            Some(id) => match views.catalog.get(&id) {
                Some(link) => EditForm::from_link(link),
                None => {
                    warn!(id, "Selected link is not in the loaded views");
                    EditForm::default()
                }
            },
            None => EditForm::default(),
        };
        let form_html = render_form(&form)?;

        let listed: Vec<Link> = views
            .listed
            .iter()
            .filter_map(|id| views.catalog.get(id).cloned())
            .collect();
        let link_list = render_link_list(&listed, link_id)?;

        self.state.set_original_form_data(if form.link_id.is_some() {
            form.form_data()
        } else {
            FormData::default()
        });

        views.form = form;
        views.form_html = form_html;
        views.link_list = link_list;
        Ok(())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.read().catalog.contains_key(&id)
    }

    pub fn link_list_html(&self) -> String {
        self.read().link_list.clone()
    }

    pub fn favorites_html(&self) -> String {
        self.read().favorites.clone()
    }

    pub fn form_html(&self) -> String {
        self.read().form_html.clone()
    }

    pub fn form(&self) -> EditForm {
        self.read().form.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.read().notice.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.read().busy > 0
    }
}
