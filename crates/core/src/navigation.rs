//! Reserved navigation codes: history moves and page moves.

use tracing::debug;

use crate::{
    config::NavigationConfig,
    models::{Choice, Status},
    screen::ScreenDescriptor,
    session::{ScreenState, Session},
};

/// A navigation request recognized in the first input segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    /// Re-enter the previous screen state.
    Previous,
    /// Start over at the initial screen.
    Home,
    /// Next cached page.
    More,
    /// Previous cached page.
    Back,
}

/// Recognizes navigation codes and applies them to a session.
#[derive(Debug, Clone)]
pub struct NavigationRouter {
    previous: Choice,
    home: Choice,
    more: Choice,
    back: Choice,
}

impl NavigationRouter {
    /// Router over the configured reserved codes.
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            previous: config.previous.clone(),
            home: config.home.clone(),
            more: config.more.clone(),
            back: config.back.clone(),
        }
    }

    /// Code that moves to the next page.
    pub fn more(&self) -> &Choice {
        &self.more
    }

    /// Code that moves to the previous page.
    pub fn back(&self) -> &Choice {
        &self.back
    }

    /// Footer lines of a `CON` page shown by `descriptor`.
    pub fn footer(&self, descriptor: &ScreenDescriptor) -> Vec<String> {
        if descriptor.shows_nav_menu() {
            vec![self.previous.to_string(), self.home.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Decide whether `input` is a navigation code in the current state.
    ///
    /// Global codes only count on the first page of a screen that shows the
    /// nav menu; page codes only count while several pages are cached.
    pub fn route(
        &self,
        input: Option<&str>,
        session: &Session,
        descriptor: &ScreenDescriptor,
    ) -> Option<NavAction> {
        let input = input?;
        let pages = session.pages.as_ref();
        let page_index = pages.map(|cache| cache.current).unwrap_or(0);

        if page_index == 0 && descriptor.shows_nav_menu() {
            if self.previous.matches(input) {
                return Some(NavAction::Previous);
            }
            if self.home.matches(input) {
                return Some(NavAction::Home);
            }
        }

        if pages.is_some_and(|cache| cache.is_paginated()) {
            if self.more.matches(input) {
                return Some(NavAction::More);
            }
            if self.back.matches(input) {
                return Some(NavAction::Back);
            }
        }
        None
    }
}

/// Move within the cached pages. Returns the page to show and its status.
pub(crate) fn turn_page(session: &mut Session, action: NavAction) -> Option<(Status, String)> {
    let cache = session.pages.as_mut()?;
    let page = match action {
        NavAction::More => cache.next(),
        NavAction::Back => cache.previous(),
        NavAction::Previous | NavAction::Home => return None,
    }
    .to_string();
    debug!(index = cache.current, pages = cache.len(), "Serving cached page");
    Some((cache.current_status(), page))
}

/// Pop the history into the active state. Falls back to home when empty.
pub(crate) fn go_previous(session: &mut Session, initial_screen: &str) {
    match session.history.pop() {
        Some(state) => {
            debug!(screen = %state.screen, "Returning to previous screen");
            session.state = Some(state);
            session.pages = None;
        }
        None => go_home(session, initial_screen),
    }
}

/// Clear the history and enter the initial screen. Session data is kept.
pub(crate) fn go_home(session: &mut Session, initial_screen: &str) {
    debug!(screen = initial_screen, "Returning home");
    session.history.clear();
    session.state = Some(ScreenState::new(initial_screen));
    session.pages = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pagination::PageCache,
        screen::{Screen, ScreenContext, ScreenHandle, ScreenRegistry, ScreenResult},
        session::SessionKey,
    };

    struct Menu;

    impl Screen for Menu {
        fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> anyhow::Result<ScreenResult> {
            Ok(ctx.con())
        }
    }

    fn screens() -> (ScreenHandle, ScreenHandle) {
        let mut registry = ScreenRegistry::new();
        let menu = registry
            .register(ScreenDescriptor::builder("app.menu").handler(Menu))
            .unwrap();
        let bare = registry
            .register(ScreenDescriptor::builder("app.bare").handler(Menu).nav_menu(false))
            .unwrap();
        (menu, bare)
    }

    fn session_with_pages(pages: usize) -> Session {
        let mut session = Session::new(SessionKey::new("2547", "s"), 4);
        session.state = Some(ScreenState::new("app.menu"));
        let pages = (0..pages).map(|i| format!("page {i}")).collect();
        session.pages = Some(PageCache::new(Status::Continue, pages));
        session
    }

    #[test]
    fn global_codes_only_on_first_page_with_nav_menu() {
        let router = NavigationRouter::new(&NavigationConfig::default());
        let (menu, bare) = screens();
        let mut session = session_with_pages(3);

        assert_eq!(router.route(Some("97"), &session, &menu), Some(NavAction::Previous));
        assert_eq!(router.route(Some("99"), &session, &menu), Some(NavAction::Home));
        assert_eq!(router.route(Some("99"), &session, &bare), None);
        assert_eq!(router.route(Some("1"), &session, &menu), None);
        assert_eq!(router.route(None, &session, &menu), None);

        turn_page(&mut session, NavAction::More);
        assert_eq!(router.route(Some("99"), &session, &menu), None);
        assert_eq!(router.route(Some("0"), &session, &menu), Some(NavAction::Back));
    }

    #[test]
    fn page_codes_need_several_pages() {
        let router = NavigationRouter::new(&NavigationConfig::default());
        let (menu, _) = screens();
        assert_eq!(router.route(Some("98"), &session_with_pages(1), &menu), None);
        assert_eq!(
            router.route(Some("98"), &session_with_pages(2), &menu),
            Some(NavAction::More)
        );
    }

    #[test]
    fn more_and_back_are_idempotent_at_the_edges() {
        let mut session = session_with_pages(3);
        let shown: Vec<String> = [NavAction::More, NavAction::More, NavAction::More]
            .into_iter()
            .filter_map(|action| turn_page(&mut session, action).map(|(_, page)| page))
            .collect();
        assert_eq!(shown, ["page 1", "page 2", "page 2"]);

        let (status, page) = turn_page(&mut session, NavAction::Back).unwrap();
        assert_eq!((status, page.as_str()), (Status::Continue, "page 1"));
        turn_page(&mut session, NavAction::Back);
        let (_, page) = turn_page(&mut session, NavAction::Back).unwrap();
        assert_eq!(page, "page 0");
    }

    #[test]
    fn ending_pages_keep_the_session_open_until_the_last() {
        let mut session = session_with_pages(3);
        if let Some(cache) = session.pages.as_mut() {
            cache.status = Status::End;
        }
        assert_eq!(turn_page(&mut session, NavAction::More).map(|(s, _)| s), Some(Status::Continue));
        assert_eq!(turn_page(&mut session, NavAction::More).map(|(s, _)| s), Some(Status::End));
        assert_eq!(turn_page(&mut session, NavAction::Back).map(|(s, _)| s), Some(Status::Continue));
    }

    #[test]
    fn previous_pops_history_or_goes_home() {
        let mut session = session_with_pages(1);
        session.history.push(ScreenState::new("app.menu"));
        session.state = Some(ScreenState::new("app.detail"));

        go_previous(&mut session, "app.home");
        assert_eq!(session.state.as_ref().map(|s| s.screen.as_str()), Some("app.menu"));
        assert!(session.history.is_empty());

        go_previous(&mut session, "app.home");
        assert_eq!(session.state.as_ref().map(|s| s.screen.as_str()), Some("app.home"));
    }

    #[test]
    fn home_keeps_data() {
        let mut session = session_with_pages(2);
        session.data.insert("lang".into(), "sw".into());
        session.history.push(ScreenState::new("app.menu"));
        go_home(&mut session, "app.home");
        assert!(session.history.is_empty());
        assert!(session.pages.is_none());
        assert_eq!(session.data["lang"], "sw");
    }
}
