//! Ambient, read-only inputs supplied by the surrounding application

use crate::types::{ContextId, CurrentUser, PageInstance};
use parking_lot::RwLock;

/// Supplies the signed-in user for `$current_user`
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<CurrentUser>;
}

/// What the page in view shows, read in one go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    /// Top-level object of the page, if the page shows one
    pub page: Option<PageInstance>,
    /// Whether the application is in dashboard display mode
    pub dashboard: bool,
}

/// Supplies the state of the page currently in view
pub trait PageProvider: Send + Sync {
    /// Page object and dashboard flag as one consistent pair
    fn page_view(&self) -> PageView;

    fn page_instance(&self) -> Option<PageInstance> {
        self.page_view().page
    }

    fn is_dashboard(&self) -> bool {
        self.page_view().dashboard
    }

    /// Context id of the page object, `None` when there is no page object
    fn page_context_id(&self) -> ContextId {
        self.page_instance().and_then(|page| page.context_id)
    }
}

/// Session with a fixed user (or none)
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<CurrentUser>,
}

impl StaticSession {
    pub fn new(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}

/// Page state the host application updates on navigation
#[derive(Debug, Default)]
pub struct PageState {
    inner: RwLock<PageView>,
}

impl PageState {
    pub fn new(page: Option<PageInstance>, dashboard: bool) -> Self {
        Self {
            inner: RwLock::new(PageView { page, dashboard }),
        }
    }

    /// A page with no top-level object
    pub fn blank() -> Self {
        Self::default()
    }

    /// Record navigation to another page
    pub fn navigate(&self, page: Option<PageInstance>, dashboard: bool) {
        *self.inner.write() = PageView { page, dashboard };
    }
}

impl PageProvider for PageState {
    fn page_view(&self) -> PageView {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_context_id() {
        let page = PageState::new(Some(PageInstance::new("Audit", Some(12))), false);
        assert_eq!(page.page_context_id(), Some(12));

        page.navigate(Some(PageInstance::new("Policy", None)), false);
        assert_eq!(page.page_context_id(), None);

        assert_eq!(PageState::blank().page_context_id(), None);
    }

    #[test]
    fn test_dashboard_flag_follows_navigation() {
        let page = PageState::blank();
        assert!(!page.is_dashboard());
        page.navigate(None, true);
        assert!(page.is_dashboard());
    }

    #[test]
    fn test_page_view_pairs_page_with_its_flag() {
        let page = PageState::new(Some(PageInstance::new("Person", Some(3))), false);
        page.navigate(None, true);

        let view = page.page_view();
        assert_eq!(view, PageView { page: None, dashboard: true });

        page.navigate(Some(PageInstance::new("Person", Some(3))), false);
        let view = page.page_view();
        assert_eq!(view.page.map(|p| p.type_name), Some("Person".to_string()));
        assert!(!view.dashboard);
    }

    #[test]
    fn test_static_session() {
        assert_eq!(StaticSession::new(CurrentUser::new(1)).current_user().map(|u| u.id), Some(1));
        assert!(StaticSession::anonymous().current_user().is_none());
    }
}
