use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Role;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// ClientRoute
///
/// One entry of the single-page client's route table. `:name` segments match any
/// single path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRoute {
    pub pattern: &'static str,
    pub required_role: Option<Role>,
}

/// The client's routes and the role each one requires. Advisory only: the API enforces
/// the same roles on every call these pages make.
pub const CLIENT_ROUTES: &[ClientRoute] = &[
    ClientRoute { pattern: "/", required_role: None },
    ClientRoute { pattern: "/login", required_role: None },
    ClientRoute { pattern: "/signup", required_role: None },
    ClientRoute { pattern: "/items", required_role: None },
    ClientRoute { pattern: "/items/:id", required_role: None },
    ClientRoute { pattern: "/cart", required_role: Some(Role::Renter) },
    ClientRoute { pattern: "/dashboard", required_role: Some(Role::Owner) },
    ClientRoute { pattern: "/add-item", required_role: Some(Role::Owner) },
    ClientRoute { pattern: "/edit-item/:id", required_role: Some(Role::Owner) },
];

/// Unknown paths render the landing page.
const FALLBACK: ClientRoute = ClientRoute {
    pattern: "/",
    required_role: None,
};

/// Navigation
///
/// Outcome of evaluating a navigation against the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(&'static str),
    Redirect(&'static str),
}

impl ClientRoute {
    fn matches(&self, path: &str) -> bool {
        let mut pattern = self.pattern.split('/').filter(|s| !s.is_empty());
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        loop {
            match (pattern.next(), segments.next()) {
                (None, None) => return true,
                (Some(p), Some(_)) if p.starts_with(':') => continue,
                (Some(p), Some(s)) if p == s => continue,
                _ => return false,
            }
        }
    }
}

/// Resolves a client path (query string and fragment ignored) to its table entry.
pub fn route_for(path: &str) -> ClientRoute {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    CLIENT_ROUTES
        .iter()
        .copied()
        .find(|route| route.matches(path))
        .unwrap_or(FALLBACK)
}

/// decide
///
/// Evaluated once per navigation. Anonymous visitors of a gated route go to the login
/// page; signed-in users with the wrong role go home.
pub fn decide(path: &str, session: Option<Role>) -> Navigation {
    let route = route_for(path);
    match (route.required_role, session) {
        (None, _) => Navigation::Render(route.pattern),
        (Some(_), None) => Navigation::Redirect(LOGIN_PATH),
        (Some(required), Some(role)) if required == role => Navigation::Render(route.pattern),
        (Some(_), Some(_)) => Navigation::Redirect(HOME_PATH),
    }
}

/// ClientRouteEntry
///
/// Wire form of [`ClientRoute`] served to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClientRouteEntry {
    pub path: String,
    pub required_role: Option<Role>,
    pub unauthenticated_redirect: Option<String>,
    pub wrong_role_redirect: Option<String>,
}

impl From<&ClientRoute> for ClientRouteEntry {
    fn from(route: &ClientRoute) -> Self {
        let gated = route.required_role.is_some();
        Self {
            path: route.pattern.to_string(),
            required_role: route.required_role,
            unauthenticated_redirect: gated.then(|| LOGIN_PATH.to_string()),
            wrong_role_redirect: gated.then(|| HOME_PATH.to_string()),
        }
    }
}

pub fn route_table() -> Vec<ClientRouteEntry> {
    CLIENT_ROUTES.iter().map(ClientRouteEntry::from).collect()
}
