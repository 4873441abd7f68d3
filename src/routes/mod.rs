//! Route table and path classification.
//!
//! DESIGN
//! ======
//! Every navigable path maps to exactly one `Route`, and every route carries
//! an `Access` class the guard decides on. Unknown paths are not an error:
//! they become `Route::NotFound`, which is always viewable.


use std::fmt;

pub const LOGIN_PATH: &str = "/login";
/// Where authenticated users land after sign-in or when visiting a public page.
pub const LANDING_PATH: &str = "/dashboard";

/// Whether a route needs a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Only for anonymous users (login/register).
    Public,
    /// Only for authenticated users.
    Protected,
    /// Viewable in any session state.
    Open,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    /// `/`, which forwards to the landing view.
    Index,
    Dashboard,
    Projects,
    ProjectDetails { id: String },
    Profile,
    NotFound { path: String },
}

impl Route {
    /// Match a path against the route table.
    ///
    /// Query strings and fragments are ignored, as is one trailing slash.
    /// Static segments match case-insensitively; `:id` keeps its case.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let bare = path.split(['?', '#']).next().unwrap_or_default();
        let bare = if bare.len() > 1 { bare.strip_suffix('/').unwrap_or(bare) } else { bare };
        let Some(rest) = bare.strip_prefix('/') else {
            return Self::NotFound { path: path.to_owned() };
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let lowered: Vec<String> = segments.iter().map(|s| s.to_ascii_lowercase()).collect();
        let keys: Vec<&str> = lowered.iter().map(String::as_str).collect();

        match keys.as_slice() {
            [""] => Self::Index,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["dashboard"] => Self::Dashboard,
            ["projects"] => Self::Projects,
            ["projects", id] if !id.is_empty() => Self::ProjectDetails { id: segments[1].to_owned() },
            ["profile"] => Self::Profile,
            _ => Self::NotFound { path: path.to_owned() },
        }
    }

    #[must_use]
    pub fn access(&self) -> Access {
        match self {
            Self::Login | Self::Register => Access::Public,
            Self::Index | Self::Dashboard | Self::Projects | Self::ProjectDetails { .. } | Self::Profile => {
                Access::Protected
            }
            Self::NotFound { .. } => Access::Open,
        }
    }

    /// Canonical path for this route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => LOGIN_PATH.to_owned(),
            Self::Register => "/register".to_owned(),
            Self::Index => "/".to_owned(),
            Self::Dashboard => LANDING_PATH.to_owned(),
            Self::Projects => "/projects".to_owned(),
            Self::ProjectDetails { id } => format!("/projects/{id}"),
            Self::Profile => "/profile".to_owned(),
            Self::NotFound { path } => path.clone(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Register => "Create account",
            Self::Index | Self::Dashboard => "Dashboard",
            Self::Projects => "Projects",
            Self::ProjectDetails { .. } => "Project details",
            Self::Profile => "Profile",
            Self::NotFound { .. } => "Page not found",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title(), self.path())
    }
}
