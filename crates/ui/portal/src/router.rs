//! Client routes, the access guard and the sidebar menu.

use std::fmt;

use pki_api::Role;

use crate::session::Session;

/// Every screen of the portal, addressable by its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Register,
    ForgotPassword,
    ResetPassword {
        token: Option<String>,
    },
    ValidateToken {
        request_id: Option<String>,
        token: Option<String>,
    },

    Dashboard,
    Certificates,
    GenerateCsr,
    Requests,
    RevokeCertificate,
    DownloadCrl,

    AdminDashboard,
    AdminStats,
    AdminRequests,
    AdminRequestDetail(String),
    AdminManageUsers,
    AdminGenerateCa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

impl Route {
    /// Parses a client path such as `/admin/requests/42` or
    /// `/validate-token?requestId=1&token=abc`. Unknown paths map to `/`.
    pub fn parse(input: &str) -> Route {
        let input = input.trim();
        let (path, query) = match input.split_once('?') {
            Some((path, query)) => (path, query),
            None => (input, ""),
        };
        let params = parse_query(query);
        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Landing,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["forgot-password"] => Route::ForgotPassword,
            ["reset-password"] => Route::ResetPassword {
                token: param("token"),
            },
            ["validate-token"] => Route::ValidateToken {
                request_id: param("requestId"),
                token: param("token"),
            },
            ["dashboard"] => Route::Dashboard,
            ["certificates"] => Route::Certificates,
            ["generate-csr"] => Route::GenerateCsr,
            ["requests"] => Route::Requests,
            ["revoke-certificate"] => Route::RevokeCertificate,
            ["download-crl"] => Route::DownloadCrl,
            ["admin", "dashboard"] => Route::AdminDashboard,
            ["admin", "stats"] => Route::AdminStats,
            ["admin", "requests"] => Route::AdminRequests,
            ["admin", "requests", id] => Route::AdminRequestDetail(percent_decode(id)),
            ["admin", "manage-users"] => Route::AdminManageUsers,
            ["admin", "generate-ca"] => Route::AdminGenerateCa,
            _ => Route::Landing,
        }
    }

    /// The path this route is addressed by, including its query.
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".into(),
            Route::Login => "/login".into(),
            Route::Register => "/register".into(),
            Route::ForgotPassword => "/forgot-password".into(),
            Route::ResetPassword { token } => match token {
                Some(token) => format!("/reset-password?token={}", percent_encode(token)),
                None => "/reset-password".into(),
            },
            Route::ValidateToken { request_id, token } => {
                let mut query = Vec::new();
                if let Some(id) = request_id {
                    query.push(format!("requestId={}", percent_encode(id)));
                }
                if let Some(token) = token {
                    query.push(format!("token={}", percent_encode(token)));
                }
                if query.is_empty() {
                    "/validate-token".into()
                } else {
                    format!("/validate-token?{}", query.join("&"))
                }
            }
            Route::Dashboard => "/dashboard".into(),
            Route::Certificates => "/certificates".into(),
            Route::GenerateCsr => "/generate-csr".into(),
            Route::Requests => "/requests".into(),
            Route::RevokeCertificate => "/revoke-certificate".into(),
            Route::DownloadCrl => "/download-crl".into(),
            Route::AdminDashboard => "/admin/dashboard".into(),
            Route::AdminStats => "/admin/stats".into(),
            Route::AdminRequests => "/admin/requests".into(),
            Route::AdminRequestDetail(id) => format!("/admin/requests/{}", percent_encode(id)),
            Route::AdminManageUsers => "/admin/manage-users".into(),
            Route::AdminGenerateCa => "/admin/generate-ca".into(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Landing
            | Route::Login
            | Route::Register
            | Route::ForgotPassword
            | Route::ResetPassword { .. }
            | Route::ValidateToken { .. } => Access::Public,
            Route::Dashboard
            | Route::Certificates
            | Route::GenerateCsr
            | Route::Requests
            | Route::RevokeCertificate
            | Route::DownloadCrl => Access::Authenticated,
            Route::AdminDashboard
            | Route::AdminStats
            | Route::AdminRequests
            | Route::AdminRequestDetail(_)
            | Route::AdminManageUsers
            | Route::AdminGenerateCa => Access::Admin,
        }
    }

    /// Whether the shell shows the sidebar next to this route.
    pub fn has_sidebar(&self) -> bool {
        self.access() != Access::Public
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Landing route after login for `role`.
pub fn home_for(role: Role) -> Route {
    match role {
        Role::Admin => Route::AdminDashboard,
        Role::User => Route::Dashboard,
    }
}

/// Decides where a navigation to `route` actually lands.
///
/// Callers must not consult the guard while the session is still hydrating;
/// the shell holds the target until hydration settles.
pub fn guard(route: &Route, session: &Session) -> Route {
    match (route.access(), session.user()) {
        (Access::Authenticated | Access::Admin, None) => Route::Login,
        (Access::Admin, Some(user)) if !user.role.is_admin() => Route::Dashboard,
        (Access::Public, Some(user)) if matches!(route, Route::Login | Route::Register) => {
            home_for(user.role)
        }
        _ => route.clone(),
    }
}

/// Target of a sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuTarget {
    Route(Route),
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: &'static str,
    pub target: MenuTarget,
}

impl MenuEntry {
    fn route(label: &'static str, route: Route) -> Self {
        Self {
            label,
            target: MenuTarget::Route(route),
        }
    }
}

/// Sidebar links for `role`, followed by the logout entry.
pub fn menu_for(role: Role) -> Vec<MenuEntry> {
    let mut entries = match role {
        Role::User => vec![
            MenuEntry::route("Tableau de bord", Route::Dashboard),
            MenuEntry::route("Mes certificats", Route::Certificates),
            MenuEntry::route("Demander un certificat", Route::GenerateCsr),
            MenuEntry::route("Mes demandes", Route::Requests),
            MenuEntry::route("Révoquer un certificat", Route::RevokeCertificate),
            MenuEntry::route("Télécharger la CRL", Route::DownloadCrl),
        ],
        Role::Admin => vec![
            MenuEntry::route("Tableau de bord", Route::AdminDashboard),
            MenuEntry::route("Statistiques", Route::AdminStats),
            MenuEntry::route("Demandes", Route::AdminRequests),
            MenuEntry::route("Utilisateurs", Route::AdminManageUsers),
            MenuEntry::route("Autorité racine", Route::AdminGenerateCa),
        ],
    };
    entries.push(MenuEntry {
        label: "Déconnexion",
        target: MenuTarget::Logout,
    });
    entries
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_query_component(k), decode_query_component(v)),
            None => (decode_query_component(pair), String::new()),
        })
        .collect()
}

fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Percent-decoding for path segments: `+` stays a plus.
fn percent_decode(value: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned()
}

/// Query values are form encoded, so `+` is a space.
fn decode_query_component(value: &str) -> String {
    percent_decode(&value.replace('+', " "))
}
