use chrono::{DateTime, NaiveDateTime};
use color_eyre::Result;
use crossterm::event::KeyEvent;
use pki_api::User;
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::Style,
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
};

use crate::{
    action::{Action, Dispatcher},
    config::Config,
    router::Route,
    style::{Role, Theme},
    tui::{Event, EventResponse, Frame},
};

mod admin_dashboard;
mod admin_requests;
mod admin_stats;
mod auth;
mod ca;
mod certificates;
mod generate_csr;
mod info;
mod landing;
mod manage_users;
mod request_detail;
mod requests;
mod user_dashboard;
mod validate_token;

pub use admin_dashboard::AdminDashboardPage;
pub use admin_requests::AdminRequestsPage;
pub use admin_stats::AdminStatsPage;
pub use auth::{ForgotPasswordPage, LoginPage, RegisterPage, ResetPasswordPage};
pub use ca::GenerateCaPage;
pub use certificates::CertificatesPage;
pub use generate_csr::GenerateCsrPage;
pub use info::{DownloadCrlPage, RevokeCertificatePage};
pub use landing::LandingPage;
pub use manage_users::ManageUsersPage;
pub use request_detail::AdminRequestDetailPage;
pub use requests::RequestsPage;
pub use user_dashboard::UserDashboardPage;
pub use validate_token::ValidateTokenPage;

/// Everything a page gets when it is mounted.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub dispatcher: Dispatcher,
    /// Signed-in user at mount time.
    pub user: Option<User>,
    pub config: Config,
}

/// A screen bound to one route.
///
/// Pages are rebuilt on every navigation. Task results come back through
/// `update` as `Action::TaskDone` and popup answers as `Action::PopupResult`.
pub trait Page {
    fn name(&self) -> &str;

    /// Called once after mounting. Pages issue their initial loads here.
    fn on_enter(&mut self) -> Result<()> {
        Ok(())
    }

    fn handle_events(&mut self, event: &Event) -> Result<Option<EventResponse<Action>>> {
        match event {
            Event::Key(key) => self.handle_key_events(*key),
            Event::Paste(text) => self.handle_paste(text),
            _ => Ok(None),
        }
    }

    fn handle_key_events(&mut self, _key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        Ok(None)
    }

    fn handle_paste(&mut self, _text: &str) -> Result<Option<EventResponse<Action>>> {
        Ok(None)
    }

    fn update(&mut self, _action: &Action) -> Result<Option<Action>> {
        Ok(None)
    }

    /// Key hints shown in the footer.
    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()>;
}

/// Builds the page for `route`.
pub fn mount(route: &Route, ctx: PageContext) -> Box<dyn Page> {
    match route {
        Route::Landing => Box::new(LandingPage::new(ctx)),
        Route::Login => Box::new(LoginPage::new(ctx)),
        Route::Register => Box::new(RegisterPage::new(ctx)),
        Route::ForgotPassword => Box::new(ForgotPasswordPage::new(ctx)),
        Route::ResetPassword { token } => Box::new(ResetPasswordPage::new(ctx, token.clone())),
        Route::ValidateToken { request_id, token } => Box::new(ValidateTokenPage::new(
            ctx,
            request_id.clone(),
            token.clone(),
        )),
        Route::Dashboard => Box::new(UserDashboardPage::new(ctx)),
        Route::Certificates => Box::new(CertificatesPage::new(ctx)),
        Route::GenerateCsr => Box::new(GenerateCsrPage::new(ctx)),
        Route::Requests => Box::new(RequestsPage::new(ctx)),
        Route::RevokeCertificate => Box::new(RevokeCertificatePage::new(ctx)),
        Route::DownloadCrl => Box::new(DownloadCrlPage::new(ctx)),
        Route::AdminDashboard => Box::new(AdminDashboardPage::new(ctx)),
        Route::AdminStats => Box::new(AdminStatsPage::new(ctx)),
        Route::AdminRequests => Box::new(AdminRequestsPage::new(ctx)),
        Route::AdminRequestDetail(id) => Box::new(AdminRequestDetailPage::new(ctx, id.clone())),
        Route::AdminManageUsers => Box::new(ManageUsersPage::new(ctx)),
        Route::AdminGenerateCa => Box::new(GenerateCaPage::new(ctx)),
    }
}

/// Loading state of a remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Remote<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Remote::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Remote::Loading)
    }
}

/// Renders a backend timestamp as `dd/mm/YYYY HH:MM`. Unparseable input is
/// shown as is.
pub fn format_timestamp(value: &str) -> String {
    if value.is_empty() {
        return "-".into();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    value.to_string()
}

pub fn format_opt_timestamp(value: Option<&str>) -> String {
    value.map(format_timestamp).unwrap_or_else(|| "-".into())
}

/// Bordered page frame. Returns the inner area.
pub fn page_block(frame: &mut Frame<'_>, area: Rect, title: &str, theme: &Theme) -> Rect {
    let block = Block::bordered()
        .title(format!(" {title} "))
        .title_style(theme.title(true))
        .border_set(border::ROUNDED)
        .border_style(theme.border(false));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

/// Horizontally centered column of at most `width` cells.
pub fn centered_column(area: Rect, width: u16) -> Rect {
    let [column] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(area);
    column
}

/// `label : value` line.
pub fn field_line<'a>(label: &'a str, value: impl Into<String>, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label} : "), theme.style(Role::SubtleText)),
        Span::styled(value.into(), theme.style(Role::Text)),
    ])
}

/// One line for an inline error or info message under a form.
pub fn message_line(error: Option<&str>, info: Option<&str>, theme: &Theme) -> Paragraph<'static> {
    let line = match (error, info) {
        (Some(error), _) => Line::styled(error.to_string(), theme.style(Role::Danger)),
        (None, Some(info)) => Line::styled(info.to_string(), theme.style(Role::SubtleText)),
        (None, None) => Line::raw(""),
    };
    Paragraph::new(line).wrap(Wrap { trim: true })
}

/// Centered dimmed paragraph for empty, loading and failed states.
pub fn placeholder(frame: &mut Frame<'_>, area: Rect, text: &str, style: Style) {
    frame.render_widget(
        Paragraph::new(text.to_string())
            .style(style)
            .centered()
            .wrap(Wrap { trim: true }),
        area,
    );
}

/// Moves a list selection by `delta`, clamped to `len`.
pub fn step_selection(selected: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = selected as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

/// A handled key.
pub fn stop(action: Action) -> Result<Option<EventResponse<Action>>> {
    Ok(Some(EventResponse::Stop(action)))
}

#[cfg(test)]
pub(crate) mod testing {
    use pki_api::{Role, User};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::action::testing::dispatcher;

    pub fn user(role: Role) -> User {
        User {
            id: "u-1".into(),
            email: "awa.mbida@minpostel.cm".into(),
            first_name: "Awa".into(),
            last_name: "Mbida".into(),
            role,
            is_active: true,
            email_verified: true,
            created_at: "2024-03-01T10:00:00".into(),
            last_login: None,
        }
    }

    pub fn context(route: Route, user: Option<User>) -> (PageContext, UnboundedReceiver<Action>) {
        let (dispatcher, rx) = dispatcher(route);
        (
            PageContext {
                dispatcher,
                user,
                config: Config::default(),
            },
            rx,
        )
    }

    pub fn key(code: crossterm::event::KeyCode) -> KeyEvent {
        KeyEvent::new(code, crossterm::event::KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(
            crossterm::event::KeyCode::Char(c),
            crossterm::event::KeyModifiers::CONTROL,
        )
    }

    pub fn type_text(page: &mut dyn Page, text: &str) {
        for c in text.chars() {
            page.handle_key_events(key(crossterm::event::KeyCode::Char(c)))
                .unwrap();
        }
    }

    /// Wraps a result the way the shell forwards it.
    pub fn done(result: crate::core::TaskResult) -> Action {
        Action::TaskDone {
            origin: crate::action::Origin::new(Route::Landing, 1),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps_are_localised() {
        assert_eq!(format_timestamp("2024-05-01T10:30:00"), "01/05/2024 10:30");
        assert_eq!(format_timestamp("2024-05-01T10:30:00.123456"), "01/05/2024 10:30");
        assert_eq!(format_timestamp("2024-05-01T10:30:00Z"), "01/05/2024 10:30");
        assert_eq!(format_timestamp("hier"), "hier");
        assert_eq!(format_timestamp(""), "-");
        assert_eq!(format_opt_timestamp(None), "-");
    }

    #[test]
    fn selection_is_clamped() {
        assert_eq!(step_selection(0, 3, -1), 0);
        assert_eq!(step_selection(2, 3, 1), 2);
        assert_eq!(step_selection(1, 3, 1), 2);
        assert_eq!(step_selection(5, 0, 1), 0);
    }

    #[test]
    fn every_route_mounts_its_page() {
        use testing::context;
        let routes = [
            Route::Landing,
            Route::Login,
            Route::Register,
            Route::ForgotPassword,
            Route::ResetPassword { token: None },
            Route::ValidateToken {
                request_id: None,
                token: None,
            },
            Route::Dashboard,
            Route::Certificates,
            Route::GenerateCsr,
            Route::Requests,
            Route::RevokeCertificate,
            Route::DownloadCrl,
            Route::AdminDashboard,
            Route::AdminStats,
            Route::AdminRequests,
            Route::AdminRequestDetail("r1".into()),
            Route::AdminManageUsers,
            Route::AdminGenerateCa,
        ];
        let mut names = Vec::new();
        for route in routes {
            let (ctx, _rx) = context(route.clone(), None);
            names.push(mount(&route, ctx).name().to_string());
        }
        names.dedup();
        assert_eq!(names.len(), 18);
    }
}
