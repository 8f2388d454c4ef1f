use std::time::Instant;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use paths::PathContext;
use pki_api::ApiClient;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};
use tokio::sync::{
    broadcast::error::RecvError,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tracing::{debug, error, info, warn};

use crate::{
    action::{Action, Dispatcher, Origin},
    clipboard,
    components::{Component, PopupComponent, Sidebar, popups, render_backdrop},
    config::Config,
    core::{TaskExecutor, TaskKind, TaskResult},
    layers::{NotificationCenter, NotificationKind},
    pages::{self, Page, PageContext, placeholder},
    router::{Route, guard, home_for},
    session::Session,
    style::{Role, Theme},
    tui::{Event, EventResponse, Frame, Tui},
};

const SIDEBAR_WIDTH: u16 = 30;

/// The portal shell: owns the session, the mounted page and the overlays,
/// and routes every action between them.
pub struct App {
    config: Config,
    theme: Theme,
    client: ApiClient,
    executor: TaskExecutor,
    session: Session,
    route: Route,
    /// Navigation requested while the session was still hydrating.
    pending_route: Option<Route>,
    mount: u64,
    page: Box<dyn Page>,
    sidebar: Option<Sidebar>,
    popup: Option<Box<dyn PopupComponent>>,
    toasts: NotificationCenter,
    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
    should_quit: bool,
    should_suspend: bool,
}

impl App {
    /// Must be called inside a Tokio runtime.
    pub fn new(config: Config, client: ApiClient, paths: PathContext) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();
        let executor = TaskExecutor::new(client.clone(), paths, action_tx.clone());
        let route = Route::Landing;
        let page = pages::mount(
            &route,
            PageContext {
                dispatcher: Dispatcher::new(action_tx.clone(), Origin::shell()),
                user: None,
                config: config.clone(),
            },
        );
        let app = Self {
            toasts: NotificationCenter::new(config.toast_duration()),
            config,
            theme: Theme::default(),
            client,
            executor,
            session: Session::new(),
            route,
            pending_route: None,
            mount: 0,
            page,
            sidebar: None,
            popup: None,
            action_tx,
            action_rx,
            should_quit: false,
            should_suspend: false,
        };
        app.watch_unauthorized();
        app
    }

    /// Restores the persisted session, then shows `start`.
    pub fn start(&mut self, start: Route) -> Result<()> {
        if self.session.begin_hydration(self.client.has_session_token()) {
            info!(route = %start, "restoring session before navigating");
            self.pending_route = Some(start);
            self.send(Action::Spawn {
                origin: Origin::shell(),
                task: TaskKind::Hydrate,
            });
            Ok(())
        } else {
            self.navigate(start)
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = self.new_tui()?;
        tui.enter()?;

        loop {
            if let Some(event) = tui.next_event().await {
                self.handle_event(event)?;
            }

            while let Ok(action) = self.action_rx.try_recv() {
                match action {
                    Action::Render => self.render(&mut tui)?,
                    Action::Resize(w, h) => {
                        tui.resize(Rect::new(0, 0, w, h))?;
                        self.render(&mut tui)?;
                    }
                    action => self.update(action)?,
                }
            }

            if self.should_suspend {
                tui.suspend()?;
                self.send(Action::Resume);
                tui = self.new_tui()?;
                tui.enter()?;
            } else if self.should_quit {
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        Ok(())
    }

    fn new_tui(&self) -> Result<Tui> {
        Ok(Tui::new()?
            .tick_rate(self.config.tick_rate)
            .frame_rate(self.config.frame_rate)
            .paste(true))
    }

    fn send(&self, action: Action) {
        if self.action_tx.send(action).is_err() {
            debug!("action channel closed");
        }
    }

    /// Turns every 401 seen by the client into `Action::SessionExpired`.
    fn watch_unauthorized(&self) {
        let mut unauthorized = self.client.subscribe_unauthorized();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            loop {
                match unauthorized.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        if tx.send(Action::SessionExpired).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Sends the action of an event response. Returns whether propagation
    /// stops here.
    fn forward(&self, response: Option<EventResponse<Action>>) -> bool {
        match response {
            Some(EventResponse::Stop(action)) => {
                self.send(action);
                true
            }
            Some(EventResponse::Continue(action)) => {
                self.send(action);
                false
            }
            None => false,
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match &event {
            Event::Tick => self.send(Action::Tick),
            Event::Render => self.send(Action::Render),
            Event::Resize(w, h) => self.send(Action::Resize(*w, *h)),
            Event::Quit | Event::Closed => self.send(Action::Quit),
            Event::Key(_) | Event::Paste(_) => self.dispatch_input(&event)?,
            _ => {}
        }
        Ok(())
    }

    /// Input goes to the popup, then the global shortcuts, then the focused
    /// sidebar, then the page.
    fn dispatch_input(&mut self, event: &Event) -> Result<()> {
        if let Some(popup) = self.popup.as_mut() {
            let response = popup.handle_events(event)?;
            self.forward(response);
            return Ok(());
        }
        if let Event::Key(key) = event {
            if let Some(action) = global_shortcut(key) {
                self.send(action);
                return Ok(());
            }
        }
        if let Some(sidebar) = self.sidebar.as_mut().filter(|s| s.is_focused()) {
            let response = sidebar.handle_events(event)?;
            if self.forward(response) {
                return Ok(());
            }
        }
        let response = self.page.handle_events(event)?;
        self.forward(response);
        Ok(())
    }

    fn navigate(&mut self, requested: Route) -> Result<()> {
        if self.session.is_loading() {
            debug!(route = %requested, "session still loading, deferring navigation");
            self.pending_route = Some(requested);
            return Ok(());
        }
        let route = guard(&requested, &self.session);
        if route != requested {
            info!(from = %requested, to = %route, "navigation redirected");
        }

        self.mount += 1;
        let ctx = PageContext {
            dispatcher: Dispatcher::new(
                self.action_tx.clone(),
                Origin::new(route.clone(), self.mount),
            ),
            user: self.session.user().cloned(),
            config: self.config.clone(),
        };
        let mut page = pages::mount(&route, ctx);
        page.on_enter()?;
        self.page = page;
        self.sidebar = match self.session.user() {
            Some(user) if route.has_sidebar() => Some(Sidebar::new(user, &route)),
            _ => None,
        };
        self.popup = None;
        debug!(route = %route, mount = self.mount, page = self.page.name(), "page mounted");
        self.route = route;
        Ok(())
    }

    fn toast(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.toasts
            .push(kind, message, Some(self.config.toast_duration()));
    }

    fn update(&mut self, action: Action) -> Result<()> {
        if !matches!(action, Action::Tick | Action::Render) {
            debug!("{action}");
        }
        match action {
            Action::Tick => self.toasts.prune(Instant::now()),
            Action::Quit => self.should_quit = true,
            Action::Suspend => self.should_suspend = true,
            Action::Resume => self.should_suspend = false,
            Action::Error(message) => {
                error!("{message}");
                self.toast(NotificationKind::Error, message);
            }

            Action::Navigate(route) => self.navigate(route)?,
            Action::SignedIn(user) => {
                let home = home_for(user.role);
                info!(user = %user.email, role = %user.role, "signed in");
                self.session.set_user(Some(user));
                self.navigate(home)?;
            }
            Action::Logout => {
                let next = self.session.logout(self.client.token_store().as_ref());
                self.toast(NotificationKind::Info, "Vous êtes déconnecté.");
                self.navigate(next)?;
            }
            Action::SessionExpired => self.on_session_expired()?,
            Action::ToggleSidebarFocus => {
                if let Some(sidebar) = self.sidebar.as_mut() {
                    let focused = sidebar.is_focused();
                    sidebar.set_focused(!focused);
                }
            }

            Action::Spawn { origin, task } => {
                self.executor.spawn(origin, task);
            }
            Action::TaskDone { origin, result } => self.on_task_done(origin, result)?,

            Action::Toast(kind, message) => self.toast(kind, message),
            Action::DismissToast => {
                self.toasts.dismiss_latest();
            }
            Action::CopyToClipboard(text) => match clipboard::copy(&text) {
                Ok(()) => self.toast(NotificationKind::Success, "Copié dans le presse-papiers."),
                Err(err) => {
                    warn!(error = %err, "clipboard write failed");
                    self.toast(NotificationKind::Error, "Impossible de copier.");
                }
            },
            Action::SaveFile { file_name, bytes } => {
                self.executor
                    .spawn(Origin::shell(), TaskKind::SaveFile { file_name, bytes });
            }

            Action::OpenPopup(request) => self.popup = Some(popups::build(request)),
            Action::ClosePopup => self.popup = None,
            action @ Action::PopupResult(..) => {
                if let Some(popup) = self.popup.as_mut() {
                    if let Some(next) = popup.update(&action)? {
                        self.send(next);
                    }
                }
                if let Some(next) = self.page.update(&action)? {
                    self.send(next);
                }
            }
            action => {
                if let Some(next) = self.page.update(&action)? {
                    self.send(next);
                }
            }
        }
        Ok(())
    }

    fn on_session_expired(&mut self) -> Result<()> {
        if self.session.is_loading() || !self.session.is_authenticated() {
            debug!("unauthorized response without an active session");
            return Ok(());
        }
        warn!("session expired");
        let next = self.session.logout(self.client.token_store().as_ref());
        self.toast(
            NotificationKind::Error,
            "Session expirée, veuillez vous reconnecter",
        );
        self.navigate(next)
    }

    fn on_task_done(&mut self, origin: Origin, result: TaskResult) -> Result<()> {
        match result {
            TaskResult::Saved(outcome) => {
                match outcome {
                    Ok(path) => {
                        info!(path = %path.display(), "file saved");
                        self.toast(
                            NotificationKind::Success,
                            format!("Fichier enregistré : {}", path.display()),
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, "download failed");
                        self.toast(
                            NotificationKind::Error,
                            err.user_message("Erreur lors du téléchargement"),
                        );
                    }
                }
                Ok(())
            }
            TaskResult::Hydrated(outcome) if origin.is_shell() => {
                self.session.finish_hydration(outcome);
                let target = self.pending_route.take().unwrap_or(Route::Landing);
                self.navigate(target)
            }
            result if origin.mount != self.mount => {
                debug!(route = %origin.route, mount = origin.mount, result = %result, "dropping result of unmounted page");
                Ok(())
            }
            result => {
                let action = Action::TaskDone { origin, result };
                if let Some(next) = self.page.update(&action)? {
                    self.send(next);
                }
                Ok(())
            }
        }
    }

    fn render(&mut self, tui: &mut Tui) -> Result<()> {
        let mut failure = None;
        tui.draw(|frame| {
            if let Err(err) = self.draw(frame) {
                failure = Some(format!("Failed to draw: {err:?}"));
            }
        })?;
        if let Some(message) = failure {
            self.send(Action::Error(message));
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let area = frame.area();
        let [body, footer] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);

        if self.session.is_loading() {
            placeholder(
                frame,
                body,
                "Restauration de la session…",
                self.theme.style(Role::SubtleText),
            );
        } else {
            let page_area = match self.sidebar.as_mut() {
                Some(sidebar) => {
                    let [side, main] = Layout::horizontal([
                        Constraint::Length(SIDEBAR_WIDTH),
                        Constraint::Fill(1),
                    ])
                    .areas(body);
                    sidebar.draw(frame, side, &self.theme)?;
                    main
                }
                None => body,
            };
            self.page.draw(frame, page_area, &self.theme)?;
        }

        self.draw_footer(frame, footer);

        if let Some(popup) = self.popup.as_mut() {
            render_backdrop(frame, body);
            popup.draw(frame, body, &self.theme)?;
        }
        self.toasts.draw(frame, area, &self.theme);
        Ok(())
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let key_style = self.theme.style(Role::Accent);
        let label_style = self.theme.style(Role::Muted);
        let mut spans = Vec::new();
        let globals: &[(&str, &str)] = if self.sidebar.is_some() {
            &[("Ctrl+B", "Menu"), ("Ctrl+C", "Quitter")]
        } else {
            &[("Ctrl+C", "Quitter")]
        };
        for (key, label) in self.page.shortcuts().iter().chain(globals) {
            spans.push(Span::styled(format!(" {key} "), key_style));
            spans.push(Span::styled(format!("{label}  "), label_style));
        }

        let location = match self.session.user() {
            Some(user) => format!("{}  ·  {} ", self.route, user.email),
            None => format!("{} ", self.route),
        };
        let [hints, right] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(location.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(Line::from(spans)), hints);
        frame.render_widget(
            Paragraph::new(Line::styled(location, self.theme.style(Role::SubtleText))),
            right,
        );
    }
}

fn global_shortcut(key: &KeyEvent) -> Option<Action> {
    if !key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Char('c') => Some(Action::Quit),
        KeyCode::Char('z') => Some(Action::Suspend),
        KeyCode::Char('b') => Some(Action::ToggleSidebarFocus),
        KeyCode::Char('d') => Some(Action::DismissToast),
        _ => None,
    }
}
