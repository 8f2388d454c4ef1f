//! Root CA status and initialization.

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::CaStatus;
use ratatui::{
    layout::Rect,
    text::{Line, Text},
    widgets::{Paragraph, Wrap},
};
use tracing::{info, warn};

use crate::{
    action::{Action, Dispatcher, PopupId, PopupRequest, PopupResult},
    core::{TaskKind, TaskOutcome, TaskResult},
    layers::NotificationKind,
    pages::{
        Page, PageContext, Remote, centered_column, field_line, format_opt_timestamp, page_block,
        placeholder, stop,
    },
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

pub(super) fn init_popup() -> PopupRequest {
    PopupRequest::Confirm {
        id: PopupId::InitializeCa,
        title: "Initialiser l'AC racine".into(),
        question: "Générer la paire de clés et le certificat auto-signé de l'autorité racine ?\n\
                   Cette opération ne doit être faite qu'une seule fois."
            .into(),
    }
}

/// Asks for confirmation unless the CA already runs.
pub(super) fn request_init(dispatcher: &Dispatcher, status: Option<&CaStatus>) {
    if status.is_some_and(|s| s.is_initialized) {
        dispatcher.toast(NotificationKind::Info, "L'AC racine est déjà initialisée");
    } else {
        dispatcher.popup(init_popup());
    }
}

/// Spawns the initialization once the popup was confirmed. Returns whether
/// `action` was that answer.
pub(super) fn on_popup(dispatcher: &Dispatcher, action: &Action) -> bool {
    match action {
        Action::PopupResult(PopupId::InitializeCa, PopupResult::Confirmed) => {
            dispatcher.spawn(TaskKind::InitializeCa);
            true
        }
        Action::PopupResult(PopupId::InitializeCa, _) => true,
        _ => false,
    }
}

/// Toasts the initialization outcome. Returns the new status on success.
pub(super) fn on_initialized(
    dispatcher: &Dispatcher,
    outcome: &TaskOutcome<CaStatus>,
) -> Option<CaStatus> {
    match outcome {
        Ok(status) => {
            info!(name = ?status.ca_name, "root CA initialized");
            dispatcher.toast(
                NotificationKind::Success,
                "AC Racine initialisée avec succès !",
            );
            Some(status.clone())
        }
        Err(err) => {
            warn!(error = %err, "root CA initialization failed");
            dispatcher.toast(
                NotificationKind::Error,
                err.user_message("Erreur lors de l'initialisation"),
            );
            None
        }
    }
}

pub(super) fn status_lines<'a>(status: &CaStatus, theme: &Theme) -> Vec<Line<'a>> {
    let state = match (status.is_initialized, status.is_active) {
        (false, _) => Line::styled("Non initialisée", theme.style(Role::Warning)),
        (true, true) => Line::styled("Active", theme.style(Role::Success)),
        (true, false) => Line::styled("Initialisée, inactive", theme.style(Role::Danger)),
    };
    let mut lines = vec![state];
    if status.is_initialized {
        lines.extend([
            field_line(
                "Nom",
                status.ca_name.clone().unwrap_or_else(|| "-".into()),
                theme,
            ),
            field_line(
                "Sujet",
                status.subject_dn.clone().unwrap_or_else(|| "-".into()),
                theme,
            ),
            field_line(
                "Valide du",
                format_opt_timestamp(status.valid_from.as_deref()),
                theme,
            ),
            field_line(
                "Valide jusqu'au",
                format_opt_timestamp(status.valid_until.as_deref()),
                theme,
            ),
        ]);
        if let Some(days) = status.days_until_expiration {
            let role = if days < 90 { Role::Warning } else { Role::Text };
            lines.push(Line::styled(
                format!("Expire dans {days} jour(s)"),
                theme.style(role),
            ));
        }
    }
    lines
}

/// Root CA details with the confirm-gated initialization.
pub struct GenerateCaPage {
    dispatcher: Dispatcher,
    status: Remote<CaStatus>,
    initializing: bool,
}

impl GenerateCaPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            status: Remote::Loading,
            initializing: false,
        }
    }
}

impl Page for GenerateCaPage {
    fn name(&self) -> &str {
        "generate-ca"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.dispatcher.spawn(TaskKind::LoadCaStatus);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Char('i') if !self.initializing => {
                request_init(&self.dispatcher, self.status.loaded());
                stop(Action::Update)
            }
            KeyCode::Char('r') => {
                self.dispatcher.spawn(TaskKind::LoadCaStatus);
                stop(Action::Update)
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if on_popup(&self.dispatcher, action) {
            self.initializing = matches!(
                action,
                Action::PopupResult(_, PopupResult::Confirmed)
            );
            return Ok(None);
        }
        match action {
            Action::TaskDone {
                result: TaskResult::CaStatus(outcome),
                ..
            } => match outcome {
                Ok(status) => self.status = Remote::Loaded(status.clone()),
                Err(err) => {
                    let message = err.user_message("Impossible de charger le statut de l'AC");
                    if !matches!(self.status, Remote::Loaded(_)) {
                        self.status = Remote::Failed(message.clone());
                    }
                    self.dispatcher.toast(NotificationKind::Error, message);
                }
            },
            Action::TaskDone {
                result: TaskResult::CaInitialized(outcome),
                ..
            } => {
                self.initializing = false;
                if on_initialized(&self.dispatcher, outcome).is_some() {
                    self.dispatcher.spawn(TaskKind::LoadCaStatus);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("i", "Initialiser"), ("r", "Actualiser")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(
            frame,
            centered_column(area, 90),
            "Autorité de certification racine",
            theme,
        );
        match &self.status {
            Remote::Loading => placeholder(frame, inner, "Chargement…", theme.style(Role::SubtleText)),
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger))
            }
            Remote::Loaded(status) => {
                let mut lines = status_lines(status, theme);
                lines.push(Line::raw(""));
                if self.initializing {
                    lines.push(Line::styled(
                        "Initialisation en cours…",
                        theme.style(Role::SubtleText),
                    ));
                } else if !status.is_initialized {
                    lines.push(Line::styled(
                        "Appuyez sur i pour initialiser l'AC racine.",
                        theme.style(Role::Accent),
                    ));
                }
                frame.render_widget(
                    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
                    inner,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::testing::{drain, spawned};
    use crate::pages::testing::{context, done, key};
    use crate::router::Route;
    use pretty_assertions::assert_eq;

    #[test]
    fn initialization_waits_for_confirmation() {
        let (ctx, mut rx) = context(Route::AdminGenerateCa, None);
        let mut page = GenerateCaPage::new(ctx);
        page.update(&done(TaskResult::CaStatus(Ok(CaStatus::default()))))
            .unwrap();
        page.handle_key_events(key(KeyCode::Char('i'))).unwrap();
        assert_eq!(drain(&mut rx), vec![Action::OpenPopup(init_popup())]);

        page.update(&Action::PopupResult(
            PopupId::InitializeCa,
            PopupResult::Cancelled,
        ))
        .unwrap();
        assert!(drain(&mut rx).is_empty());

        page.update(&Action::PopupResult(
            PopupId::InitializeCa,
            PopupResult::Confirmed,
        ))
        .unwrap();
        assert_eq!(spawned(&drain(&mut rx)), vec![&TaskKind::InitializeCa]);
    }

    #[test]
    fn success_toasts_and_reloads() {
        let (ctx, mut rx) = context(Route::AdminGenerateCa, None);
        let mut page = GenerateCaPage::new(ctx);
        let status = CaStatus {
            is_initialized: true,
            is_active: true,
            ..CaStatus::default()
        };
        page.update(&done(TaskResult::CaInitialized(Ok(status))))
            .unwrap();
        let actions = drain(&mut rx);
        assert_eq!(
            actions[0],
            Action::Toast(
                NotificationKind::Success,
                "AC Racine initialisée avec succès !".into()
            )
        );
        assert_eq!(spawned(&actions), vec![&TaskKind::LoadCaStatus]);
    }

    #[test]
    fn initialized_ca_is_not_reinitialized() {
        let (ctx, mut rx) = context(Route::AdminGenerateCa, None);
        let mut page = GenerateCaPage::new(ctx);
        let status = CaStatus {
            is_initialized: true,
            ..CaStatus::default()
        };
        page.update(&done(TaskResult::CaStatus(Ok(status)))).unwrap();
        page.handle_key_events(key(KeyCode::Char('i'))).unwrap();
        assert!(matches!(
            drain(&mut rx)[..],
            [Action::Toast(NotificationKind::Info, _)]
        ));
    }
}
