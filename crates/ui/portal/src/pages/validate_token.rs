use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::IssuedCertificate;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Text},
    widgets::{Paragraph, Wrap},
};
use tracing::warn;

use crate::{
    action::{Action, Dispatcher, PopupRequest},
    core::{Secret, TaskKind, TaskResult},
    pages::{
        Page, PageContext, Remote, centered_column, field_line, format_opt_timestamp, page_block,
        placeholder, stop,
    },
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
    validation::ValidationError,
};

/// Exchanges the emailed validation token for the issued certificate.
pub struct ValidateTokenPage {
    dispatcher: Dispatcher,
    signed_in: bool,
    params: Option<(String, String)>,
    state: Remote<IssuedCertificate>,
}

impl ValidateTokenPage {
    pub fn new(ctx: PageContext, request_id: Option<String>, token: Option<String>) -> Self {
        let params = match (request_id, token) {
            (Some(id), Some(token)) if !id.is_empty() && !token.is_empty() => Some((id, token)),
            _ => None,
        };
        let state = if params.is_some() {
            Remote::Loading
        } else {
            Remote::Failed(ValidationError::ValidationParamsMissing.to_string())
        };
        Self {
            dispatcher: ctx.dispatcher,
            signed_in: ctx.user.is_some(),
            params,
            state,
        }
    }

    fn file_name(cert: &IssuedCertificate) -> String {
        format!("certificate-{}.pem", cert.certificate_id)
    }
}

impl Page for ValidateTokenPage {
    fn name(&self) -> &str {
        "validate-token"
    }

    fn on_enter(&mut self) -> Result<()> {
        if !self.signed_in {
            self.dispatcher.navigate(Route::Login);
            return Ok(());
        }
        if let Some((request_id, token)) = &self.params {
            self.dispatcher.spawn(TaskKind::ValidateToken {
                request_id: request_id.clone(),
                token: Secret::new(token.clone()),
            });
        }
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let Some(cert) = self.state.loaded() else {
            return Ok(None);
        };
        match key.code {
            KeyCode::Char('s') => stop(Action::SaveFile {
                file_name: Self::file_name(cert),
                bytes: cert.certificate.as_bytes().to_vec(),
            }),
            KeyCode::Char('v') | KeyCode::Enter => stop(Action::OpenPopup(PopupRequest::Pem {
                title: "Certificat émis".into(),
                file_name: Self::file_name(cert),
                pem: cert.certificate.clone(),
            })),
            KeyCode::Char('c') => stop(Action::CopyToClipboard(cert.certificate.clone())),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::TokenValidated(outcome),
            ..
        } = action
        {
            self.state = match outcome {
                Ok(cert) => Remote::Loaded(cert.clone()),
                Err(err) => {
                    warn!(error = %err, "token validation failed");
                    Remote::Failed(err.user_message("La validation du jeton a échoué"))
                }
            };
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        match self.state {
            Remote::Loaded(_) => &[("v", "Voir"), ("c", "Copier"), ("s", "Enregistrer")],
            _ => &[],
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let column = centered_column(area, 90);
        let inner = page_block(frame, column, "Validation de la demande", theme);
        match &self.state {
            Remote::Loading => placeholder(
                frame,
                inner,
                "Validation du jeton en cours…",
                theme.style(Role::SubtleText),
            ),
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger))
            }
            Remote::Loaded(cert) => {
                let [head, pem] =
                    Layout::vertical([Constraint::Length(7), Constraint::Fill(1)]).areas(inner);
                let lines = vec![
                    Line::styled(
                        "Votre certificat a été émis.",
                        theme.style(Role::Success),
                    ),
                    Line::raw(""),
                    field_line("Identifiant", cert.certificate_id.clone(), theme),
                    field_line(
                        "Empreinte",
                        cert.fingerprint.clone().unwrap_or_else(|| "-".into()),
                        theme,
                    ),
                    field_line("Émis le", format_opt_timestamp(cert.issued_at.as_deref()), theme),
                    field_line(
                        "Expire le",
                        format_opt_timestamp(cert.expires_at.as_deref()),
                        theme,
                    ),
                ];
                frame.render_widget(Paragraph::new(Text::from(lines)), head);
                frame.render_widget(
                    Paragraph::new(cert.certificate.as_str())
                        .style(theme.style(Role::Primary))
                        .wrap(Wrap { trim: false }),
                    pem,
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
    use crate::pages::testing::{context, done, key, user};
    use pretty_assertions::assert_eq;

    fn route() -> Route {
        Route::ValidateToken {
            request_id: Some("42".into()),
            token: Some("abc".into()),
        }
    }

    #[test]
    fn anonymous_is_sent_to_login() {
        let (ctx, mut rx) = context(route(), None);
        let mut page = ValidateTokenPage::new(ctx, Some("42".into()), Some("abc".into()));
        page.on_enter().unwrap();
        assert_eq!(drain(&mut rx), vec![Action::Navigate(Route::Login)]);
    }

    #[test]
    fn missing_parameter_makes_no_call() {
        let (ctx, mut rx) = context(route(), Some(user(pki_api::Role::User)));
        let mut page = ValidateTokenPage::new(ctx, Some("42".into()), None);
        page.on_enter().unwrap();
        assert!(drain(&mut rx).is_empty());
        assert_eq!(
            page.state,
            Remote::Failed("Paramètres manquants : requestId ou token".into())
        );
    }

    #[test]
    fn issued_certificate_can_be_saved() {
        let (ctx, mut rx) = context(route(), Some(user(pki_api::Role::User)));
        let mut page = ValidateTokenPage::new(ctx, Some("42".into()), Some("abc".into()));
        page.on_enter().unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::ValidateToken {
                request_id: "42".into(),
                token: Secret::new("abc"),
            }]
        );

        let cert = IssuedCertificate {
            certificate_id: "c-7".into(),
            certificate: "-----BEGIN CERTIFICATE-----".into(),
            fingerprint: None,
            issued_at: None,
            expires_at: None,
        };
        page.update(&done(TaskResult::TokenValidated(Ok(cert)))).unwrap();
        assert_eq!(
            page.handle_key_events(key(KeyCode::Char('s'))).unwrap(),
            Some(EventResponse::Stop(Action::SaveFile {
                file_name: "certificate-c-7.pem".into(),
                bytes: b"-----BEGIN CERTIFICATE-----".to_vec(),
            }))
        );
    }
}
