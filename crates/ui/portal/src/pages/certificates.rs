use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::{Certificate, CertificateFormat};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Text},
    widgets::{Cell, Paragraph, Row, Table, TableState, Wrap},
};
use tracing::warn;

use crate::{
    action::{Action, Dispatcher, PopupRequest},
    core::{TaskKind, TaskResult, executor::certificate_file_name},
    layers::NotificationKind,
    pages::{
        Page, PageContext, Remote, field_line, format_timestamp, page_block, placeholder,
        step_selection, stop,
    },
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

pub(super) const LOAD_ERROR: &str = "Erreur lors du chargement des certificats.";

/// Table of certificates with the selected row highlighted.
pub(super) fn certificate_table<'a>(certs: &'a [Certificate], theme: &Theme) -> Table<'a> {
    let header = Row::new(["N° de série", "Sujet", "Statut", "Expire le"])
        .style(theme.title(true))
        .bottom_margin(1);
    let rows = certs.iter().map(|c| {
        let status_role = match c.status.as_str() {
            "ACTIVE" | "VALID" => Role::Success,
            "REVOKED" => Role::Danger,
            "EXPIRED" => Role::Warning,
            _ => Role::SubtleText,
        };
        Row::new([
            Cell::from(c.serial_number.as_str()),
            Cell::from(c.subject_dn.as_str()),
            Cell::from(c.status.as_str()).style(theme.style(status_role)),
            Cell::from(format_timestamp(&c.not_after)),
        ])
    });
    Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Fill(1),
            Constraint::Length(10),
            Constraint::Length(17),
        ],
    )
    .header(header)
    .row_highlight_style(theme.selected_row())
}

/// The user's certificates with download actions.
pub struct CertificatesPage {
    dispatcher: Dispatcher,
    certs: Remote<Vec<Certificate>>,
    selected: usize,
}

impl CertificatesPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            certs: Remote::Loading,
            selected: 0,
        }
    }

    fn load(&mut self) {
        self.dispatcher.spawn(TaskKind::LoadMyCertificates);
    }

    fn selected(&self) -> Option<&Certificate> {
        self.certs.loaded().and_then(|c| c.get(self.selected))
    }

    fn download(&self, format: CertificateFormat) -> Option<Action> {
        let cert = self.selected()?;
        Some(Action::Spawn {
            origin: self.dispatcher.origin().clone(),
            task: TaskKind::DownloadCertificate {
                id: cert.id.clone(),
                serial: cert.serial_number.clone(),
                format,
            },
        })
    }
}

impl Page for CertificatesPage {
    fn name(&self) -> &str {
        "certificates"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.load();
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let len = self.certs.loaded().map_or(0, Vec::len);
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = step_selection(self.selected, len, -1);
                Action::Update
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = step_selection(self.selected, len, 1);
                Action::Update
            }
            KeyCode::Char('r') => {
                self.load();
                Action::Update
            }
            KeyCode::Char('p') => match self.download(CertificateFormat::Pem) {
                Some(action) => action,
                None => return Ok(None),
            },
            KeyCode::Char('d') => match self.download(CertificateFormat::Crt) {
                Some(action) => action,
                None => return Ok(None),
            },
            KeyCode::Enter | KeyCode::Char('v') => match self.selected() {
                Some(cert) if !cert.certificate_pem.is_empty() => {
                    Action::OpenPopup(PopupRequest::Pem {
                        title: format!("Certificat {}", cert.serial_number),
                        file_name: certificate_file_name(
                            &cert.serial_number,
                            CertificateFormat::Pem,
                        ),
                        pem: cert.certificate_pem.clone(),
                    })
                }
                Some(_) => Action::Toast(
                    NotificationKind::Info,
                    "PEM indisponible, utilisez le téléchargement (p)".into(),
                ),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        stop(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::MyCertificates(outcome),
            ..
        } = action
        {
            match outcome {
                Ok(certs) => {
                    self.selected = self.selected.min(certs.len().saturating_sub(1));
                    self.certs = Remote::Loaded(certs.clone());
                }
                Err(err) => {
                    warn!(error = %err, "loading certificates failed");
                    if !matches!(self.certs, Remote::Loaded(_)) {
                        self.certs = Remote::Failed(LOAD_ERROR.into());
                    }
                    self.dispatcher
                        .toast(NotificationKind::Error, err.user_message(LOAD_ERROR));
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("↑/↓", "Sélection"),
            ("v", "Voir PEM"),
            ("p", "Télécharger PEM"),
            ("d", "Télécharger CRT"),
            ("r", "Actualiser"),
        ]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Mes certificats", theme);
        let certs = match &self.certs {
            Remote::Loading => {
                placeholder(frame, inner, "Chargement…", theme.style(Role::SubtleText));
                return Ok(());
            }
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger));
                return Ok(());
            }
            Remote::Loaded(certs) if certs.is_empty() => {
                placeholder(
                    frame,
                    inner,
                    "Aucun certificat pour le moment.",
                    theme.style(Role::SubtleText),
                );
                return Ok(());
            }
            Remote::Loaded(certs) => certs,
        };

        let [table_area, detail_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(7)]).areas(inner);
        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(certificate_table(certs, theme), table_area, &mut state);

        if let Some(cert) = certs.get(self.selected) {
            let lines = vec![
                field_line("Sujet", cert.subject_dn.clone(), theme),
                field_line("Émetteur", cert.issuer_dn.clone(), theme),
                field_line("N° de série", cert.serial_number.clone(), theme),
                field_line("Valide du", format_timestamp(&cert.not_before), theme),
                field_line("Valide jusqu'au", format_timestamp(&cert.not_after), theme),
                Line::styled(
                    "p : PEM  ·  d : CRT  ·  v : afficher",
                    theme.style(Role::Muted),
                ),
            ];
            frame.render_widget(
                Paragraph::new(Text::from(lines))
                    .block(ratatui::widgets::Block::bordered().border_style(theme.border(false)))
                    .wrap(Wrap { trim: true }),
                detail_area,
            );
        }
        Ok(())
    }
}
