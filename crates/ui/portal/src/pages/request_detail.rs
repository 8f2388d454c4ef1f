//! Admin view of a single certificate request: approve, reject, documents.

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::{CertificateRequest, RequestStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, List, ListItem, ListState, Paragraph, Wrap},
};
use tracing::{info, warn};

use crate::{
    action::{Action, Dispatcher, InputRule, PopupId, PopupRequest, PopupResult},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{
        Page, PageContext, Remote, field_line, page_block, placeholder, requests::subject_lines,
        step_selection, stop,
    },
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
    validation::parse_validity_days,
};

const DEFAULT_VALIDITY_DAYS: &str = "365";

pub struct AdminRequestDetailPage {
    dispatcher: Dispatcher,
    id: String,
    request: Remote<CertificateRequest>,
    selected_document: usize,
    busy: bool,
}

impl AdminRequestDetailPage {
    pub fn new(ctx: PageContext, id: String) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            id,
            request: Remote::Loading,
            selected_document: 0,
            busy: false,
        }
    }

    fn load(&self) {
        self.dispatcher.spawn(TaskKind::LoadRequest {
            id: self.id.clone(),
        });
    }

    fn is_pending(&self) -> bool {
        self.request
            .loaded()
            .is_some_and(|r| r.status == RequestStatus::Pending)
    }

    fn documents(&self) -> &[String] {
        self.request
            .loaded()
            .map(|r| r.documents.as_slice())
            .unwrap_or_default()
    }

    fn ask(&self, popup: PopupRequest) {
        if self.busy {
            return;
        }
        if self.is_pending() {
            self.dispatcher.popup(popup);
        } else {
            self.dispatcher.toast(
                NotificationKind::Info,
                "Seules les demandes en attente peuvent être traitées.",
            );
        }
    }

    fn on_popup(&mut self, id: &PopupId, result: &PopupResult) {
        let PopupResult::InputSubmitted(value) = result else {
            return;
        };
        match id {
            PopupId::ApproveValidity => match parse_validity_days(value) {
                Ok(validity_days) => {
                    self.busy = true;
                    self.dispatcher.spawn(TaskKind::Approve {
                        id: self.id.clone(),
                        validity_days,
                    });
                }
                Err(err) => self.dispatcher.toast(NotificationKind::Error, err.to_string()),
            },
            PopupId::RejectReason => {
                self.busy = true;
                self.dispatcher.spawn(TaskKind::Reject {
                    id: self.id.clone(),
                    reason: value.trim().to_string(),
                });
            }
            _ => {}
        }
    }
}

impl Page for AdminRequestDetailPage {
    fn name(&self) -> &str {
        "admin-request-detail"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.load();
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Char('a') => self.ask(PopupRequest::Input {
                id: PopupId::ApproveValidity,
                title: "Approuver la demande".into(),
                label: "Durée de validité (jours)".into(),
                initial: DEFAULT_VALIDITY_DAYS.into(),
                rule: InputRule::PositiveInteger,
            }),
            KeyCode::Char('x') => self.ask(PopupRequest::Input {
                id: PopupId::RejectReason,
                title: "Rejeter la demande".into(),
                label: "Motif du rejet".into(),
                initial: String::new(),
                rule: InputRule::Any,
            }),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_document =
                    step_selection(self.selected_document, self.documents().len(), -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_document =
                    step_selection(self.selected_document, self.documents().len(), 1);
            }
            KeyCode::Char('d') | KeyCode::Enter => {
                let Some(file_name) = self.documents().get(self.selected_document).cloned() else {
                    return Ok(None);
                };
                self.dispatcher.spawn(TaskKind::DownloadRequestDocument {
                    request_id: self.id.clone(),
                    file_name,
                });
            }
            KeyCode::Char('r') => self.load(),
            KeyCode::Esc => return stop(Action::Navigate(Route::AdminRequests)),
            _ => return Ok(None),
        }
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::PopupResult(id, result) => self.on_popup(id, result),
            Action::TaskDone { result, .. } => match result {
                TaskResult::Request(Ok(request)) => {
                    self.selected_document = self
                        .selected_document
                        .min(request.documents.len().saturating_sub(1));
                    self.request = Remote::Loaded(request.clone());
                }
                TaskResult::Request(Err(err)) => {
                    let message = err.user_message("Demande introuvable");
                    if !matches!(self.request, Remote::Loaded(_)) {
                        self.request = Remote::Failed(message.clone());
                    }
                    self.dispatcher.toast(NotificationKind::Error, message);
                }
                TaskResult::Approved(outcome) => {
                    self.busy = false;
                    match outcome {
                        Ok(approval) => {
                            info!(request = %self.id, "request approved");
                            self.dispatcher
                                .toast(NotificationKind::Success, "Demande approuvée.");
                            if let Some(pem) = approval.certificate.clone() {
                                self.dispatcher.popup(PopupRequest::Pem {
                                    title: "Certificat émis".into(),
                                    file_name: format!("certificate-{}.pem", self.id),
                                    pem,
                                });
                            }
                            self.load();
                        }
                        Err(err) => {
                            warn!(request = %self.id, error = %err, "approval failed");
                            self.dispatcher.toast(
                                NotificationKind::Error,
                                err.user_message("Impossible d'approuver"),
                            );
                        }
                    }
                }
                TaskResult::Rejected(outcome) => {
                    self.busy = false;
                    match outcome {
                        Ok(()) => {
                            info!(request = %self.id, "request rejected");
                            self.dispatcher
                                .toast(NotificationKind::Success, "Demande rejetée.");
                            return Ok(Some(Action::Navigate(Route::AdminRequests)));
                        }
                        Err(err) => {
                            warn!(request = %self.id, error = %err, "rejection failed");
                            self.dispatcher.toast(
                                NotificationKind::Error,
                                err.user_message("Impossible de rejeter"),
                            );
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("a", "Approuver"),
            ("x", "Rejeter"),
            ("d", "Télécharger le document"),
            ("Échap", "Retour"),
        ]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Détail de la demande", theme);
        let request = match &self.request {
            Remote::Loading => {
                placeholder(frame, inner, "Chargement…", theme.style(Role::SubtleText));
                return Ok(());
            }
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger));
                return Ok(());
            }
            Remote::Loaded(request) => request,
        };

        let [top, bottom] =
            Layout::vertical([Constraint::Length(12), Constraint::Fill(1)]).areas(inner);
        let [subject_area, requester_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(top);

        frame.render_widget(
            Paragraph::new(Text::from(subject_lines(request, theme)))
                .wrap(Wrap { trim: true })
                .block(
                    Block::bordered()
                        .title(" Sujet ")
                        .title_style(theme.title(false))
                        .border_style(theme.border(false)),
                ),
            subject_area,
        );

        let mut requester = vec![
            field_line("Demandeur", request.requester().to_string(), theme),
            field_line(
                "Identifiant",
                request.user_id.clone().unwrap_or_else(|| "-".into()),
                theme,
            ),
            Line::from(vec![
                Span::styled("Statut : ", theme.style(Role::SubtleText)),
                Span::styled(
                    request.status.as_str().to_string(),
                    theme.status(&request.status),
                ),
            ]),
        ];
        if self.busy {
            requester.push(Line::styled("Traitement en cours…", theme.style(Role::SubtleText)));
        }
        frame.render_widget(
            Paragraph::new(Text::from(requester)).block(
                Block::bordered()
                    .title(" Demandeur ")
                    .title_style(theme.title(false))
                    .border_style(theme.border(false)),
            ),
            requester_area,
        );

        let [csr_area, docs_area] =
            Layout::horizontal([Constraint::Fill(2), Constraint::Fill(1)]).areas(bottom);
        let csr = request.csr_content.as_deref().unwrap_or("(CSR non fourni)");
        frame.render_widget(
            Paragraph::new(csr.to_string())
                .style(theme.style(Role::Muted))
                .block(
                    Block::bordered()
                        .title(" CSR ")
                        .title_style(theme.title(false))
                        .border_style(theme.border(false)),
                ),
            csr_area,
        );

        let docs_block = Block::bordered()
            .title(format!(" Documents ({}) ", request.documents.len()))
            .title_style(theme.title(true))
            .border_style(theme.border(true));
        if request.documents.is_empty() {
            let docs_inner = docs_block.inner(docs_area);
            frame.render_widget(docs_block, docs_area);
            placeholder(frame, docs_inner, "Aucun document", theme.style(Role::SubtleText));
        } else {
            let items: Vec<ListItem> = request
                .documents
                .iter()
                .map(|d| ListItem::new(d.as_str()))
                .collect();
            let list = List::new(items)
                .block(docs_block)
                .highlight_style(theme.selected_row());
            let mut state = ListState::default().with_selected(Some(self.selected_document));
            frame.render_stateful_widget(list, docs_area, &mut state);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::testing::{drain, spawned};
    use crate::core::TaskError;
    use crate::pages::testing::{context, done, key};
    use pki_api::ApprovalResponse;
    use pretty_assertions::assert_eq;

    fn request(status: &str, documents: &[&str]) -> CertificateRequest {
        serde_json::from_value(serde_json::json!({
            "id": "42",
            "commonName": "srv.minpostel.cm",
            "email": "awa.mbida@minpostel.cm",
            "status": status,
            "documents": documents,
        }))
        .unwrap()
    }

    fn loaded(
        status: &str,
        documents: &[&str],
    ) -> (AdminRequestDetailPage, tokio::sync::mpsc::UnboundedReceiver<Action>) {
        let (ctx, mut rx) = context(Route::AdminRequestDetail("42".into()), None);
        let mut page = AdminRequestDetailPage::new(ctx, "42".into());
        page.on_enter().unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::LoadRequest { id: "42".into() }]
        );
        page.update(&done(TaskResult::Request(Ok(request(status, documents)))))
            .unwrap();
        (page, rx)
    }

    #[test]
    fn approve_waits_for_validity_input() {
        let (mut page, mut rx) = loaded("PENDING", &[]);
        page.handle_key_events(key(KeyCode::Char('a'))).unwrap();
        let actions = drain(&mut rx);
        assert!(matches!(
            &actions[..],
            [Action::OpenPopup(PopupRequest::Input { id: PopupId::ApproveValidity, initial, .. })]
                if initial == "365"
        ));
        assert!(spawned(&actions).is_empty());

        page.update(&Action::PopupResult(
            PopupId::ApproveValidity,
            PopupResult::InputSubmitted("730".into()),
        ))
        .unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::Approve {
                id: "42".into(),
                validity_days: 730
            }]
        );
    }

    #[test]
    fn approval_shows_issued_certificate_and_reloads() {
        let (mut page, mut rx) = loaded("PENDING", &[]);
        let approval = ApprovalResponse {
            certificate: Some("-----BEGIN CERTIFICATE-----".into()),
        };
        page.update(&done(TaskResult::Approved(Ok(approval)))).unwrap();
        let actions = drain(&mut rx);
        assert_eq!(
            actions[0],
            Action::Toast(NotificationKind::Success, "Demande approuvée.".into())
        );
        assert!(matches!(
            &actions[1],
            Action::OpenPopup(PopupRequest::Pem { file_name, .. }) if file_name == "certificate-42.pem"
        ));
        assert_eq!(
            spawned(&actions),
            vec![&TaskKind::LoadRequest { id: "42".into() }]
        );
    }

    #[test]
    fn rejection_returns_to_list() {
        let (mut page, mut rx) = loaded("PENDING", &[]);
        page.update(&Action::PopupResult(
            PopupId::RejectReason,
            PopupResult::InputSubmitted("  CSR illisible ".into()),
        ))
        .unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::Reject {
                id: "42".into(),
                reason: "CSR illisible".into()
            }]
        );
        assert_eq!(
            page.update(&done(TaskResult::Rejected(Ok(())))).unwrap(),
            Some(Action::Navigate(Route::AdminRequests))
        );
    }

    #[test]
    fn processed_requests_cannot_be_approved() {
        let (mut page, mut rx) = loaded("ISSUED", &[]);
        page.handle_key_events(key(KeyCode::Char('a'))).unwrap();
        assert!(matches!(
            drain(&mut rx)[..],
            [Action::Toast(NotificationKind::Info, _)]
        ));
    }

    #[test]
    fn approval_failure_uses_backend_message() {
        let (mut page, mut rx) = loaded("PENDING", &[]);
        let err = TaskError::from(pki_api::ApiError::Status {
            status: 400,
            message: Some("CA non initialisée".into()),
        });
        page.update(&done(TaskResult::Approved(Err(err)))).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![Action::Toast(NotificationKind::Error, "CA non initialisée".into())]
        );
        assert!(!page.busy);
    }

    #[test]
    fn selected_document_is_downloaded() {
        let (mut page, mut rx) = loaded("PENDING", &["cni.pdf", "kbis.png"]);
        page.handle_key_events(key(KeyCode::Down)).unwrap();
        page.handle_key_events(key(KeyCode::Char('d'))).unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::DownloadRequestDocument {
                request_id: "42".into(),
                file_name: "kbis.png".into()
            }]
        );
    }
}
