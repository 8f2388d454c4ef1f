//! Certificate request form: subject, CSR and supporting documents.

use std::path::PathBuf;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pki_api::{Attachment, CsrSource, NewCertificateRequest, Subject, mime_for};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Block, List, ListItem, ListState, Paragraph},
};
use tracing::{debug, info};

use crate::{
    action::{Action, Dispatcher},
    components::{Form, TextArea, TextField},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{Page, PageContext, message_line, page_block, step_selection, stop},
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
    validation::{self, MAX_DOCUMENTS, ValidationError},
};

const SUBJECT_FIELDS: usize = 7;
const CSR_TEXT: usize = SUBJECT_FIELDS;
const CSR_FILE: usize = SUBJECT_FIELDS + 1;
const DOCUMENT_PATH: usize = SUBJECT_FIELDS + 2;
const DOCUMENTS: usize = SUBJECT_FIELDS + 3;
const FOCUS_STOPS: usize = SUBJECT_FIELDS + 4;

/// Turns typed or dropped input into a path: surrounding quotes go, a
/// leading `~/` is the home directory.
fn clean_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);
    match (unquoted.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(unquoted),
    }
}

fn unreadable(err: std::io::Error) -> ValidationError {
    ValidationError::Unreadable(err.to_string())
}

/// Reads a CSR file after checking its size and type.
fn read_csr_file(raw: &str) -> Result<Attachment, ValidationError> {
    let path = clean_path(raw);
    let meta = std::fs::metadata(&path).map_err(unreadable)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    validation::check_csr_file(&name, mime_for(&name), meta.len())?;
    Attachment::from_path(&path).map_err(unreadable)
}

pub struct GenerateCsrPage {
    dispatcher: Dispatcher,
    subject: Form,
    csr_text: TextArea,
    csr_path: TextField,
    csr_file: Option<Attachment>,
    document_path: TextField,
    documents: Vec<Attachment>,
    selected_document: usize,
    focus: usize,
    error: Option<String>,
    submitting: bool,
}

impl GenerateCsrPage {
    pub fn new(ctx: PageContext) -> Self {
        let (name, email) = ctx
            .user
            .as_ref()
            .map(|u| (u.full_name(), u.email.clone()))
            .unwrap_or_default();
        Self {
            dispatcher: ctx.dispatcher,
            subject: Form::new(vec![
                TextField::new("Common Name (CN) *").with_value(name),
                TextField::new("Organisation (O) *"),
                TextField::new("Unité organisationnelle (OU)"),
                TextField::new("Ville (L) *"),
                TextField::new("Région (ST)"),
                TextField::new("Pays (C) *")
                    .with_transform(validation::normalize_country)
                    .with_value("CM"),
                TextField::new("Email *").with_value(email),
            ]),
            csr_text: TextArea::new("CSR (PEM collé)"),
            csr_path: TextField::new("Fichier CSR (.pem, .csr) · Entrée pour joindre"),
            csr_file: None,
            document_path: TextField::new("Justificatif (PDF, PNG, JPEG) · Entrée pour ajouter"),
            documents: Vec::new(),
            selected_document: 0,
            focus: 0,
            error: None,
            submitting: false,
        }
    }

    fn subject(&self) -> Subject {
        let field = |i: usize| self.subject.value(i).trim().to_string();
        Subject {
            common_name: field(0),
            organization: field(1),
            organizational_unit: field(2),
            locality: field(3),
            state: field(4),
            country: field(5),
            email: field(6),
        }
    }

    /// Assembles the request, or reports the first validation failure.
    /// Pasted text wins over an attached file.
    fn build_request(&self) -> Result<NewCertificateRequest, ValidationError> {
        let subject = self.subject();
        validation::validate_subject(&subject)?;
        let csr = if !self.csr_text.is_blank() {
            CsrSource::Text(self.csr_text.value().trim().to_string())
        } else if let Some(file) = &self.csr_file {
            CsrSource::File(file.clone())
        } else {
            return Err(ValidationError::CsrMissing);
        };
        Ok(NewCertificateRequest {
            subject,
            csr,
            documents: self.documents.clone(),
        })
    }

    fn submit(&mut self) {
        if self.submitting {
            return;
        }
        match self.build_request() {
            Ok(request) => {
                info!(
                    cn = %request.subject.common_name,
                    documents = request.documents.len(),
                    "submitting certificate request"
                );
                self.error = None;
                self.submitting = true;
                self.dispatcher.spawn(TaskKind::SubmitRequest(request));
            }
            Err(err) => {
                debug!(error = %err, "certificate request rejected locally");
                self.error = Some(err.to_string());
            }
        }
    }

    fn attach_csr_file(&mut self) {
        let raw = self.csr_path.value().to_string();
        if raw.trim().is_empty() {
            self.csr_file = None;
            return;
        }
        match read_csr_file(&raw) {
            Ok(file) => {
                self.error = None;
                self.csr_file = Some(file);
                self.csr_path.clear();
            }
            Err(err) => {
                self.csr_file = None;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Checks the type and the cap before reading the file.
    fn add_document(&mut self) {
        let raw = self.document_path.value().to_string();
        if raw.trim().is_empty() {
            return;
        }
        let path = clean_path(&raw);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !validation::is_supported_document(&name, mime_for(&name)) {
            debug!(file = %name, "document type not accepted");
            self.error = Some(ValidationError::DocumentType.to_string());
            return;
        }
        if self.documents.len() >= MAX_DOCUMENTS {
            debug!(file = %name, "document limit reached");
            self.error = Some(ValidationError::TooManyDocuments.to_string());
            return;
        }
        match Attachment::from_path(&path) {
            Ok(file) => {
                validation::merge_documents(&mut self.documents, vec![file]);
                self.error = None;
                self.document_path.clear();
            }
            Err(err) => self.error = Some(unreadable(err).to_string()),
        }
    }

    fn remove_selected_document(&mut self) {
        if self.selected_document < self.documents.len() {
            self.documents.remove(self.selected_document);
            self.selected_document =
                step_selection(self.selected_document, self.documents.len(), 0);
        }
    }

    fn move_focus(&mut self, forward: bool) {
        self.focus = if forward {
            (self.focus + 1) % FOCUS_STOPS
        } else {
            (self.focus + FOCUS_STOPS - 1) % FOCUS_STOPS
        };
        if self.focus < SUBJECT_FIELDS {
            self.subject.set_focus(self.focus);
        }
    }

    fn edit_focused(&mut self, key: KeyEvent) -> bool {
        match self.focus {
            f if f < SUBJECT_FIELDS => self
                .subject
                .field_mut(f)
                .is_some_and(|field| field.handle_key(key)),
            CSR_TEXT => self.csr_text.handle_key(key),
            CSR_FILE => self.csr_path.handle_key(key),
            DOCUMENT_PATH => self.document_path.handle_key(key),
            _ => false,
        }
    }
}

impl Page for GenerateCsrPage {
    fn name(&self) -> &str {
        "generate-csr"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            self.submit();
            return stop(Action::Update);
        }
        match key.code {
            KeyCode::Tab => self.move_focus(true),
            KeyCode::BackTab => self.move_focus(false),
            KeyCode::Enter => match self.focus {
                CSR_TEXT => {
                    self.csr_text.handle_key(key);
                }
                CSR_FILE => self.attach_csr_file(),
                DOCUMENT_PATH => self.add_document(),
                DOCUMENTS => {}
                _ => self.move_focus(true),
            },
            KeyCode::Up if self.focus == DOCUMENTS => {
                self.selected_document =
                    step_selection(self.selected_document, self.documents.len(), -1);
            }
            KeyCode::Down if self.focus == DOCUMENTS => {
                self.selected_document =
                    step_selection(self.selected_document, self.documents.len(), 1);
            }
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('x')
                if self.focus == DOCUMENTS =>
            {
                self.remove_selected_document();
            }
            KeyCode::Up if self.focus < SUBJECT_FIELDS => self.move_focus(false),
            KeyCode::Down if self.focus < SUBJECT_FIELDS => self.move_focus(true),
            _ => {
                if !self.edit_focused(key) {
                    return Ok(None);
                }
            }
        }
        stop(Action::Update)
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<EventResponse<Action>>> {
        match self.focus {
            f if f < SUBJECT_FIELDS => self.subject.paste(text),
            CSR_TEXT => self.csr_text.paste(text),
            CSR_FILE => self.csr_path.paste(text),
            DOCUMENT_PATH => self.document_path.paste(text),
            _ => return Ok(None),
        }
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::RequestSubmitted(outcome),
            ..
        } = action
        {
            self.submitting = false;
            match outcome {
                Ok(request) => {
                    info!(id = %request.id, "certificate request submitted");
                    self.dispatcher.toast(
                        NotificationKind::Success,
                        "Demande soumise avec succès. Elle sera examinée par un administrateur.",
                    );
                    return Ok(Some(Action::Navigate(Route::Requests)));
                }
                Err(err) => self.error = Some(err.user_message("Erreur lors de la soumission.")),
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        if self.focus == DOCUMENTS {
            &[("Tab", "Champ suivant"), ("x", "Retirer"), ("Ctrl+S", "Soumettre")]
        } else {
            &[("Tab", "Champ suivant"), ("Ctrl+S", "Soumettre")]
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Demande de certificat", theme);
        let [body, message] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(2)]).areas(inner);
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
                .areas(body);

        self.subject
            .draw(frame, left, theme, self.focus < SUBJECT_FIELDS);

        let [csr_area, file_area, attached_area, doc_path_area, docs_area] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(MAX_DOCUMENTS as u16 + 2),
        ])
        .areas(right);
        self.csr_text
            .draw(frame, csr_area, theme, self.focus == CSR_TEXT);
        self.csr_path
            .draw(frame, file_area, theme, self.focus == CSR_FILE);
        let attached = match &self.csr_file {
            Some(file) => Line::styled(
                format!("✓ {} ({} o)", file.file_name, file.size()),
                theme.style(Role::Success),
            ),
            None => Line::styled("Aucun fichier CSR joint", theme.style(Role::Muted)),
        };
        frame.render_widget(Paragraph::new(attached), attached_area);
        self.document_path
            .draw(frame, doc_path_area, theme, self.focus == DOCUMENT_PATH);

        let items: Vec<ListItem> = self
            .documents
            .iter()
            .map(|d| ListItem::new(format!("{} · {} · {} o", d.file_name, d.mime, d.size())))
            .collect();
        let focused = self.focus == DOCUMENTS;
        let list = List::new(items)
            .block(
                Block::bordered()
                    .title(format!(
                        "Justificatifs ({}/{MAX_DOCUMENTS})",
                        self.documents.len()
                    ))
                    .title_style(theme.title(focused))
                    .border_style(theme.border(focused)),
            )
            .highlight_style(theme.selected_row());
        let mut state = ListState::default()
            .with_selected((focused && !self.documents.is_empty()).then_some(self.selected_document));
        frame.render_stateful_widget(list, docs_area, &mut state);

        let info = self.submitting.then_some("Envoi de la demande…");
        frame.render_widget(message_line(self.error.as_deref(), info, theme), message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::testing::{drain, spawned};
    use crate::pages::testing::{context, ctrl, done, key, user};
    use pki_api::{CertificateRequest, RequestStatus, Role as UserRole};
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    const CSR: &str = "-----BEGIN CERTIFICATE REQUEST-----\nMIIC\n-----END CERTIFICATE REQUEST-----";

    fn page() -> (GenerateCsrPage, tokio::sync::mpsc::UnboundedReceiver<Action>) {
        let (ctx, rx) = context(Route::GenerateCsr, Some(user(UserRole::User)));
        (GenerateCsrPage::new(ctx), rx)
    }

    fn fill_required(page: &mut GenerateCsrPage) {
        page.subject.field_mut(1).unwrap().set_value("MINPOSTEL");
        page.subject.field_mut(3).unwrap().set_value("Yaoundé");
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> String {
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(bytes)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn prefills_from_user() {
        let (page, _rx) = page();
        let subject = page.subject();
        assert_eq!(subject.common_name, "Awa Mbida");
        assert_eq!(subject.email, "awa.mbida@minpostel.cm");
        assert_eq!(subject.country, "CM");
    }

    #[test]
    fn missing_fields_block_submission() {
        let (mut page, mut rx) = page();
        page.csr_text.paste(CSR);
        page.handle_key_events(ctrl('s')).unwrap();
        assert!(spawned(&drain(&mut rx)).is_empty());
        assert_eq!(page.error.as_deref(), Some("L'organisation (O) est requise"));
    }

    #[test]
    fn missing_csr_blocks_submission() {
        let (mut page, mut rx) = page();
        fill_required(&mut page);
        page.handle_key_events(ctrl('s')).unwrap();
        assert!(spawned(&drain(&mut rx)).is_empty());
        assert_eq!(
            page.error.as_deref(),
            Some("Un CSR (texte ou fichier) est requis pour soumettre la demande.")
        );
    }

    #[test]
    fn country_is_uppercased_as_typed() {
        let (mut page, _rx) = page();
        page.subject.field_mut(5).unwrap().set_value("");
        page.focus = 5;
        page.subject.set_focus(5);
        page.handle_key_events(key(KeyCode::Char('f'))).unwrap();
        page.handle_key_events(key(KeyCode::Char('r'))).unwrap();
        page.handle_key_events(key(KeyCode::Char('x'))).unwrap();
        assert_eq!(page.subject.value(5), "FR");
    }

    #[test]
    fn pasted_text_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut page, mut rx) = page();
        fill_required(&mut page);
        page.csr_path
            .set_value(write_file(&dir, "req.csr", b"file csr"));
        page.attach_csr_file();
        assert!(page.csr_file.is_some());
        page.csr_text.paste(CSR);

        page.handle_key_events(ctrl('s')).unwrap();
        let actions = drain(&mut rx);
        match spawned(&actions)[..] {
            [TaskKind::SubmitRequest(request)] => {
                assert_eq!(request.csr, CsrSource::Text(CSR.into()));
                assert_eq!(request.subject.locality, "Yaoundé");
            }
            ref other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_csr_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (mut page, _rx) = page();
        page.csr_path
            .set_value(write_file(&dir, "big.pem", &vec![b'A'; 201 * 1024]));
        page.attach_csr_file();
        assert!(page.csr_file.is_none());
        assert_eq!(page.error.as_deref(), Some("Fichier CSR trop volumineux (>200KB)"));
    }

    #[test]
    fn unknown_csr_file_type_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (mut page, _rx) = page();
        page.csr_path
            .set_value(write_file(&dir, "scan.docx", b"zip"));
        page.attach_csr_file();
        assert!(page.csr_file.is_none());
        assert_eq!(
            page.error.as_deref(),
            Some("Type de fichier CSR non pris en charge")
        );
    }

    #[test]
    fn documents_are_capped_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let (mut page, _rx) = page();
        page.document_path
            .set_value(write_file(&dir, "notes.txt", b"text"));
        page.add_document();
        assert!(page.documents.is_empty());
        assert_eq!(
            page.error.as_deref(),
            Some("Seuls les fichiers PDF, PNG et JPEG sont acceptés")
        );

        for i in 0..MAX_DOCUMENTS {
            let path = write_file(&dir, &format!("piece-{i}.pdf"), b"%PDF");
            page.document_path.set_value(format!("'{path}'"));
            page.add_document();
        }
        assert_eq!(page.documents.len(), MAX_DOCUMENTS);
        assert_eq!(page.documents[0].file_name, "piece-0.pdf");
        assert_eq!(page.error, None);

        page.document_path.set_value("/nonexistent/sixth.pdf");
        page.add_document();
        assert_eq!(page.documents.len(), MAX_DOCUMENTS);
        assert_eq!(
            page.error.as_deref(),
            Some("5 justificatifs au maximum")
        );
    }

    #[test]
    fn unsupported_document_is_never_read() {
        let (mut page, _rx) = page();
        page.document_path.set_value("/nonexistent/archive.zip");
        page.add_document();
        assert_eq!(
            page.error.as_deref(),
            Some("Seuls les fichiers PDF, PNG et JPEG sont acceptés")
        );
    }

    #[test]
    fn documents_can_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (mut page, _rx) = page();
        for name in ["a.pdf", "b.png"] {
            page.document_path.set_value(write_file(&dir, name, b"x"));
            page.add_document();
        }
        page.focus = DOCUMENTS;
        page.handle_key_events(key(KeyCode::Down)).unwrap();
        page.handle_key_events(key(KeyCode::Char('x'))).unwrap();
        let names: Vec<_> = page.documents.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf"]);
        assert_eq!(page.selected_document, 0);
    }

    #[test]
    fn success_goes_to_requests() {
        let (mut page, mut rx) = page();
        let created = CertificateRequest {
            id: "r-1".into(),
            user_id: None,
            user_email: None,
            user_full_name: None,
            common_name: "Awa Mbida".into(),
            organization: None,
            organizational_unit: None,
            locality: None,
            state: None,
            country: None,
            email: "awa.mbida@minpostel.cm".into(),
            csr_content: None,
            documents: Vec::new(),
            status: RequestStatus::Pending,
            submitted_at: None,
        };
        let next = page
            .update(&done(TaskResult::RequestSubmitted(Ok(created))))
            .unwrap();
        assert_eq!(next, Some(Action::Navigate(Route::Requests)));
        assert!(matches!(
            drain(&mut rx)[..],
            [Action::Toast(NotificationKind::Success, _)]
        ));
    }

    #[test]
    fn quoted_and_home_paths_are_cleaned() {
        assert_eq!(clean_path("  \"/tmp/a b.pdf\" "), PathBuf::from("/tmp/a b.pdf"));
        assert_eq!(clean_path("'/tmp/x.csr'"), PathBuf::from("/tmp/x.csr"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(clean_path("~/req.pem"), home.join("req.pem"));
        }
    }
}
