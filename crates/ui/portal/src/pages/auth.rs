//! Login, registration and password recovery screens.

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::Paragraph,
};
use tracing::debug;

use crate::{
    action::{Action, Dispatcher},
    components::{Form, FormEvent, TextField},
    core::{Secret, TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{Page, PageContext, centered_column, message_line, page_block, stop},
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
    validation::{self, ValidationError},
};

const FORM_WIDTH: u16 = 64;

/// Draws a titled form with its message line and a hint line below.
fn draw_form_page(
    frame: &mut Frame<'_>,
    area: Rect,
    theme: &Theme,
    title: &str,
    form: &Form,
    message: (Option<&str>, Option<&str>),
    footer: &str,
) {
    let column = centered_column(area, FORM_WIDTH);
    let height = form.height() + 6;
    let [_, boxed, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(column);
    let inner = page_block(frame, boxed, title, theme);
    let [fields, msg, hint] = Layout::vertical([
        Constraint::Length(form.height()),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .areas(inner);
    form.draw(frame, fields, theme, true);
    frame.render_widget(message_line(message.0, message.1, theme), msg);
    frame.render_widget(
        Paragraph::new(Line::styled(footer.to_string(), theme.style(Role::Muted))),
        hint,
    );
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

pub struct LoginPage {
    dispatcher: Dispatcher,
    form: Form,
    error: Option<String>,
    pending: bool,
}

impl LoginPage {
    const EMAIL: usize = 0;
    const PASSWORD: usize = 1;

    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            form: Form::new(vec![
                TextField::new("Email"),
                TextField::new("Mot de passe").masked(),
            ]),
            error: None,
            pending: false,
        }
    }

    fn submit(&mut self) {
        if self.pending {
            return;
        }
        let email = self.form.value(Self::EMAIL).trim().to_string();
        let password = self.form.value(Self::PASSWORD).to_string();
        if let Err(err) = validation::validate_login(&email, &password) {
            self.error = Some(err.to_string());
            return;
        }
        self.error = None;
        self.pending = true;
        self.dispatcher.spawn(TaskKind::Login {
            email,
            password: Secret::new(password),
        });
    }
}

impl Page for LoginPage {
    fn name(&self) -> &str {
        "login"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if is_ctrl(&key, 'r') {
            return stop(Action::Navigate(Route::Register));
        }
        if is_ctrl(&key, 'f') {
            return stop(Action::Navigate(Route::ForgotPassword));
        }
        match self.form.handle_key(key) {
            FormEvent::Submitted => {
                self.submit();
                stop(Action::Update)
            }
            FormEvent::Edited | FormEvent::Moved => stop(Action::Update),
            FormEvent::Ignored => Ok(None),
        }
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<EventResponse<Action>>> {
        self.form.paste(text);
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::LoggedIn(outcome),
            ..
        } = action
        {
            self.pending = false;
            match outcome {
                Ok(user) => return Ok(Some(Action::SignedIn(user.clone()))),
                Err(err) => {
                    debug!(error = %err, "login failed");
                    self.form.clear_masked();
                    self.error = Some(err.user_message("Email ou mot de passe invalide"));
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("Entrée", "Se connecter"),
            ("Ctrl+R", "Créer un compte"),
            ("Ctrl+F", "Mot de passe oublié"),
        ]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let info = self.pending.then_some("Connexion en cours…");
        draw_form_page(
            frame,
            area,
            theme,
            "Connexion",
            &self.form,
            (self.error.as_deref(), info),
            "Pas de compte ? Ctrl+R  ·  Mot de passe oublié ? Ctrl+F",
        );
        Ok(())
    }
}

pub struct RegisterPage {
    dispatcher: Dispatcher,
    form: Form,
    error: Option<String>,
    pending: bool,
}

impl RegisterPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            form: Form::new(vec![
                TextField::new("Prénom"),
                TextField::new("Nom"),
                TextField::new("Email"),
                TextField::new("Mot de passe").masked(),
            ]),
            error: None,
            pending: false,
        }
    }

    fn submit(&mut self) {
        if self.pending {
            return;
        }
        let first_name = self.form.value(0).trim().to_string();
        let last_name = self.form.value(1).trim().to_string();
        let email = self.form.value(2).trim().to_string();
        let password = self.form.value(3).to_string();
        if let Err(err) =
            validation::validate_registration(&first_name, &last_name, &email, &password)
        {
            self.error = Some(err.to_string());
            return;
        }
        self.error = None;
        self.pending = true;
        self.dispatcher.spawn(TaskKind::Register {
            first_name,
            last_name,
            email,
            password: Secret::new(password),
        });
    }
}

impl Page for RegisterPage {
    fn name(&self) -> &str {
        "register"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if is_ctrl(&key, 'l') {
            return stop(Action::Navigate(Route::Login));
        }
        match self.form.handle_key(key) {
            FormEvent::Submitted => {
                self.submit();
                stop(Action::Update)
            }
            FormEvent::Edited | FormEvent::Moved => stop(Action::Update),
            FormEvent::Ignored => Ok(None),
        }
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<EventResponse<Action>>> {
        self.form.paste(text);
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::Registered(outcome),
            ..
        } = action
        {
            self.pending = false;
            match outcome {
                Ok(user) => return Ok(Some(Action::SignedIn(user.clone()))),
                Err(err) => {
                    debug!(error = %err, "registration failed");
                    self.error = Some(err.user_message("Erreur lors de l'inscription"));
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("Entrée", "Créer le compte"), ("Ctrl+L", "Connexion")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let info = self.pending.then_some("Création du compte…");
        draw_form_page(
            frame,
            area,
            theme,
            "Créer un compte",
            &self.form,
            (self.error.as_deref(), info),
            "Déjà inscrit ? Ctrl+L",
        );
        Ok(())
    }
}

pub struct ForgotPasswordPage {
    dispatcher: Dispatcher,
    form: Form,
    error: Option<String>,
    /// Address the reset mail went to.
    sent_to: Option<String>,
    pending: bool,
}

impl ForgotPasswordPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            form: Form::new(vec![TextField::new("Email")]),
            error: None,
            sent_to: None,
            pending: false,
        }
    }

    fn submit(&mut self) {
        if self.pending {
            return;
        }
        let email = self.form.value(0).trim().to_string();
        if email.is_empty() {
            self.dispatcher
                .toast(NotificationKind::Error, "Veuillez entrer votre email");
            return;
        }
        if !validation::is_valid_email(&email) {
            self.error = Some(ValidationError::InvalidEmail.to_string());
            return;
        }
        self.error = None;
        self.pending = true;
        self.dispatcher.spawn(TaskKind::ForgotPassword { email });
    }
}

impl Page for ForgotPasswordPage {
    fn name(&self) -> &str {
        "forgot-password"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if key.code == KeyCode::Esc {
            return stop(Action::Navigate(Route::Login));
        }
        match self.form.handle_key(key) {
            FormEvent::Submitted => {
                self.submit();
                stop(Action::Update)
            }
            FormEvent::Edited | FormEvent::Moved => stop(Action::Update),
            FormEvent::Ignored => Ok(None),
        }
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<EventResponse<Action>>> {
        self.form.paste(text);
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::ResetMailSent(outcome),
            ..
        } = action
        {
            self.pending = false;
            match outcome {
                Ok(_) => {
                    self.sent_to = Some(self.form.value(0).trim().to_string());
                    self.dispatcher.toast(
                        NotificationKind::Success,
                        "Email de réinitialisation envoyé avec succès",
                    );
                }
                Err(err) => self.dispatcher.toast(
                    NotificationKind::Error,
                    err.user_message("Erreur lors de l'envoi de l'email"),
                ),
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("Entrée", "Envoyer"), ("Échap", "Retour")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let sent = self
            .sent_to
            .as_ref()
            .map(|email| format!("Un lien de réinitialisation a été envoyé à {email}."));
        let info = sent
            .as_deref()
            .or(self.pending.then_some("Envoi en cours…"));
        draw_form_page(
            frame,
            area,
            theme,
            "Mot de passe oublié",
            &self.form,
            (self.error.as_deref(), info),
            "Échap : retour à la connexion",
        );
        Ok(())
    }
}

pub struct ResetPasswordPage {
    dispatcher: Dispatcher,
    token: Option<String>,
    form: Form,
    error: Option<String>,
    pending: bool,
}

impl ResetPasswordPage {
    pub fn new(ctx: PageContext, token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        let error = token
            .is_none()
            .then(|| ValidationError::ResetTokenMissing.to_string());
        Self {
            dispatcher: ctx.dispatcher,
            token,
            form: Form::new(vec![
                TextField::new("Nouveau mot de passe").masked(),
                TextField::new("Confirmer le mot de passe").masked(),
            ]),
            error,
            pending: false,
        }
    }

    fn submit(&mut self) {
        if self.pending {
            return;
        }
        let Some(token) = self.token.clone() else {
            self.error = Some(ValidationError::ResetTokenMissing.to_string());
            return;
        };
        let password = self.form.value(0).to_string();
        if let Err(err) = validation::validate_new_password(&password, self.form.value(1)) {
            self.error = Some(err.to_string());
            return;
        }
        self.error = None;
        self.pending = true;
        self.dispatcher.spawn(TaskKind::ResetPassword {
            token: Secret::new(token),
            password: Secret::new(password),
        });
    }
}

impl Page for ResetPasswordPage {
    fn name(&self) -> &str {
        "reset-password"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if key.code == KeyCode::Esc {
            return stop(Action::Navigate(Route::Login));
        }
        match self.form.handle_key(key) {
            FormEvent::Submitted => {
                self.submit();
                stop(Action::Update)
            }
            FormEvent::Edited | FormEvent::Moved => stop(Action::Update),
            FormEvent::Ignored => Ok(None),
        }
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<EventResponse<Action>>> {
        self.form.paste(text);
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::PasswordReset(outcome),
            ..
        } = action
        {
            self.pending = false;
            match outcome {
                Ok(_) => {
                    self.dispatcher.toast(
                        NotificationKind::Success,
                        "Mot de passe réinitialisé avec succès",
                    );
                    return Ok(Some(Action::Navigate(Route::Login)));
                }
                Err(err) => {
                    self.form.clear_masked();
                    self.error = Some(err.user_message("Erreur lors de la réinitialisation"));
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("Entrée", "Réinitialiser"), ("Échap", "Connexion")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let info = self.pending.then_some("Réinitialisation…");
        draw_form_page(
            frame,
            area,
            theme,
            "Réinitialiser le mot de passe",
            &self.form,
            (self.error.as_deref(), info),
            "8 caractères minimum",
        );
        Ok(())
    }
}
