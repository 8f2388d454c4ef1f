use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::User;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Cell, Paragraph, Row, Table, TableState},
};
use tracing::{info, warn};

use crate::{
    action::{Action, Dispatcher, PopupId, PopupRequest, PopupResult},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{
        Page, PageContext, Remote, format_opt_timestamp, format_timestamp, page_block, placeholder,
        step_selection, stop,
    },
    pagination::Pager,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

const USERS_PAGE_SIZE: u32 = 20;

pub struct ManageUsersPage {
    dispatcher: Dispatcher,
    current_user_id: Option<String>,
    pager: Pager,
    users: Remote<Vec<User>>,
    selected: usize,
}

impl ManageUsersPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            current_user_id: ctx.user.map(|u| u.id),
            pager: Pager::new(USERS_PAGE_SIZE),
            users: Remote::Loading,
            selected: 0,
        }
    }

    fn load(&self) {
        self.dispatcher.spawn(TaskKind::LoadUsers {
            page: self.pager.page(),
            size: self.pager.size(),
        });
    }

    fn request_delete(&self) {
        let Some(user) = self.users.loaded().and_then(|u| u.get(self.selected)) else {
            return;
        };
        if self.current_user_id.as_deref() == Some(user.id.as_str()) {
            self.dispatcher.toast(
                NotificationKind::Error,
                "Vous ne pouvez pas supprimer votre propre compte",
            );
            return;
        }
        self.dispatcher.popup(PopupRequest::Confirm {
            id: PopupId::DeleteUser {
                id: user.id.clone(),
                email: user.email.clone(),
            },
            title: "Supprimer l'utilisateur".into(),
            question: format!(
                "Supprimer définitivement le compte {} ?",
                user.email
            ),
        });
    }
}

impl Page for ManageUsersPage {
    fn name(&self) -> &str {
        "manage-users"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.load();
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let len = self.users.loaded().map_or(0, Vec::len);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = step_selection(self.selected, len, -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = step_selection(self.selected, len, 1);
            }
            KeyCode::Right | KeyCode::Char('n') => {
                if self.pager.next() {
                    self.load();
                }
            }
            KeyCode::Left | KeyCode::Char('p') => {
                if self.pager.prev() {
                    self.load();
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => self.request_delete(),
            KeyCode::Char('r') => self.load(),
            _ => return Ok(None),
        }
        stop(Action::Update)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::PopupResult(PopupId::DeleteUser { id, email }, PopupResult::Confirmed) => {
                self.dispatcher.spawn(TaskKind::DeleteUser {
                    id: id.clone(),
                    email: email.clone(),
                });
            }
            Action::TaskDone {
                result: TaskResult::Users(outcome),
                ..
            } => match outcome {
                Ok(paged) => {
                    if self.pager.absorb(paged) {
                        self.load();
                        return Ok(None);
                    }
                    self.selected = self.selected.min(paged.items.len().saturating_sub(1));
                    self.users = Remote::Loaded(paged.items.clone());
                }
                Err(err) => {
                    warn!(error = %err, "loading users failed");
                    let message = err.user_message("Impossible de charger les utilisateurs");
                    if !matches!(self.users, Remote::Loaded(_)) {
                        self.users = Remote::Failed(message.clone());
                    }
                    self.dispatcher.toast(NotificationKind::Error, message);
                }
            },
            Action::TaskDone {
                result: TaskResult::UserDeleted { email, outcome },
                ..
            } => match outcome {
                Ok(()) => {
                    info!(user = %email, "user deleted");
                    self.dispatcher.toast(
                        NotificationKind::Success,
                        format!("Utilisateur {email} supprimé avec succès"),
                    );
                    self.load();
                }
                Err(err) => {
                    warn!(user = %email, error = %err, "user deletion failed");
                    self.dispatcher.toast(
                        NotificationKind::Error,
                        err.user_message("Erreur lors de la suppression"),
                    );
                }
            },
            _ => {}
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("d", "Supprimer"), ("←/→", "Page"), ("r", "Actualiser")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Utilisateurs", theme);
        let [body, footer] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

        match &self.users {
            Remote::Loading => placeholder(frame, body, "Chargement…", theme.style(Role::SubtleText)),
            Remote::Failed(message) => placeholder(frame, body, message, theme.style(Role::Danger)),
            Remote::Loaded(users) if users.is_empty() => {
                placeholder(frame, body, "Aucun utilisateur.", theme.style(Role::SubtleText))
            }
            Remote::Loaded(users) => {
                let rows = users.iter().map(|u| {
                    let is_self = self.current_user_id.as_deref() == Some(u.id.as_str());
                    let name = if is_self {
                        format!("{} (vous)", u.full_name())
                    } else {
                        u.full_name()
                    };
                    let active = if u.is_active {
                        Cell::from("actif").style(theme.style(Role::Success))
                    } else {
                        Cell::from("inactif").style(theme.style(Role::Muted))
                    };
                    Row::new([
                        Cell::from(name),
                        Cell::from(u.email.as_str()),
                        Cell::from(u.role.to_string()),
                        active,
                        Cell::from(format_timestamp(&u.created_at)),
                        Cell::from(format_opt_timestamp(u.last_login.as_deref())),
                    ])
                });
                let table = Table::new(
                    rows,
                    [
                        Constraint::Fill(1),
                        Constraint::Fill(1),
                        Constraint::Length(6),
                        Constraint::Length(8),
                        Constraint::Length(17),
                        Constraint::Length(17),
                    ],
                )
                .header(
                    Row::new(["Nom", "Email", "Rôle", "État", "Créé le", "Dernière connexion"])
                        .style(theme.title(true))
                        .bottom_margin(1),
                )
                .row_highlight_style(theme.selected_row());
                let mut state = TableState::default().with_selected(Some(self.selected));
                frame.render_stateful_widget(table, body, &mut state);
            }
        }

        frame.render_widget(
            Paragraph::new(Line::styled(
                format!(
                    "Page {} / {}  ·  {} utilisateur(s)",
                    self.pager.page() + 1,
                    self.pager.total_pages(),
                    self.pager.total()
                ),
                theme.style(Role::Muted),
            ))
            .right_aligned(),
            footer,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::testing::{drain, spawned};
    use crate::pages::testing::{context, done, key, user};
    use crate::router::Route;
    use pki_api::{Paged, Role as UserRole};
    use pretty_assertions::assert_eq;

    fn other(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            email: email.into(),
            ..user(UserRole::User)
        }
    }

    fn setup(users: Vec<User>) -> (ManageUsersPage, tokio::sync::mpsc::UnboundedReceiver<Action>) {
        let (ctx, mut rx) = context(Route::AdminManageUsers, Some(user(UserRole::Admin)));
        let mut page = ManageUsersPage::new(ctx);
        page.on_enter().unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::LoadUsers { page: 0, size: 20 }]
        );
        let total = users.len() as u64;
        page.update(&done(TaskResult::Users(Ok(Paged {
            items: users,
            total,
            page: 0,
            size: 20,
            total_pages: 1,
        }))))
        .unwrap();
        (page, rx)
    }

    #[test]
    fn deleting_yourself_is_refused() {
        let (mut page, mut rx) = setup(vec![user(UserRole::Admin)]);
        page.handle_key_events(key(KeyCode::Char('d'))).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![Action::Toast(
                NotificationKind::Error,
                "Vous ne pouvez pas supprimer votre propre compte".into()
            )]
        );
    }

    #[test]
    fn delete_is_confirm_gated_then_reloads() {
        let (mut page, mut rx) = setup(vec![
            user(UserRole::Admin),
            other("u-2", "paul.ngono@minpostel.cm"),
        ]);
        page.handle_key_events(key(KeyCode::Down)).unwrap();
        page.handle_key_events(key(KeyCode::Char('d'))).unwrap();
        let actions = drain(&mut rx);
        assert!(spawned(&actions).is_empty());
        assert!(matches!(
            &actions[..],
            [Action::OpenPopup(PopupRequest::Confirm { id: PopupId::DeleteUser { id, .. }, .. })]
                if id == "u-2"
        ));

        let popup_id = PopupId::DeleteUser {
            id: "u-2".into(),
            email: "paul.ngono@minpostel.cm".into(),
        };
        page.update(&Action::PopupResult(popup_id.clone(), PopupResult::Cancelled))
            .unwrap();
        assert!(drain(&mut rx).is_empty());

        page.update(&Action::PopupResult(popup_id, PopupResult::Confirmed))
            .unwrap();
        assert_eq!(
            spawned(&drain(&mut rx)),
            vec![&TaskKind::DeleteUser {
                id: "u-2".into(),
                email: "paul.ngono@minpostel.cm".into()
            }]
        );

        page.update(&done(TaskResult::UserDeleted {
            email: "paul.ngono@minpostel.cm".into(),
            outcome: Ok(()),
        }))
        .unwrap();
        let actions = drain(&mut rx);
        assert_eq!(
            actions[0],
            Action::Toast(
                NotificationKind::Success,
                "Utilisateur paul.ngono@minpostel.cm supprimé avec succès".into()
            )
        );
        assert_eq!(
            spawned(&actions),
            vec![&TaskKind::LoadUsers { page: 0, size: 20 }]
        );
    }
}
