use pki_api::User;
use strum::Display;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::core::{TaskKind, TaskResult};
use crate::layers::NotificationKind;
use crate::router::Route;

/// The page instance a task was issued from.
///
/// Every navigation mounts a fresh page with a new `mount` number. A result
/// whose mount is no longer current belongs to a page that is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub route: Route,
    pub mount: u64,
}

impl Origin {
    pub fn new(route: Route, mount: u64) -> Self {
        Self { route, mount }
    }

    /// Tasks issued by the shell itself (session restore, saves from popups).
    pub fn shell() -> Self {
        Self {
            route: Route::Landing,
            mount: 0,
        }
    }

    pub fn is_shell(&self) -> bool {
        self.mount == 0
    }
}

/// Which question a popup answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupId {
    InitializeCa,
    ApproveValidity,
    RejectReason,
    DeleteUser { id: String, email: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupResult {
    Confirmed,
    InputSubmitted(String),
    Cancelled,
}

/// Constraint checked by an input popup before it submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRule {
    Any,
    PositiveInteger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupRequest {
    Confirm {
        id: PopupId,
        title: String,
        question: String,
    },
    Input {
        id: PopupId,
        title: String,
        label: String,
        initial: String,
        rule: InputRule,
    },
    /// Read-only PEM viewer with copy and save.
    Pem {
        title: String,
        file_name: String,
        pem: String,
    },
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Error(String),
    Update,
    Submit,

    Navigate(Route),
    /// Login or registration succeeded.
    SignedIn(User),
    Logout,
    /// The backend answered 401; tokens are already gone.
    SessionExpired,
    ToggleSidebarFocus,

    Spawn {
        origin: Origin,
        task: TaskKind,
    },
    TaskDone {
        origin: Origin,
        result: TaskResult,
    },

    Toast(NotificationKind, String),
    DismissToast,
    CopyToClipboard(String),
    SaveFile {
        file_name: String,
        bytes: Vec<u8>,
    },

    OpenPopup(PopupRequest),
    ClosePopup,
    PopupResult(PopupId, PopupResult),
}

/// What a page holds to talk to the shell: the action sender plus the
/// origin its tasks are tagged with.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: UnboundedSender<Action>,
    origin: Origin,
}

impl Dispatcher {
    pub fn new(tx: UnboundedSender<Action>, origin: Origin) -> Self {
        Self { tx, origin }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn send(&self, action: Action) {
        if self.tx.send(action).is_err() {
            debug!("action channel closed");
        }
    }

    pub fn spawn(&self, task: TaskKind) {
        self.send(Action::Spawn {
            origin: self.origin.clone(),
            task,
        });
    }

    pub fn navigate(&self, route: Route) {
        self.send(Action::Navigate(route));
    }

    pub fn toast(&self, kind: NotificationKind, message: impl Into<String>) {
        self.send(Action::Toast(kind, message.into()));
    }

    pub fn popup(&self, request: PopupRequest) {
        self.send(Action::OpenPopup(request));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    /// Dispatcher for page tests plus the receiving end of its channel.
    pub fn dispatcher(route: Route) -> (Dispatcher, UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher::new(tx, Origin::new(route, 1)), rx)
    }

    pub fn drain(rx: &mut UnboundedReceiver<Action>) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(action) = rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    pub fn spawned(actions: &[Action]) -> Vec<&TaskKind> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Spawn { task, .. } => Some(task),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spawn_tags_origin() {
        let (dispatcher, mut rx) = dispatcher(Route::Requests);
        dispatcher.spawn(TaskKind::LoadMyRequests);
        let actions = drain(&mut rx);
        assert_eq!(
            actions,
            vec![Action::Spawn {
                origin: Origin::new(Route::Requests, 1),
                task: TaskKind::LoadMyRequests,
            }]
        );
        assert_eq!(actions[0].to_string(), "Spawn");
    }

    #[test]
    fn shell_origin() {
        assert!(Origin::shell().is_shell());
        assert!(!Origin::new(Route::Login, 2).is_shell());
    }
}
