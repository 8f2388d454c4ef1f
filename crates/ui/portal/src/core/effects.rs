//! Background work the UI asks for, and what comes back.
//!
//! A [`TaskKind`] carries everything its task needs, so the executor never
//! reaches into UI state. Every finished task comes back as exactly one
//! [`TaskResult`].

use std::{fmt, path::PathBuf};

use pki_api::{
    ApiError, ApprovalResponse, CaStatus, Certificate, CertificateFormat, CertificateRequest,
    DashboardData, IssuedCertificate, NewCertificateRequest, Paged, RequestStatus, User,
};
use strum::Display;

/// A string that never shows up in logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum TaskKind {
    /// `GET /user/me` with the persisted token.
    Hydrate,
    Login {
        email: String,
        password: Secret,
    },
    /// Registers, then logs in with the same credentials.
    Register {
        first_name: String,
        last_name: String,
        email: String,
        password: Secret,
    },
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        token: Secret,
        password: Secret,
    },
    ValidateToken {
        request_id: String,
        token: Secret,
    },

    LoadMyCertificates,
    DownloadCertificate {
        id: String,
        serial: String,
        format: CertificateFormat,
    },
    SubmitRequest(NewCertificateRequest),
    LoadMyRequests,
    DownloadMyDocument {
        request_id: String,
        file_name: String,
    },

    LoadAdminDashboard,
    LoadCaStatus,
    InitializeCa,
    LoadRequests {
        status: Option<RequestStatus>,
        page: u32,
        size: u32,
    },
    LoadRequest {
        id: String,
    },
    Approve {
        id: String,
        validity_days: u32,
    },
    Reject {
        id: String,
        reason: String,
    },
    DownloadRequestDocument {
        request_id: String,
        file_name: String,
    },
    LoadUsers {
        page: u32,
        size: u32,
    },
    DeleteUser {
        id: String,
        email: String,
    },

    /// Writes bytes into the downloads directory.
    SaveFile {
        file_name: String,
        bytes: Vec<u8>,
    },
}

/// Failure of a task, flattened so it can travel inside an `Action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub unauthorized: bool,
    pub status: Option<u16>,
    /// Text supplied by the backend, when there was some.
    pub message: Option<String>,
    /// Technical description for the log.
    pub detail: String,
}

impl TaskError {
    pub fn unauthorized() -> Self {
        Self::from(ApiError::Unauthorized { message: None })
    }

    pub fn user_message(&self, fallback: &str) -> String {
        match &self.message {
            Some(message) if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for TaskError {}

impl From<ApiError> for TaskError {
    fn from(err: ApiError) -> Self {
        let message = match &err {
            ApiError::Status { message, .. } | ApiError::Unauthorized { message } => {
                message.clone()
            }
            _ => None,
        };
        Self {
            unauthorized: err.is_unauthorized(),
            status: err.status(),
            message,
            detail: err.to_string(),
        }
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        Self {
            unauthorized: false,
            status: None,
            message: None,
            detail: err.to_string(),
        }
    }
}

pub type TaskOutcome<T> = Result<T, TaskError>;

#[derive(Debug, Clone, PartialEq, Display)]
pub enum TaskResult {
    Hydrated(TaskOutcome<User>),
    LoggedIn(TaskOutcome<User>),
    Registered(TaskOutcome<User>),
    /// Backend acknowledgement text, when it sent one.
    ResetMailSent(TaskOutcome<Option<String>>),
    PasswordReset(TaskOutcome<Option<String>>),
    TokenValidated(TaskOutcome<IssuedCertificate>),

    MyCertificates(TaskOutcome<Vec<Certificate>>),
    RequestSubmitted(TaskOutcome<CertificateRequest>),
    MyRequests(TaskOutcome<Vec<CertificateRequest>>),

    AdminDashboard(TaskOutcome<DashboardData>),
    CaStatus(TaskOutcome<CaStatus>),
    CaInitialized(TaskOutcome<CaStatus>),
    Requests(TaskOutcome<Paged<CertificateRequest>>),
    Request(TaskOutcome<CertificateRequest>),
    Approved(TaskOutcome<ApprovalResponse>),
    Rejected(TaskOutcome<()>),
    Users(TaskOutcome<Paged<User>>),
    UserDeleted {
        email: String,
        outcome: TaskOutcome<()>,
    },

    /// A download or save finished; `Ok` holds the written path.
    Saved(TaskOutcome<PathBuf>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let task = TaskKind::Login {
            email: "a@b.cm".into(),
            password: Secret::new("hunter22"),
        };
        let debug = format!("{task:?}");
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("a@b.cm"));
        assert_eq!(task.to_string(), "Login");
    }

    #[test]
    fn task_error_keeps_backend_message() {
        let err = TaskError::from(ApiError::Status {
            status: 409,
            message: Some("Email déjà utilisé".into()),
        });
        assert_eq!(err.status, Some(409));
        assert_eq!(err.user_message("fallback"), "Email déjà utilisé");

        let err = TaskError::unauthorized();
        assert!(err.unauthorized);
        assert_eq!(
            err.user_message("Email ou mot de passe invalide"),
            "Email ou mot de passe invalide"
        );
    }
}
