//! Runs [`TaskKind`]s off the UI task.
//!
//! The executor owns a worker that receives dispatches over an unbounded
//! channel and spawns one Tokio task per dispatch, so a slow request never
//! holds up the others. Every task reports back exactly once through
//! `Action::TaskDone`, tagged with the [`Origin`] it was issued from.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use paths::PathContext;
use pki_api::{ApiClient, CertificateFormat, Download, RegisterRequest};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action::{Action, Origin};
use crate::core::effects::{TaskError, TaskKind, TaskResult};

pub type TaskId = u64;

struct Dispatch {
    id: TaskId,
    origin: Origin,
    kind: TaskKind,
}

/// Cheap to clone: only wraps the dispatch sender.
#[derive(Clone)]
pub struct TaskExecutor {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl TaskExecutor {
    /// Starts the worker. Must be called inside a Tokio runtime.
    pub fn new(
        client: ApiClient,
        paths: PathContext,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Dispatch>();
        Worker {
            rx,
            client,
            paths,
            action_tx,
        }
        .spawn();
        Self { tx }
    }

    pub fn spawn(&self, origin: Origin, kind: TaskKind) -> TaskId {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(task = id, kind = %kind, route = %origin.route, "scheduling task");
        if let Err(e) = self.tx.send(Dispatch { id, origin, kind }) {
            warn!("task executor channel closed; dropping task: {e}");
        }
        id
    }
}

struct Worker {
    rx: mpsc::UnboundedReceiver<Dispatch>,
    client: ApiClient,
    paths: PathContext,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl Worker {
    fn spawn(mut self) {
        tokio::spawn(async move {
            while let Some(dispatch) = self.rx.recv().await {
                let client = self.client.clone();
                let paths = self.paths.clone();
                let action_tx = self.action_tx.clone();
                tokio::spawn(async move {
                    let Dispatch { id, origin, kind } = dispatch;
                    let label = kind.to_string();
                    let result = run(&client, &paths, kind).await;
                    debug!(task = id, kind = %label, result = %result, "task finished");
                    if action_tx.send(Action::TaskDone { origin, result }).is_err() {
                        debug!(task = id, "UI gone, dropping task result");
                    }
                });
            }
            info!("task executor stopped (channel closed)");
        });
    }
}

async fn run(client: &ApiClient, paths: &PathContext, kind: TaskKind) -> TaskResult {
    match kind {
        TaskKind::Hydrate => TaskResult::Hydrated(client.me().await.map_err(TaskError::from)),
        TaskKind::Login { email, password } => TaskResult::LoggedIn(
            client
                .login(email.trim(), password.expose())
                .await
                .map(|jwt| jwt.user)
                .map_err(TaskError::from),
        ),
        TaskKind::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            let request = RegisterRequest {
                email: email.trim().to_string(),
                password: password.expose().to_string(),
                first_name: first_name.trim().to_string(),
                last_name: last_name.trim().to_string(),
            };
            let outcome = async {
                let created = client.register(&request).await?;
                info!(user = %created.email, "account created");
                let jwt = client.login(&request.email, &request.password).await?;
                Ok::<_, pki_api::ApiError>(jwt.user)
            }
            .await;
            TaskResult::Registered(outcome.map_err(TaskError::from))
        }
        TaskKind::ForgotPassword { email } => TaskResult::ResetMailSent(
            client
                .forgot_password(email.trim())
                .await
                .map(|m| m.text().map(str::to_string))
                .map_err(TaskError::from),
        ),
        TaskKind::ResetPassword { token, password } => TaskResult::PasswordReset(
            client
                .reset_password(token.expose(), password.expose())
                .await
                .map(|m| m.text().map(str::to_string))
                .map_err(TaskError::from),
        ),
        TaskKind::ValidateToken { request_id, token } => TaskResult::TokenValidated(
            client
                .validate_token(&request_id, token.expose())
                .await
                .map_err(TaskError::from),
        ),

        TaskKind::LoadMyCertificates => {
            TaskResult::MyCertificates(client.my_certificates().await.map_err(TaskError::from))
        }
        TaskKind::DownloadCertificate { id, serial, format } => {
            let fallback = certificate_file_name(&serial, format);
            TaskResult::Saved(
                match client.download_certificate(&id, format).await {
                    Ok(download) => save_download(paths, download, &fallback).await,
                    Err(err) => Err(err.into()),
                },
            )
        }
        TaskKind::SubmitRequest(request) => TaskResult::RequestSubmitted(
            client
                .submit_certificate_request(request)
                .await
                .map_err(TaskError::from),
        ),
        TaskKind::LoadMyRequests => {
            TaskResult::MyRequests(client.my_requests().await.map_err(TaskError::from))
        }
        TaskKind::DownloadMyDocument {
            request_id,
            file_name,
        } => TaskResult::Saved(
            match client.download_my_document(&request_id, &file_name).await {
                Ok(download) => save_download(paths, download, &file_name).await,
                Err(err) => Err(err.into()),
            },
        ),

        TaskKind::LoadAdminDashboard => {
            TaskResult::AdminDashboard(client.admin_dashboard().await.map_err(TaskError::from))
        }
        TaskKind::LoadCaStatus => {
            TaskResult::CaStatus(client.ca_status().await.map_err(TaskError::from))
        }
        TaskKind::InitializeCa => {
            TaskResult::CaInitialized(client.initialize_ca().await.map_err(TaskError::from))
        }
        TaskKind::LoadRequests { status, page, size } => TaskResult::Requests(
            client
                .certificate_requests(status.as_ref(), page, size)
                .await
                .map_err(TaskError::from),
        ),
        TaskKind::LoadRequest { id } => {
            TaskResult::Request(client.certificate_request(&id).await.map_err(TaskError::from))
        }
        TaskKind::Approve { id, validity_days } => TaskResult::Approved(
            client
                .approve_request(&id, validity_days)
                .await
                .map_err(TaskError::from),
        ),
        TaskKind::Reject { id, reason } => TaskResult::Rejected(
            client
                .reject_request(&id, &reason)
                .await
                .map_err(TaskError::from),
        ),
        TaskKind::DownloadRequestDocument {
            request_id,
            file_name,
        } => TaskResult::Saved(
            match client
                .download_request_document(&request_id, &file_name)
                .await
            {
                Ok(download) => save_download(paths, download, &file_name).await,
                Err(err) => Err(err.into()),
            },
        ),
        TaskKind::LoadUsers { page, size } => {
            TaskResult::Users(client.users(page, size).await.map_err(TaskError::from))
        }
        TaskKind::DeleteUser { id, email } => TaskResult::UserDeleted {
            email,
            outcome: client.delete_user(&id).await.map_err(TaskError::from),
        },

        TaskKind::SaveFile { file_name, bytes } => {
            TaskResult::Saved(write_download(paths, &file_name, &bytes).await)
        }
    }
}

pub fn certificate_file_name(serial: &str, format: CertificateFormat) -> String {
    let stem = if serial.trim().is_empty() {
        "certificate".to_string()
    } else {
        format!("certificate-{}", serial.trim())
    };
    format!("{stem}.{}", format.as_str())
}

async fn save_download(
    paths: &PathContext,
    download: Download,
    fallback_name: &str,
) -> Result<PathBuf, TaskError> {
    let name = download
        .file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| fallback_name.to_string());
    write_download(paths, &name, &download.bytes).await
}

async fn write_download(
    paths: &PathContext,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, TaskError> {
    let target = paths.download_file(file_name);
    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&target, bytes).await?;
    info!(path = %target.display(), bytes = bytes.len(), "file saved");
    Ok(target)
}
