//! Wire types. Field names follow the backend JSON (`camelCase`).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default, rename = "subjectDN")]
    pub subject_dn: String,
    #[serde(default, rename = "issuerDN")]
    pub issuer_dn: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub not_before: String,
    #[serde(default)]
    pub not_after: String,
    #[serde(default)]
    pub certificate_pem: String,
}

/// Lifecycle of a certificate request. Values the client does not know are
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Pending,
    Issued,
    Rejected,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Issued => "ISSUED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Other(other) => other,
        }
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => RequestStatus::Pending,
            "ISSUED" => RequestStatus::Issued,
            "REJECTED" => RequestStatus::Rejected,
            _ => RequestStatus::Other(value),
        }
    }
}

impl From<RequestStatus> for String {
    fn from(value: RequestStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_full_name: Option<String>,
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub organizational_unit: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub csr_content: Option<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    pub status: RequestStatus,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

impl CertificateRequest {
    /// Best available label for the requester.
    pub fn requester(&self) -> &str {
        self.user_full_name
            .as_deref()
            .or(self.user_email.as_deref())
            .or(self.user_id.as_deref())
            .unwrap_or("-")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaStatus {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_initialized: bool,
    #[serde(default)]
    pub ca_name: Option<String>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub days_until_expiration: Option<i64>,
    #[serde(default, rename = "subjectDN")]
    pub subject_dn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub pending_requests: u64,
    #[serde(default)]
    pub active_certificates: u64,
    #[serde(default)]
    pub revoked_certificates: u64,
    #[serde(default)]
    pub ca_status: CaStatus,
}

/// One page of a server-side paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApprovalResponse {
    #[serde(default)]
    pub certificate: Option<String>,
}

/// Certificate handed out after a successful token validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCertificate {
    pub certificate_id: String,
    pub certificate: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Subject fields of a certificate request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub common_name: String,
    pub organization: String,
    pub organizational_unit: String,
    pub locality: String,
    pub state: String,
    pub country: String,
    pub email: String,
}

/// A file read from disk for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self {
            mime: mime_for(&file_name).to_string(),
            file_name,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Content type guessed from the file extension.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pem" => "application/x-pem-file",
        "csr" => "application/pkcs10",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Where the CSR of a request comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrSource {
    Text(String),
    File(Attachment),
}

/// Everything `POST /user/certificate-requests` sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificateRequest {
    pub subject: Subject,
    pub csr: CsrSource,
    pub documents: Vec<Attachment>,
}

/// Output encoding for certificate downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateFormat {
    Pem,
    Crt,
}

impl CertificateFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            CertificateFormat::Pem => "pem",
            CertificateFormat::Crt => "crt",
        }
    }
}

/// Raw file returned by a download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// From `Content-Disposition`, when the backend sent one.
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_decodes_backend_json() {
        let json = r#"{
            "id": "9b1f",
            "email": "a@b.cm",
            "firstName": "Awa",
            "lastName": "Mbida",
            "role": "ADMIN",
            "isActive": true,
            "emailVerified": false,
            "createdAt": "2024-03-01T10:00:00"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.full_name(), "Awa Mbida");
        assert_eq!(user.last_login, None);
    }

    #[test]
    fn unknown_request_status_is_kept() {
        let json = r#"{"id":"1","commonName":"cn","email":"e@x.cm","status":"REVOKED"}"#;
        let req: CertificateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.status, RequestStatus::Other("REVOKED".into()));
        assert_eq!(req.status.to_string(), "REVOKED");
        assert_eq!(req.requester(), "-");
        assert!(req.documents.is_empty());
    }

    #[test]
    fn dn_fields_use_backend_spelling() {
        let json = r#"{"id":"c1","subjectDN":"CN=x","issuerDN":"CN=ca","status":"ACTIVE"}"#;
        let cert: Certificate = serde_json::from_str(json).unwrap();
        assert_eq!(cert.subject_dn, "CN=x");
        assert_eq!(cert.issuer_dn, "CN=ca");
    }

    #[test]
    fn mime_guess_is_case_insensitive() {
        assert_eq!(mime_for("scan.PDF"), "application/pdf");
        assert_eq!(mime_for("photo.JpEg"), "image/jpeg");
        assert_eq!(mime_for("request.csr"), "application/pkcs10");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
