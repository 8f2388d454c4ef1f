use crate::error::ApiError;
use crate::models::*;
use crate::token_store::{TokenStore, Tokens};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Client for the PKI backend.
///
/// Cloning is cheap; clones share the connection pool, the token store and
/// the unauthorized channel.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    unauthorized: broadcast::Sender<()>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|_| ApiError::InvalidBaseUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        let (unauthorized, _) = broadcast::channel(8);
        Ok(Self {
            http,
            base_url,
            tokens,
            unauthorized,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn has_session_token(&self) -> bool {
        self.tokens.access_token().is_some()
    }

    /// Fires once per `401` response, after the tokens were cleared.
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<()> {
        self.unauthorized.subscribe()
    }

    /// Forgets the persisted session.
    pub fn clear_session(&self) -> Result<(), ApiError> {
        self.tokens.clear()?;
        Ok(())
    }

    // ---- auth ----

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let req = self.request(Method::POST, &["auth", "register"])?.json(request);
        self.send_json(req).await
    }

    /// Logs in and persists the returned token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<JwtResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let req = self.request(Method::POST, &["auth", "login"])?.json(&body);
        let jwt: JwtResponse = self.send_json(req).await?;
        self.tokens.save(&Tokens {
            access_token: jwt.access_token.clone(),
            refresh_token: jwt.refresh_token.clone(),
        })?;
        tracing::info!(user = %jwt.user.email, role = %jwt.user.role, "logged in");
        Ok(jwt)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let req = self
            .request(Method::POST, &["auth", "forgot-password"])?
            .json(&serde_json::json!({ "email": email }));
        self.send_json_or_default(req).await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let req = self
            .request(Method::POST, &["auth", "reset-password"])?
            .json(&serde_json::json!({ "token": token, "password": password }));
        self.send_json_or_default(req).await
    }

    // ---- user ----

    pub async fn me(&self) -> Result<User, ApiError> {
        let req = self.request(Method::GET, &["user", "me"])?;
        self.send_json(req).await
    }

    pub async fn my_certificates(&self) -> Result<Vec<Certificate>, ApiError> {
        let req = self.request(Method::GET, &["user", "certificates"])?;
        self.send_json(req).await
    }

    pub async fn download_certificate(
        &self,
        certificate_id: &str,
        format: CertificateFormat,
    ) -> Result<Download, ApiError> {
        let req = self
            .request(
                Method::GET,
                &["user", "certificates", certificate_id, "download"],
            )?
            .query(&[("format", format.as_str())]);
        self.send_download(req).await
    }

    pub async fn submit_certificate_request(
        &self,
        request: NewCertificateRequest,
    ) -> Result<CertificateRequest, ApiError> {
        let form = certificate_request_form(request)?;
        let req = self
            .request(Method::POST, &["user", "certificate-requests"])?
            .multipart(form);
        self.send_json(req).await
    }

    pub async fn my_requests(&self) -> Result<Vec<CertificateRequest>, ApiError> {
        let req = self.request(Method::GET, &["user", "certificate-requests"])?;
        self.send_json(req).await
    }

    pub async fn download_my_document(
        &self,
        request_id: &str,
        file_name: &str,
    ) -> Result<Download, ApiError> {
        let req = self.request(
            Method::GET,
            &["user", "certificate-requests", request_id, "documents", file_name],
        )?;
        self.send_download(req).await
    }

    pub async fn validate_token(
        &self,
        request_id: &str,
        token: &str,
    ) -> Result<IssuedCertificate, ApiError> {
        let req = self
            .request(
                Method::POST,
                &["user", "certificate-requests", request_id, "validate-token"],
            )?
            .query(&[("token", token)]);
        self.send_json(req).await
    }

    // ---- admin ----

    pub async fn admin_dashboard(&self) -> Result<DashboardData, ApiError> {
        let req = self.request(Method::GET, &["admin", "dashboard"])?;
        self.send_json(req).await
    }

    pub async fn initialize_ca(&self) -> Result<CaStatus, ApiError> {
        let req = self.request(Method::POST, &["admin", "ca", "initialize"])?;
        self.send_json(req).await
    }

    pub async fn ca_status(&self) -> Result<CaStatus, ApiError> {
        let req = self.request(Method::GET, &["admin", "ca", "status"])?;
        self.send_json(req).await
    }

    /// `status: None` lists every status.
    pub async fn certificate_requests(
        &self,
        status: Option<&RequestStatus>,
        page: u32,
        size: u32,
    ) -> Result<Paged<CertificateRequest>, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::with_capacity(3);
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        query.push(("page", page.to_string()));
        query.push(("size", size.to_string()));

        let req = self
            .request(Method::GET, &["admin", "certificate-requests"])?
            .query(&query);
        self.send_json(req).await
    }

    pub async fn certificate_request(&self, id: &str) -> Result<CertificateRequest, ApiError> {
        let req = self.request(Method::GET, &["admin", "certificate-requests", id])?;
        self.send_json(req).await
    }

    pub async fn approve_request(
        &self,
        id: &str,
        validity_days: u32,
    ) -> Result<ApprovalResponse, ApiError> {
        let req = self
            .request(
                Method::POST,
                &["admin", "certificate-requests", id, "approve"],
            )?
            .query(&[("validityDays", validity_days)]);
        self.send_json_or_default(req).await
    }

    pub async fn reject_request(&self, id: &str, reason: &str) -> Result<(), ApiError> {
        let mut req = self.request(
            Method::POST,
            &["admin", "certificate-requests", id, "reject"],
        )?;
        if !reason.trim().is_empty() {
            req = req.query(&[("reason", reason)]);
        }
        self.execute(req).await?;
        Ok(())
    }

    pub async fn download_request_document(
        &self,
        request_id: &str,
        file_name: &str,
    ) -> Result<Download, ApiError> {
        let req = self.request(
            Method::GET,
            &["admin", "certificate-requests", request_id, "documents", file_name],
        )?;
        self.send_download(req).await
    }

    pub async fn users(&self, page: u32, size: u32) -> Result<Paged<User>, ApiError> {
        let req = self
            .request(Method::GET, &["admin", "users"])?
            .query(&[("page", page), ("size", size)]);
        self.send_json(req).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, &["admin", "users", id])?;
        self.execute(req).await?;
        Ok(())
    }

    // ---- plumbing ----

    /// Builds `<base>/<segments…>`; every segment is percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.url(segments)?;
        let req = self.http.request(method, url);
        Ok(match self.tokens.access_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let response = req.send().await?;
        let status = response.status();
        tracing::debug!(url = %response.url(), %status, "backend response");

        if status == StatusCode::UNAUTHORIZED {
            if let Err(err) = self.tokens.clear() {
                tracing::error!(%err, "failed to clear session tokens after 401");
            }
            // no receivers is fine
            let _ = self.unauthorized.send(());
            tracing::warn!(url = %response.url(), "unauthorized, session cleared");
            let message = error_message(response).await;
            return Err(ApiError::Unauthorized { message });
        }

        if !status.is_success() {
            let message = error_message(response).await;
            tracing::warn!(%status, message = message.as_deref().unwrap_or(""), "backend error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(req).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Like [`Self::send_json`], but an empty body yields `T::default()`.
    async fn send_json_or_default<T: DeserializeOwned + Default>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(req).await?;
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_download(&self, req: RequestBuilder) -> Result<Download, ApiError> {
        let response = self.execute(req).await?;
        let file_name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download { file_name, bytes })
    }
}

/// The `message` or `error` field of an error body, if it has one.
async fn error_message(response: Response) -> Option<String> {
    let body = response.bytes().await.ok()?;
    serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
}

fn certificate_request_form(request: NewCertificateRequest) -> Result<Form, ApiError> {
    let NewCertificateRequest {
        subject,
        csr,
        documents,
    } = request;

    let mut form = Form::new()
        .text("commonName", subject.common_name)
        .text("organization", subject.organization)
        .text("organizationalUnit", subject.organizational_unit)
        .text("locality", subject.locality)
        .text("state", subject.state)
        .text("country", subject.country)
        .text("email", subject.email);

    form = match csr {
        CsrSource::Text(pem) => form.text("csr", pem),
        CsrSource::File(file) => form.part("csrFile", file_part(file)?),
    };

    for document in documents {
        form = form.part("documents", file_part(document)?);
    }
    Ok(form)
}

fn file_part(file: Attachment) -> Result<Part, ApiError> {
    Ok(Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.mime)?)
}

/// Parameters of a `Content-Disposition` value after the disposition type.
/// Keys are lower-cased; quoted strings are unescaped and may hold `;`.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let Some((_, mut rest)) = value.split_once(';') else {
        return params;
    };
    loop {
        rest = rest.trim_start_matches([' ', '\t', ';']);
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        // a bare token without `=`
        if let Some(pos) = key.find(';') {
            rest = &rest[pos + 1..];
            continue;
        }
        let after = after.trim_start();
        let (param, remaining) = match after.strip_prefix('"') {
            Some(quoted) => {
                let mut param = String::new();
                let mut end = quoted.len();
                let mut chars = quoted.char_indices();
                while let Some((i, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                param.push(escaped);
                            }
                        }
                        '"' => {
                            end = i + 1;
                            break;
                        }
                        _ => param.push(c),
                    }
                }
                (param, &quoted[end..])
            }
            None => {
                let end = after.find(';').unwrap_or(after.len());
                (after[..end].trim().to_string(), &after[end..])
            }
        };
        params.push((key.trim().to_ascii_lowercase(), param));
        rest = remaining;
    }
    params
}

/// `attachment; filename="x.pem"` → `x.pem`. An RFC 5987 `filename*`
/// wins over the plain one.
fn disposition_file_name(value: &str) -> Option<String> {
    let params = disposition_params(value);
    let find = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, v)| v.as_str())
    };
    let extended = find("filename*").and_then(|v| {
        // charset'language'value
        let encoded = v.splitn(3, '\'').nth(2)?;
        Some(String::from_utf8_lossy(&urlencoding::decode_binary(encoded.as_bytes())).into_owned())
    });
    extended
        .or_else(|| find("filename").map(str::to_string))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;
    use pretty_assertions::assert_eq;

    fn client(base: &str) -> ApiClient {
        let config = ClientConfig {
            base_url: base.to_string(),
            ..ClientConfig::default()
        };
        ApiClient::new(&config, Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[test]
    fn url_encodes_document_names() {
        let client = client("http://localhost:8080/api/");
        let url = client
            .url(&["user", "certificate-requests", "42", "documents", "carte identité.pdf"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/user/certificate-requests/42/documents/carte%20identit%C3%A9.pdf"
        );
    }

    #[test]
    fn url_keeps_slashes_inside_a_segment_encoded() {
        let client = client("http://localhost:8080/api");
        let url = client.url(&["documents", "a/b.pdf"]).unwrap();
        assert_eq!(url.path(), "/api/documents/a%2Fb.pdf");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let config = ClientConfig {
            base_url: "mailto:admin@pki.cm".into(),
            ..ClientConfig::default()
        };
        let err = ApiClient::new(&config, Arc::new(MemoryTokenStore::new())).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
    }

    #[test]
    fn disposition_parsing() {
        assert_eq!(
            disposition_file_name(r#"attachment; filename="cert-1.pem""#).as_deref(),
            Some("cert-1.pem")
        );
        assert_eq!(disposition_file_name("inline").as_deref(), None);
        assert_eq!(
            disposition_file_name("attachment; filename=req-7.csr").as_deref(),
            Some("req-7.csr")
        );
    }

    #[test]
    fn quoted_file_name_keeps_semicolons_and_escapes() {
        assert_eq!(
            disposition_file_name(r#"attachment; filename="cni;recto.pdf""#).as_deref(),
            Some("cni;recto.pdf")
        );
        assert_eq!(
            disposition_file_name(r#"attachment; filename="dit \"oui\".pdf"; size=12"#).as_deref(),
            Some(r#"dit "oui".pdf"#)
        );
    }

    #[test]
    fn extended_file_name_wins() {
        assert_eq!(
            disposition_file_name(
                "attachment; filename=\"carte.pdf\"; filename*=UTF-8''carte%20identit%C3%A9.pdf"
            )
            .as_deref(),
            Some("carte identité.pdf")
        );
    }
}
