use pki_api::{
    ApiClient, ApiError, Attachment, ClientConfig, CsrSource, MemoryTokenStore,
    NewCertificateRequest, RequestStatus, Role, Subject, TokenStore, Tokens,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves exactly one HTTP request with a canned response and hands back the
/// raw request text.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            if let Some(head_end) = find(&raw, b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&raw[..head_end]).to_lowercase();
                if head.contains("transfer-encoding: chunked") {
                    if raw.ends_with(b"0\r\n\r\n") {
                        break;
                    }
                    continue;
                }
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).into_owned()
    });

    (base, handle)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn client(base: &str, store: Arc<MemoryTokenStore>) -> ApiClient {
    let config = ClientConfig {
        base_url: base.to_string(),
        timeout: Duration::from_secs(5),
    };
    ApiClient::new(&config, store).unwrap()
}

fn tokens() -> Tokens {
    Tokens {
        access_token: "tok-123".into(),
        refresh_token: "ref-456".into(),
    }
}

const USER_JSON: &str = r#"{"id":"u1","email":"awa@pki.cm","firstName":"Awa","lastName":"Mbida","role":"USER","isActive":true,"emailVerified":true,"createdAt":"2024-01-01T00:00:00"}"#;

#[tokio::test]
async fn no_authorization_header_without_token() {
    let (base, server) = serve_once("200 OK", USER_JSON).await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let user = api.me().await.unwrap();
    assert_eq!(user.email, "awa@pki.cm");

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("get /api/user/me "));
    assert!(!request.contains("authorization:"));
}

#[tokio::test]
async fn bearer_header_when_token_present() {
    let (base, server) = serve_once("200 OK", "[]").await;
    let api = client(&base, Arc::new(MemoryTokenStore::with_tokens(tokens())));

    let certificates = api.my_certificates().await.unwrap();
    assert!(certificates.is_empty());

    let request = server.await.unwrap().to_lowercase();
    assert!(request.contains("authorization: bearer tok-123"));
}

#[tokio::test]
async fn unauthorized_clears_tokens_and_notifies() {
    let (base, server) = serve_once("401 Unauthorized", "").await;
    let store = Arc::new(MemoryTokenStore::with_tokens(tokens()));
    let api = client(&base, store.clone());
    let mut signal = api.subscribe_unauthorized();

    let err = api.admin_dashboard().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(store.load(), None);
    assert!(signal.try_recv().is_ok());
    server.await.unwrap();
}

#[tokio::test]
async fn rejected_login_keeps_backend_message() {
    let (base, server) = serve_once(
        "401 Unauthorized",
        r#"{"message":"Identifiants invalides"}"#,
    )
    .await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let err = api.login("awa@pki.cm", "wrong-pass").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message("Erreur"), "Identifiants invalides");
    server.await.unwrap();
}

#[tokio::test]
async fn backend_message_is_surfaced() {
    let (base, server) = serve_once(
        "400 Bad Request",
        r#"{"message":"Cet email est déjà utilisé"}"#,
    )
    .await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let err = api
        .register(&pki_api::RegisterRequest {
            email: "awa@pki.cm".into(),
            password: "secret123".into(),
            first_name: "Awa".into(),
            last_name: "Mbida".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Erreur"), "Cet email est déjà utilisé");

    let request = server.await.unwrap();
    assert!(request.contains(r#""firstName":"Awa""#));
}

#[tokio::test]
async fn backend_error_field_is_used_when_message_missing() {
    let (base, server) = serve_once("403 Forbidden", r#"{"error":"Accès refusé"}"#).await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let err = api.ca_status().await.unwrap_err();
    match &err {
        ApiError::Status { status, message } => {
            assert_eq!(*status, 403);
            assert_eq!(message.as_deref(), Some("Accès refusé"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn empty_error_body_uses_fallback() {
    let (base, server) = serve_once("500 Internal Server Error", "").await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let err = api.delete_user("u2").await.unwrap_err();
    assert_eq!(err.user_message("Suppression impossible"), "Suppression impossible");
    server.await.unwrap();
}

#[tokio::test]
async fn login_persists_tokens() {
    let body = format!(
        r#"{{"accessToken":"a1","refreshToken":"r1","tokenType":"Bearer","expiresIn":3600,"user":{USER_JSON}}}"#
    );
    let (base, server) = serve_once("200 OK", &body).await;
    let store = Arc::new(MemoryTokenStore::new());
    let api = client(&base, store.clone());

    let jwt = api.login("awa@pki.cm", "secret123").await.unwrap();
    assert_eq!(jwt.user.role, Role::User);
    assert_eq!(
        store.load(),
        Some(Tokens {
            access_token: "a1".into(),
            refresh_token: "r1".into()
        })
    );

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/auth/login "));
    assert!(request.contains(r#""email":"awa@pki.cm""#));
}

#[tokio::test]
async fn admin_listing_omits_status_for_all() {
    let page = r#"{"items":[],"total":0,"page":0,"size":10,"totalPages":0}"#;
    let (base, server) = serve_once("200 OK", page).await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let paged = api.certificate_requests(None, 0, 10).await.unwrap();
    assert_eq!(paged.total_pages, 0);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/admin/certificate-requests?page=0&size=10 "));
}

#[tokio::test]
async fn admin_listing_filters_by_status() {
    let page = r#"{"items":[{"id":"r1","commonName":"cn","email":"e@pki.cm","status":"PENDING"}],"total":1,"page":0,"size":5,"totalPages":1}"#;
    let (base, server) = serve_once("200 OK", page).await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let paged = api
        .certificate_requests(Some(&RequestStatus::Pending), 0, 5)
        .await
        .unwrap();
    assert_eq!(paged.items[0].status, RequestStatus::Pending);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/admin/certificate-requests?status=PENDING&page=0&size=5 "));
}

#[tokio::test]
async fn approve_sends_validity_days() {
    let (base, server) = serve_once("200 OK", r#"{"certificate":"-----BEGIN CERTIFICATE-----"}"#).await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()));

    let approval = api.approve_request("r9", 730).await.unwrap();
    assert_eq!(approval.certificate.as_deref(), Some("-----BEGIN CERTIFICATE-----"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/admin/certificate-requests/r9/approve?validityDays=730 "));
}

#[tokio::test]
async fn validate_token_passes_token_as_query() {
    let body = r#"{"certificateId":"c7","certificate":"PEM","fingerprint":"AB:CD"}"#;
    let (base, server) = serve_once("200 OK", body).await;
    let api = client(&base, Arc::new(MemoryTokenStore::with_tokens(tokens())));

    let issued = api.validate_token("r3", "abc def").await.unwrap();
    assert_eq!(issued.certificate_id, "c7");

    let request = server.await.unwrap();
    assert!(request.starts_with(
        "POST /api/user/certificate-requests/r3/validate-token?token=abc+def "
    ));
}

#[tokio::test]
async fn submission_is_multipart_with_expected_fields() {
    let body = r#"{"id":"r1","commonName":"Awa Mbida","email":"awa@pki.cm","status":"PENDING"}"#;
    let (base, server) = serve_once("201 Created", body).await;
    let api = client(&base, Arc::new(MemoryTokenStore::with_tokens(tokens())));

    let request = NewCertificateRequest {
        subject: Subject {
            common_name: "Awa Mbida".into(),
            organization: "MINPOSTEL".into(),
            locality: "Yaoundé".into(),
            country: "CM".into(),
            email: "awa@pki.cm".into(),
            ..Subject::default()
        },
        csr: CsrSource::Text("-----BEGIN CERTIFICATE REQUEST-----".into()),
        documents: vec![Attachment {
            file_name: "cni.pdf".into(),
            mime: "application/pdf".into(),
            bytes: b"%PDF-1.4".to_vec(),
        }],
    };
    let created = api.submit_certificate_request(request).await.unwrap();
    assert_eq!(created.status, RequestStatus::Pending);

    let raw = server.await.unwrap();
    assert!(raw.to_lowercase().contains("content-type: multipart/form-data; boundary="));
    for field in ["commonName", "organization", "locality", "country", "email", "csr"] {
        assert!(raw.contains(&format!("name=\"{field}\"")), "missing {field}");
    }
    assert!(raw.contains("name=\"documents\"; filename=\"cni.pdf\""));
    assert!(!raw.contains("name=\"csrFile\""));
}

#[tokio::test]
async fn document_download_keeps_bytes_and_encodes_name() {
    let (base, server) = serve_once("200 OK", "%PDF").await;
    let api = client(&base, Arc::new(MemoryTokenStore::with_tokens(tokens())));

    let download = api
        .download_request_document("r1", "pièce 1.pdf")
        .await
        .unwrap();
    assert_eq!(download.bytes, b"%PDF".to_vec());
    assert_eq!(download.file_name, None);

    let request = server.await.unwrap();
    assert!(request.starts_with(
        "GET /api/admin/certificate-requests/r1/documents/pi%C3%A8ce%201.pdf "
    ));
}
