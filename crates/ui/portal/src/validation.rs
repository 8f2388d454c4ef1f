//! Client-side checks that run before any request leaves the portal.

use std::sync::LazyLock;

use pki_api::{Attachment, Subject};
use regex::Regex;
use thiserror::Error;

/// Largest CSR file accepted, in bytes.
pub const CSR_FILE_MAX_BYTES: u64 = 200 * 1024;
/// Supporting documents per request.
pub const MAX_DOCUMENTS: usize = 5;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("country pattern"));
static CSR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.pem$|\.csr$").expect("csr name pattern"));
static DOCUMENT_MIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pdf|png|jpe?g").expect("document mime pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Le Common Name (CN) est requis")]
    CommonNameRequired,
    #[error("L'organisation (O) est requise")]
    OrganizationRequired,
    #[error("La ville (L) est requise")]
    LocalityRequired,
    #[error("Le pays (C) doit être un code ISO 2 lettres")]
    InvalidCountry,
    #[error("Un email valide est requis")]
    InvalidEmail,
    #[error("Un CSR (texte ou fichier) est requis pour soumettre la demande.")]
    CsrMissing,
    #[error("Fichier CSR trop volumineux (>200KB)")]
    CsrFileTooLarge,
    #[error("Type de fichier CSR non pris en charge")]
    CsrFileType,
    #[error("Seuls les fichiers PDF, PNG et JPEG sont acceptés")]
    DocumentType,
    #[error("5 justificatifs au maximum")]
    TooManyDocuments,
    #[error("Impossible de lire le fichier : {0}")]
    Unreadable(String),
    #[error("Le prénom est requis")]
    FirstNameRequired,
    #[error("Le nom est requis")]
    LastNameRequired,
    #[error("Le mot de passe est requis")]
    PasswordRequired,
    #[error("Le mot de passe doit contenir au moins 8 caractères")]
    PasswordTooShort,
    #[error("Les mots de passe ne correspondent pas")]
    PasswordMismatch,
    #[error("La durée de validité doit être un entier positif")]
    InvalidValidityDays,
    #[error("Lien de réinitialisation invalide ou expiré")]
    ResetTokenMissing,
    #[error("Paramètres manquants : requestId ou token")]
    ValidationParamsMissing,
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    Ok(())
}

pub fn validate_registration(
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationError> {
    if first_name.trim().is_empty() {
        return Err(ValidationError::FirstNameRequired);
    }
    if last_name.trim().is_empty() {
        return Err(ValidationError::LastNameRequired);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    validate_password(password)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    validate_password(password)?;
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Checks the subject fields in form order and reports the first failure.
pub fn validate_subject(subject: &Subject) -> Result<(), ValidationError> {
    if subject.common_name.trim().is_empty() {
        return Err(ValidationError::CommonNameRequired);
    }
    if subject.organization.trim().is_empty() {
        return Err(ValidationError::OrganizationRequired);
    }
    if subject.locality.trim().is_empty() {
        return Err(ValidationError::LocalityRequired);
    }
    if !COUNTRY.is_match(subject.country.trim()) {
        return Err(ValidationError::InvalidCountry);
    }
    if !is_valid_email(&subject.email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Upper-cases the country code and keeps at most two characters.
pub fn normalize_country(value: &str) -> String {
    value.chars().take(2).collect::<String>().to_uppercase()
}

/// A CSR file must be small and look like PEM text.
pub fn check_csr_file(file_name: &str, mime: &str, size: u64) -> Result<(), ValidationError> {
    if size > CSR_FILE_MAX_BYTES {
        return Err(ValidationError::CsrFileTooLarge);
    }
    let by_name = CSR_NAME.is_match(&file_name.to_ascii_lowercase());
    let by_type = mime.starts_with("text/") || mime == "application/x-pem-file";
    if by_name || by_type {
        Ok(())
    } else {
        Err(ValidationError::CsrFileType)
    }
}

pub fn is_supported_document(file_name: &str, mime: &str) -> bool {
    DOCUMENT_MIME.is_match(mime) || file_name.to_ascii_lowercase().ends_with(".pdf")
}

/// Appends the supported files of `incoming` to `documents`, keeping at most
/// [`MAX_DOCUMENTS`]. Returns how many files were left out.
pub fn merge_documents(documents: &mut Vec<Attachment>, incoming: Vec<Attachment>) -> usize {
    let offered = incoming.len();
    let room = MAX_DOCUMENTS.saturating_sub(documents.len());
    let accepted: Vec<Attachment> = incoming
        .into_iter()
        .filter(|a| is_supported_document(&a.file_name, &a.mime))
        .take(room)
        .collect();
    let skipped = offered - accepted.len();
    documents.extend(accepted);
    skipped
}

pub fn parse_validity_days(value: &str) -> Result<u32, ValidationError> {
    match value.trim().parse::<u32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ValidationError::InvalidValidityDays),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn subject() -> Subject {
        Subject {
            common_name: "Awa Mbida".into(),
            organization: "MINPOSTEL".into(),
            organizational_unit: String::new(),
            locality: "Yaoundé".into(),
            state: String::new(),
            country: "CM".into(),
            email: "awa@pki.cm".into(),
        }
    }

    fn file(name: &str) -> Attachment {
        Attachment {
            file_name: name.into(),
            mime: pki_api::mime_for(name).into(),
            bytes: vec![0; 4],
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.cm"));
        assert!(is_valid_email("  a@b.cm "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.cm"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn subject_reports_first_missing_field() {
        assert_eq!(validate_subject(&subject()), Ok(()));

        let mut s = subject();
        s.common_name = " ".into();
        s.locality.clear();
        assert_eq!(validate_subject(&s), Err(ValidationError::CommonNameRequired));

        let mut s = subject();
        s.organization.clear();
        assert_eq!(validate_subject(&s), Err(ValidationError::OrganizationRequired));

        let mut s = subject();
        s.locality.clear();
        assert_eq!(validate_subject(&s), Err(ValidationError::LocalityRequired));

        for bad in ["", "C", "CMR", "C1"] {
            let mut s = subject();
            s.country = bad.into();
            assert_eq!(validate_subject(&s), Err(ValidationError::InvalidCountry), "{bad}");
        }

        let mut s = subject();
        s.email = "nope".into();
        assert_eq!(validate_subject(&s), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn country_is_upper_cased_and_truncated() {
        assert_eq!(normalize_country("cm"), "CM");
        assert_eq!(normalize_country("fra"), "FR");
    }

    #[test]
    fn csr_file_checks() {
        assert_eq!(check_csr_file("req.pem", "application/x-pem-file", 1024), Ok(()));
        assert_eq!(check_csr_file("REQ.CSR", "application/pkcs10", 10), Ok(()));
        assert_eq!(check_csr_file("notes", "text/plain", 10), Ok(()));
        assert_eq!(
            check_csr_file("req.pem", "application/x-pem-file", CSR_FILE_MAX_BYTES + 1),
            Err(ValidationError::CsrFileTooLarge)
        );
        assert_eq!(
            check_csr_file("photo.png", "image/png", 10),
            Err(ValidationError::CsrFileType)
        );
        assert_eq!(
            check_csr_file("req.pem", "", CSR_FILE_MAX_BYTES),
            Ok(())
        );
    }

    #[test]
    fn documents_are_filtered_and_capped() {
        let mut docs = vec![file("cni.pdf"), file("photo.png")];
        let skipped = merge_documents(
            &mut docs,
            vec![
                file("a.jpg"),
                file("script.sh"),
                file("b.jpeg"),
                file("c.pdf"),
                file("d.png"),
            ],
        );
        assert_eq!(docs.len(), MAX_DOCUMENTS);
        assert_eq!(skipped, 2);
        assert!(docs.iter().all(|d| d.file_name != "script.sh"));
        assert_eq!(docs[4].file_name, "c.pdf");

        assert_eq!(merge_documents(&mut docs, vec![file("e.pdf")]), 1);
        assert_eq!(docs.len(), MAX_DOCUMENTS);
    }

    #[test]
    fn passwords() {
        assert_eq!(validate_password(""), Err(ValidationError::PasswordRequired));
        assert_eq!(validate_password("short"), Err(ValidationError::PasswordTooShort));
        assert_eq!(
            validate_new_password("longenough", "longenougH"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(validate_new_password("longenough", "longenough"), Ok(()));
    }

    #[test]
    fn registration_and_login() {
        assert_eq!(
            validate_registration("", "Mbida", "a@b.cm", "password1"),
            Err(ValidationError::FirstNameRequired)
        );
        assert_eq!(
            validate_registration("Awa", "", "a@b.cm", "password1"),
            Err(ValidationError::LastNameRequired)
        );
        assert_eq!(validate_registration("Awa", "Mbida", "a@b.cm", "password1"), Ok(()));
        assert_eq!(validate_login("a@b.cm", ""), Err(ValidationError::PasswordRequired));
        assert_eq!(validate_login("", "x"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn validity_days_must_be_positive() {
        assert_eq!(parse_validity_days(" 730 "), Ok(730));
        assert_eq!(parse_validity_days("0"), Err(ValidationError::InvalidValidityDays));
        assert_eq!(parse_validity_days("-5"), Err(ValidationError::InvalidValidityDays));
        assert_eq!(parse_validity_days("un an"), Err(ValidationError::InvalidValidityDays));
    }
}
