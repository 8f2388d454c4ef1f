//! Concrete modal dialogs. Shared helpers live in `components/popup.rs`.

pub mod confirm;
pub mod input;
pub mod pem_viewer;

pub use confirm::ConfirmPopup;
pub use input::{InputPopup, Validator};
pub use pem_viewer::PemViewer;

use crate::action::{InputRule, PopupRequest};
use crate::components::PopupComponent;
use crate::validation::parse_validity_days;

/// Builds the popup described by `request`.
pub fn build(request: PopupRequest) -> Box<dyn PopupComponent> {
    match request {
        PopupRequest::Confirm {
            id,
            title,
            question,
        } => Box::new(ConfirmPopup::new(id, title, question)),
        PopupRequest::Input {
            id,
            title,
            label,
            initial,
            rule,
        } => Box::new(InputPopup::new(id, title, label, initial, validator(rule))),
        PopupRequest::Pem {
            title,
            file_name,
            pem,
        } => Box::new(PemViewer::new(title, file_name, pem)),
    }
}

fn validator(rule: InputRule) -> Option<Validator> {
    match rule {
        InputRule::Any => None,
        InputRule::PositiveInteger => Some(Box::new(|value: &str| {
            parse_validity_days(value)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })),
    }
}
