//! REST client for the PKI Souverain backend.
//!
//! [`ApiClient`] wraps every endpoint the portal uses, attaches the bearer
//! token from a [`TokenStore`] and turns `401` responses into a session reset.

pub mod client;
pub mod error;
pub mod models;
pub mod token_store;

pub use client::{ApiClient, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, TokenStoreError};
pub use models::*;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, Tokens};
