//! Authenticated HTTP client: bearer-token injection and one-shot token
//! refresh on 401.

mod client;
mod error;
mod refresh;
mod request;

pub use client::ApiClient;
pub use error::{ApiError, AuthExpiredReason, ErrorKind, RefreshError, ValidationErrors};
pub use refresh::{CredentialPolicy, REFRESH_PATH};
pub use request::RequestDescriptor;
