//! Authentication and session lifecycle.

mod error;
mod service;
mod session;

pub use error::{AuthError, AuthResult};
pub use service::AuthenticationService;
pub use session::{Session, SessionId};
