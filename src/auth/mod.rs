//! User authentication: bearer tokens, log in and registration.
//!
//! Clients authenticate once via [log_in] or [register] and receive a signed
//! bearer token. Protected route handlers take a [Claims] argument, which
//! extracts and verifies the `Authorization: Bearer` header and carries the
//! user ID used to scope every query.

mod log_in;
mod register;
mod token;

pub use log_in::{Credentials, LogInState, log_in};
pub use register::{RegisterState, register};
pub use token::{AuthState, Claims, TokenResponse};

pub(crate) use token::encode_jwt;
