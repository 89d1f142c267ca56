//! Client for the freedesktop.org Secret Service.
//!
//! Looks up stored secrets by their human-assigned label (matched against
//! the item's `Title` attribute) and returns the secret value together with
//! the URL and username attributes the item carries. Meant for processes
//! that need non-interactive access to the desktop keyring.
//!
//! One-shot callers can use [`get_secret`] / [`get_credential`], which
//! handle the session lifecycle internally. Callers making several lookups
//! should open a [`Session`] themselves and [`Session::close`] it when done.
//!
//! ```no_run
//! let password = secret_fetch::get_secret("example.com")?;
//! # Ok::<(), secret_fetch::Error>(())
//! ```

mod error;
mod resolver;
mod service;
mod session;

pub use error::{Error, Result};
pub use resolver::{get_credential, get_secret, Credential, SearchResult, SecretStore};
pub use session::Session;
