//! Credential used to sign requests.

use std::fmt::{Debug, Formatter};

use crate::error::{Error, Result};

/// Credential that holds the access key and secret key.
///
/// A credential is handed to [`crate::Signer::new`] once and never changes
/// afterwards. It never appears in logs or `Debug` output in clear text.
#[derive(Clone)]
pub struct Credential {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credential {
    /// Create a new credential.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Credential {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    /// Build a credential with a session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }

    /// Get the access key id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Is the current credential valid?
    pub fn is_valid(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::credential_invalid(
                "access key id and secret access key must not be empty",
            ))
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Credential {{ access_key_id: {}, secret_access_key: {}, session_token: {} }}",
            redact(&self.access_key_id),
            redact(&self.secret_access_key),
            redact(self.session_token.as_deref().unwrap_or(""))
        )
    }
}

fn redact(v: &str) -> &str {
    if v.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
