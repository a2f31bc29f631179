//! Merchant backoffice access.

use serde::Serialize;

use super::pattern;
use crate::error::ValidationError;

/// Whether the terminal's merchant has backoffice access, and the login
/// email when it does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BackofficeAccess {
    /// Access enabled.
    #[serde(rename = "actif")]
    active: bool,
    /// Login email; always `None` while inactive.
    email: Option<String>,
}

impl BackofficeAccess {
    /// Creates a backoffice access value.
    ///
    /// An email supplied for an inactive access is discarded, and an empty
    /// email is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] if the access is active and
    /// the email is malformed.
    #[inline]
    pub fn new(active: bool, email: Option<String>) -> Result<Self, ValidationError> {
        let email = email
            .map(|raw| raw.trim().to_owned())
            .filter(|text| active && !text.is_empty());
        if let Some(address) = email.as_deref()
            && !is_valid_email(address)
        {
            return Err(ValidationError::InvalidEmail(address.to_owned()));
        }
        Ok(Self { active, email })
    }

    /// Access disabled, no email.
    #[inline]
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            email: None,
        }
    }

    /// Returns `true` if backoffice access is enabled.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Login email, if any.
    #[inline]
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Checks an address against the email pattern.
fn is_valid_email(address: &str) -> bool {
    pattern::is_match(&pattern::EMAIL, address)
}
