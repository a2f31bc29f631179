//! Operator contact details.

use serde::{Deserialize, Serialize};

/// A person responsible for a terminal (the "régisseur").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Given name.
    #[serde(rename = "prenom")]
    pub first_name: String,
    /// Family name.
    #[serde(rename = "nom")]
    pub last_name: String,
    /// Phone number (free text).
    #[serde(rename = "telephone", default)]
    pub phone: String,
}

impl Contact {
    /// Creates a contact from its three parts.
    #[inline]
    #[must_use]
    pub fn new<F, L, P>(first_name: F, last_name: L, phone: P) -> Self
    where
        F: Into<String>,
        L: Into<String>,
        P: Into<String>,
    {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: phone.into(),
        }
    }

    /// Returns `"first last"`.
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl core::fmt::Display for Contact {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} - {}", self.first_name, self.last_name, self.phone)
    }
}
