//! User account model.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Username, timestamp};
use crate::error::ValidationError;

/// Authorization tier of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May edit, delete and manage users.
    Admin,
    /// May browse and add records.
    User,
}

impl core::str::FromStr for Role {
    type Err = ValidationError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(ValidationError::UnknownRole(other.to_owned())),
        }
    }
}

impl core::fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match *self {
            Self::Admin => "admin",
            Self::User => "user",
        })
    }
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Login name.
    username: Username,
    /// Argon2 PHC string, or a legacy unsalted SHA-256 hex digest.
    password_hash: String,
    /// Authorization tier.
    role: Role,
    /// Family name.
    #[serde(rename = "nom", default)]
    last_name: String,
    /// Given name.
    #[serde(rename = "prenom", default)]
    first_name: String,
    /// Contact email.
    #[serde(default)]
    email: String,
    /// Account creation time.
    #[serde(rename = "date_creation", with = "timestamp::local")]
    created_at: NaiveDateTime,
    /// Last successful login.
    #[serde(
        rename = "derniere_connexion",
        default,
        with = "timestamp::local_option"
    )]
    last_login: Option<NaiveDateTime>,
    /// Whether the account may log in.
    #[serde(rename = "actif", default = "default_active")]
    active: bool,
}

/// Accounts without an explicit flag are active.
const fn default_active() -> bool {
    true
}

/// Profile fields for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Login name.
    pub username: Username,
    /// Authorization tier.
    pub role: Role,
    /// Family name.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Contact email.
    pub email: String,
}

impl UserAccount {
    /// Creates an active account with a precomputed password hash.
    pub(crate) fn new(profile: NewUser, password_hash: String) -> Self {
        Self {
            username: profile.username,
            password_hash,
            role: profile.role,
            last_name: profile.last_name,
            first_name: profile.first_name,
            email: profile.email,
            created_at: timestamp::now(),
            last_login: None,
            active: true,
        }
    }

    /// Login name.
    #[inline]
    #[must_use]
    pub const fn username(&self) -> &Username {
        &self.username
    }

    /// Authorization tier.
    #[inline]
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` for administrators.
    #[inline]
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Family name.
    #[inline]
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Given name.
    #[inline]
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Contact email.
    #[inline]
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Account creation time.
    #[inline]
    #[must_use]
    pub const fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    /// Last successful login.
    #[inline]
    #[must_use]
    pub const fn last_login(&self) -> Option<NaiveDateTime> {
        self.last_login
    }

    /// Whether the account may log in.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Stored password hash.
    pub(crate) fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Replaces the stored password hash.
    pub(crate) fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }

    /// Enables or disables the account.
    pub(crate) const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Records a successful login now.
    pub(crate) fn touch_login(&mut self) {
        self.last_login = Some(timestamp::now());
    }
}
