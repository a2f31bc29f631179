//! User directory: accounts, login session and authorization roles.

mod password;

use std::collections::BTreeMap;

use secrecy::SecretString;

use crate::error::{Result, TpeError, ValidationError};
use crate::models::{NewUser, Role, UserAccount, UserStats, Username, timestamp};
use crate::storage::{Storage, UsersDocument};

/// Login name of the built-in administrator.
pub const DEFAULT_ADMIN: &str = "admin";

/// Initial password of the built-in administrator.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// User accounts with a single login session.
///
/// Every change is persisted immediately through the storage backend.
#[derive(Debug)]
pub struct UserDirectory<S: Storage> {
    /// Storage backend.
    storage: S,
    /// Accounts by login name.
    users: BTreeMap<Username, UserAccount>,
    /// Logged-in user.
    session: Option<Username>,
}

impl<S: Storage> UserDirectory<S> {
    /// Loads the directory, creating the default administrator when it is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored directory cannot be read, or the
    /// bootstrapped one cannot be written.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn open(storage: S) -> Result<Self> {
        let users = storage
            .load_users()?
            .map(|document| document.users)
            .unwrap_or_default();
        let mut directory = Self {
            storage,
            users,
            session: None,
        };
        if directory.users.is_empty() {
            directory.bootstrap_admin()?;
        }
        Ok(directory)
    }

    /// Creates a new active account.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::UserExists`] if the name is taken, a validation
    /// error if it is blank, or an error if hashing or saving fails.
    #[inline]
    pub fn add_user(&mut self, profile: NewUser, password: &SecretString) -> Result<()> {
        if profile.username.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyField("username").into());
        }
        if self.users.contains_key(&profile.username) {
            return Err(TpeError::UserExists(profile.username.to_string()));
        }
        let hash = password::hash(password)?;
        let username = profile.username.clone();
        tracing::debug!(%username, role = %profile.role, "user added");
        let _previous = self
            .users
            .insert(username, UserAccount::new(profile, hash));
        self.persist()
    }

    /// Checks credentials and opens a session.
    ///
    /// On success the login time is recorded and saved. A legacy password
    /// hash is replaced by an Argon2 one.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::UnknownUser`], [`TpeError::InactiveUser`] or
    /// [`TpeError::InvalidCredentials`], or an error if saving fails.
    #[tracing::instrument(skip(self, password))]
    #[inline]
    pub fn authenticate(&mut self, username: &str, password: &SecretString) -> Result<&UserAccount> {
        let account = self
            .users
            .get_mut(username)
            .ok_or_else(|| TpeError::UnknownUser(username.to_owned()))?;
        if !account.is_active() {
            return Err(TpeError::InactiveUser(username.to_owned()));
        }
        match password::verify(password, account.password_hash()) {
            password::Verdict::Mismatch => return Err(TpeError::InvalidCredentials),
            password::Verdict::LegacyMatch => {
                tracing::warn!("upgrading legacy password hash");
                account.set_password_hash(password::hash(password)?);
            }
            password::Verdict::Match => {}
        }
        account.touch_login();
        self.session = Some(account.username().clone());
        self.persist()?;
        self.users
            .get(username)
            .ok_or_else(|| TpeError::UnknownUser(username.to_owned()))
    }

    /// Closes the session.
    #[inline]
    pub fn logout(&mut self) {
        self.session = None;
    }

    /// Logged-in account, if any.
    #[inline]
    #[must_use]
    pub fn current_user(&self) -> Option<&UserAccount> {
        self.session
            .as_ref()
            .and_then(|username| self.users.get(username))
    }

    /// Returns `true` if an administrator is logged in.
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user().is_some_and(UserAccount::is_admin)
    }

    /// Returns `true` if someone is logged in.
    #[inline]
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Looks up an account.
    #[inline]
    #[must_use]
    pub fn user(&self, username: &str) -> Option<&UserAccount> {
        self.users.get(username)
    }

    /// Enables or disables an account.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::UnknownUser`], [`TpeError::ProtectedUser`] when
    /// disabling the built-in administrator, or an error if saving fails.
    #[inline]
    pub fn set_active(&mut self, username: &str, active: bool) -> Result<()> {
        if !active && username == DEFAULT_ADMIN {
            return Err(TpeError::ProtectedUser(username.to_owned()));
        }
        let account = self
            .users
            .get_mut(username)
            .ok_or_else(|| TpeError::UnknownUser(username.to_owned()))?;
        account.set_active(active);
        tracing::debug!(username, active, "user status changed");
        self.persist()
    }

    /// Replaces a password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns [`TpeError::UnknownUser`], [`TpeError::InvalidCredentials`]
    /// if `old` does not match, or an error if hashing or saving fails.
    #[inline]
    pub fn change_password(
        &mut self,
        username: &str,
        old: &SecretString,
        new: &SecretString,
    ) -> Result<()> {
        let account = self
            .users
            .get_mut(username)
            .ok_or_else(|| TpeError::UnknownUser(username.to_owned()))?;
        if !password::verify(old, account.password_hash()).is_match() {
            return Err(TpeError::InvalidCredentials);
        }
        account.set_password_hash(password::hash(new)?);
        tracing::debug!(username, "password changed");
        self.persist()
    }

    /// All accounts, ordered by login name.
    #[inline]
    #[must_use]
    pub fn list_users(&self) -> Vec<&UserAccount> {
        self.users.values().collect()
    }

    /// Account counters.
    #[inline]
    #[must_use]
    pub fn user_statistics(&self) -> UserStats {
        self.users
            .values()
            .fold(UserStats::default(), |mut stats, account| {
                stats.total += 1;
                if account.is_active() {
                    stats.active += 1;
                } else {
                    stats.inactive += 1;
                }
                match account.role() {
                    Role::Admin => stats.admins += 1,
                    Role::User => stats.users += 1,
                }
                stats
            })
    }

    /// Storage backend.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Creates and saves the built-in administrator.
    fn bootstrap_admin(&mut self) -> Result<()> {
        tracing::warn!(
            username = DEFAULT_ADMIN,
            "no users found; creating default administrator, change its password"
        );
        let profile = NewUser {
            username: Username::from(DEFAULT_ADMIN),
            role: Role::Admin,
            last_name: "Administrateur".to_owned(),
            first_name: "Système".to_owned(),
            email: "admin@tpe.local".to_owned(),
        };
        self.add_user(profile, &SecretString::from(DEFAULT_ADMIN_PASSWORD.to_owned()))
    }

    /// Writes the whole directory.
    fn persist(&self) -> Result<()> {
        self.storage.save_users(&UsersDocument {
            users: self.users.clone(),
            saved_at: Some(timestamp::now()),
        })
    }
}
