//! Resolve a presented bearer token into the live account it speaks for.
//!
//! Token verification alone only proves the bearer logged in at some point.
//! The functions here close the loop against account storage: the token has
//! to verify, its subject has to still exist, and the account has to still be
//! active. Surfaces that also render for anonymous visitors use the
//! `_optional` variant, which folds every failure into `None` instead of an
//! error.
//!
//! Rejections are logged at debug level and the errors handed back are
//! deliberately vague. The *reason* a token was refused is for our logs, not
//! for whoever presented it.

use crate::{
    error::{Error, Result},
    token::{TokenAuthority, VerificationOutcome},
};
use serde_derive::{Deserialize, Serialize};

/// What an account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A regular account
    User,
    /// An administrator
    Admin,
}

/// An account as storage knows it, or at least the slice of it that identity
/// decisions are made from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct AccountRecord {
    /// Unique account id
    id: i64,
    /// The account's display handle
    username: String,
    /// The account's role
    role: Role,
    /// Whether the account may act at all. Deactivated accounts keep their
    /// data, but every request on their behalf is refused.
    active: bool,
}

impl AccountRecord {
    /// Create a new account record.
    pub fn new<T: Into<String>>(id: i64, username: T, role: Role, active: bool) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            active,
        }
    }

    /// True if this account holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Account lookup, implemented by whatever storage the caller keeps accounts
/// in.
pub trait AccountDirectory {
    /// Fetch the account with the given id, if one exists.
    fn find_account(&self, user_id: i64) -> Option<AccountRecord>;
}

/// Resolve a presented bearer token into an active account.
///
/// Fails with [`Error::CredentialsInvalid`] when no token was presented, the
/// token doesn't verify, or its subject doesn't exist, and with
/// [`Error::AccountDeactivated`] when the account exists but has been turned
/// off.
pub fn resolve_identity<D: AccountDirectory>(
    authority: &TokenAuthority,
    directory: &D,
    bearer: Option<&str>,
) -> Result<AccountRecord> {
    let outcome = match bearer {
        Some(presented) => authority.verify(presented),
        None => VerificationOutcome::Absent,
    };
    let data = match outcome {
        VerificationOutcome::Valid(data) => data,
        rejected => {
            tracing::debug!(outcome = ?rejected, "bearer token rejected");
            Err(Error::CredentialsInvalid)?
        }
    };
    let user_id = *data.claims().user_id();
    let account = match directory.find_account(user_id) {
        Some(account) => account,
        None => {
            tracing::debug!(user_id = user_id, "token subject not found");
            Err(Error::CredentialsInvalid)?
        }
    };
    if !*account.active() {
        tracing::debug!(user_id = user_id, "account is deactivated");
        Err(Error::AccountDeactivated)?;
    }
    Ok(account)
}

/// Like [`resolve_identity`], but every failure collapses to `None`. For
/// pages that render either way and just want to know who's asking, if
/// anyone.
pub fn resolve_identity_optional<D: AccountDirectory>(
    authority: &TokenAuthority,
    directory: &D,
    bearer: Option<&str>,
) -> Option<AccountRecord> {
    resolve_identity(authority, directory, bearer).ok()
}
