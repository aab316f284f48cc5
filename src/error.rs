//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while interacting with the system.

use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// The account behind an otherwise-valid token has been deactivated.
    #[error("user account is deactivated")]
    AccountDeactivated,

    /// Could not produce a password hash. Generally a sign of bad cost
    /// parameters.
    #[error("password hashing failed")]
    CredentialHashFailed,

    /// The presented credentials (or bearer token) do not map to a known,
    /// verified account. Deliberately vague.
    #[error("could not validate credentials")]
    CredentialsInvalid,

    /// An error while engaging in deserialization.
    #[error("deserialization error")]
    DeserializeBase64(#[from] base64::DecodeError),

    /// An error while engaging in json serialization.
    #[error("json serialization error")]
    SerializeJson(#[from] serde_json::Error),

    /// A token signing secret was empty. Signing tokens with an empty secret
    /// is a misconfiguration, and we refuse to start that way.
    #[error("token signing secret must not be empty")]
    SigningSecretEmpty,

    /// Failed to produce a token signature
    #[error("failed to create a token signature")]
    TokenSignFailed,
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        // TODO: implement a real PartialEq. cannot derive because
        // serde_json::Error et al are not eq-able, so we compare the long way
        // around.
        format!("{:?}", self) == format!("{:?}", other)
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
