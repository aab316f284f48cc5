//! Welcome to the Quire core, the identity and content-trust layer of the
//! Quire paper-sharing platform.
//!
//! Everything here sits on one side or the other of a trust boundary.
//! On the identity side, the crate hashes and verifies passwords, issues
//! and verifies the signed bearer tokens that stand in for a login, and
//! resolves a presented token into an account that is known to exist and
//! to still be active. Verification never throws structure at the caller:
//! a token is valid, expired, malformed, forged, or absent, and the
//! [`VerificationOutcome`](token::VerificationOutcome) says which, so
//! handlers can log precisely while telling the outside world as little
//! as possible.
//!
//! On the content side, author-submitted markup is rendered to html,
//! reduced to an allowlisted subset, and linkified, in that order. The
//! [`SafeHtml`](content::SafeHtml) type marks the output of that pipeline;
//! anything not wrapped in it should be treated as attacker-controlled.
//!
//! The crate holds no state and does no i/o. Storage lookups come in
//! through the [`AccountDirectory`](identity::AccountDirectory) trait,
//! randomness is handed in by the caller, and clocks are injectable for
//! testing. That keeps every security decision in one place and makes the
//! whole thing checkable without a database in the room.

pub mod error;
pub(crate) mod util;
pub mod credential;
pub mod token;
pub mod identity;
pub mod content;
