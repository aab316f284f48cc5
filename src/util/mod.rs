//! Utilities that don't have a better home.

pub(crate) mod ser;
