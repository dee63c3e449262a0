//! Shared zip and XML plumbing for reading and rewriting document packages

pub(crate) mod xml;
pub(crate) mod zip;
