pub(crate) mod build;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod import;
pub(crate) mod keys;
pub(crate) mod resolve;
