//! Movie board post editor: an edit form for board posts backed by either a
//! local PostgreSQL database or a hosted REST backend with object storage.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
