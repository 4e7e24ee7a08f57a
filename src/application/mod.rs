//! Application services layer.

pub mod error;
pub mod post_edit;
pub mod repos;
pub mod storage;
