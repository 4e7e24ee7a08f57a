mod handlers;
mod multipart;

pub(super) use handlers::{post_edit, post_list, post_update};
