mod db;
pub use db::{DumpAs, ForumDump};

mod comment;
pub use comment::{build_comment_tree, sort_for_tree};

pub mod badge;

pub mod api {
    pub use quickease_api::*;
}
