//! FileSystem abstraction for testable file operations

mod mock;
mod real;
mod r#trait;

pub use mock::{FsOp, MockFileSystem};
pub use r#trait::{backup_path_with, FileSystem, FileType};
pub use real::RealFileSystem;
