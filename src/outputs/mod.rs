//! The download tree.
//!
//! This directory tree is the crawler's only persistent state. It is
//! additive-only: directories and files are created, never deleted or
//! rewritten in place by a later cycle.
//!
//! # Layout
//!
//! ```text
//! download_root/
//! ├── 41234567/
//! │   ├── https_example_com_post
//! │   ├── http_b_example_y
//! │   └── .complete            # marker mode only
//! └── 41234570/
//! ```
//!
//! # Submodules
//!
//! - [`completion`]: which stories a previous cycle already handled
//! - [`store`]: story directories, file writes and completion markers

pub mod completion;
pub mod store;

/// Name of the file that marks a story complete in marker mode.
///
/// A sanitized URL can never take this name because every `.` is replaced.
pub const COMPLETE_MARKER: &str = ".complete";
