//! HTTP client for the bug tracker API, plus the view state of the
//! bug board (list + report form).

pub mod board;
pub mod client;
pub mod error;

pub use board::{BugBoard, BugForm, Origin};
pub use client::BugClient;
pub use error::ClientError;

pub use bugs::model::{Bug, BugPatch, BugStatus, CreateBug};
