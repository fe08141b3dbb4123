//! apexlabel - keypoint/polygon image annotation core.
//!
//! The annotation state engine behind a labeling tool: label store and
//! taxonomy, viewport transform, normalized TXT persistence, and an
//! ONNX-assisted detection pipeline, orchestrated by a session controller
//! that a GUI or CLI driver feeds events into.

pub mod config;
pub mod data;
pub mod detect;
pub mod format;
pub mod model;
pub mod session;
pub mod viewport;

pub use config::AppConfig;
pub use session::{Mode, Session, SessionError};
