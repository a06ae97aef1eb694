//! QuakeLink protocol types, commands, and response parsing.
//!
//! This crate provides the wire-level layer of the QuakeLink event query
//! protocol: request rendering, status-line classification, and the
//! header-block/payload response format. It performs no I/O; the client
//! crate drives it over a socket.

pub mod capability;
pub mod command;
pub mod error;
pub mod format;
pub mod options;
pub mod response;
pub mod status;
pub mod time;

pub use command::{Command, OrderBy, SelectParams, SelectScope};
pub use error::{QuakeLinkError, Result};
pub use format::{FormatSpec, RequestFormat};
pub use options::{Options, SessionOption};
pub use response::{ContentType, HeaderBlock, MAX_CONTENT_LENGTH, Response};
pub use status::{SelectKind, StatusLine};
