//! Small helpers shared across the crate.
//!
//! - **URL validation**: scheme and host checks before any outbound request
//! - **Text cleanup**: control-character stripping and display-width measurement

mod text;
mod url_validator;

pub use text::{display_width, strip_control_chars};
pub use url_validator::{validate_url, UrlValidationError};
