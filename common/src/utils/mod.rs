//! Utility functions and helpers.

pub mod html;
pub mod nullable;
pub mod validation;

// Re-export commonly used helpers
pub use html::escape_html;
pub use nullable::{explicit_null, null_as_default};
pub use validation::{email_address, not_blank};
