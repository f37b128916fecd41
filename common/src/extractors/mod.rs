//! Request extractors shared by the services.

pub mod client_meta;
pub mod validated_json;

pub use client_meta::ClientMeta;
pub use validated_json::ValidatedJson;
