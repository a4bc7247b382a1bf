pub mod headers;
pub mod json_response;
pub mod query;

// Re-export commonly used utilities
pub use headers::*;
pub use json_response::*;
pub use query::*;
