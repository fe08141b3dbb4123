//! Label persistence: the normalized TXT codec and its error type.

pub mod error;
pub mod txt;

pub use error::FormatError;
