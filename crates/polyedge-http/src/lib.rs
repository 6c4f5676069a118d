//! Request and response normalization.
//!
//! - `native` - The request/response shapes each runtime hands over
//! - `NormalizedRequest` - One accessor API over every native request
//! - `NormalizedResponse` - Built once, converted into the native shape
//! - `decode_body` - Content-type driven body decoding

mod body;
pub mod native;
mod request;
mod response;

pub use body::*;
pub use native::*;
pub use request::*;
pub use response::*;
