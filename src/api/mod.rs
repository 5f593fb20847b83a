// HTTP access to the nutrition backend.

mod client;
mod error;

pub use client::{ApiClient, CSRF_HEADER};
pub use error::ApiError;
