//! Lists and schedules Zoom meetings through JWT-signed calls to the Zoom REST API.

pub mod api;
pub mod credentials;
pub mod error;
pub mod http_handler;
pub mod meetings;
pub mod time_format;
pub mod token;
