//! REST API Module
//! Mission: Patient and doctor endpoints behind the auth middleware

pub mod doctors;
pub mod patients;
pub mod payloads;
