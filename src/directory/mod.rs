//! User Directory
//! Mission: The doctor/patient identity store that authentication and policy consult

pub mod models;
pub mod store;

pub use store::{Directory, DirectoryError, RemoveOutcome};
