pub mod config;
pub mod error;
pub mod extract;
pub mod otp;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod session;
pub mod submit;
