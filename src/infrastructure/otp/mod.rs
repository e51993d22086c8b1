//! One-time code infrastructure

mod service;

pub use service::{OtpMode, OtpService};
