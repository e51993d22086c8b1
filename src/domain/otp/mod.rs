//! One-time code domain module

mod entity;
mod repository;

pub use entity::{Otp, OTP_CODE_LENGTH, OTP_DEV_CODE, OTP_LIFETIME_MINUTES};
pub use repository::OtpRepository;

#[cfg(test)]
pub use repository::mock;
