//! Infrastructure services

mod auth_service;

pub use auth_service::{
    AuthOutcome, AuthService, LoginAck, LoginRequest, VerifyRequest, LOGIN_ACK_MESSAGE,
};
