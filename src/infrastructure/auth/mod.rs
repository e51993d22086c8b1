//! Authentication infrastructure module
//!
//! Bearer credential minting and verification.

mod credential;

pub use credential::{
    CredentialConfig, CredentialService, EncryptedCredentialService, MIN_SECRET_LENGTH,
    TOKEN_HEADER,
};
