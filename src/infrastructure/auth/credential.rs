//! Encrypted bearer credentials
//!
//! Tokens are `v2.local.<base64url(nonce || ciphertext || tag)>`. The claim
//! set is JSON sealed with ChaCha20-Poly1305; the header is bound as
//! associated data so a token cannot be replayed under another version tag.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::fmt::Debug;

use crate::domain::credential::{CredentialClaims, TeamClaim};
use crate::domain::{AuthError, DomainError, UserId};
use crate::infrastructure::random;

/// Version and purpose prefix of every token
pub const TOKEN_HEADER: &str = "v2.local.";

/// Length of the random `jti` nonce embedded in every claim set
const JTI_LENGTH: usize = 32;

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Configuration for the credential service
#[derive(Clone)]
pub struct CredentialConfig {
    /// Shared symmetric secret; hashed down to the AEAD key
    pub secret: String,
    /// Issuer and audience of every credential
    pub host: String,
    pub ttl: Duration,
}

impl CredentialConfig {
    pub fn new(secret: impl Into<String>, host: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            host: host.into(),
            ttl,
        }
    }
}

impl Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("secret", &"[hidden]")
            .field("host", &self.host)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Mints and checks bearer credentials
pub trait CredentialService: Send + Sync + Debug {
    /// Build, encrypt and encode a claim set for the user
    fn issue(
        &self,
        user_id: &UserId,
        email: &str,
        teams: &[TeamClaim],
        ttl: Duration,
    ) -> Result<String, DomainError>;

    /// Decrypt and check a token; never touches storage
    fn verify(&self, token: &str) -> Result<CredentialClaims, DomainError>;

    /// Lifetime applied by the orchestrator
    fn default_ttl(&self) -> Duration;
}

/// ChaCha20-Poly1305 implementation of [`CredentialService`]
pub struct EncryptedCredentialService {
    key: LessSafeKey,
    host: String,
    ttl: Duration,
    rng: SystemRandom,
}

impl Debug for EncryptedCredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedCredentialService")
            .field("key", &"[hidden]")
            .field("host", &self.host)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl EncryptedCredentialService {
    pub fn new(config: CredentialConfig) -> Result<Self, DomainError> {
        if config.secret.len() < MIN_SECRET_LENGTH {
            return Err(DomainError::configuration(format!(
                "Credential secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if config.host.trim().is_empty() {
            return Err(DomainError::configuration("Credential host must not be empty"));
        }

        let digest = Sha256::digest(config.secret.as_bytes());
        let unbound = UnboundKey::new(&CHACHA20_POLY1305, digest.as_slice())
            .map_err(|_| DomainError::configuration("Failed to derive credential key"))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            host: config.host,
            ttl: config.ttl,
            rng: SystemRandom::new(),
        })
    }

    pub(crate) fn seal(&self, claims: &CredentialClaims) -> Result<String, DomainError> {
        let mut in_out = serde_json::to_vec(claims)
            .map_err(|e| DomainError::internal(format!("Failed to encode claims: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| DomainError::internal("Failed to generate nonce"))?;

        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(TOKEN_HEADER.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| DomainError::internal("Failed to encrypt claims"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + in_out.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&in_out);

        Ok(format!("{}{}", TOKEN_HEADER, URL_SAFE_NO_PAD.encode(payload)))
    }

    fn open(&self, token: &str) -> Result<CredentialClaims, AuthError> {
        let body = token
            .strip_prefix(TOKEN_HEADER)
            .ok_or(AuthError::InvalidToken)?;
        let mut payload = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| AuthError::InvalidToken)?;

        if payload.len() <= NONCE_LEN {
            return Err(AuthError::InvalidToken);
        }

        let mut ciphertext = payload.split_off(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(&payload).map_err(|_| AuthError::InvalidToken)?;

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(TOKEN_HEADER.as_bytes()), &mut ciphertext)
            .map_err(|_| AuthError::InvalidToken)?;

        serde_json::from_slice(plaintext).map_err(|_| AuthError::InvalidToken)
    }
}

impl CredentialService for EncryptedCredentialService {
    fn issue(
        &self,
        user_id: &UserId,
        email: &str,
        teams: &[TeamClaim],
        ttl: Duration,
    ) -> Result<String, DomainError> {
        let now = Utc::now();
        let claims = CredentialClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            jti: random::alphanumeric(JTI_LENGTH),
            iss: self.host.clone(),
            aud: self.host.clone(),
            iat: now,
            nbf: now,
            exp: now + ttl,
            teams: teams.to_vec(),
        };

        self.seal(&claims)
    }

    fn verify(&self, token: &str) -> Result<CredentialClaims, DomainError> {
        let claims = self.open(token)?;
        let now = Utc::now();

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired.into());
        }
        if claims.iss != self.host || claims.aud != self.host {
            return Err(AuthError::InvalidIssuer.into());
        }
        if claims.nbf > now {
            return Err(AuthError::InvalidToken.into());
        }
        if claims.sub.is_empty() || claims.email.is_empty() {
            return Err(AuthError::MalformedClaims.into());
        }

        Ok(claims)
    }

    fn default_ttl(&self) -> Duration {
        self.ttl
    }
}
