//! Per-request values. Nothing here outlives the request that created it.

use crate::error::{AppError, AppResult};
use sealbridge_types::{CreateSecretBody, EncodeSecretBody};
use zeroize::Zeroize;

const RESERVED_SECRET_PREFIX: &str = "GITHUB_";

/// A request to seal `secret` and store it as `secret_name` in
/// `repo_owner/repo_name`.
pub struct ProvisionRequest {
    secret: String,
    secret_name: String,
    repo_owner: String,
    repo_name: String,
}

impl Drop for ProvisionRequest {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for ProvisionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionRequest")
            .field("secret_name", &self.secret_name)
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .finish_non_exhaustive()
    }
}

impl ProvisionRequest {
    /// Build a validated request.
    pub fn new(
        secret: impl Into<String>,
        secret_name: impl Into<String>,
        repo_owner: impl Into<String>,
        repo_name: impl Into<String>,
    ) -> AppResult<Self> {
        let request = Self {
            secret: secret.into(),
            secret_name: secret_name.into(),
            repo_owner: repo_owner.into(),
            repo_name: repo_name.into(),
        };
        validate_repo_segment("repoOwner", &request.repo_owner)?;
        validate_repo_segment("repoName", &request.repo_name)?;
        validate_secret_name(&request.secret_name)?;
        Ok(request)
    }

    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    pub fn repo_owner(&self) -> &str {
        &self.repo_owner
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }
}

impl TryFrom<CreateSecretBody> for ProvisionRequest {
    type Error = AppError;

    fn try_from(mut body: CreateSecretBody) -> AppResult<Self> {
        let secret = std::mem::take(&mut body.secret);
        Self::new(
            secret,
            std::mem::take(&mut body.secret_name),
            std::mem::take(&mut body.repo_owner),
            std::mem::take(&mut body.repo_name),
        )
    }
}

/// A request to seal `secret` for a caller-supplied recipient key.
pub struct EncodeRequest {
    secret: String,
    public_key: String,
}

impl Drop for EncodeRequest {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl EncodeRequest {
    pub fn new(secret: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            public_key: public_key.into(),
        }
    }

    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Recipient public key (base64)
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

impl From<EncodeSecretBody> for EncodeRequest {
    fn from(mut body: EncodeSecretBody) -> Self {
        Self::new(
            std::mem::take(&mut body.secret),
            std::mem::take(&mut body.public_key),
        )
    }
}

/// Repository public key as served by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRecord {
    key: String,
    key_id: String,
}

impl PublicKeyRecord {
    pub fn new(key: String, key_id: String) -> Self {
        Self { key, key_id }
    }

    /// Base64 X25519 key; length is checked when it is used.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

/// A sealed value paired with the id of the key that sealed it.
///
/// Only [`EncryptedSecret::seal_for`] pairs a ciphertext with a key id in
/// production code, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    ciphertext: String,
    key_id: String,
}

impl EncryptedSecret {
    /// Seal `plaintext` under `key` and tag the result with `key`'s id.
    pub fn seal_for(plaintext: &[u8], key: &PublicKeyRecord) -> Result<Self, crate::crypto::EncodingError> {
        let ciphertext = crate::crypto::encode_secret(plaintext, key.key())?;
        Ok(Self {
            ciphertext,
            key_id: key.key_id.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn new(ciphertext: String, key_id: String) -> Self {
        Self { ciphertext, key_id }
    }

    /// Base64 sealed box
    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

/// Owner and repository names end up as URL path segments.
fn validate_repo_segment(field: &str, value: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{} must not be empty", field)));
    }
    if value == "." || value == ".." {
        return Err(AppError::validation(format!("{} is not a valid name", field)));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(AppError::validation(format!(
            "{} may only contain ASCII letters, digits, '-', '_' and '.'",
            field
        )));
    }
    Ok(())
}

fn validate_secret_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("secretName must not be empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::validation(
            "secretName may only contain ASCII letters, digits and '_'",
        ));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(AppError::validation("secretName must not start with a digit"));
    }
    if name.to_ascii_uppercase().starts_with(RESERVED_SECRET_PREFIX) {
        return Err(AppError::validation(format!(
            "secretName must not start with the reserved {} prefix",
            RESERVED_SECRET_PREFIX
        )));
    }
    Ok(())
}
