use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crypto_box::PublicKey;
use rand::rngs::OsRng;
use thiserror::Error;

/// X25519 public key length.
pub const KEY_SIZE: usize = 32;
/// Poly1305 tag length.
pub const TAG_SIZE: usize = 16;
/// Bytes a sealed box adds on top of the plaintext.
pub const SEAL_OVERHEAD: usize = KEY_SIZE + TAG_SIZE;

/// Why a recipient key was refused.
#[derive(Debug, Error)]
pub enum MalformedKey {
    #[error("invalid base64 encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

/// Encoder errors
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("malformed public key: {0}")]
    MalformedKey(#[from] MalformedKey),

    #[error("sealing failed")]
    Seal,
}

/// Parse a recipient X25519 public key from base64.
///
/// Anything that does not decode to exactly [`KEY_SIZE`] bytes is refused.
pub fn parse_recipient_key(base64_key: &str) -> Result<PublicKey, MalformedKey> {
    let bytes = BASE64.decode(base64_key)?;
    let arr: [u8; KEY_SIZE] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| MalformedKey::Length(bytes.len()))?;
    Ok(PublicKey::from(arr))
}

/// Seal `plaintext` for `recipient`.
///
/// Every call draws a fresh ephemeral key, so identical inputs never
/// produce identical output.
pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>, EncodingError> {
    recipient
        .seal(&mut OsRng, plaintext)
        .map_err(|_| EncodingError::Seal)
}

/// Seal `plaintext` for a base64 recipient key and return the box as base64.
pub fn encode_secret(plaintext: &[u8], public_key_base64: &str) -> Result<String, EncodingError> {
    let recipient = parse_recipient_key(public_key_base64)?;
    let sealed = seal(plaintext, &recipient)?;
    Ok(BASE64.encode(sealed))
}
