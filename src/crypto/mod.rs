//! Anonymous sealed-box encoding of secrets for a recipient public key.
//!
//! The construction is the libsodium `crypto_box_seal` one:
//!
//! - X25519 between a fresh ephemeral key and the recipient key
//! - XSalsa20-Poly1305 under the HSalsa20-derived box key
//! - nonce = BLAKE2b-192(ephemeral_pk || recipient_pk)
//!
//! Output layout is `ephemeral_pk (32) || tag (16) || ciphertext`. Only the
//! holder of the recipient's private key can open it; this crate never does.

pub mod sealed_box;

pub use sealed_box::{
    encode_secret, parse_recipient_key, seal, EncodingError, MalformedKey,
    KEY_SIZE, SEAL_OVERHEAD, TAG_SIZE,
};
