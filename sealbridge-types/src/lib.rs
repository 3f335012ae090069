//! JSON wire types for SealBridge.
//!
//! Two families live here: the bodies of the SealBridge HTTP API
//! (camelCase on the wire) and the bodies exchanged with the remote
//! repository secret store (snake_case on the wire).

#![allow(clippy::derive_partial_eq_without_eq)]

pub use api::{CreateSecretBody, EncodeSecretBody, EncodedSecretResponse, ErrorResponse, PingResponse};
pub use store::{StorePublicKey, StoreSecretUpdate};

pub mod api {
    use serde::{Deserialize, Serialize};

    /// Body of `POST /api/v1/secret/`.
    #[derive(Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateSecretBody {
        pub secret: String,
        pub secret_name: String,
        pub repo_owner: String,
        pub repo_name: String,
    }

    /// Body of `POST /api/v1/secret/encode`.
    #[derive(Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EncodeSecretBody {
        /// Recipient X25519 public key (base64)
        pub public_key: String,
        pub secret: String,
    }

    // Plaintext must never end up in logs through a derived Debug.
    impl std::fmt::Debug for CreateSecretBody {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("CreateSecretBody")
                .field("secret_name", &self.secret_name)
                .field("repo_owner", &self.repo_owner)
                .field("repo_name", &self.repo_name)
                .finish_non_exhaustive()
        }
    }

    impl std::fmt::Debug for EncodeSecretBody {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EncodeSecretBody")
                .field("public_key", &self.public_key)
                .finish_non_exhaustive()
        }
    }

    /// Response of `POST /api/v1/secret/encode`.
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EncodedSecretResponse {
        pub encoded_secret: String,
    }

    /// Response of the ping endpoints.
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct PingResponse {
        pub message: String,
    }

    impl PingResponse {
        pub fn pong() -> Self {
            Self {
                message: "pong".to_string(),
            }
        }
    }

    /// Error body returned with every 4xx/5xx.
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct ErrorResponse {
        pub error: String,
        pub code: u16,
    }
}

pub mod store {
    use serde::{Deserialize, Serialize};

    /// `GET /repos/{owner}/{repo}/actions/secrets/public-key`
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct StorePublicKey {
        /// Repository public key (base64)
        pub key: String,
        pub key_id: String,
    }

    /// `PUT /repos/{owner}/{repo}/actions/secrets/{secret_name}`
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct StoreSecretUpdate {
        /// Sealed-box ciphertext (base64)
        pub encrypted_value: String,
        pub key_id: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_secret_body_uses_camel_case() {
        let body: CreateSecretBody = serde_json::from_str(
            r#"{"secret":"s","secretName":"API_KEY","repoOwner":"octo","repoName":"hello"}"#,
        )
        .unwrap();
        assert_eq!(body.secret_name, "API_KEY");
        assert_eq!(body.repo_owner, "octo");
        assert_eq!(body.repo_name, "hello");
    }

    #[test]
    fn test_debug_hides_plaintext() {
        let body = EncodeSecretBody {
            public_key: "pk".to_string(),
            secret: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", body).contains("hunter2"));
    }

    #[test]
    fn test_store_update_uses_snake_case() {
        let update = StoreSecretUpdate {
            encrypted_value: "c2VhbGVk".to_string(),
            key_id: "568250167242549743".to_string(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["encrypted_value"], "c2VhbGVk");
        assert_eq!(json["key_id"], "568250167242549743");
    }

    #[test]
    fn test_encoded_secret_response_field_name() {
        let json = serde_json::to_string(&EncodedSecretResponse {
            encoded_secret: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"encodedSecret":"abc"}"#);
    }
}
