//! Secret provisioning: the request/record types and the
//! fetch → encode → submit workflow built on them.

pub mod model;
pub mod workflow;

pub use model::{EncodeRequest, EncryptedSecret, ProvisionRequest, PublicKeyRecord};
pub use workflow::{ProvisionFailure, ProvisionStage, Provisioner};
