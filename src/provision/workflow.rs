use crate::error::AppError;
use crate::provision::model::{EncryptedSecret, ProvisionRequest, PublicKeyRecord};
use crate::store::SecretStore;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Where a provisioning run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStage {
    Start,
    FetchingKey,
    Encoding,
    Submitting,
    Done,
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::FetchingKey => "fetching key",
            Self::Encoding => "encoding",
            Self::Submitting => "submitting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// A run that ended in `Failed`, with the stage that failed.
#[derive(Debug, Error)]
#[error("provisioning failed while {stage}: {error}")]
pub struct ProvisionFailure {
    pub stage: ProvisionStage,
    #[source]
    pub error: AppError,
}

impl From<ProvisionFailure> for AppError {
    fn from(failure: ProvisionFailure) -> Self {
        failure.error
    }
}

/// Workflow state. Each state owns what the next stage needs, so a fetched
/// key can only reach `Submitting` inside the secret it sealed.
enum State {
    Start,
    FetchingKey,
    Encoding(PublicKeyRecord),
    Submitting(EncryptedSecret),
    Done,
}

impl State {
    fn stage(&self) -> ProvisionStage {
        match self {
            Self::Start => ProvisionStage::Start,
            Self::FetchingKey => ProvisionStage::FetchingKey,
            Self::Encoding(_) => ProvisionStage::Encoding,
            Self::Submitting(_) => ProvisionStage::Submitting,
            Self::Done => ProvisionStage::Done,
        }
    }
}

/// Runs fetch key → seal → submit against a secret store.
///
/// Each stage runs at most once. The first failure ends the run; nothing
/// is written to the store unless sealing succeeded.
#[derive(Clone)]
pub struct Provisioner {
    store: Arc<dyn SecretStore>,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner").finish_non_exhaustive()
    }
}

impl Provisioner {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Provision one secret.
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<(), ProvisionFailure> {
        let owner = request.repo_owner();
        let repo = request.repo_name();
        let name = request.secret_name();

        let mut state = State::Start;
        loop {
            let stage = state.stage();
            state = match state {
                State::Start => State::FetchingKey,
                State::FetchingKey => match self.store.fetch_public_key(owner, repo).await {
                    Ok(key) => State::Encoding(key),
                    Err(e) => return Err(fail(stage, e.into())),
                },
                State::Encoding(key) => match EncryptedSecret::seal_for(request.secret(), &key) {
                    Ok(sealed) => State::Submitting(sealed),
                    Err(e) => {
                        error!(
                            "Sealing {} for {}/{} with key {} failed: {}",
                            name,
                            owner,
                            repo,
                            key.key_id(),
                            e
                        );
                        return Err(fail(stage, e.into()));
                    }
                },
                State::Submitting(sealed) => {
                    match self.store.submit_secret(owner, repo, name, &sealed).await {
                        Ok(()) => State::Done,
                        Err(e) => return Err(fail(stage, e.into())),
                    }
                }
                State::Done => {
                    info!("Provisioned {} in {}/{}", name, owner, repo);
                    return Ok(());
                }
            };
            debug!("{} in {}/{}: {} -> {}", name, owner, repo, stage, state.stage());
        }
    }
}

fn fail(stage: ProvisionStage, error: AppError) -> ProvisionFailure {
    debug!("Provisioning failed while {}", stage);
    ProvisionFailure { stage, error }
}
