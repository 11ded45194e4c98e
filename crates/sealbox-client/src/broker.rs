//! Memoized, retryable construction of the backend client.
//!
//! [`CredentialBroker`] fetches the published artifact, recovers the
//! credentials with the embedded private key, and hands every caller
//! the same [`BackendClient`]. Callers that arrive while an attempt is
//! in flight share its outcome instead of starting their own. A failed
//! attempt resets the broker so a later call can retry.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sealbox_crypto::{BackendCredentials, CryptoError, SealedArtifact, private_key_from_pem, unseal};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::AuthApi;
use crate::backend::BackendClient;
use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type InitOutcome = Result<Arc<BackendClient>, BrokerError>;

enum BrokerState {
    Uninitialized,
    /// An attempt is in flight; waiters subscribe to its outcome.
    Initializing(broadcast::Sender<InitOutcome>),
    Ready(Arc<BackendClient>),
}

struct BrokerInner {
    config: BrokerConfig,
    state: Mutex<BrokerState>,
}

/// Hands out a shared [`BackendClient`] built from sealed credentials.
///
/// Cloning is cheap; clones share the same state. Pass a clone to each
/// component that needs backend access instead of reaching for a
/// global.
#[derive(Clone)]
pub struct CredentialBroker {
    inner: Arc<BrokerInner>,
}

impl CredentialBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                config,
                state: Mutex::new(BrokerState::Uninitialized),
            }),
        }
    }

    /// The shared client, initializing it on first use.
    ///
    /// Every successful call returns the same `Arc`. On failure the
    /// error is returned to every waiter and the broker resets, so the
    /// next call starts a fresh attempt.
    pub async fn client(&self) -> BrokerResult<Arc<BackendClient>> {
        let mut rx = {
            let mut state = self.inner.state.lock();
            match &*state {
                BrokerState::Ready(client) => return Ok(Arc::clone(client)),
                BrokerState::Initializing(tx) => tx.subscribe(),
                BrokerState::Uninitialized => {
                    let (tx, rx) = broadcast::channel(1);
                    *state = BrokerState::Initializing(tx.clone());
                    tokio::spawn(run_init(Arc::clone(&self.inner), tx));
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(BrokerError::Internal(
                "initialization task failed".to_string(),
            )),
        }
    }

    /// The shared client, without triggering initialization.
    pub fn try_client(&self) -> BrokerResult<Arc<BackendClient>> {
        match &*self.inner.state.lock() {
            BrokerState::Ready(client) => Ok(Arc::clone(client)),
            _ => Err(BrokerError::NotInitialized),
        }
    }

    /// The auth sub-API of the shared client.
    ///
    /// Fails with [`BrokerError::NotInitialized`] until a
    /// [`client`](Self::client) call has succeeded.
    pub fn auth(&self) -> BrokerResult<AuthApi> {
        Ok(self.try_client()?.auth().clone())
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.inner.state.lock(), BrokerState::Ready(_))
    }
}

async fn run_init(inner: Arc<BrokerInner>, tx: broadcast::Sender<InitOutcome>) {
    let outcome = initialize(&inner.config).await;

    // The state transition and the broadcast happen under one lock
    // acquisition. A caller either subscribed before the send or takes
    // the lock afterwards and observes the settled state.
    let mut state = inner.state.lock();
    match &outcome {
        Ok(client) => *state = BrokerState::Ready(Arc::clone(client)),
        Err(e) => {
            warn!(error = %e, "initialization failed");
            *state = BrokerState::Uninitialized;
        }
    }
    let _ = tx.send(outcome);
}

async fn initialize(config: &BrokerConfig) -> InitOutcome {
    let artifact = fetch_artifact(config).await?;

    let pem = config.private_key_pem.clone();
    let credentials = tokio::task::spawn_blocking(move || -> BrokerResult<BackendCredentials> {
        let private_key = private_key_from_pem(&pem).map_err(map_crypto_error)?;
        unseal(&artifact, &private_key).map_err(map_crypto_error)
    })
    .await
    .map_err(|e| BrokerError::Internal(format!("unseal task failed: {}", e)))??;

    debug!(url = %credentials.url, "credentials unsealed");

    let client = BackendClient::new(&credentials.url, &credentials.key, &config.options)
        .map_err(|e| BrokerError::Internal(e.to_string()))?;

    info!(url = %credentials.url, "backend client initialized");
    Ok(Arc::new(client))
}

async fn fetch_artifact(config: &BrokerConfig) -> BrokerResult<SealedArtifact> {
    let http = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| BrokerError::Fetch(e.to_string()))?;

    let response = http
        .get(&config.artifact_url)
        .send()
        .await
        .map_err(|e| BrokerError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BrokerError::Fetch(format!(
            "{} returned HTTP {}",
            config.artifact_url, status
        )));
    }

    response
        .json::<SealedArtifact>()
        .await
        .map_err(|e| BrokerError::Fetch(format!("invalid artifact body: {}", e)))
}

fn map_crypto_error(e: CryptoError) -> BrokerError {
    match e {
        CryptoError::TagMismatch => {
            BrokerError::Integrity("authentication tag mismatch".to_string())
        }
        CryptoError::MalformedArtifact {
            field: "encryptedKey",
            reason,
        } => BrokerError::KeyUnwrap(format!("encryptedKey: {}", reason)),
        CryptoError::MalformedArtifact { field, reason } => {
            BrokerError::Integrity(format!("field '{}': {}", field, reason))
        }
        CryptoError::KeyUnwrapFailed(m) | CryptoError::InvalidKey(m) => BrokerError::KeyUnwrap(m),
        CryptoError::MalformedCredentials(m) => BrokerError::MalformedCredentials(m),
        other => BrokerError::Internal(other.to_string()),
    }
}
