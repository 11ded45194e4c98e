//! Runtime unwrap-and-init for sealed backend credentials.
//!
//! The packager publishes an encrypted credential artifact alongside
//! the built application and emits a source module embedding the
//! matching private key. At startup a [`CredentialBroker`] fetches the
//! artifact, recovers the credentials, and constructs one shared
//! [`BackendClient`]; every caller gets the same instance.
//!
//! # Example
//!
//! ```rust,ignore
//! use sealbox_client::{BrokerConfig, CredentialBroker};
//!
//! let config = BrokerConfig::new(
//!     "https://app.example.co/encrypted-credentials.json",
//!     private_key::PRIVATE_KEY_PEM,
//! );
//! let broker = CredentialBroker::new(config);
//!
//! let client = broker.client().await?;
//! client
//!     .auth()
//!     .sign_in_with_password("dev@example.co", "hunter2")
//!     .await?;
//! let notes: Vec<Note> = client.from("notes").select("*").execute().await?;
//! ```

pub mod auth;
pub mod backend;
pub mod broker;
pub mod config;
pub mod error;
pub mod session;

pub use auth::{AuthApi, AuthChange, AuthEvent, Session, User};
pub use backend::{BackendClient, QueryBuilder, SortOrder};
pub use broker::CredentialBroker;
pub use config::{BrokerConfig, ClientOptions};
pub use error::{BackendError, BackendResult, BrokerError, BrokerResult};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
