//! Identity provider capability.

use async_trait::async_trait;
use std::fmt;

use crate::error::CapabilityError;

/// The signed-in principal and a credential usable against the datastore.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub token: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("uid", &self.uid)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Supplies a fresh credential, or `None` when nobody is signed in.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current(&self) -> Result<Option<Identity>, CapabilityError>;
}

/// Never signed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousIdentity;

#[async_trait]
impl IdentityProvider for AnonymousIdentity {
    async fn current(&self) -> Result<Option<Identity>, CapabilityError> {
        Ok(None)
    }
}

/// A fixed identity, typically loaded once from host settings.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current(&self) -> Result<Option<Identity>, CapabilityError> {
        Ok(self.0.clone())
    }
}
