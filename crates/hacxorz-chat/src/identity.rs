//! Owner identity collaborator.

use hacxorz_core::types::OwnerId;

use crate::error::ChatError;

/// Supplies the identity that scopes session queries.
///
/// Queried afresh for every session operation; implementations may change
/// their answer at any time (sign-out, account switch).
pub trait IdentityProvider: Send + Sync {
    fn current_owner(&self) -> Option<OwnerId>;
}

/// Fixed identity, typically taken from config or `$USER`.
#[derive(Clone, Debug)]
pub struct StaticIdentity {
    owner: Option<OwnerId>,
}

impl StaticIdentity {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(OwnerId::new(owner)),
        }
    }

    pub fn anonymous() -> Self {
        Self { owner: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_owner(&self) -> Option<OwnerId> {
        self.owner.clone()
    }
}

/// Resolve the owner or fail with `Unauthenticated`.
pub(crate) fn require_owner(identity: &dyn IdentityProvider) -> Result<OwnerId, ChatError> {
    identity.current_owner().ok_or(ChatError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        let identity = StaticIdentity::new("alice");
        assert_eq!(require_owner(&identity).unwrap(), OwnerId::new("alice"));
    }

    #[test]
    fn test_anonymous_identity_is_rejected() {
        let identity = StaticIdentity::anonymous();
        assert!(matches!(
            require_owner(&identity),
            Err(ChatError::Unauthenticated)
        ));
    }
}
