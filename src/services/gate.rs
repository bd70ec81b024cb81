//! Access gate — per-channel shared-secret check at connection time.
//!
//! DESIGN
//! ======
//! Host and user channels may each carry a configured secret; a connecting
//! participant supplies its credential as the `pass` query parameter on the
//! upgrade request. The check runs before the socket upgrades, so a refused
//! connection never registers in the channel registry. The board channel is
//! ungated.

use crate::event::Role;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication error for /{0}")]
    Rejected(Role),
}

/// Configured expected-credential-per-role mapping.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    host_pass: Option<String>,
    user_pass: Option<String>,
}

impl AccessGate {
    #[must_use]
    pub fn new(host_pass: Option<String>, user_pass: Option<String>) -> Self {
        Self { host_pass, user_pass }
    }

    /// Admit iff no secret is configured for the role or the supplied
    /// credential matches exactly.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] on a missing or mismatched credential.
    pub fn authorize(&self, role: Role, supplied: Option<&str>) -> Result<(), AuthError> {
        let expected = match role {
            Role::Host => self.host_pass.as_deref(),
            Role::User => self.user_pass.as_deref(),
            Role::Board => None,
        };
        match expected {
            None => Ok(()),
            Some(secret) if supplied == Some(secret) => Ok(()),
            Some(_) => Err(AuthError::Rejected(role)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ungated_role_admits_anything() {
        let gate = AccessGate::new(None, None);
        assert!(gate.authorize(Role::Host, None).is_ok());
        assert!(gate.authorize(Role::User, Some("whatever")).is_ok());
    }

    #[test]
    fn matching_credential_admits() {
        let gate = AccessGate::new(Some("xyz".into()), Some("abc".into()));
        assert!(gate.authorize(Role::Host, Some("xyz")).is_ok());
        assert!(gate.authorize(Role::User, Some("abc")).is_ok());
    }

    #[test]
    fn wrong_or_missing_credential_is_rejected() {
        let gate = AccessGate::new(Some("xyz".into()), None);
        assert!(gate.authorize(Role::Host, Some("nope")).is_err());
        assert!(gate.authorize(Role::Host, None).is_err());
    }

    #[test]
    fn board_is_always_ungated() {
        let gate = AccessGate::new(Some("xyz".into()), Some("abc".into()));
        assert!(gate.authorize(Role::Board, None).is_ok());
    }
}
