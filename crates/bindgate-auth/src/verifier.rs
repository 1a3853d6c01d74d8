//! Credential verification
//!
//! Runs the two-step bind protocol on a single fresh session:
//! connect, bind as the service identity, search for the user's DN, bind as
//! that DN with the supplied password. The session is released once,
//! whatever the outcome.

use crate::ldap::{
    build_user_filter, DirectoryConnector, DirectorySession, LdapConnector, ServiceIdentity,
    SessionGuard,
};
use bindgate_core::config::{LdapConfig, MatchPolicy};
use bindgate_core::{Credential, VerificationOutcome};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct CredentialVerifier {
    connector: Arc<dyn DirectoryConnector>,
    identity: Arc<ServiceIdentity>,
    search_base: String,
    user_filter: String,
    match_policy: MatchPolicy,
}

impl CredentialVerifier {
    /// Create a verifier talking to the directory named in `config`
    pub fn from_config(config: &LdapConfig) -> Self {
        Self::with_connector(config, Arc::new(LdapConnector::from_config(config)))
    }

    /// Create a verifier with a custom directory connector
    pub fn with_connector(config: &LdapConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            connector,
            identity: Arc::new(ServiceIdentity::from_config(config)),
            search_base: config.search_base.clone(),
            user_filter: config.user_filter.clone(),
            match_policy: config.match_policy,
        }
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    /// Verify a credential against the directory.
    ///
    /// Never retries. Callers wanting bounded latency wrap this in a timeout;
    /// dropping the future releases the session.
    pub async fn verify(&self, credential: &Credential) -> VerificationOutcome {
        let session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Cannot reach LDAP directory");
                return VerificationOutcome::ServiceUnavailable;
            }
        };

        let mut guard = SessionGuard::new(session);
        let outcome = self.authenticate(guard.session(), credential).await;
        guard.release().await;

        debug!(username = %credential.username(), outcome = %outcome, "Verification finished");
        outcome
    }

    async fn authenticate(
        &self,
        session: &mut dyn DirectorySession,
        credential: &Credential,
    ) -> VerificationOutcome {
        // Step 1: Bind with service account
        if let Err(e) = session
            .bind(self.identity.dn(), self.identity.password())
            .await
        {
            error!(service_dn = %self.identity.dn(), error = %e, "Cannot bind LDAP with service account");
            return VerificationOutcome::ServiceUnavailable;
        }

        // Step 2: Search for user
        let filter = build_user_filter(&self.user_filter, credential.username());
        debug!("Searching for user with filter: {}", filter);

        let dns = match session.search_dns(&self.search_base, &filter).await {
            Ok(dns) => dns,
            Err(e) => {
                error!(error = %e, "User search failed");
                return VerificationOutcome::ServiceUnavailable;
            }
        };

        let user_dn = match self.select_dn(dns, credential.username()) {
            Ok(dn) => dn,
            Err(outcome) => return outcome,
        };

        debug!("Found user DN: {}", user_dn);

        // Step 3: Verify user password by binding as the user
        match session.bind(&user_dn, credential.password()).await {
            Ok(()) => {
                info!(dn = %user_dn, "User authenticated");
                VerificationOutcome::Authenticated
            }
            Err(e) if e.is_bind_rejection() => {
                warn!(dn = %user_dn, error = %e, "User not authorized (bind rejected)");
                VerificationOutcome::InvalidCredential
            }
            Err(e) => {
                error!(dn = %user_dn, error = %e, "User bind did not complete");
                VerificationOutcome::ServiceUnavailable
            }
        }
    }

    fn select_dn(&self, dns: Vec<String>, username: &str) -> Result<String, VerificationOutcome> {
        let count = dns.len();
        let mut dns = dns.into_iter();

        match (dns.next(), count) {
            (None, _) => {
                warn!(username = %username, "User not found in directory");
                Err(VerificationOutcome::InvalidCredential)
            }
            (Some(dn), 1) => Ok(dn),
            (Some(dn), _) => match self.match_policy {
                MatchPolicy::First => {
                    warn!(username = %username, matches = count, "Ambiguous username, using first entry");
                    Ok(dn)
                }
                MatchPolicy::Reject => {
                    error!(username = %username, matches = count, "Ambiguous username, refusing to bind");
                    Err(VerificationOutcome::ServiceUnavailable)
                }
            },
        }
    }
}
