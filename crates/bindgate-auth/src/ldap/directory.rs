//! Directory connection seam and scoped session release

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// LDAP result code for invalidCredentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered the bind with a non-success result code
    #[error("bind rejected for {dn}: rc={rc} {text}")]
    BindRejected { dn: String, rc: u32, text: String },

    #[error("search failed: {0}")]
    SearchFailed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session already released")]
    Released,

    #[error("ldap error: {0}")]
    Ldap(#[from] ldap3::LdapError),
}

impl DirectoryError {
    /// Whether the directory itself refused the bind, as opposed to the
    /// request never getting an answer
    pub fn is_bind_rejection(&self) -> bool {
        matches!(self, DirectoryError::BindRejected { .. })
    }
}

/// Opens fresh directory sessions. One session per verification.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError>;
}

/// One open directory session
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind. Non-zero result codes surface as `BindRejected`.
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Subtree search under `base`, returning the DNs of matching entries in
    /// server order.
    async fn search_dns(&mut self, base: &str, filter: &str) -> Result<Vec<String>, DirectoryError>;

    /// Unbind and close the session
    async fn close(&mut self) -> Result<(), DirectoryError>;
}

/// Stand-in left behind once the real session has been handed to `close`
struct ReleasedSession;

#[async_trait]
impl DirectorySession for ReleasedSession {
    async fn bind(&mut self, _dn: &str, _password: &str) -> Result<(), DirectoryError> {
        Err(DirectoryError::Released)
    }

    async fn search_dns(&mut self, _base: &str, _filter: &str) -> Result<Vec<String>, DirectoryError> {
        Err(DirectoryError::Released)
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Owns a session and closes it exactly once.
///
/// `release` is the normal exit. If the guard is dropped first (the owning
/// future was cancelled) the close is spawned onto the current runtime.
pub struct SessionGuard {
    session: Box<dyn DirectorySession>,
    released: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn DirectorySession>) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub fn session(&mut self) -> &mut dyn DirectorySession {
        self.session.as_mut()
    }

    /// Close the session
    pub async fn release(mut self) {
        let mut session = self.take();
        if let Err(e) = session.close().await {
            debug!("Directory unbind failed: {}", e);
        }
    }

    fn take(&mut self) -> Box<dyn DirectorySession> {
        self.released = true;
        std::mem::replace(&mut self.session, Box::new(ReleasedSession))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let mut session = self.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Verification abandoned, releasing directory session in background");
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        debug!("Directory unbind failed: {}", e);
                    }
                });
            }
            Err(_) => {
                warn!("Directory session dropped outside a runtime; closing without unbind");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DirectorySession for CountingSession {
        async fn bind(&mut self, _dn: &str, _password: &str) -> Result<(), DirectoryError> {
            Ok(())
        }

        async fn search_dns(&mut self, _base: &str, _filter: &str) -> Result<Vec<String>, DirectoryError> {
            Ok(vec![])
        }

        async fn close(&mut self) -> Result<(), DirectoryError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn guard(closes: &Arc<AtomicUsize>) -> SessionGuard {
        SessionGuard::new(Box::new(CountingSession {
            closes: closes.clone(),
        }))
    }

    #[tokio::test]
    async fn test_release_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut g = guard(&closes);
        assert!(g.session().bind("cn=a", "pw").await.is_ok());
        g.release().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_closes_in_background() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(guard(&closes));

        for _ in 0..100 {
            if closes.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_outside_runtime_does_not_panic() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(guard(&closes));
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bind_rejection_classification() {
        let rejected = DirectoryError::BindRejected {
            dn: "cn=a".into(),
            rc: RC_INVALID_CREDENTIALS,
            text: String::new(),
        };
        assert!(rejected.is_bind_rejection());
        assert!(!DirectoryError::Transport("reset".into()).is_bind_rejection());
    }
}
