//! In-memory directory for tests
//!
//! Behaves like a small LDAP server for the operations the verifier uses:
//! simple bind, subtree search on an equality filter, unbind. It counts open
//! sessions so tests can assert nothing leaks, and can be told to fail at a
//! given protocol step.

use crate::ldap::{DirectoryConnector, DirectoryError, DirectorySession, RC_INVALID_CREDENTIALS};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Protocol step at which the directory misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Connection refused
    Connect,
    /// Service account bind rejected
    ServiceBind,
    /// Search aborted mid-flight
    Search,
    /// Connection lost during the user bind
    UserBind,
}

#[derive(Debug, Clone)]
struct Entry {
    cn: String,
    dn: String,
    password: String,
}

#[derive(Default)]
struct State {
    entries: Mutex<Vec<Entry>>,
    failure: Mutex<Option<Failure>>,
    search_delay: Mutex<Option<Duration>>,
    filters: Mutex<Vec<String>>,
    open_sessions: AtomicUsize,
    connections_opened: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to an in-memory directory. Clones see the same state.
#[derive(Clone)]
pub struct InMemoryDirectory {
    service_dn: String,
    service_password: String,
    state: Arc<State>,
}

impl InMemoryDirectory {
    pub fn new(service_dn: &str, service_password: &str) -> Self {
        Self {
            service_dn: service_dn.to_string(),
            service_password: service_password.to_string(),
            state: Arc::new(State::default()),
        }
    }

    /// Add a user entry. Entries are returned by searches in insertion order.
    pub fn with_user(self, cn: &str, dn: &str, password: &str) -> Self {
        lock(&self.state.entries).push(Entry {
            cn: cn.to_string(),
            dn: dn.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn fail_at(self, failure: Failure) -> Self {
        self.set_failure(Some(failure));
        self
    }

    /// Make every search wait before answering
    pub fn with_search_delay(self, delay: Duration) -> Self {
        *lock(&self.state.search_delay) = Some(delay);
        self
    }

    pub fn set_failure(&self, failure: Option<Failure>) {
        *lock(&self.state.failure) = failure;
    }

    /// Sessions connected but not yet closed
    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    pub fn connections_opened(&self) -> usize {
        self.state.connections_opened.load(Ordering::SeqCst)
    }

    /// Every filter received by a search, in order
    pub fn filters(&self) -> Vec<String> {
        lock(&self.state.filters).clone()
    }

    fn failure(&self) -> Option<Failure> {
        *lock(&self.state.failure)
    }
}

#[async_trait]
impl DirectoryConnector for InMemoryDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        if self.failure() == Some(Failure::Connect) {
            return Err(DirectoryError::ConnectionFailed("connection refused".into()));
        }

        self.state.connections_opened.fetch_add(1, Ordering::SeqCst);
        self.state.open_sessions.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(InMemorySession {
            directory: self.clone(),
            bound_as: None,
            closed: false,
        }))
    }
}

struct InMemorySession {
    directory: InMemoryDirectory,
    bound_as: Option<String>,
    closed: bool,
}

impl InMemorySession {
    fn reject(dn: &str) -> DirectoryError {
        DirectoryError::BindRejected {
            dn: dn.to_string(),
            rc: RC_INVALID_CREDENTIALS,
            text: "Invalid credentials".to_string(),
        }
    }
}

#[async_trait]
impl DirectorySession for InMemorySession {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let dir = &self.directory;
        self.bound_as = None;

        if dn == dir.service_dn {
            if dir.failure() == Some(Failure::ServiceBind) || password != dir.service_password {
                return Err(Self::reject(dn));
            }
            self.bound_as = Some(dn.to_string());
            return Ok(());
        }

        if dir.failure() == Some(Failure::UserBind) {
            return Err(DirectoryError::Transport("connection reset by peer".into()));
        }

        let entries = lock(&dir.state.entries);
        let matched = entries
            .iter()
            .any(|entry| entry.dn == dn && entry.password == password);
        drop(entries);

        if !matched {
            return Err(Self::reject(dn));
        }

        self.bound_as = Some(dn.to_string());
        Ok(())
    }

    async fn search_dns(&mut self, base: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        let dir = self.directory.clone();
        lock(&dir.state.filters).push(filter.to_string());

        let delay = *lock(&dir.state.search_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if dir.failure() == Some(Failure::Search) {
            return Err(DirectoryError::SearchFailed("operations error".into()));
        }

        if self.bound_as.as_deref() != Some(dir.service_dn.as_str()) {
            return Err(DirectoryError::SearchFailed("insufficient access rights".into()));
        }

        let value = parse_cn_filter(filter)
            .ok_or_else(|| DirectoryError::SearchFailed(format!("unsupported filter {}", filter)))?;

        let base = base.to_ascii_lowercase();
        let dns = lock(&dir.state.entries)
            .iter()
            .filter(|entry| entry.dn.to_ascii_lowercase().ends_with(&base))
            .filter(|entry| ldap3::ldap_escape(entry.cn.as_str()) == value)
            .map(|entry| entry.dn.clone())
            .collect();

        Ok(dns)
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        if !self.closed {
            self.closed = true;
            self.directory.state.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Extract the escaped value from a `(cn=value)` filter
fn parse_cn_filter(filter: &str) -> Option<&str> {
    let inner = filter.strip_prefix('(')?.strip_suffix(')')?;
    let (attr, value) = inner.split_once('=')?;
    attr.eq_ignore_ascii_case("cn").then_some(value)
}
