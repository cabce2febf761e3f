//! Outbound proxy pool.
//!
//! Proxies are read once from a newline-delimited file
//! (`[scheme://][user:pass@]host:port` per line) and picked uniformly at
//! random per connection attempt. An absent or empty file means direct
//! connections.

use crate::errors::EngineError;
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub host: String,
    pub port: u16,
    /// `(username, password)` when the entry carries credentials.
    pub auth: Option<(String, String)>,
}

impl ProxyDescriptor {
    /// Parse a raw proxy entry. The scheme prefix is accepted and discarded;
    /// all proxies are dialed as HTTP CONNECT proxies.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Validation("empty proxy entry".to_string()));
        }

        let without_scheme = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };

        let (auth, address) = match without_scheme.rsplit_once('@') {
            Some((auth, address)) => (Some(auth), address),
            None => (None, without_scheme),
        };

        let (host, port) = address.rsplit_once(':').ok_or_else(|| {
            EngineError::Validation(format!("proxy entry {trimmed:?} has no port"))
        })?;
        if host.is_empty() {
            return Err(EngineError::Validation(format!(
                "proxy entry {trimmed:?} has no host"
            )));
        }
        let port: u16 = port.parse().map_err(|_| {
            EngineError::Validation(format!("proxy entry {trimmed:?} has a bad port"))
        })?;

        let auth = auth.map(|a| match a.split_once(':') {
            Some((user, pass)) => (user.to_string(), pass.to_string()),
            None => (a.to_string(), String::new()),
        });

        Ok(Self {
            host: host.to_string(),
            port,
            auth,
        })
    }

    /// Dialable URL without credentials; auth is applied separately.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================
// POOL
// ============================================

#[derive(Debug, Default)]
pub struct ProxyPool {
    entries: Vec<ProxyDescriptor>,
}

impl ProxyPool {
    /// Load the pool from a file. A missing file is not an error: the bot
    /// falls back to direct connections, as does any unparseable line.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                let pool = Self::from_lines(content.lines());
                info!("loaded {} proxies from {}", pool.len(), path.display());
                pool
            }
            Err(_) => {
                info!("{} not found, connecting directly", path.display());
                Self::default()
            }
        }
    }

    pub fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let mut entries = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match ProxyDescriptor::parse(line) {
                Ok(proxy) => entries.push(proxy),
                Err(e) => warn!("skipping proxy entry: {e}"),
            }
        }
        Self { entries }
    }

    /// One proxy chosen uniformly at random, or `None` for an empty pool.
    pub fn pick(&self) -> Option<&ProxyDescriptor> {
        self.entries.choose(&mut rand::thread_rng())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
