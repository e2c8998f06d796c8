//! Access token selection for artifact and catalog URLs.
//!
//! Priority: explicit per-call credential, then the environment variable
//! registered for the URL's host prefix, then the caller's value verbatim.

use serde::{Deserialize, Serialize};

/// Maps a URL prefix to the environment variable holding its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHost {
    pub prefix: String,
    pub env: String,
}

impl CredentialHost {
    pub fn new(prefix: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            env: env.into(),
        }
    }
}

/// Built-in host table: CivitAI and Hugging Face.
pub fn default_hosts() -> Vec<CredentialHost> {
    vec![
        CredentialHost::new("https://civitai.com", "CIVITAI_TOKEN"),
        CredentialHost::new("https://huggingface.co", "HUGGINGFACE_TOKEN"),
    ]
}

#[derive(Debug, Clone)]
pub struct CredentialSelector {
    hosts: Vec<CredentialHost>,
}

impl Default for CredentialSelector {
    fn default() -> Self {
        Self::new(default_hosts())
    }
}

impl CredentialSelector {
    pub fn new(hosts: Vec<CredentialHost>) -> Self {
        Self { hosts }
    }

    /// Picks the credential for `url`, reading host tokens from the process environment.
    pub fn select(&self, url: &str, supplied: Option<&str>) -> Option<String> {
        self.select_with(url, supplied, |name| std::env::var(name).ok())
    }

    /// Same as `select` with an injected environment lookup.
    ///
    /// A non-empty `supplied` always wins. For a known host an empty or missing
    /// `supplied` yields that host's variable (or `None`). For an unknown host
    /// `supplied` is returned unchanged, even when it is `Some("")`.
    pub fn select_with<F>(&self, url: &str, supplied: Option<&str>, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = supplied.filter(|s| !s.is_empty());
        match self.hosts.iter().find(|h| url.starts_with(&h.prefix)) {
            Some(host) => explicit.map(str::to_string).or_else(|| lookup(&host.env)),
            None => supplied.map(str::to_string),
        }
    }
}

/// Value for an `Authorization` header, if the token is worth sending.
pub fn bearer_header(token: Option<&str>) -> Option<String> {
    token
        .filter(|t| !t.is_empty())
        .map(|t| format!("Authorization: Bearer {}", t))
}
