//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gencache_core::{KeywordRelevance, RelevanceCheck};
use gencache_runtime::{GenerationRequest, ProviderError, TextProvider};
use parking_lot::Mutex;

/// One scripted provider reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(ProviderError),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Reply::Fail(ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(retry_after_secs)),
            message: "quota exhausted".to_string(),
        })
    }

    pub fn unauthorized() -> Self {
        Reply::Fail(ProviderError::Auth(401))
    }

    pub fn unavailable() -> Self {
        Reply::Fail(ProviderError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })
    }
}

/// Provider answering from per-model queues and logging every call.
///
/// A model whose queue is empty gets the fallback reply.
pub struct ScriptedProvider {
    name: &'static str,
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    otherwise: Reply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, otherwise: Reply) -> Self {
        Self {
            name,
            script: Mutex::new(HashMap::new()),
            otherwise,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(self, model: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script
            .lock()
            .entry(model.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Models called so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.lock().push(request.model.clone());
        let reply = self
            .script
            .lock()
            .get_mut(&request.model)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.otherwise.clone());
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Keyword relevance that can be switched off to seed stale entries.
pub struct ToggleRelevance {
    lenient: AtomicBool,
    inner: KeywordRelevance,
}

impl ToggleRelevance {
    pub fn lenient() -> Arc<Self> {
        Arc::new(Self {
            lenient: AtomicBool::new(true),
            inner: KeywordRelevance::default(),
        })
    }

    pub fn enforce(&self) {
        self.lenient.store(false, Ordering::SeqCst);
    }
}

impl RelevanceCheck for ToggleRelevance {
    fn is_relevant(&self, query: &str, content: &str) -> bool {
        self.lenient.load(Ordering::SeqCst) || self.inner.is_relevant(query, content)
    }
}

pub fn article(heading: &str) -> String {
    format!("<article><h1>{heading}</h1><p>{heading} explained step by step.</p></article>")
}
