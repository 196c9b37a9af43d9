use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::debug;

use crate::errors::HarnessError;
use crate::model::ProviderId;
use crate::provider::ProviderAdapter;
use crate::quota::{QuotaGate, Unlimited};
use crate::session::{Session, SessionConfig};

/// Shared state behind every [`Harness`] clone and the sessions it opens.
pub(crate) struct HarnessInner {
    providers: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    quota: Arc<dyn QuotaGate>,
}

impl HarnessInner {
    pub(crate) fn provider(&self, id: &ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(id).map(Arc::clone)
    }

    pub(crate) fn quota(&self) -> Arc<dyn QuotaGate> {
        Arc::clone(&self.quota)
    }
}

/// Registry of model providers plus the quota gate. Cheap to clone.
#[derive(Clone)]
pub struct Harness {
    pub(crate) inner: Arc<HarnessInner>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Opens a chat session. Quota is counted per session id, so passing the
    /// id of an earlier session keeps counting against the same budget.
    pub fn session(&self, config: SessionConfig) -> Session {
        Session::new(Arc::clone(&self.inner), config)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderId> {
        self.inner.providers.keys()
    }
}

#[derive(Default)]
pub struct HarnessBuilder {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    quota: Option<Arc<dyn QuotaGate>>,
}

impl HarnessBuilder {
    pub fn register_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Gate consulted before every turn. Without one, turns are never limited.
    pub fn quota_gate(mut self, gate: Arc<dyn QuotaGate>) -> Self {
        self.quota = Some(gate);
        self
    }

    /// Fails with [`HarnessError::Config`] when two adapters claim the same id.
    pub fn build(self) -> Result<Harness, HarnessError> {
        let mut providers = HashMap::with_capacity(self.providers.len());
        for adapter in self.providers {
            match providers.entry(adapter.id()) {
                Entry::Occupied(slot) => {
                    return Err(HarnessError::Config(format!(
                        "provider '{}' registered twice",
                        slot.key()
                    )));
                }
                Entry::Vacant(slot) => {
                    debug!(provider = %slot.key(), "registered provider");
                    slot.insert(adapter);
                }
            }
        }
        let quota = self.quota.unwrap_or_else(|| Arc::new(Unlimited));
        Ok(Harness {
            inner: Arc::new(HarnessInner { providers, quota }),
        })
    }
}
