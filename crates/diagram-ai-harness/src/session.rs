use std::sync::Arc;

use uuid::Uuid;

use crate::harness::HarnessInner;
use crate::model::ModelRef;
use crate::turn::TurnBuilder;

/// How to open a [`Session`].
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Label carried into log records.
    pub name: String,
    /// Resume an existing conversation under this id instead of minting one.
    pub id: Option<Uuid>,
}

impl SessionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn resume(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

/// A conversation about one diagram. Every turn started here shares the
/// session id, which is what the quota gate counts against.
#[derive(Clone)]
pub struct Session {
    harness: Arc<HarnessInner>,
    id: Uuid,
    name: String,
}

impl Session {
    pub(crate) fn new(harness: Arc<HarnessInner>, config: SessionConfig) -> Self {
        let SessionConfig { name, id } = config;
        Self {
            harness,
            id: id.unwrap_or_else(Uuid::new_v4),
            name,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn turn(&self, model: ModelRef) -> TurnBuilder {
        TurnBuilder::new(Arc::clone(&self.harness), self.id, self.name.clone(), model)
    }
}
