//! Importer that replays scripted results.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use import_core::{ImportAck, ImportError};

/// A scripted import result.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Succeed.
    Ok,

    /// Fail with a transient error.
    Transient,

    /// Fail with a permanent error.
    Permanent,
}

/// State shared between clones.
#[derive(Debug, Default)]
struct Inner {
    /// Results to return, in order. Empty means success.
    script: VecDeque<Step>,

    /// Every message body passed to `import`.
    imported: Vec<Vec<u8>>,
}

/// Importer returning scripted results and recording every attempt.
#[derive(Debug, Clone, Default)]
pub struct ScriptedImporter {
    /// Shared state.
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedImporter {
    /// An importer that always succeeds.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Queue a successful attempt.
    pub fn then_ok(self) -> Self {
        self.push(Step::Ok)
    }

    /// Queue a transient failure.
    pub fn then_transient(self) -> Self {
        self.push(Step::Transient)
    }

    /// Queue a permanent failure.
    pub fn then_permanent(self) -> Self {
        self.push(Step::Permanent)
    }

    /// Number of `import` calls so far.
    pub fn attempts(&self) -> usize {
        crate::lock(&self.inner).imported.len()
    }

    /// Bodies passed to `import`, in call order.
    pub fn imported(&self) -> Vec<Vec<u8>> {
        crate::lock(&self.inner).imported.clone()
    }

    /// Append a step to the script.
    fn push(self, step: Step) -> Self {
        crate::lock(&self.inner).script.push_back(step);
        self
    }
}

impl import_core::Importer for ScriptedImporter {
    async fn import(&self, raw: &[u8]) -> Result<ImportAck, ImportError> {
        let (step, attempt) = {
            let mut inner = crate::lock(&self.inner);
            inner.imported.push(raw.to_vec());
            (
                inner.script.pop_front().unwrap_or(Step::Ok),
                inner.imported.len(),
            )
        };

        match step {
            Step::Ok => Ok(ImportAck {
                id: format!("fake-{attempt}"),
            }),
            Step::Transient => Err(ImportError::Transient("scripted transient failure".into())),
            Step::Permanent => Err(ImportError::Permanent("scripted permanent failure".into())),
        }
    }
}
