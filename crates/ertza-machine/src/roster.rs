use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Failure reported by a slave transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RemoteSendError(pub String);

/// A slave drive that forwarded values can be sent to.
pub trait SlaveRemote: Send + Sync {
    fn serial(&self) -> &str;
    fn set_to_remote(&self, key: &str, value: &Value) -> Result<(), RemoteSendError>;
}

/// Read-only snapshot of the attached slaves.
///
/// Replaced wholesale when slaves attach or detach; holders never see a
/// partial update.
#[derive(Clone, Default)]
pub struct SlaveRoster {
    slaves: Arc<[Arc<dyn SlaveRemote>]>,
}

impl SlaveRoster {
    pub fn new(slaves: Vec<Arc<dyn SlaveRemote>>) -> Self {
        Self {
            slaves: slaves.into(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SlaveRemote>> {
        self.slaves.iter()
    }

    pub fn serials(&self) -> Vec<String> {
        self.slaves.iter().map(|s| s.serial().to_string()).collect()
    }

    pub fn get(&self, serial: &str) -> Option<&Arc<dyn SlaveRemote>> {
        self.slaves.iter().find(|s| s.serial() == serial)
    }

    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }
}

impl fmt::Debug for SlaveRoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.serials()).finish()
    }
}
