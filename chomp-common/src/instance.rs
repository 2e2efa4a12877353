//! Per-process identity (spec.md §3 "Instance"), grounded on the
//! instance-id generation in `src/state.py` of `examples/original_source`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

/// Identifies one running worker process within the cluster. The `uid` is
/// generated once at process start and used to tag claims so a crashed
/// worker's leases can be recognized and force-reclaimed by others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub uid: String,
    pub hostname: String,
    pub pid: u32,
    pub started_at: u64,
}

impl Instance {
    pub fn new() -> Self {
        let hostname = System::host_name().unwrap_or_else(|| "unknown".to_string());
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Instance {
            uid: Uuid::new_v4().to_string(),
            hostname,
            pid: std::process::id(),
            started_at,
        }
    }

    /// Tag embedded in claim values and log spans, e.g. `host-1234@a1b2c3`.
    pub fn tag(&self) -> String {
        format!("{}-{}@{}", self.hostname, self.pid, &self.uid[..8.min(self.uid.len())])
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_instance_gets_a_distinct_uid() {
        let a = Instance::new();
        let b = Instance::new();
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn tag_embeds_pid_and_uid_prefix() {
        let inst = Instance::new();
        let tag = inst.tag();
        assert!(tag.contains(&inst.pid.to_string()));
        assert!(tag.contains(&inst.uid[..8]));
    }
}
