//! Instance vitals ingester, grounded on `src/ingesters/monitor.py` in
//! `examples/original_source`. CPU/memory come from `sysinfo`; disk I/O
//! rate is derived from a previous-sample delta held on the runner, the
//! same `_last_disk_bytes`/`_last_disk_time` pattern as the original's
//! module-level state.

use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tracing::error;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

struct DiskSample {
    bytes: u64,
    at: Instant,
}

pub struct MonitorRunner {
    sys: Mutex<System>,
    last_disk: Mutex<Option<DiskSample>>,
}

impl Default for MonitorRunner {
    fn default() -> Self {
        let mut sys = System::new_all();
        sys.refresh_cpu_usage();
        MonitorRunner {
            sys: Mutex::new(sys),
            last_disk: Mutex::new(None),
        }
    }
}

impl MonitorRunner {
    fn sample(&self) -> (f64, u64, f64) {
        let mut sys = self.sys.lock().expect("monitor system lock poisoned");
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        let cpu_usage = sys.global_cpu_usage() as f64;
        let memory_usage = sys.used_memory();

        let disks = Disks::new_with_refreshed_list();
        let current_bytes: u64 = disks
            .iter()
            .map(|d| d.usage().total_read_bytes + d.usage().total_written_bytes)
            .sum();

        let now = Instant::now();
        let mut last = self.last_disk.lock().expect("monitor disk lock poisoned");
        let disk_rate = match last.as_ref() {
            Some(prev) => {
                let elapsed = now.duration_since(prev.at).as_secs_f64();
                if elapsed > 0.0 {
                    (current_bytes.abs_diff(prev.bytes)) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        *last = Some(DiskSample { bytes: current_bytes, at: now });

        (cpu_usage, memory_usage, disk_rate)
    }
}

#[async_trait]
impl IngesterRunner for MonitorRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let (cpu_usage, memory_usage, disk_usage) = self.sample();

        let values: &[(&str, FieldValue)] = &[
            ("instance_tag", FieldValue::String(ctx.proc_id.clone())),
            ("cpu_usage", FieldValue::Float(cpu_usage)),
            ("memory_usage", FieldValue::Int(memory_usage as i64)),
            ("disk_usage", FieldValue::Float(disk_usage)),
        ];
        for (name, value) in values {
            if let Some(field) = ingester.field_by_name_mut(name) {
                field.value = value.clone();
            }
        }
        if ingester.field_by_name("cpu_usage").is_none() {
            error!(ingester = %ingester.name, "monitor ingester has no cpu_usage field");
        }

        finish_epoch(ctx, ingester).await
    }
}
