// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collect, transform, submit.
//!
//! ```text
//!                    ┌─ collect_snapshot (memory, disk, cpu, processes) ─┐
//! InstanceMetadata ──┤                                                   ├─ assemble ─ publish
//!                    └─ resolve_group (optional autoscaling lookup) ─────┘
//! ```
//!
//! The metadata document is fetched once by the caller and passed in. Collection and the
//! autoscaling lookup share no state and are joined on one task; the blocking host readers
//! run on tokio's blocking pool so the lookup progresses meanwhile. Assembly is a pure
//! function of their results, which is what the tests drive directly.

use crate::config::AgentConfig;
use crate::error::AgentError;
use ec2_cloudwatch::autoscaling::{resolve_group, GroupLookup};
use ec2_cloudwatch::dimensions::{build_dimensions, Dimension, AUTOSCALING_GROUP_DIMENSION};
use ec2_cloudwatch::error::AutoscalingError;
use ec2_cloudwatch::metadata::{InstanceMetadata, FILE_SYSTEM_KEY};
use ec2_cloudwatch::metric::{MetricBatch, Unit, MAX_DATUMS_PER_REQUEST};
use ec2_cloudwatch::publisher::{publish, MetricSink};
use ec2_metrics_collector::cpu::sample_cpu_utilization;
use ec2_metrics_collector::disk::{measure_disk, DiskStats};
use ec2_metrics_collector::memory::{measure_memory, MemoryStats};
use ec2_metrics_collector::partitions::physical_partitions;
use ec2_metrics_collector::process::is_process_running;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub const MEMORY_UTILIZATION: &str = "MemoryUtilization";
pub const MEMORY_USED: &str = "MemoryUsed";
pub const MEMORY_AVAILABLE: &str = "MemoryAvailable";
pub const SWAP_UTILIZATION: &str = "SwapUtilization";
pub const SWAP_USED: &str = "SwapUsed";
pub const SWAP_CACHED: &str = "SwapCached";
pub const DISK_SPACE_UTILIZATION: &str = "DiskSpaceUtilization";
pub const DISK_SPACE_USED: &str = "DiskSpaceUsed";
pub const DISK_SPACE_AVAILABLE: &str = "DiskSpaceAvailable";
pub const DISK_INODES_UTILIZATION: &str = "DiskInodesUtilization";
pub const CPU_UTILIZATION: &str = "CPUUtilization";
pub const PROCESS_RUNNING: &str = "ProcessRunning";

const FILE_SYSTEM_DIMENSION: &str = "FileSystem";
const PROCESS_NAME_DIMENSION: &str = "ProcessName";

/// Everything read from the host during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSnapshot {
    pub memory: Option<MemoryStats>,
    /// Disk usage keyed by the path it was measured for, in measurement order.
    pub disks: Vec<(String, DiskStats)>,
    pub cpu_utilization: Option<f64>,
    pub processes: Vec<(String, bool)>,
}

/// Configured disk paths followed by any physical mount points not already listed.
pub fn disk_targets(config: &AgentConfig) -> Vec<String> {
    let mut targets = config.disk_paths.clone();
    if config.all_partitions {
        match physical_partitions() {
            Ok(partitions) => {
                for partition in partitions {
                    if !targets.contains(&partition.mount_point) {
                        targets.push(partition.mount_point);
                    }
                }
            }
            Err(e) => warn!("Unable to list physical partitions: {e}"),
        }
    }
    targets
}

/// Memory, disk and process readings. These are blocking filesystem reads.
fn read_host(config: &AgentConfig) -> HostSnapshot {
    let mut snapshot = HostSnapshot::default();

    if config.memory || config.swap {
        match measure_memory() {
            Ok(stats) => snapshot.memory = Some(stats),
            Err(e) => warn!("Skipping memory metrics: {e}"),
        }
    }

    for path in disk_targets(config) {
        match measure_disk(&path) {
            Ok(stats) => snapshot.disks.push((path, stats)),
            Err(e) => warn!("Skipping disk metrics for {path}: {e}"),
        }
    }

    snapshot.processes = config
        .processes
        .iter()
        .map(|name| (name.clone(), is_process_running(name)))
        .collect();

    snapshot
}

/// Reads every enabled statistic. A failing collector is logged and left out.
///
/// The filesystem readers run on the blocking pool, so the calling task stays free to drive
/// other futures, such as the autoscaling lookup, while they run.
pub async fn collect_snapshot(config: &AgentConfig) -> HostSnapshot {
    let owned = config.clone();
    let mut snapshot = match tokio::task::spawn_blocking(move || read_host(&owned)).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Host statistics reader failed: {e}");
            HostSnapshot::default()
        }
    };

    if config.cpu {
        match sample_cpu_utilization(config.cpu_sample).await {
            Ok(utilization) => snapshot.cpu_utilization = Some(utilization),
            Err(e) => warn!("Skipping CPU metrics: {e}"),
        }
    }

    snapshot
}

/// Adds datums for one metadata view: instance-level dimensions, plus a group-level copy
/// when the autoscaling group is known.
struct Emitter<'a> {
    batch: &'a mut MetricBatch,
    instance: Vec<Dimension>,
    group: Option<Vec<Dimension>>,
}

impl<'a> Emitter<'a> {
    fn new(
        batch: &'a mut MetricBatch,
        metadata: &InstanceMetadata,
        extra: &[Dimension],
        group: Option<&str>,
    ) -> Self {
        let mut instance = build_dimensions(metadata);
        instance.extend_from_slice(extra);

        let group = group.map(|name| {
            let mut dimensions = vec![Dimension::new(AUTOSCALING_GROUP_DIMENSION, name)];
            if let Some(file_system) = metadata.get(FILE_SYSTEM_KEY) {
                dimensions.push(Dimension::new(FILE_SYSTEM_DIMENSION, file_system));
            }
            dimensions.extend_from_slice(extra);
            dimensions
        });

        Emitter {
            batch,
            instance,
            group,
        }
    }

    fn emit(&mut self, name: &str, unit: Unit, value: f64) -> &mut Self {
        self.batch
            .add_metric(name, unit, value, self.instance.clone());
        if let Some(group) = &self.group {
            self.batch.add_metric(name, unit, value, group.clone());
        }
        self
    }
}

/// Turns a snapshot into the ordered batch to publish.
pub fn assemble(
    config: &AgentConfig,
    snapshot: &HostSnapshot,
    metadata: &InstanceMetadata,
    group: Option<&str>,
) -> MetricBatch {
    let mut batch = MetricBatch::new();

    if let Some(memory) = &snapshot.memory {
        let mut emitter = Emitter::new(&mut batch, metadata, &[], group);
        if config.memory {
            emitter
                .emit(MEMORY_UTILIZATION, Unit::Percent, memory.utilization_percent)
                .emit(MEMORY_USED, Unit::Bytes, memory.used_bytes)
                .emit(MEMORY_AVAILABLE, Unit::Bytes, memory.available_bytes);
        }
        if config.swap {
            emitter
                .emit(SWAP_UTILIZATION, Unit::Percent, memory.swap_utilization_percent)
                .emit(SWAP_USED, Unit::Bytes, memory.swap_used_bytes)
                .emit(SWAP_CACHED, Unit::Bytes, memory.swap_cached_bytes);
        }
    }

    for (path, disk) in &snapshot.disks {
        let metadata = metadata.with_file_system(path.as_str());
        Emitter::new(&mut batch, &metadata, &[], group)
            .emit(DISK_SPACE_UTILIZATION, Unit::Percent, disk.utilization_percent)
            .emit(DISK_SPACE_USED, Unit::Bytes, disk.used_bytes)
            .emit(DISK_SPACE_AVAILABLE, Unit::Bytes, disk.available_bytes)
            .emit(DISK_INODES_UTILIZATION, Unit::Percent, disk.inode_utilization_percent);
    }

    if let Some(utilization) = snapshot.cpu_utilization {
        Emitter::new(&mut batch, metadata, &[], group).emit(
            CPU_UTILIZATION,
            Unit::Percent,
            utilization,
        );
    }

    for (name, running) in &snapshot.processes {
        let extra = [Dimension::new(PROCESS_NAME_DIMENSION, name.as_str())];
        Emitter::new(&mut batch, metadata, &extra, group).emit(
            PROCESS_RUNNING,
            Unit::Count,
            if *running { 1.0 } else { 0.0 },
        );
    }

    batch
}

/// Region override from the configuration, otherwise the identity document's region.
pub fn resolve_region(
    config: &AgentConfig,
    metadata: &InstanceMetadata,
) -> Result<String, AgentError> {
    config
        .region
        .clone()
        .or_else(|| metadata.region().map(ToString::to_string))
        .ok_or(AgentError::MissingRegion)
}

pub struct Agent {
    config: Arc<AgentConfig>,
    sink: Arc<dyn MetricSink>,
    group_lookup: Option<Arc<dyn GroupLookup>>,
}

impl Agent {
    #[must_use]
    pub fn new(
        config: AgentConfig,
        sink: Arc<dyn MetricSink>,
        group_lookup: Option<Arc<dyn GroupLookup>>,
    ) -> Self {
        Agent {
            config: Arc::new(config),
            sink,
            group_lookup,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Autoscaling group of the instance, if lookups are enabled and it has one.
    ///
    /// Lookup failures never abort a run; metrics go out without group-level datums.
    pub async fn resolve_group(&self, metadata: &InstanceMetadata) -> Option<String> {
        let lookup = self.group_lookup.as_ref()?;
        let Some(instance_id) = metadata.instance_id() else {
            warn!("Instance metadata has no instanceId, skipping autoscaling lookup");
            return None;
        };

        match resolve_group(lookup.as_ref(), instance_id).await {
            Ok(group) => Some(group),
            Err(AutoscalingError::NotFound(_)) => {
                info!("Instance {instance_id} is not part of an autoscaling group");
                None
            }
            Err(AutoscalingError::Remote(e)) => {
                warn!("Autoscaling lookup failed, publishing without group: {e}");
                None
            }
        }
    }

    /// Collects, assembles and publishes once. Returns the number of datums handled.
    pub async fn run_once(&self, metadata: &InstanceMetadata) -> Result<usize, AgentError> {
        let span = info_span!("run", instance = metadata.instance_id().unwrap_or("unknown"));
        self.collect_and_publish(metadata).instrument(span).await
    }

    async fn collect_and_publish(&self, metadata: &InstanceMetadata) -> Result<usize, AgentError> {
        let (snapshot, group) = tokio::join!(
            collect_snapshot(&self.config),
            self.resolve_group(metadata)
        );
        let batch = assemble(&self.config, &snapshot, metadata, group.as_deref());

        if batch.is_empty() {
            warn!("No metrics collected, nothing to publish");
            return Ok(0);
        }

        if self.config.dry_run {
            let rendered = serde_json::to_string(&batch).unwrap_or_else(|e| format!("{e}"));
            info!("Dry run, not publishing {} datums: {rendered}", batch.len());
            return Ok(batch.len());
        }

        for chunk in batch.chunks(MAX_DATUMS_PER_REQUEST) {
            publish(self.sink.as_ref(), chunk, &self.config.namespace).await?;
        }
        info!(
            "Published {} datums to namespace {}",
            batch.len(),
            self.config.namespace
        );
        Ok(batch.len())
    }

    /// Runs immediately and then every `period` until `cancel` fires.
    ///
    /// A failed run is logged; the next tick runs regardless.
    pub async fn run_every(
        &self,
        metadata: &InstanceMetadata,
        period: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Stopping periodic collection");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(metadata).await {
                        error!("{e}");
                    }
                }
            }
        }
    }
}
