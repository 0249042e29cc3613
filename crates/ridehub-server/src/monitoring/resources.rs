//! Host CPU, memory and disk sampling

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("resource sampling task failed: {0}")]
    Task(String),

    #[error("no disk mounted at or above {0}")]
    NoDisk(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuUsage {
    pub usage_percent: f64,
    pub cores: usize,
    pub load_average: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
}

#[async_trait]
pub trait ResourceSampler: Send + Sync {
    async fn sample(&self) -> Result<ResourceSnapshot, SampleError>;
}

/// Percentage of `used` over `total`, 0 for an empty total
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

/// [`ResourceSampler`] backed by `sysinfo`
///
/// Reports the disk whose mount point is the longest prefix of `disk_path`.
#[derive(Debug, Clone)]
pub struct SysinfoSampler {
    disk_path: PathBuf,
}

impl SysinfoSampler {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            disk_path: disk_path.into(),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl ResourceSampler for SysinfoSampler {
    async fn sample(&self) -> Result<ResourceSnapshot, SampleError> {
        let path = self.disk_path.clone();
        tokio::task::spawn_blocking(move || sample_blocking(&path))
            .await
            .map_err(|e| SampleError::Task(e.to_string()))?
    }
}

fn sample_blocking(disk_path: &Path) -> Result<ResourceSnapshot, SampleError> {
    let mut sys = System::new();

    // CPU usage is a delta between two refreshes
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let load = System::load_average();
    let cpu = CpuUsage {
        usage_percent: f64::from(sys.global_cpu_usage()),
        cores: sys.cpus().len(),
        load_average: [load.one, load.five, load.fifteen],
    };

    let memory = MemoryUsage {
        total_bytes: sys.total_memory(),
        used_bytes: sys.used_memory(),
        usage_percent: usage_percent(sys.used_memory(), sys.total_memory()),
    };

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| disk_path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .ok_or_else(|| SampleError::NoDisk(disk_path.display().to_string()))?;

    let total = disk.total_space();
    let used = total.saturating_sub(disk.available_space());
    let disk = DiskUsage {
        mount_point: disk.mount_point().display().to_string(),
        total_bytes: total,
        used_bytes: used,
        usage_percent: usage_percent(used, total),
    };

    Ok(ResourceSnapshot { cpu, memory, disk })
}
