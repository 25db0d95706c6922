//! Host and process figures for the `.info` command.

use sysinfo::{CpuRefreshKind, ProcessRefreshKind, ProcessesToUpdate, System};

/// Point-in-time snapshot. Zero where the platform does not report a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemReport {
    /// Resident set size of this process, in bytes.
    pub resident: u64,
    /// Virtual memory of this process, in bytes.
    pub virtual_memory: u64,
    pub cpu_model: String,
    pub cores: usize,
    pub free_memory: u64,
    pub total_memory: u64,
    /// 1, 5 and 15 minute load averages.
    pub load_average: [f64; 3],
}

impl SystemReport {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_list(CpuRefreshKind::nothing());

        let pid = sysinfo::get_current_pid().ok();
        if let Some(pid) = pid {
            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                false,
                ProcessRefreshKind::nothing().with_memory(),
            );
        }
        let process = pid.and_then(|p| sys.process(p));

        let total_memory = sys.total_memory();
        // available_memory() is 0 on macOS.
        let free_memory = match sys.available_memory() {
            0 => total_memory.saturating_sub(sys.used_memory()),
            v => v,
        };
        let load = System::load_average();

        Self {
            resident: process.map(|p| p.memory()).unwrap_or(0),
            virtual_memory: process.map(|p| p.virtual_memory()).unwrap_or(0),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .unwrap_or_default(),
            cores: sys.cpus().len(),
            free_memory,
            total_memory,
            load_average: [load.one, load.five, load.fifteen],
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_reports_this_process() {
        let report = SystemReport::collect();
        assert!(report.total_memory > 0);
        assert!(report.free_memory <= report.total_memory);
        assert!(report.cores > 0);
        assert!(report.resident > 0);
    }
}
