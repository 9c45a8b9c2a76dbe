//! Resource ceilings for sandboxed steps

use serde::{Deserialize, Serialize};

/// Ceilings applied to one sandboxed step.
///
/// Every field is optional. An unset field leaves isolate's own default in
/// place, and lets a lower layer show through when limits are overlaid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceLimits {
    /// CPU seconds
    pub cpu_time: Option<f64>,

    /// Wall-clock seconds
    pub wall_time: Option<f64>,

    /// Seconds of grace after a time limit before the program is killed
    pub extra_time: Option<f64>,

    pub memory_kb: Option<u64>,

    pub stack_kb: Option<u64>,

    /// Processes and threads
    pub processes: Option<u32>,

    /// Largest file the program may write
    pub output_kb: Option<u64>,

    pub open_files: Option<u32>,
}

impl ResourceLimits {
    pub const MB: u64 = 1024;

    /// Ceilings for running a submission: 10 s, 512 MB, a single process
    pub fn submission() -> Self {
        Self {
            cpu_time: Some(10.0),
            wall_time: Some(10.0),
            extra_time: Some(0.5),
            memory_kb: Some(512 * Self::MB),
            stack_kb: Some(256 * Self::MB),
            processes: Some(1),
            output_kb: Some(64 * Self::MB),
            open_files: Some(64),
        }
    }

    /// Ceilings for running a compiler, which may fork and take its time
    pub fn compiler() -> Self {
        Self {
            cpu_time: Some(30.0),
            wall_time: Some(60.0),
            memory_kb: Some(512 * Self::MB),
            processes: Some(10),
            output_kb: Some(64 * Self::MB),
            ..Self::default()
        }
    }

    /// Set both the CPU and the wall-clock limit
    pub fn time(self, seconds: f64) -> Self {
        self.cpu_time(seconds).wall_time(seconds)
    }

    pub fn cpu_time(mut self, seconds: f64) -> Self {
        self.cpu_time = Some(seconds);
        self
    }

    pub fn wall_time(mut self, seconds: f64) -> Self {
        self.wall_time = Some(seconds);
        self
    }

    pub fn memory_kb(mut self, kb: u64) -> Self {
        self.memory_kb = Some(kb);
        self
    }

    pub fn processes(mut self, count: u32) -> Self {
        self.processes = Some(count);
        self
    }

    /// Lay `top` over these limits; fields set in `top` win
    pub fn overlay(&self, top: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            cpu_time: top.cpu_time.or(self.cpu_time),
            wall_time: top.wall_time.or(self.wall_time),
            extra_time: top.extra_time.or(self.extra_time),
            memory_kb: top.memory_kb.or(self.memory_kb),
            stack_kb: top.stack_kb.or(self.stack_kb),
            processes: top.processes.or(self.processes),
            output_kb: top.output_kb.or(self.output_kb),
            open_files: top.open_files.or(self.open_files),
        }
    }

    /// The `--run` flags enforcing these limits.
    ///
    /// With cgroups enabled the memory ceiling covers the whole control group
    /// (`--cg-mem`) instead of each process's address space (`--mem`).
    pub fn isolate_flags(&self, cgroup: bool) -> Vec<String> {
        let memory_flag = if cgroup { "cg-mem" } else { "mem" };
        let flags = [
            ("time", self.cpu_time.map(|v| v.to_string())),
            ("wall-time", self.wall_time.map(|v| v.to_string())),
            ("extra-time", self.extra_time.map(|v| v.to_string())),
            (memory_flag, self.memory_kb.map(|v| v.to_string())),
            ("stack", self.stack_kb.map(|v| v.to_string())),
            ("processes", self.processes.map(|v| v.to_string())),
            ("fsize", self.output_kb.map(|v| v.to_string())),
            ("open-files", self.open_files.map(|v| v.to_string())),
        ];

        flags
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| format!("--{name}={value}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_ceilings() {
        let limits = ResourceLimits::submission();
        assert_eq!(limits.wall_time, Some(10.0));
        assert_eq!(limits.memory_kb, Some(524288));
        assert_eq!(limits.processes, Some(1));
    }

    #[test]
    fn compiler_ceilings_leave_stack_unset() {
        let limits = ResourceLimits::compiler();
        assert_eq!(limits.cpu_time, Some(30.0));
        assert_eq!(limits.wall_time, Some(60.0));
        assert_eq!(limits.processes, Some(10));
        assert_eq!(limits.stack_kb, None);
    }

    #[test]
    fn time_sets_cpu_and_wall() {
        let limits = ResourceLimits::default().time(3.0);
        assert_eq!(limits.cpu_time, Some(3.0));
        assert_eq!(limits.wall_time, Some(3.0));
        assert_eq!(limits.memory_kb, None);
    }

    #[test]
    fn overlay_of_empty_layer_is_identity() {
        let base = ResourceLimits::submission();
        assert_eq!(base.overlay(&ResourceLimits::default()), base);
    }

    #[test]
    fn overlay_replaces_only_set_fields() {
        let base = ResourceLimits::submission();
        let top = ResourceLimits::default().wall_time(3.0).memory_kb(256 * ResourceLimits::MB);

        let merged = base.overlay(&top);
        assert_eq!(merged.wall_time, Some(3.0));
        assert_eq!(merged.memory_kb, Some(262144));
        assert_eq!(merged.cpu_time, base.cpu_time);
        assert_eq!(merged.open_files, base.open_files);
    }

    #[test]
    fn flags_for_judge_run() {
        let flags = ResourceLimits::default()
            .time(10.0)
            .memory_kb(524288)
            .isolate_flags(false);
        assert_eq!(flags, vec!["--time=10", "--wall-time=10", "--mem=524288"]);
    }

    #[test]
    fn flags_charge_memory_to_cgroup() {
        let flags = ResourceLimits::default().memory_kb(262144).isolate_flags(true);
        assert_eq!(flags, vec!["--cg-mem=262144"]);
    }

    #[test]
    fn flags_keep_fractional_seconds() {
        let flags = ResourceLimits::submission().isolate_flags(false);
        assert!(flags.contains(&"--extra-time=0.5".to_string()));
        assert!(flags.contains(&"--fsize=65536".to_string()));
        assert!(flags.contains(&"--open-files=64".to_string()));
    }

    #[test]
    fn empty_limits_have_no_flags() {
        assert!(ResourceLimits::default().isolate_flags(true).is_empty());
    }
}
