//! Shader hot-reload debouncing.
//!
//! The renderer compiles shaders; this module only decides when to ask it.
//! A recompile happens when the source digest changes and at least the
//! minimum interval has passed since the previous compile.

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Outcome of one compile request. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileReport {
    pub success: bool,
    pub errors: Vec<String>,
    /// 1-based source lines the errors point at.
    pub error_lines: Vec<u32>,
    pub compilation_time: Duration,
}

impl CompileReport {
    pub fn succeeded(compilation_time: Duration) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            error_lines: Vec::new(),
            compilation_time,
        }
    }

    pub fn failed(errors: Vec<String>, error_lines: Vec<u32>) -> Self {
        Self {
            success: false,
            errors,
            error_lines,
            compilation_time: Duration::ZERO,
        }
    }
}

/// Compiles shader source for a named preset.
pub trait ShaderCompiler {
    fn compile(&self, source: &str, preset: &str) -> CompileReport;
}

/// Result of [`ShaderHotReload::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// Source digest matches the last compile.
    Unchanged,
    /// Changed, but the minimum interval has not elapsed; poll again later.
    Throttled { retry_after: Duration },
    Compiled(CompileReport),
}

/// Digest-based debounce in front of a [`ShaderCompiler`].
pub struct ShaderHotReload<C> {
    compiler: C,
    min_interval: Duration,
    last_digest: Option<blake3::Hash>,
    last_compile: Option<Instant>,
}

impl<C: ShaderCompiler> ShaderHotReload<C> {
    pub fn new(compiler: C, min_interval: Duration) -> Self {
        Self {
            compiler,
            min_interval,
            last_digest: None,
            last_compile: None,
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Hex digest of the last compiled source.
    pub fn last_digest(&self) -> Option<String> {
        self.last_digest.map(|d| d.to_hex().to_string())
    }

    /// Recompiles if `source` changed and the interval allows it.
    pub fn poll(&mut self, source: &str, preset: &str) -> ReloadOutcome {
        self.poll_at(source, preset, Instant::now())
    }

    /// Compiles unconditionally and records the digest.
    pub fn force(&mut self, source: &str, preset: &str) -> CompileReport {
        self.compile_at(source, preset, Instant::now())
    }

    fn poll_at(&mut self, source: &str, preset: &str, now: Instant) -> ReloadOutcome {
        let digest = blake3::hash(source.as_bytes());
        if self.last_digest == Some(digest) {
            return ReloadOutcome::Unchanged;
        }
        if let Some(last) = self.last_compile {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return ReloadOutcome::Throttled {
                    retry_after: self.min_interval - elapsed,
                };
            }
        }
        ReloadOutcome::Compiled(self.compile_at(source, preset, now))
    }

    fn compile_at(&mut self, source: &str, preset: &str, now: Instant) -> CompileReport {
        self.last_digest = Some(blake3::hash(source.as_bytes()));
        self.last_compile = Some(now);

        let start = Instant::now();
        let compiler = &self.compiler;
        let report = panic::catch_unwind(AssertUnwindSafe(|| compiler.compile(source, preset)));
        match report {
            Ok(report) => {
                if !report.success {
                    log::info!("Shader preset '{}' failed with {} error(s)", preset, report.errors.len());
                }
                report
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::warn!("Shader compiler panicked on preset '{}': {}", preset, detail);
                CompileReport {
                    compilation_time: start.elapsed(),
                    ..CompileReport::failed(vec![format!("Compiler crashed: {detail}")], Vec::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingCompiler {
        calls: Cell<usize>,
    }

    impl ShaderCompiler for CountingCompiler {
        fn compile(&self, source: &str, _preset: &str) -> CompileReport {
            self.calls.set(self.calls.get() + 1);
            if source.contains("panic") {
                panic!("bad token");
            }
            match source.lines().position(|l| l.contains("error")) {
                Some(line) => CompileReport::failed(vec!["syntax error".to_string()], vec![line as u32 + 1]),
                None => CompileReport::succeeded(Duration::from_millis(1)),
            }
        }
    }

    #[test]
    fn test_unchanged_source_is_not_recompiled() {
        let mut reload = ShaderHotReload::new(CountingCompiler::default(), Duration::ZERO);
        assert!(matches!(reload.poll("void main() {}", "pbr"), ReloadOutcome::Compiled(r) if r.success));
        assert_eq!(reload.poll("void main() {}", "pbr"), ReloadOutcome::Unchanged);
        assert_eq!(reload.compiler().calls.get(), 1);
        assert!(reload.last_digest().is_some());
    }

    #[test]
    fn test_interval_throttles_changes() {
        let mut reload = ShaderHotReload::new(CountingCompiler::default(), Duration::from_millis(300));
        let t0 = Instant::now();
        reload.poll_at("a", "pbr", t0);
        let outcome = reload.poll_at("b", "pbr", t0 + Duration::from_millis(100));
        assert_eq!(
            outcome,
            ReloadOutcome::Throttled {
                retry_after: Duration::from_millis(200)
            }
        );
        assert!(matches!(
            reload.poll_at("b", "pbr", t0 + Duration::from_millis(300)),
            ReloadOutcome::Compiled(_)
        ));
        assert_eq!(reload.compiler().calls.get(), 2);
    }

    #[test]
    fn test_errors_are_reported_with_lines() {
        let mut reload = ShaderHotReload::new(CountingCompiler::default(), Duration::ZERO);
        let report = reload.force("ok\nerror here\n", "unlit");
        assert!(!report.success);
        assert_eq!(report.error_lines, vec![2]);
    }

    #[test]
    fn test_panicking_compiler_becomes_failed_report() {
        let mut reload = ShaderHotReload::new(CountingCompiler::default(), Duration::ZERO);
        let report = reload.force("panic", "pbr");
        assert!(!report.success);
        assert_eq!(report.errors, vec!["Compiler crashed: bad token".to_string()]);
    }
}
