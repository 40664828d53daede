use std::fs::OpenOptions;
use std::path::Path;

use drawstate_core::config::{DebugAction, DrawStateConfig};
use drawstate_core::Severity;

// ── Check result types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

#[derive(Debug)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    details: Vec<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
            details: Vec::new(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Pass, message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Warn, message)
    }

    fn skip(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Skip, message)
    }

    fn detail(mut self, detail: &str) -> Self {
        self.details.push(detail.to_string());
        self
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

/// Check the configuration at `path` and print a report. Returns whether
/// every check passed or only warned.
pub fn run_check(path: &Path) -> bool {
    let mut results: Vec<CheckResult> = Vec::new();

    match check_file(path, &mut results) {
        Some(config) => {
            check_report(&config, &mut results);
            check_log_file(&config, &mut results);
            check_debug(&config, &mut results);
        }
        None => results.push(CheckResult::skip(
            "Settings",
            "No config loaded, defaults apply",
        )),
    }

    print_results(path, &results);
    !results
        .iter()
        .any(|r| matches!(r.status, CheckStatus::Fail))
}

// ── Checks ──────────────────────────────────────────────────────────────────

fn check_file(path: &Path, results: &mut Vec<CheckResult>) -> Option<DrawStateConfig> {
    if !path.exists() {
        results.push(
            CheckResult::warn(
                "Configuration",
                &format!("Config file not found: {}", path.display()),
            )
            .detail("The layer will run with default settings")
            .detail("Create one with `drawstate config init`"),
        );
        return None;
    }

    match DrawStateConfig::load(path) {
        Ok(config) => {
            results.push(CheckResult::pass(
                "Configuration",
                &format!("Loaded from {}", path.display()),
            ));
            Some(config)
        }
        Err(e) => {
            results.push(
                CheckResult::fail("Configuration", &e.to_string())
                    .detail("The layer ignores a malformed file and uses defaults"),
            );
            None
        }
    }
}

fn check_report(config: &DrawStateConfig, results: &mut Vec<CheckResult>) {
    let flags: Vec<&str> = config.report.flags.iter().map(|s| s.as_str()).collect();
    let listed = format!("Flags: [{}]", flags.join(", "));

    let result = if config.report.action == DebugAction::Ignore {
        CheckResult::warn("Reporting", "action = \"ignore\", no findings will be logged")
    } else if flags.is_empty() {
        CheckResult::warn("Reporting", "No severities enabled, no findings will be logged")
    } else if !config.report.flags.contains(&Severity::Error) {
        CheckResult::warn("Reporting", "Errors are not reported")
    } else {
        CheckResult::pass("Reporting", "Findings are logged through tracing")
    };
    results.push(result.detail(&listed));
}

fn check_log_file(config: &DrawStateConfig, results: &mut Vec<CheckResult>) {
    let Some(path) = &config.report.log_file else {
        results.push(CheckResult::pass("Log file", "Logging to stderr"));
        return;
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(_) => results.push(CheckResult::pass(
            "Log file",
            &format!("Writable: {}", path.display()),
        )),
        Err(e) => results.push(
            CheckResult::warn("Log file", &format!("Cannot open {}: {}", path.display(), e))
                .detail("The layer falls back to stderr"),
        ),
    }
}

fn check_debug(config: &DrawStateConfig, results: &mut Vec<CheckResult>) {
    let debug = &config.debug;
    let mut result = CheckResult::pass("Debug", "Settings are valid");
    if debug.track_recent_command_buffers {
        result = result.detail(&format!(
            "Tracking the {} most recent command buffers",
            debug.recent_capacity
        ));
    }
    if debug.dump_command_buffers {
        result = result.detail("Dumping command buffer logs at vkEndCommandBuffer()");
    }
    if debug.dump_descriptor_state {
        result = result.detail("Dumping bound descriptor state at each draw");
    }
    results.push(result);
}

// ── Output ──────────────────────────────────────────────────────────────────

fn print_results(path: &Path, results: &[CheckResult]) {
    println!();
    println!("DrawState Configuration Check ({})", path.display());
    println!("=============================");
    println!();

    let mut pass_count = 0u32;
    let mut fail_count = 0u32;
    let mut warn_count = 0u32;

    for result in results {
        let (icon, color_start, color_end) = match result.status {
            CheckStatus::Pass => {
                pass_count += 1;
                ("[PASS]", "\x1b[32m", "\x1b[0m")
            }
            CheckStatus::Fail => {
                fail_count += 1;
                ("[FAIL]", "\x1b[31m", "\x1b[0m")
            }
            CheckStatus::Warn => {
                warn_count += 1;
                ("[WARN]", "\x1b[33m", "\x1b[0m")
            }
            CheckStatus::Skip => ("[SKIP]", "\x1b[90m", "\x1b[0m"),
        };

        println!(
            "  {}{}{} {} - {}",
            color_start, icon, color_end, result.name, result.message
        );
        for detail in &result.details {
            println!("         {}", detail);
        }
        println!();
    }

    println!("-------------------------------");
    println!(
        "  {} passed, {} failed, {} warnings",
        pass_count, fail_count, warn_count
    );
    println!();
}
