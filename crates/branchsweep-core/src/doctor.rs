use std::env;
use std::fmt;
use std::path::Path;

use crate::command_runner::{CommandRunner, SystemCommandRunner};
use crate::config::{load_config, resolve_config_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Pass,
    Fail,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub state: CheckState,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn has_failures(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.state == CheckState::Fail)
    }

    pub fn summary(&self) -> String {
        let passed = self
            .checks
            .iter()
            .filter(|check| check.state == CheckState::Pass)
            .count();
        let failed = self.checks.len().saturating_sub(passed);
        format!("{passed} passed, {failed} failed")
    }
}

pub fn run_doctor() -> DoctorReport {
    let runner = SystemCommandRunner::new();
    run_doctor_with_runner(&runner)
}

pub fn run_doctor_with_runner(runner: &dyn CommandRunner) -> DoctorReport {
    let mut checks = Vec::new();

    checks.push(match env::consts::OS {
        "macos" => pass_check("os is supported", "detected macOS"),
        "linux" => pass_check("os is supported", "detected Linux"),
        detected => fail_check(
            "os is supported",
            format!("detected {detected}, expected macOS or Linux"),
        ),
    });

    checks.push(if is_executable_in_path("git") {
        pass_check("git is installed", "git executable found in PATH")
    } else {
        fail_check("git is installed", "git executable not found in PATH")
    });

    checks.push(check_git_merge_tree_support(runner));

    match resolve_config_path() {
        Ok(config_path) => {
            if config_path.exists() {
                match load_config(&config_path) {
                    Ok(_) => checks.push(pass_check(
                        "config parses and validates",
                        format!("found valid config at {}", config_path.display()),
                    )),
                    Err(error) => {
                        checks.push(fail_check("config parses and validates", error.to_string()));
                    }
                }
            } else {
                // No config file is a supported setup; built-in defaults apply.
                checks.push(pass_check(
                    "config parses and validates",
                    format!(
                        "no config at {}, using built-in defaults",
                        config_path.display()
                    ),
                ));
            }
        }
        Err(error) => {
            checks.push(fail_check("config path resolves", error.to_string()));
            checks.push(skipped_check(
                "config parses and validates",
                "config path could not be resolved",
            ));
        }
    }

    DoctorReport { checks }
}

fn check_git_merge_tree_support(runner: &dyn CommandRunner) -> DoctorCheck {
    match runner.run("git", &["merge-tree", "-h"], None) {
        Ok(output) => {
            let combined = format!("{}\n{}", output.stdout, output.stderr);
            if combined.contains("usage: git merge-tree") {
                pass_check(
                    "git merge-tree available",
                    "git merge-tree command is available",
                )
            } else {
                fail_check(
                    "git merge-tree available",
                    format!(
                        "git merge-tree help output did not match expected format (exit code {})",
                        output.status_code
                    ),
                )
            }
        }
        Err(error) => fail_check(
            "git merge-tree available",
            format!("failed to execute git merge-tree check: {error}"),
        ),
    }
}

fn pass_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Pass,
        details: details.into(),
    }
}

fn fail_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Fail,
        details: details.into(),
    }
}

fn skipped_check(name: &str, reason: &str) -> DoctorCheck {
    fail_check(name, format!("skipped because {reason}"))
}

fn is_executable_in_path(program: &str) -> bool {
    let program_path = Path::new(program);

    if program_path.is_absolute() || program.contains('/') {
        return is_executable_file(program_path);
    }

    let path_value = match env::var_os("PATH") {
        Some(value) => value,
        None => return false,
    };

    env::split_paths(&path_value)
        .map(|directory| directory.join(program))
        .any(|candidate| is_executable_file(&candidate))
}

fn is_executable_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match path.metadata() {
            Ok(metadata) => metadata.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        true
    }
}
