use std::path::Path;

use anyhow::{Context, Result, bail};
use branchsweep_app::App;
use branchsweep_app::classify::{CancelToken, ClassificationRequest};
use branchsweep_core::branch::Branch;
use branchsweep_core::config::load_or_default;
use branchsweep_core::doctor::{CheckState, DoctorReport};
use branchsweep_core::git;
use branchsweep_core::time::{age_in_days, format_date};
use comfy_table::{Cell, ContentArrangement, Table};
use time::{Duration, OffsetDateTime};

use crate::cli::{Cli, Command, ListArgs};

pub fn run_with_deps(cli: Cli, app: &App<'_>, cwd: &Path) -> Result<()> {
    match cli.command {
        Some(Command::List(args)) => run_list_command(app, cwd, args),
        Some(Command::Doctor) => run_doctor_command(app),
        None => run_root_command(app, cwd),
    }
}

fn run_root_command(app: &App<'_>, cwd: &Path) -> Result<()> {
    let config = load_or_default()?;
    let repo_root = resolve_repo_root(app, cwd)?;

    branchsweep_tui::run_sweep(&repo_root, &config.defaults)
}

fn run_list_command(app: &App<'_>, cwd: &Path, args: ListArgs) -> Result<()> {
    let defaults = load_or_default()?.defaults;
    let relation = args.relation.unwrap_or_else(|| defaults.merge_relation());
    let pattern = args.pattern.or(defaults.pattern);

    let request = ClassificationRequest::new(
        args.reference.unwrap_or(defaults.reference_branch),
        args.remote.unwrap_or(defaults.remote_name),
        args.remotes.unwrap_or(defaults.include_remotes),
        Duration::days(i64::from(args.days.unwrap_or(defaults.older_than_days))),
        relation,
        pattern.as_deref(),
    )?;

    let repo_root = resolve_repo_root(app, cwd)?;
    let classification = app.classify(&repo_root, &request, &CancelToken::new())?;

    for warning in &classification.warnings {
        eprintln!("warning: {warning}");
    }

    print_branch_table(&classification.branches);

    let obsolete = classification
        .branches
        .iter()
        .filter(|branch| branch.obsolete)
        .count();
    println!(
        "{} candidate branches, {} obsolete",
        classification.branches.len(),
        obsolete
    );

    Ok(())
}

fn run_doctor_command(app: &App<'_>) -> Result<()> {
    let report = app.doctor()?;
    print_doctor_report(&report);

    if report.has_failures() {
        bail!("environment checks failed");
    }
    Ok(())
}

fn resolve_repo_root(app: &App<'_>, cwd: &Path) -> Result<std::path::PathBuf> {
    git::repo_root(cwd, app.runner).context("failed to resolve git repository root")
}

fn print_branch_table(branches: &[Branch]) {
    let now = OffsetDateTime::now_utc();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Name",
        "Last commit",
        "Age (days)",
        "Author",
        "Subject",
        "Obsolete",
    ]);

    for branch in branches {
        table.add_row(vec![
            Cell::new(branch.name.as_str()),
            Cell::new(format_date(branch.last_commit_at)),
            Cell::new(age_in_days(branch.last_commit_at, now).to_string()),
            Cell::new(branch.author.as_str()),
            Cell::new(branch.subject.as_str()),
            Cell::new(if branch.obsolete { "yes" } else { "no" }),
        ]);
    }

    println!("{table}");
}

fn print_doctor_report(report: &DoctorReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Details"]);

    for check in &report.checks {
        let status = match check.state {
            CheckState::Pass => "PASS",
            CheckState::Fail => "FAIL",
        };

        table.add_row(vec![
            Cell::new(check.name.as_str()),
            Cell::new(status),
            Cell::new(check.details.as_str()),
        ]);
    }

    println!("{table}");
    println!("{}", report.summary());
}
