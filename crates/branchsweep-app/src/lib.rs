use anyhow::Result;
use branchsweep_core::command_runner::CommandRunner;
use branchsweep_core::doctor::{DoctorReport, run_doctor_with_runner};

pub mod classify;
pub mod delete;

pub struct App<'a> {
    pub runner: &'a dyn CommandRunner,
}

impl<'a> App<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub fn doctor(&self) -> Result<DoctorReport> {
        Ok(run_doctor_with_runner(self.runner))
    }
}
