use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};

use branchsweep_app::App;
use branchsweep_app::classify::{CancelToken, Classification, ClassificationRequest};
use branchsweep_app::delete::{DeleteReport, DeleteRequest};
use branchsweep_core::command_runner::SystemCommandRunner;

/// Completion events from background git work. Every event carries the
/// token of the run that produced it; the flow discards events whose token
/// no longer matches the run it is waiting on.
#[derive(Debug)]
pub(crate) enum SweepEvent {
    Classified {
        token: u64,
        result: Result<Classification, String>,
    },
    Deleted {
        token: u64,
        report: DeleteReport,
    },
}

pub(crate) trait SweepLoader: Send + Sync {
    fn spawn_classify(
        &self,
        repo_root: PathBuf,
        request: ClassificationRequest,
        cancel: CancelToken,
        token: u64,
    ) -> Receiver<SweepEvent>;

    fn spawn_delete(
        &self,
        repo_root: PathBuf,
        request: DeleteRequest,
        token: u64,
    ) -> Receiver<SweepEvent>;
}

#[derive(Debug, Default)]
pub(crate) struct SystemSweepLoader;

impl SystemSweepLoader {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl SweepLoader for SystemSweepLoader {
    fn spawn_classify(
        &self,
        repo_root: PathBuf,
        request: ClassificationRequest,
        cancel: CancelToken,
        token: u64,
    ) -> Receiver<SweepEvent> {
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let runner = SystemCommandRunner::new();
            let app = App::new(&runner);
            let result = app
                .classify(&repo_root, &request, &cancel)
                .map_err(|error| error.to_string());
            let _ = sender.send(SweepEvent::Classified { token, result });
        });
        receiver
    }

    fn spawn_delete(
        &self,
        repo_root: PathBuf,
        request: DeleteRequest,
        token: u64,
    ) -> Receiver<SweepEvent> {
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let runner = SystemCommandRunner::new();
            let app = App::new(&runner);
            let report = app.delete_branches(&repo_root, &request);
            let _ = sender.send(SweepEvent::Deleted { token, report });
        });
        receiver
    }
}
