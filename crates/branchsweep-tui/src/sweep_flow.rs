use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};

use crossterm::event::{Event, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Clear, Paragraph};
use time::Duration;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use branchsweep_app::classify::{ClassificationRequest, Classifier};
use branchsweep_app::delete::{DeleteReport, DeleteRequest, partition_selection};
use branchsweep_core::branch::MergeRelation;
use branchsweep_core::config::SweepDefaults;

use crate::classify_loader::{SweepEvent, SweepLoader};
use crate::keymap;
use crate::theme;
use crate::ui::binary_choice::{BinaryChoice, BinaryChoiceEvent};
use crate::ui::branch_table::BranchTableState;
use crate::ui::loading::{LoadingState, render_loading_modal};
use crate::ui::modal::{
    ModalSpec, render_error_modal, render_modal, render_notice_modal, text_from_message,
};
use crate::ui::text;

const DANGLING_COMMITS_NOTICE: &str =
    "Deleting unmerged branches leaves dangling commits behind. Use with caution.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowSignal {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Settings,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingField {
    ReferenceBranch,
    RemoteName,
    OlderThanDays,
    IncludeRemotes,
    Relation,
    Pattern,
}

const SETTING_FIELDS: [SettingField; 6] = [
    SettingField::ReferenceBranch,
    SettingField::RemoteName,
    SettingField::OlderThanDays,
    SettingField::IncludeRemotes,
    SettingField::Relation,
    SettingField::Pattern,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Main,
    EditField,
    ConfirmDelete,
    ConfirmRemote,
    Deleting,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    reference_branch: String,
    remote_name: String,
    older_than_days: u32,
    include_remotes: bool,
    merge_relation: MergeRelation,
    pattern: String,
}

impl Settings {
    fn from_defaults(defaults: &SweepDefaults) -> Self {
        Self {
            reference_branch: defaults.reference_branch.clone(),
            remote_name: defaults.remote_name.clone(),
            older_than_days: defaults.older_than_days,
            include_remotes: defaults.include_remotes,
            merge_relation: defaults.merge_relation(),
            pattern: defaults.pattern.clone().unwrap_or_default(),
        }
    }
}

pub(crate) struct SweepFlow {
    repo_root: PathBuf,
    settings: Settings,
    pane: Pane,
    setting_cursor: usize,
    editor: Option<(SettingField, Input)>,
    step: Step,
    classifier: Classifier,
    run: RunState,
    pending_delete_token: Option<u64>,
    pending_selection: Vec<String>,
    next_token: u64,
    receivers: Vec<Receiver<SweepEvent>>,
    table: BranchTableState,
    warnings: Vec<String>,
    error_message: Option<String>,
    notice_message: Option<String>,
    report: Option<DeleteReport>,
    loading: LoadingState,
    confirm: BinaryChoice,
}

impl SweepFlow {
    pub(crate) fn new(repo_root: &Path, defaults: &SweepDefaults, loader: &dyn SweepLoader) -> Self {
        let mut flow = Self {
            repo_root: repo_root.to_path_buf(),
            settings: Settings::from_defaults(defaults),
            pane: Pane::Settings,
            setting_cursor: 0,
            editor: None,
            step: Step::Main,
            classifier: Classifier::new(),
            run: RunState::Idle,
            pending_delete_token: None,
            pending_selection: Vec::new(),
            next_token: 0,
            receivers: Vec::new(),
            table: BranchTableState::new(),
            warnings: Vec::new(),
            error_message: None,
            notice_message: None,
            report: None,
            loading: LoadingState::default(),
            confirm: BinaryChoice::new(false),
        };
        flow.start_classification(loader);
        flow
    }

    pub(crate) fn cancel_current_run(&mut self) {
        self.classifier.cancel_current();
        self.run = RunState::Idle;
    }

    /// Drains completed background work and advances the spinner. Events
    /// whose token does not match the run we are waiting on are stale
    /// leftovers of a superseded or cancelled run and are dropped.
    pub(crate) fn on_tick(&mut self) {
        self.loading.next_frame();

        let mut events = Vec::new();
        self.receivers.retain(|receiver| loop {
            match receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break true,
                Err(TryRecvError::Disconnected) => break false,
            }
        });

        for event in events {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: SweepEvent) {
        match event {
            SweepEvent::Classified { token, result } => {
                let RunState::Running { token: current } = self.run else {
                    return;
                };
                if current != token {
                    return;
                }

                self.run = RunState::Idle;
                match result {
                    Ok(classification) => {
                        self.table.set_rows(classification.branches);
                        self.warnings = classification.warnings;
                    }
                    // A failed run keeps the previous rows on screen.
                    Err(message) => self.error_message = Some(message),
                }
            }
            SweepEvent::Deleted { token, report } => {
                if self.pending_delete_token != Some(token) {
                    return;
                }
                self.pending_delete_token = None;
                self.report = Some(report);
                self.step = Step::Report;
            }
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent, loader: &dyn SweepLoader) -> FlowSignal {
        match self.step {
            Step::Main => self.on_key_main(key, loader),
            Step::EditField => self.on_key_edit(key, loader),
            Step::ConfirmDelete => self.on_key_confirm_delete(key, loader),
            Step::ConfirmRemote => self.on_key_confirm_remote(key, loader),
            Step::Deleting => FlowSignal::Continue,
            Step::Report => self.on_key_report(key, loader),
        }
    }

    fn on_key_main(&mut self, key: KeyEvent, loader: &dyn SweepLoader) -> FlowSignal {
        if self.error_message.is_some() {
            if keymap::is_confirm(key) || keymap::is_back(key) {
                self.error_message = None;
            }
            return FlowSignal::Continue;
        }

        if self.notice_message.is_some() {
            if keymap::is_confirm(key) || keymap::is_back(key) {
                self.notice_message = None;
            }
            return FlowSignal::Continue;
        }

        if keymap::is_quit(key) {
            return FlowSignal::Exit;
        }

        if keymap::is_switch_pane(key) {
            self.pane = match self.pane {
                Pane::Settings => Pane::Results,
                Pane::Results => Pane::Settings,
            };
            return FlowSignal::Continue;
        }

        if keymap::is_refresh(key) {
            self.refresh_or_cancel(loader);
            return FlowSignal::Continue;
        }

        match self.pane {
            Pane::Settings => self.on_key_settings(key, loader),
            Pane::Results => self.on_key_results(key),
        }

        FlowSignal::Continue
    }

    fn on_key_settings(&mut self, key: KeyEvent, loader: &dyn SweepLoader) {
        if keymap::is_up(key) {
            self.setting_cursor = self.setting_cursor.saturating_sub(1);
            return;
        }
        if keymap::is_down(key) {
            if self.setting_cursor + 1 < SETTING_FIELDS.len() {
                self.setting_cursor += 1;
            }
            return;
        }

        let field = SETTING_FIELDS[self.setting_cursor];
        match field {
            SettingField::ReferenceBranch
            | SettingField::RemoteName
            | SettingField::OlderThanDays
            | SettingField::Pattern => {
                if keymap::is_confirm(key) {
                    self.open_editor(field);
                }
            }
            SettingField::IncludeRemotes => {
                if keymap::is_toggle(key) || keymap::is_confirm(key) {
                    self.settings.include_remotes = !self.settings.include_remotes;
                    self.start_classification(loader);
                }
            }
            SettingField::Relation => {
                if keymap::is_right(key) || keymap::is_confirm(key) {
                    self.cycle_relation(true, loader);
                } else if keymap::is_left(key) {
                    self.cycle_relation(false, loader);
                }
            }
        }
    }

    fn on_key_results(&mut self, key: KeyEvent) {
        if keymap::is_up(key) {
            self.table.move_up();
        } else if keymap::is_down(key) {
            self.table.move_down();
        } else if keymap::is_toggle(key) {
            self.table.toggle_current();
        } else if keymap::is_select_all(key) {
            self.table.toggle_all_obsolete();
        } else if keymap::is_delete(key) && self.table.selected_count() > 0 {
            self.pending_selection = self.table.selected_names();
            self.confirm = BinaryChoice::new(false);
            self.step = Step::ConfirmDelete;
        }
    }

    fn on_key_edit(&mut self, key: KeyEvent, loader: &dyn SweepLoader) -> FlowSignal {
        if keymap::is_back(key) {
            self.editor = None;
            self.step = Step::Main;
            return FlowSignal::Continue;
        }

        if keymap::is_confirm(key) {
            self.commit_editor(loader);
            return FlowSignal::Continue;
        }

        if let Some((_, input)) = self.editor.as_mut() {
            input.handle_event(&Event::Key(key));
        }
        FlowSignal::Continue
    }

    fn on_key_confirm_delete(&mut self, key: KeyEvent, loader: &dyn SweepLoader) -> FlowSignal {
        match self.confirm.on_key(key) {
            BinaryChoiceEvent::Continue => {}
            BinaryChoiceEvent::Back | BinaryChoiceEvent::ConfirmNo => self.step = Step::Main,
            BinaryChoiceEvent::ConfirmYes => {
                let partition = partition_selection(
                    &self.pending_selection,
                    &self.settings.remote_name,
                    self.settings.include_remotes,
                );
                if partition.remote.is_empty() {
                    self.begin_delete(loader, false);
                } else {
                    self.confirm = BinaryChoice::new(false);
                    self.step = Step::ConfirmRemote;
                }
            }
        }
        FlowSignal::Continue
    }

    fn on_key_confirm_remote(&mut self, key: KeyEvent, loader: &dyn SweepLoader) -> FlowSignal {
        match self.confirm.on_key(key) {
            BinaryChoiceEvent::Continue => {}
            // Declining the remote stage aborts the whole deletion.
            BinaryChoiceEvent::Back | BinaryChoiceEvent::ConfirmNo => self.step = Step::Main,
            BinaryChoiceEvent::ConfirmYes => self.begin_delete(loader, true),
        }
        FlowSignal::Continue
    }

    fn on_key_report(&mut self, key: KeyEvent, loader: &dyn SweepLoader) -> FlowSignal {
        if keymap::is_confirm(key) || keymap::is_back(key) {
            self.report = None;
            self.step = Step::Main;
            self.start_classification(loader);
        }
        FlowSignal::Continue
    }

    fn open_editor(&mut self, field: SettingField) {
        let value = match field {
            SettingField::ReferenceBranch => self.settings.reference_branch.clone(),
            SettingField::RemoteName => self.settings.remote_name.clone(),
            SettingField::OlderThanDays => self.settings.older_than_days.to_string(),
            SettingField::Pattern => self.settings.pattern.clone(),
            SettingField::IncludeRemotes | SettingField::Relation => return,
        };
        self.editor = Some((field, Input::new(value)));
        self.step = Step::EditField;
    }

    fn commit_editor(&mut self, loader: &dyn SweepLoader) {
        let Some((field, input)) = self.editor.take() else {
            self.step = Step::Main;
            return;
        };
        self.step = Step::Main;

        let value = input.value().trim().to_string();
        match field {
            SettingField::ReferenceBranch => {
                if value.is_empty() {
                    self.error_message = Some("reference branch must not be empty".to_string());
                    return;
                }
                self.settings.reference_branch = value;
            }
            SettingField::RemoteName => {
                if value.is_empty() {
                    self.error_message = Some("remote name must not be empty".to_string());
                    return;
                }
                self.settings.remote_name = value;
            }
            SettingField::OlderThanDays => match value.parse::<u32>() {
                Ok(days) => self.settings.older_than_days = days,
                Err(_) => {
                    self.error_message =
                        Some(format!("'{value}' is not a valid number of days"));
                    return;
                }
            },
            SettingField::Pattern => self.settings.pattern = value,
            SettingField::IncludeRemotes | SettingField::Relation => return,
        }

        self.start_classification(loader);
    }

    fn cycle_relation(&mut self, forward: bool, loader: &dyn SweepLoader) {
        let previous = self.settings.merge_relation;
        self.settings.merge_relation = match (previous, forward) {
            (MergeRelation::MergedOnly, true) => MergeRelation::NothingToMerge,
            (MergeRelation::NothingToMerge, true) => MergeRelation::All,
            (MergeRelation::All, true) => MergeRelation::MergedOnly,
            (MergeRelation::MergedOnly, false) => MergeRelation::All,
            (MergeRelation::All, false) => MergeRelation::NothingToMerge,
            (MergeRelation::NothingToMerge, false) => MergeRelation::MergedOnly,
        };

        if previous == MergeRelation::MergedOnly {
            self.notice_message = Some(DANGLING_COMMITS_NOTICE.to_string());
        }
        self.start_classification(loader);
    }

    fn refresh_or_cancel(&mut self, loader: &dyn SweepLoader) {
        match self.run {
            RunState::Running { .. } => self.cancel_current_run(),
            RunState::Idle => self.start_classification(loader),
        }
    }

    fn start_classification(&mut self, loader: &dyn SweepLoader) {
        let pattern = self.settings.pattern.trim();
        let pattern = (!pattern.is_empty()).then_some(pattern);

        let request = match ClassificationRequest::new(
            self.settings.reference_branch.clone(),
            self.settings.remote_name.clone(),
            self.settings.include_remotes,
            Duration::days(i64::from(self.settings.older_than_days)),
            self.settings.merge_relation,
            pattern,
        ) {
            Ok(request) => request,
            Err(error) => {
                self.error_message = Some(error.to_string());
                return;
            }
        };

        let cancel = self.classifier.begin();
        let token = self.allocate_token();
        self.run = RunState::Running { token };
        self.receivers
            .push(loader.spawn_classify(self.repo_root.clone(), request, cancel, token));
    }

    fn begin_delete(&mut self, loader: &dyn SweepLoader, include_remote_branches: bool) {
        let token = self.allocate_token();
        self.pending_delete_token = Some(token);
        self.step = Step::Deleting;
        self.receivers.push(loader.spawn_delete(
            self.repo_root.clone(),
            DeleteRequest {
                branches: self.pending_selection.clone(),
                remote_name: self.settings.remote_name.clone(),
                include_remote_branches,
            },
            token,
        ));
    }

    fn allocate_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    pub(crate) fn render(&self, frame: &mut Frame<'_>) {
        let [main_area, status_area, footer_area] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .areas(frame.area());

        let [settings_area, results_area] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
            .areas(main_area);

        self.render_settings(frame, settings_area);
        self.table.render(
            frame,
            results_area,
            Line::from("Branches"),
            "No candidate branches.",
            self.pane == Pane::Results,
        );
        self.render_status(frame, status_area);
        self.render_footer(frame, footer_area);

        match self.step {
            Step::Main => {
                if let Some(message) = &self.error_message {
                    render_error_modal(frame, message, 70, 40, "Enter/Esc: dismiss");
                } else if let Some(message) = &self.notice_message {
                    render_notice_modal(frame, "Notice", message, 70, 40, "Enter/Esc: dismiss");
                }
            }
            Step::EditField => self.render_editor(frame),
            Step::ConfirmDelete => self.render_confirm_delete(frame),
            Step::ConfirmRemote => self.render_confirm_remote(frame),
            Step::Deleting => render_loading_modal(
                frame,
                "Deleting",
                "Deleting selected branches...",
                "please wait",
                &self.loading,
            ),
            Step::Report => self.render_report(frame),
        }
    }

    fn render_settings(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.pane == Pane::Settings;
        let lines: Vec<Line<'static>> = SETTING_FIELDS
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let label = field_label(*field);
                let value = self.field_value(*field);
                if focused && index == self.setting_cursor {
                    text::highlighted_label_value_line(label, value)
                } else {
                    text::label_value_line(label, value)
                }
            })
            .collect();

        let paragraph = Paragraph::new(lines).block(theme::chrome("Settings"));
        frame.render_widget(paragraph, area);
    }

    fn field_value(&self, field: SettingField) -> String {
        match field {
            SettingField::ReferenceBranch => self.settings.reference_branch.clone(),
            SettingField::RemoteName => self.settings.remote_name.clone(),
            SettingField::OlderThanDays => self.settings.older_than_days.to_string(),
            SettingField::IncludeRemotes => text::yes_no(self.settings.include_remotes).to_string(),
            SettingField::Relation => self.settings.merge_relation.as_str().to_string(),
            SettingField::Pattern => {
                if self.settings.pattern.trim().is_empty() {
                    "(none)".to_string()
                } else {
                    self.settings.pattern.clone()
                }
            }
        }
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut status = format!(
            "{}/{} branches selected",
            self.table.selected_count(),
            self.table.len()
        );
        if matches!(self.run, RunState::Running { .. }) {
            status.push_str(&format!(
                "    {} classifying...",
                self.loading.current_frame()
            ));
        }
        if !self.warnings.is_empty() {
            status.push_str(&format!("    {} probe warnings", self.warnings.len()));
        }

        let paragraph = Paragraph::new(status).block(theme::chrome("Status"));
        frame.render_widget(paragraph, area);
    }

    fn render_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let hint = match self.pane {
            Pane::Settings => text::compact_hint(
                area.width,
                "Tab: results    j/k: move    Enter: edit    Space: toggle    h/l: relation    r: refresh/cancel    q: quit",
                "Tab: results    Enter: edit    Space: toggle    r: refresh    q: quit",
                "Tab | Enter edit | r refresh | q quit",
            ),
            Pane::Results => text::compact_hint(
                area.width,
                "Tab: settings    j/k: move    Space: select    a: all obsolete    d: delete    r: refresh/cancel    q: quit",
                "Tab: settings    Space: select    a: all    d: delete    q: quit",
                "Tab | Space | a | d | q quit",
            ),
        };
        frame.render_widget(text::key_hint_paragraph(hint).block(theme::key_block()), area);
    }

    fn render_editor(&self, frame: &mut Frame<'_>) {
        let Some((field, input)) = &self.editor else {
            return;
        };

        let area = crate::centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);

        let width = area.width.saturating_sub(2) as usize;
        let scroll = input.visual_scroll(width);
        let paragraph = Paragraph::new(input.value())
            .scroll((0, scroll as u16))
            .block(theme::chrome(text::focus_line(format!(
                "Edit {}",
                field_label(*field)
            ))));
        frame.render_widget(paragraph, area);

        if width == 0 {
            return;
        }
        let visual = input.visual_cursor();
        let relative = visual.saturating_sub(scroll).min(width.saturating_sub(1));
        frame.set_cursor_position((area.x + 1 + relative as u16, area.y + 1));
    }

    fn render_confirm_delete(&self, frame: &mut Frame<'_>) {
        let partition = partition_selection(
            &self.pending_selection,
            &self.settings.remote_name,
            self.settings.include_remotes,
        );
        let body = format!(
            "Delete {} selected branches?\n\nLocal: {}\nRemote: {}\n\nExecute now? {}",
            self.pending_selection.len(),
            partition.local.len(),
            partition.remote.len(),
            self.confirm.selected_label()
        );
        render_modal(
            frame,
            ModalSpec {
                title: "Confirm deletion",
                title_style: Some(theme::focus_prompt()),
                body: text_from_message(&body),
                key_hint: Some("Space/h/l: choose    Enter: confirm    Esc: back"),
                width_pct: 64,
                height_pct: 42,
            },
        );
    }

    fn render_confirm_remote(&self, frame: &mut Frame<'_>) {
        let partition = partition_selection(
            &self.pending_selection,
            &self.settings.remote_name,
            self.settings.include_remotes,
        );
        let body = format!(
            "This deletes {} branches on remote '{}'. Remote deletion cannot be \
             undone from this machine.\n\nReally delete remote branches? {}\n\n\
             Choosing No aborts the deletion entirely.",
            partition.remote.len(),
            self.settings.remote_name,
            self.confirm.selected_label()
        );
        render_modal(
            frame,
            ModalSpec {
                title: "DANGEROUS ACTION",
                title_style: Some(theme::error_prompt()),
                body: text_from_message(&body),
                key_hint: Some("Space/h/l: choose    Enter: confirm    Esc: back"),
                width_pct: 64,
                height_pct: 42,
            },
        );
    }

    fn render_report(&self, frame: &mut Frame<'_>) {
        let Some(report) = &self.report else {
            return;
        };

        let (title, style) = if report.has_errors() {
            ("Deletion finished with errors", theme::warning_prompt())
        } else {
            ("Deletion report", theme::success_prompt())
        };
        render_modal(
            frame,
            ModalSpec {
                title,
                title_style: Some(style),
                body: text_from_message(&report_text(report, &self.settings.remote_name)),
                key_hint: Some("Enter/Esc: back to results"),
                width_pct: 70,
                height_pct: 48,
            },
        );
    }
}

fn field_label(field: SettingField) -> &'static str {
    match field {
        SettingField::ReferenceBranch => "Reference branch",
        SettingField::RemoteName => "Remote",
        SettingField::OlderThanDays => "Older than (days)",
        SettingField::IncludeRemotes => "Include remotes",
        SettingField::Relation => "Merge relation",
        SettingField::Pattern => "Branch pattern",
    }
}

fn report_text(report: &DeleteReport, remote_name: &str) -> String {
    let mut lines = vec![format!("Deleted {} branches.", report.deleted_count())];

    if let Some(remote) = &report.remote {
        match &remote.error {
            None => lines.push(format!(
                "Remote '{}': {}",
                remote_name,
                remote.branches.join(", ")
            )),
            Some(error) => lines.push(format!("Remote '{remote_name}' failed: {error}")),
        }
    }
    if let Some(local) = &report.local {
        match &local.error {
            None => lines.push(format!("Local: {}", local.branches.join(", "))),
            Some(error) => lines.push(format!("Local deletion failed: {error}")),
        }
    }
    if report.is_empty() {
        lines.push("Nothing fell into either batch.".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::mpsc::{self, Sender};

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use time::macros::datetime;

    use branchsweep_app::classify::{CancelToken, Classification, ClassificationRequest};
    use branchsweep_app::delete::{BatchOutcome, DeleteReport, DeleteRequest};
    use branchsweep_core::branch::Branch;
    use branchsweep_core::config::SweepDefaults;

    use super::super::classify_loader::{SweepEvent, SweepLoader};
    use super::{FlowSignal, Step, SweepFlow, report_text};

    struct ClassifySpawn {
        request: ClassificationRequest,
        cancel: CancelToken,
        token: u64,
        sender: Sender<SweepEvent>,
    }

    struct DeleteSpawn {
        request: DeleteRequest,
        token: u64,
        sender: Sender<SweepEvent>,
    }

    #[derive(Default)]
    struct FakeLoader {
        classify: Mutex<Vec<ClassifySpawn>>,
        delete: Mutex<Vec<DeleteSpawn>>,
    }

    impl SweepLoader for FakeLoader {
        fn spawn_classify(
            &self,
            _repo_root: std::path::PathBuf,
            request: ClassificationRequest,
            cancel: CancelToken,
            token: u64,
        ) -> std::sync::mpsc::Receiver<SweepEvent> {
            let (sender, receiver) = mpsc::channel();
            self.classify.lock().expect("lock").push(ClassifySpawn {
                request,
                cancel,
                token,
                sender,
            });
            receiver
        }

        fn spawn_delete(
            &self,
            _repo_root: std::path::PathBuf,
            request: DeleteRequest,
            token: u64,
        ) -> std::sync::mpsc::Receiver<SweepEvent> {
            let (sender, receiver) = mpsc::channel();
            self.delete.lock().expect("lock").push(DeleteSpawn {
                request,
                token,
                sender,
            });
            receiver
        }
    }

    impl FakeLoader {
        fn classify_count(&self) -> usize {
            self.classify.lock().expect("lock").len()
        }

        fn delete_count(&self) -> usize {
            self.delete.lock().expect("lock").len()
        }

        fn complete_classify(&self, index: usize, result: Result<Classification, String>) {
            let calls = self.classify.lock().expect("lock");
            let call = &calls[index];
            call.sender
                .send(SweepEvent::Classified {
                    token: call.token,
                    result,
                })
                .expect("send");
        }

        fn complete_classify_with_token(
            &self,
            index: usize,
            token: u64,
            result: Result<Classification, String>,
        ) {
            let calls = self.classify.lock().expect("lock");
            calls[index]
                .sender
                .send(SweepEvent::Classified { token, result })
                .expect("send");
        }

        fn complete_delete(&self, index: usize, report: DeleteReport) {
            let calls = self.delete.lock().expect("lock");
            let call = &calls[index];
            call.sender
                .send(SweepEvent::Deleted {
                    token: call.token,
                    report,
                })
                .expect("send");
        }
    }

    fn defaults() -> SweepDefaults {
        SweepDefaults {
            reference_branch: "main".to_string(),
            remote_name: "origin".to_string(),
            older_than_days: 30,
            include_remotes: false,
            merge_relation: "merged-only".to_string(),
            pattern: None,
        }
    }

    fn branch(name: &str, obsolete: bool) -> Branch {
        Branch {
            name: name.to_string(),
            last_commit_at: datetime!(2026-06-01 10:00:00 UTC),
            author: "dev".to_string(),
            subject: "work".to_string(),
            obsolete,
            selected: false,
        }
    }

    fn classification(branches: Vec<Branch>) -> Classification {
        Classification {
            branches,
            warnings: Vec::new(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn apply_keys(flow: &mut SweepFlow, loader: &FakeLoader, keys: &[KeyCode]) {
        for code in keys {
            let _ = flow.on_key(key(*code), loader);
        }
    }

    #[test]
    fn construction_starts_a_classification_from_the_defaults() {
        let loader = FakeLoader::default();
        let flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        assert_eq!(loader.classify_count(), 1);
        let calls = loader.classify.lock().expect("lock");
        assert_eq!(calls[0].request.reference_branch, "main");
        assert_eq!(calls[0].request.remote_name, "origin");
        assert!(!calls[0].request.include_remotes);
        assert!(matches!(flow.run, super::RunState::Running { .. }));
    }

    #[test]
    fn stale_classification_events_are_discarded() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        // Toggling "include remotes" supersedes the initial run.
        apply_keys(
            &mut flow,
            &loader,
            &[KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Char(' ')],
        );
        assert_eq!(loader.classify_count(), 2);
        {
            let calls = loader.classify.lock().expect("lock");
            assert!(calls[0].cancel.is_cancelled());
            assert!(!calls[1].cancel.is_cancelled());
        }

        loader.complete_classify(0, Ok(classification(vec![branch("stale", true)])));
        flow.on_tick();
        assert!(flow.table.is_empty());

        loader.complete_classify(1, Ok(classification(vec![branch("fresh", true)])));
        flow.on_tick();
        assert_eq!(flow.table.len(), 1);
        assert!(matches!(flow.run, super::RunState::Idle));
    }

    #[test]
    fn refresh_key_cancels_then_restarts() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        flow.on_key(key(KeyCode::Char('r')), &loader);
        assert!(matches!(flow.run, super::RunState::Idle));
        assert!(loader.classify.lock().expect("lock")[0].cancel.is_cancelled());

        flow.on_key(key(KeyCode::Char('r')), &loader);
        assert_eq!(loader.classify_count(), 2);
        assert!(matches!(flow.run, super::RunState::Running { .. }));
    }

    #[test]
    fn events_from_a_cancelled_run_are_ignored() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);
        let token = loader.classify.lock().expect("lock")[0].token;

        flow.on_key(key(KeyCode::Char('r')), &loader);
        loader.complete_classify_with_token(
            0,
            token,
            Ok(classification(vec![branch("late", true)])),
        );
        flow.on_tick();

        assert!(flow.table.is_empty());
    }

    #[test]
    fn failed_classification_keeps_previous_rows_and_shows_an_error() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        loader.complete_classify(0, Ok(classification(vec![branch("kept", true)])));
        flow.on_tick();
        assert_eq!(flow.table.len(), 1);

        flow.on_key(key(KeyCode::Char('r')), &loader);
        loader.complete_classify(1, Err("fatal: not a git repository".to_string()));
        flow.on_tick();

        assert_eq!(flow.table.len(), 1);
        assert!(
            flow.error_message
                .as_deref()
                .expect("error message")
                .contains("not a git repository")
        );

        flow.on_key(key(KeyCode::Enter), &loader);
        assert!(flow.error_message.is_none());
    }

    #[test]
    fn delete_key_is_ignored_without_a_selection() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);
        loader.complete_classify(0, Ok(classification(vec![branch("old", true)])));
        flow.on_tick();

        apply_keys(&mut flow, &loader, &[KeyCode::Tab, KeyCode::Char('d')]);

        assert_eq!(flow.step, Step::Main);
        assert_eq!(loader.delete_count(), 0);
    }

    #[test]
    fn local_delete_confirm_chain_reports_and_reclassifies() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);
        loader.complete_classify(0, Ok(classification(vec![branch("old", true)])));
        flow.on_tick();

        apply_keys(
            &mut flow,
            &loader,
            &[KeyCode::Tab, KeyCode::Char(' '), KeyCode::Char('d')],
        );
        assert_eq!(flow.step, Step::ConfirmDelete);

        apply_keys(&mut flow, &loader, &[KeyCode::Right, KeyCode::Enter]);
        assert_eq!(flow.step, Step::Deleting);
        {
            let deletes = loader.delete.lock().expect("lock");
            assert_eq!(deletes.len(), 1);
            assert_eq!(deletes[0].request.branches, vec!["old".to_string()]);
            assert!(!deletes[0].request.include_remote_branches);
        }

        loader.complete_delete(
            0,
            DeleteReport {
                remote: None,
                local: Some(BatchOutcome {
                    branches: vec!["old".to_string()],
                    error: None,
                }),
            },
        );
        flow.on_tick();
        assert_eq!(flow.step, Step::Report);

        flow.on_key(key(KeyCode::Enter), &loader);
        assert_eq!(flow.step, Step::Main);
        assert_eq!(loader.classify_count(), 2);
    }

    #[test]
    fn remote_selection_requires_the_dangerous_second_confirm() {
        let loader = FakeLoader::default();
        let mut with_remotes = defaults();
        with_remotes.include_remotes = true;
        let mut flow = SweepFlow::new(Path::new("/repo"), &with_remotes, &loader);
        loader.complete_classify(0, Ok(classification(vec![branch("origin/old", true)])));
        flow.on_tick();

        apply_keys(
            &mut flow,
            &loader,
            &[
                KeyCode::Tab,
                KeyCode::Char(' '),
                KeyCode::Char('d'),
                KeyCode::Right,
                KeyCode::Enter,
            ],
        );
        assert_eq!(flow.step, Step::ConfirmRemote);

        // Esc backs out with nothing deleted.
        flow.on_key(key(KeyCode::Esc), &loader);
        assert_eq!(flow.step, Step::Main);
        assert_eq!(loader.delete_count(), 0);

        apply_keys(
            &mut flow,
            &loader,
            &[
                KeyCode::Char('d'),
                KeyCode::Right,
                KeyCode::Enter,
                KeyCode::Right,
                KeyCode::Enter,
            ],
        );
        assert_eq!(flow.step, Step::Deleting);
        let deletes = loader.delete.lock().expect("lock");
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].request.include_remote_branches);
    }

    #[test]
    fn declining_the_remote_stage_aborts_the_whole_deletion() {
        let loader = FakeLoader::default();
        let mut with_remotes = defaults();
        with_remotes.include_remotes = true;
        let mut flow = SweepFlow::new(Path::new("/repo"), &with_remotes, &loader);
        loader.complete_classify(
            0,
            Ok(classification(vec![
                branch("origin/old", true),
                branch("local-old", true),
            ])),
        );
        flow.on_tick();

        // The second confirm opens on No; a plain Enter declines it.
        apply_keys(
            &mut flow,
            &loader,
            &[
                KeyCode::Tab,
                KeyCode::Char('a'),
                KeyCode::Char('d'),
                KeyCode::Right,
                KeyCode::Enter,
                KeyCode::Enter,
            ],
        );

        assert_eq!(flow.step, Step::Main);
        assert_eq!(loader.delete_count(), 0);
        assert_eq!(flow.table.selected_count(), 2);
    }

    #[test]
    fn editing_the_reference_branch_commits_and_reclassifies() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        apply_keys(
            &mut flow,
            &loader,
            &[
                KeyCode::Enter,
                KeyCode::Backspace,
                KeyCode::Backspace,
                KeyCode::Backspace,
                KeyCode::Backspace,
                KeyCode::Char('d'),
                KeyCode::Char('e'),
                KeyCode::Char('v'),
                KeyCode::Enter,
            ],
        );

        assert_eq!(flow.settings.reference_branch, "dev");
        assert_eq!(loader.classify_count(), 2);
        let calls = loader.classify.lock().expect("lock");
        assert_eq!(calls[1].request.reference_branch, "dev");
    }

    #[test]
    fn invalid_day_count_is_rejected_without_reclassifying() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        apply_keys(
            &mut flow,
            &loader,
            &[
                KeyCode::Down,
                KeyCode::Down,
                KeyCode::Enter,
                KeyCode::Char('x'),
                KeyCode::Enter,
            ],
        );

        assert_eq!(flow.settings.older_than_days, 30);
        assert_eq!(loader.classify_count(), 1);
        assert!(
            flow.error_message
                .as_deref()
                .expect("error message")
                .contains("30x")
        );
    }

    #[test]
    fn leaving_merged_only_shows_the_dangling_commits_notice() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        apply_keys(
            &mut flow,
            &loader,
            &[
                KeyCode::Down,
                KeyCode::Down,
                KeyCode::Down,
                KeyCode::Down,
                KeyCode::Char('l'),
            ],
        );

        assert_eq!(
            flow.settings.merge_relation,
            branchsweep_core::branch::MergeRelation::NothingToMerge
        );
        assert!(flow.notice_message.is_some());
        assert_eq!(loader.classify_count(), 2);

        flow.on_key(key(KeyCode::Esc), &loader);
        assert!(flow.notice_message.is_none());
    }

    #[test]
    fn quit_key_exits_from_the_main_step() {
        let loader = FakeLoader::default();
        let mut flow = SweepFlow::new(Path::new("/repo"), &defaults(), &loader);

        assert_eq!(flow.on_key(key(KeyCode::Char('q')), &loader), FlowSignal::Exit);
    }

    #[test]
    fn report_text_summarizes_both_batches() {
        let report = DeleteReport {
            remote: Some(BatchOutcome {
                branches: vec!["a".to_string(), "b".to_string()],
                error: Some("push failed".to_string()),
            }),
            local: Some(BatchOutcome {
                branches: vec!["c".to_string()],
                error: None,
            }),
        };

        let text = report_text(&report, "origin");
        assert!(text.contains("Deleted 1 branches."));
        assert!(text.contains("Remote 'origin' failed: push failed"));
        assert!(text.contains("Local: c"));
    }
}
