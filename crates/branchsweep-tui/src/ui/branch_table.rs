use branchsweep_core::branch::Branch;
use branchsweep_core::time::format_date;
use ratatui::Frame;
use ratatui::layout::{Constraint, Margin, Rect};
use ratatui::text::Line;
use ratatui::widgets::{
    Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table, TableState,
};

const COLUMN_TITLES: [&str; 6] = ["Sel", "Branch", "Last commit", "Author", "Subject", "Obsolete"];

const COLUMN_WIDTHS: [Constraint; 6] = [
    Constraint::Length(3),
    Constraint::Min(20),
    Constraint::Length(11),
    Constraint::Length(16),
    Constraint::Min(16),
    Constraint::Length(8),
];

/// Classification results with a movable cursor and per-row selection marks.
#[derive(Debug, Default)]
pub(crate) struct BranchTableState {
    rows: Vec<Branch>,
    cursor: usize,
}

impl BranchTableState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the rows with a fresh classification. Selections made
    /// against the previous run do not carry over.
    pub(crate) fn set_rows(&mut self, rows: Vec<Branch>) {
        self.rows = rows;
        if self.rows.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    pub(crate) fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub(crate) fn move_down(&mut self) {
        if self.cursor + 1 < self.rows.len() {
            self.cursor += 1;
        }
    }

    pub(crate) fn toggle_current(&mut self) {
        if let Some(row) = self.rows.get_mut(self.cursor) {
            row.selected = !row.selected;
        }
    }

    /// Selects every obsolete row, or clears them all when every obsolete
    /// row is already selected. Non-obsolete selections are left alone.
    pub(crate) fn toggle_all_obsolete(&mut self) {
        let all_selected = self
            .rows
            .iter()
            .filter(|row| row.obsolete)
            .all(|row| row.selected);
        let has_obsolete = self.rows.iter().any(|row| row.obsolete);
        if !has_obsolete {
            return;
        }

        for row in self.rows.iter_mut().filter(|row| row.obsolete) {
            row.selected = !all_selected;
        }
    }

    pub(crate) fn selected_names(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.selected)
            .map(|row| row.name.clone())
            .collect()
    }

    pub(crate) fn selected_count(&self) -> usize {
        self.rows.iter().filter(|row| row.selected).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub(crate) fn rows(&self) -> &[Branch] {
        &self.rows
    }

    pub(crate) fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        title: Line<'_>,
        empty_message: &str,
        focused: bool,
    ) {
        if self.rows.is_empty() {
            let empty = Paragraph::new(empty_message).block(crate::theme::chrome(title));
            frame.render_widget(empty, area);
            return;
        }

        let header = Row::new(COLUMN_TITLES).style(crate::theme::table_header(
            ratatui::style::Color::Cyan,
        ));
        let rows = self.rows.iter().map(|row| {
            Row::new(vec![
                if row.selected { "[x]".to_string() } else { "[ ]".to_string() },
                row.name.clone(),
                format_date(row.last_commit_at),
                row.author.clone(),
                row.subject.clone(),
                crate::ui::text::yes_no(row.obsolete).to_string(),
            ])
        });

        let highlight = if focused {
            crate::theme::table_highlight(ratatui::style::Color::Cyan)
        } else {
            crate::theme::secondary_text()
        };
        let table = Table::new(rows, COLUMN_WIDTHS)
            .header(header)
            .block(crate::theme::chrome(title))
            .row_highlight_style(highlight)
            .highlight_symbol(">> ");

        let mut state = TableState::new();
        state.select(Some(self.cursor));
        frame.render_stateful_widget(table, area, &mut state);

        let viewport = area.height.saturating_sub(3) as usize;
        let mut scrollbar_state = ScrollbarState::new(self.rows.len())
            .position(self.cursor)
            .viewport_content_length(viewport);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}
