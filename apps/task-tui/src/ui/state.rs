use task_list_controller::{FormErrors, FormField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Create,
    Edit,
}

impl Mode {
    pub fn is_form(self) -> bool {
        !matches!(self, Mode::Browse)
    }
}

/// View state that is not owned by the controller.
pub struct UiState {
    pub mode: Mode,
    pub focus: FormField,
    pub selected: usize,
    pub status: Option<String>,
    pub form_errors: Option<FormErrors>,
    pub show_help: bool,
    pub should_quit: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Browse,
            focus: FormField::Title,
            selected: 0,
            status: None,
            form_errors: None,
            show_help: false,
            should_quit: false,
        }
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep the selection inside a list that may have shrunk.
    pub fn clamp_selection(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn open_form(&mut self, mode: Mode) {
        self.mode = mode;
        self.focus = FormField::Title;
        self.form_errors = None;
    }

    pub fn close_form(&mut self) {
        self.mode = Mode::Browse;
        self.form_errors = None;
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }
}
