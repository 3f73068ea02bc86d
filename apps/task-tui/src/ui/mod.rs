use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::{
    io::{self, IsTerminal},
    time::Duration,
};
use task_list_controller::{ControllerError, TaskListController};
use tracing::{debug, info};

mod render;
pub mod state;

use state::{Mode, UiState};

pub async fn run_task_ui(mut controller: TaskListController) -> Result<()> {
    if !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!(
            "The task UI requires an interactive terminal. Use the list, add, toggle or delete commands instead."
        ));
    }

    // Failures are logged by the controller; the list simply starts empty.
    if let Ok(count) = controller.load().await {
        debug!(count, "Initial load finished");
    }

    enable_raw_mode().map_err(|e| {
        anyhow::anyhow!("Failed to enable raw mode. Make sure you're running in a proper terminal: {}", e)
    })?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| {
        disable_raw_mode().ok();
        anyhow::anyhow!("Failed to setup terminal: {}", e)
    })?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut controller).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Let outstanding store calls land before the runtime goes away.
    controller.settle().await;
    info!(tasks = controller.tasks().len(), "Task UI closed");

    res
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut TaskListController,
) -> Result<()> {
    let mut state = UiState::new();

    loop {
        if controller.try_apply_completions() > 0 {
            state.clamp_selection(controller.tasks().len());
        }

        terminal.draw(|f| render::draw(f, controller, &state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(controller, &mut state, key).await;
                }
            }
        }

        if state.should_quit {
            return Ok(());
        }
    }
}

async fn handle_key(controller: &mut TaskListController, state: &mut UiState, key: KeyEvent) {
    if state.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            state.show_help = false;
        }
        return;
    }

    match state.mode {
        Mode::Browse => handle_browse_key(controller, state, key).await,
        Mode::Create | Mode::Edit => handle_form_key(controller, state, key),
    }
}

async fn handle_browse_key(
    controller: &mut TaskListController,
    state: &mut UiState,
    key: KeyEvent,
) {
    let len = controller.tasks().len();
    match key.code {
        KeyCode::Char('q') => state.should_quit = true,
        KeyCode::Char('?') => state.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => state.select_next(len),
        KeyCode::Char('k') | KeyCode::Up => state.select_previous(),
        KeyCode::Char(' ') if len > 0 => match controller.toggle(state.selected) {
            Ok(status) => state.set_status(status.toggle_label()),
            Err(e) => state.set_status(e.to_string()),
        },
        KeyCode::Char('d') if len > 0 => {
            match controller.delete(state.selected) {
                Ok(id) => state.set_status(format!("Deleted task {id}")),
                Err(ControllerError::MissingId) => {
                    state.set_status("Task has no id yet and cannot be deleted")
                }
                Err(e) => state.set_status(e.to_string()),
            }
            state.clamp_selection(controller.tasks().len());
        }
        KeyCode::Char('n') => state.open_form(Mode::Create),
        KeyCode::Char('e') if len > 0 => match controller.begin_edit(state.selected) {
            Ok(_) => state.open_form(Mode::Edit),
            Err(e) => state.set_status(e.to_string()),
        },
        KeyCode::Char('r') => {
            match controller.load().await {
                Ok(count) => state.set_status(format!("Loaded {count} tasks")),
                Err(e) => state.set_status(format!("Reload failed: {e}")),
            }
            state.clamp_selection(controller.tasks().len());
        }
        _ => {}
    }
}

fn handle_form_key(controller: &mut TaskListController, state: &mut UiState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if state.mode == Mode::Edit {
                controller.cancel_edit();
            }
            state.close_form();
        }
        KeyCode::Tab => state.cycle_focus(),
        KeyCode::Enter => submit_form(controller, state),
        KeyCode::Char(c) => {
            if let Some(text) = active_field(controller, state) {
                text.push(c);
            }
        }
        KeyCode::Backspace => {
            if let Some(text) = active_field(controller, state) {
                text.pop();
            }
        }
        _ => {}
    }
}

fn active_field<'a>(
    controller: &'a mut TaskListController,
    state: &mut UiState,
) -> Option<&'a mut String> {
    let focus = state.focus;
    match state.mode {
        Mode::Create => Some(controller.create_form_mut().field_mut(focus)),
        Mode::Edit => {
            let form = controller.edit_form_mut();
            if form.is_none() {
                // The task went away underneath the edit.
                state.close_form();
            }
            form.map(|form| form.field_mut(focus))
        }
        Mode::Browse => None,
    }
}

fn submit_form(controller: &mut TaskListController, state: &mut UiState) {
    let result = match state.mode {
        Mode::Create => controller.submit_create(),
        Mode::Edit => controller.submit_edit(),
        Mode::Browse => return,
    };

    match result {
        Ok(id) => {
            let verb = if state.mode == Mode::Create { "Created" } else { "Updated" };
            state.set_status(format!("{verb} task {id}"));
            if state.mode == Mode::Create {
                state.selected = 0;
            }
            state.close_form();
        }
        Err(ControllerError::Invalid(errors)) => {
            state.form_errors = Some(errors);
        }
        Err(e) => {
            state.set_status(e.to_string());
            state.close_form();
        }
    }
}
