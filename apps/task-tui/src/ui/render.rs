use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use task_list_controller::{FormField, Task, TaskForm, TaskListController};

use super::state::{Mode, UiState};

pub fn draw(f: &mut Frame, controller: &TaskListController, state: &UiState) {
    let form_height = if state.mode.is_form() {
        let error_lines = state.form_errors.as_ref().map_or(0, |e| e.iter().count());
        (FormField::ALL.len() + error_lines) as u16 + 2
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),           // Header
            Constraint::Min(5),              // Task list
            Constraint::Length(form_height), // Form
            Constraint::Length(1),           // Status bar
        ])
        .split(f.area());

    let header = Paragraph::new(" Tasks ")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    render_tasks(f, chunks[1], controller, state);

    if state.mode.is_form() {
        render_form(f, chunks[2], controller, state);
    }

    render_status_bar(f, chunks[3], controller, state);

    if state.show_help {
        render_help_overlay(f);
    }
}

fn render_tasks(f: &mut Frame, area: Rect, controller: &TaskListController, state: &UiState) {
    let items: Vec<ListItem> = controller.tasks().iter().map(task_item).collect();

    let title = format!(" {} tasks ", controller.tasks().len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if !controller.tasks().is_empty() && state.mode != Mode::Create {
        list_state.select(Some(state.selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn task_item(task: &Task) -> ListItem<'static> {
    let presentation = task.presentation();
    let mut title_style = Style::default().add_modifier(Modifier::BOLD);
    if task.is_completed() {
        title_style = title_style.add_modifier(Modifier::CROSSED_OUT);
    }
    let created = task.created_at().with_timezone(&Local).format("%Y-%m-%d %H:%M");

    ListItem::new(Line::from(vec![
        Span::raw(format!("{} ", presentation.glyph)),
        Span::styled(task.title().to_string(), title_style),
        Span::raw(" - "),
        Span::raw(task.description().to_string()),
        Span::styled(format!("  {created}"), Style::default().fg(Color::DarkGray)),
    ]))
}

fn render_form(f: &mut Frame, area: Rect, controller: &TaskListController, state: &UiState) {
    let (title, form) = match state.mode {
        Mode::Edit => match controller.edit_session() {
            Some(session) => (format!(" Edit task {} ", session.id()), &session.form),
            None => return,
        },
        _ => (" New task ".to_string(), controller.create_form()),
    };

    let mut lines: Vec<Line> = FormField::ALL
        .iter()
        .map(|&field| form_line(form, field, state.focus == field))
        .collect();

    if let Some(errors) = &state.form_errors {
        lines.extend(
            errors
                .iter()
                .map(|e| Line::from(Span::styled(e.to_string(), Style::default().fg(Color::Red)))),
        );
    }

    let form_widget = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(form_widget, area);
}

fn form_line(form: &TaskForm, field: FormField, focused: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let cursor = if focused { "_" } else { "" };

    Line::from(vec![
        Span::styled(format!("{:>12}: ", field.label()), label_style),
        Span::styled(
            format!("{}{cursor}", form.field(field)),
            Style::default().fg(Color::White),
        ),
    ])
}

fn render_status_bar(f: &mut Frame, area: Rect, controller: &TaskListController, state: &UiState) {
    let done = controller.tasks().iter().filter(|t| t.is_completed()).count();
    let hints = match state.mode {
        Mode::Browse => "n: new | e: edit | space: toggle | d: delete | ?: help | q: quit",
        Mode::Create | Mode::Edit => "Tab: next field | Enter: save | Esc: cancel",
    };

    let mut spans = vec![
        Span::styled(
            format!(" {done}/{} done ", controller.tasks().len()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(format!(
            " {} | pending calls: {} ",
            controller.policy(),
            controller.in_flight()
        )),
    ];
    if let Some(status) = &state.status {
        spans.push(Span::styled(
            format!("| {status} "),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        format!("| {hints}"),
        Style::default().fg(Color::DarkGray),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help_overlay(f: &mut Frame) {
    let help_text = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  j / Down   Select next task"),
        Line::from("  k / Up     Select previous task"),
        Line::from("  space      Toggle done"),
        Line::from("  d          Delete task"),
        Line::from("  n          New task"),
        Line::from("  e          Edit selected task"),
        Line::from("  r          Reload from the store"),
        Line::from("  Tab        Next form field"),
        Line::from("  Enter      Save form"),
        Line::from("  Esc        Leave form"),
        Line::from("  q          Quit"),
        Line::from(""),
        Line::from("Press ? or Esc to close"),
    ];

    let area = centered_rect(50, 60, f.area());
    let help = Paragraph::new(help_text).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White).bg(Color::Black)),
    );
    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
