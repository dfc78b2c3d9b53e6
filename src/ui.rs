//! Terminal drawing: header, monitor grid, footer and the open picker

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::editor::{Editor, Status};
use crate::editor::pickers::PickerView;
use crate::grid::{Canvas, CellRole, GridRenderer};

const MONITOR_COLOR: Color = Color::Indexed(42);
const SELECTED_COLOR: Color = Color::Indexed(214);
const ERROR_COLOR: Color = Color::Red;
const POPUP_MIN_WIDTH: u16 = 30;

fn role_style(role: CellRole) -> Style {
    match role {
        CellRole::Blank => Style::default(),
        CellRole::Monitor => Style::default().fg(MONITOR_COLOR),
        CellRole::Selected => Style::default().fg(SELECTED_COLOR).add_modifier(Modifier::BOLD),
    }
}

/// Draw one full frame
pub fn draw(frame: &mut Frame, editor: &Editor, renderer: &GridRenderer) {
    let area = frame.area();
    let grid = renderer.render(editor.rules(), editor.selected(), editor.grid_step(), area.width, area.height);

    let [header_area, grid_area, footer_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)]).areas(area);

    frame.render_widget(
        Paragraph::new(grid.header).style(Style::default().add_modifier(Modifier::BOLD)),
        header_area,
    );
    frame.render_widget(Paragraph::new(canvas_lines(&grid.canvas)), grid_area);

    let footer_style = match editor.status() {
        Status::Error(_) => Style::default().fg(ERROR_COLOR),
        _ => Style::default().fg(Color::DarkGray),
    };
    frame.render_widget(Paragraph::new(editor.footer()).style(footer_style), footer_area);

    if let Some(picker) = editor.state().picker() {
        draw_picker(frame, picker, area);
    }
}

/// Canvas rows as styled lines, one span per run of same-role cells
fn canvas_lines(canvas: &Canvas) -> Vec<Line<'static>> {
    (0..canvas.height())
        .map(|y| {
            let mut spans = Vec::new();
            let mut run = String::new();
            let mut run_role = CellRole::Blank;
            for cell in canvas.row(y) {
                if cell.role != run_role && !run.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut run), role_style(run_role)));
                }
                run_role = cell.role;
                run.push(cell.ch);
            }
            if !run.is_empty() {
                spans.push(Span::styled(run, role_style(run_role)));
            }
            Line::from(spans)
        })
        .collect()
}

fn draw_picker(frame: &mut Frame, picker: &dyn PickerView, area: Rect) {
    let items = picker.items();
    let details = picker.details();

    let content_width = items
        .iter()
        .chain(details.iter())
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    let width = u16::try_from(content_width + 4).unwrap_or(u16::MAX).max(POPUP_MIN_WIDTH);
    let detail_rows = if details.is_empty() { 0 } else { details.len() + 1 };
    let height = u16::try_from(items.len() + detail_rows + 2).unwrap_or(u16::MAX);
    let popup = centered(area, width, height);

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(format!(" {} ", picker.title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(SELECTED_COLOR));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let list_rows = u16::try_from(items.len()).unwrap_or(u16::MAX);
    let [list_area, details_area] =
        Layout::vertical([Constraint::Length(list_rows), Constraint::Min(0)]).areas(inner);

    let list = List::new(items.into_iter().map(ListItem::new))
        .highlight_style(Style::default().fg(Color::Black).bg(SELECTED_COLOR))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(picker.cursor()));
    frame.render_stateful_widget(list, list_area, &mut state);

    if !details.is_empty() {
        let mut lines = vec![Line::default()];
        lines.extend(details.into_iter().map(Line::from));
        frame.render_widget(Paragraph::new(lines).style(Style::default().fg(Color::Gray)), details_area);
    }
}

/// `width` x `height` rect centered in `area`, shrunk to fit
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
