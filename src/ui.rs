use crate::client::{
    ActorKind,
    AppSnapshot,
    BoardSnapshot,
    CatalogRow,
};
use color_eyre::eyre::Result;
use gridstake::types::{
    Board,
    Cell,
    SessionId,
    SessionStatus,
};
use crossterm::event::{
    self,
    Event,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

pub enum UserEvent {
    Quit,
    Redraw,
    SwitchActor(ActorKind),
    ConfirmCreate(String),
    JoinSession(SessionId),
    OpenBoard(SessionId),
    PlaceMark { row: usize, col: usize },
    CloseBoard,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    sessions: Vec<CatalogRow>,
    list_idx: usize,
    cursor: (usize, usize),
    on_board: bool,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            terminal: None,
            sessions: Vec::new(),
            list_idx: 0,
            cursor: (1, 1),
            on_board: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    CreateModal(CreateState),
    QuitModal,
}

#[derive(Clone, Debug, Default)]
struct CreateState {
    input: String,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    // cache the rows so key handling can resolve selections to ids
    state.sessions = snap.sessions.clone();
    state.on_board = snap.board.is_some();
    if !state.sessions.is_empty() && state.list_idx >= state.sessions.len() {
        state.list_idx = state.sessions.len() - 1;
    }
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub async fn next_event(state: &mut UiState) -> Result<UserEvent> {
    loop {
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match &mut state.mode {
                Mode::CreateModal(cs) => match k.code {
                    KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Backspace => {
                        cs.input.pop();
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                        cs.input.push(c);
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Enter => {
                        let stake = cs.input.clone();
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::ConfirmCreate(stake));
                    }
                    _ => continue,
                },
                Mode::QuitModal => match k.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        return Ok(UserEvent::Quit);
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    _ => continue,
                },
                Mode::Normal => {}
            }
            if state.on_board {
                return Ok(match k.code {
                    KeyCode::Char('q') => {
                        state.mode = Mode::QuitModal;
                        UserEvent::Redraw
                    }
                    KeyCode::Esc | KeyCode::Backspace => UserEvent::CloseBoard,
                    KeyCode::Up | KeyCode::Char('k') => {
                        state.cursor.0 = state.cursor.0.saturating_sub(1);
                        UserEvent::Redraw
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.cursor.0 = (state.cursor.0 + 1).min(Board::SIDE - 1);
                        UserEvent::Redraw
                    }
                    KeyCode::Left | KeyCode::Char('h') => {
                        state.cursor.1 = state.cursor.1.saturating_sub(1);
                        UserEvent::Redraw
                    }
                    KeyCode::Right | KeyCode::Char('l') => {
                        state.cursor.1 = (state.cursor.1 + 1).min(Board::SIDE - 1);
                        UserEvent::Redraw
                    }
                    KeyCode::Enter | KeyCode::Char(' ') => UserEvent::PlaceMark {
                        row: state.cursor.0,
                        col: state.cursor.1,
                    },
                    KeyCode::Char('a') => UserEvent::SwitchActor(ActorKind::Alice),
                    KeyCode::Char('b') => UserEvent::SwitchActor(ActorKind::Bob),
                    _ => continue,
                });
            }
            return Ok(match k.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    state.mode = Mode::QuitModal;
                    UserEvent::Redraw
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    state.list_idx = state.list_idx.saturating_sub(1);
                    UserEvent::Redraw
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if !state.sessions.is_empty() {
                        state.list_idx =
                            (state.list_idx + 1).min(state.sessions.len() - 1);
                    }
                    UserEvent::Redraw
                }
                KeyCode::Enter => {
                    let Some(row) = state.sessions.get(state.list_idx) else {
                        continue;
                    };
                    if row.joinable {
                        UserEvent::JoinSession(row.id)
                    } else if row.yours {
                        UserEvent::OpenBoard(row.id)
                    } else {
                        continue;
                    }
                }
                KeyCode::Char('n') => {
                    state.mode = Mode::CreateModal(CreateState::default());
                    UserEvent::Redraw
                }
                KeyCode::Char('a') => UserEvent::SwitchActor(ActorKind::Alice),
                KeyCode::Char('b') => UserEvent::SwitchActor(ActorKind::Bob),
                _ => continue,
            });
        }
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    // Clear the whole frame to avoid leftover fragments
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status
            Constraint::Min(12),   // catalog or board
            Constraint::Length(7), // errors + help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    if let Some(board) = &snap.board {
        draw_board(f, state, chunks[1], board);
    } else {
        draw_catalog(f, state, chunks[1], snap);
    }
    draw_bottom(f, chunks[2], state, snap);
    draw_modals(f, state);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let line = format!(
        "Acting as: {} ({})\n{}",
        snap.actor.label(),
        snap.actor_address,
        snap.status
    );
    let p = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_catalog(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    if snap.sessions.is_empty() {
        lines.push(Line::styled(
            "No open sessions. Press n to create one.",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        for (i, row) in snap.sessions.iter().enumerate() {
            let cursor = if i == state.list_idx { ">" } else { " " };
            let status = match row.status {
                SessionStatus::Waiting => "waiting",
                SessionStatus::InProgress => "in progress",
                SessionStatus::Finished => "finished",
            };
            let hint = if row.joinable {
                "Enter=join"
            } else if row.yours {
                "Enter=open"
            } else {
                ""
            };
            let text = format!(
                "{} {}  stake {}  [{}]  {}",
                cursor, row.id, row.stake, status, hint
            );
            let style = if i == state.list_idx {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::styled(text, style));
        }
    }
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Sessions"));
    f.render_widget(p, area);
}

fn draw_board(f: &mut Frame, state: &UiState, area: Rect, board: &BoardSnapshot) {
    let title = format!("Game {}", board.session);
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::styled(
        board.headline.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    if let Some(mark) = board.local_mark {
        lines.push(Line::from(format!("You play {}", mark.glyph())));
    }
    lines.push(Line::from(""));
    // the cursor only lights up when a mark could actually be placed
    let can_place = board.your_turn && !board.game_over && !board.pending;
    for row in 0..Board::SIDE {
        let mut spans: Vec<Span> = Vec::new();
        for col in 0..Board::SIDE {
            let cell = board.board.cell(row, col);
            let selected = can_place && state.cursor == (row, col);
            let style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                match cell {
                    Cell::MarkA => Style::default().fg(Color::Cyan),
                    Cell::MarkB => Style::default().fg(Color::Magenta),
                    Cell::Empty => Style::default().fg(Color::DarkGray),
                }
            };
            let glyph = if cell.is_empty() { "." } else { cell.glyph() };
            spans.push(Span::styled(format!(" {glyph} "), style));
            if col + 1 < Board::SIDE {
                spans.push(Span::raw("|"));
            }
        }
        lines.push(Line::from(spans));
        if row + 1 < Board::SIDE {
            lines.push(Line::from("---+---+---"));
        }
    }
    if board.pending {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "move pending confirmation",
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_bottom(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let help = if state.on_board {
        "arrows/hjkl: move  Enter/space: place  Esc: back to list  a/b: switch actor  q: quit"
    } else {
        "up/down: select  Enter: join/open  n: new session  a/b: switch actor  q: quit"
    };
    let mut lines = vec![Line::from(help)];
    for err in &snap.errors {
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help / Errors"));
    f.render_widget(p, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::CreateModal(cs) => {
            let area = centered_rect(40, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("New Session");
            let cursor_pad = " ".repeat(cs.input.width());
            let p = Paragraph::new(format!(
                "Set your stake:\n{}_\n{}Enter=submit Esc=cancel",
                cs.input, cursor_pad
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit?");
            let p = Paragraph::new("y = quit, n = stay");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
