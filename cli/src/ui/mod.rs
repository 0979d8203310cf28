mod spectrum;

use crate::{
    app::{AppCommand, AppEvent, AppState, Focus, NoticeLevel},
    types::{MAX_LYRICS_CHARS, STYLE_PRESETS},
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use spectrum::{SpectrumView, PIXELS_PER_ROW};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::warn;

const PRIMARY: Color = Color::Rgb(139, 92, 246);
const PINK: Color = Color::Rgb(236, 72, 153);
const KEY_HINTS: &str =
    "Tab focus | Enter/Ctrl+G create | Ctrl+R surprise | Space play | f fav | s share | d download | x delete | Esc stop | Ctrl+C quit";

pub fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    event_rx: &mut UnboundedReceiver<AppEvent>,
    command_tx: UnboundedSender<AppCommand>,
    frame_interval: Duration,
) -> Result<()> {
    let started = Instant::now();
    loop {
        loop {
            match event_rx.try_recv() {
                Ok(event) => {
                    if let Some(command) = app.handle_event(event) {
                        dispatch(&command_tx, command);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("controller event channel closed");
                    break;
                }
            }
        }

        app.on_frame(Instant::now());
        let time_seconds = started.elapsed().as_secs_f64();
        terminal.draw(|frame| render(frame, app, time_seconds))?;

        if event::poll(frame_interval)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(command) = handle_key(app, key) {
                        dispatch(&command_tx, command);
                    }
                }
            }
        }

        if app.should_quit() {
            break;
        }
    }
    Ok(())
}

fn dispatch(command_tx: &UnboundedSender<AppCommand>, command: AppCommand) {
    if command_tx.send(command).is_err() {
        warn!("controller is no longer accepting commands");
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.request_quit();
            None
        }
        KeyCode::Char('r') if ctrl => {
            app.surprise_me(&mut rand::thread_rng());
            None
        }
        KeyCode::Char('g') if ctrl => app.submit(),
        KeyCode::Tab => {
            app.focus = app.focus.next();
            None
        }
        KeyCode::BackTab => {
            app.focus = app.focus.previous();
            None
        }
        KeyCode::Esc => {
            app.stop_playback();
            None
        }
        _ => match app.focus {
            Focus::Library => handle_library_key(app, key.code),
            Focus::Style => handle_style_key(app, key.code),
            Focus::Title | Focus::Lyrics => handle_text_key(app, key.code),
        },
    }
}

fn handle_text_key(app: &mut AppState, code: KeyCode) -> Option<AppCommand> {
    match code {
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => {
            app.backspace();
            None
        }
        KeyCode::Char(c) => {
            app.type_char(c);
            None
        }
        _ => None,
    }
}

fn handle_style_key(app: &mut AppState, code: KeyCode) -> Option<AppCommand> {
    match code {
        KeyCode::Left => app.move_style_cursor(false),
        KeyCode::Right => app.move_style_cursor(true),
        KeyCode::Char(' ') => app.toggle_style_preset(),
        KeyCode::Enter => return app.submit(),
        _ => {}
    }
    None
}

fn handle_library_key(app: &mut AppState, code: KeyCode) -> Option<AppCommand> {
    match code {
        KeyCode::Up => app.select_previous_track(),
        KeyCode::Down => app.select_next_track(),
        KeyCode::Char('q') => app.request_quit(),
        _ => {
            let track_id = app.selected()?.id.clone();
            match code {
                KeyCode::Enter | KeyCode::Char(' ') => app.toggle_playback(&track_id),
                KeyCode::Char('f') => app.toggle_favorite(&track_id),
                KeyCode::Char('s') => app.share_track(&track_id),
                KeyCode::Char('d') => return app.download_track(&track_id),
                KeyCode::Char('x') | KeyCode::Delete => app.delete_track(&track_id),
                _ => {}
            }
        }
    }
    None
}

fn render(frame: &mut Frame, app: &mut AppState, time_seconds: f64) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(4), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[0]);

    render_console(frame, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(8)])
        .split(columns[1]);
    render_library(frame, app, right[0]);
    render_now_playing(frame, app, right[1], time_seconds);

    render_notices(frame, app, rows[1]);
    let hints = Paragraph::new(KEY_HINTS)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM));
    frame.render_widget(hints, rows[2]);
}

fn focus_style(app: &AppState, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_console(frame: &mut Frame, app: &AppState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("ai-music-studio")
        .border_style(Style::default().fg(PRIMARY));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let progress_height = if app.is_generating() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(4),
            Constraint::Length(1),
            Constraint::Length(progress_height),
        ])
        .split(inner);

    let input_style =
        if app.is_generating() { Style::default().fg(Color::DarkGray) } else { Style::default() };

    let title = Paragraph::new(app.draft.title.as_str()).style(input_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Song Title")
            .border_style(focus_style(app, Focus::Title)),
    );
    frame.render_widget(title, chunks[0]);

    let presets: Vec<Span> = STYLE_PRESETS
        .iter()
        .enumerate()
        .flat_map(|(index, preset)| {
            let selected = app.draft.style == *preset;
            let under_cursor = app.focus == Focus::Style && app.style_cursor == index;
            let mut style = if selected {
                Style::default().fg(Color::Black).bg(PRIMARY)
            } else {
                Style::default().fg(Color::Gray)
            };
            if under_cursor {
                style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
            }
            [Span::styled(format!(" {preset} "), style), Span::raw(" ")]
        })
        .collect();
    let style_title = if app.draft.style.is_empty() || STYLE_PRESETS.contains(&app.draft.style.as_str())
    {
        "Music Style".to_string()
    } else {
        format!("Music Style: {}", app.draft.style)
    };
    let styles = Paragraph::new(Line::from(presets)).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(style_title)
            .border_style(focus_style(app, Focus::Style)),
    );
    frame.render_widget(styles, chunks[1]);

    let lyrics = Paragraph::new(app.draft.lyrics.as_str())
        .style(input_style)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Lyrics / Mood (optional)")
                .title_bottom(
                    Line::from(format!(
                        "{}/{MAX_LYRICS_CHARS}",
                        app.draft.lyrics.chars().count()
                    ))
                    .alignment(Alignment::Right),
                )
                .border_style(focus_style(app, Focus::Lyrics)),
        );
    frame.render_widget(lyrics, chunks[2]);

    let (label, style) = if app.is_generating() {
        ("GENERATING...", Style::default().fg(PINK).add_modifier(Modifier::BOLD))
    } else if app.can_create() {
        ("CREATE MUSIC", Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD))
    } else {
        ("CREATE MUSIC", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(Paragraph::new(label).alignment(Alignment::Center).style(style), chunks[3]);

    let session = app.session();
    if let Some(reason) = session.failure() {
        frame.render_widget(
            Paragraph::new(format!(">> Generation failed: {reason}"))
                .style(Style::default().fg(Color::Red)),
            chunks[4],
        );
    } else if app.is_generating() {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(session.status_message()))
            .gauge_style(Style::default().fg(PINK).bg(Color::Black))
            .percent(session.status().progress_percent())
            .label(session.pending_prompt().unwrap_or_default().to_string());
        frame.render_widget(gauge, chunks[4]);
    }
}

fn render_library(frame: &mut Frame, app: &AppState, area: Rect) {
    let library = app.library();
    let items: Vec<ListItem> = library
        .iter()
        .map(|track| {
            let playing = app.currently_playing() == Some(track.id.as_str());
            let marker = if playing { "❚❚ " } else { "▶ " };
            let heart = if library.is_favorite(&track.id) { " ♥" } else { "" };
            let title_style = if playing {
                Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(PRIMARY)),
                    Span::styled(track.display_title(), title_style),
                    Span::styled(heart, Style::default().fg(PINK)),
                ]),
                Line::from(Span::styled(
                    format!("   {}", track.display_timestamp()),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let title = format!("Your Music Library ({})", library.len());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(focus_style(app, Focus::Library)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !library.is_empty() {
        state.select(Some(app.selected_track));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_now_playing(frame: &mut Frame, app: &mut AppState, area: Rect, time_seconds: f64) {
    let title = match app.currently_playing().and_then(|id| app.library().get(id)) {
        Some(track) => format!("Now Playing: {}", track.display_title()),
        None => ">> Ready to create music...".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let height = (inner.height * PIXELS_PER_ROW) as usize;
    if let Some((surface, _)) = app.draw_spectrum(width, height, time_seconds) {
        frame.render_widget(SpectrumView::new(surface), inner);
    }
}

fn render_notices(frame: &mut Frame, app: &AppState, area: Rect) {
    let lines: Vec<Line> = app
        .notices()
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|notice| {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Line::from(Span::styled(notice.message.clone(), Style::default().fg(color)))
        })
        .collect();
    let notices = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(notices, area);
}
