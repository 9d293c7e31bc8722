use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};
use ussd_core::{Status, UssdApp};

const TICK_RATE: Duration = Duration::from_millis(250);
const PHONE_WIDTH: u16 = 36;
const MAX_INPUT_LEN: usize = 160;
const MAX_TRANSCRIPT: usize = 200;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            danger: Color::Red,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// One exchange shown in the transcript pane.
struct TranscriptEntry {
    at: String,
    sent: String,
    status: Status,
    first_line: String,
}

/// A phone dialing a single menu application.
pub struct SimApp {
    app: UssdApp,
    msisdn: String,
    session_id: Option<String>,
    dialed: usize,
    page: Option<(Status, String)>,
    input: String,
    transcript: Vec<TranscriptEntry>,
    status: String,
    theme: Theme,
    should_quit: bool,
}

impl SimApp {
    pub fn new(app: UssdApp, msisdn: String) -> Self {
        Self {
            app,
            msisdn,
            session_id: None,
            dialed: 0,
            page: None,
            input: String::new(),
            transcript: Vec::new(),
            status: "Press Enter to dial".to_string(),
            theme: Theme::default(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) => self.handle_key(key).await,
                Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => {}
                None => break,
            }
            if self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Enter => self.send().await,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch) if self.input.len() < MAX_INPUT_LEN => self.input.push(ch),
            _ => {}
        }
    }

    /// Dial when no session is active, otherwise answer the current page.
    async fn send(&mut self) {
        let input = std::mem::take(&mut self.input);
        let session_id = match &self.session_id {
            Some(id) => id.clone(),
            None => {
                self.dialed += 1;
                let id = format!("sim-{}-{}", Local::now().format("%H%M%S"), self.dialed);
                info!(msisdn = %self.msisdn, session_id = %id, "Dialing");
                self.session_id = Some(id.clone());
                id
            }
        };

        let (status, body) = self.app.handle_raw(&self.msisdn, &session_id, &input).await;
        debug!(status = %status, chars = body.chars().count(), "Received page");
        self.record(&input, status, &body);

        if status == Status::End {
            self.session_id = None;
            self.status = "Session ended. Press Enter to dial again".to_string();
        } else {
            self.status = format!(
                "Session {session_id} • {} chars",
                body.chars().count()
            );
        }
        self.page = Some((status, body));
    }

    fn record(&mut self, sent: &str, status: Status, body: &str) {
        self.transcript.push(TranscriptEntry {
            at: Local::now().format("%H:%M:%S").to_string(),
            sent: if sent.is_empty() { "(dial)".to_string() } else { sent.to_string() },
            status,
            first_line: body.lines().next().unwrap_or_default().to_string(),
        });
        if self.transcript.len() > MAX_TRANSCRIPT {
            self.transcript.remove(0);
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(4)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length((PHONE_WIDTH + 2).min(rows[0].width)),
                Constraint::Min(20),
            ])
            .split(rows[0]);

        self.draw_phone(frame, columns[0]);
        self.draw_transcript(frame, columns[1]);
        self.render_status(frame, rows[1]);
    }

    fn draw_phone(&self, frame: &mut Frame, area: Rect) {
        let title = format!("{} • {}", self.app.name(), self.msisdn);
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(inner);

        let (text, style) = match &self.page {
            Some((Status::Continue, body)) => (body.clone(), Style::default().fg(self.theme.primary_fg)),
            Some((Status::End, body)) => (body.clone(), Style::default().fg(self.theme.muted)),
            None => (
                "Press Enter to dial the service.".to_string(),
                Style::default().fg(self.theme.muted),
            ),
        };
        let lines: Vec<Line> = text
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), style)))
            .collect();
        let page = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(page, layout[0]);

        let prompt = if self.session_id.is_some() { "Reply" } else { "Dial" };
        let input = Paragraph::new(Line::from(vec![
            Span::styled(
                format!("{}_", self.input),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL).title(prompt))
        .alignment(Alignment::Left);
        frame.render_widget(input, layout[1]);
    }

    fn draw_transcript(&self, frame: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let skip = self.transcript.len().saturating_sub(visible);
        let items: Vec<ListItem> = self
            .transcript
            .iter()
            .skip(skip)
            .map(|entry| {
                let color = match entry.status {
                    Status::Continue => self.theme.success,
                    Status::End => self.theme.danger,
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", entry.at), Style::default().fg(self.theme.muted)),
                    Span::styled(
                        format!("> {:<8} ", entry.sent),
                        Style::default().fg(self.theme.accent),
                    ),
                    Span::styled(
                        format!("{} ", entry.status.tag()),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(entry.first_line.clone()),
                ]))
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Transcript"));
        frame.render_widget(list, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let secondary = "Enter: send  Backspace: edit  Esc: quit";
        let paragraph = Paragraph::new(vec![Line::from(self.status.clone()), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
