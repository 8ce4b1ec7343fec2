// 📺 Occupancy Board - read-only live view of the lot
//
// Two pages: vehicles inside right now (with the running fee a casual
// driver would owe if they left this second) and the exit history.

use crate::fees;
use crate::ledger::Ledger;
use crate::models::{HistoryRecord, ParkedVehicle};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rust_decimal::Decimal;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Parked,
    History,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Parked => Page::History,
            Page::History => Page::Parked,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Parked => "Parked Now",
            Page::History => "Exit History",
        }
    }
}

/// A parked vehicle plus what the board shows about it
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub parked: ParkedVehicle,
    pub subscriber: bool,
    pub running_fee: Decimal,
}

#[derive(Debug, Default, PartialEq)]
pub struct BoardStats {
    pub inside: usize,
    pub subscribers_inside: usize,
    pub casual_inside: usize,
    pub running_total: Decimal,
}

pub struct App {
    pub parked: Vec<BoardRow>,
    pub history: Vec<HistoryRecord>,
    pub parked_state: TableState,
    pub history_state: TableState,
    pub current_page: Page,
    pub refreshed_at: DateTime<Utc>,
}

impl App {
    pub fn load(ledger: &Ledger, now: DateTime<Utc>) -> Result<Self> {
        let mut app = App {
            parked: Vec::new(),
            history: Vec::new(),
            parked_state: TableState::default(),
            history_state: TableState::default(),
            current_page: Page::Parked,
            refreshed_at: now,
        };
        app.refresh(ledger, now)?;
        Ok(app)
    }

    /// Re-read the ledger and re-price every parked vehicle as of `now`
    pub fn refresh(&mut self, ledger: &Ledger, now: DateTime<Utc>) -> Result<()> {
        let mut rows = Vec::new();
        for parked in ledger.list_parked()? {
            let subscriber = ledger.is_subscriber(parked.plate())?;
            let charge = fees::compute_charge(subscriber, parked.entry_timestamp, now);
            rows.push(BoardRow {
                parked,
                subscriber,
                running_fee: charge.amount,
            });
        }

        self.parked = rows;
        self.history = ledger.history()?;
        self.refreshed_at = now;

        clamp_selection(&mut self.parked_state, self.parked.len());
        clamp_selection(&mut self.history_state, self.history.len());
        Ok(())
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    fn active(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Parked => (&mut self.parked_state, self.parked.len()),
            Page::History => (&mut self.history_state, self.history.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn stats(&self) -> BoardStats {
        let mut stats = BoardStats::default();

        for row in &self.parked {
            stats.inside += 1;
            if row.subscriber {
                stats.subscribers_inside += 1;
            } else {
                stats.casual_inside += 1;
            }
            stats.running_total += row.running_fee;
        }

        stats
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), len) if i >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

pub fn run_ui(ledger: &Ledger) -> Result<()> {
    let mut app = App::load(ledger, Utc::now())?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, ledger);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    ledger: &Ledger,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Tab | KeyCode::BackTab => app.next_page(),
                KeyCode::Char('r') => app.refresh(ledger, Utc::now())?,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Parked => render_parked(f, chunks[1], app),
        Page::History => render_history(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let mut spans = vec![];
    for (i, page) in [Page::Parked, Page::History].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Inside: {}", stats.inside),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("Subscribers: {}", stats.subscribers_inside),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("Casual: {} (R$ {:.2} running)", stats.casual_inside, stats.running_total),
        Style::default().fg(Color::Yellow),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn render_parked(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.parked.iter().map(|row| {
        let (kind, color) = if row.subscriber {
            ("Subscriber", Color::Green)
        } else {
            ("Casual", Color::Yellow)
        };

        Row::new(vec![
            Cell::from(row.parked.vehicle.plate.clone()),
            Cell::from(truncate(&row.parked.vehicle.name, 24)),
            Cell::from(truncate(&row.parked.vehicle.model, 16)),
            Cell::from(truncate(&row.parked.vehicle.color, 10)),
            Cell::from(local_time(&row.parked.entry_timestamp)),
            Cell::from(kind).style(Style::default().fg(color)),
            Cell::from(format!("{:.2}", row.running_fee)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(26),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Plate", "Name", "Model", "Color", "Entry", "Plan", "Due"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Parked Now "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.parked_state);
}

fn render_history(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.history.iter().map(|record| {
        let color = if record.amount_paid.is_zero() {
            Color::Green
        } else {
            Color::White
        };

        Row::new(vec![
            Cell::from(record.vehicle.plate.clone()),
            Cell::from(truncate(&record.vehicle.name, 24)),
            Cell::from(local_time(&record.entry_timestamp)),
            Cell::from(local_time(&record.exit_timestamp)),
            Cell::from(format!("{:.2}", record.amount_paid)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(26),
            Constraint::Length(18),
            Constraint::Length(18),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Plate", "Name", "Entry", "Exit", "Paid"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Exit History "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.history_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = match app.current_page {
        Page::Parked => (app.parked_state.selected(), app.parked.len()),
        Page::History => (app.history_state.selected(), app.history.len()),
    };
    let selected = selected.map(|i| i + 1).unwrap_or(0);

    let spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("As of {}", local_time(&app.refreshed_at)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Refresh | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 7, 0, 0).unwrap()
    }

    fn busy_lot() -> Ledger {
        let mut ledger = Ledger::open_in_memory().unwrap();
        ledger.enroll("Jane Silva", "XYZ5678", "Gol", "Red").unwrap();
        ledger.check_in("Jane Silva", "XYZ5678", "Gol", "Red", t0()).unwrap();
        ledger.check_in("Pedro Alves", "ABC1234", "Uno", "Blue", t0()).unwrap();
        ledger.check_in("Ana Costa", "DEF1G23", "Ka", "White", t0()).unwrap();
        ledger
    }

    #[test]
    fn test_board_prices_running_stays() {
        let ledger = busy_lot();
        let app = App::load(&ledger, t0() + Duration::minutes(90)).unwrap();

        let stats = app.stats();
        assert_eq!(stats.inside, 3);
        assert_eq!(stats.subscribers_inside, 1);
        assert_eq!(stats.casual_inside, 2);
        assert_eq!(stats.running_total, dec!(30.00));

        let jane = app.parked.iter().find(|r| r.parked.plate() == "XYZ5678").unwrap();
        assert!(jane.subscriber);
        assert_eq!(jane.running_fee, dec!(0.00));
    }

    #[test]
    fn test_refresh_picks_up_exits() {
        let mut ledger = busy_lot();
        let mut app = App::load(&ledger, t0()).unwrap();
        app.parked_state.select(Some(2));

        ledger.check_out("ABC1234", t0() + Duration::hours(1)).unwrap();
        app.refresh(&ledger, t0() + Duration::hours(1)).unwrap();

        assert_eq!(app.parked.len(), 2);
        assert_eq!(app.history.len(), 1);
        // selection pulled back inside the shorter list
        assert_eq!(app.parked_state.selected(), Some(1));
        assert_eq!(app.history_state.selected(), Some(0));
    }

    #[test]
    fn test_navigation_wraps_per_page() {
        let ledger = busy_lot();
        let mut app = App::load(&ledger, t0()).unwrap();

        assert_eq!(app.parked_state.selected(), Some(0));
        app.previous();
        assert_eq!(app.parked_state.selected(), Some(2));
        app.next();
        assert_eq!(app.parked_state.selected(), Some(0));

        // history is empty: moving there does nothing
        app.next_page();
        assert_eq!(app.current_page, Page::History);
        app.next();
        assert_eq!(app.history_state.selected(), None);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("João", 10), "João");
        assert_eq!(truncate("Conceição Aparecida", 10), "Conceiç...");
    }
}
