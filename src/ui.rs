use anyhow::Result;
use crime_dashboard::aggregate::{self, CrimeTrends};
use crime_dashboard::config::DefaultSelection;
use crime_dashboard::dataset::month_name;
use crime_dashboard::{
    summary_cards, Config, CrimeRecord, CrimeType, Dataset, Filter, SummaryCards, Tab,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset as Series, GraphType, Paragraph,
        Row, Table, TableState, Tabs,
    },
    Frame, Terminal,
};
use std::io;

const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Red,
    Color::Blue,
];

pub struct App {
    pub dataset: Dataset,
    defaults: DefaultSelection,
    pub filter: Filter,
    pub tab: Tab,
    pub unit_cursor: usize,
    pub table_state: TableState,
    max_rows: usize,
}

impl App {
    pub fn new(dataset: Dataset, config: &Config) -> Self {
        let filter = Filter::from_defaults(&dataset, &config.defaults);
        let mut table_state = TableState::default();
        table_state.select(Some(0));

        Self {
            dataset,
            defaults: config.defaults.clone(),
            filter,
            tab: Tab::Overview,
            unit_cursor: 0,
            table_state,
            max_rows: config.table.max_rows,
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    pub fn previous_tab(&mut self) {
        self.tab = self.tab.previous();
    }

    pub fn current_unit(&self) -> &str {
        self.dataset.units()[self.unit_cursor].as_str()
    }

    pub fn next_unit(&mut self) {
        self.unit_cursor = (self.unit_cursor + 1) % self.dataset.units().len();
    }

    pub fn previous_unit(&mut self) {
        let len = self.dataset.units().len();
        self.unit_cursor = (self.unit_cursor + len - 1) % len;
    }

    pub fn toggle_current_unit(&mut self) {
        let unit = self.current_unit().to_string();
        self.filter.toggle_unit(&unit);
    }

    pub fn select_all_units(&mut self) {
        self.filter.units = self.dataset.units().iter().cloned().collect();
    }

    pub fn reset(&mut self) {
        self.filter = Filter::from_defaults(&self.dataset, &self.defaults);
        self.table_state.select(Some(0));
    }

    /// Move the start year, never past the end year or the dataset bounds.
    pub fn shift_start_year(&mut self, delta: i32) {
        let (min, _) = self.dataset.year_bounds();
        let years = &mut self.filter.years;
        years.start = (years.start + delta).clamp(min, years.end);
    }

    /// Move the end year, never before the start year or past the bounds.
    pub fn shift_end_year(&mut self, delta: i32) {
        let (_, max) = self.dataset.year_bounds();
        let years = &mut self.filter.years;
        years.end = (years.end + delta).clamp(years.start, max);
    }

    pub fn rows(&self) -> Vec<&CrimeRecord> {
        self.filter.apply(&self.dataset)
    }

    pub fn summary(&self) -> SummaryCards {
        summary_cards(&self.dataset, &self.filter)
    }

    pub fn next_row(&mut self) {
        let len = self.rows().len().min(self.max_rows);
        if len == 0 {
            return;
        }
        let i = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.table_state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let i = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_tab(),
                KeyCode::BackTab => app.previous_tab(),
                KeyCode::Right | KeyCode::Char('l') => app.next_unit(),
                KeyCode::Left | KeyCode::Char('h') => app.previous_unit(),
                KeyCode::Char(' ') => app.toggle_current_unit(),
                KeyCode::Char('a') => app.select_all_units(),
                KeyCode::Char('c') => app.reset(),
                KeyCode::Char('[') => app.shift_start_year(-1),
                KeyCode::Char(']') => app.shift_start_year(1),
                KeyCode::Char('{') => app.shift_end_year(-1),
                KeyCode::Char('}') => app.shift_end_year(1),
                KeyCode::Down | KeyCode::Char('j') => app.next_row(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_row(),
                KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.next_tab()
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Length(4), // Summary cards
            Constraint::Length(3), // Filter controls
            Constraint::Min(0),    // Tab content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_tabs(f, chunks[0], app);
    render_summary(f, chunks[1], app);
    render_filters(f, chunks[2], app);

    match app.tab {
        Tab::Overview => render_overview(f, chunks[3], app),
        Tab::Trends => render_trends(f, chunks[3], app),
        Tab::Analysis => render_analysis(f, chunks[3], app),
        Tab::Data => render_data(f, chunks[3], app),
    }

    render_status_bar(f, chunks[4]);
}

fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let selected = Tab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Bangladesh Crime Data Dashboard "),
        )
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );

    f.render_widget(tabs, area);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let cards = app.summary();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);

    let entries = [
        ("Total Cases", cards.total_cases, Color::Blue),
        ("Avg Monthly", cards.avg_monthly, Color::Green),
        ("Peak Crime", cards.peak_crime, Color::Yellow),
        ("Units", cards.units, Color::Cyan),
    ];

    for (i, (title, value, color)) in entries.into_iter().enumerate() {
        let card = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .alignment(ratatui::layout::Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
        f.render_widget(card, columns[i]);
    }
}

fn render_filters(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled("Units: ", Style::default().fg(Color::White))];

    for (i, unit) in app.dataset.units().iter().enumerate() {
        let selected = app.filter.units.contains(unit);
        let mut style = if selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if i == app.unit_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let mark = if selected { "✓" } else { " " };
        spans.push(Span::styled(format!("[{}{}]", mark, unit), style));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::raw(" |  Years: "));
    spans.push(Span::styled(
        format!("{}-{}", app.filter.years.start, app.filter.years.end),
        Style::default().fg(Color::Yellow),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(paragraph, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let rows = app.rows();

    // Crime type distribution as bars
    let totals = aggregate::crime_distribution(&rows, &app.filter.crimes);
    let labels: Vec<(String, u64)> = totals
        .iter()
        .map(|(crime, n)| (short_label(*crime), *n))
        .collect();
    let bars: Vec<(&str, u64)> = labels.iter().map(|(l, n)| (l.as_str(), *n)).collect();
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Crime Type Distribution "),
        )
        .data(bars.as_slice())
        .bar_width(7)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, halves[0]);

    // Monthly totals as a line
    let monthly = aggregate::monthly_totals(&rows);
    let points: Vec<(f64, f64)> = monthly
        .iter()
        .enumerate()
        .map(|(i, (_, total))| (i as f64, *total as f64))
        .collect();
    let max_y = monthly.iter().map(|(_, t)| *t).max().unwrap_or(0) as f64;
    let x_labels = match (monthly.first(), monthly.last()) {
        (Some((first, _)), Some((last, _))) => vec![
            Span::raw(first.format("%Y-%m").to_string()),
            Span::raw(last.format("%Y-%m").to_string()),
        ],
        _ => vec![],
    };

    let series = vec![Series::default()
        .name("Total Cases")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(&points)];

    let chart = Chart::new(series)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Monthly Crime Trend "),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .bounds([0.0, points.len().saturating_sub(1).max(1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Total Cases")
                .bounds([0.0, max_y.max(1.0)])
                .labels(axis_labels(max_y)),
        );
    f.render_widget(chart, halves[1]);
}

fn render_trends(f: &mut Frame, area: Rect, app: &App) {
    let rows = app.rows();
    let CrimeTrends { dates, series } = aggregate::crime_trends(&rows, &app.filter.crimes);

    let points: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|(_, counts)| {
            counts
                .iter()
                .enumerate()
                .map(|(i, n)| (i as f64, *n as f64))
                .collect()
        })
        .collect();
    let max_y = series
        .iter()
        .flat_map(|(_, counts)| counts.iter().copied())
        .max()
        .unwrap_or(0) as f64;

    let datasets: Vec<Series> = series
        .iter()
        .zip(points.iter())
        .enumerate()
        .map(|(i, ((crime, _), data))| {
            Series::default()
                .name(crime.label())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(data)
        })
        .collect();

    let x_labels = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => vec![
            Span::raw(first.format("%Y-%m").to_string()),
            Span::raw(last.format("%Y-%m").to_string()),
        ],
        _ => vec![],
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Crime Trends Over Time "),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .bounds([0.0, dates.len().saturating_sub(1).max(1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Cases")
                .bounds([0.0, max_y.max(1.0)])
                .labels(axis_labels(max_y)),
        );
    f.render_widget(chart, area);
}

fn render_analysis(f: &mut Frame, area: Rect, app: &App) {
    let rows = app.rows();
    let seasonal = aggregate::seasonal_pattern(&rows);

    let bars: Vec<(&str, u64)> = seasonal
        .iter()
        .map(|(month, avg)| (&month_name(*month)[..3], avg.round() as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Seasonal Patterns (average cases per unit-month) "),
        )
        .data(bars.as_slice())
        .bar_width(5)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green));
    f.render_widget(chart, area);
}

fn render_data(f: &mut Frame, area: Rect, app: &mut App) {
    let crimes: Vec<CrimeType> = if app.filter.crimes.is_empty() {
        CrimeType::ALL[..5].to_vec()
    } else {
        app.filter.crimes.iter().copied().take(6).collect()
    };

    let mut headers = vec!["Unit".to_string(), "Date".to_string()];
    headers.extend(crimes.iter().map(|c| short_label(*c)));
    headers.push("Total".to_string());

    let header = Row::new(headers.into_iter().map(|h| {
        Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.rows();
    let shown = rows.len().min(app.max_rows);
    let table_rows: Vec<Row> = rows
        .iter()
        .take(app.max_rows)
        .map(|r| {
            let mut cells = vec![
                Cell::from(truncate(&r.unit, 18)),
                Cell::from(r.date.format("%Y-%m").to_string()),
            ];
            cells.extend(crimes.iter().map(|c| Cell::from(r.count(*c).to_string())));
            cells.push(
                Cell::from(r.total_cases.to_string()).style(Style::default().fg(Color::Cyan)),
            );
            Row::new(cells).height(1)
        })
        .collect();

    let mut widths = vec![Constraint::Length(20), Constraint::Length(9)];
    widths.extend(crimes.iter().map(|_| Constraint::Length(12)));
    widths.push(Constraint::Length(10));

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Filtered Data (showing {} of {} rows) ", shown, rows.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let keys = [
        ("Tab", " Page | "),
        ("←/→", " Unit | "),
        ("Space", " Toggle | "),
        ("a", " All | "),
        ("[ ]", " From | "),
        ("{ }", " To | "),
        ("c", " Reset | "),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (key, action) in keys {
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(action));
    }
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}

fn axis_labels(max: f64) -> Vec<Span<'static>> {
    vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", max / 2.0)),
        Span::raw(format!("{:.0}", max)),
    ]
}

/// Bar labels have little room: "Woman & Child Repression" → "Woman &".
fn short_label(crime: CrimeType) -> String {
    truncate(crime.label(), 7)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect::<String>().trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    const HEADER: &str = "Unit,Year,Month,Dacoity,Robbery,Murder,Speedy_Trial,Riot,Woman_Child_Repression,Kidnapping,Police_Assault,Burglary,Theft,Other_Cases,Arms_Act,Explosive_Act,Narcotics,Smuggling,Recovery_Cases";

    fn dataset() -> Dataset {
        let mut csv = String::from(HEADER);
        for (unit, year, month) in [
            ("CMP", 2021, "January"),
            ("DMP", 2021, "January"),
            ("DMP", 2022, "June"),
            ("RMP", 2023, "December"),
        ] {
            let counts = vec!["2"; CrimeType::COUNT].join(",");
            csv.push_str(&format!("\n{},{},{},{}", unit, year, month, counts));
        }
        Dataset::from_reader(csv.as_bytes()).unwrap()
    }

    fn app() -> App {
        App::new(dataset(), &Config::default())
    }

    #[test]
    fn test_app_starts_with_defaults() {
        let app = app();
        assert_eq!(app.tab, Tab::Overview);
        assert_eq!(app.filter.units.len(), 2);
        assert_eq!(app.rows().len(), 3);
        assert_eq!(app.summary().total_cases, "96");
    }

    #[test]
    fn test_tab_navigation() {
        let mut app = app();
        app.next_tab();
        assert_eq!(app.tab, Tab::Trends);
        app.previous_tab();
        app.previous_tab();
        assert_eq!(app.tab, Tab::Data);
    }

    #[test]
    fn test_unit_toggle_and_reset() {
        let mut app = app();
        assert_eq!(app.current_unit(), "CMP");
        app.previous_unit();
        assert_eq!(app.current_unit(), "RMP");
        app.toggle_current_unit();
        assert!(app.filter.units.contains("RMP"));
        assert_eq!(app.summary().units, "3");

        app.reset();
        assert!(!app.filter.units.contains("RMP"));

        app.select_all_units();
        assert_eq!(app.filter.units.len(), 3);
    }

    #[test]
    fn test_year_shifts_stay_in_bounds() {
        let mut app = app();
        assert_eq!((app.filter.years.start, app.filter.years.end), (2021, 2023));

        app.shift_start_year(-1);
        assert_eq!(app.filter.years.start, 2021);
        app.shift_end_year(-5);
        assert_eq!(app.filter.years.end, 2021);
        app.shift_start_year(1);
        assert_eq!(app.filter.years.start, 2021);
        app.shift_end_year(10);
        assert_eq!(app.filter.years.end, 2023);
    }

    #[test]
    fn test_row_navigation() {
        let mut app = app();
        app.next_row();
        app.next_row();
        app.next_row();
        assert_eq!(app.table_state.selected(), Some(2));
        app.previous_row();
        assert_eq!(app.table_state.selected(), Some(1));
    }

    #[test]
    fn test_every_tab_renders() {
        let mut app = app();
        let backend = TestBackend::new(140, 40);
        let mut terminal = Terminal::new(backend).unwrap();

        for _ in Tab::ALL {
            terminal.draw(|f| ui(f, &mut app)).unwrap();
            app.next_tab();
        }

        app.filter.units.clear();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Murder", 7), "Murder");
        assert_eq!(short_label(CrimeType::WomanChildRepression), "Woman &");
        assert_eq!(short_label(CrimeType::ExplosiveAct), "Explosi");
    }
}
