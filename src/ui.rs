use crate::aggregation::{CategoryShares, GroupedCounts, ScalarIndicator, TimeSeries};
use crate::dashboard::{Dashboard, DashboardViews, FacetOptions};
use crate::filter::FilterSelection;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
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
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, List,
        ListItem, ListState, Paragraph, Row, Table,
    },
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Gender,
    City,
}

impl Facet {
    pub fn title(&self) -> &'static str {
        match self {
            Facet::Gender => "Gender",
            Facet::City => "City",
        }
    }
}

/// One selectable line in the facet panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetEntry {
    pub facet: Facet,
    pub value: String,
}

pub struct App {
    dashboard: Arc<Dashboard>,
    pub entries: Vec<FacetEntry>,
    pub selection: FilterSelection,
    pub views: DashboardViews,
    pub facet_state: ListState,
}

impl App {
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        let FacetOptions { genders, cities, .. } = dashboard.facet_options();

        let entries: Vec<FacetEntry> = genders
            .into_iter()
            .map(|value| FacetEntry { facet: Facet::Gender, value })
            .chain(cities.into_iter().map(|value| FacetEntry { facet: Facet::City, value }))
            .collect();

        let mut facet_state = ListState::default();
        if !entries.is_empty() {
            facet_state.select(Some(0));
        }

        let selection = FilterSelection::all();
        let views = dashboard.update(&selection);

        Self {
            dashboard,
            entries,
            selection,
            views,
            facet_state,
        }
    }

    pub fn is_selected(&self, entry: &FacetEntry) -> bool {
        match entry.facet {
            Facet::Gender => self.selection.genders.contains(&entry.value),
            Facet::City => self.selection.cities.contains(&entry.value),
        }
    }

    /// Flip the entry under the cursor and recompute every view.
    pub fn toggle_current(&mut self) {
        let Some(entry) = self.facet_state.selected().and_then(|i| self.entries.get(i)) else {
            return;
        };

        let set = match entry.facet {
            Facet::Gender => &mut self.selection.genders,
            Facet::City => &mut self.selection.cities,
        };
        if !set.remove(&entry.value) {
            set.insert(entry.value.clone());
        }

        self.refresh();
    }

    pub fn clear_selection(&mut self) {
        self.selection = FilterSelection::all();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.views = self.dashboard.update(&self.selection);
    }

    pub fn next(&mut self) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        let i = match self.facet_state.selected() {
            Some(i) if i < len - 1 => i + 1,
            _ => 0,
        };
        self.facet_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        let i = match self.facet_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.facet_state.select(Some(i));
    }

    pub fn selection_summary(&self) -> String {
        fn describe(values: &std::collections::BTreeSet<String>) -> String {
            if values.is_empty() {
                "all".to_string()
            } else {
                values.iter().cloned().collect::<Vec<_>>().join(", ")
            }
        }

        format!(
            "Gender: {}  City: {}",
            describe(&self.selection.genders),
            describe(&self.selection.cities)
        )
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("Dashboard UI failed: {:?}", err);
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char(' ') | KeyCode::Enter => app.toggle_current(),
                KeyCode::Char('c') => app.clear_selection(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => {
                    if !app.entries.is_empty() {
                        app.facet_state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if !app.entries.is_empty() {
                        app.facet_state.select(Some(app.entries.len() - 1));
                    }
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
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(chunks[1]);

    render_facets(f, content[0], app);

    let views = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),       // Indicators
            Constraint::Percentage(50),  // Weekly trend
            Constraint::Min(0),          // Counts and shares
        ])
        .split(content[1]);

    let indicators = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(views[0]);

    render_indicator(f, indicators[0], &app.views.total_amount, 2);
    render_indicator(f, indicators[1], &app.views.average_rating, 2);
    render_trend(f, views[1], &app.views.weekly_amount);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(views[2]);

    render_counts(f, bottom[0], &app.views.orders_by_city_gender);
    render_shares(f, bottom[1], &app.views.product_line_shares);

    render_status_bar(f, chunks[2]);
}

fn city_color(city: &str, index: usize) -> Color {
    match city {
        "Mandalay" => Color::Yellow,
        "Naypyitaw" => Color::Green,
        "Yangon" => Color::Red,
        _ => [Color::Cyan, Color::Magenta, Color::Blue, Color::White][index % 4],
    }
}

fn gender_color(gender: &str) -> Color {
    match gender {
        "Male" => Color::Blue,
        "Female" => Color::LightRed,
        _ => Color::Gray,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let matched = app.views.orders_by_city_gender.total();

    let mut spans = vec![
        Span::styled(
            "Myanmar Supermarkets",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Sales: {}/{}", matched, app.dashboard.store().len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(app.selection_summary(), Style::default().fg(Color::Green)),
    ];
    if let Some((first, last)) = app.dashboard.store().date_range() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("{} to {}", first, last),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let header = Paragraph::new(vec![Line::from(spans)]).block(block);

    f.render_widget(header, area);
}

fn render_facets(f: &mut Frame, area: Rect, app: &mut App) {
    let mut last_facet = None;
    let items: Vec<ListItem> = app
        .entries
        .iter()
        .map(|entry| {
            let mark = if app.is_selected(entry) { "[x]" } else { "[ ]" };
            let heading = if last_facet != Some(entry.facet) {
                last_facet = Some(entry.facet);
                entry.facet.title()
            } else {
                ""
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<7}", heading), Style::default().fg(Color::DarkGray)),
                Span::styled(mark, Style::default().fg(Color::Green)),
                Span::raw(" "),
                Span::raw(entry.value.clone()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Filters "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(list, area, &mut app.facet_state);
}

fn render_indicator(f: &mut Frame, area: Rect, indicator: &ScalarIndicator, precision: usize) {
    let color = if indicator.has_data() { Color::White } else { Color::DarkGray };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", indicator.display_value(precision)),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", indicator.label)),
    );

    f.render_widget(paragraph, area);
}

fn render_trend(f: &mut Frame, area: Rect, series: &TimeSeries) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Weekly Purchase Amount by City ");

    let (Some(first), Some(last)) = (series.points.first(), series.points.last()) else {
        f.render_widget(Paragraph::new("  No data").block(block), area);
        return;
    };

    let x_of = |d: chrono::NaiveDate| f64::from(chrono::Datelike::num_days_from_ce(&d));
    let x_min = x_of(first.week_start);
    let x_max = x_of(last.week_start).max(x_min + 1.0);
    let y_max = series
        .points
        .iter()
        .map(|p| p.amount)
        .fold(0.0_f64, f64::max)
        * 1.1;

    let cities = series.cities();
    let data: Vec<Vec<(f64, f64)>> = cities
        .iter()
        .map(|city| {
            series
                .series_for(city)
                .map(|p| (x_of(p.week_start), p.amount))
                .collect()
        })
        .collect();

    let datasets: Vec<Dataset> = cities
        .iter()
        .zip(data.iter())
        .enumerate()
        .map(|(i, (city, points))| {
            Dataset::default()
                .name(city.to_string())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(city_color(city, i)))
                .data(points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Week")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(first.week_start.format("%Y-%m-%d").to_string()),
                    Span::raw(last.week_start.format("%Y-%m-%d").to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Total ($)")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_max.max(1.0)])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", y_max / 2.0)),
                    Span::raw(format!("{:.0}", y_max)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_counts(f: &mut Frame, area: Rect, counts: &GroupedCounts) {
    // Rows arrive sorted by city, so consecutive rows form one group
    let mut groups: Vec<(&str, Vec<Bar>)> = Vec::new();
    for row in &counts.rows {
        let bar = Bar::default()
            .value(row.count as u64)
            .label(Line::from(row.gender.as_str()))
            .style(Style::default().fg(gender_color(&row.gender)));

        match groups.last_mut() {
            Some((city, bars)) if *city == row.city => bars.push(bar),
            _ => groups.push((row.city.as_str(), vec![bar])),
        }
    }

    let mut chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed))
                .title(" Number of Orders by City and Gender "),
        )
        .bar_width(6)
        .bar_gap(1)
        .group_gap(3);

    for (city, bars) in &groups {
        chart = chart.data(BarGroup::default().label(Line::from(*city)).bars(bars));
    }

    f.render_widget(chart, area);
}

fn render_shares(f: &mut Frame, area: Rect, shares: &CategoryShares) {
    let header_cells = ["Product Line", "Orders", "Share"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = shares.rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.product_line.clone()),
            Cell::from(format!("{}", row.count)),
            Cell::from(format!("{:.1}%", shares.share_of(row) * 100.0)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed))
            .title(" Product Line Distribution "),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let status_spans = vec![
        Span::styled(" Space", Style::default().fg(Color::Yellow)),
        Span::raw(" Toggle | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("c", Style::default().fg(Color::Yellow)),
        Span::raw(" Clear | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::three_sales;
    use crate::dataset::DatasetStore;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let store = Arc::new(DatasetStore::new(three_sales()));
        App::new(Arc::new(Dashboard::new(store)))
    }

    #[test]
    fn test_entries_list_genders_then_cities() {
        let app = app();
        let values: Vec<_> = app.entries.iter().map(|e| (e.facet, e.value.as_str())).collect();

        assert_eq!(
            values,
            vec![
                (Facet::Gender, "Male"),
                (Facet::Gender, "Female"),
                (Facet::City, "Yangon"),
                (Facet::City, "Mandalay"),
            ]
        );
        assert_eq!(app.views.total_amount.value, Some(35.0));
    }

    #[test]
    fn test_toggle_recomputes_views() {
        let mut app = app();

        // Cursor starts on "Male"
        app.toggle_current();
        assert_eq!(app.views.total_amount.value, Some(15.0));
        assert!(app.is_selected(&app.entries[0].clone()));

        // Toggling again removes the filter
        app.toggle_current();
        assert_eq!(app.views.total_amount.value, Some(35.0));
        assert!(app.selection.is_unfiltered());
    }

    #[test]
    fn test_clear_selection() {
        let mut app = app();
        app.next();
        app.next();
        app.toggle_current(); // Yangon
        assert_eq!(app.views.total_amount.value, Some(30.0));

        app.clear_selection();
        assert!(app.selection.is_unfiltered());
        assert_eq!(app.views.total_amount.value, Some(35.0));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.facet_state.selected(), Some(3));
        app.next();
        assert_eq!(app.facet_state.selected(), Some(0));
    }

    #[test]
    fn test_renders_with_and_without_data() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        // Mandalay has no Female sales
        app.selection = FilterSelection::new(["Female"], ["Mandalay"]);
        app.refresh();
        assert!(!app.views.average_rating.has_data());
        terminal.draw(|f| ui(f, &mut app)).unwrap();
    }
}
