use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Cell as UICell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::domain::TableKind;
use crate::export::Cell;
use crate::model::{Model, Summary, TablePage, UIData};

pub struct DashboardUI {
    table_state: TableState,
}

impl DashboardUI {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [tabs_area, summary_area, table_area, pager_area, status_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(Self::tabs(uidata.active), tabs_area);
        frame.render_widget(Paragraph::new(summary_line(&uidata.summary)), summary_area);
        self.draw_table(frame, table_area, &uidata);
        frame.render_widget(Paragraph::new(pager_line(&uidata)), pager_area);
        self.draw_status(frame, status_area, &uidata);

        if let Some(message) = &uidata.popup_message {
            Self::draw_popup(frame, message);
        }
    }

    fn tabs(active: TableKind) -> Tabs<'static> {
        Tabs::new(TableKind::ALL.map(|k| k.title()))
            .select(active.index())
            .block(Block::default().title(" cartera ").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }

    fn draw_table(&mut self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", uidata.active.title()))
            .title_bottom(Line::from(format!(" orden: {} ", uidata.sort_label)).right_aligned());

        let Some(page) = uidata.page.filter(|p| !p.rows.is_empty()) else {
            let text = if uidata.loading { "Cargando ..." } else { "Sin registros" };
            frame.render_widget(Paragraph::new(text).centered().block(block), area);
            return;
        };

        let widths = column_widths(page);
        let header = Row::new(page.headers.iter().map(|h| UICell::from(*h)))
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));
        let rows = page.rows.iter().map(|cells| {
            Row::new(cells.iter().map(|c| match c {
                Cell::Number(n) => UICell::from(Line::from(format_number(*n)).right_aligned()),
                Cell::Text(s) => UICell::from(s.as_str()),
            }))
        });

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(2)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        self.table_state.select(Some(page.selected));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        match uidata.cmdinput {
            Some((mode, input)) => {
                let prompt = mode.prompt();
                let line = Line::from(vec![prompt.bold(), Span::raw(input.input.as_str())]);
                frame.render_widget(Paragraph::new(line), area);
                let offset = (prompt.chars().count() + input.curser_pos) as u16;
                frame.set_cursor_position((area.x + offset.min(area.width.saturating_sub(1)), area.y));
            }
            None => {
                let line = Line::from(vec![
                    Span::raw(uidata.status_message),
                    "  ? ayuda".dark_gray(),
                ]);
                frame.render_widget(Paragraph::new(line), area);
            }
        }
    }

    fn draw_popup(frame: &mut Frame, message: &str) {
        let area = popup_area(frame.area(), 60, 60);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message)
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL).title(" cartera ")),
            area,
        );
    }
}

impl Default for DashboardUI {
    fn default() -> Self {
        Self::new()
    }
}

fn summary_line(summary: &Summary) -> Line<'static> {
    Line::from(vec![
        " Deudores ".into(),
        summary.debtors.to_string().bold(),
        "  Préstamos ".into(),
        summary.loans.to_string().bold(),
        "  Pagos ".into(),
        summary.payments.to_string().bold(),
        "  Cobradores activos ".into(),
        summary.collectors.to_string().bold(),
        "  Total cobrado ".into(),
        format_number(summary.total_collected).green().bold(),
    ])
}

fn pager_line(uidata: &UIData) -> Line<'static> {
    let Some(page) = uidata.page else {
        return Line::default();
    };
    let pager = &page.pager;
    let arrow = |enabled: bool, s: &'static str| {
        if enabled { s.bold() } else { s.dark_gray() }
    };
    let mut spans = vec![
        arrow(pager.prev_enabled, " ◀ "),
        Span::raw(pager.label()),
        arrow(pager.next_enabled, " ▶ "),
        Span::raw(format!(" {} filas, {} por página", pager.total, pager.page_size)),
    ];
    if !uidata.filter.is_empty() {
        spans.push(format!("  filtro: {}", uidata.filter).yellow());
    }
    Line::from(spans)
}

fn column_widths(page: &TablePage) -> Vec<Constraint> {
    page.headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let widest = page
                .rows
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| match c {
                    Cell::Number(n) => format_number(*n).chars().count(),
                    Cell::Text(s) => s.chars().count(),
                })
                .max()
                .unwrap_or(0);
            Constraint::Min(widest.max(h.chars().count()) as u16)
        })
        .collect()
}

/// Groups thousands with `.` and shows at most two decimals after `,`.
pub fn format_number(n: f64) -> String {
    let negative = n < 0.0;
    let cents = (n.abs() * 100.0).round() as u128;
    let (int, frac) = (cents / 100, cents % 100);

    let digits = int.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if frac != 0 {
        grouped.push_str(&format!(",{frac:02}"));
    }
    if negative && cents != 0 {
        grouped.insert(0, '-');
    }
    grouped
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
