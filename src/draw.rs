use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span, Text};
use tui::widgets::{Block, BorderType, Borders, Cell as TableCell, Paragraph, Row, Table, Tabs, Wrap};
use tui::{Frame, Terminal};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::app::{App, MenuItem};
use crate::state::app_state::BetDraft;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use betboard_api::clock::{GameClock, GameState};
use betboard_api::leaderboard::{CellKind, Leaderboard, Placing, build_leaderboard, final_standings};
use betboard_api::scoring::Tier;
use betboard_api::{EngineError, Team};
use chrono::TimeDelta;
use log::error;

static TABS: &[&str; 3] = &["Leaderboard", "Standings", "My Bets"];

const RANK_WIDTH: u16 = 4;
const NAME_WIDTH: u16 = 16;
const TOTAL_WIDTH: u16 = 5;
const FIXTURE_WIDTH: u16 = 7;

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    // One clock sample per frame: every cell agrees on which fixtures are live.
    let clock = app.clock();
    let board = app.state.board.tournament.as_ref().map(|t| {
        build_leaderboard(t, &clock, app.settings.user_id, app.state.sort_order)
    });

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
            draw_status(f, layout.status, app, board.as_ref().and_then(|b| b.as_ref().ok()));
        }

        match (app.state.active_tab, &board) {
            (MenuItem::Help, _) => draw_help(f, layout.main),
            (_, None) => draw_waiting(f, layout.main, app),
            (_, Some(Err(e))) => draw_unavailable(f, layout.main, e),
            (MenuItem::Leaderboard, Some(Ok(board))) => draw_leaderboard(f, layout.main, app, board),
            (MenuItem::Standings, Some(Ok(board))) => draw_standings(f, layout.main, app, board),
            (MenuItem::MyBets, Some(Ok(_))) => draw_my_bets(f, layout.main, app, &clock),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });

    if let Err(e) = result {
        error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Leaderboard => 0,
        MenuItem::Standings => 1,
        MenuItem::MyBets => 2,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let tournament = app
        .state
        .selected_tournament
        .and_then(|id| app.state.tournaments.iter().find(|t| t.id == id))
        .map(|t| t.name.clone())
        .or_else(|| app.state.board.tournament.as_ref().map(|t| t.name.clone()))
        .unwrap_or_else(|| "no tournament".to_string());
    let help = Paragraph::new(format!("{tournament} (t)  Help: ? "))
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App, board: Option<&Leaderboard>) {
    let line = if let Some(err) = app.state.last_error.as_deref() {
        Line::from(Span::styled(format!(" {err}"), Style::default().fg(Color::Red)))
    } else if let Some(status) = app.state.status.as_deref() {
        Line::from(Span::styled(format!(" {status}"), Style::default().fg(Color::Green)))
    } else if let Some(board) = board {
        let loaded = app
            .state
            .board
            .last_loaded_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        Line::from(Span::styled(
            format!(
                " {} finished, {} live, {} upcoming | times in {} | sort {} (s) | updated {loaded}",
                board.count_in_state(GameState::Finished),
                board.count_in_state(GameState::Live),
                board.count_in_state(GameState::Upcoming),
                board.generated_at.offset(),
                board.order.label(),
            ),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_waiting(f: &mut Frame, area: Rect, app: &App) {
    let msg = match (&app.state.last_error, app.state.selected_tournament) {
        (Some(err), _) => format!("Load failed:\n{err}\n\nPress r to retry"),
        (None, Some(_)) => "Loading tournament...".to_string(),
        (None, None) => "Loading tournaments...".to_string(),
    };
    draw_placeholder(f, area, &msg);
}

fn draw_unavailable(f: &mut Frame, area: Rect, err: &EngineError) {
    let block = default_border(Color::Red).title(" Data unavailable ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cause = if err.is_data_integrity() {
        "The tournament data is inconsistent; the board cannot be shown."
    } else {
        "The tournament data could not be interpreted."
    };
    f.render_widget(
        Paragraph::new(format!("{cause}\n\n{err}"))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

// ---------------------------------------------------------------------------
// Leaderboard grid: participants down, fixtures across
// ---------------------------------------------------------------------------

fn draw_leaderboard(f: &mut Frame, area: Rect, app: &App, board: &Leaderboard) {
    let block = default_border(Color::White).title(format!(" {} ", board.tournament_name));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if board.fixtures.is_empty() {
        draw_note(f, inner, "No fixtures scheduled yet");
        return;
    }

    let [grid, legend] = Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

    let fixed = RANK_WIDTH + NAME_WIDTH + TOTAL_WIDTH + 3;
    let visible = (grid.width.saturating_sub(fixed) / (FIXTURE_WIDTH + 1)).max(1) as usize;
    let first = app.state.board.column_offset.min(board.fixtures.len().saturating_sub(1));
    let shown = &board.fixtures[first..(first + visible).min(board.fixtures.len())];

    let mut header = vec![
        TableCell::from("#"),
        TableCell::from("Participant"),
        TableCell::from("Pts"),
    ];
    for fixture in shown {
        let status = match fixture.state {
            GameState::Finished => fixture.score.map(|s| s.to_string()).unwrap_or_default(),
            GameState::Live => "LIVE".to_string(),
            GameState::Upcoming => fixture.kickoff.format("%H:%M").to_string(),
        };
        let style = match fixture.state {
            GameState::Live => Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
            GameState::Finished => Style::default().fg(Color::White),
            GameState::Upcoming => Style::default().fg(Color::Gray),
        };
        header.push(
            TableCell::from(Text::from(vec![
                Line::from(fixture_code(&fixture.home, &fixture.away)),
                Line::from(fixture.kickoff.format("%d.%m").to_string()),
                Line::from(status),
            ]))
            .style(style),
        );
    }

    let rows: Vec<Row> = board
        .standings
        .iter()
        .enumerate()
        .skip(app.state.board.row_offset)
        .map(|(idx, standing)| {
            let is_viewer = app.settings.user_id == Some(standing.participant.id);
            let mut cells = vec![
                TableCell::from(format!("{}", idx + 1)),
                TableCell::from(truncate(&standing.participant.username, NAME_WIDTH as usize)),
                TableCell::from(standing.total_points.to_string()),
            ];
            cells.extend(shown.iter().map(|fixture| {
                let cell = fixture.cells[idx];
                TableCell::from(cell.display_score()).style(cell_style(cell.kind))
            }));
            let row = Row::new(cells);
            if is_viewer {
                row.style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
            } else {
                row
            }
        })
        .collect();

    let mut widths = vec![
        Constraint::Length(RANK_WIDTH),
        Constraint::Length(NAME_WIDTH),
        Constraint::Length(TOTAL_WIDTH),
    ];
    widths.extend(std::iter::repeat_n(Constraint::Length(FIXTURE_WIDTH), shown.len()));

    let table = Table::new(rows, widths)
        .header(
            Row::new(header)
                .height(3)
                .bottom_margin(1)
                .style(Style::default().add_modifier(Modifier::UNDERLINED)),
        )
        .column_spacing(1);
    f.render_widget(table, grid);

    draw_legend(f, legend, first, shown.len(), board.fixtures.len());
}

fn draw_legend(f: &mut Frame, area: Rect, first: usize, shown: usize, total: usize) {
    let mut spans: Vec<Span> = Tier::ALL
        .iter()
        .rev()
        .flat_map(|tier| {
            [
                Span::styled(tier.label(), cell_style(CellKind::from(*tier))),
                Span::raw(format!(" {}  ", tier.points())),
            ]
        })
        .collect();
    spans.push(Span::styled("live", cell_style(CellKind::Pending)));
    spans.push(Span::raw("  "));
    spans.push(Span::styled("?:? hidden", cell_style(CellKind::Hidden)));
    spans.push(Span::styled(
        format!("   fixtures {}-{} of {total} (h/l)", first + 1, first + shown),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn cell_style(kind: CellKind) -> Style {
    match kind {
        CellKind::Exact => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        CellKind::Margin => Style::default().fg(Color::LightGreen),
        CellKind::Outcome => Style::default().fg(Color::Yellow),
        CellKind::Miss => Style::default().fg(Color::Red),
        CellKind::Pending => Style::default().fg(Color::LightBlue),
        CellKind::Placed => Style::default().fg(Color::White),
        CellKind::Hidden | CellKind::NoBet => Style::default().fg(Color::DarkGray),
    }
}

/// `Germany`, `Scotland` → `GER-SCO`.
fn fixture_code(home: &Team, away: &Team) -> String {
    let code = |name: &str| -> String {
        name.chars()
            .filter(|c| c.is_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_uppercase()
    };
    format!("{}-{}", code(&home.name), code(&away.name))
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut out: String = name.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

fn draw_standings(f: &mut Frame, area: Rect, app: &App, board: &Leaderboard) {
    let Some(tournament) = app.state.board.tournament.as_ref() else {
        return;
    };

    let (title, placings) = match final_standings(tournament) {
        Ok(placings) if !tournament.fixtures.is_empty() => (" Final standings ".to_string(), placings),
        Ok(_) | Err(EngineError::TournamentInProgress { .. }) => (
            format!(" Standings (provisional, {}) ", board.order.label()),
            board
                .standings
                .iter()
                .cloned()
                .enumerate()
                .map(|(idx, standing)| Placing { place: idx + 1, standing })
                .collect(),
        ),
        Err(e) => return draw_unavailable(f, area, &e),
    };

    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if placings.is_empty() {
        draw_note(f, inner, "No bets placed yet");
        return;
    }

    let header = Row::new(["#", "Participant", "Pts", "Exact", "Margin", "Outcome", "Bets"])
        .style(Style::default().add_modifier(Modifier::UNDERLINED))
        .bottom_margin(1);

    let rows: Vec<Row> = placings
        .iter()
        .skip(app.state.standings_scroll as usize)
        .map(|p| {
            let s = &p.standing;
            let row = Row::new(vec![
                p.place.to_string(),
                s.participant.username.clone(),
                s.total_points.to_string(),
                s.exact.to_string(),
                s.margin.to_string(),
                s.outcome.to_string(),
                s.bets_placed.to_string(),
            ]);
            match (p.place, app.settings.user_id == Some(s.participant.id)) {
                (_, true) => row.style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                (1, false) => row.style(Style::default().fg(Color::Green)),
                _ => row,
            }
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(5),
    ];
    f.render_widget(Table::new(rows, widths).header(header).column_spacing(1), inner);
}

// ---------------------------------------------------------------------------
// My Bets
// ---------------------------------------------------------------------------

fn draw_my_bets(f: &mut Frame, area: Rect, app: &App, clock: &GameClock) {
    let block = default_border(Color::White).title(" My Bets (upcoming) ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.settings.user_id.is_none() {
        draw_note(f, inner, "Set BETBOARD_USER_ID to see and place your bets");
        return;
    }

    let rows = match app.upcoming_rows(clock) {
        Ok(rows) => rows,
        Err(e) => {
            draw_note(f, inner, &format!("Data unavailable: {e}"));
            return;
        }
    };
    if rows.is_empty() {
        draw_note(f, inner, "No fixtures open for betting");
        return;
    }

    let draft = app.state.my_bets.draft;
    let (list_area, editor_area) = if draft.is_some() {
        let [list, editor] = Layout::vertical([Constraint::Fill(1), Constraint::Length(5)]).areas(inner);
        (list, Some(editor))
    } else {
        (inner, None)
    };

    let header = Row::new(["", "Kickoff", "Fixture", "Your bet", "Closes in"])
        .style(Style::default().add_modifier(Modifier::UNDERLINED))
        .bottom_margin(1);
    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let selected = idx == app.state.my_bets.selected;
            let kickoff = clock.zone().normalize(&row.start_time);
            let bet = match &row.bet {
                Some(b) if b.hidden => format!("{} (hidden)", b.prediction),
                Some(b) => b.prediction.to_string(),
                None => "-".to_string(),
            };
            let left = app
                .state
                .board
                .tournament
                .as_ref()
                .and_then(|t| t.find_fixture(row.fixture_id))
                .and_then(|f| clock.until_kickoff(f))
                .unwrap_or(TimeDelta::zero());
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::Gray)
            } else if row.bet.is_none() {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                if selected { ">".to_string() } else { " ".to_string() },
                kickoff.format("%a %d.%m %H:%M").to_string(),
                format!("{} - {}", row.home.name, row.away.name),
                bet,
                format_countdown(left),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Length(16),
        Constraint::Fill(1),
        Constraint::Length(14),
        Constraint::Length(12),
    ];
    f.render_widget(Table::new(table_rows, widths).header(header).column_spacing(1), list_area);

    if let (Some(draft), Some(editor)) = (draft, editor_area) {
        let row = rows.iter().find(|r| r.fixture_id == draft.fixture_id);
        draw_bet_editor(f, editor, &draft, row.map(|r| (&r.home, &r.away)));
    }
}

fn draw_bet_editor(f: &mut Frame, area: Rect, draft: &BetDraft, teams: Option<(&Team, &Team)>) {
    let title = if draft.bet_id.is_some() { " Edit bet " } else { " New bet " };
    let block = default_border(Color::Yellow).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (home, away) = teams
        .map(|(h, a)| (h.name.as_str(), a.name.as_str()))
        .unwrap_or(("Home", "Away"));
    let score_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(vec![
            Span::raw(format!("{home} ")),
            Span::styled(format!("[{:>2}]", draft.prediction.home), score_style),
            Span::raw(" : "),
            Span::styled(format!("[{:>2}]", draft.prediction.away), score_style),
            Span::raw(format!(" {away}")),
            Span::raw(format!("    hidden: {}", if draft.hidden { "yes" } else { "no" })),
        ]),
        Line::from(Span::styled(
            "+/- home  ]/[ away  h hidden  Enter save  Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

/// Compact time-until-kickoff label.
fn format_countdown(left: TimeDelta) -> String {
    let secs = left.num_seconds();
    if secs <= 0 {
        return "now".to_string();
    }
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    match (days, hours) {
        (0, 0) if minutes == 0 => format!("{secs}s"),
        (0, 0) => format!("{minutes}m"),
        (0, _) => format!("{hours}h {minutes:02}m"),
        _ => format!("{days}d {hours}h"),
    }
}

// ---------------------------------------------------------------------------
// Help, logs, misc
// ---------------------------------------------------------------------------

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::White).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = [
        ("1 / 2 / 3", "Leaderboard / Standings / My Bets"),
        ("t", "next tournament"),
        ("s", "toggle sort: points or name"),
        ("r", "reload now"),
        ("h j k l", "scroll the grid"),
        ("Enter / e", "bet on the selected fixture (My Bets)"),
        ("+ - ] [", "edit the draft score"),
        ("h", "hide the prediction until kickoff (draft)"),
        ("\"", "show or hide logs"),
        ("f", "full screen"),
        ("Esc", "leave help or cancel the draft"),
        ("q", "quit"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:>10}  "), Style::default().fg(Color::Yellow)),
                Span::raw(*what),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_target(false)
        .output_file(false)
        .output_line(false);
    f.render_widget(logs, area);
}

fn draw_note(f: &mut Frame, area: Rect, msg: &str) {
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let block = default_border(Color::DarkGray);
    let inner = block.inner(area);
    f.render_widget(block, area);
    draw_note(f, inner, msg);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(3), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
