mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    layout::Direction as LayoutDirection,
    prelude::*,
    widgets::*,
};
use robot_sim_core::{
    Direction, Position,
    agent::AgentKind,
    scenario::ScenarioConfig,
    simulation::{Outcome, Simulation, Snapshot},
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{Level, info};

use crate::logging::{LogConfig, init_logging, parse_log_level};

#[derive(Parser, Debug)]
#[command(version, about = "Multi-robot grid race", long_about = None)]
struct Args {
    /// Scenario file (.yaml) to load; the built-in robot race is used otherwise
    #[arg(short, long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Milliseconds between simulation updates
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "info", value_parser = level_arg)]
    log_level: Level,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Print the scenario as YAML and exit
    #[arg(long)]
    print_scenario: bool,
}

fn level_arg(value: &str) -> Result<Level, String> {
    parse_log_level(value).ok_or_else(|| format!("unknown log level '{value}'"))
}

/// A discrete input for the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Move(Direction),
    Push(Direction),
    Select(usize),
    Scan,
    Recharge,
    ToggleAuto,
    Reset,
    Quit,
}

fn command_for_key(code: KeyCode) -> Option<Command> {
    let command = match code {
        KeyCode::Up => Command::Move(Direction::Up),
        KeyCode::Down => Command::Move(Direction::Down),
        KeyCode::Left => Command::Move(Direction::Left),
        KeyCode::Right => Command::Move(Direction::Right),
        KeyCode::Char('w') => Command::Push(Direction::Up),
        KeyCode::Char('s') => Command::Push(Direction::Down),
        KeyCode::Char('a') => Command::Push(Direction::Left),
        KeyCode::Char('d') => Command::Push(Direction::Right),
        KeyCode::Char(c @ '1'..='9') => Command::Select(c as usize - '1' as usize),
        KeyCode::Char('f') => Command::Scan,
        KeyCode::Char('c') => Command::Recharge,
        KeyCode::Char(' ') => Command::ToggleAuto,
        KeyCode::Char('r') => Command::Reset,
        KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
        _ => return None,
    };
    Some(command)
}

struct App {
    /// The core simulation.
    simulation: Simulation,
    /// Feedback for the last command or event.
    message: String,
    /// Flag to control the main loop.
    should_quit: bool,
    outcome: Outcome,
}

impl App {
    fn new(simulation: Simulation) -> Self {
        App {
            simulation,
            message: "Select a robot with 1-9 and move it with the arrow keys.".to_string(),
            should_quit: false,
            outcome: Outcome::Running,
        }
    }

    fn selected_name(&self) -> String {
        self.simulation
            .selected_agent()
            .map(|a| a.name().to_string())
            .unwrap_or_default()
    }

    /// Applies one command and records feedback for the status line.
    fn apply(&mut self, command: Command) {
        match command {
            Command::Quit => self.should_quit = true,
            Command::Reset => {
                self.simulation.reset();
                self.outcome = Outcome::Running;
                self.message = "All robots reset.".to_string();
            }
            Command::ToggleAuto => {
                let on = self.simulation.toggle_auto_mode();
                self.message = format!("Auto mode {}.", if on { "ON" } else { "OFF" });
            }
            Command::Select(index) => {
                self.simulation.select_agent(index);
                self.message = format!("Selected {}.", self.selected_name());
            }
            Command::Move(direction) => {
                if self.simulation.issue_command(direction) {
                    if let Some(agent) = self.simulation.selected_agent() {
                        self.message = agent.to_string();
                    }
                } else {
                    self.message = format!("{} cannot move {direction:?}.", self.selected_name());
                }
            }
            Command::Push(direction) => {
                self.message = if self.simulation.push_selected(direction) {
                    format!("{} pushed an obstacle {direction:?}.", self.selected_name())
                } else {
                    format!("{} cannot push {direction:?}.", self.selected_name())
                };
            }
            Command::Scan => {
                self.message = match self.simulation.scan_selected() {
                    Some(report) => format!(
                        "Scan: obstacles {} goals {}",
                        format_cells(&report.obstacles),
                        format_cells(&report.goals)
                    ),
                    None => format!("{} cannot scan.", self.selected_name()),
                };
            }
            Command::Recharge => {
                self.message = if self.simulation.recharge_selected() {
                    format!("{} recharged.", self.selected_name())
                } else {
                    format!("{} is already full.", self.selected_name())
                };
            }
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.outcome == Outcome::Won {
            return;
        }
        let collected_before = self.simulation.goals_collected();
        let outcome = self.simulation.update();
        if self.simulation.goals_collected() > collected_before {
            self.message = format!(
                "Goal collected! ({}/{})",
                self.simulation.goals_collected(),
                total_goals(&self.simulation)
            );
        }
        if outcome != self.outcome {
            match outcome {
                Outcome::Won => {
                    self.message = format!(
                        "All goals collected! Efficiency score: {}",
                        self.simulation.efficiency()
                    );
                }
                Outcome::Lost => {
                    self.message = "Every robot is out of battery. Press c to recharge.".to_string()
                }
                Outcome::Running => {}
            }
        }
        self.outcome = outcome;
    }
}

fn total_goals(simulation: &Simulation) -> usize {
    simulation.goals_collected() + simulation.world().goals().len()
}

fn format_cells(cells: &[Position]) -> String {
    if cells.is_empty() {
        return "none".to_string();
    }
    cells
        .iter()
        .map(|p| format!("({},{})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let scenario = match &args.scenario {
        Some(path) => ScenarioConfig::from_file(path)
            .with_context(|| format!("Loading scenario {}", path.display()))?,
        None => ScenarioConfig::default(),
    };

    if args.print_scenario {
        print!("{}", scenario.to_yaml_string()?);
        return Ok(());
    }

    let _guard = init_logging(&LogConfig {
        level: args.log_level,
        log_dir: args.log_dir.clone(),
        ..LogConfig::default()
    })?;

    let simulation = scenario
        .build()
        .with_context(|| format!("Building scenario '{}'", scenario.name))?;
    info!(
        scenario = %scenario.name,
        agents = simulation.agents().len(),
        goals = simulation.world().goals().len(),
        "starting"
    );

    let mut app = App::new(simulation);
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(command) = command_for_key(key.code) {
                        app.apply(command);
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            info!("quit requested");
            break;
        }
    }
    Ok(())
}

fn kind_color(kind: AgentKind) -> Color {
    match kind {
        AgentKind::Plain => Color::Red,
        AgentKind::Fast => Color::Cyan,
        AgentKind::Strong => Color::Magenta,
        AgentKind::Scout => Color::Yellow,
    }
}

/// Green above half charge, orange above a fifth, red below.
fn battery_color(percent: u32) -> Color {
    if percent > 50 {
        Color::Green
    } else if percent > 20 {
        Color::Rgb(255, 165, 0)
    } else {
        Color::Red
    }
}

/// Two columns per cell plus the border, saturating for very wide maps.
fn map_panel_width(cells: usize) -> u16 {
    cells
        .checked_mul(2)
        .and_then(|w| w.checked_add(2))
        .and_then(|w| u16::try_from(w).ok())
        .unwrap_or(u16::MAX)
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let snapshot = app.simulation.snapshot();

    let main_layout = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let mut title = vec![Span::styled(
        "ROBOT RACE",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    title.push(Span::raw(format!(
        "  Goals: {}/{}  Efficiency: {}",
        snapshot.goals_collected,
        snapshot.goals_collected + snapshot.goals.len(),
        app.simulation.efficiency()
    )));
    if snapshot.auto_mode {
        title.push(Span::styled(
            "  AUTO MODE",
            Style::default().fg(Color::Green).bold(),
        ));
    }
    if snapshot.won {
        title.push(Span::styled("  YOU WON", Style::default().fg(Color::Green).bold()));
    }
    let header = Paragraph::new(Line::from(title))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, main_layout[0]);

    let map_width = map_panel_width(snapshot.width);
    let body = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Length(map_width), Constraint::Min(0)])
        .split(main_layout[1]);
    render_map(frame, body[0], &snapshot);
    render_agents(frame, body[1], &snapshot);

    let status = Paragraph::new(app.message.as_str())
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, main_layout[2]);

    let help_text = Paragraph::new(
        "1-9 select | arrows move | w/a/s/d push | f scan | c recharge | space auto | r reset | q quit",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[3]);
}

/// Renders each robot with its battery level.
fn render_agents(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let items: Vec<ListItem> = snapshot
        .agents
        .iter()
        .enumerate()
        .map(|(index, agent)| {
            let percent = agent.battery_percent.min(100);
            let filled = (percent / 10) as usize;
            let marker = if index == snapshot.selected { ">" } else { " " };
            ListItem::from(Line::from(vec![
                Span::raw(format!("{marker} {} ", index + 1)),
                Span::styled(
                    format!("{} [{}]", agent.name, agent.kind),
                    Style::default().fg(kind_color(agent.kind)),
                ),
                Span::raw(format!(
                    " ({},{}) moves {} ",
                    agent.position.x, agent.position.y, agent.moves
                )),
                Span::styled(
                    format!(
                        "[{}{}] {}/{}",
                        "#".repeat(filled),
                        "-".repeat(10 - filled),
                        agent.battery,
                        agent.max_battery
                    ),
                    Style::default().fg(battery_color(percent)),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Robots"));
    frame.render_widget(list, area);
}

/// Renders the grid with obstacles, goals and robots.
fn render_map(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let mut lines: Vec<Line> = Vec::with_capacity(snapshot.height);

    for y in 0..snapshot.height {
        let mut spans: Vec<Span> = Vec::with_capacity(snapshot.width);
        for x in 0..snapshot.width {
            let here = Position::new(x, y);
            let agent = snapshot
                .agents
                .iter()
                .enumerate()
                .find(|(_, a)| a.position == here);

            let span = if let Some((index, a)) = agent {
                let mut style = Style::default().fg(kind_color(a.kind)).bold();
                if index == snapshot.selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Span::styled(format!("{} ", index + 1), style)
            } else if snapshot.goals.contains(&here) {
                Span::styled("G ", Style::default().fg(Color::Green).bold())
            } else if snapshot.obstacles.contains(&here) {
                Span::styled("# ", Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(". ")
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph =
        Paragraph::new(lines).block(Block::default().title("Grid").borders(Borders::ALL));
    frame.render_widget(map_paragraph, area);
}
