mod render;
mod sound;

use anyhow::{Context, Result, bail};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind},
    execute, terminal,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use signal_runner::accounts::{AccountError, ScoreStore};
use signal_runner::config::{GameConfig, RoadPolicy, parse_value};
use signal_runner::gesture::{ActiveSource, AnySource, KeyboardGestures, PoseClassifier, ReplayFeed};
use signal_runner::grading::Verdict;
use signal_runner::{Gesture, Phase, Session, SessionEvent};
use std::fs::File;
use std::io::{self, BufRead, Write, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use render::{PixelBuf, Scene};
use sound::{Cue, Sound};

const LOGIN_ATTEMPTS: u32 = 3;
const DEFAULT_RANKING: usize = 10;

// ── Command line ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Command {
    Play,
    Register(String),
    Ranking(usize),
    Help,
}

#[derive(Debug)]
struct Cli {
    command: Command,
    account: Option<String>,
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

/// Applies flags to `config` and picks the command. Flags override the
/// environment.
fn parse_args(args: &[String], config: &mut GameConfig) -> Result<Cli> {
    let mut account = None;
    let mut help = false;
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--account" => account = Some(flag_value(&mut iter, arg)?.to_string()),
            "--poses" => config.poses_path = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--policy" => config.session.road.policy = flag_value(&mut iter, arg)?.parse::<RoadPolicy>()?,
            "--seed" => config.seed = Some(parse_value("seed", flag_value(&mut iter, arg)?)?),
            "--scores" => config.scores_path = PathBuf::from(flag_value(&mut iter, arg)?),
            "--log" => config.log_path = PathBuf::from(flag_value(&mut iter, arg)?),
            "--mute" => config.mute = true,
            "-h" | "--help" => help = true,
            flag if flag.starts_with('-') => bail!("unknown option {flag}"),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        _ if help => Command::Help,
        [] | ["play"] => Command::Play,
        ["register", email] => Command::Register(email.to_string()),
        ["register"] => bail!("register requires an email address"),
        ["ranking"] => Command::Ranking(DEFAULT_RANKING),
        ["ranking", n] => Command::Ranking(parse_value("ranking size", n)?),
        ["help"] => Command::Help,
        [cmd, ..] if matches!(*cmd, "play" | "register" | "ranking" | "help") => {
            bail!("too many arguments for {cmd}")
        }
        [cmd, ..] => bail!("unknown command {cmd}"),
    };
    Ok(Cli { command, account })
}

fn print_usage() {
    eprintln!("Usage: signal-runner [command] [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  play                 Ride (default)");
    eprintln!("  register <email>     Create an account; the password is read from stdin");
    eprintln!("  ranking [n]          Print the top n best scores (default {DEFAULT_RANKING})");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --account <email>    Log in before riding so the best score is saved");
    eprintln!("  --poses <file>       Classify a recorded pose feed (JSON lines) instead of keys");
    eprintln!("  --policy <name>      Road planner: lookahead | cooldown");
    eprintln!("  --seed <n>           Fixed road seed");
    eprintln!("  --scores <file>      Account file (default users.json)");
    eprintln!("  --log <file>         Log file (default signal-runner.log)");
    eprintln!("  --mute               No sound");
    eprintln!();
    eprintln!("Keys: ENTER start, arrows or A/D/S signal left/right/stop, Q or ESC quit.");
    eprintln!("Log level follows RUST_LOG.");
}

fn init_logging(config: &GameConfig) -> Result<()> {
    // The terminal belongs to the game, so logs go to a file.
    let file = File::options()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("cannot open log file {}", config.log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signal_runner=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// ── Accounts ────────────────────────────────────────────────────────────────

fn register(config: &GameConfig, email: &str) -> Result<()> {
    let mut store = ScoreStore::open(&config.scores_path)?;
    let password = prompt("password: ")?;
    if prompt("repeat password: ")? != password {
        bail!("passwords do not match");
    }
    store.register(email, &password)?;
    println!("registered {email}");
    Ok(())
}

fn ranking(config: &GameConfig, n: usize) -> Result<()> {
    let store = ScoreStore::open(&config.scores_path)?;
    let rows = store.top_ranking(n);
    if rows.is_empty() {
        println!("no scores yet");
        return Ok(());
    }
    println!("{:>4}  {:<36} {:>6}", "#", "account", "best");
    for (i, row) in rows.iter().enumerate() {
        println!("{:>4}  {:<36} {:>6}", i + 1, row.account, row.best_score);
    }
    Ok(())
}

fn login(store: &ScoreStore, email: &str) -> Result<()> {
    for attempt in 1..=LOGIN_ATTEMPTS {
        let password = prompt(&format!("password for {email}: "))?;
        match store.login(email, &password) {
            Ok(()) => {
                info!(account = email, "logged in");
                return Ok(());
            }
            Err(AccountError::WrongPassword) if attempt < LOGIN_ATTEMPTS => {
                eprintln!("wrong password, try again");
            }
            Err(e) => return Err(e.into()),
        }
    }
    bail!("too many failed attempts")
}

// ── Terminal ────────────────────────────────────────────────────────────────

/// Raw mode and the alternate screen for as long as it lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::DisableLineWrap,
            event::EnableMouseCapture,
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            event::DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show,
            terminal::EnableLineWrap,
        );
        let _ = terminal::disable_raw_mode();
    }
}

fn key_gesture(code: KeyCode) -> Option<Gesture> {
    match code {
        KeyCode::Left | KeyCode::Char('a') => Some(Gesture::LeftTurn),
        KeyCode::Right | KeyCode::Char('d') => Some(Gesture::RightTurn),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char(' ') => Some(Gesture::Stop),
        _ => None,
    }
}

// ── Game ────────────────────────────────────────────────────────────────────

/// Score of a round that has started and not yet reached game over.
fn round_in_progress(session: &Session) -> Option<u32> {
    match session.phase() {
        Phase::Playing | Phase::Grading | Phase::ResultAnim => Some(session.score()),
        Phase::Menu | Phase::GameOver => None,
    }
}

fn record_score(store: &mut ScoreStore, account: Option<&str>, score: u32) {
    let Some(id) = account else {
        return;
    };
    match store.save_score(id, score) {
        Ok(true) => info!(account = id, score, "best score saved"),
        Ok(false) => {}
        Err(e) => error!(account = id, error = %e, "could not save score"),
    }
}

struct Game<'a> {
    config: &'a GameConfig,
    session: Session,
    gestures: ActiveSource<AnySource>,
    sound: Option<Sound>,
    store: ScoreStore,
    account: Option<String>,
}

impl Game<'_> {
    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::MissionResolved(resolution) => self.play(match resolution.verdict {
                Verdict::Success => Cue::Success,
                Verdict::Fail => Cue::Fail,
            }),
            SessionEvent::GameOver { score, .. } => {
                self.play(Cue::GameOver);
                record_score(&mut self.store, self.account.as_deref(), score);
            }
            SessionEvent::MissionStarted { .. } | SessionEvent::ReturnedToMenu => {}
        }
    }

    /// Leaving mid-round still counts the points earned so far.
    fn quit(&mut self) {
        if let Some(score) = round_in_progress(&self.session) {
            info!(score, "left mid-round");
            record_score(&mut self.store, self.account.as_deref(), score);
        }
    }

    fn play(&self, cue: Cue) {
        if let Some(sound) = &self.sound {
            sound.play(cue);
        }
    }

    fn run(&mut self) -> Result<()> {
        let mut out = stdout();
        let (mut cols, mut rows) = terminal::size()?;
        let mut buf = PixelBuf::new(cols as usize, rows as usize * 2);
        let frame_dur = self.config.tick_duration();
        let player = self.account.clone().unwrap_or_else(|| "GUEST".to_string());
        let keyboard = self.config.poses_path.is_none();

        loop {
            let frame_start = Instant::now();

            // Input
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            self.quit();
                            return Ok(());
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            self.quit();
                            return Ok(());
                        }
                        KeyCode::Enter => {
                            self.session.start();
                        }
                        code => {
                            if let (Some(gesture), Some(keys)) =
                                (key_gesture(code), self.gestures.source_mut().keyboard())
                            {
                                keys.press(gesture);
                            }
                        }
                    },
                    Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                        let on_start = render::start_button(cols, rows).contains(mouse.column, mouse.row);
                        if self.session.phase() == Phase::Menu && on_start {
                            self.session.start();
                        }
                    }
                    Event::Resize(c, r) => {
                        cols = c;
                        rows = r;
                        buf.resize(c as usize, r as usize * 2);
                    }
                    _ => {}
                }
            }

            // Update
            self.gestures.update();
            let gesture = self.gestures.current();
            if let Some(event) = self.session.tick(gesture) {
                self.handle(event);
            }

            // Render
            let scene = Scene {
                session: &self.session,
                gesture,
                preview: self.gestures.preview(),
                degraded: self.gestures.is_degraded(),
                player: &player,
                tick_rate_hz: self.config.tick_rate_hz,
                keyboard,
            };
            render::draw(&mut buf, &scene);
            buf.render(&mut out)?;

            // Frame pacing
            let elapsed = frame_start.elapsed();
            if elapsed < frame_dur {
                std::thread::sleep(frame_dur - elapsed);
            }
        }
    }
}

fn play(config: &GameConfig, account: Option<String>) -> Result<()> {
    let store = ScoreStore::open(&config.scores_path)?;
    if let Some(id) = &account {
        login(&store, id)?;
    }
    let best = account
        .as_deref()
        .and_then(|id| store.best_score(id))
        .unwrap_or(0);

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, policy = ?config.session.road.policy, "starting");
    let session = Session::new(config.session.clone(), StdRng::seed_from_u64(seed)).with_best(best);

    let source = match &config.poses_path {
        Some(path) => AnySource::Poses(PoseClassifier::new(ReplayFeed::new(path))),
        None => AnySource::Keys(KeyboardGestures::new(config.keyboard_hold_ticks)),
    };

    let mut game = Game {
        config,
        session,
        gestures: ActiveSource::acquire(source),
        sound: Sound::open(config.mute),
        store,
        account,
    };

    let _terminal = TerminalGuard::enter()?;
    game.run()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = GameConfig::from_env()?;
    let cli = match parse_args(&args, &mut config) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e:#}");
            print_usage();
            std::process::exit(2);
        }
    };
    config.validate()?;

    match cli.command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Register(email) => {
            init_logging(&config)?;
            register(&config, &email)
        }
        Command::Ranking(n) => ranking(&config, n),
        Command::Play => {
            init_logging(&config)?;
            play(&config, cli.account)
        }
    }
}
