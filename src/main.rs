//! Fraction Bounce headless driver
//!
//! Plays a few bounces against a virtual clock with a steering bot and logs
//! everything a real activity would draw. `--players a,b,c` runs a loopback
//! shared session with one controller per nickname; the first one shares.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use fraction_bounce::consts::TILT_DIVISOR;
use fraction_bounce::net::{ColorPair, Envelope};
use fraction_bounce::settings::Mode;
use fraction_bounce::sim::{BallGraphic, HitResult};
use fraction_bounce::{ActivityHost, SessionConfig, SessionController, SessionPhase};

const PALETTE: [(&str, &str); 4] = [
    ("#A0FFA0", "#FF8080"),
    ("#00588C", "#FFC800"),
    ("#8000FF", "#FF8000"),
    ("#FF2B34", "#4BFF3A"),
];

#[derive(Parser, Debug)]
#[command(name = "fraction-bounce")]
#[command(about = "Headless fraction bounce session driven by a steering bot")]
struct Cli {
    /// RNG seed (random unless set here or in the config file)
    #[arg(long)]
    seed: Option<u64>,
    /// Bounces to play before stopping
    #[arg(long, default_value_t = 5)]
    bounces: u32,
    #[arg(long, value_enum)]
    mode: Option<CliMode>,
    /// Comma separated nicknames for a loopback shared session
    #[arg(long)]
    players: Option<String>,
    /// JSON session config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bot aiming error, as a share of the ball size
    #[arg(long, default_value_t = 0.5)]
    wobble: f32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliMode {
    Fractions,
    Percents,
    Sectors,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Fractions => Mode::Fractions,
            CliMode::Percents => Mode::Percents,
            CliMode::Sectors => Mode::Sectors,
        }
    }
}

/// Host that logs every request and queues outgoing messages
struct LogHost {
    nick: String,
    clock: Rc<Cell<u64>>,
    outbox: Vec<Envelope>,
}

impl ActivityHost for LogHost {
    fn reset_label(&mut self, text: &str) {
        log::info!("[{:>6} ms] {}: {text}", self.clock.get(), self.nick);
    }

    fn set_player_indicator(&mut self, nick: &str) {
        log::debug!("{}: indicator -> {nick}", self.nick);
    }

    fn send_event(&mut self, envelope: &Envelope) {
        log::debug!("{} sends {} {}", self.nick, envelope.command, envelope.data);
        self.outbox.push(envelope.clone());
    }

    fn show_bar(&mut self, segments: u32) {
        log::debug!("{}: bar with {segments} segments", self.nick);
    }

    fn show_ball(&mut self, label: &str, graphic: BallGraphic) {
        log::debug!("{}: ball {label} ({graphic:?})", self.nick);
    }

    fn restore_ball(&mut self) {
        log::debug!("{}: standard ball restored", self.nick);
    }

    fn ball_moved(&mut self, pos: Vec2, frame: Option<usize>) {
        log::trace!("{}: ball at ({:.1}, {:.1}) frame {frame:?}", self.nick, pos.x, pos.y);
    }

    fn show_result(&mut self, result: &HitResult) {
        log::info!(
            "[{:>6} ms] {}: {} (landed {:.1}, target {:.1} +/- {:.1})",
            self.clock.get(),
            self.nick,
            if result.correct { "correct" } else { "missed" },
            result.ball_x,
            result.target_x,
            result.delta
        );
        if result.tier_unlocked {
            log::info!("{}: new challenges unlocked", self.nick);
        }
        if result.became_expert {
            log::info!("{}: expert mode", self.nick);
        }
    }
}

/// One participant and its pending timer
struct Seat {
    controller: SessionController<LogHost>,
    /// Virtual time of the next `on_timer`
    due: Option<u64>,
    /// Bot aim offset in pixels, and the bounce it was drawn for
    aim: (u32, f32),
}

impl Seat {
    fn nick(&self) -> &str {
        &self.controller.turns().me().nick
    }

    fn reschedule(&mut self, now: u64) {
        match self.controller.next_delay() {
            None => self.due = None,
            Some(delay) if self.due.is_none() => self.due = Some(now + delay),
            Some(_) => {}
        }
    }

    /// Tilt the ball toward the target (plus the aiming error)
    fn steer<R: Rng>(&mut self, rng: &mut R, wobble: f32) {
        if self.controller.phase() != SessionPhase::Falling {
            return;
        }
        let field = *self.controller.trajectory().field();
        let played = self.controller.engine().played();
        if self.aim.0 != played {
            let wobble = wobble.abs();
            self.aim = (played, rng.random_range(-wobble..=wobble) * field.ball_size);
        }

        let target_x = field.bar.x_at(self.controller.engine().target().fraction) + self.aim.1;
        let ball = self.controller.ball();
        let remaining = (self.controller.config().steps - ball.step_count as f32).max(1.0);
        let dx = (target_x - ball.center_x(field.ball_size)) / remaining;
        self.controller.set_tilt(Some(dx * TILT_DIVISOR));
    }
}

fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SessionConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SessionConfig {
            seed: rand::random(),
            ..SessionConfig::default()
        },
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    config.validate()?;
    Ok(config)
}

fn nicknames(cli: &Cli) -> Result<Vec<String>> {
    let Some(list) = &cli.players else {
        return Ok(vec!["player".to_string()]);
    };
    let mut nicks: Vec<String> = Vec::new();
    for nick in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if nicks.iter().any(|n| n == nick) {
            bail!("duplicate nickname {nick:?}");
        }
        nicks.push(nick.to_string());
    }
    if nicks.is_empty() {
        bail!("--players needs at least one nickname");
    }
    Ok(nicks)
}

/// Deliver queued messages until every outbox is empty
fn deliver(seats: &mut [Seat]) {
    loop {
        let mut mail = Vec::new();
        for (from, seat) in seats.iter_mut().enumerate() {
            mail.extend(seat.controller.host_mut().outbox.drain(..).map(|e| (from, e)));
        }
        if mail.is_empty() {
            return;
        }
        for (from, envelope) in mail {
            for (to, seat) in seats.iter_mut().enumerate() {
                if to != from {
                    seat.controller.event_received(&envelope);
                }
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let nicks = nicknames(&cli)?;
    log::info!(
        "Seed {}, mode {}, players {:?}",
        config.seed,
        config.mode.as_str(),
        nicks
    );
    if nicks.len() > config.max_participants {
        log::warn!(
            "Only {} participants fit; the rest will watch",
            config.max_participants
        );
    }

    let clock = Rc::new(Cell::new(0u64));
    let mut seats = Vec::with_capacity(nicks.len());
    for (i, nick) in nicks.iter().enumerate() {
        let (stroke, fill) = PALETTE[i % PALETTE.len()];
        let host = LogHost {
            nick: nick.clone(),
            clock: Rc::clone(&clock),
            outbox: Vec::new(),
        };
        let seat_config = SessionConfig {
            seed: config.seed.wrapping_add(i as u64),
            ..config.clone()
        };
        let controller =
            SessionController::new(seat_config, nick.as_str(), ColorPair::new(stroke, fill), host)?;
        seats.push(Seat {
            controller,
            due: None,
            aim: (u32::MAX, 0.0),
        });
    }

    if seats.len() > 1 {
        seats[0].controller.share();
        for i in 1..seats.len() {
            seats[i].controller.join();
            deliver(&mut seats);
        }
    }

    let mut rng = Pcg32::seed_from_u64(config.seed ^ 0x5EED);
    while seats.iter().any(|s| s.controller.engine().played() < cli.bounces) {
        deliver(&mut seats);
        for seat in &mut seats {
            seat.reschedule(clock.get());
        }

        let next = seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.due.map(|due| (due, i)))
            .min();
        if let Some((due, i)) = next {
            clock.set(due);
            let seat = &mut seats[i];
            seat.steer(&mut rng, cli.wobble);
            seat.due = seat.controller.on_timer().map(|delay| due + delay);
            continue;
        }

        // Nothing scheduled: whoever holds the turn picks, or the solo player clicks
        let picker = seats.iter().position(|s| {
            let turns = s.controller.turns();
            turns.is_my_turn() && turns.awaiting_selection()
        });
        if let Some(i) = picker {
            let bar = seats[i].controller.trajectory().field().bar;
            let x = bar.x_at(rng.random_range(0.05..0.95));
            log::info!("{} taps the bar at {x:.0}", seats[i].nick());
            seats[i].controller.press_bar(x);
        } else if seats.len() == 1 && seats[0].controller.press_ball() {
            log::info!("Ball clicked");
        } else {
            bail!("session stalled at {} ms", clock.get());
        }
    }

    for seat in &mut seats {
        seat.controller.close();
    }
    deliver(&mut seats);

    for seat in &seats {
        let engine = seat.controller.engine();
        println!(
            "{}: {}/{} correct, tier {}, {} challenges{}",
            seat.nick(),
            engine.correct_count(),
            engine.played(),
            engine.tier() + 1,
            engine.challenges().len(),
            if engine.is_expert() { ", expert" } else { "" }
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    run(Cli::parse())
}
