//! Session controller
//!
//! Glues player input, the periodic step timer and inbound protocol messages
//! to the simulator, the challenge engine and the turn coordinator. The
//! controller never sleeps: after every call the host asks [`next_delay`]
//! and calls [`on_timer`] once that much time has passed.
//!
//! [`next_delay`]: SessionController::next_delay
//! [`on_timer`]: SessionController::on_timer

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::bounce_pause_ms;
use crate::error::{ConfigError, InputError};
use crate::net::{ColorPair, Envelope, Message, TurnCoordinator, TurnEvent};
use crate::settings::{Mode, SessionConfig};
use crate::sim::{
    BallGraphic, BallState, Celebration, ChallengeEngine, ChallengeSet, HitResult, RngState,
    TickInput, Trajectory,
};

/// Everything the controller asks of the surrounding activity
///
/// Rendering, sound and the transport live on the other side of this trait.
/// Every method has a no-op default so hosts only implement what they show.
pub trait ActivityHost {
    /// Challenge or status text
    fn reset_label(&mut self, _text: &str) {}
    /// Highlight whose turn it is
    fn set_player_indicator(&mut self, _nick: &str) {}
    /// Broadcast a protocol message to the other participants
    fn send_event(&mut self, _envelope: &Envelope) {}
    /// Show the bar with this many segments
    fn show_bar(&mut self, _segments: u32) {}
    /// Relabel (and in sectors mode redraw) the ball
    fn show_ball(&mut self, _label: &str, _graphic: BallGraphic) {}
    /// Put the player's chosen ball graphic back
    fn restore_ball(&mut self) {}
    /// Ball sprite moved; `frame` is set while the celebration plays
    fn ball_moved(&mut self, _pos: Vec2, _frame: Option<usize>) {}
    /// A landing was scored
    fn show_result(&mut self, _result: &HitResult) {}
}

/// Keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Left arrow or `h`
    Left,
    /// Right arrow or `l`
    Right,
    /// Pick a new challenge and bounce
    Return,
    Other,
}

impl Key {
    /// Map a key name as reported by the windowing layer
    pub fn from_name(name: &str) -> Self {
        match name {
            "Left" | "KP_Left" | "KP_Home" | "KP_Page_Down" | "h" => Key::Left,
            "Right" | "KP_Right" | "KP_End" | "KP_Page_Up" | "l" => Key::Right,
            "Return" => Key::Return,
            _ => Key::Other,
        }
    }
}

/// Where the bounce loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for a press (or, when sharing, for a fraction to be picked)
    Idle,
    /// Ball in the air
    Falling,
    /// Solo: resting between bounces
    Landed,
    /// Easter egg animation
    Celebrating,
    Paused,
}

const START_HINT: &str = "Click the ball to start. Then use the arrow keys to move the ball.";
const TILT_HINT: &str = "Click the ball to start. Rock the computer left and right to move the ball.";
const PICK_HINT: &str = "Click on the bar to choose a fraction.";
const WAIT_FOR_PEERS: &str = "Wait for others to join.";
const WAIT_FOR_SHARER: &str = "Wait for the sharer to start.";

/// Session controller
pub struct SessionController<H: ActivityHost> {
    config: SessionConfig,
    trajectory: Trajectory,
    engine: ChallengeEngine,
    turns: TurnCoordinator,
    ball: BallState,
    phase: SessionPhase,
    /// Milliseconds until the next `on_timer`, when one is scheduled
    delay: Option<u64>,
    /// Phase and timer interrupted by `pause`
    resume: Option<(SessionPhase, Option<u64>)>,
    input: TickInput,
    celebration: Option<Celebration>,
    /// Easter egg position along the bar, in percent
    easter_egg: u32,
    rng: Pcg32,
    host: H,
}

impl<H: ActivityHost> SessionController<H> {
    /// Session over the stock challenge tiers
    pub fn new(
        config: SessionConfig,
        nick: impl Into<String>,
        colors: ColorPair,
        host: H,
    ) -> Result<Self, ConfigError> {
        Self::with_challenges(config, ChallengeSet::default(), nick, colors, host)
    }

    pub fn with_challenges(
        config: SessionConfig,
        challenges: ChallengeSet,
        nick: impl Into<String>,
        colors: ColorPair,
        mut host: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let trajectory = Trajectory::new(&config);
        let engine = ChallengeEngine::with_set(&config, challenges);
        let turns = TurnCoordinator::new(nick, colors, config.max_participants);
        let ball = BallState::at(trajectory.field().start_position());

        // Separate stream so the easter egg does not shift challenge picks
        let mut rng = RngState::with_stream(config.seed, 1).to_rng();
        let easter_egg = rng.random_range(1..100);
        log::debug!("Easter egg at {easter_egg}% of the bar");

        host.reset_label(START_HINT);
        host.ball_moved(ball.pos, None);

        Ok(Self {
            config,
            trajectory,
            engine,
            turns,
            ball,
            phase: SessionPhase::Idle,
            delay: None,
            resume: None,
            input: TickInput::default(),
            celebration: None,
            easter_egg,
            rng,
            host,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ball(&self) -> &BallState {
        &self.ball
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn engine(&self) -> &ChallengeEngine {
        &self.engine
    }

    pub fn turns(&self) -> &TurnCoordinator {
        &self.turns
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Easter egg position along the bar, in percent
    pub fn easter_egg(&self) -> u32 {
        self.easter_egg
    }

    /// Milliseconds until `on_timer` should run, if anything is scheduled
    pub fn next_delay(&self) -> Option<u64> {
        self.delay
    }

    // === Sharing ===

    /// Offer this session to others
    pub fn share(&mut self) {
        let events = self.turns.share();
        self.apply(events);
        self.host.reset_label(WAIT_FOR_PEERS);
    }

    /// Join a shared session
    pub fn join(&mut self) {
        let events = self.turns.join();
        self.apply(events);
        self.host.reset_label(WAIT_FOR_SHARER);
    }

    /// Inbound protocol message from the transport
    pub fn event_received(&mut self, envelope: &Envelope) {
        match Message::from_envelope(envelope) {
            Ok(message) => self.handle_message(message),
            Err(e) if e.is_unknown_command() => log::debug!("Ignoring message: {e}"),
            Err(e) => log::warn!("Dropping message: {e}"),
        }
    }

    /// Inbound protocol message as raw bytes
    pub fn bytes_received(&mut self, bytes: &[u8]) {
        match Message::decode(bytes) {
            Ok(message) => self.handle_message(message),
            Err(e) if e.is_unknown_command() => log::debug!("Ignoring message: {e}"),
            Err(e) => log::warn!("Dropping message: {e}"),
        }
    }

    fn handle_message(&mut self, message: Message) {
        log::debug!("{} received {}", self.turns.me().nick, message.command().as_str());
        let events = self.turns.handle(message, self.engine.played());
        self.apply(events);
    }

    fn apply(&mut self, events: Vec<TurnEvent>) {
        for event in events {
            match event {
                TurnEvent::Send(message) => match message.to_envelope() {
                    Ok(envelope) => self.host.send_event(&envelope),
                    Err(e) => log::warn!("Could not encode {}: {e}", message.command().as_str()),
                },
                TurnEvent::Joined(nick) => self.host.reset_label(&format!("{nick} has joined.")),
                TurnEvent::Left(nick) => self.host.reset_label(&format!("{nick} has left.")),
                TurnEvent::RosterChanged => {
                    log::debug!("Roster: {:?}", self.turns.nicks());
                }
                TurnEvent::MyTurn => {
                    let nick = self.turns.me().nick.clone();
                    self.host.set_player_indicator(&nick);
                    self.host.reset_label(PICK_HINT);
                }
                TurnEvent::TheirTurn(nick) => {
                    self.host.set_player_indicator(&nick);
                    self.host.reset_label(&format!("Waiting for {nick}"));
                }
                TurnEvent::PlayFraction(label) => self.play_fraction(&label),
                TurnEvent::Alone => {
                    let nick = self.turns.me().nick.clone();
                    self.host.set_player_indicator(&nick);
                    self.host.reset_label(WAIT_FOR_PEERS);
                }
            }
        }
    }

    /// Bounce the fraction another participant picked
    pub fn play_fraction(&mut self, label: &str) {
        let index = match self.engine.index_for_label(label) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Cannot play {label:?}: {e}");
                return;
            }
        };
        self.engine.choose_index(index);
        self.announce_target();
        self.start_episode();
    }

    // === Input ===

    /// Click on the ball
    ///
    /// Starts a bounce when idle and the ball is ours to bounce: always in a
    /// solo session, only on our turn with the fraction already picked when
    /// sharing. Returns whether a bounce started.
    pub fn press_ball(&mut self) -> bool {
        if self.phase != SessionPhase::Idle {
            return false;
        }
        if self.turns.is_sharing() {
            if !self.turns.is_my_turn() || self.turns.awaiting_selection() {
                return false;
            }
        } else {
            self.engine.choose_next();
            self.announce_target();
        }
        self.start_episode();
        true
    }

    /// Click on the bar at screen `x`
    ///
    /// On our turn this picks the nearest challenge, tells the others and
    /// bounces it. Returns whether a fraction was picked.
    pub fn press_bar(&mut self, x: f32) -> bool {
        if !self.turns.is_sharing() {
            return false;
        }
        let rel_x = self.trajectory.field().bar.fraction_at(x);
        let Some((label, events)) = self.turns.select_fraction(rel_x, self.engine.set()) else {
            return false;
        };
        self.apply(events);
        self.play_fraction(&label);
        true
    }

    pub fn key_down(&mut self, key: Key) {
        let step = self.config.dx_step * self.config.scale();
        match key {
            Key::Left => self.ball.vel.x = -step,
            Key::Right => self.ball.vel.x = step,
            Key::Return => {
                if self.turns.is_sharing() {
                    self.press_ball();
                } else if matches!(self.phase, SessionPhase::Idle | SessionPhase::Landed) {
                    self.engine.choose_next();
                    self.announce_target();
                    self.start_episode();
                }
            }
            Key::Other => self.ball.vel.x = 0.0,
        }
    }

    pub fn key_up(&mut self) {
        self.ball.vel.x = 0.0;
    }

    /// Tilt reading; `Some` overrides key steering until cleared
    pub fn set_tilt(&mut self, tilt: Option<f32>) {
        if tilt.is_some() && self.input.tilt.is_none() && self.phase == SessionPhase::Idle {
            self.host.reset_label(TILT_HINT);
        }
        self.input.tilt = tilt;
    }

    // === Timer ===

    /// Advance one scheduled step; returns the next delay
    pub fn on_timer(&mut self) -> Option<u64> {
        match self.phase {
            SessionPhase::Falling => {
                let outcome = self.trajectory.tick(&mut self.ball, &self.input);
                self.host.ball_moved(self.ball.pos, None);
                if outcome.landed {
                    self.on_landing();
                } else {
                    self.delay = Some(self.config.step_pause_ms);
                }
            }
            SessionPhase::Celebrating => {
                let mut celebration = self.celebration.unwrap_or_default();
                let outcome =
                    self.trajectory
                        .tick_celebration(&mut self.ball, &mut celebration, &mut self.rng);
                self.host.ball_moved(self.ball.pos, Some(celebration.frame));
                if outcome.landed {
                    // Already scored; just wait out a full pause
                    self.celebration = None;
                    self.phase = SessionPhase::Landed;
                    self.delay = Some(self.config.bounce_pause_ms);
                } else {
                    self.celebration = Some(celebration);
                    self.delay = Some(self.config.step_pause_ms);
                }
            }
            SessionPhase::Landed => {
                if self.turns.is_sharing() {
                    // Someone joined during the pause: wait for turns
                    self.phase = SessionPhase::Idle;
                    self.delay = None;
                } else {
                    self.engine.choose_next();
                    self.announce_target();
                    self.start_episode();
                }
            }
            SessionPhase::Idle | SessionPhase::Paused => {
                log::debug!("Timer fired while {:?}", self.phase);
                self.delay = None;
            }
        }
        self.delay
    }

    fn start_episode(&mut self) {
        self.trajectory.start_episode(&mut self.ball);
        self.enter(SessionPhase::Falling, Some(self.config.step_pause_ms));
    }

    /// Switch phase, or queue the switch for `resume` while paused
    fn enter(&mut self, phase: SessionPhase, delay: Option<u64>) {
        if self.phase == SessionPhase::Paused {
            self.resume = Some((phase, delay));
        } else {
            self.phase = phase;
            self.delay = delay;
        }
    }

    fn on_landing(&mut self) {
        let field = *self.trajectory.field();
        let ball_x = self.ball.center_x(field.ball_size);
        let result = self.engine.hit_test(ball_x);
        self.host.show_result(&result);

        if self.turns.is_sharing() {
            let events = self.turns.finish_bounce();
            self.phase = SessionPhase::Idle;
            self.delay = None;
            self.apply(events);
        } else if self.easter_egg_hit(ball_x) {
            log::info!("Easter egg at {:.1}", ball_x);
            self.celebration = Some(self.trajectory.start_celebration(&mut self.ball));
            self.phase = SessionPhase::Celebrating;
            self.delay = Some(self.config.step_pause_ms);
        } else {
            self.phase = SessionPhase::Landed;
            self.delay = Some(bounce_pause_ms(
                self.config.step_pause_ms,
                self.config.bounce_pause_ms,
                self.engine.played(),
            ));
        }
    }

    fn easter_egg_hit(&self, ball_x: f32) -> bool {
        let field = self.trajectory.field();
        let delta = field.ball_size / self.config.easter_egg_divisor;
        let at = field.bar.x_at(self.easter_egg as f32 / 100.0);
        ball_x > at - delta && ball_x < at + delta
    }

    fn announce_target(&mut self) {
        let target = self.engine.target();
        let label = target.display_label.clone();
        let graphic = target.ball;
        let text = if self.config.is_narrow() {
            format!("Bounce the ball to {label}")
        } else {
            format!("Bounce the ball to a position {label} of the way from the left side of the bar.")
        };
        self.host.reset_label(&text);
        self.host.show_ball(&label, graphic);
        self.host.show_bar(self.engine.segment_count());
    }

    // === Lifecycle ===

    /// Cancel the pending step; calling it again is a no-op
    pub fn pause(&mut self) {
        if self.phase == SessionPhase::Paused {
            return;
        }
        log::debug!("Paused while {:?}", self.phase);
        self.resume = Some((self.phase, self.delay));
        self.phase = SessionPhase::Paused;
        self.delay = None;
    }

    pub fn resume(&mut self) {
        if self.phase != SessionPhase::Paused {
            return;
        }
        let (phase, delay) = self.resume.take().unwrap_or((SessionPhase::Idle, None));
        log::debug!("Resuming {phase:?}");
        self.phase = phase;
        self.delay = delay;
    }

    /// Stop the session, telling the others we left
    pub fn close(&mut self) {
        self.pause();
        if let Some(message) = self.turns.leave() {
            self.apply(vec![TurnEvent::Send(message)]);
        }
        log::info!("{} closed the session", self.turns.me().nick);
    }

    // === Challenges ===

    pub fn set_mode(&mut self, mode: Mode) {
        let leaving_sectors = self.engine.mode() == Mode::Sectors && mode != Mode::Sectors;
        self.engine.set_mode(mode);
        if leaving_sectors {
            self.host.restore_ball();
        }
        let target = self.engine.target();
        let (label, graphic) = (target.display_label.clone(), target.ball);
        self.host.show_ball(&label, graphic);
        self.host.show_bar(self.engine.segment_count());
    }

    /// Add a custom `"n/d"` challenge
    pub fn add_fraction(&mut self, label: &str) -> Result<usize, InputError> {
        self.engine.add_fraction(label)
    }

    /// Add a custom challenge from the numerator and denominator entries
    pub fn add_fraction_entry(&mut self, numerator: &str, denominator: &str) -> Result<usize, InputError> {
        self.engine.add_fraction_entry(numerator, denominator)
    }

    /// Re-add saved custom challenges
    pub fn restore_custom(&mut self, csv: &str) -> usize {
        self.engine.restore_custom(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Challenge;

    #[derive(Default)]
    struct Recorder {
        labels: Vec<String>,
        indicator: Vec<String>,
        outbox: Vec<Envelope>,
        bars: Vec<u32>,
        restored: u32,
        results: Vec<HitResult>,
        frames: Vec<usize>,
    }

    impl ActivityHost for Recorder {
        fn reset_label(&mut self, text: &str) {
            self.labels.push(text.to_string());
        }
        fn set_player_indicator(&mut self, nick: &str) {
            self.indicator.push(nick.to_string());
        }
        fn send_event(&mut self, envelope: &Envelope) {
            self.outbox.push(envelope.clone());
        }
        fn show_bar(&mut self, segments: u32) {
            self.bars.push(segments);
        }
        fn restore_ball(&mut self) {
            self.restored += 1;
        }
        fn ball_moved(&mut self, _pos: Vec2, frame: Option<usize>) {
            if let Some(frame) = frame {
                self.frames.push(frame);
            }
        }
        fn show_result(&mut self, result: &HitResult) {
            self.results.push(result.clone());
        }
    }

    fn controller(nick: &str, seed: u64) -> SessionController<Recorder> {
        SessionController::new(
            SessionConfig::with_seed(seed),
            nick,
            ColorPair::default(),
            Recorder::default(),
        )
        .unwrap()
    }

    /// Run scheduled steps until nothing is pending or the phase changes
    fn run_while(c: &mut SessionController<Recorder>, phase: SessionPhase) {
        for _ in 0..10_000 {
            if c.phase() != phase || c.next_delay().is_none() {
                return;
            }
            c.on_timer();
        }
        panic!("still {phase:?}");
    }

    /// Deliver every queued message to every other participant
    fn pump(players: &mut [SessionController<Recorder>]) {
        loop {
            let mut mail = Vec::new();
            for (from, player) in players.iter_mut().enumerate() {
                for envelope in player.host_mut().outbox.drain(..) {
                    mail.push((from, envelope));
                }
            }
            if mail.is_empty() {
                return;
            }
            for (from, envelope) in mail {
                let bytes = serde_json::to_vec(&envelope).unwrap();
                for (to, player) in players.iter_mut().enumerate() {
                    if to != from {
                        player.bytes_received(&bytes);
                    }
                }
            }
        }
    }

    #[test]
    fn test_solo_landing_on_target_scores() {
        let set = ChallengeSet::new(vec![vec![Challenge::new("1/2", 2), Challenge::new("1/3", 3)]]);
        let mut c = SessionController::with_challenges(
            SessionConfig::with_seed(5),
            set,
            "solo",
            ColorPair::default(),
            Recorder::default(),
        )
        .unwrap();

        assert!(c.press_ball());
        // Starting target is 1/2, so the first pick is 1/3
        let index = c.engine().target().challenge_index;
        assert_eq!(c.engine().target().display_label, "1/3");

        // Drop the ball with its centre over the target
        let field = *c.trajectory().field();
        let target_x = field.bar.x_at(c.engine().target().fraction);
        let x = target_x - field.ball_size / 2.0;
        c.ball.pos = Vec2::new(x, field.floor_y(x));
        c.ball.vel.x = 0.0;

        run_while(&mut c, SessionPhase::Falling);
        assert_ne!(c.phase(), SessionPhase::Falling);
        assert!((c.ball().center_x(field.ball_size) - target_x).abs() < 1e-3);

        let result = &c.host().results[0];
        assert!(result.correct);
        assert_eq!(result.challenge_index, index);
        assert_eq!(c.host().results.len(), 1);
        assert_eq!(c.engine().challenges()[index].times_played, 1);
        assert_eq!(c.engine().correct_count(), 1);
        assert_eq!(c.engine().played(), 1);
    }

    #[test]
    fn test_solo_bounce_loop() {
        let mut c = controller("solo", 11);
        assert_eq!(c.phase(), SessionPhase::Idle);
        assert!(c.press_ball());
        assert_eq!(c.phase(), SessionPhase::Falling);
        assert_eq!(c.next_delay(), Some(50));
        assert!(!c.press_ball(), "ball already in the air");
        assert!(c.host().labels.last().unwrap().starts_with("Bounce the ball to a position"));

        let first = c.engine().target().rational;
        run_while(&mut c, SessionPhase::Falling);
        assert_eq!(c.engine().played(), 1);
        assert_eq!(c.host().results.len(), 1);

        match c.phase() {
            SessionPhase::Landed => assert_eq!(c.next_delay(), Some(3000 - 50)),
            SessionPhase::Celebrating => run_while(&mut c, SessionPhase::Celebrating),
            other => panic!("unexpected {other:?}"),
        }

        // Pause is over: the next bounce starts with a different fraction
        c.on_timer();
        assert_eq!(c.phase(), SessionPhase::Falling);
        assert_ne!(c.engine().target().rational, first);
    }

    #[test]
    fn test_celebration_is_not_scored() {
        let mut c = controller("solo", 2);
        c.easter_egg = 50;
        // Park the ball on the easter egg and land it there
        let field = *c.trajectory().field();
        let egg_x = field.bar.x_at(c.easter_egg() as f32 / 100.0) - field.ball_size / 2.0;
        c.ball.pos = Vec2::new(egg_x, field.floor_y(egg_x));
        assert!(c.press_ball());
        run_while(&mut c, SessionPhase::Falling);
        assert_eq!(c.phase(), SessionPhase::Celebrating);

        run_while(&mut c, SessionPhase::Celebrating);
        assert_eq!(c.phase(), SessionPhase::Landed);
        assert_eq!(c.next_delay(), Some(3000));
        assert_eq!(c.engine().played(), 1);
        assert_eq!(c.host().frames.last(), Some(&7));
    }

    #[test]
    fn test_keys_steer_and_stop() {
        let mut c = controller("solo", 1);
        let step = c.config().dx_step * c.config().scale();
        c.key_down(Key::from_name("Left"));
        assert_eq!(c.ball().vel.x, -step);
        c.key_down(Key::from_name("l"));
        assert_eq!(c.ball().vel.x, step);
        c.key_down(Key::from_name("space"));
        assert_eq!(c.ball().vel.x, 0.0);
        c.key_down(Key::Right);
        c.key_up();
        assert_eq!(c.ball().vel.x, 0.0);

        c.key_down(Key::Return);
        assert_eq!(c.phase(), SessionPhase::Falling);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut c = controller("solo", 4);
        c.press_ball();
        c.on_timer();
        let pos = c.ball().pos;

        c.pause();
        c.pause();
        assert_eq!(c.phase(), SessionPhase::Paused);
        assert_eq!(c.next_delay(), None);
        c.on_timer();
        assert_eq!(c.ball().pos, pos);

        c.resume();
        assert_eq!(c.phase(), SessionPhase::Falling);
        assert_eq!(c.next_delay(), Some(50));
        c.resume();
        assert_eq!(c.phase(), SessionPhase::Falling);
    }

    #[test]
    fn test_improper_custom_fraction_rejected() {
        let mut c = controller("solo", 0);
        let before = c.engine().challenges().len();
        assert!(matches!(
            c.add_fraction("5/4"),
            Err(InputError::Improper { numerator: 5, denominator: 4 })
        ));
        assert_eq!(c.engine().challenges().len(), before);

        assert!(c.add_fraction_entry("5", "7").is_ok());
        assert_eq!(c.engine().challenges().len(), before + 1);
    }

    #[test]
    fn test_leaving_sectors_restores_ball() {
        let mut c = controller("solo", 0);
        c.set_mode(Mode::Sectors);
        assert_eq!(c.host().restored, 0);
        c.set_mode(Mode::Percents);
        assert_eq!(c.host().restored, 1);
        assert_eq!(c.host().bars.last(), Some(&10));
    }

    #[test]
    fn test_garbage_messages_are_dropped() {
        let mut c = controller("bob", 0);
        c.join();
        c.bytes_received(b"{not json");
        c.bytes_received(br#"{"command": "z", "data": "1"}"#);
        c.bytes_received(br#"{"command": "turn", "data": "[1]"}"#);
        assert_eq!(*c.turns().phase(), crate::net::TurnPhase::WaitingToJoin);
    }

    #[test]
    fn test_shared_session_turns() {
        let mut players = vec![controller("alice", 1), controller("bob", 2)];
        players[0].share();
        players[1].join();
        pump(&mut players);

        // Roster goes out in join order and the sharer starts
        assert!(players[0].turns().is_my_turn());
        assert_eq!(players[1].turns().nicks(), ["alice", "bob"]);
        assert_eq!(players[1].host().labels.last().unwrap(), "Waiting for alice");
        assert!(!players[1].press_bar(100.0), "not bob's turn");

        // Alice picks the middle of the bar: 1/2
        let x = players[0].trajectory().field().bar.x_at(0.5);
        assert!(players[0].press_bar(x));
        assert_eq!(players[0].engine().target().display_label, "1/2");
        pump(&mut players);
        assert_eq!(players[1].phase(), SessionPhase::Falling);
        assert_eq!(players[1].engine().target().display_label, "1/2");

        run_while(&mut players[0], SessionPhase::Falling);
        pump(&mut players);
        assert!(players[1].turns().is_my_turn());
        assert_eq!(
            *players[0].turns().phase(),
            crate::net::TurnPhase::TheirTurn("bob".into())
        );

        // Bob's copy lands after he got the turn; the turn stays with him
        run_while(&mut players[1], SessionPhase::Falling);
        assert!(players[1].turns().is_my_turn());
        assert!(players[1].turns().awaiting_selection());
        assert!(players[1].host().outbox.is_empty());
        assert_eq!(players[0].engine().played(), 1);
        assert_eq!(players[1].engine().played(), 1);
        assert_eq!(players[0].phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_close_sends_leave() {
        let mut players = vec![controller("alice", 1), controller("bob", 2)];
        players[0].share();
        players[1].join();
        pump(&mut players);

        players[1].close();
        assert_eq!(players[1].host().outbox.last().unwrap().command, "leave");
        pump(&mut players);
        assert_eq!(players[0].turns().nicks(), ["alice"]);
        assert_eq!(players[0].host().labels.last().unwrap(), WAIT_FOR_PEERS);
        assert!(!players[0].turns().is_my_turn());
        assert!(players[0].host().outbox.is_empty());

        // Alone again: the ball is clickable as in a solo session
        assert!(!players[0].press_bar(100.0));
        assert!(players[0].press_ball());
        assert_eq!(players[0].phase(), SessionPhase::Falling);
    }
}
