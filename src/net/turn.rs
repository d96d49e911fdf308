//! Turn coordination for shared sessions
//!
//! The coordinator is a pure state machine: inbound messages and local
//! actions go in, a list of [`TurnEvent`]s comes out for the session to act
//! on (send a message, update the indicator, play a fraction). Messages are
//! handled one at a time in arrival order.

use super::protocol::{ColorPair, Message};
use crate::sim::ChallengeSet;

/// A participant in a shared session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub nick: String,
    pub colors: ColorPair,
}

impl Player {
    pub fn new(nick: impl Into<String>, colors: ColorPair) -> Self {
        Self {
            nick: nick.into(),
            colors,
        }
    }
}

/// Which side of the session we are on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Solo,
    /// Created the session; owns the roster
    Sharer,
    Joiner,
}

/// Turn phase of the local participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPhase {
    NotSharing,
    /// Joiner that has not seen a roster yet
    WaitingToJoin,
    /// Sharer waiting for the first joiner
    WaitingForPeers,
    TheirTurn(String),
    MyTurn,
}

/// Whose turn it is, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub current_nickname: Option<String>,
    /// Turn holder still has to pick a fraction from the bar
    pub awaiting_selection: bool,
}

/// Something the session has to do after a coordinator transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Broadcast this message
    Send(Message),
    Joined(String),
    Left(String),
    RosterChanged,
    /// Local player holds the turn and should pick a fraction
    MyTurn,
    TheirTurn(String),
    /// Another participant picked this fraction; animate it
    PlayFraction(String),
    /// Sharer whose last peer left; play continues solo
    Alone,
}

/// Turn coordinator
#[derive(Debug, Clone)]
pub struct TurnCoordinator {
    me: Player,
    role: Role,
    roster: Vec<Player>,
    phase: TurnPhase,
    awaiting_selection: bool,
    max_participants: usize,
}

impl TurnCoordinator {
    pub fn new(nick: impl Into<String>, colors: ColorPair, max_participants: usize) -> Self {
        let me = Player::new(nick, colors);
        Self {
            roster: vec![me.clone()],
            me,
            role: Role::Solo,
            phase: TurnPhase::NotSharing,
            awaiting_selection: false,
            max_participants: max_participants.max(1),
        }
    }

    pub fn me(&self) -> &Player {
        &self.me
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn nicks(&self) -> Vec<String> {
        self.roster.iter().map(|p| p.nick.clone()).collect()
    }

    pub fn player(&self, nick: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.nick == nick)
    }

    /// More than one participant: turns apply
    pub fn is_sharing(&self) -> bool {
        self.role != Role::Solo && self.roster.len() > 1
    }

    pub fn is_sharer(&self) -> bool {
        self.role == Role::Sharer
    }

    pub fn is_my_turn(&self) -> bool {
        self.phase == TurnPhase::MyTurn
    }

    pub fn awaiting_selection(&self) -> bool {
        self.awaiting_selection
    }

    pub fn turn_state(&self) -> TurnState {
        let current_nickname = match &self.phase {
            TurnPhase::MyTurn => Some(self.me.nick.clone()),
            TurnPhase::TheirTurn(nick) => Some(nick.clone()),
            _ => None,
        };
        TurnState {
            current_nickname,
            awaiting_selection: self.awaiting_selection,
        }
    }

    /// Offer the session to others
    pub fn share(&mut self) -> Vec<TurnEvent> {
        self.role = Role::Sharer;
        self.phase = TurnPhase::WaitingForPeers;
        log::info!("{} is sharing; waiting for peers", self.me.nick);
        Vec::new()
    }

    /// Join someone else's session
    pub fn join(&mut self) -> Vec<TurnEvent> {
        self.role = Role::Joiner;
        self.phase = TurnPhase::WaitingToJoin;
        log::info!("{} is joining", self.me.nick);
        vec![TurnEvent::Send(Message::Join {
            nick: self.me.nick.clone(),
            colors: self.me.colors.clone(),
        })]
    }

    /// Message announcing that we are leaving, if anyone is listening
    pub fn leave(&mut self) -> Option<Message> {
        let sharing = self.is_sharing();
        self.role = Role::Solo;
        self.roster.retain(|p| p.nick == self.me.nick);
        self.phase = TurnPhase::NotSharing;
        self.awaiting_selection = false;
        sharing.then(|| Message::Leave {
            nick: self.me.nick.clone(),
        })
    }

    /// Handle one inbound message
    ///
    /// `play_count` is the number of bounces played so far; the sharer
    /// takes the first turn when a peer joins before anything was played.
    pub fn handle(&mut self, message: Message, play_count: u32) -> Vec<TurnEvent> {
        if self.role == Role::Solo {
            log::debug!("Ignoring {} while not sharing", message.command().as_str());
            return Vec::new();
        }

        let mut events = Vec::new();
        match message {
            Message::Join { nick, colors } => {
                events.push(TurnEvent::Joined(nick.clone()));
                if self.role == Role::Sharer {
                    self.on_join(nick, colors, play_count, &mut events);
                }
            }
            Message::Roster { nicks, colors } => {
                if self.role != Role::Sharer {
                    self.on_roster(nicks, colors, &mut events);
                }
            }
            Message::Fraction { label } => {
                events.push(TurnEvent::PlayFraction(label));
            }
            Message::Turn { nick } => self.on_turn(nick, &mut events),
            Message::Leave { nick } => {
                events.push(TurnEvent::Left(nick.clone()));
                if self.role == Role::Sharer {
                    self.on_leave(&nick, &mut events);
                }
            }
        }
        events
    }

    /// Pick the challenge nearest to a tap at `rel_x` along the bar
    ///
    /// Only valid while it is our turn and no fraction has been picked yet.
    pub fn select_fraction(
        &mut self,
        rel_x: f32,
        challenges: &ChallengeSet,
    ) -> Option<(String, Vec<TurnEvent>)> {
        if !self.is_my_turn() || !self.awaiting_selection {
            return None;
        }
        let index = challenges.nearest(rel_x)?;
        let label = challenges.get(index)?.label.clone();
        self.awaiting_selection = false;
        log::debug!("{} picked {label} at {rel_x:.3}", self.me.nick);
        let events = vec![TurnEvent::Send(Message::Fraction {
            label: label.clone(),
        })];
        Some((label, events))
    }

    /// Our bounce landed: hand the turn to the next player in the roster
    ///
    /// A turn granted while someone else's ball was still in the air has
    /// not been played yet, so it is kept.
    pub fn finish_bounce(&mut self) -> Vec<TurnEvent> {
        if !self.is_sharing() || !self.is_my_turn() || self.awaiting_selection {
            return Vec::new();
        }
        let next = self.next_after(&self.me.nick);
        log::debug!("Turn passes {} -> {next}", self.me.nick);

        let mut events = vec![TurnEvent::Send(Message::Turn { nick: next.clone() })];
        if next == self.me.nick {
            self.grant_my_turn(&mut events);
        } else {
            self.phase = TurnPhase::TheirTurn(next.clone());
            self.awaiting_selection = false;
            events.push(TurnEvent::TheirTurn(next));
        }
        events
    }

    /// Nickname following `nick` in turn order (wrapping)
    pub fn next_after(&self, nick: &str) -> String {
        match self.roster.iter().position(|p| p.nick == nick) {
            Some(i) => self.roster[(i + 1) % self.roster.len()].nick.clone(),
            None => self.roster[0].nick.clone(),
        }
    }

    fn roster_message(&self) -> Message {
        Message::Roster {
            nicks: self.nicks(),
            colors: self.roster.iter().map(|p| p.colors.clone()).collect(),
        }
    }

    fn grant_my_turn(&mut self, events: &mut Vec<TurnEvent>) {
        self.phase = TurnPhase::MyTurn;
        self.awaiting_selection = true;
        events.push(TurnEvent::MyTurn);
    }

    fn on_join(&mut self, nick: String, colors: ColorPair, play_count: u32, events: &mut Vec<TurnEvent>) {
        if self.player(&nick).is_none() {
            if self.roster.len() >= self.max_participants {
                log::warn!("Session full; ignoring join from {nick}");
                return;
            }
            log::info!("Appending {nick} to the roster");
            self.roster.push(Player::new(nick, colors));
            events.push(TurnEvent::RosterChanged);
        }
        events.push(TurnEvent::Send(self.roster_message()));

        if play_count == 0 {
            // Nothing played yet: the sharer goes first
            self.grant_my_turn(events);
        }
    }

    fn on_roster(&mut self, nicks: Vec<String>, colors: Vec<ColorPair>, events: &mut Vec<TurnEvent>) {
        if !nicks.contains(&self.me.nick) {
            log::warn!("Roster {nicks:?} does not include {}; ignoring", self.me.nick);
            return;
        }
        self.roster = nicks
            .into_iter()
            .zip(colors)
            .map(|(nick, colors)| Player::new(nick, colors))
            .collect();
        log::info!("Roster is now {:?}", self.nicks());
        events.push(TurnEvent::RosterChanged);

        if self.phase == TurnPhase::WaitingToJoin {
            let sharer = self.roster[0].nick.clone();
            self.phase = TurnPhase::TheirTurn(sharer.clone());
            events.push(TurnEvent::TheirTurn(sharer));
        }
    }

    fn on_turn(&mut self, nick: String, events: &mut Vec<TurnEvent>) {
        if nick == self.me.nick {
            self.grant_my_turn(events);
        } else if self.player(&nick).is_some() {
            self.phase = TurnPhase::TheirTurn(nick.clone());
            self.awaiting_selection = false;
            events.push(TurnEvent::TheirTurn(nick));
        } else {
            log::warn!("Turn for unknown player {nick}; staying put");
        }
    }

    fn on_leave(&mut self, nick: &str, events: &mut Vec<TurnEvent>) {
        if nick == self.me.nick {
            return;
        }
        let Some(index) = self.roster.iter().position(|p| p.nick == nick) else {
            log::warn!("{nick} left but was not in the roster");
            return;
        };
        self.roster.remove(index);
        log::info!("Removed {nick}; roster is now {:?}", self.nicks());
        events.push(TurnEvent::RosterChanged);

        if self.roster.len() == 1 {
            // Nobody left to take turns with
            self.phase = TurnPhase::WaitingForPeers;
            self.awaiting_selection = false;
            events.push(TurnEvent::Alone);
            return;
        }
        events.push(TurnEvent::Send(self.roster_message()));

        // Restart the rotation from the sharer
        events.push(TurnEvent::Send(Message::Turn {
            nick: self.me.nick.clone(),
        }));
        self.grant_my_turn(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Challenge;
    use proptest::prelude::*;

    fn colors(n: u8) -> ColorPair {
        ColorPair::new(format!("#{n}{n}{n}"), "#FFFFFF")
    }

    fn sharer(nick: &str) -> TurnCoordinator {
        let mut c = TurnCoordinator::new(nick, colors(0), 4);
        c.share();
        c
    }

    fn join(nick: &str) -> Message {
        Message::Join {
            nick: nick.into(),
            colors: colors(1),
        }
    }

    fn sent(events: &[TurnEvent]) -> Vec<&Message> {
        events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::Send(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn halves() -> ChallengeSet {
        ChallengeSet::new(vec![vec![Challenge::new("1/2", 2)]])
    }

    /// Take the turn and pick a fraction so the bounce counts as ours
    fn play_turn(c: &mut TurnCoordinator) {
        let me = c.me().nick.clone();
        c.handle(Message::Turn { nick: me }, 1);
        assert!(c.select_fraction(0.5, &halves()).is_some());
    }

    /// Roster of the given nicks with `me` as the sharer (first entry)
    fn session_of(nicks: &[&str]) -> TurnCoordinator {
        let mut c = sharer(nicks[0]);
        for nick in &nicks[1..] {
            c.handle(join(nick), 1);
        }
        c
    }

    #[test]
    fn test_join_rebroadcasts_roster_in_join_order() {
        let mut alice = sharer("alice");
        assert_eq!(*alice.phase(), TurnPhase::WaitingForPeers);
        assert!(!alice.is_sharing());

        let events = alice.handle(join("bob"), 0);
        let sent = sent(&events);
        assert_eq!(sent.len(), 1);
        match sent[0] {
            Message::Roster { nicks, colors } => {
                assert_eq!(nicks, &["alice".to_string(), "bob".to_string()]);
                assert_eq!(colors.len(), 2);
            }
            other => panic!("expected roster, got {other:?}"),
        }
        // Nothing played yet: sharer takes the first turn
        assert!(events.contains(&TurnEvent::MyTurn));
        assert!(alice.is_my_turn());
        assert!(alice.awaiting_selection());
        assert!(alice.is_sharing());
    }

    #[test]
    fn test_duplicate_join_is_idempotent() {
        let mut alice = sharer("alice");
        alice.handle(join("bob"), 0);
        alice.handle(join("bob"), 0);
        assert_eq!(alice.roster().len(), 2);
    }

    #[test]
    fn test_join_after_play_does_not_grant_turn() {
        let mut alice = sharer("alice");
        let events = alice.handle(join("bob"), 3);
        assert!(!events.contains(&TurnEvent::MyTurn));
        assert_eq!(*alice.phase(), TurnPhase::WaitingForPeers);
    }

    #[test]
    fn test_join_beyond_capacity_ignored() {
        let mut alice = TurnCoordinator::new("alice", colors(0), 2);
        alice.share();
        alice.handle(join("bob"), 1);
        let events = alice.handle(join("carol"), 1);
        assert_eq!(alice.nicks(), ["alice", "bob"]);
        assert!(sent(&events).is_empty());
    }

    #[test]
    fn test_joiner_adopts_roster() {
        let mut bob = TurnCoordinator::new("bob", colors(1), 4);
        let events = bob.join();
        assert_eq!(
            sent(&events),
            [&Message::Join { nick: "bob".into(), colors: colors(1) }]
        );
        assert_eq!(*bob.phase(), TurnPhase::WaitingToJoin);

        let roster = Message::Roster {
            nicks: vec!["alice".into(), "bob".into()],
            colors: vec![colors(0), colors(1)],
        };
        let events = bob.handle(roster, 0);
        assert!(events.contains(&TurnEvent::RosterChanged));
        assert_eq!(*bob.phase(), TurnPhase::TheirTurn("alice".into()));
        assert_eq!(bob.nicks(), ["alice", "bob"]);
    }

    #[test]
    fn test_roster_without_me_is_ignored() {
        let mut bob = TurnCoordinator::new("bob", colors(1), 4);
        bob.join();
        let roster = Message::Roster {
            nicks: vec!["alice".into(), "carol".into()],
            colors: vec![colors(0), colors(2)],
        };
        assert!(bob.handle(roster, 0).is_empty());
        assert_eq!(*bob.phase(), TurnPhase::WaitingToJoin);
        assert_eq!(bob.nicks(), ["bob"]);
    }

    #[test]
    fn test_turn_message_selects_phase() {
        let mut bob = TurnCoordinator::new("bob", colors(1), 4);
        bob.join();
        bob.handle(
            Message::Roster {
                nicks: vec!["alice".into(), "bob".into(), "carol".into()],
                colors: vec![colors(0), colors(1), colors(2)],
            },
            0,
        );

        bob.handle(Message::Turn { nick: "carol".into() }, 1);
        assert_eq!(*bob.phase(), TurnPhase::TheirTurn("carol".into()));

        bob.handle(Message::Turn { nick: "bob".into() }, 2);
        assert!(bob.is_my_turn());
        assert_eq!(
            bob.turn_state(),
            TurnState { current_nickname: Some("bob".into()), awaiting_selection: true }
        );

        // Unknown nick: no transition
        assert!(bob.handle(Message::Turn { nick: "mallory".into() }, 3).is_empty());
        assert!(bob.is_my_turn());
    }

    #[test]
    fn test_rotation_wraps() {
        let mut c = session_of(&["a", "b", "c"]);
        assert_eq!(c.next_after("a"), "b");
        assert_eq!(c.next_after("b"), "c");
        assert_eq!(c.next_after("c"), "a");

        play_turn(&mut c);
        let events = c.finish_bounce();
        assert_eq!(sent(&events), [&Message::Turn { nick: "b".into() }]);
        assert_eq!(*c.phase(), TurnPhase::TheirTurn("b".into()));

        // Not our turn: nothing to hand over
        assert!(c.finish_bounce().is_empty());
    }

    #[test]
    fn test_last_player_hands_back_to_first() {
        let mut carol = TurnCoordinator::new("c", colors(2), 4);
        carol.join();
        carol.handle(
            Message::Roster {
                nicks: vec!["a".into(), "b".into(), "c".into()],
                colors: vec![colors(0), colors(1), colors(2)],
            },
            0,
        );
        play_turn(&mut carol);
        let events = carol.finish_bounce();
        assert_eq!(sent(&events), [&Message::Turn { nick: "a".into() }]);
    }

    #[test]
    fn test_unplayed_turn_is_not_passed_on() {
        let mut c = session_of(&["a", "b"]);
        c.handle(Message::Turn { nick: "a".into() }, 1);
        // Landing of the previous player's bounce: still ours to play
        assert!(c.finish_bounce().is_empty());
        assert!(c.is_my_turn());
        assert!(c.awaiting_selection());
    }

    #[test]
    fn test_leave_restarts_rotation_from_sharer() {
        let mut c = session_of(&["a", "b", "c"]);
        c.handle(Message::Turn { nick: "b".into() }, 4);

        let events = c.handle(Message::Leave { nick: "b".into() }, 4);
        assert_eq!(c.nicks(), ["a", "c"]);
        assert!(events.contains(&TurnEvent::Left("b".into())));
        assert!(c.is_my_turn());
        let sent = sent(&events);
        assert!(matches!(sent[0], Message::Roster { nicks, .. } if nicks == &["a", "c"]));
        assert_eq!(sent[1], &Message::Turn { nick: "a".into() });
    }

    #[test]
    fn test_last_peer_leaving_returns_to_waiting() {
        let mut c = session_of(&["a", "b"]);
        c.handle(Message::Turn { nick: "a".into() }, 2);

        let events = c.handle(Message::Leave { nick: "b".into() }, 2);
        assert_eq!(c.nicks(), ["a"]);
        assert!(events.contains(&TurnEvent::Alone));
        assert!(sent(&events).is_empty());
        assert_eq!(*c.phase(), TurnPhase::WaitingForPeers);
        assert!(!c.is_sharing());
        assert!(!c.awaiting_selection());
    }

    #[test]
    fn test_select_fraction_picks_nearest() {
        let mut c = session_of(&["a", "b"]);
        let set = ChallengeSet::new(vec![vec![
            Challenge::new("1/4", 4),
            Challenge::new("1/2", 2),
            Challenge::new("3/4", 4),
        ]]);

        // Not our turn yet
        assert!(c.select_fraction(0.5, &set).is_none());

        c.handle(Message::Turn { nick: "a".into() }, 1);
        let (label, events) = c.select_fraction(0.7, &set).unwrap();
        assert_eq!(label, "3/4");
        assert_eq!(sent(&events), [&Message::Fraction { label: "3/4".into() }]);
        assert!(!c.awaiting_selection());

        // Only one pick per turn
        assert!(c.select_fraction(0.2, &set).is_none());
    }

    #[test]
    fn test_fraction_message_plays_it() {
        let mut bob = TurnCoordinator::new("bob", colors(1), 4);
        bob.join();
        let events = bob.handle(Message::Fraction { label: "2/3".into() }, 0);
        assert_eq!(events, [TurnEvent::PlayFraction("2/3".into())]);
    }

    #[test]
    fn test_solo_ignores_messages() {
        let mut solo = TurnCoordinator::new("me", colors(0), 4);
        assert!(solo.handle(join("bob"), 0).is_empty());
        assert_eq!(solo.roster().len(), 1);
        assert!(solo.leave().is_none());
    }

    proptest! {
        #[test]
        fn prop_rotation_visits_everyone(n in 2usize..=4, start in 0usize..4) {
            let nicks: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            let refs: Vec<&str> = nicks.iter().map(String::as_str).collect();
            let c = session_of(&refs);
            let mut nick = nicks[start % n].clone();
            let mut seen = Vec::new();
            for _ in 0..n {
                nick = c.next_after(&nick);
                seen.push(nick.clone());
            }
            seen.sort();
            prop_assert_eq!(seen, nicks);
        }
    }
}
