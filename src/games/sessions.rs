use crate::errors::ValidationError;
use crate::games::blackjack::BlackjackHand;
use crate::games::fairness::SeedTrace;
use crate::games::mines::MinesRound;
use crate::games::types::{Bet, GameType, RoundContext};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// A mines board in play
#[derive(Debug, Clone)]
pub struct MinesSession {
    pub ctx: RoundContext,
    pub bet: Bet,
    pub round: MinesRound,
    pub seed: Option<SeedTrace>,
}

/// A blackjack hand in play
#[derive(Debug, Clone)]
pub struct BlackjackSession {
    pub ctx: RoundContext,
    pub bet: Bet,
    pub hand: BlackjackHand,
    pub seed: Option<SeedTrace>,
}

#[derive(Debug, Clone)]
pub enum Session {
    /// Slot claimed while the stake is being debited
    Reserved,
    Mines(MinesSession),
    Blackjack(BlackjackSession),
}

type SlotKey = (String, GameType);

/// One active round per player and game.
///
/// A slot is reserved before the debit so a second start cannot slip in
/// while the first is still awaiting the balance service.
#[derive(Debug, Default)]
pub struct SessionPool {
    sessions: DashMap<SlotKey, Session>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(player_id: &str, game: GameType) -> SlotKey {
        (player_id.to_string(), game)
    }

    /// Claim the slot, failing if anything already holds it
    pub fn reserve(&self, player_id: &str, game: GameType) -> Result<(), ValidationError> {
        match self.sessions.entry(Self::key(player_id, game)) {
            Entry::Occupied(_) => Err(ValidationError::SessionActive { game }),
            Entry::Vacant(slot) => {
                slot.insert(Session::Reserved);
                Ok(())
            }
        }
    }

    /// Fill a reserved slot with the live round
    pub fn activate(&self, player_id: &str, game: GameType, session: Session) {
        self.sessions.insert(Self::key(player_id, game), session);
    }

    /// Drop a reservation or finished session
    pub fn release(&self, player_id: &str, game: GameType) -> Option<Session> {
        self.sessions
            .remove(&Self::key(player_id, game))
            .map(|(_, session)| session)
    }

    pub fn is_active(&self, player_id: &str, game: GameType) -> bool {
        self.sessions.contains_key(&Self::key(player_id, game))
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Run `f` against the player's live mines round
    pub fn with_mines<T>(
        &self,
        player_id: &str,
        f: impl FnOnce(&mut MinesSession) -> T,
    ) -> Result<T, ValidationError> {
        let mut slot = self
            .sessions
            .get_mut(&Self::key(player_id, GameType::Mines))
            .ok_or(ValidationError::NoActiveSession {
                game: GameType::Mines,
            })?;
        match slot.value_mut() {
            Session::Mines(session) => Ok(f(session)),
            _ => Err(ValidationError::NoActiveSession {
                game: GameType::Mines,
            }),
        }
    }

    /// Run `f` against the player's live blackjack hand
    pub fn with_blackjack<T>(
        &self,
        player_id: &str,
        f: impl FnOnce(&mut BlackjackSession) -> T,
    ) -> Result<T, ValidationError> {
        let mut slot = self
            .sessions
            .get_mut(&Self::key(player_id, GameType::Blackjack))
            .ok_or(ValidationError::NoActiveSession {
                game: GameType::Blackjack,
            })?;
        match slot.value_mut() {
            Session::Blackjack(session) => Ok(f(session)),
            _ => Err(ValidationError::NoActiveSession {
                game: GameType::Blackjack,
            }),
        }
    }
}
