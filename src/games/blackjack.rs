//! Single-hand blackjack against a dealer.
//!
//! One 52-card deck is shuffled when the hand is dealt and every later card
//! (hits, dealer draws) is popped from that same deck, so no card can appear
//! twice within a hand.

use crate::errors::ValidationError;
use crate::games::payout::multiplier_payout;
use crate::games::random::{shuffle, RandomSource};
use crate::games::types::{Bet, OutcomeKind, Payout, Resolution, RevealedState};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BLACKJACK: u8 = 21;
pub const DEFAULT_DEALER_STANDS_ON: u8 = 17;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Face cards count 10, an Ace counts 11 before adjustment
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suit = match self.suit {
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
            Suit::Spades => 's',
        };
        write!(f, "{}{}", self.rank.label(), suit)
    }
}

/// Cards left to deal, next card at the end
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// All 52 cards in suit-major order
    pub fn standard() -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
            .collect();
        Self { cards }
    }

    pub fn shuffled<R: RandomSource + ?Sized>(source: &mut R) -> Self {
        let mut deck = Self::standard();
        shuffle(source, &mut deck.cards);
        deck
    }

    /// Deck that deals `cards` in the given order
    pub fn stacked(cards: Vec<Card>) -> Self {
        let mut cards = cards;
        cards.reverse();
        Self { cards }
    }

    pub fn draw(&mut self) -> Result<Card, ValidationError> {
        self.cards.pop().ok_or(ValidationError::DeckExhausted)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// Sum with every Ace at 11, then count Aces down to 1 while over 21.
pub fn hand_total(cards: &[Card]) -> u8 {
    let mut total: u32 = cards.iter().map(|c| c.rank.value() as u32).sum();
    let mut soft_aces = cards.iter().filter(|c| c.rank == Rank::Ace).count();
    while total > BLACKJACK as u32 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total.min(u8::MAX as u32) as u8
}

pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_total(cards) == BLACKJACK
}

pub fn is_bust(cards: &[Card]) -> bool {
    hand_total(cards) > BLACKJACK
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PlayerTurn,
    DealerTurn,
    Resolved,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandOutcome {
    PlayerBlackjack,
    DealerBlackjack,
    PlayerBust,
    DealerBust,
    PlayerWin,
    DealerWin,
    Push,
}

impl HandOutcome {
    /// Return on the stake: 2.5 natural, 2 win, 1 push, 0 loss
    pub fn multiplier(self) -> f64 {
        match self {
            HandOutcome::PlayerBlackjack => 2.5,
            HandOutcome::DealerBust | HandOutcome::PlayerWin => 2.0,
            HandOutcome::Push => 1.0,
            HandOutcome::DealerBlackjack | HandOutcome::PlayerBust | HandOutcome::DealerWin => 0.0,
        }
    }

    pub fn kind(self) -> OutcomeKind {
        match self {
            HandOutcome::PlayerBlackjack | HandOutcome::DealerBust | HandOutcome::PlayerWin => {
                OutcomeKind::Win
            }
            HandOutcome::Push => OutcomeKind::Push,
            HandOutcome::DealerBlackjack | HandOutcome::PlayerBust | HandOutcome::DealerWin => {
                OutcomeKind::Loss
            }
        }
    }
}

/// What the player sees mid-hand: the dealer's hole card stays hidden until resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandView {
    pub stage: Stage,
    pub player: Vec<Card>,
    pub player_total: u8,
    pub dealer: Vec<Card>,
    pub dealer_total: u8,
    pub hidden_cards: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<HandOutcome>,
}

#[derive(Debug, Clone)]
pub struct BlackjackHand {
    deck: Deck,
    player: Vec<Card>,
    dealer: Vec<Card>,
    stage: Stage,
    outcome: Option<HandOutcome>,
    dealer_stands_on: u8,
}

impl BlackjackHand {
    /// Shuffle a fresh deck and deal
    pub fn deal<R: RandomSource + ?Sized>(
        source: &mut R,
        dealer_stands_on: u8,
    ) -> Result<Self, ValidationError> {
        Self::from_deck(Deck::shuffled(source), dealer_stands_on)
    }

    /// Deal player, dealer, player, dealer. Naturals settle on the spot.
    pub fn from_deck(mut deck: Deck, dealer_stands_on: u8) -> Result<Self, ValidationError> {
        let mut player = Vec::with_capacity(4);
        let mut dealer = Vec::with_capacity(4);
        for _ in 0..2 {
            player.push(deck.draw()?);
            dealer.push(deck.draw()?);
        }

        let mut hand = Self {
            deck,
            player,
            dealer,
            stage: Stage::PlayerTurn,
            outcome: None,
            dealer_stands_on,
        };

        let natural = match (is_natural(&hand.player), is_natural(&hand.dealer)) {
            (true, true) => Some(HandOutcome::Push),
            (true, false) => Some(HandOutcome::PlayerBlackjack),
            (false, true) => Some(HandOutcome::DealerBlackjack),
            (false, false) => None,
        };
        if let Some(outcome) = natural {
            hand.finish(outcome);
        }
        Ok(hand)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn outcome(&self) -> Option<HandOutcome> {
        self.outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.stage == Stage::Resolved
    }

    pub fn player_cards(&self) -> &[Card] {
        &self.player
    }

    pub fn dealer_cards(&self) -> &[Card] {
        &self.dealer
    }

    pub fn player_total(&self) -> u8 {
        hand_total(&self.player)
    }

    pub fn dealer_total(&self) -> u8 {
        hand_total(&self.dealer)
    }

    /// Draw one card for the player. A bust resolves the hand.
    pub fn hit(&mut self) -> Result<u8, ValidationError> {
        if self.stage != Stage::PlayerTurn {
            return Err(ValidationError::RoundFinished);
        }
        let card = self.deck.draw()?;
        self.player.push(card);
        let total = self.player_total();
        if total > BLACKJACK {
            self.finish(HandOutcome::PlayerBust);
        }
        Ok(total)
    }

    /// Stand and play out the dealer's hand
    pub fn stand(&mut self) -> Result<HandOutcome, ValidationError> {
        if self.stage != Stage::PlayerTurn {
            return Err(ValidationError::RoundFinished);
        }
        self.stage = Stage::DealerTurn;
        while self.dealer_total() < self.dealer_stands_on {
            let card = self.deck.draw()?;
            self.dealer.push(card);
        }

        let player = self.player_total();
        let dealer = self.dealer_total();
        let outcome = if dealer > BLACKJACK {
            HandOutcome::DealerBust
        } else if player > dealer {
            HandOutcome::PlayerWin
        } else if player < dealer {
            HandOutcome::DealerWin
        } else {
            HandOutcome::Push
        };
        self.finish(outcome);
        Ok(outcome)
    }

    fn finish(&mut self, outcome: HandOutcome) {
        self.stage = Stage::Resolved;
        self.outcome = Some(outcome);
    }

    pub fn view(&self) -> HandView {
        let (dealer, hidden_cards) = if self.is_resolved() {
            (self.dealer.clone(), 0)
        } else {
            (self.dealer[..1].to_vec(), self.dealer.len() - 1)
        };
        HandView {
            stage: self.stage,
            player: self.player.clone(),
            player_total: self.player_total(),
            dealer_total: hand_total(&dealer),
            dealer,
            hidden_cards,
            outcome: self.outcome,
        }
    }

    /// Settlement once resolved; `None` during the player's turn.
    pub fn resolution(&self, bet: &Bet) -> Option<Resolution> {
        let outcome = self.outcome?;
        let multiplier = outcome.multiplier();
        let payout = if multiplier > 0.0 {
            multiplier_payout(bet, multiplier)
        } else {
            Payout::nothing(bet.currency)
        };
        Some(Resolution {
            outcome: outcome.kind(),
            payout,
            multiplier,
            revealed: RevealedState::Blackjack {
                player: self.player.clone(),
                dealer: self.dealer.clone(),
                player_total: self.player_total(),
                dealer_total: self.dealer_total(),
                outcome,
            },
            draw: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::fairness::FairSeed;
    use crate::games::random::SeededSource;
    use crate::games::types::{Currency, GameType};
    use std::collections::HashSet;

    fn c(rank: Rank) -> Card {
        Card::new(rank, Suit::Spades)
    }

    fn bet() -> Bet {
        Bet::new(100.0, Currency::Coins, GameType::Blackjack).unwrap()
    }

    #[test]
    fn test_hand_totals() {
        assert_eq!(hand_total(&[c(Rank::Ace), c(Rank::Nine)]), 20);
        assert_eq!(hand_total(&[c(Rank::Ace), c(Rank::Ace), c(Rank::Nine)]), 21);
        let busted = [c(Rank::King), c(Rank::Queen), c(Rank::Five)];
        assert_eq!(hand_total(&busted), 25);
        assert!(is_bust(&busted));
        assert_eq!(hand_total(&[c(Rank::Ace), c(Rank::Ace), c(Rank::Ace), c(Rank::Ace)]), 14);
    }

    #[test]
    fn test_natural_detection() {
        assert!(is_natural(&[c(Rank::Ace), c(Rank::King)]));
        assert!(!is_natural(&[c(Rank::Seven), c(Rank::Seven), c(Rank::Seven)]));
    }

    #[test]
    fn test_shuffled_deck_unique() {
        let mut source = SeededSource::new(FairSeed::new("deck", "client", 1).unwrap());
        let mut deck = Deck::shuffled(&mut source);
        let mut seen = HashSet::new();
        while let Ok(card) = deck.draw() {
            assert!(seen.insert(card));
        }
        assert_eq!(seen.len(), 52);
        assert_eq!(deck.draw(), Err(ValidationError::DeckExhausted));
    }

    #[test]
    fn test_player_natural_pays_two_and_a_half() {
        let deck = Deck::stacked(vec![c(Rank::Ace), c(Rank::Nine), c(Rank::King), c(Rank::Seven)]);
        let hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.stage(), Stage::Resolved);
        assert_eq!(hand.outcome(), Some(HandOutcome::PlayerBlackjack));
        assert_eq!(hand.dealer_total(), 16);

        let res = hand.resolution(&bet()).unwrap();
        assert_eq!(res.outcome, OutcomeKind::Win);
        assert_eq!(res.payout.amount, 250.0);
    }

    #[test]
    fn test_dealer_natural_and_double_natural() {
        let deck = Deck::stacked(vec![c(Rank::Nine), c(Rank::Ace), c(Rank::Seven), c(Rank::Queen)]);
        let hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.outcome(), Some(HandOutcome::DealerBlackjack));
        assert!(hand.resolution(&bet()).unwrap().payout.is_empty());

        let deck = Deck::stacked(vec![c(Rank::Ace), c(Rank::Ace), c(Rank::King), c(Rank::Ten)]);
        let hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.outcome(), Some(HandOutcome::Push));
        assert_eq!(hand.resolution(&bet()).unwrap().payout.amount, 100.0);
    }

    #[test]
    fn test_hit_to_bust() {
        let deck = Deck::stacked(vec![
            c(Rank::King),
            c(Rank::Nine),
            c(Rank::Six),
            c(Rank::Seven),
            c(Rank::Queen),
        ]);
        let mut hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.stage(), Stage::PlayerTurn);
        assert_eq!(hand.hit().unwrap(), 26);
        assert_eq!(hand.outcome(), Some(HandOutcome::PlayerBust));
        assert_eq!(hand.hit(), Err(ValidationError::RoundFinished));
        assert_eq!(hand.stand(), Err(ValidationError::RoundFinished));
    }

    #[test]
    fn test_dealer_draws_to_seventeen_and_busts() {
        // Player 10+8 = 18, dealer 10+6 draws a King
        let deck = Deck::stacked(vec![
            c(Rank::Ten),
            c(Rank::Ten),
            c(Rank::Eight),
            c(Rank::Six),
            c(Rank::King),
        ]);
        let mut hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.stand().unwrap(), HandOutcome::DealerBust);
        assert_eq!(hand.dealer_cards().len(), 3);
        assert_eq!(hand.resolution(&bet()).unwrap().payout.amount, 200.0);
    }

    #[test]
    fn test_dealer_stands_on_seventeen_compare() {
        let deck = Deck::stacked(vec![c(Rank::Ten), c(Rank::Ten), c(Rank::Seven), c(Rank::Seven)]);
        let mut hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.stand().unwrap(), HandOutcome::Push);
        assert_eq!(hand.dealer_cards().len(), 2);

        let deck = Deck::stacked(vec![c(Rank::Ten), c(Rank::Ten), c(Rank::Nine), c(Rank::Eight)]);
        let mut hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.stand().unwrap(), HandOutcome::PlayerWin);

        let deck = Deck::stacked(vec![c(Rank::Ten), c(Rank::Ten), c(Rank::Six), c(Rank::Nine)]);
        let mut hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        assert_eq!(hand.stand().unwrap(), HandOutcome::DealerWin);
    }

    #[test]
    fn test_view_hides_hole_card() {
        let deck = Deck::stacked(vec![c(Rank::Ten), c(Rank::Five), c(Rank::Seven), c(Rank::Nine)]);
        let hand = BlackjackHand::from_deck(deck, DEFAULT_DEALER_STANDS_ON).unwrap();
        let view = hand.view();
        assert_eq!(view.dealer.len(), 1);
        assert_eq!(view.hidden_cards, 1);
        assert_eq!(view.dealer_total, 5);
        assert_eq!(view.player_total, 17);
        assert!(hand.resolution(&bet()).is_none());
    }

    #[test]
    fn test_cards_unique_within_seeded_hands() {
        for nonce in 0..200 {
            let mut source = SeededSource::new(FairSeed::new("bj", "client", nonce).unwrap());
            let mut hand = BlackjackHand::deal(&mut source, DEFAULT_DEALER_STANDS_ON).unwrap();
            while hand.stage() == Stage::PlayerTurn && hand.player_total() < 15 {
                hand.hit().unwrap();
            }
            if hand.stage() == Stage::PlayerTurn {
                hand.stand().unwrap();
            }
            let all: Vec<Card> = hand.player_cards().iter().chain(hand.dealer_cards()).copied().collect();
            let unique: HashSet<Card> = all.iter().copied().collect();
            assert_eq!(all.len(), unique.len());
            assert!(hand.is_resolved());
        }
    }
}
