use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const LOBBY_DIE_SIDES: u8 = 20;
pub const MOVE_DIE_SIDES: u8 = 6;

/// Source of die rolls. Implementations return a value in `1..=sides`.
pub trait Dice: Send + Sync {
    fn roll(&self, sides: u8) -> u8;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDice;

impl Dice for RandomDice {
    fn roll(&self, sides: u8) -> u8 {
        rand::rng().random_range(1..=sides.max(1))
    }
}

/// Replays a fixed sequence of rolls, falling back to 1 when exhausted
#[derive(Debug, Default)]
pub struct ScriptedDice {
    rolls: Mutex<VecDeque<u8>>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
        }
    }

    pub fn push(&self, roll: u8) {
        if let Ok(mut rolls) = self.rolls.lock() {
            rolls.push_back(roll);
        }
    }

    pub fn remaining(&self) -> usize {
        self.rolls.lock().map(|rolls| rolls.len()).unwrap_or(0)
    }
}

impl Dice for ScriptedDice {
    fn roll(&self, sides: u8) -> u8 {
        let next = self
            .rolls
            .lock()
            .ok()
            .and_then(|mut rolls| rolls.pop_front())
            .unwrap_or(1);
        next.clamp(1, sides.max(1))
    }
}

/// Rolls once, or twice keeping the higher value when `advantage` is set
pub fn roll_with_advantage(dice: &dyn Dice, sides: u8, advantage: bool) -> u8 {
    let first = dice.roll(sides);
    if advantage {
        first.max(dice.roll(sides))
    } else {
        first
    }
}
