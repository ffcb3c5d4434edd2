//! The two sides of a duel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of an agreement an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The actor who sent the challenge.
    Challenger,
    /// The actor who accepted it.
    Opponent,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Challenger, Side::Opponent];

    #[must_use]
    pub fn other(self) -> Side {
        match self {
            Side::Challenger => Side::Opponent,
            Side::Opponent => Side::Challenger,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Challenger => write!(f, "CHALLENGER"),
            Side::Opponent => write!(f, "OPPONENT"),
        }
    }
}

/// One value per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides<T> {
    pub challenger: T,
    pub opponent: T,
}

impl<T> Sides<T> {
    pub fn new(challenger: T, opponent: T) -> Self {
        Self {
            challenger,
            opponent,
        }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Challenger => &self.challenger,
            Side::Opponent => &self.opponent,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Challenger => &mut self.challenger,
            Side::Opponent => &mut self.opponent,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [
            (Side::Challenger, &self.challenger),
            (Side::Opponent, &self.opponent),
        ]
        .into_iter()
    }

    pub fn map<U>(self, mut f: impl FnMut(Side, T) -> U) -> Sides<U> {
        Sides {
            challenger: f(Side::Challenger, self.challenger),
            opponent: f(Side::Opponent, self.opponent),
        }
    }

    pub fn each_ref(&self) -> Sides<&T> {
        Sides {
            challenger: &self.challenger,
            opponent: &self.opponent,
        }
    }
}

impl<T: PartialEq> Sides<T> {
    /// Side holding `value`, challenger first.
    pub fn side_of(&self, value: &T) -> Option<Side> {
        if self.challenger == *value {
            Some(Side::Challenger)
        } else if self.opponent == *value {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.side_of(value).is_some()
    }
}
