//! Entity kinds and the cyclic dominance rule between them

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Rock,
    Paper,
    Scissor,
}

impl Kind {
    /// All kinds in table order
    pub const ALL: [Kind; 3] = [Kind::Rock, Kind::Paper, Kind::Scissor];
    pub const COUNT: usize = 3;

    /// Position of this kind in enum-indexed tables
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Kind::Rock => 0,
            Kind::Paper => 1,
            Kind::Scissor => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Rock => "rock",
            Kind::Paper => "paper",
            Kind::Scissor => "scissor",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("{0} cannot defeat itself")]
    SelfDefeat(Kind),
    #[error("{0} is defeated by more than one kind")]
    NotBijective(Kind),
    #[error("dominance table does not form a 3-cycle starting at {0}")]
    NotCyclic(Kind),
}

/// Total kind -> kind-it-defeats mapping, validated on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionRule {
    beats: [Kind; Kind::COUNT],
    beaten_by: [Kind; Kind::COUNT],
}

impl InteractionRule {
    /// Rock beats Scissor, Paper beats Rock, Scissor beats Paper
    pub const fn classic() -> Self {
        Self {
            beats: [Kind::Scissor, Kind::Rock, Kind::Paper],
            beaten_by: [Kind::Paper, Kind::Scissor, Kind::Rock],
        }
    }

    /// Build a rule from a table where `beats[k.index()]` is the kind `k` defeats
    pub fn new(beats: [Kind; Kind::COUNT]) -> Result<Self, RuleError> {
        let mut beaten_by: [Option<Kind>; Kind::COUNT] = [None; Kind::COUNT];

        for kind in Kind::ALL {
            let prey = beats[kind.index()];
            if prey == kind {
                return Err(RuleError::SelfDefeat(kind));
            }
            if beaten_by[prey.index()].replace(kind).is_some() {
                return Err(RuleError::NotBijective(prey));
            }
        }

        let mut resolved = beats;
        for kind in Kind::ALL {
            match beaten_by[kind.index()] {
                Some(predator) => resolved[kind.index()] = predator,
                None => return Err(RuleError::NotBijective(kind)),
            }
        }

        let rule = Self {
            beats,
            beaten_by: resolved,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Check totality and cyclic structure of both lookup directions
    pub fn validate(&self) -> Result<(), RuleError> {
        for kind in Kind::ALL {
            let once = self.prey_of(kind);
            if once == kind {
                return Err(RuleError::SelfDefeat(kind));
            }
            if self.predator_of(once) != kind {
                return Err(RuleError::NotBijective(once));
            }
            // Three applications walk the whole cycle and return to the start
            let twice = self.prey_of(once);
            if twice == kind || self.prey_of(twice) != kind {
                return Err(RuleError::NotCyclic(kind));
            }
        }
        Ok(())
    }

    /// The kind that `kind` defeats
    #[inline]
    pub fn prey_of(&self, kind: Kind) -> Kind {
        self.beats[kind.index()]
    }

    /// The kind that defeats `kind`
    #[inline]
    pub fn predator_of(&self, kind: Kind) -> Kind {
        self.beaten_by[kind.index()]
    }

    #[inline]
    pub fn defeats(&self, attacker: Kind, defender: Kind) -> bool {
        self.prey_of(attacker) == defender
    }
}

impl Default for InteractionRule {
    fn default() -> Self {
        Self::classic()
    }
}
