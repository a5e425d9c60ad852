use serde::{Deserialize, Serialize};

/// The four fixed arena teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Black,
    Green,
    Purple,
}

impl Team {
    pub const ALL: [Team; 4] = [Team::Red, Team::Black, Team::Green, Team::Purple];

    /// Presentation color for the team, synchronized with the client palette.
    pub fn color(&self) -> TeamColor {
        match self {
            Team::Red => TeamColor {
                r: 0x8B,
                g: 0x00,
                b: 0x00,
            },
            Team::Black => TeamColor {
                r: 0x00,
                g: 0x33,
                b: 0x00,
            },
            Team::Green => TeamColor {
                r: 0x1B,
                g: 0x2F,
                b: 0x2F,
            },
            Team::Purple => TeamColor {
                r: 0x55,
                g: 0x00,
                b: 0x55,
            },
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Team::Red => "red",
            Team::Black => "black",
            Team::Green => "green",
            Team::Purple => "purple",
        };
        write!(f, "{name}")
    }
}

/// RGB presentation color, derived from a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Color used for sessions that have not picked a team.
pub const UNAFFILIATED_COLOR: TeamColor = TeamColor {
    r: 0x2C,
    g: 0x3E,
    b: 0x50,
};

/// Presentation color for a session's team choice.
pub fn color_for(team: Option<Team>) -> TeamColor {
    team.map(|t| t.color()).unwrap_or(UNAFFILIATED_COLOR)
}

/// Per-team member counts, broadcast on membership or team changes.
pub type TeamCounts = TeamTally;

/// Per-team integer counter. Used both for kill tallies and member counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamTally {
    pub red: u32,
    pub black: u32,
    pub green: u32,
    pub purple: u32,
}

impl TeamTally {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Black => self.black,
            Team::Green => self.green,
            Team::Purple => self.purple,
        }
    }

    pub fn increment(&mut self, team: Team) {
        let slot = match team {
            Team::Red => &mut self.red,
            Team::Black => &mut self.black,
            Team::Green => &mut self.green,
            Team::Purple => &mut self.purple,
        };
        *slot = slot.saturating_add(1);
    }
}
