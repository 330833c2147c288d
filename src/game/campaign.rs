//! Level sequencing across a whole duel

use tracing::info;

use crate::level::LevelError;

use super::combatant::KillRecord;
use super::events::GameEvent;
use super::r#match::{MatchController, MatchPhase, MatchSetup};
use super::InputCommand;

/// Errors raised while building or advancing a campaign
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Campaign has no levels")]
    NoLevels,

    #[error("Expected {expected} levels, found {found}")]
    LevelCount { expected: usize, found: usize },

    #[error("Level {index} failed to load: {source}")]
    Level {
        index: usize,
        #[source]
        source: LevelError,
    },
}

/// In-process campaign configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Base seed; each level uses `seed + index`
    pub seed: u64,
    pub viewport_width: f32,
    pub level_count: usize,
    pub start_index: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            seed: 354668,
            viewport_width: 800.0,
            level_count: 7,
            start_index: 3,
        }
    }
}

/// How a level is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTransition {
    NextLevel(usize),
    /// First and last levels: the attacker faces the boss alone
    BossSequence(usize),
}

impl LevelTransition {
    pub fn for_index(index: usize, level_count: usize) -> Self {
        if index == 0 || index + 1 == level_count {
            LevelTransition::BossSequence(index)
        } else {
            LevelTransition::NextLevel(index)
        }
    }

    pub fn index(self) -> usize {
        match self {
            LevelTransition::NextLevel(i) | LevelTransition::BossSequence(i) => i,
        }
    }

    pub fn is_boss(self) -> bool {
        matches!(self, LevelTransition::BossSequence(_))
    }
}

/// Drives one level after another until the boss is beaten or wins
pub struct Campaign {
    settings: MatchSettings,
    levels: Vec<String>,
    current: MatchController,
    total_score: u32,
    levels_played: usize,
}

impl Campaign {
    pub fn new(levels: Vec<String>, settings: MatchSettings) -> Result<Self, CampaignError> {
        if levels.is_empty() {
            return Err(CampaignError::NoLevels);
        }
        if levels.len() != settings.level_count {
            return Err(CampaignError::LevelCount {
                expected: settings.level_count,
                found: levels.len(),
            });
        }

        let start = settings.start_index % levels.len();
        let current = Self::load(&levels, &settings, start, 0, false, [KillRecord::default(); 2])?;
        info!(level = start, levels = levels.len(), seed = settings.seed, "Campaign started");

        Ok(Self {
            settings,
            levels,
            current,
            total_score: 0,
            levels_played: 1,
        })
    }

    fn load(
        levels: &[String],
        settings: &MatchSettings,
        index: usize,
        attacker: usize,
        first_kill: bool,
        records: [KillRecord; 2],
    ) -> Result<MatchController, CampaignError> {
        let transition = LevelTransition::for_index(index, levels.len());
        let setup = MatchSetup {
            index,
            attacker,
            first_kill,
            boss_level: transition.is_boss(),
            viewport_width: settings.viewport_width,
            seed: settings.seed.wrapping_add(index as u64),
            records,
        };
        MatchController::new(&levels[index], setup).map_err(|source| CampaignError::Level { index, source })
    }

    pub fn current(&self) -> &MatchController {
        &self.current
    }

    /// Sum of every completed level's score
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn levels_played(&self) -> usize {
        self.levels_played
    }

    /// Victory or defeat reached
    pub fn is_finished(&self) -> bool {
        matches!(self.current.phase(), MatchPhase::Victory | MatchPhase::Defeat)
    }

    /// Level the attacker is sent to once the current one is done
    pub fn next_index(&self) -> usize {
        let step: i64 = if self.current.attacker() == 0 { 1 } else { -1 };
        (self.current.index() as i64 + step).rem_euclid(self.levels.len() as i64) as usize
    }

    /// Advance one tick. Fails only when the next level cannot be loaded.
    pub fn step(&mut self, inputs: &[InputCommand; 2], dt: f32) -> Result<Vec<GameEvent>, CampaignError> {
        if self.is_finished() {
            return Ok(Vec::new());
        }

        let events = self.current.step(inputs, dt);
        if self.current.phase() == MatchPhase::Completed {
            self.total_score += self.current.score();
            let next = self.next_index();
            let transition = LevelTransition::for_index(next, self.levels.len());
            info!(
                from = self.current.index(),
                to = next,
                boss = transition.is_boss(),
                attacker = self.current.attacker(),
                "Level transition"
            );
            self.current = Self::load(
                &self.levels,
                &self.settings,
                transition.index(),
                self.current.attacker(),
                self.current.first_kill(),
                self.current.kill_records(),
            )?;
            self.levels_played += 1;
        }

        Ok(events)
    }
}
