//! "Survivor" triage deck: the user walks a looping queue of ideas and cuts,
//! keeps, or loves each one until only favorites remain.
//!
//! The active queue is every idea not cut, in deck order. Cutting removes
//! the current idea from the queue, so the next idea slides under the
//! pointer; cutting the last idea of the queue wraps the pointer to 0.
//! Keep and love advance the pointer cyclically.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::catalog::IdeaCatalog;
use crate::types::{Idea, Phase};

pub const DEFAULT_GOAL: u32 = 3;
pub const MIN_GOAL: u32 = 1;
pub const MAX_GOAL: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageStatus {
    Candidate,
    Cut,
    Loved,
}

impl TriageStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, TriageStatus::Cut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageAction {
    Cut,
    Keep,
    Love,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageMode {
    Setup,
    Swiping,
}

/// Deck ordering, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckOrder {
    Catalog,
    Shuffled { seed: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriageError {
    #[error("Idea {given} is not the current card (current: {current:?})")]
    NotCurrent { given: u32, current: Option<u32> },

    #[error("Every idea has been cut")]
    DeckCleared,

    #[error("Triage has not started")]
    NotSwiping,
}

#[derive(Debug, Clone)]
pub struct TriageSession {
    catalog: IdeaCatalog,
    order: Vec<u32>,
    seed: Option<u64>,
    statuses: HashMap<u32, TriageStatus>,
    goals: BTreeMap<Phase, u32>,
    pointer: usize,
    mode: TriageMode,
}

impl TriageSession {
    pub fn new(catalog: IdeaCatalog, order: DeckOrder) -> Self {
        let mut ids: Vec<u32> = catalog.ideas().iter().map(|idea| idea.id).collect();
        let seed = match order {
            DeckOrder::Catalog => None,
            DeckOrder::Shuffled { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                ids.shuffle(&mut rng);
                Some(seed)
            }
        };
        let statuses = ids.iter().map(|&id| (id, TriageStatus::Candidate)).collect();
        let goals = Phase::ALL.iter().map(|&p| (p, DEFAULT_GOAL)).collect();

        Self {
            catalog,
            order: ids,
            seed,
            statuses,
            goals,
            pointer: 0,
            mode: TriageMode::Setup,
        }
    }

    /// Shuffle seed of this session, if the deck was shuffled.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn mode(&self) -> TriageMode {
        self.mode
    }

    /// Leave setup and start from the top of the queue.
    pub fn start(&mut self) {
        self.pointer = 0;
        self.mode = TriageMode::Swiping;
    }

    /// Back to goal setup. Statuses are kept.
    pub fn open_setup(&mut self) {
        self.mode = TriageMode::Setup;
    }

    pub fn goal(&self, phase: Phase) -> u32 {
        self.goals.get(&phase).copied().unwrap_or(DEFAULT_GOAL)
    }

    pub fn set_goal(&mut self, phase: Phase, goal: u32) {
        self.goals.insert(phase, goal.clamp(MIN_GOAL, MAX_GOAL));
    }

    pub fn status(&self, idea_id: u32) -> Option<TriageStatus> {
        self.statuses.get(&idea_id).copied()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Ids of ideas still in play, in deck order.
    pub fn active_queue(&self) -> Vec<u32> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.status(*id).is_some_and(|s| s.is_active()))
            .collect()
    }

    pub fn current(&self) -> Option<&Idea> {
        self.active_queue()
            .get(self.pointer)
            .and_then(|&id| self.catalog.get(id))
    }

    pub fn is_cleared(&self) -> bool {
        self.active_queue().is_empty()
    }

    fn check_current(&self, idea_id: u32) -> Result<usize, TriageError> {
        if self.mode != TriageMode::Swiping {
            return Err(TriageError::NotSwiping);
        }
        let queue = self.active_queue();
        if queue.is_empty() {
            return Err(TriageError::DeckCleared);
        }
        let current = queue.get(self.pointer).copied();
        if current != Some(idea_id) {
            return Err(TriageError::NotCurrent {
                given: idea_id,
                current,
            });
        }
        Ok(queue.len())
    }

    pub fn apply(&mut self, action: TriageAction, idea_id: u32) -> Result<(), TriageError> {
        match action {
            TriageAction::Cut => self.cut(idea_id),
            TriageAction::Keep => self.keep(idea_id),
            TriageAction::Love => self.love(idea_id),
        }
    }

    /// Remove the current idea for good.
    pub fn cut(&mut self, idea_id: u32) -> Result<(), TriageError> {
        let len = self.check_current(idea_id)?;
        let was_last = self.pointer + 1 >= len;
        self.statuses.insert(idea_id, TriageStatus::Cut);
        if was_last {
            self.pointer = 0;
        }
        log::debug!(target: "ideavote.triage", "Cut idea {}", idea_id);
        Ok(())
    }

    /// Mark the current idea as a favorite and move on.
    pub fn love(&mut self, idea_id: u32) -> Result<(), TriageError> {
        self.check_current(idea_id)?;
        self.statuses.insert(idea_id, TriageStatus::Loved);
        self.advance();
        Ok(())
    }

    /// Leave the current idea undecided and move on.
    pub fn keep(&mut self, idea_id: u32) -> Result<(), TriageError> {
        self.check_current(idea_id)?;
        self.advance();
        Ok(())
    }

    /// Step to the next active idea, looping back to the start.
    pub fn advance(&mut self) {
        let len = self.active_queue().len();
        if len == 0 || self.pointer + 1 >= len {
            self.pointer = 0;
        } else {
            self.pointer += 1;
        }
    }

    /// Active ideas (candidate or loved) in a phase.
    pub fn phase_count(&self, phase: Phase) -> u32 {
        self.catalog
            .in_phase(phase)
            .filter(|idea| self.status(idea.id).is_some_and(|s| s.is_active()))
            .count() as u32
    }

    /// How many more ideas of `phase` must be cut to reach its goal.
    pub fn distance_to_goal(&self, phase: Phase) -> u32 {
        self.phase_count(phase).saturating_sub(self.goal(phase))
    }

    pub fn is_goal_met(&self, phase: Phase) -> bool {
        self.distance_to_goal(phase) == 0
    }

    /// Markdown report of every idea not cut, grouped by phase in catalog
    /// order. Loved ideas carry a heart.
    pub fn export_markdown(&self) -> String {
        let mut text = String::from("# Remaining Ideas\n\n");
        for phase in Phase::ALL {
            let remaining: Vec<&Idea> = self
                .catalog
                .in_phase(phase)
                .filter(|idea| self.status(idea.id).is_some_and(|s| s.is_active()))
                .collect();
            if remaining.is_empty() {
                continue;
            }
            text.push_str(&format!("## {} ({})\n\n", phase, remaining.len()));
            for idea in remaining {
                let heart = if self.status(idea.id) == Some(TriageStatus::Loved) {
                    "\u{2764}\u{fe0f} "
                } else {
                    ""
                };
                text.push_str(&format!("### {}{}\n", heart, idea.title));
                if let Some(purpose) = &idea.purpose {
                    text.push_str(&format!("- **Purpose**: {}\n", purpose));
                }
                if let Some(how) = &idea.how_it_works {
                    text.push_str(&format!("- **How It Works**: {}\n", how));
                }
                text.push('\n');
            }
        }
        text
    }
}
