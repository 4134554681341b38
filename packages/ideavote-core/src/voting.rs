//! Star-allocation voting session.
//!
//! Each phase owns a bank of [`STARS_PER_PHASE`] star tokens, created the
//! first time the phase becomes active and never replenished afterwards.
//! A star is either in its phase's bank or bound to one idea of that phase,
//! so `available + spent == STARS_PER_PHASE` holds for every entered phase.
//! An idea holds at most [`MAX_VOTES_PER_CARD`] stars. A phase can only be
//! left forward once its whole bank is spent.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::catalog::IdeaCatalog;
use crate::persistence::SubmitVote;
use crate::types::{Phase, Selection};

pub const STARS_PER_PHASE: u32 = 5;
pub const MAX_VOTES_PER_CARD: u32 = 2;

/// One unit of voting budget. Tokens are minted from a per-session counter
/// and never reused, so a spent token can not be allocated twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StarToken(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VotingError {
    #[error("Unknown idea {0}")]
    UnknownIdea(u32),

    #[error("Idea {idea_id} belongs to {phase}, active phase is {active}")]
    WrongPhase {
        idea_id: u32,
        phase: Phase,
        active: Phase,
    },

    #[error("Idea {idea_id} already has the maximum of {cap} stars")]
    CapReached { idea_id: u32, cap: u32 },

    #[error("Star {0:?} is not in the active phase's bank")]
    TokenNotInBank(StarToken),

    #[error("Idea {0} has no stars to return")]
    NoVotes(u32),

    #[error("{phase} has {spent} of {required} stars placed")]
    PhaseIncomplete {
        phase: Phase,
        spent: u32,
        required: u32,
    },

    #[error("Already at the last phase")]
    NoNextPhase,

    #[error("Already at the first phase")]
    NoPreviousPhase,

    #[error("Not every phase has spent its stars")]
    Incomplete,

    #[error("A submission is already in flight")]
    SubmitInFlight,
}

/// Where the final submission stands. `InFlight` is the window in which the
/// submit control stays disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    InFlight,
    Submitted,
    Failed(String),
}

/// Voting state for one browser session. Created on session start and
/// discarded on reload.
#[derive(Debug, Clone)]
pub struct VotingSession {
    catalog: IdeaCatalog,
    active: Phase,
    /// Lazily created per phase; key present == phase has been entered.
    banks: BTreeMap<Phase, Vec<StarToken>>,
    votes: HashMap<u32, u32>,
    next_token: u32,
    submit_state: SubmitState,
}

impl VotingSession {
    /// Start a session in the first phase with a fresh bank.
    pub fn new(catalog: IdeaCatalog) -> Self {
        let mut session = Self {
            catalog,
            active: Phase::Planning,
            banks: BTreeMap::new(),
            votes: HashMap::new(),
            next_token: 0,
            submit_state: SubmitState::Idle,
        };
        session.enter(Phase::Planning);
        session
    }

    pub fn catalog(&self) -> &IdeaCatalog {
        &self.catalog
    }

    pub fn active_phase(&self) -> Phase {
        self.active
    }

    fn mint(&mut self) -> StarToken {
        let token = StarToken(self.next_token);
        self.next_token += 1;
        token
    }

    /// Create the bank on first entry only.
    fn enter(&mut self, phase: Phase) {
        if self.banks.contains_key(&phase) {
            return;
        }
        let tokens = (0..STARS_PER_PHASE).map(|_| self.mint()).collect();
        self.banks.insert(phase, tokens);
        log::debug!(target: "ideavote.voting", "Entered {} with a fresh bank", phase);
    }

    /// Tokens currently sitting in a phase's bank. None if the phase was
    /// never entered.
    pub fn bank(&self, phase: Phase) -> Option<&[StarToken]> {
        self.banks.get(&phase).map(Vec::as_slice)
    }

    pub fn available(&self, phase: Phase) -> u32 {
        self.bank(phase).map_or(0, |b| b.len() as u32)
    }

    pub fn votes_for(&self, idea_id: u32) -> u32 {
        self.votes.get(&idea_id).copied().unwrap_or(0)
    }

    /// Stars bound to ideas of `phase`.
    pub fn spent(&self, phase: Phase) -> u32 {
        self.catalog
            .in_phase(phase)
            .map(|idea| self.votes_for(idea.id))
            .sum()
    }

    fn active_idea_phase(&self, idea_id: u32) -> Result<(), VotingError> {
        let idea = self
            .catalog
            .get(idea_id)
            .ok_or(VotingError::UnknownIdea(idea_id))?;
        if idea.phase != self.active {
            return Err(VotingError::WrongPhase {
                idea_id,
                phase: idea.phase,
                active: self.active,
            });
        }
        Ok(())
    }

    /// Bind a star from the active bank to an idea of the active phase.
    pub fn allocate(&mut self, idea_id: u32, token: StarToken) -> Result<(), VotingError> {
        self.active_idea_phase(idea_id)?;

        let count = self.votes_for(idea_id);
        if count >= MAX_VOTES_PER_CARD {
            return Err(VotingError::CapReached {
                idea_id,
                cap: MAX_VOTES_PER_CARD,
            });
        }

        let bank = self
            .banks
            .get_mut(&self.active)
            .ok_or(VotingError::TokenNotInBank(token))?;
        let pos = bank
            .iter()
            .position(|t| *t == token)
            .ok_or(VotingError::TokenNotInBank(token))?;
        bank.remove(pos);

        self.votes.insert(idea_id, count + 1);
        Ok(())
    }

    /// Unbind one star from an idea; a fresh token goes back to the active
    /// bank and is returned.
    pub fn deallocate(&mut self, idea_id: u32) -> Result<StarToken, VotingError> {
        self.active_idea_phase(idea_id)?;

        let count = self.votes_for(idea_id);
        if count == 0 {
            return Err(VotingError::NoVotes(idea_id));
        }
        if count == 1 {
            self.votes.remove(&idea_id);
        } else {
            self.votes.insert(idea_id, count - 1);
        }

        let token = self.mint();
        self.banks.entry(self.active).or_default().push(token);
        Ok(token)
    }

    /// True iff exactly the whole bank of `phase` is placed on its ideas.
    pub fn can_advance(&self, phase: Phase) -> bool {
        self.spent(phase) == STARS_PER_PHASE
    }

    /// Move to the next phase, gated on the active phase being fully spent.
    pub fn advance(&mut self) -> Result<Phase, VotingError> {
        if !self.can_advance(self.active) {
            return Err(VotingError::PhaseIncomplete {
                phase: self.active,
                spent: self.spent(self.active),
                required: STARS_PER_PHASE,
            });
        }
        let next = self.active.next().ok_or(VotingError::NoNextPhase)?;
        self.active = next;
        self.enter(next);
        Ok(next)
    }

    /// Step back to the previous phase; its bank and allocations are kept
    /// exactly as left.
    pub fn go_back(&mut self) -> Result<Phase, VotingError> {
        let previous = self.active.previous().ok_or(VotingError::NoPreviousPhase)?;
        self.active = previous;
        Ok(previous)
    }

    /// Pick the drop target for a star released over `overlapping` idea
    /// cards. Only ideas of the active phase are eligible; when several
    /// overlap, the smallest idea id wins. None means the star stays in the
    /// bank.
    pub fn resolve_drop(&self, overlapping: &[u32]) -> Option<u32> {
        overlapping
            .iter()
            .copied()
            .filter(|id| {
                self.catalog
                    .get(*id)
                    .is_some_and(|idea| idea.phase == self.active)
            })
            .min()
    }

    /// Resolve a drop and allocate. Ok(None) is a no-op drop.
    pub fn deposit(
        &mut self,
        token: StarToken,
        overlapping: &[u32],
    ) -> Result<Option<u32>, VotingError> {
        match self.resolve_drop(overlapping) {
            Some(idea_id) => {
                self.allocate(idea_id, token)?;
                Ok(Some(idea_id))
            }
            None => Ok(None),
        }
    }

    pub fn is_complete(&self) -> bool {
        Phase::ALL.iter().all(|&phase| self.can_advance(phase))
    }

    /// Ideas with at least one star, in phase order then catalog order.
    pub fn selections(&self) -> Vec<Selection> {
        Phase::ALL
            .iter()
            .flat_map(|&phase| self.catalog.in_phase(phase))
            .filter_map(|idea| {
                let votes = self.votes_for(idea.id);
                (votes > 0).then(|| Selection {
                    id: idea.id,
                    title: idea.title.clone(),
                    phase: idea.phase,
                    votes,
                })
            })
            .collect()
    }

    /// Request body for the final submission; only once every phase is done.
    pub fn submission(
        &self,
        voter: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<SubmitVote, VotingError> {
        if !self.is_complete() {
            return Err(VotingError::Incomplete);
        }
        Ok(SubmitVote::new(voter, timestamp, self.selections()))
    }

    pub fn submit_state(&self) -> &SubmitState {
        &self.submit_state
    }

    /// Build the submission and mark it in flight. Rejected while a previous
    /// submission has not finished.
    pub fn begin_submit(
        &mut self,
        voter: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<SubmitVote, VotingError> {
        if self.submit_state == SubmitState::InFlight {
            return Err(VotingError::SubmitInFlight);
        }
        let payload = self.submission(voter, timestamp)?;
        self.submit_state = SubmitState::InFlight;
        Ok(payload)
    }

    pub fn finish_submit(&mut self, outcome: Result<(), String>) {
        self.submit_state = match outcome {
            Ok(()) => SubmitState::Submitted,
            Err(message) => {
                log::warn!(target: "ideavote.voting", "Submission failed: {}", message);
                SubmitState::Failed(message)
            }
        };
    }
}
