/// Results aggregation over the raw vote list returned by the store.
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::{Phase, VoteRecord};

/// Aggregate result for one idea across all submissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaTally {
    pub id: u32,
    pub title: String,
    pub phase: Phase,
    pub total_stars: u32,
    /// Distinct voter names in first-seen order.
    pub voters: Vec<String>,
}

impl IdeaTally {
    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }
}

/// Sum stars per idea and collect distinct voters, ranked by total stars
/// descending. Ties keep the order in which ideas first appeared.
pub fn tally(records: &[VoteRecord]) -> Vec<IdeaTally> {
    let mut tallies: Vec<IdeaTally> = Vec::new();
    let mut by_id: HashMap<u32, usize> = HashMap::new();
    let mut seen_voters: HashMap<u32, HashSet<&str>> = HashMap::new();

    for record in records {
        for selection in &record.selections {
            let pos = *by_id.entry(selection.id).or_insert_with(|| {
                tallies.push(IdeaTally {
                    id: selection.id,
                    title: selection.title.clone(),
                    phase: selection.phase,
                    total_stars: 0,
                    voters: Vec::new(),
                });
                tallies.len() - 1
            });

            let entry = &mut tallies[pos];
            entry.total_stars = entry.total_stars.saturating_add(selection.votes);
            if seen_voters
                .entry(selection.id)
                .or_default()
                .insert(record.voter.as_str())
            {
                entry.voters.push(record.voter.clone());
            }
        }
    }

    // sort_by is stable
    tallies.sort_by(|a, b| b.total_stars.cmp(&a.total_stars));
    tallies
}

/// Ranking split per phase, each keeping the overall ranking order.
pub fn tally_by_phase(records: &[VoteRecord]) -> Vec<(Phase, Vec<IdeaTally>)> {
    let ranked = tally(records);
    Phase::ALL
        .iter()
        .map(|&phase| {
            let ideas = ranked.iter().filter(|t| t.phase == phase).cloned().collect();
            (phase, ideas)
        })
        .collect()
}

/// Distinct voter names in submission order.
pub fn voter_names(records: &[VoteRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();
    for record in records {
        if seen.insert(record.voter.as_str()) {
            names.push(record.voter.clone());
        }
    }
    names
}
