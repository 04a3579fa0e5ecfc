//! The per-round vote ledger.

use partyroom_protocol::PlayerId;

/// Voter → target for the current round, in first-vote order.
///
/// A voter has at most one target. Voting again replaces the target but
/// keeps the voter's original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteLedger {
    entries: Vec<(PlayerId, PlayerId)>,
}

impl VoteLedger {
    pub fn cast(&mut self, voter: PlayerId, target: PlayerId) {
        match self.entries.iter_mut().find(|(v, _)| *v == voter) {
            Some(entry) => entry.1 = target,
            None => self.entries.push((voter, target)),
        }
    }

    /// Drops votes from voters `keep` rejects.
    pub fn retain_voters(&mut self, mut keep: impl FnMut(PlayerId) -> bool) {
        self.entries.retain(|(voter, _)| keep(*voter));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn target_of(&self, voter: PlayerId) -> Option<PlayerId> {
        self.entries
            .iter()
            .find(|(v, _)| *v == voter)
            .map(|(_, t)| *t)
    }

    /// The most-voted target.
    ///
    /// Ties go to the target that first appears in the ledger. `None` only
    /// when no votes were cast.
    pub fn leader(&self) -> Option<PlayerId> {
        let mut counts: Vec<(PlayerId, usize)> = Vec::new();
        for (_, target) in &self.entries {
            match counts.iter_mut().find(|(t, _)| t == target) {
                Some(slot) => slot.1 += 1,
                None => counts.push((*target, 1)),
            }
        }

        let mut best: Option<(PlayerId, usize)> = None;
        for (target, count) in counts {
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((target, count));
            }
        }
        best.map(|(target, _)| target)
    }
}
