/// Vote state machine
///
/// This module implements the tri-state vote bookkeeping for items as a pure
/// state machine. A voter is either in the liked set, in the disliked set, or
/// in neither; the three actions (like, dislike, clear) move the voter between
/// those states.
///
/// # State Machine
///
/// ```text
///               like                dislike
/// neither ────────────► liked ────────────► disliked
///    ▲                    │                    │
///    │       clear        │       clear        │
///    └────────────────────┴────────────────────┘
///
/// like on liked        → no-op
/// dislike on disliked  → no-op
/// clear on neither     → no-op
/// dislike on liked     → leave liked, then enter disliked (two steps)
/// like on disliked     → leave disliked, then enter liked
/// ```
///
/// # Invariants
///
/// After every transition:
/// - a voter is never in both sets at once
/// - `likes == users_liked.len()` and `dislikes == users_disliked.len()`
/// - counters never go below zero (they are derived from set cardinality,
///   never adjusted independently)
///
/// The machine is pure: it computes the next tally from the current one and
/// performs no I/O. Persistence and atomicity are the caller's concern (see
/// `Item::apply_vote`, which runs a transition inside a row-locking
/// transaction).
///
/// # Example
///
/// ```
/// use piquant_shared::vote::{apply, VoteAction, VoteTally};
/// use uuid::Uuid;
///
/// let voter = Uuid::new_v4();
/// let tally = VoteTally::default();
///
/// let tally = apply(tally, voter, VoteAction::Like);
/// assert_eq!(tally.likes(), 1);
///
/// // A dislike after a like moves the voter between sets.
/// let tally = apply(tally, voter, VoteAction::Dislike);
/// assert_eq!(tally.likes(), 0);
/// assert_eq!(tally.dislikes(), 1);
///
/// // Clearing removes the voter entirely.
/// let tally = apply(tally, voter, VoteAction::Clear);
/// assert_eq!(tally.dislikes(), 0);
/// ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Error type for vote action parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid vote action {0}: expected 1 (like), -1 (dislike) or 0 (clear)")]
pub struct InvalidVoteAction(pub i64);

/// A voter's requested action on an item
///
/// On the wire this is an integer: `1` likes, `-1` dislikes, `0` clears a
/// previously cast vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    /// Cast (or keep) a like
    Like,

    /// Cast (or keep) a dislike
    Dislike,

    /// Withdraw any previously cast vote
    Clear,
}

impl VoteAction {
    /// Integer wire representation of the action
    pub fn as_i64(&self) -> i64 {
        match self {
            VoteAction::Like => 1,
            VoteAction::Dislike => -1,
            VoteAction::Clear => 0,
        }
    }
}

impl TryFrom<i64> for VoteAction {
    type Error = InvalidVoteAction;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteAction::Like),
            -1 => Ok(VoteAction::Dislike),
            0 => Ok(VoteAction::Clear),
            other => Err(InvalidVoteAction(other)),
        }
    }
}

impl Serialize for VoteAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for VoteAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        VoteAction::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// The vote state of a single item: who liked it and who disliked it
///
/// Counters are not stored here; they are derived from set cardinality via
/// [`VoteTally::likes`] and [`VoteTally::dislikes`], which makes the counter
/// invariants structural rather than maintained by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    /// Voters currently holding a like
    pub users_liked: Vec<Uuid>,

    /// Voters currently holding a dislike
    pub users_disliked: Vec<Uuid>,
}

impl VoteTally {
    /// Builds a tally from the two persisted membership sets
    pub fn new(users_liked: Vec<Uuid>, users_disliked: Vec<Uuid>) -> Self {
        Self {
            users_liked,
            users_disliked,
        }
    }

    /// Number of likes, always equal to the liked-set cardinality
    pub fn likes(&self) -> i32 {
        self.users_liked.len() as i32
    }

    /// Number of dislikes, always equal to the disliked-set cardinality
    pub fn dislikes(&self) -> i32 {
        self.users_disliked.len() as i32
    }

    /// Whether `voter` currently holds a like
    pub fn has_liked(&self, voter: Uuid) -> bool {
        self.users_liked.contains(&voter)
    }

    /// Whether `voter` currently holds a dislike
    pub fn has_disliked(&self, voter: Uuid) -> bool {
        self.users_disliked.contains(&voter)
    }

    /// Checks the disjointness invariant: no voter in both sets
    pub fn is_disjoint(&self) -> bool {
        !self
            .users_liked
            .iter()
            .any(|id| self.users_disliked.contains(id))
    }
}

/// Applies one vote action for one voter and returns the next tally
///
/// Transition rules:
///
/// | current state | like | dislike | clear |
/// |---|---|---|---|
/// | in neither | join liked | join disliked | no-op |
/// | in liked | no-op | leave liked, join disliked | leave liked |
/// | in disliked | leave disliked, join liked | no-op | leave disliked |
///
/// A voter never ends up in both sets: joining one set always first removes
/// the voter from the other. Clear when the voter is in neither set is an
/// explicit no-op rather than a blind removal from an assumed set.
pub fn apply(mut tally: VoteTally, voter: Uuid, action: VoteAction) -> VoteTally {
    match action {
        VoteAction::Like => {
            if !tally.has_liked(voter) {
                tally.users_disliked.retain(|id| *id != voter);
                tally.users_liked.push(voter);
            }
        }
        VoteAction::Dislike => {
            if !tally.has_disliked(voter) {
                tally.users_liked.retain(|id| *id != voter);
                tally.users_disliked.push(voter);
            }
        }
        VoteAction::Clear => {
            tally.users_liked.retain(|id| *id != voter);
            tally.users_disliked.retain(|id| *id != voter);
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally_of(liked: &[Uuid], disliked: &[Uuid]) -> VoteTally {
        VoteTally::new(liked.to_vec(), disliked.to_vec())
    }

    #[test]
    fn test_action_wire_values() {
        assert_eq!(VoteAction::try_from(1), Ok(VoteAction::Like));
        assert_eq!(VoteAction::try_from(-1), Ok(VoteAction::Dislike));
        assert_eq!(VoteAction::try_from(0), Ok(VoteAction::Clear));
        assert_eq!(VoteAction::try_from(2), Err(InvalidVoteAction(2)));
        assert_eq!(VoteAction::try_from(-2), Err(InvalidVoteAction(-2)));
    }

    #[test]
    fn test_like_from_neither() {
        let voter = Uuid::new_v4();
        let tally = apply(VoteTally::default(), voter, VoteAction::Like);

        assert_eq!(tally.likes(), 1);
        assert_eq!(tally.dislikes(), 0);
        assert!(tally.has_liked(voter));
        assert!(tally.is_disjoint());
    }

    #[test]
    fn test_dislike_from_neither() {
        let voter = Uuid::new_v4();
        let tally = apply(VoteTally::default(), voter, VoteAction::Dislike);

        assert_eq!(tally.likes(), 0);
        assert_eq!(tally.dislikes(), 1);
        assert!(tally.has_disliked(voter));
        assert!(tally.is_disjoint());
    }

    #[test]
    fn test_like_when_already_liked_is_noop() {
        let voter = Uuid::new_v4();
        let before = tally_of(&[voter], &[]);
        let after = apply(before.clone(), voter, VoteAction::Like);

        assert_eq!(after, before);
    }

    #[test]
    fn test_dislike_when_already_disliked_is_noop() {
        let voter = Uuid::new_v4();
        let before = tally_of(&[], &[voter]);
        let after = apply(before.clone(), voter, VoteAction::Dislike);

        assert_eq!(after, before);
    }

    #[test]
    fn test_dislike_after_like_moves_voter() {
        let voter = Uuid::new_v4();
        let other = Uuid::new_v4();
        let before = tally_of(&[voter, other], &[]);

        let after = apply(before, voter, VoteAction::Dislike);

        assert!(!after.has_liked(voter));
        assert!(after.has_disliked(voter));
        assert!(after.has_liked(other));
        assert_eq!(after.likes(), 1);
        assert_eq!(after.dislikes(), 1);
        assert!(after.is_disjoint());
    }

    #[test]
    fn test_like_after_dislike_moves_voter() {
        let voter = Uuid::new_v4();
        let before = tally_of(&[], &[voter]);

        let after = apply(before, voter, VoteAction::Like);

        assert!(after.has_liked(voter));
        assert!(!after.has_disliked(voter));
        assert_eq!(after.likes(), 1);
        assert_eq!(after.dislikes(), 0);
    }

    #[test]
    fn test_clear_removes_like() {
        let voter = Uuid::new_v4();
        let before = tally_of(&[voter], &[]);

        let after = apply(before, voter, VoteAction::Clear);

        assert_eq!(after.likes(), 0);
        assert_eq!(after.dislikes(), 0);
        assert!(!after.has_liked(voter));
    }

    #[test]
    fn test_clear_removes_dislike() {
        let voter = Uuid::new_v4();
        let before = tally_of(&[], &[voter]);

        let after = apply(before, voter, VoteAction::Clear);

        assert_eq!(after.dislikes(), 0);
        assert!(!after.has_disliked(voter));
    }

    #[test]
    fn test_clear_when_in_neither_is_noop() {
        let voter = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        let before = tally_of(&[bystander], &[]);

        let after = apply(before.clone(), voter, VoteAction::Clear);

        assert_eq!(after, before);
    }

    #[test]
    fn test_like_then_clear_restores_original_state() {
        let voter = Uuid::new_v4();
        let others = tally_of(&[Uuid::new_v4()], &[Uuid::new_v4()]);

        let after = apply(others.clone(), voter, VoteAction::Like);
        let after = apply(after, voter, VoteAction::Clear);

        assert_eq!(after, others);
    }

    #[test]
    fn test_like_then_dislike_counts() {
        let voter = Uuid::new_v4();
        let before = tally_of(&[Uuid::new_v4()], &[]);
        let likes_before = before.likes();
        let dislikes_before = before.dislikes();

        let after = apply(before, voter, VoteAction::Like);
        let after = apply(after, voter, VoteAction::Dislike);

        assert_eq!(after.likes(), likes_before);
        assert_eq!(after.dislikes(), dislikes_before + 1);
        assert!(after.has_disliked(voter));
        assert!(!after.has_liked(voter));
    }

    #[test]
    fn test_disjointness_holds_across_action_sequences() {
        let voters: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let actions = [
            VoteAction::Like,
            VoteAction::Dislike,
            VoteAction::Like,
            VoteAction::Clear,
            VoteAction::Dislike,
            VoteAction::Dislike,
            VoteAction::Clear,
            VoteAction::Like,
        ];

        let mut tally = VoteTally::default();
        for (i, action) in actions.iter().enumerate() {
            tally = apply(tally, voters[i % voters.len()], *action);
            assert!(tally.is_disjoint());
            assert!(tally.likes() >= 0);
            assert!(tally.dislikes() >= 0);
        }
    }

    #[test]
    fn test_counters_track_set_cardinality() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let tally = apply(VoteTally::default(), a, VoteAction::Like);
        let tally = apply(tally, b, VoteAction::Dislike);

        assert_eq!(tally.likes() as usize, tally.users_liked.len());
        assert_eq!(tally.dislikes() as usize, tally.users_disliked.len());
    }

    #[test]
    fn test_action_serde_roundtrip() {
        for action in [VoteAction::Like, VoteAction::Dislike, VoteAction::Clear] {
            let json = serde_json::to_string(&action).unwrap();
            let parsed: VoteAction = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, action);
        }

        assert!(serde_json::from_str::<VoteAction>("3").is_err());
    }
}
