use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

pub type Participant = String;

pub type Assignments = BTreeMap<Participant, Participant>;

// Shuffles tried before falling back to a cyclic shift.
pub const MAX_DRAW_ATTEMPTS: usize = 1000;

pub const DEFAULT_GIFT_LIMIT: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GiftLimit {
    Number(serde_json::Number),
    Text(String),
}

impl Default for GiftLimit {
    fn default() -> Self {
        GiftLimit::Number(DEFAULT_GIFT_LIMIT.into())
    }
}

impl fmt::Display for GiftLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiftLimit::Number(n) => write!(f, "{n}"),
            GiftLimit::Text(s) => f.write_str(s),
        }
    }
}

impl From<String> for GiftLimit {
    fn from(value: String) -> Self {
        GiftLimit::Text(value)
    }
}

impl From<&str> for GiftLimit {
    fn from(value: &str) -> Self {
        GiftLimit::Text(value.to_string())
    }
}

impl From<u64> for GiftLimit {
    fn from(value: u64) -> Self {
        GiftLimit::Number(value.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDocument {
    #[serde(default)]
    pub assignments: Assignments,
    #[serde(default)]
    pub gift_limit: GiftLimit,
}

impl AssignmentDocument {
    pub fn generate<R: Rng + ?Sized>(
        participants: &[Participant],
        gift_limit: GiftLimit,
        rng: &mut R,
    ) -> Result<Self, DrawError> {
        Ok(Self {
            assignments: derange(participants, rng)?,
            gift_limit,
        })
    }

    pub fn receiver_of(&self, giver: &str) -> Option<&str> {
        self.assignments.get(giver).map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("need at least two participants, got {0}")]
    TooFewParticipants(usize),
    #[error("participant {0:?} is listed more than once")]
    DuplicateParticipant(Participant),
}

pub fn derange<R: Rng + ?Sized>(
    participants: &[Participant],
    rng: &mut R,
) -> Result<Assignments, DrawError> {
    draw(participants, rng, MAX_DRAW_ATTEMPTS)
}

fn draw<R: Rng + ?Sized>(
    participants: &[Participant],
    rng: &mut R,
    max_attempts: usize,
) -> Result<Assignments, DrawError> {
    check_participants(participants)?;

    let mut order: Vec<usize> = (0..participants.len()).collect();
    for _ in 0..max_attempts {
        order.shuffle(rng);
        if order.iter().enumerate().all(|(i, &j)| i != j) {
            return Ok(pair(participants, &order));
        }
    }

    Ok(cyclic_shift(participants, rng))
}

pub fn check_participants(participants: &[Participant]) -> Result<(), DrawError> {
    if participants.len() < 2 {
        return Err(DrawError::TooFewParticipants(participants.len()));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for name in participants {
        if !seen.insert(name.as_str()) {
            return Err(DrawError::DuplicateParticipant(name.clone()));
        }
    }
    Ok(())
}

fn pair(participants: &[Participant], permutation: &[usize]) -> Assignments {
    participants
        .iter()
        .zip(permutation)
        .map(|(giver, &receiver)| (giver.clone(), participants[receiver].clone()))
        .collect()
}

// A single cycle through a shuffled order never has a fixed point when n >= 2.
fn cyclic_shift<R: Rng + ?Sized>(participants: &[Participant], rng: &mut R) -> Assignments {
    let n = participants.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut permutation = vec![0; n];
    for (k, &giver) in order.iter().enumerate() {
        permutation[giver] = order[(k + 1) % n];
    }
    pair(participants, &permutation)
}

pub fn is_derangement(participants: &[Participant], assignments: &Assignments) -> bool {
    if assignments.len() != participants.len() {
        return false;
    }

    let members: HashSet<&str> = participants.iter().map(String::as_str).collect();
    let mut receivers = HashSet::with_capacity(assignments.len());
    assignments.iter().all(|(giver, receiver)| {
        giver != receiver
            && members.contains(giver.as_str())
            && members.contains(receiver.as_str())
            && receivers.insert(receiver.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn names(list: &[&str]) -> Vec<Participant> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_draw_is_a_derangement() {
        for n in 2..=9 {
            let participants: Vec<Participant> = (0..n).map(|i| format!("p{i}")).collect();
            for seed in 0..200 {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let assignments = derange(&participants, &mut rng).unwrap();
                assert!(
                    is_derangement(&participants, &assignments),
                    "n={n} seed={seed}: {assignments:?}"
                );
            }
        }
    }

    #[test]
    fn three_participants_never_draw_themselves() {
        let participants = names(&["A", "B", "C"]);
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let doc =
                AssignmentDocument::generate(&participants, GiftLimit::default(), &mut rng).unwrap();
            let receiver = doc.receiver_of("A").unwrap();
            assert!(receiver == "B" || receiver == "C");
        }
    }

    #[test]
    fn two_participants_swap() {
        let participants = names(&["A", "B"]);
        let assignments = derange(&participants, &mut rand::thread_rng()).unwrap();
        assert_eq!(assignments["A"], "B");
        assert_eq!(assignments["B"], "A");
    }

    #[test]
    fn rejects_fewer_than_two() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(
            derange(&[], &mut rng).unwrap_err(),
            DrawError::TooFewParticipants(0)
        );
        assert_eq!(
            derange(&names(&["solo"]), &mut rng).unwrap_err(),
            DrawError::TooFewParticipants(1)
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = derange(&names(&["A", "B", "A"]), &mut rng).unwrap_err();
        assert_eq!(err, DrawError::DuplicateParticipant("A".into()));
    }

    #[test]
    fn falls_back_to_cyclic_shift_when_attempts_run_out() {
        let participants = names(&["A", "B", "C", "D", "E"]);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let assignments = draw(&participants, &mut rng, 0).unwrap();
            assert!(is_derangement(&participants, &assignments));

            // Following the chain from any giver visits everyone once.
            let mut current = "A";
            for _ in 0..participants.len() {
                current = assignments[current].as_str();
            }
            assert_eq!(current, "A");
        }
    }

    #[test]
    fn same_seed_same_draw() {
        let participants = names(&["A", "B", "C", "D"]);
        let first = derange(&participants, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let second = derange(&participants, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn is_derangement_catches_broken_maps() {
        let participants = names(&["A", "B", "C"]);
        let fixed_point: Assignments = [("A", "A"), ("B", "C"), ("C", "B")]
            .into_iter()
            .map(|(g, r)| (g.to_string(), r.to_string()))
            .collect();
        assert!(!is_derangement(&participants, &fixed_point));

        let not_injective: Assignments = [("A", "B"), ("B", "A"), ("C", "A")]
            .into_iter()
            .map(|(g, r)| (g.to_string(), r.to_string()))
            .collect();
        assert!(!is_derangement(&participants, &not_injective));

        let stranger: Assignments = [("A", "B"), ("B", "Z"), ("C", "A")]
            .into_iter()
            .map(|(g, r)| (g.to_string(), r.to_string()))
            .collect();
        assert!(!is_derangement(&participants, &stranger));

        assert!(!is_derangement(&participants, &Assignments::new()));
    }

    #[test]
    fn document_uses_camel_case_and_keeps_limit_shape() {
        let doc: AssignmentDocument = serde_json::from_str(
            r#"{"assignments":{"A":"B","B":"A"},"giftLimit":30}"#,
        )
        .unwrap();
        assert_eq!(doc.gift_limit, GiftLimit::from(30));
        assert_eq!(doc.receiver_of("B"), Some("A"));

        let doc: AssignmentDocument =
            serde_json::from_str(r#"{"assignments":{},"giftLimit":"50"}"#).unwrap();
        assert_eq!(doc.gift_limit, GiftLimit::from("50"));
        assert_eq!(doc.gift_limit.to_string(), "50");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["giftLimit"], "50");
        assert!(json["assignments"].as_object().unwrap().is_empty());
    }

    #[test]
    fn default_document_is_empty_with_default_limit() {
        let doc = AssignmentDocument::default();
        assert!(doc.assignments.is_empty());
        assert_eq!(doc.gift_limit.to_string(), "30");

        let parsed: AssignmentDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, doc);
    }
}
