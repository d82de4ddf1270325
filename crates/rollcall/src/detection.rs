//! Detection sources.
//!
//! A [`DetectionSource`] stands in for a recognition subsystem. It only
//! proposes `(student, confidence)` pairs; it never classifies or stores
//! anything. [`RandomDetector`] simulates a camera, [`ScriptedDetector`]
//! replays a fixed sequence.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::StudentId;

/// Lowest confidence the simulator reports.
pub const MIN_SIMULATED_CONFIDENCE: u8 = 60;

/// Highest confidence the simulator reports.
pub const MAX_SIMULATED_CONFIDENCE: u8 = 99;

/// A proposed recognition of one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Who was recognized.
    pub student_id: StudentId,
    /// Recognition confidence in percent.
    pub confidence: u8,
}

impl Detection {
    /// Whether the confidence reaches `threshold` percent.
    #[must_use]
    pub fn meets(&self, threshold: u8) -> bool {
        self.confidence >= threshold
    }
}

/// Something that proposes detections, one poll at a time.
pub trait DetectionSource: Send {
    /// Poll once. `roster` lists the students that can be recognized.
    fn next_detection(&mut self, roster: &[StudentId]) -> Option<Detection>;

    /// Whether the source will never produce another detection.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Simulated camera: each poll detects a random roster student with the
/// given probability.
#[derive(Debug)]
pub struct RandomDetector {
    probability: f64,
    rng: StdRng,
}

impl RandomDetector {
    /// Detector seeded from system entropy.
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
            rng: StdRng::from_entropy(),
        }
    }

    /// Detector with a fixed seed, for reproducible runs.
    #[must_use]
    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: clamp_probability(probability),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

impl DetectionSource for RandomDetector {
    fn next_detection(&mut self, roster: &[StudentId]) -> Option<Detection> {
        if roster.is_empty() || !self.rng.gen_bool(self.probability) {
            return None;
        }
        let student_id = roster[self.rng.gen_range(0..roster.len())];
        let confidence = self
            .rng
            .gen_range(MIN_SIMULATED_CONFIDENCE..=MAX_SIMULATED_CONFIDENCE);
        Some(Detection {
            student_id,
            confidence,
        })
    }
}

/// Replays a fixed list of polls. `None` entries are polls without a
/// detection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    script: VecDeque<Option<Detection>>,
}

impl ScriptedDetector {
    /// Replay `script` in order.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Option<Detection>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl DetectionSource for ScriptedDetector {
    fn next_detection(&mut self, _roster: &[StudentId]) -> Option<Detection> {
        self.script.pop_front().flatten()
    }

    fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_meets_threshold() {
        let d = Detection {
            student_id: Uuid::new_v4(),
            confidence: 85,
        };
        assert!(d.meets(85));
        assert!(!d.meets(86));
    }

    #[test]
    fn test_random_detector_certain() {
        let roster = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut detector = RandomDetector::seeded(1.0, 7);
        for _ in 0..50 {
            let d = detector.next_detection(&roster).unwrap();
            assert!(roster.contains(&d.student_id));
            assert!((MIN_SIMULATED_CONFIDENCE..=MAX_SIMULATED_CONFIDENCE).contains(&d.confidence));
        }
    }

    #[test]
    fn test_random_detector_never() {
        let roster = vec![Uuid::new_v4()];
        let mut detector = RandomDetector::seeded(0.0, 7);
        assert!((0..50).all(|_| detector.next_detection(&roster).is_none()));
    }

    #[test]
    fn test_random_detector_empty_roster() {
        let mut detector = RandomDetector::new(1.0);
        assert!(detector.next_detection(&[]).is_none());
    }

    #[test]
    fn test_probability_is_clamped() {
        let roster = vec![Uuid::new_v4()];
        let mut detector = RandomDetector::seeded(3.5, 1);
        assert!(detector.next_detection(&roster).is_some());
    }

    #[test]
    fn test_scripted_detector_replays() {
        let id = Uuid::new_v4();
        let hit = Detection {
            student_id: id,
            confidence: 90,
        };
        let mut detector = ScriptedDetector::new([None, Some(hit)]);
        assert!(!detector.is_exhausted());
        assert_eq!(detector.next_detection(&[]), None);
        assert_eq!(detector.next_detection(&[]), Some(hit));
        assert!(detector.is_exhausted());
        assert_eq!(detector.next_detection(&[]), None);
    }
}
