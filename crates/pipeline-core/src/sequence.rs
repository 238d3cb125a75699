use crate::types::{Channel, Personality};
use serde::{Deserialize, Serialize};

/// One touch-point of an outreach sequence.
///
/// `timespan` is the day offset relative to the previous step, not to the
/// start of the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub id: String,
    pub position: u32,
    pub timespan: u32,
    pub channel: Channel,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
}

impl SequenceStep {
    pub fn new(id: impl Into<String>, position: u32, channel: Channel, timespan: u32) -> Self {
        Self {
            id: id.into(),
            position,
            timespan,
            channel,
            message: String::new(),
            attachment: None,
            personality: None,
        }
    }

    /// Ungated steps apply to every personality.
    pub fn applies_to(&self, personality: Personality) -> bool {
        self.personality.map_or(true, |gate| gate == personality)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<SequenceStep>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Steps sorted by `position`; equal positions keep their stored order.
    pub fn ordered_steps(&self) -> Vec<&SequenceStep> {
        let mut steps: Vec<&SequenceStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.position);
        steps
    }

    pub fn steps_for(&self, personality: Personality) -> Vec<SequenceStep> {
        self.ordered_steps()
            .into_iter()
            .filter(|s| s.applies_to(personality))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ungated_step_applies_to_everyone() {
        let step = SequenceStep::new("s1", 0, Channel::Email, 0);
        assert!(step.applies_to(Personality(1)));
        assert!(step.applies_to(Personality(4)));
    }

    #[test]
    fn gated_step_applies_only_to_its_personality() {
        let mut step = SequenceStep::new("s1", 0, Channel::Email, 0);
        step.personality = Some(Personality(2));
        assert!(step.applies_to(Personality(2)));
        assert!(!step.applies_to(Personality(1)));
    }

    #[test]
    fn steps_for_orders_by_position_and_filters() {
        let mut seq = Sequence::new("seq", "Intro");
        let mut gated = SequenceStep::new("b", 1, Channel::Call, 2);
        gated.personality = Some(Personality(9));
        seq.steps.push(SequenceStep::new("c", 2, Channel::Email, 1));
        seq.steps.push(gated);
        seq.steps.push(SequenceStep::new("a", 0, Channel::Linkedin, 0));

        let ids: Vec<String> = seq
            .steps_for(Personality(1))
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn negative_timespan_is_rejected_on_decode() {
        let yaml = "id: s\nposition: 0\ntimespan: -1\nchannel: email\n";
        assert!(serde_yaml::from_str::<SequenceStep>(yaml).is_err());
    }
}
