//! Recipe stages and their expansion into a pour/wait timeline.
//!
//! A recipe is a list of cumulative checkpoints ("by 0:30 you should have
//! poured 60g"). The timer needs something finer: every checkpoint becomes a
//! pour sub-stage followed by a wait sub-stage, each with absolute start and
//! end offsets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// One recipe checkpoint, as supplied by the recipe source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub label: String,
    /// Cumulative seconds from the start of the brew.
    pub target_time: u32,
    /// Cumulative water with a trailing unit, e.g. `"60g"`.
    pub target_water: String,
    #[serde(default)]
    pub detail: String,
    /// Explicit pour duration within this stage's segment.
    #[serde(default)]
    pub pour_time: Option<u32>,
}

impl Stage {
    pub fn new(label: impl Into<String>, target_time: u32, target_water: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target_time,
            target_water: target_water.into(),
            detail: String::new(),
            pour_time: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_pour_time(mut self, pour_time: u32) -> Self {
        self.pour_time = Some(pour_time);
        self
    }
}

/// A parsed water quantity: a number and whatever unit trailed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterAmount {
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

impl WaterAmount {
    /// Parse `"60g"`, `"60 g"`, `"62.5ml"` or a bare `"60"`.
    ///
    /// Returns `None` when the string does not start with a non-negative
    /// number.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        let (number, unit) = raw.split_at(split);
        let amount: f64 = number.parse().ok()?;
        if !amount.is_finite() {
            return None;
        }
        Some(Self {
            amount,
            unit: unit.trim().to_string(),
        })
    }

    /// Same unit, amount multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            amount: self.amount * factor,
            unit: self.unit.clone(),
        }
    }
}

/// Prints the shortest form that parses back to the same amount, after
/// rounding to six decimals so rescaling noise does not pile up in recipes.
impl fmt::Display for WaterAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = (self.amount * 1e6).round() / 1e6;
        write!(f, "{amount}{}", self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Pour,
    Wait,
}

/// A pour or wait slice of the brew with absolute offsets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedStage {
    pub kind: StageKind,
    pub label: String,
    /// Inclusive start, seconds from schedule start.
    pub start_time: u32,
    /// Exclusive end, seconds from schedule start.
    pub end_time: u32,
    /// Pour duration; zero for waits.
    pub pour_time: u32,
    /// Cumulative water target of the originating stage.
    pub target_water: WaterAmount,
    pub detail: String,
    /// 0-based index of the originating [`Stage`].
    pub source_stage_index: usize,
}

impl ExpandedStage {
    pub fn duration(&self) -> u32 {
        self.end_time - self.start_time
    }

    pub fn is_pour(&self) -> bool {
        self.kind == StageKind::Pour
    }

    pub fn contains(&self, elapsed: u32) -> bool {
        self.start_time <= elapsed && elapsed < self.end_time
    }
}

/// The expanded, immutable schedule for one brew.
///
/// Always holds at least one sub-stage; the only constructor is [`expand`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    stages: Vec<ExpandedStage>,
}

impl Timeline {
    pub fn stages(&self) -> &[ExpandedStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExpandedStage> {
        self.stages.get(index)
    }

    /// Total brew time: the last sub-stage's end.
    pub fn total_duration(&self) -> u32 {
        self.stages.last().map(|s| s.end_time).unwrap_or(0)
    }

    /// Final cumulative water of the recipe.
    pub fn final_water(&self) -> f64 {
        self.stages
            .last()
            .map(|s| s.target_water.amount)
            .unwrap_or(0.0)
    }

    /// Index of the sub-stage containing `elapsed`; the last one once the
    /// schedule is over.
    pub fn substage_index_at(&self, elapsed: u32) -> usize {
        self.stages
            .iter()
            .position(|s| s.contains(elapsed))
            .unwrap_or(self.stages.len().saturating_sub(1))
    }
}

/// Pour duration for a stage occupying `segment` seconds.
///
/// An explicit `pour_time` wins; otherwise the pour takes the first third of
/// the segment (rounded down) and the rest is spent waiting.
pub fn pour_time_for(stage: &Stage, segment: u32) -> u32 {
    stage.pour_time.unwrap_or(segment / 3)
}

/// Expand recipe stages into a pour/wait timeline.
///
/// A stage whose pour time is zero gets no pour sub-stage; its wait spans
/// the whole segment and carries the stage-start cue.
pub fn expand(stages: &[Stage]) -> Result<Timeline, ScheduleError> {
    if stages.is_empty() {
        return Err(ScheduleError::EmptyRecipe);
    }

    let mut expanded = Vec::with_capacity(stages.len() * 2);
    let mut prev_end = 0u32;
    let mut prev_water = 0.0f64;

    for (index, stage) in stages.iter().enumerate() {
        if stage.target_time <= prev_end {
            return Err(ScheduleError::InvalidStageOrder {
                index,
                previous: prev_end,
                target: stage.target_time,
            });
        }

        let water = WaterAmount::parse(&stage.target_water).ok_or_else(|| {
            ScheduleError::InvalidWater {
                index,
                value: stage.target_water.clone(),
            }
        })?;
        if water.amount < prev_water {
            return Err(ScheduleError::WaterDecreases { index });
        }

        let segment = stage.target_time - prev_end;
        let pour_time = pour_time_for(stage, segment);
        if pour_time > segment {
            return Err(ScheduleError::InvalidPourTime {
                index,
                pour_time,
                segment,
            });
        }

        if pour_time > 0 {
            expanded.push(ExpandedStage {
                kind: StageKind::Pour,
                label: stage.label.clone(),
                start_time: prev_end,
                end_time: prev_end + pour_time,
                pour_time,
                target_water: water.clone(),
                detail: stage.detail.clone(),
                source_stage_index: index,
            });
        }
        if pour_time < segment {
            expanded.push(ExpandedStage {
                kind: StageKind::Wait,
                label: stage.label.clone(),
                start_time: prev_end + pour_time,
                end_time: stage.target_time,
                pour_time: 0,
                target_water: water.clone(),
                detail: stage.detail.clone(),
                source_stage_index: index,
            });
        }

        prev_end = stage.target_time;
        prev_water = water.amount;
    }

    Ok(Timeline { stages: expanded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_stage_recipe() -> Vec<Stage> {
        vec![Stage::new("Bloom", 30, "60g"), Stage::new("Main pour", 120, "150g")]
    }

    fn spans(timeline: &Timeline) -> Vec<(StageKind, u32, u32)> {
        timeline
            .stages()
            .iter()
            .map(|s| (s.kind, s.start_time, s.end_time))
            .collect()
    }

    #[test]
    fn two_stage_recipe_expands_to_pour_wait_pairs() {
        let timeline = expand(&two_stage_recipe()).unwrap();
        assert_eq!(
            spans(&timeline),
            vec![
                (StageKind::Pour, 0, 10),
                (StageKind::Wait, 10, 30),
                (StageKind::Pour, 30, 60),
                (StageKind::Wait, 60, 120),
            ]
        );
        assert_eq!(timeline.get(0).unwrap().pour_time, 10);
        assert_eq!(timeline.get(2).unwrap().pour_time, 30);
        assert_eq!(timeline.get(2).unwrap().target_water.amount, 150.0);
        assert_eq!(timeline.get(3).unwrap().source_stage_index, 1);
        assert_eq!(timeline.total_duration(), 120);
    }

    #[test]
    fn explicit_pour_time_overrides_default() {
        let stages = vec![Stage::new("Bloom", 45, "50g").with_pour_time(5)];
        let timeline = expand(&stages).unwrap();
        assert_eq!(
            spans(&timeline),
            vec![(StageKind::Pour, 0, 5), (StageKind::Wait, 5, 45)]
        );
    }

    #[test]
    fn full_segment_pour_has_no_wait() {
        let stages = vec![Stage::new("Drawdown pour", 20, "300g").with_pour_time(20)];
        let timeline = expand(&stages).unwrap();
        assert_eq!(spans(&timeline), vec![(StageKind::Pour, 0, 20)]);
    }

    #[test]
    fn zero_pour_time_is_elided() {
        let stages = vec![
            Stage::new("Bloom", 30, "60g"),
            Stage::new("Top up", 32, "80g"),
        ];
        let timeline = expand(&stages).unwrap();
        // Second segment is 2s, default pour floor(2/3) = 0.
        assert_eq!(
            spans(&timeline),
            vec![
                (StageKind::Pour, 0, 10),
                (StageKind::Wait, 10, 30),
                (StageKind::Wait, 30, 32),
            ]
        );
    }

    #[test]
    fn empty_recipe_is_rejected() {
        assert_eq!(expand(&[]), Err(ScheduleError::EmptyRecipe));
    }

    #[test]
    fn non_increasing_times_are_rejected() {
        let stages = vec![Stage::new("A", 30, "50g"), Stage::new("B", 30, "100g")];
        assert_eq!(
            expand(&stages),
            Err(ScheduleError::InvalidStageOrder {
                index: 1,
                previous: 30,
                target: 30
            })
        );

        let zero = vec![Stage::new("A", 0, "50g")];
        assert!(matches!(
            expand(&zero),
            Err(ScheduleError::InvalidStageOrder { index: 0, .. })
        ));
    }

    #[test]
    fn oversized_pour_time_is_rejected() {
        let stages = vec![Stage::new("A", 10, "50g").with_pour_time(11)];
        assert_eq!(
            expand(&stages),
            Err(ScheduleError::InvalidPourTime {
                index: 0,
                pour_time: 11,
                segment: 10
            })
        );
    }

    #[test]
    fn bad_water_is_rejected() {
        let stages = vec![Stage::new("A", 10, "lots")];
        assert!(matches!(
            expand(&stages),
            Err(ScheduleError::InvalidWater { index: 0, .. })
        ));

        let shrinking = vec![Stage::new("A", 10, "100g"), Stage::new("B", 20, "90g")];
        assert_eq!(
            expand(&shrinking),
            Err(ScheduleError::WaterDecreases { index: 1 })
        );
    }

    #[test]
    fn water_amount_parses_units() {
        assert_eq!(
            WaterAmount::parse("60g"),
            Some(WaterAmount { amount: 60.0, unit: "g".into() })
        );
        assert_eq!(WaterAmount::parse(" 62.5 ml ").unwrap().unit, "ml");
        assert_eq!(WaterAmount::parse("75").unwrap().unit, "");
        assert!(WaterAmount::parse("g60").is_none());
        assert!(WaterAmount::parse("").is_none());
    }

    #[test]
    fn water_amount_display() {
        assert_eq!(WaterAmount::parse("60g").unwrap().to_string(), "60g");
        assert_eq!(WaterAmount::parse("60g").unwrap().scaled(1.25).to_string(), "75g");
        assert_eq!(WaterAmount::parse("25g").unwrap().scaled(0.5).to_string(), "12.5g");
        assert_eq!(WaterAmount::parse("62.25 ml").unwrap().to_string(), "62.25ml");
        assert_eq!(WaterAmount::parse("60.2g").unwrap().scaled(300.0 / 301.0).to_string(), "60g");
    }

    #[test]
    fn substage_lookup() {
        let timeline = expand(&two_stage_recipe()).unwrap();
        assert_eq!(timeline.substage_index_at(0), 0);
        assert_eq!(timeline.substage_index_at(10), 1);
        assert_eq!(timeline.substage_index_at(59), 2);
        assert_eq!(timeline.substage_index_at(119), 3);
        assert_eq!(timeline.substage_index_at(500), 3);
    }

    fn arb_stages() -> impl Strategy<Value = Vec<Stage>> {
        prop::collection::vec(
            (1u32..300, 0u32..120, prop::option::of(0u32..=100)),
            1..8,
        )
        .prop_map(|segments| {
            let mut time = 0;
            let mut water = 0;
            segments
                .into_iter()
                .enumerate()
                .map(|(i, (gap, added, pour_pct))| {
                    time += gap;
                    water += added;
                    let stage = Stage::new(format!("Stage {}", i + 1), time, format!("{water}g"));
                    match pour_pct {
                        Some(pct) => stage.with_pour_time(gap * pct / 100),
                        None => stage,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn expansion_partitions_time(stages in arb_stages()) {
            let timeline = expand(&stages).unwrap();
            let subs = timeline.stages();

            prop_assert_eq!(subs[0].start_time, 0);
            for pair in subs.windows(2) {
                prop_assert_eq!(pair[0].end_time, pair[1].start_time);
                prop_assert!(pair[0].end_time < pair[1].end_time);
            }
            for sub in subs {
                prop_assert!(sub.end_time > sub.start_time);
            }
            prop_assert_eq!(timeline.total_duration(), stages.last().unwrap().target_time);
        }
    }
}
