//! Live "water poured so far" readout.

use super::schedule::{StageKind, Timeline};

/// Water the user should have poured `elapsed` seconds into the brew.
///
/// During a pour the value ramps linearly from the previous stage's target
/// to this stage's target; during a wait it holds at the target of the last
/// pour. A stage whose pour was elided has not poured yet, so its wait holds
/// the previous stage's target. Past the end of the schedule every pour is
/// finished and the readout is the recipe's final water.
pub fn water_at(timeline: &Timeline, elapsed: u32) -> f64 {
    let stages = timeline.stages();
    if stages.is_empty() {
        return 0.0;
    }

    if elapsed >= timeline.total_duration() {
        return timeline.final_water();
    }

    let index = timeline.substage_index_at(elapsed);
    let stage = &stages[index];
    let before = index.checked_sub(1).map(|i| &stages[i]);
    match stage.kind {
        StageKind::Wait => match before {
            Some(pour) if pour.source_stage_index == stage.source_stage_index => {
                pour.target_water.amount
            }
            Some(previous) => previous.target_water.amount,
            None => 0.0,
        },
        StageKind::Pour => {
            // A pour is always the first sub-stage of its recipe stage, so the
            // sub-stage before it belongs to the previous stage.
            let previous = before.map(|s| s.target_water.amount).unwrap_or(0.0);
            let fraction = if stage.pour_time == 0 {
                1.0
            } else {
                (f64::from(elapsed.saturating_sub(stage.start_time)) / f64::from(stage.pour_time))
                    .clamp(0.0, 1.0)
            };
            previous + (stage.target_water.amount - previous) * fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::schedule::{expand, Stage};
    use proptest::prelude::*;

    fn timeline() -> Timeline {
        expand(&[Stage::new("Bloom", 30, "60g"), Stage::new("Main", 120, "150g")]).unwrap()
    }

    #[test]
    fn ramps_during_pours_and_holds_during_waits() {
        let t = timeline();
        assert_eq!(water_at(&t, 0), 0.0);
        assert_eq!(water_at(&t, 5), 30.0);
        assert_eq!(water_at(&t, 10), 60.0);
        assert_eq!(water_at(&t, 29), 60.0);
        assert_eq!(water_at(&t, 30), 60.0);
        assert_eq!(water_at(&t, 45), 105.0);
        assert_eq!(water_at(&t, 60), 150.0);
        assert_eq!(water_at(&t, 119), 150.0);
    }

    #[test]
    fn past_the_end_reports_final_water() {
        let t = timeline();
        assert_eq!(water_at(&t, 120), 150.0);
        assert_eq!(water_at(&t, 9_999), 150.0);
    }

    #[test]
    fn elided_pour_holds_previous_target_until_next_boundary() {
        let t = expand(&[
            Stage::new("Bloom", 30, "60g"),
            Stage::new("Top up", 32, "80g"),
            Stage::new("Rest", 40, "90g").with_pour_time(0),
        ])
        .unwrap();
        assert_eq!(water_at(&t, 29), 60.0);
        assert_eq!(water_at(&t, 30), 60.0);
        assert_eq!(water_at(&t, 31), 60.0);
        assert_eq!(water_at(&t, 32), 80.0);
        assert_eq!(water_at(&t, 39), 80.0);
        assert_eq!(water_at(&t, 40), 90.0);
    }

    #[test]
    fn wait_only_recipe_starts_dry() {
        let t = expand(&[Stage::new("Steep", 2, "200g")]).unwrap();
        assert_eq!(water_at(&t, 0), 0.0);
        assert_eq!(water_at(&t, 1), 0.0);
        assert_eq!(water_at(&t, 2), 200.0);
        assert_eq!(water_at(&t, 5), 200.0);
    }

    fn arb_stages() -> impl Strategy<Value = Vec<Stage>> {
        prop::collection::vec((1u32..200, 0u32..100, prop::option::of(0u32..=100)), 1..6)
            .prop_map(|segments| {
                let mut time = 0;
                let mut water = 0;
                segments
                    .into_iter()
                    .map(|(gap, added, pour_pct)| {
                        time += gap;
                        water += added;
                        let stage = Stage::new("s", time, format!("{water}g"));
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
        fn readout_never_decreases(stages in arb_stages()) {
            let t = expand(&stages).unwrap();
            let mut last = water_at(&t, 0);
            prop_assert_eq!(last, 0.0);
            for elapsed in 1..=t.total_duration() + 5 {
                let now = water_at(&t, elapsed);
                prop_assert!(now >= last - 1e-9, "{} < {} at {}", now, last, elapsed);
                last = now;
            }
            prop_assert!((water_at(&t, t.total_duration()) - t.final_water()).abs() < 1e-9);
        }
    }
}
