// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default workout titles derived from the logged exercises

use crate::models::{CardioEntry, ExerciseEntry};

const CARDIO_SESSION: &str = "Cardio Session";
const MOBILITY: &str = "Mobility & Recovery";

/// What the title is derived from
#[derive(Debug, Clone, Copy)]
pub struct TitleInput<'a> {
    pub exercises: &'a [ExerciseEntry],
    pub cardio_sessions: &'a [CardioEntry],
    /// Local wall-clock hour the workout was created at (0-23)
    pub local_hour: u32,
    /// Titles of other workouts on the same date
    pub same_day_titles: &'a [String],
    pub personal_record: bool,
}

#[derive(Debug, Default)]
struct GroupTally {
    push: usize,
    pull: usize,
    legs: usize,
    cardio: usize,
    mobility: usize,
}

fn is_push(name: &str) -> bool {
    ["bench", "press", "overhead", "dip", "tricep", "chest"]
        .iter()
        .any(|k| name.contains(k))
}

fn is_pull(name: &str) -> bool {
    ["row", "pull-up", "pull up", "pullup", "lat", "rear delt", "bicep"]
        .iter()
        .any(|k| name.contains(k))
}

fn is_legs(name: &str) -> bool {
    ["squat", "deadlift", "lunge", "leg curl", "leg extension", "calf"]
        .iter()
        .any(|k| name.contains(k))
}

fn is_cardio(name: &str) -> bool {
    ["run", "treadmill", "bike", "cycling", "rower", "rowing", "elliptical", "hiit"]
        .iter()
        .any(|k| name.contains(k))
}

fn is_mobility(name: &str) -> bool {
    ["mobility", "stretch", "foam roll", "yoga"]
        .iter()
        .any(|k| name.contains(k))
}

fn normalized_names(exercises: &[ExerciseEntry]) -> Vec<String> {
    exercises
        .iter()
        .map(|e| e.exercise_name.trim().to_lowercase())
        .collect()
}

/// "Squat Day" and friends when one big lift shows up at least twice
fn dominant_lift(names: &[String]) -> Option<&'static str> {
    let lifts = [
        ("Squat Day", "squat"),
        ("Bench Day", "bench"),
        ("Deadlift Day", "deadlift"),
    ];
    let mut best: Option<(&'static str, usize)> = None;
    for (title, keyword) in lifts {
        let count = names.iter().filter(|n| n.contains(keyword)).count();
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((title, count));
        }
    }
    best.filter(|(_, count)| *count >= 2).map(|(title, _)| title)
}

fn tally(names: &[String]) -> GroupTally {
    let mut tally = GroupTally::default();
    for name in names {
        tally.push += is_push(name) as usize;
        tally.pull += is_pull(name) as usize;
        tally.legs += is_legs(name) as usize;
        tally.cardio += is_cardio(name) as usize;
        tally.mobility += is_mobility(name) as usize;
    }
    tally
}

fn choose_pattern(t: &GroupTally) -> Option<&'static str> {
    let main = t.push + t.pull + t.legs;
    if t.cardio > 0 && main == 0 {
        return Some(CARDIO_SESSION);
    }
    if t.mobility > 0 && main == 0 && t.cardio == 0 {
        return Some(MOBILITY);
    }
    if main >= 3 && t.push > 0 && t.pull > 0 && t.legs > 0 {
        return Some("Full Body");
    }
    if t.legs >= t.push.max(t.pull) && t.legs >= 2 {
        return Some("Leg Day");
    }
    if t.push > t.pull && t.push >= 2 {
        return Some("Push Day");
    }
    if t.pull > t.push && t.pull >= 2 {
        return Some("Pull Day");
    }
    if t.push + t.pull >= 2 && t.legs == 0 {
        return Some("Upper Body");
    }
    if t.legs >= 2 && t.push + t.pull == 0 {
        return Some("Lower Body");
    }
    None
}

/// Suggest a title such as "Leg Day", "Push Day + Cardio" or "PR: Squat Day"
pub fn default_title(input: TitleInput<'_>) -> String {
    let names = normalized_names(input.exercises);
    let mut title = dominant_lift(&names)
        .or_else(|| choose_pattern(&tally(&names)))
        .unwrap_or("Workout")
        .to_string();

    let has_cardio = !input.cardio_sessions.is_empty() || names.iter().any(|n| is_cardio(n));
    if has_cardio && title != CARDIO_SESSION && title != MOBILITY {
        title.push_str(" + Cardio");
    }

    if input.same_day_titles.iter().any(|t| t.trim() == title) {
        let part_of_day = match input.local_hour {
            0..=11 => "Morning",
            12..=17 => "Afternoon",
            _ => "Evening",
        };
        title = format!("{title} - {part_of_day}");
    }

    if input.personal_record {
        title = format!("PR: {title}");
    }
    title
}
