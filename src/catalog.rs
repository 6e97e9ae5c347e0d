// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Built-in exercise catalog
//!
//! Shipped with the crate as static JSON (`data/gym_exercises.json`) and
//! expanded into [`ExerciseCatalogItem`]s on load.

use crate::errors::SyncResult;
use crate::models::{ExerciseCatalogItem, ExerciseCategory};
use serde::Deserialize;

const GYM_EXERCISES: &str = include_str!("../data/gym_exercises.json");

#[derive(Debug, Deserialize)]
struct RawExercise {
    name: String,
    popularity: f64,
    bw: u8,
}

/// Built-in exercises, most popular first
pub fn builtin_exercises() -> SyncResult<Vec<ExerciseCatalogItem>> {
    let raw: Vec<RawExercise> = serde_json::from_str(GYM_EXERCISES)?;

    let mut exercises: Vec<ExerciseCatalogItem> = raw
        .into_iter()
        .enumerate()
        .map(|(index, exercise)| ExerciseCatalogItem {
            id: catalog_id(index, &exercise.name),
            category: Some(if exercise.bw == 1 {
                ExerciseCategory::Bodyweight
            } else {
                ExerciseCategory::Strength
            }),
            muscle_groups: Some(infer_muscle_groups(&exercise.name)),
            name: exercise.name,
            popularity: exercise.popularity,
            bw: exercise.bw,
            is_custom: false,
            created_by: None,
            is_approved: None,
        })
        .collect();

    exercises.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
    Ok(exercises)
}

/// `exercise_<index>_<lowercase name with underscores>`
fn catalog_id(index: usize, name: &str) -> String {
    let slug = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("exercise_{index}_{slug}")
}

/// Rough muscle groups from keywords in the exercise name
pub fn infer_muscle_groups(name: &str) -> Vec<String> {
    let name = name.to_lowercase();
    let has = |needle: &str| name.contains(needle);
    let mut groups: Vec<&str> = Vec::new();

    if has("squat") || has("lunge") || has("leg press") {
        groups.extend(["legs", "glutes"]);
    }
    if has("bench press") || has("push") || has("chest") {
        groups.extend(["chest", "triceps"]);
    }
    if has("pull") || has("row") || has("lat") {
        groups.extend(["back", "biceps"]);
    }
    if has("deadlift") || has("hip thrust") {
        groups.extend(["back", "glutes", "hamstrings"]);
    }
    if has("curl") && has("bicep") {
        groups.push("biceps");
    }
    if has("tricep") || has("skullcrusher") {
        groups.push("triceps");
    }
    if has("shoulder") || (has("press") && !has("bench")) {
        groups.push("shoulders");
    }
    if has("calf") {
        groups.push("calves");
    }

    if groups.is_empty() {
        vec!["general".to_string()]
    } else {
        groups.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sorted_by_popularity() {
        let exercises = builtin_exercises().unwrap();
        assert!(!exercises.is_empty());
        assert!(exercises
            .windows(2)
            .all(|pair| pair[0].popularity >= pair[1].popularity));
        assert!(exercises.iter().all(|e| !e.is_custom));
    }

    #[test]
    fn test_catalog_ids_and_categories() {
        let exercises = builtin_exercises().unwrap();
        let bench = exercises.iter().find(|e| e.name == "Bench Press").unwrap();
        assert_eq!(bench.id, "exercise_1_bench_press");
        assert_eq!(bench.category, Some(ExerciseCategory::Strength));

        let pull_up = exercises.iter().find(|e| e.name == "Pull Up").unwrap();
        assert!(pull_up.is_bodyweight());
        assert_eq!(pull_up.category, Some(ExerciseCategory::Bodyweight));
    }

    #[test]
    fn test_infer_muscle_groups() {
        assert_eq!(infer_muscle_groups("Back Squat"), vec!["legs", "glutes"]);
        assert_eq!(
            infer_muscle_groups("Overhead Press"),
            vec!["shoulders"]
        );
        assert_eq!(
            infer_muscle_groups("Romanian Deadlift"),
            vec!["back", "glutes", "hamstrings"]
        );
        assert_eq!(infer_muscle_groups("Dumbbell Bicep Curl"), vec!["biceps"]);
        assert_eq!(infer_muscle_groups("Plank"), vec!["general"]);
    }
}
