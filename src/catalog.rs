//! Fixed exercise catalog, used only to label recordings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TelemetryResult;

/// One exercise in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
}

/// A named group of exercises
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutCategory {
    pub name: String,
    pub exercises: Vec<Exercise>,
}

/// Built-in default catalog, used when no catalog file is supplied
pub fn builtin_catalog() -> Vec<WorkoutCategory> {
    fn exercise(name: &str, description: &str) -> Exercise {
        Exercise {
            name: name.to_string(),
            description: description.to_string(),
            link: String::new(),
        }
    }

    vec![
        WorkoutCategory {
            name: "Push".to_string(),
            exercises: vec![
                exercise("Bench Press", "Press the bar from the chest while lying on a bench."),
                exercise("Overhead Press", "Press the weight overhead from shoulder height."),
                exercise("Push-ups", "Lower and raise the body with arms from a plank."),
            ],
        },
        WorkoutCategory {
            name: "Pull".to_string(),
            exercises: vec![
                exercise("Pull-ups", "Hang from a bar and pull the chin above it."),
                exercise("Bent-over Row", "Pull the weight to the torso from a hinged stance."),
                exercise("Bicep Curl", "Curl the weight from full arm extension."),
            ],
        },
        WorkoutCategory {
            name: "Legs".to_string(),
            exercises: vec![
                exercise("Squat", "Lower the hips from standing and drive back up."),
                exercise("Deadlift", "Lift the bar from the floor to a standing lockout."),
                exercise("Lunges", "Step forward and lower until both knees bend."),
            ],
        },
    ]
}

/// Parse a catalog from JSON text
pub fn parse_catalog(json: &str) -> TelemetryResult<Vec<WorkoutCategory>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a catalog file from disk
pub fn load_catalog(path: &Path) -> TelemetryResult<Vec<WorkoutCategory>> {
    parse_catalog(&fs::read_to_string(path)?)
}

/// Look up an exercise by (category, exercise) index pair
pub fn find_exercise(
    catalog: &[WorkoutCategory],
    category: usize,
    exercise: usize,
) -> Option<&Exercise> {
    catalog.get(category)?.exercises.get(exercise)
}
