use std::fmt::Write;

use crate::models::{StoredPrediction, TimelineEntry};

/// Highest-congestion slot of a timeline; the earliest one wins a tie.
pub fn peak_slot(timeline: &[TimelineEntry]) -> Option<&TimelineEntry> {
    timeline
        .iter()
        .reduce(|best, entry| if entry.congestion > best.congestion { entry } else { best })
}

pub fn build_report(university_id: i32, predictions: &[StoredPrediction]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Campus Congestion Forecast");
    let _ = writeln!(output, "Generated for university {university_id}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Peaks");

    if predictions.is_empty() {
        let _ = writeln!(output, "No predictions stored for this university.");
        return output;
    }

    for prediction in predictions {
        match peak_slot(&prediction.timeline) {
            Some(peak) => {
                let _ = writeln!(
                    output,
                    "- {}: peak {} at {} ({}, {})",
                    prediction.day, peak.congestion, peak.time, peak.category, peak.summary
                );
            }
            None => {
                let _ = writeln!(output, "- {}: no slots", prediction.day);
            }
        }
    }

    for prediction in predictions {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} (updated {})",
            prediction.day,
            prediction.updated_at.format("%Y-%m-%d %H:%M UTC")
        );
        for entry in &prediction.timeline {
            let _ = writeln!(
                output,
                "- {} congestion {} [{}] {}",
                entry.time, entry.congestion, entry.category, entry.summary
            );
        }
    }

    output
}
