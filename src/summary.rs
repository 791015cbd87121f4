use crate::models::Category;

/// Fixed phrase describing a slot, keyed on its dominant category.
/// Only `TRAFFIC` also looks at the hour.
pub fn summarize(category: &Category, hour: u32) -> &'static str {
    match category {
        Category::Traffic if hour < 10 => "morning shuttle/bus queue expected",
        Category::Traffic if hour > 17 => "afternoon shuttle/traffic congestion expected",
        Category::Traffic => "general on-campus vehicle/shuttle congestion",
        Category::Cafeteria => "dining hall queue congestion",
        Category::Weather => "slippery surfaces / weather caution",
        Category::Event => "crowding from campus event/booth",
        Category::Other(_) => "concentrated reports about library/facility usage",
    }
}
