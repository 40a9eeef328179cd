use crate::models::{BudgetTier, TripRequest};

pub fn build_itinerary_prompt(request: &TripRequest, days: u32) -> String {
    let budget = match BudgetTier::parse(&request.budget) {
        Some(tier) => format!("{} ({})", request.budget, tier.label()),
        None => request.budget.clone(),
    };

    format!(
        "Create a {days}-day travel itinerary for {destination}.

Trip details:
- Dates: {start} to {end}
- Budget level: {budget}

Please provide a day-by-day itinerary with:
- Morning, afternoon, and evening activities
- Specific places to visit with brief descriptions
- Rough timing for each activity
- Tips relevant to the budget level

Format as markdown with clear day headers.",
        days = days,
        destination = request.destination,
        start = request.start_date,
        end = request.end_date,
        budget = budget,
    )
}
