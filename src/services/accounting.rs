use super::model::UsageMetadata;
use crate::models::response::round_to;
use crate::models::TokenUsage;

/// USD per million input tokens (gemini-2.0-flash).
pub const INPUT_COST_PER_MILLION: f64 = 0.10;
/// USD per million output tokens (gemini-2.0-flash).
pub const OUTPUT_COST_PER_MILLION: f64 = 0.40;

pub fn calculate_cost(input_tokens: u32, output_tokens: u32) -> f64 {
    let cost = f64::from(input_tokens) * INPUT_COST_PER_MILLION / 1_000_000.0
        + f64::from(output_tokens) * OUTPUT_COST_PER_MILLION / 1_000_000.0;
    round_to(cost, 8)
}

/// Token counts and cost for a model reply. Incomplete usage data yields
/// zeros instead of an error.
pub fn account_usage(usage: Option<&UsageMetadata>) -> TokenUsage {
    let counts = usage.and_then(|u| {
        Some((
            u.prompt_token_count?,
            u.candidates_token_count?,
            u.total_token_count?,
        ))
    });

    match counts {
        Some((input, output, total)) => TokenUsage {
            input_token_count: input,
            output_token_count: output,
            total_token_count: total,
            estimated_cost: calculate_cost(input, output),
        },
        None => {
            log::warn!("⚠️ Usage metadata missing or incomplete, reporting zero tokens and cost");
            TokenUsage::default()
        }
    }
}
