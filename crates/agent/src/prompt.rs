//! The fixed instruction that opens every run.

use chrono::NaiveDate;

/// Tool-usage policy given to the model before the user's message.
pub const SYSTEM_INSTRUCTION: &str = "You are a tool-using AI agent.

Rules:
If a question needs real-time, external, factual, or numeric data → you MUST use a tool.
If calculation is needed → use calculator.
If current date or time is needed → use current_time.
Never guess real-world information.
After using a tool, produce a clear final answer.";

/// System turn content for a tool-calling run.
pub fn system_prompt(today: NaiveDate) -> String {
    format!("{SYSTEM_INSTRUCTION}\nToday: {}", today.format("%-m/%-d/%Y"))
}

/// Single user turn for the direct path, where the model gets no tools.
pub fn fallback_prompt(message: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\nUser: {message}")
}

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let prompt = system_prompt(date);
        assert!(prompt.starts_with("You are a tool-using AI agent."));
        assert!(prompt.ends_with("\nToday: 3/7/2026"));
    }

    #[test]
    fn fallback_prompt_appends_user_line() {
        let prompt = fallback_prompt("Tell me a joke");
        assert!(prompt.contains("use calculator"));
        assert!(prompt.ends_with("\nUser: Tell me a joke"));
    }
}
