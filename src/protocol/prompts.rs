// protocol/prompts.rs - Provider prompt text

use crate::message::{Role, Terms};

use super::role::RoleProfile;

/// Standing instructions for a role
pub fn system_prompt(profile: &RoleProfile) -> String {
    let limits = &profile.limits;
    match profile.role {
        Role::Client => format!(
            "You are a CLIENT hiring a developer to build a software application. \
             Your maximum budget is {} and the maximum time you can wait is {}. \
             Do NOT reveal these limits. Open around {} of your maximum budget with a \
             shorter timeline, raise your offer gradually when pushed, never exceed your \
             maximums, and accept when the developer's terms are within them.",
            limits.budget,
            limits.time,
            profile.opening_budget_label()
        ),
        Role::Developer => format!(
            "You are a DEVELOPER quoting a software project. \
             Your minimum acceptable budget is {} and minimum acceptable time is {}. \
             Do NOT reveal these minimums. Open around {} of your minimum budget with a \
             longer timeline, give technical reasons, lower your request gradually when \
             pushed, never go below your minimums, and accept when the client's terms \
             meet or exceed them.",
            limits.budget,
            limits.time,
            profile.opening_budget_label()
        ),
    }
}

/// Opening turn: the client's first proposal or the developer's first quote
pub fn opening_prompt(
    profile: &RoleProfile,
    description: &str,
    anchor: &Terms,
    counterpart: Option<&Terms>,
) -> String {
    match (profile.role, counterpart) {
        (Role::Developer, Some(client)) => format!(
            "A client wants this application built: {description}\n\
             The client proposes {client}.\n\
             Make your initial quote of roughly {anchor}. \
             Explain the technical scope that justifies it."
        ),
        _ => format!(
            "You want this application built: {description}\n\
             Make your initial offer of roughly {anchor}. \
             Describe what you need built and present the offer professionally."
        ),
    }
}

/// Counter-offer turn
pub fn counter_prompt(
    profile: &RoleProfile,
    description: &str,
    own_previous: &Terms,
    counterpart: &Terms,
    counterpart_reasoning: &str,
) -> String {
    let other = profile.role.counterpart();
    let limits = &profile.limits;
    let limit_word = match profile.role {
        Role::Client => "maximum",
        Role::Developer => "minimum",
    };

    format!(
        "You are negotiating for this application: {description}\n\
         Your previous offer was {own_previous}.\n\
         The {other} has countered with {counterpart}.\n\
         The {other}'s reasoning: {counterpart_reasoning}\n\
         Your {limit_word} budget is {} and your {limit_word} time is {}. \
         Accept if the {other}'s terms respect them, otherwise make a counter-offer \
         that moves towards the {other} without crossing your limits.",
        limits.budget, limits.time
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ActorLimits;

    #[test]
    fn test_system_prompt_mentions_limits() {
        let profile = RoleProfile::client(ActorLimits::new("1500 eur", "1 mes"));
        let prompt = system_prompt(&profile);
        assert!(prompt.contains("1500 eur"));
        assert!(prompt.contains("50-60%"));
    }

    #[test]
    fn test_developer_opening_quotes_client_terms() {
        let profile = RoleProfile::developer(ActorLimits::new("1200 eur", "3 weeks"));
        let prompt = opening_prompt(
            &profile,
            "todo app",
            &Terms::new("32 days", "2100 eur"),
            Some(&Terms::new("2 weeks", "800 eur")),
        );
        assert!(prompt.contains("time 2 weeks, budget 800 eur"));
        assert!(prompt.contains("2100 eur"));
    }

    #[test]
    fn test_counter_prompt_names_counterpart() {
        let profile = RoleProfile::developer(ActorLimits::new("1200 eur", "3 weeks"));
        let prompt = counter_prompt(
            &profile,
            "todo app",
            &Terms::new("6 weeks", "2100 eur"),
            &Terms::new("4 weeks", "1000 eur"),
            "tight budget",
        );
        assert!(prompt.contains("The client has countered"));
        assert!(prompt.contains("minimum budget is 1200 eur"));
    }
}
