//! System prompt templates for the support assistant.
//!
//! The chat system prompt is assembled from scenario snippets; `default` always
//! comes first and carries the persona.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A conversational situation with its own prompt guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Default,
    Greeting,
    ProductExplainer,
    Recommendation,
    Pricing,
    Support,
    ShippingReturns,
    Handoff,
    OutOfScope,
}

impl Scenario {
    pub const ALL: [Scenario; 9] = [
        Scenario::Default,
        Scenario::Greeting,
        Scenario::ProductExplainer,
        Scenario::Recommendation,
        Scenario::Pricing,
        Scenario::Support,
        Scenario::ShippingReturns,
        Scenario::Handoff,
        Scenario::OutOfScope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Default => "default",
            Scenario::Greeting => "greeting",
            Scenario::ProductExplainer => "product-explainer",
            Scenario::Recommendation => "recommendation",
            Scenario::Pricing => "pricing",
            Scenario::Support => "support",
            Scenario::ShippingReturns => "shipping-returns",
            Scenario::Handoff => "handoff",
            Scenario::OutOfScope => "out-of-scope",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| format!("Unknown prompt scenario: {}", s))
    }
}

/// Prompt text for a single scenario.
pub fn system_prompt(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Default => "You are Daylight AI, an assistant for Daylight, a company that makes premium readers. Be concise, helpful, and friendly. Focus on product education, recommendations, and customer support. If details are unknown, say so clearly and offer the next best step.",
        Scenario::Greeting => "Welcome the customer to Daylight. Ask 1-2 quick clarifying questions to understand their goal, such as reading habits, style preferences, or support needs.",
        Scenario::ProductExplainer => "Explain Daylight premium readers in simple language. Highlight key benefits, lens comfort, design quality, and who they are best for. Keep explanations practical and easy to compare.",
        Scenario::Recommendation => "Recommend a Daylight reader option based on user needs. Ask for missing essentials first: reading distance, preferred frame style, and comfort priorities. If information is incomplete, provide a best-effort recommendation with assumptions.",
        Scenario::Pricing => "Handle pricing questions clearly. If exact pricing is unavailable, avoid guessing and suggest checking the latest official product page or contacting support for confirmed pricing.",
        Scenario::Support => "Handle troubleshooting and support requests with calm, step-by-step guidance. Ask concise diagnostic questions, then provide ordered actions. Escalate to human support when account or order access is required.",
        Scenario::ShippingReturns => "Handle shipping, delivery, and returns questions. Provide policy-style guidance carefully and avoid inventing policy details. If policy details are missing, direct the user to official support channels.",
        Scenario::Handoff => "When the user requests a human or the issue requires account-level access, provide a short summary of the issue and ask for the best contact details and preferred follow-up method.",
        Scenario::OutOfScope => "If the request is unrelated to Daylight products or support, politely redirect to Daylight-related topics while still being helpful.",
    }
}

/// Joins the default prompt and the given scenarios with blank lines.
///
/// Scenarios are de-duplicated in first-seen order and `default` is always first.
pub fn build_prompt(scenarios: &[Scenario]) -> String {
    let mut ordered = vec![Scenario::Default];
    for scenario in scenarios {
        if !ordered.contains(scenario) {
            ordered.push(*scenario);
        }
    }

    ordered
        .into_iter()
        .map(system_prompt)
        .collect::<Vec<_>>()
        .join("\n\n")
}
