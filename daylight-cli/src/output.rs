//! Terminal rendering for command results.

use colored::Colorize;
use daylight_core::chat::ChatOutcome;
use daylight_core::sentiment::{Priority, Sentiment, SentimentAnalysis};
use daylight_std::{VectorSearchProvider, VectorSearchResponse};

pub fn render_outcome(outcome: &ChatOutcome) -> String {
    let mut out = String::new();
    for call in &outcome.tool_invocations {
        let status = if call.success { "ok".green() } else { "failed".red() };
        out.push_str(&format!(
            "{} {} {} ({} ms)\n",
            "tool".dimmed(),
            call.tool_name.cyan(),
            status,
            call.duration_ms
        ));
    }
    out.push_str(outcome.text.trim_end());
    out
}

pub fn render_search(response: &VectorSearchResponse) -> String {
    let source = match response.provider {
        VectorSearchProvider::Api => "vector-search-api".green(),
        VectorSearchProvider::Placeholder => "vector-search-placeholder".yellow(),
    };
    let mut out = format!(
        "{} {} (topK {}, threshold {})\n",
        "source".dimmed(),
        source,
        response.top_k,
        response.score_threshold
    );
    if response.matches.is_empty() {
        out.push_str(&"no matches above threshold".dimmed().to_string());
        return out;
    }
    for m in &response.matches {
        out.push_str(&format!("{:.2}  {}  {}\n", m.score, m.id.bold(), m.text));
    }
    out.trim_end().to_string()
}

pub fn render_analysis(analysis: &SentimentAnalysis) -> String {
    let sentiment = serde_json::to_value(analysis.sentiment)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let sentiment = match analysis.sentiment {
        Sentiment::VeryNegative | Sentiment::Negative => sentiment.red(),
        Sentiment::Neutral => sentiment.normal(),
        Sentiment::Positive | Sentiment::VeryPositive => sentiment.green(),
    };
    let priority = format!("{:?}", analysis.priority).to_lowercase();
    let priority = match analysis.priority {
        Priority::Urgent | Priority::High => priority.red().bold(),
        Priority::Medium => priority.yellow(),
        Priority::Low => priority.normal(),
    };

    let mut out = format!(
        "{} {}\n{} {}\n{} {}",
        "sentiment:".dimmed(),
        sentiment,
        "priority: ".dimmed(),
        priority,
        "summary:  ".dimmed(),
        analysis.summary
    );
    for signal in &analysis.signals {
        out.push_str(&format!("\n  - {}", signal));
    }
    out
}
