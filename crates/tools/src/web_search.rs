//! Web search tool backed by DuckDuckGo.
//!
//! Scrapes result snippets from the HTML endpoint first. When that yields
//! nothing, falls back to the instant-answer JSON API's abstract.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use tooloop_core::error::ToolError;
use tooloop_core::tool::{FieldKind, InputSchema, Tool, ToolOutput};
use tracing::{debug, warn};

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const API_ENDPOINT: &str = "https://api.duckduckgo.com/";
const SNIPPET_PATTERN: &str = r#"class="result__snippet"[^>]*>([^<]+)<"#;

pub struct WebSearchTool {
    client: reqwest::Client,
    max_results: usize,
    snippet_re: Regex,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client, max_results: usize) -> Result<Self, ToolError> {
        let snippet_re =
            Regex::new(SNIPPET_PATTERN).map_err(|e| ToolError::failed("web_search", e.to_string()))?;
        Ok(Self {
            client,
            max_results: max_results.max(1),
            snippet_re,
        })
    }

    async fn search_html(&self, query: &str) -> Result<Vec<String>, reqwest::Error> {
        let html = self
            .client
            .get(HTML_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_snippets(&self.snippet_re, &html, self.max_results))
    }

    async fn instant_answer(&self, query: &str) -> Result<InstantAnswer, reqwest::Error> {
        self.client
            .get(API_ENDPOINT)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns the top result snippets."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::empty().required("query", FieldKind::String, "The search query")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = arguments["query"].as_str().unwrap_or_default().trim();
        if query.is_empty() {
            return Err(ToolError::invalid(self.name(), "query must not be empty"));
        }

        let snippets = match self.search_html(query).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(error = %e, "DuckDuckGo HTML search failed, trying instant answers");
                Vec::new()
            }
        };
        debug!(query, count = snippets.len(), "Search snippets extracted");

        if !snippets.is_empty() {
            return Ok(ToolOutput::Text(format_results(query, &snippets)));
        }

        let answer = self.instant_answer(query).await.map_err(|e| {
            ToolError::failed(
                self.name(),
                format!("Unable to perform search at the moment: {e}"),
            )
        })?;
        Ok(ToolOutput::Text(format_instant_answer(query, &answer)))
    }
}

/// Subset of the DuckDuckGo instant-answer response.
#[derive(Debug, Default, Deserialize)]
pub struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    pub abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    pub abstract_url: String,
}

/// Pull up to `max` snippet texts out of a DuckDuckGo HTML result page.
pub fn extract_snippets(re: &Regex, html: &str, max: usize) -> Vec<String> {
    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}

pub fn format_results(query: &str, snippets: &[String]) -> String {
    let lines: Vec<String> = snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {s}", i + 1))
        .collect();
    format!("Search results for \"{query}\":\n\n{}", lines.join("\n"))
}

pub fn format_instant_answer(query: &str, answer: &InstantAnswer) -> String {
    if answer.abstract_text.trim().is_empty() {
        return format!(
            "I searched for \"{query}\" but couldn't find specific results. Try rephrasing your question."
        );
    }
    let source = if answer.abstract_url.is_empty() {
        "DuckDuckGo"
    } else {
        answer.abstract_url.as_str()
    };
    format!("{}\n\nSource: {source}", answer.abstract_text.trim())
}

fn decode_entities(s: &str) -> String {
    // `&amp;` last, so escaped entities stay literal.
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
