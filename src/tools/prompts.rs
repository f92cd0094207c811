//! Prompt templates for the model-backed adapters

/// One-sentence abstractive summary of an article
pub fn summarization_prompt(article: &str) -> String {
    format!(
        r#"**Instruction:**
Your task is to write a single, high-quality sentence that summarizes the main point of the news article provided. The sentence should be written as if it were the first sentence of the article itself.

**Constraints:**
- The summary MUST be a single, complete sentence.
- It must be written in the third person.
- It must be highly factual and grounded in the provided text.
- Do not use introductory phrases like "This article discusses..." or "The document is about...".

**Article:**
{}

**One-Sentence Summary:**
"#,
        article
    )
}

/// Structured key-information extraction, answered as a JSON object
pub fn extraction_prompt(article: &str) -> String {
    format!(
        r#"**Instruction:**
From the news article provided below, extract the key information and answer with a single JSON object.

**JSON Schema to follow:**
- "main_event_or_topic": A concise string describing the central event or subject of the article.
- "key_people": A list of key individuals mentioned.
- "key_organizations": A list of key organizations, companies, or government bodies.
- "key_locations": A list of key locations mentioned.
- "dates_and_times": A list of specific dates or timeframes mentioned.
- "quantitative_information": A list of important numbers, figures, or statistics (e.g., money, percentages, counts).
- "outcome_or_impact": A brief string describing the result, consequence, or impact of the main event.

**Article:**
{}
"#,
        article
    )
}

/// Grounded answer over the gathered sources, citing each by id
pub fn news_analyst_prompt(query: &str, sources: &str) -> String {
    format!(
        r#"You are an expert News Analyst. Your task is to provide a clear, factual, and synthesized answer to the user's question.
Base your answer *exclusively* on the provided news article sources.
Do not use any external knowledge.
When you use information from a source, cite it at the end of the sentence using its ID (e.g., [document-id-123]).
If the sources do not contain enough information to answer the question, state that clearly.

**User's Question:**
{}

**Provided Sources:**
{}

**Synthesized News Report:**
"#,
        query, sources
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_article() {
        assert!(summarization_prompt("Fires spread.").contains("Fires spread."));
        let prompt = extraction_prompt("Rates rose.");
        assert!(prompt.contains("Rates rose."));
        assert!(prompt.contains("key_people"));

        let prompt = news_analyst_prompt("What burned?", "Source ID: doc-42");
        assert!(prompt.contains("What burned?"));
        assert!(prompt.contains("Source ID: doc-42"));
    }
}
