//! Text helpers shared by the planner, the local embedder and the
//! extractive summarizer.

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "article", "articles", "as",
    "at", "be", "been", "before", "but", "by", "can", "could", "did", "do", "does", "for", "from",
    "give", "had", "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "me", "more", "most", "my", "news", "no", "not", "of", "on", "or", "our", "please",
    "relevant", "said", "she", "show", "so", "some", "story", "summarize", "summary", "tell",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "to", "up",
    "was", "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would",
    "you", "your",
];

/// Lowercased alphanumeric tokens
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Tokens that carry meaning: at least three characters and not a stopword
pub fn content_terms(text: &str) -> Vec<String> {
    tokens(text)
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Split text into trimmed sentences on terminal punctuation
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    out
}

/// Shorten for log output
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_terms() {
        let terms = content_terms("Summarize the most relevant article about wildfires");
        assert_eq!(terms, vec!["wildfires"]);
        assert!(content_terms("what is it?").is_empty());
    }

    #[test]
    fn test_sentences() {
        let s = sentences("Fires spread. Thousands fled!  Officials responded");
        assert_eq!(s, vec!["Fires spread.", "Thousands fled!", "Officials responded"]);
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
