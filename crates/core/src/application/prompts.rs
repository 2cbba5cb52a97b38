// Prompt templates for the generation service

use crate::domain::ArticleRecord;

pub const EXTRACTION_PROMPT: &str = r#"You are an expert in processing legal documents.
Analyse the attached document carefully.

Follow these instructions exactly:
1. Identify every article individually.
2. For each article, extract its number, its title (if any) and its full text.
3. Format the final output as a JSON array (list of objects) only.
4. Every object in the array represents one article and has exactly three keys:
   * "article_number": the article number as written (for example "Article 1").
   * "article_title": the article title, or null if the article has no title.
   * "article_text": the full text of the article, without number and title.

Do not add any text or explanation outside the JSON array."#;

const COMPARISON_PROMPT: &str = r#"You are an expert in comparative law. Your task is to analyse and compare legal texts precisely.

Task:
Analyse the target article from the base law (the first attached file) and compare it with every article of the comparison law (the second attached file) to find related articles.

Target article from the first file:
```json
{article_json}
```

Analysis instructions:
1. Focus on meaning: look for articles that address the same subject, serve the same legal purpose or contain similar provisions.
2. Be exhaustive: if several articles are similar, return all of them.
3. Be precise: if no article is clearly similar, the result MUST be an empty list []. Do not return unrelated articles.

Strict output rules (JSON only):
- The output MUST be a valid JSON list ([]).
- Each element is an object describing one similarity.
- Each object MUST contain exactly these keys:
    - "id": the exact "article_number" value of the similar article in the second file.
    - "title": the exact "article_title" value of that article (or null).
    - "reason": a short, clear explanation of the main points of similarity."#;

/// Comparison prompt with the base article embedded as pretty JSON.
pub fn comparison_prompt(article: &ArticleRecord) -> String {
    let article_json = serde_json::to_string_pretty(article)
        .unwrap_or_else(|_| article.article_text.clone());
    COMPARISON_PROMPT.replace("{article_json}", &article_json)
}
