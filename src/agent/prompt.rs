//! System prompts and user-message builders for the research agent.
//!
//! Each [`QueryMode`] has its own system prompt, selected through a
//! [`PromptId`] from the capability table. The user message wraps the
//! question with mode-specific working instructions.

use std::path::{Path, PathBuf};

use super::capability::QueryMode;

/// System prompt for narrative (MLA) answers.
pub const NARRATIVE_SYSTEM_PROMPT: &str = r#"You are a research assistant that answers questions using Wikipedia.

## Workflow

1. Search Wikipedia for articles relevant to the question. Prefer `search_and_retrieve_articles`, which returns article text together with ready-made MLA citations.
2. Read the returned articles. Use `get_wikipedia_article` when one specific article deserves a closer look, and `format_mla_citation` to cite an article you fetched that way.
3. Write a clear, well-organized answer grounded only in the retrieved text.

## Citations

- Cite in the body with MLA parenthetical references using the article title, e.g. ("Quantum computing").
- End the answer with a "Works Cited" section listing every article you relied on, copying the citations the tools produced.
- Never invent sources, titles, dates or URLs.

## Rules

- If the articles do not answer the question, say so plainly instead of guessing.
- Do not mention tools or tool calls in the answer."#;

/// System prompt for structured (fact extraction) answers.
pub const STRUCTURED_SYSTEM_PROMPT: &str = r#"You are a research assistant that extracts verifiable facts from Wikipedia.

## Workflow

1. Call `search_and_retrieve_articles_json` to fetch articles relevant to the question. Every article is labelled with a SOURCE ID such as `source_1`.
2. Read the articles carefully.
3. Call `record_fact` once for each relevant fact you find, with:
   - `fact`: one specific, self-contained statement
   - `source_ids`: the SOURCE IDs of the articles that support it
   - `category`: one of `definition`, `history`, `application`, `technical`, `other`
4. When you have recorded every relevant fact, reply with a short note that you are done.

## Rules

- Only use SOURCE IDs that appeared in a tool result. A fact citing an unknown ID is rejected; read the error and try again with a valid ID.
- Record facts through `record_fact` only. Facts written in your reply are discarded.
- Prefer several precise facts over one long one."#;

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/wiki-agent/prompts";

/// Filename for the narrative prompt template.
const NARRATIVE_FILENAME: &str = "narrative.md";
/// Filename for the structured prompt template.
const STRUCTURED_FILENAME: &str = "structured.md";

/// Identifies a system prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Narrative answer prompt.
    Narrative,
    /// Fact extraction prompt.
    Structured,
}

/// System prompts for every mode.
///
/// Loaded from template files when available, falling back to compiled-in
/// defaults per file.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Narrative system prompt.
    pub narrative: String,
    /// Structured system prompt.
    pub structured: String,
}

impl PromptSet {
    /// Loads prompts from `prompt_dir`, or from the default directory when
    /// `None`. Each missing file uses its compiled-in default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            narrative: load_file(NARRATIVE_FILENAME, NARRATIVE_SYSTEM_PROMPT),
            structured: load_file(STRUCTURED_FILENAME, STRUCTURED_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            narrative: NARRATIVE_SYSTEM_PROMPT.to_string(),
            structured: STRUCTURED_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Returns the prompt for `id`.
    #[must_use]
    pub fn get(&self, id: PromptId) -> &str {
        match id {
            PromptId::Narrative => &self.narrative,
            PromptId::Structured => &self.structured,
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (NARRATIVE_FILENAME, NARRATIVE_SYSTEM_PROMPT),
            (STRUCTURED_FILENAME, STRUCTURED_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for a question in the given mode.
#[must_use]
pub fn build_user_prompt(question: &str, mode: QueryMode) -> String {
    let steps = match mode {
        QueryMode::Narrative => {
            "1. Use the search_and_retrieve_articles tool to find relevant Wikipedia articles.\n\
             2. Analyze the articles carefully.\n\
             3. Provide a comprehensive answer based on the information found.\n\
             4. Include MLA citations in the text and a Works Cited list at the end, \
             using the citations provided by the tool."
        }
        QueryMode::Structured => {
            "1. Use the search_and_retrieve_articles_json tool to find relevant Wikipedia articles.\n\
             2. Read through the articles carefully.\n\
             3. Call record_fact once for each important fact, giving the fact, the SOURCE IDs \
             that support it, and its category (definition, history, application, technical \
             or other).\n\
             4. Extract as many relevant facts as you can find, then say you are finished."
        }
    };
    format!("User Question: {question}\n\nInstructions:\n{steps}\n")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_prompt_narrative() {
        let prompt = build_user_prompt("What is a qubit?", QueryMode::Narrative);
        assert!(prompt.starts_with("User Question: What is a qubit?"));
        assert!(prompt.contains("search_and_retrieve_articles tool"));
        assert!(prompt.contains("Works Cited"));
        assert!(!prompt.contains("record_fact"));
    }

    #[test]
    fn test_build_user_prompt_structured() {
        let prompt = build_user_prompt("What is a qubit?", QueryMode::Structured);
        assert!(prompt.contains("search_and_retrieve_articles_json"));
        assert!(prompt.contains("record_fact"));
    }

    #[test]
    fn test_get_by_id() {
        let prompts = PromptSet::defaults();
        assert_eq!(prompts.get(PromptId::Narrative), NARRATIVE_SYSTEM_PROMPT);
        assert_eq!(prompts.get(PromptId::Structured), STRUCTURED_SYSTEM_PROMPT);
    }

    #[test]
    fn test_load_overrides_per_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(STRUCTURED_FILENAME), "custom structured")
            .unwrap_or_else(|e| panic!("write: {e}"));

        let prompts = PromptSet::load(Some(dir.path()));
        assert_eq!(prompts.structured, "custom structured");
        assert_eq!(prompts.narrative, NARRATIVE_SYSTEM_PROMPT);
    }

    #[test]
    fn test_write_defaults_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(NARRATIVE_FILENAME), "mine")
            .unwrap_or_else(|e| panic!("write: {e}"));

        let written =
            PromptSet::write_defaults(dir.path()).unwrap_or_else(|e| panic!("write: {e}"));
        assert_eq!(written, vec![dir.path().join(STRUCTURED_FILENAME)]);

        let kept = std::fs::read_to_string(dir.path().join(NARRATIVE_FILENAME))
            .unwrap_or_else(|e| panic!("read: {e}"));
        assert_eq!(kept, "mine");
    }

    #[test]
    fn test_prompts_not_empty() {
        assert!(!NARRATIVE_SYSTEM_PROMPT.is_empty());
        assert!(!STRUCTURED_SYSTEM_PROMPT.is_empty());
    }
}
