//! System prompts and template builders for agents.
//!
//! Prompts are the core instructions that define each agent's behavior.
//! Template builders format user messages with the query and evidence.

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// System prompt for the query decomposer.
pub const DECOMPOSER_SYSTEM_PROMPT: &str = r#"You are a research planning assistant. You break a user's question into the smallest set of focused sub-questions that, answered together, fully answer the original question.

## Instructions

1. Read the question inside the <query> tag.
2. Identify each distinct piece of information the answer depends on.
3. Write one self-contained sub-question per piece. Each sub-question must make sense on its own, without the original question for context.
4. Order sub-questions so that foundational facts come before the questions that build on them.
5. If the question is already atomic, return it unchanged as the only element.

## Output Format (JSON)

Return a JSON array of strings and nothing else:
```json
["first sub-question", "second sub-question"]
```

## Rules

- Never answer the question yourself.
- Do not invent topics the question does not ask about.
- Prefer 1 to 5 sub-questions.
- Return ONLY the JSON array, no surrounding text."#;

/// System prompt for the sufficiency evaluator.
pub const EVALUATOR_SYSTEM_PROMPT: &str = r"You are an evidence reviewer. You decide whether retrieved passages contain enough information to answer a specific question.

## Instructions

1. Read the question inside the <sub_query> tag.
2. Read every passage inside the <chunks> tag.
3. Decide whether the passages, taken together, let a careful reader answer the question accurately and specifically.
4. If they do not, say briefly what is missing.

## Output Format

Reply with exactly these two lines:

SUFFICIENCY: YES or NO
FEEDBACK: <one sentence describing what is missing, or empty when YES>

## Rules

- Judge only the passages given. Do not use outside knowledge.
- Partial, tangential, or vague passages are NOT sufficient.
- Do not add any other text.";

/// System prompt for the answer synthesizer.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = r"You are a synthesis expert. You write a complete, accurate answer to the user's question using only the evidence you are given.

## Instructions

1. Read the question inside the <query> tag.
2. Read the evidence passages inside the <evidence> tag.
3. Answer the question thoroughly, drawing every claim from the evidence.
4. The <unanswerable> tag lists sub-questions for which no sufficient evidence was found. Acknowledge these gaps explicitly instead of guessing.
5. Note contradictions between passages when they exist.

## Rules

- Do not introduce facts that are not in the evidence.
- Preserve concrete details: names, figures, dates, definitions.
- Write plain prose or markdown. Do not wrap the answer in code fences.";

/// System prompt for the report formatter.
pub const FORMATTER_SYSTEM_PROMPT: &str = r"You are an editor. You turn a draft answer into a clean, well-structured report for the reader.

## Instructions

1. Read the draft inside the <draft> tag.
2. Reorganize it with a short summary first, followed by sections or bullet points where they help.
3. Fix grammar, remove repetition, and keep the tone neutral.
4. Keep every fact, caveat, and acknowledged gap from the draft.

## Rules

- Do not add new information.
- Do not remove statements about missing information.
- Return only the formatted report in markdown.";

/// System prompt for the faithfulness judge.
pub const FAITHFULNESS_SYSTEM_PROMPT: &str = r"You are an impartial judge. You grade how faithful an answer is to the context it was generated from.

## Instructions

1. Read the question inside the <query> tag, the answer inside the <answer> tag, and the source context inside the <context> tag.
2. Check every claim in the answer against the context.
3. Penalize claims that are unsupported by or contradict the context.

## Output Format

Reply with exactly these two lines:

SCORE: <integer from 1 to 10>
REASONING: <one or two sentences>

A score of 10 means every claim is supported by the context. A score of 1 means the answer is unrelated to or contradicts the context.";

/// System prompt for the answer-relevance judge.
pub const RELEVANCE_SYSTEM_PROMPT: &str = r"You are an impartial judge. You grade how well an answer addresses the question that was asked.

## Instructions

1. Read the question inside the <query> tag and the answer inside the <answer> tag.
2. Decide whether the answer addresses every part of the question directly.
3. Penalize evasive, off-topic, or padded answers.

## Output Format

Reply with exactly these two lines:

SCORE: <integer from 1 to 10>
REASONING: <one or two sentences>

A score of 10 means the answer fully and directly addresses the question. A score of 1 means it does not address the question at all.";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/rag-agent/prompts";

/// Filename for the decomposer prompt template.
const DECOMPOSER_FILENAME: &str = "decomposer.md";
/// Filename for the evaluator prompt template.
const EVALUATOR_FILENAME: &str = "evaluator.md";
/// Filename for the synthesizer prompt template.
const SYNTHESIZER_FILENAME: &str = "synthesizer.md";
/// Filename for the formatter prompt template.
const FORMATTER_FILENAME: &str = "formatter.md";
/// Filename for the faithfulness judge prompt template.
const FAITHFULNESS_FILENAME: &str = "faithfulness.md";
/// Filename for the relevance judge prompt template.
const RELEVANCE_FILENAME: &str = "relevance.md";

/// A set of system prompts for all agents.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from CLI flags, environment variables, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the decomposer.
    pub decomposer: String,
    /// System prompt for the sufficiency evaluator.
    pub evaluator: String,
    /// System prompt for the synthesizer.
    pub synthesizer: String,
    /// System prompt for the formatter.
    pub formatter: String,
    /// System prompt for the faithfulness judge.
    pub faithfulness: String,
    /// System prompt for the answer-relevance judge.
    pub relevance: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument (from `--prompt-dir` or config)
    /// 2. `RAG_PROMPT_DIR` environment variable
    /// 3. `~/.config/rag-agent/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("RAG_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|content| !content.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            decomposer: load_file(DECOMPOSER_FILENAME, DECOMPOSER_SYSTEM_PROMPT),
            evaluator: load_file(EVALUATOR_FILENAME, EVALUATOR_SYSTEM_PROMPT),
            synthesizer: load_file(SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
            formatter: load_file(FORMATTER_FILENAME, FORMATTER_SYSTEM_PROMPT),
            faithfulness: load_file(FAITHFULNESS_FILENAME, FAITHFULNESS_SYSTEM_PROMPT),
            relevance: load_file(RELEVANCE_FILENAME, RELEVANCE_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            decomposer: DECOMPOSER_SYSTEM_PROMPT.to_string(),
            evaluator: EVALUATOR_SYSTEM_PROMPT.to_string(),
            synthesizer: SYNTHESIZER_SYSTEM_PROMPT.to_string(),
            formatter: FORMATTER_SYSTEM_PROMPT.to_string(),
            faithfulness: FAITHFULNESS_SYSTEM_PROMPT.to_string(),
            relevance: RELEVANCE_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten; use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (DECOMPOSER_FILENAME, DECOMPOSER_SYSTEM_PROMPT),
            (EVALUATOR_FILENAME, EVALUATOR_SYSTEM_PROMPT),
            (SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
            (FORMATTER_FILENAME, FORMATTER_SYSTEM_PROMPT),
            (FAITHFULNESS_FILENAME, FAITHFULNESS_SYSTEM_PROMPT),
            (RELEVANCE_FILENAME, RELEVANCE_SYSTEM_PROMPT),
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
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for the decomposer.
pub fn build_decomposer_prompt(query: &str) -> String {
    format!(
        "<query>{query}</query>\n\n\
         Decompose this question into sub-questions."
    )
}

/// Builds the user message for the sufficiency evaluator.
///
/// `evidence` is the retrieved chunk content, already joined.
pub fn build_evaluator_prompt(sub_query: &str, evidence: &str) -> String {
    format!(
        "<sub_query>{sub_query}</sub_query>\n\n\
         <chunks>\n{evidence}\n</chunks>\n\n\
         Are these passages sufficient to answer the question?"
    )
}

/// Builds the user message for the synthesizer.
///
/// Unanswerable sub-queries are rendered as a bulleted list, or `None`
/// when every sub-query was resolved.
pub fn build_synthesizer_prompt(query: &str, evidence: &str, unanswerable: &[String]) -> String {
    let mut gaps = String::new();
    if unanswerable.is_empty() {
        gaps.push_str("None");
    } else {
        for (i, sub_query) in unanswerable.iter().enumerate() {
            if i > 0 {
                gaps.push('\n');
            }
            let _ = write!(gaps, "- {sub_query}");
        }
    }

    format!(
        "<query>{query}</query>\n\n\
         <evidence>\n{evidence}\n</evidence>\n\n\
         <unanswerable>\n{gaps}\n</unanswerable>\n\n\
         Write a draft answer that acknowledges any gaps."
    )
}

/// Builds the user message for the formatter.
pub fn build_formatter_prompt(draft: &str) -> String {
    format!(
        "<draft>\n{draft}\n</draft>\n\n\
         Format this draft as the final report."
    )
}

/// Builds the user message for the faithfulness judge.
pub fn build_faithfulness_prompt(query: &str, answer: &str, context: &str) -> String {
    format!(
        "<query>{query}</query>\n\n\
         <answer>\n{answer}\n</answer>\n\n\
         <context>\n{context}\n</context>"
    )
}

/// Builds the user message for the answer-relevance judge.
pub fn build_relevance_prompt(query: &str, answer: &str) -> String {
    format!(
        "<query>{query}</query>\n\n\
         <answer>\n{answer}\n</answer>"
    )
}
