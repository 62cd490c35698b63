//! Prompt assembly: grounding instruction, trimmed history, final turn.

use serde::{Deserialize, Serialize};

use supportchat_core::config::{PromptConfig, SystemInstructionMode};
use supportchat_core::types::{Document, Message, Role};

/// Role names understood by the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    User,
    Model,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderRole::User => "user",
            ProviderRole::Model => "model",
        }
    }
}

impl From<Role> for ProviderRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ProviderRole::User,
            Role::Assistant => ProviderRole::Model,
        }
    }
}

/// One history entry in provider terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTurn {
    pub role: ProviderRole,
    pub content: String,
}

/// Everything the completion client needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// Set only in separate mode; inline mode folds it into `final_prompt`.
    pub system_instruction: Option<String>,
    /// Prior turns, oldest first, starting with a user turn (or empty).
    pub history: Vec<ProviderTurn>,
    /// Sent as the last user turn.
    pub final_prompt: String,
}

/// Builds provider requests from retrieved documents and session history.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    history_limit: usize,
    mode: SystemInstructionMode,
    repeat_query: bool,
}

impl PromptAssembler {
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            mode: config.system_instruction_mode,
            repeat_query: config.repeat_query_in_history,
        }
    }

    /// Assemble the request for `query`.
    ///
    /// `prior` holds the session's stored messages, not including the turn
    /// being answered. The history window counts that pending turn as its
    /// newest slot. That turn travels as `final_prompt` and is left out of
    /// the history unless `repeat_query_in_history` is set.
    pub fn assemble(&self, docs: &[Document], prior: &[Message], query: &str) -> AssembledPrompt {
        let instruction = system_instruction(docs);
        let window = self.history_limit.saturating_sub(1);
        let start = prior.len().saturating_sub(window);
        let mut recent = prior[start..].to_vec();
        if self.repeat_query && self.history_limit > 0 {
            recent.push(Message::user(query));
        }
        let history = to_provider_history(&recent);

        match self.mode {
            SystemInstructionMode::Inline => AssembledPrompt {
                system_instruction: None,
                history,
                final_prompt: format!("{}\n\nUser Question: {}", instruction, query),
            },
            SystemInstructionMode::Separate => AssembledPrompt {
                system_instruction: Some(instruction),
                history,
                final_prompt: query.to_string(),
            },
        }
    }
}

/// Serialize documents as `Title: ..\nContent: ..` blocks separated by a blank line.
pub fn render_context(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| format!("Title: {}\nContent: {}", d.title, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The grounding instruction with the rendered context inlined.
pub fn system_instruction(docs: &[Document]) -> String {
    format!(
        "You are a helpful customer support AI.\n\
         Use the following context to answer the user's question.\n\
         If the answer is not in the context, answer generally but mention that it's general knowledge.\n\
         \n\
         Context:\n{}",
        render_context(docs)
    )
}

/// Drop blank turns, map roles, then strip leading model turns.
pub fn to_provider_history(messages: &[Message]) -> Vec<ProviderTurn> {
    let turns: Vec<ProviderTurn> = messages
        .iter()
        .filter(|m| !m.is_blank())
        .map(|m| ProviderTurn {
            role: m.role.into(),
            content: m.content.clone(),
        })
        .collect();

    // The provider rejects a history that opens with a model turn.
    let first_user = turns
        .iter()
        .position(|t| t.role == ProviderRole::User)
        .unwrap_or(turns.len());
    turns.into_iter().skip(first_user).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler(limit: usize, mode: SystemInstructionMode) -> PromptAssembler {
        PromptAssembler::new(&PromptConfig {
            history_limit: limit,
            system_instruction_mode: mode,
            repeat_query_in_history: false,
        })
    }

    fn repeating_assembler(limit: usize) -> PromptAssembler {
        PromptAssembler::new(&PromptConfig {
            history_limit: limit,
            system_instruction_mode: SystemInstructionMode::Inline,
            repeat_query_in_history: true,
        })
    }

    fn alternating(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{}", i))
                } else {
                    Message::assistant(format!("a{}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_render_context_blocks() {
        let docs = vec![
            Document::new("Returns", "30 days"),
            Document::new("Shipping", "2 days"),
        ];
        assert_eq!(
            render_context(&docs),
            "Title: Returns\nContent: 30 days\n\nTitle: Shipping\nContent: 2 days"
        );
        assert_eq!(render_context(&[]), "");
    }

    #[test]
    fn test_system_instruction_mentions_general_knowledge() {
        let text = system_instruction(&[Document::new("Returns", "30 days")]);
        assert!(text.starts_with("You are a helpful customer support AI."));
        assert!(text.contains("general knowledge"));
        assert!(text.ends_with("Context:\nTitle: Returns\nContent: 30 days"));
    }

    #[test]
    fn test_inline_final_prompt() {
        let prompt = assembler(10, SystemInstructionMode::Inline).assemble(&[], &[], "hello");
        assert!(prompt.system_instruction.is_none());
        assert!(prompt.history.is_empty());
        assert!(prompt.final_prompt.ends_with("\n\nUser Question: hello"));
        assert!(prompt.final_prompt.starts_with("You are a helpful customer support AI."));
    }

    #[test]
    fn test_separate_mode() {
        let docs = vec![Document::new("Returns", "30 days")];
        let prompt =
            assembler(10, SystemInstructionMode::Separate).assemble(&docs, &[], "refund please");
        assert_eq!(prompt.final_prompt, "refund please");
        let instruction = prompt.system_instruction.unwrap();
        assert!(instruction.contains("Title: Returns"));
    }

    #[test]
    fn test_role_mapping() {
        let history = to_provider_history(&[Message::user("q"), Message::assistant("a")]);
        assert_eq!(
            history,
            vec![
                ProviderTurn {
                    role: ProviderRole::User,
                    content: "q".to_string()
                },
                ProviderTurn {
                    role: ProviderRole::Model,
                    content: "a".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_blank_messages_filtered() {
        let history = to_provider_history(&[
            Message::user("q"),
            Message::assistant("   "),
            Message::user(""),
            Message::assistant("a"),
        ]);
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| !t.content.trim().is_empty()));
    }

    #[test]
    fn test_leading_model_turns_dropped() {
        let history = to_provider_history(&[
            Message::assistant("a1"),
            Message::assistant("a2"),
            Message::user("q"),
            Message::assistant("a3"),
        ]);
        assert_eq!(history[0].role, ProviderRole::User);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_only_model_turns_yield_empty_history() {
        let history = to_provider_history(&[Message::assistant("a1"), Message::assistant("a2")]);
        assert!(history.is_empty());
    }

    #[test]
    fn test_leading_fix_up_after_blank_user_turn() {
        let history = to_provider_history(&[
            Message::user(" "),
            Message::assistant("a1"),
            Message::user("q"),
        ]);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "q");
    }

    #[test]
    fn test_history_window_counts_pending_turn() {
        // 12 prior + 1 pending: the window of 10 keeps the newest 9 prior.
        let prior = alternating(12);
        let prompt = assembler(10, SystemInstructionMode::Inline).assemble(&[], &prior, "next");

        // prior[3..] is a3..u11; the leading model turn a3 is dropped.
        let contents: Vec<&str> = prompt.history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["u4", "a5", "u6", "a7", "u8", "a9", "u10", "a11"]);
        assert!(prompt.history.len() < 10);
    }

    #[test]
    fn test_short_history_kept_whole() {
        let prior = alternating(4);
        let prompt = assembler(10, SystemInstructionMode::Inline).assemble(&[], &prior, "next");
        assert_eq!(prompt.history.len(), 4);
    }

    #[test]
    fn test_repeat_query_appends_pending_turn() {
        let prior = alternating(12);
        let prompt = repeating_assembler(10).assemble(&[], &prior, "next");

        let contents: Vec<&str> = prompt.history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["u4", "a5", "u6", "a7", "u8", "a9", "u10", "a11", "next"]
        );
        assert_eq!(prompt.history.last().map(|t| t.role), Some(ProviderRole::User));
        assert!(prompt.final_prompt.ends_with("User Question: next"));
    }

    #[test]
    fn test_repeat_query_on_empty_session() {
        let prompt = repeating_assembler(10).assemble(&[], &[], "hello");
        assert_eq!(
            prompt.history,
            vec![ProviderTurn {
                role: ProviderRole::User,
                content: "hello".to_string()
            }]
        );
        assert!(repeating_assembler(0)
            .assemble(&[], &[], "hello")
            .history
            .is_empty());
    }

    #[test]
    fn test_history_limit_zero_or_one() {
        let prior = alternating(4);
        for limit in [0, 1] {
            let prompt =
                assembler(limit, SystemInstructionMode::Inline).assemble(&[], &prior, "next");
            assert!(prompt.history.is_empty());
        }
    }
}
