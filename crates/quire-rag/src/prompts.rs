//! Prompt construction for the two model calls of a question.

use quire_core::{
  llm::ChatMessage,
  message::{Message, Role},
  vector::ScoredChunk,
};

/// Appended after the history to turn a follow-up into a search query.
pub const CONDENSE_INSTRUCTION: &str = "Given the above conversation, generate a search query to \
                                        look up in order to get information relevant to the \
                                        conversation";

const ANSWER_SYSTEM: &str = "Answer the user's questions based on the below context:\n\n";

/// Replay stored messages as prompt turns, oldest first.
pub fn history_turns(history: &[Message]) -> Vec<ChatMessage> {
  history
    .iter()
    .map(|m| match m.role {
      Role::Human => ChatMessage::user(m.message.clone()),
      Role::Ai => ChatMessage::assistant(m.message.clone()),
    })
    .collect()
}

pub fn condense(history: &[ChatMessage], question: &str) -> Vec<ChatMessage> {
  let mut prompt = history.to_vec();
  prompt.push(ChatMessage::user(question));
  prompt.push(ChatMessage::user(CONDENSE_INSTRUCTION));
  prompt
}

pub fn answer(history: &[ChatMessage], context: &[ScoredChunk], question: &str) -> Vec<ChatMessage> {
  let context = context
    .iter()
    .map(|c| c.chunk.text.as_str())
    .collect::<Vec<_>>()
    .join("\n\n");

  let mut prompt = Vec::with_capacity(history.len() + 2);
  prompt.push(ChatMessage::system(format!("{ANSWER_SYSTEM}{context}")));
  prompt.extend_from_slice(history);
  prompt.push(ChatMessage::user(question));
  prompt
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use quire_core::{llm::ChatRole, vector::Chunk};
  use uuid::Uuid;

  use super::*;

  fn msg(role: Role, text: &str) -> Message {
    Message {
      message_id:  Uuid::new_v4(),
      document_id: Uuid::nil(),
      role,
      message:     text.to_owned(),
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn history_maps_roles() {
    let turns = history_turns(&[msg(Role::Human, "q"), msg(Role::Ai, "a")]);
    assert_eq!(turns, vec![ChatMessage::user("q"), ChatMessage::assistant("a")]);
  }

  #[test]
  fn condense_ends_with_instruction() {
    let prompt = condense(&[ChatMessage::user("q"), ChatMessage::assistant("a")], "and then?");
    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[2], ChatMessage::user("and then?"));
    assert_eq!(prompt[3].content, CONDENSE_INSTRUCTION);
  }

  #[test]
  fn answer_puts_context_in_system_message() {
    let chunks = [
      ScoredChunk { chunk: Chunk { text: "alpha".into(), page: Some(1), index: 0 }, score: 0.9 },
      ScoredChunk { chunk: Chunk { text: "beta".into(), page: Some(2), index: 5 }, score: 0.5 },
    ];
    let prompt = answer(&[], &chunks, "what?");
    assert_eq!(prompt[0].role, ChatRole::System);
    assert!(prompt[0].content.ends_with("context:\n\nalpha\n\nbeta"));
    assert_eq!(prompt.last(), Some(&ChatMessage::user("what?")));
  }
}
