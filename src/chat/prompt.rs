//! System prompt assembly.

use crate::memory::NO_MEMORIES;

/// Build the system prompt for one turn.
///
/// A persona prompt, when present, is used verbatim: personas carry their own
/// scope rules and receive no retrieved memory. Otherwise the memory template
/// is filled with `known_facts` (or `None.` when there are none), optionally
/// naming the current user.
pub fn build_system_prompt(
    known_facts: &str,
    persona_prompt: Option<&str>,
    identity: Option<&str>,
) -> String {
    if let Some(persona) = persona_prompt {
        return persona.to_string();
    }

    let facts = if known_facts.trim().is_empty() {
        NO_MEMORIES
    } else {
        known_facts
    };

    let mut prompt = String::from("You are a helpful assistant with access to user memory.\n");
    if let Some(id) = identity {
        prompt.push_str(&format!("Current user identity: {}\n", id));
    }
    prompt.push_str(&format!(
        "Known facts about the user:\n\
         {}\n\
         \n\
         Instructions:\n\
         1. Use known facts if relevant to make the conversation personalized.\n\
         2. Be concise and helpful.\n\
         3. Do not ask for information you already know.\n",
        facts
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_template() {
        let prompt = build_system_prompt("- likes tea", None, None);
        assert_eq!(
            prompt,
            "You are a helpful assistant with access to user memory.\n\
             Known facts about the user:\n\
             - likes tea\n\
             \n\
             Instructions:\n\
             1. Use known facts if relevant to make the conversation personalized.\n\
             2. Be concise and helpful.\n\
             3. Do not ask for information you already know.\n"
        );
    }

    #[test]
    fn test_empty_facts_render_sentinel() {
        let prompt = build_system_prompt("", None, None);
        assert!(prompt.contains("Known facts about the user:\nNone.\n"));
    }

    #[test]
    fn test_identity_line() {
        let prompt = build_system_prompt("None.", None, Some("Alex"));
        assert!(prompt.starts_with(
            "You are a helpful assistant with access to user memory.\nCurrent user identity: Alex\n"
        ));
    }

    #[test]
    fn test_persona_replaces_template() {
        let prompt = build_system_prompt("- likes tea", Some("You are a chef."), Some("Alex"));
        assert_eq!(prompt, "You are a chef.");
    }
}
