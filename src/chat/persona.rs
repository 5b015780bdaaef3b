use std::collections::{BTreeMap, HashMap};

use crate::utils::toml_config::PersonaConfig;

/// A named system prompt constraining the assistant's scope and voice.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub key: String,
    pub name: String,
    pub system_prompt: String,
    pub welcome: Option<String>,
}

/// Personas available to sessions, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Persona>,
}

impl PersonaRegistry {
    pub fn from_config(config: &HashMap<String, PersonaConfig>) -> Self {
        let personas = config
            .iter()
            .map(|(key, p)| {
                (
                    key.clone(),
                    Persona {
                        key: key.clone(),
                        name: p.name.clone().unwrap_or_else(|| key.clone()),
                        system_prompt: p.system_prompt.clone(),
                        welcome: p.welcome.clone(),
                    },
                )
            })
            .collect();
        Self { personas }
    }

    pub fn get(&self, key: &str) -> Option<&Persona> {
        self.personas.get(key)
    }

    pub fn list(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
