use crate::error::Result;
use crate::models::{FieldSpec, ProgressEvent, ProgressSink};

use super::config_store::ConfigStore;

/// Interactive input source. Reads resolve once a line is entered; an
/// exhausted or broken input stream is an `Input` error.
#[allow(async_fn_in_trait)]
pub trait Prompter {
    async fn read_line(&mut self, label: &str) -> Result<String>;

    /// Like `read_line`, without echoing what is typed.
    async fn read_secret(&mut self, label: &str) -> Result<String>;

    /// Show a short notice between prompts.
    fn notice(&mut self, message: &str);
}

/// Ask for one field until it resolves. Required fields re-prompt on empty
/// input; optional fields fall back to their default, which may be empty.
pub async fn ask<P: Prompter>(prompter: &mut P, field: &FieldSpec) -> Result<String> {
    let label = field.label();
    loop {
        let input = if field.secret {
            let raw = prompter.read_secret(&label).await?;
            raw.trim_end_matches(['\r', '\n']).to_string()
        } else {
            prompter.read_line(&label).await?.trim().to_string()
        };

        if !input.trim().is_empty() {
            return Ok(input);
        }
        if !field.required {
            return Ok(field.default_value().unwrap_or_default().to_string());
        }
        prompter.notice(&format!("{} is required.", field.description));
    }
}

/// Fills the gaps in a [`ConfigStore`] from a fixed field table.
pub struct PromptCollector<'a> {
    fields: &'a [FieldSpec],
}

impl<'a> PromptCollector<'a> {
    pub fn new(fields: &'a [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Fields that have no value yet.
    pub fn pending(&self, store: &ConfigStore) -> Vec<&'a FieldSpec> {
        self.fields
            .iter()
            .filter(|f| store.get(f.key).is_none())
            .collect()
    }

    /// Prompt for every pending field, persisting each answer as soon as it is
    /// given. Returns whether any value was written.
    pub async fn collect<P, S>(
        &self,
        store: &mut ConfigStore,
        prompter: &mut P,
        sink: &mut S,
    ) -> Result<bool>
    where
        P: Prompter,
        S: ProgressSink,
    {
        let mut collected = false;
        for field in self.fields {
            if store.get(field.key).is_some() {
                tracing::debug!(key = field.key, "field_already_set");
                continue;
            }
            let value = ask(prompter, field).await?;
            if value.is_empty() {
                tracing::debug!(key = field.key, "optional_field_left_unset");
                continue;
            }
            store.set(field.key, &value).await?;
            sink.emit(ProgressEvent::FieldCollected {
                key: field.key.to_string(),
            });
            collected = true;
        }
        Ok(collected)
    }
}
