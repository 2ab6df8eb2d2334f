use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::{
    error::{Result, StoryframeError},
    provider::ProviderSettings,
    types::Tag,
};

/// In-memory state of one working session, passed by reference into the pipeline.
#[derive(Debug, Default)]
pub struct Session {
    tags: Vec<Tag>,
    pub provider: ProviderSettings,
}

impl Session {
    pub fn new(provider: ProviderSettings) -> Self {
        Self {
            tags: Vec::new(),
            provider,
        }
    }

    /// Tags in insertion order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn get(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn add_tag(&mut self, timestamp: f64, label: Option<String>) -> Result<&Tag> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(StoryframeError::InvalidTimestamp(timestamp));
        }

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        self.tags.push(Tag {
            id: Uuid::new_v4().to_string(),
            timestamp,
            label: label.filter(|l| !l.trim().is_empty()),
            created_at,
        });

        Ok(&self.tags[self.tags.len() - 1])
    }

    /// Labels are the only part of a tag that can change.
    pub fn relabel(&mut self, id: &str, label: Option<String>) -> bool {
        match self.tags.iter_mut().find(|t| t.id == id) {
            Some(tag) => {
                tag.label = label.filter(|l| !l.trim().is_empty());
                true
            }
            None => false,
        }
    }

    pub fn remove_tag(&mut self, id: &str) -> Option<Tag> {
        let index = self.tags.iter().position(|t| t.id == id)?;
        Some(self.tags.remove(index))
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }
}
