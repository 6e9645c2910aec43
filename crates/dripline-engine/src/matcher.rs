//! Recipient matcher — resolves a template's trigger criteria into the set
//! of candidate recipients for its tenant.

use std::collections::HashSet;
use std::sync::Arc;

use dripline_core::error::Result;
use dripline_core::traits::{KeywordIndex, RecipientStore};
use dripline_core::types::{FollowUpTemplate, Recipient};

/// Matches recipients against a template's trigger tags and keywords.
///
/// Tag matching is any-match against the directory. Keyword matching is a
/// capability consumed from an external text-matching collaborator; when no
/// index is wired, keyword triggers simply contribute nothing.
pub struct RecipientMatcher {
    recipients: Arc<dyn RecipientStore>,
    keywords: Option<Arc<dyn KeywordIndex>>,
}

impl RecipientMatcher {
    pub fn new(recipients: Arc<dyn RecipientStore>) -> Self {
        Self { recipients, keywords: None }
    }

    /// Wire the external keyword-matching collaborator.
    pub fn with_keyword_index(mut self, index: Arc<dyn KeywordIndex>) -> Self {
        self.keywords = Some(index);
        self
    }

    /// Candidate recipients for a template, de-duplicated by id.
    /// A template with no trigger criteria matches nobody — fail-closed.
    pub async fn match_recipients(&self, template: &FollowUpTemplate) -> Result<Vec<Recipient>> {
        let mut matched = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if !template.trigger_tags.is_empty() {
            for r in self
                .recipients
                .find_by_tags(&template.tenant_id, &template.trigger_tags)
                .await?
            {
                if seen.insert(r.id.clone()) {
                    matched.push(r);
                }
            }
        }

        if !template.trigger_keywords.is_empty() {
            if let Some(index) = &self.keywords {
                for r in index
                    .find_by_keywords(&template.tenant_id, &template.trigger_keywords)
                    .await?
                {
                    if seen.insert(r.id.clone()) {
                        matched.push(r);
                    }
                }
            } else {
                tracing::debug!(
                    "template {} has keyword triggers but no keyword index is wired",
                    template.id
                );
            }
        }

        Ok(matched)
    }
}
