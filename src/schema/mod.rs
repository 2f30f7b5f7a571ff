//! Prompt schema resolution
//!
//! Organizations define, per meeting type, an ordered set of named categories
//! with instruction text; individual users can layer personal categories on
//! top. The resolved schema decides the exact field set of each meeting
//! summary at processing time.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// The category whose instruction becomes framing prose for the model rather
/// than an output field.
pub const INITIAL_CONTEXT: &str = "Initial Context";

/// An ordered set of (category -> instruction) pairs for one meeting type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSchema {
    pub meeting_type: String,
    /// Order matters: it fixes the order of summary fields.
    pub entries: Vec<(String, String)>,
}

impl PromptSchema {
    pub fn new(meeting_type: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        Self {
            meeting_type: meeting_type.into(),
            entries,
        }
    }
}

/// Result of merging the company-wide schema with a user's personal one.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    /// Prose framing for the model, taken from "Initial Context" entries.
    pub framing: String,
    /// Output fields the summarizer must populate, in order.
    pub categories: Vec<(String, String)>,
}

impl ResolvedSchema {
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Lookup of stored prompt schemas by organization / meeting type / user.
#[async_trait::async_trait]
pub trait SchemaStore: Send + Sync {
    /// Company-wide schema for a meeting type, if one exists.
    async fn company_schema(&self, org_id: &str, meeting_type: &str)
        -> Result<Option<PromptSchema>>;

    /// Any company-wide schema for the organization (fallback when the
    /// meeting type has none).
    async fn any_company_schema(&self, org_id: &str) -> Result<Option<PromptSchema>>;

    /// A user's personal schema for a meeting type, if one exists.
    async fn personal_schema(
        &self,
        org_id: &str,
        meeting_type: &str,
        user_id: &str,
    ) -> Result<Option<PromptSchema>>;
}

/// Merge a personal schema over a company-wide one and split out the framing
/// text.
///
/// Company order is kept; a personal instruction wins on a category-name
/// conflict; personal-only categories append in their own order.
pub fn resolve(
    company: Option<PromptSchema>,
    personal: Option<PromptSchema>,
) -> ResolvedSchema {
    let mut merged: Vec<(String, String)> = Vec::new();

    if let Some(company) = company {
        merged.extend(company.entries);
    }

    if let Some(personal) = personal {
        for (name, instruction) in personal.entries {
            if let Some(slot) = merged.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = instruction;
            } else {
                merged.push((name, instruction));
            }
        }
    }

    let mut framing = String::new();
    let mut categories = Vec::new();

    for (name, instruction) in merged {
        if name == INITIAL_CONTEXT {
            framing.push_str(&instruction);
            framing.push('\n');
        } else {
            categories.push((name, instruction));
        }
    }

    ResolvedSchema { framing, categories }
}

/// Resolve the schema for one meeting through a `SchemaStore`.
pub async fn resolve_for(
    store: &dyn SchemaStore,
    org_id: &str,
    meeting_type: &str,
    user_id: &str,
) -> Result<ResolvedSchema> {
    let company = match store.company_schema(org_id, meeting_type).await? {
        Some(schema) => Some(schema),
        None => store.any_company_schema(org_id).await?,
    };

    let personal = store.personal_schema(org_id, meeting_type, user_id).await?;

    let resolved = resolve(company, personal);
    info!(
        "Resolved schema for org={} type={}: {} categories",
        org_id,
        meeting_type,
        resolved.categories.len()
    );

    Ok(resolved)
}

/// In-memory schema store, keyed by `(org_id, meeting_type)` for the company
/// scope and `(org_id, meeting_type, user_id)` for the personal scope.
#[derive(Default)]
pub struct InMemorySchemaStore {
    company: Arc<RwLock<HashMap<(String, String), PromptSchema>>>,
    personal: Arc<RwLock<HashMap<(String, String, String), PromptSchema>>>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_company(&self, org_id: &str, schema: PromptSchema) {
        let mut company = self.company.write().await;
        company.insert((org_id.to_string(), schema.meeting_type.clone()), schema);
    }

    pub async fn insert_personal(&self, org_id: &str, user_id: &str, schema: PromptSchema) {
        let mut personal = self.personal.write().await;
        personal.insert(
            (
                org_id.to_string(),
                schema.meeting_type.clone(),
                user_id.to_string(),
            ),
            schema,
        );
    }
}

#[async_trait::async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn company_schema(
        &self,
        org_id: &str,
        meeting_type: &str,
    ) -> Result<Option<PromptSchema>> {
        let company = self.company.read().await;
        Ok(company
            .get(&(org_id.to_string(), meeting_type.to_string()))
            .cloned())
    }

    async fn any_company_schema(&self, org_id: &str) -> Result<Option<PromptSchema>> {
        let company = self.company.read().await;
        let mut candidates: Vec<_> = company
            .iter()
            .filter(|((org, _), _)| org == org_id)
            .collect();
        // Deterministic fallback when several meeting types exist.
        candidates.sort_by(|((_, a), _), ((_, b), _)| a.cmp(b));
        Ok(candidates.first().map(|(_, schema)| (*schema).clone()))
    }

    async fn personal_schema(
        &self,
        org_id: &str,
        meeting_type: &str,
        user_id: &str,
    ) -> Result<Option<PromptSchema>> {
        let personal = self.personal.read().await;
        Ok(personal
            .get(&(
                org_id.to_string(),
                meeting_type.to_string(),
                user_id.to_string(),
            ))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(entries: &[(&str, &str)]) -> PromptSchema {
        PromptSchema::new(
            "One-on-One",
            entries
                .iter()
                .map(|(n, i)| (n.to_string(), i.to_string()))
                .collect(),
        )
    }

    #[test]
    fn personal_overrides_and_extends_company() {
        let company = schema(&[("A", "a"), ("B", "b")]);
        let personal = schema(&[("B", "b2"), ("C", "c")]);

        let resolved = resolve(Some(company), Some(personal));

        assert_eq!(
            resolved.categories,
            vec![
                ("A".to_string(), "a".to_string()),
                ("B".to_string(), "b2".to_string()),
                ("C".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn initial_context_becomes_framing_not_a_field() {
        let company = schema(&[(INITIAL_CONTEXT, "You are reviewing a 1:1."), ("A", "a")]);

        let resolved = resolve(Some(company), None);

        assert_eq!(resolved.framing, "You are reviewing a 1:1.\n");
        assert_eq!(resolved.category_names(), vec!["A"]);
    }

    #[test]
    fn missing_schemas_resolve_empty() {
        let resolved = resolve(None, None);
        assert!(resolved.framing.is_empty());
        assert!(resolved.categories.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_any_company_schema() -> Result<()> {
        let store = InMemorySchemaStore::new();
        store
            .insert_company("org-1", PromptSchema::new("General", vec![("A".into(), "a".into())]))
            .await;

        let resolved = resolve_for(&store, "org-1", "One-on-One", "user-1").await?;
        assert_eq!(resolved.category_names(), vec!["A"]);

        Ok(())
    }
}
