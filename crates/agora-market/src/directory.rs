//! Agent capability directory
//!
//! The directory is the external collaborator that knows what each agent
//! can do and for how much. The marketplace core consumes quotes and
//! attributes through this trait and never owns the underlying catalog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use agora_types::{AgentAttributes, AgentId, Amount, ServiceQuote};

use crate::session::MarketError;

/// Capability lookup surface for counterparty agents
#[async_trait]
pub trait CapabilityDirectory: Send + Sync {
    /// Agents that offer the given service, in registration order
    async fn providers_of(&self, service: &str) -> Vec<AgentId>;

    /// Price quote for one provider and service
    ///
    /// Fails with [`MarketError::InvalidService`] when the provider does
    /// not offer the service, and [`MarketError::UnknownAgent`] when the
    /// provider is not registered at all.
    async fn quote(&self, provider: &AgentId, service: &str) -> Result<ServiceQuote, MarketError>;

    /// Quality attributes for one provider
    async fn attributes(&self, provider: &AgentId) -> Result<AgentAttributes, MarketError>;
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    services: HashMap<String, Amount>,
    attributes: AgentAttributes,
}

/// In-memory capability directory for tests and simulations
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entries: Arc<RwLock<HashMap<AgentId, DirectoryEntry>>>,
    /// Registration order, used to keep provider listings deterministic
    order: Arc<RwLock<Vec<AgentId>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent with its service catalog and attributes
    ///
    /// Re-registering replaces the catalog but keeps the original position
    /// in listing order.
    pub async fn register(
        &self,
        agent: AgentId,
        services: HashMap<String, Amount>,
        attributes: AgentAttributes,
    ) {
        let mut entries = self.entries.write().await;
        let mut order = self.order.write().await;
        if !entries.contains_key(&agent) {
            order.push(agent.clone());
        }
        entries.insert(
            agent,
            DirectoryEntry {
                services,
                attributes,
            },
        );
    }

    /// All registered agents, in registration order
    pub async fn agents(&self) -> Vec<AgentId> {
        self.order.read().await.clone()
    }
}

#[async_trait]
impl CapabilityDirectory for InMemoryDirectory {
    async fn providers_of(&self, service: &str) -> Vec<AgentId> {
        let entries = self.entries.read().await;
        let order = self.order.read().await;
        order
            .iter()
            .filter(|agent| {
                entries
                    .get(agent)
                    .is_some_and(|entry| entry.services.contains_key(service))
            })
            .cloned()
            .collect()
    }

    async fn quote(&self, provider: &AgentId, service: &str) -> Result<ServiceQuote, MarketError> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(provider)
            .ok_or_else(|| MarketError::UnknownAgent {
                agent: provider.clone(),
            })?;
        let base_price =
            entry
                .services
                .get(service)
                .copied()
                .ok_or_else(|| MarketError::InvalidService {
                    service: service.to_string(),
                })?;
        Ok(ServiceQuote {
            provider: provider.clone(),
            service: service.to_string(),
            base_price,
            attributes: entry.attributes,
        })
    }

    async fn attributes(&self, provider: &AgentId) -> Result<AgentAttributes, MarketError> {
        let entries = self.entries.read().await;
        entries
            .get(provider)
            .map(|entry| entry.attributes)
            .ok_or_else(|| MarketError::UnknownAgent {
                agent: provider.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sample_directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory
            .register(
                AgentId::from("DataProcessor_A"),
                HashMap::from([
                    ("clean_data".to_string(), Amount::new(10)),
                    ("run_analysis".to_string(), Amount::new(25)),
                ]),
                AgentAttributes::default(),
            )
            .await;
        directory
            .register(
                AgentId::from("Translator_B"),
                HashMap::from([("translate_text".to_string(), Amount::new(15))]),
                AgentAttributes {
                    reputation: 4.2,
                    ..AgentAttributes::default()
                },
            )
            .await;
        directory
    }

    #[tokio::test]
    async fn test_providers_filtered_by_service() {
        let directory = sample_directory().await;
        let providers = directory.providers_of("clean_data").await;
        assert_eq!(providers, vec![AgentId::from("DataProcessor_A")]);
        assert!(directory.providers_of("paint_fence").await.is_empty());
    }

    #[tokio::test]
    async fn test_quote_errors() {
        let directory = sample_directory().await;

        let quote = directory
            .quote(&AgentId::from("Translator_B"), "translate_text")
            .await
            .unwrap();
        assert_eq!(quote.base_price, Amount::new(15));
        assert_eq!(quote.attributes.reputation, 4.2);

        let wrong_service = directory
            .quote(&AgentId::from("Translator_B"), "clean_data")
            .await;
        assert!(matches!(
            wrong_service,
            Err(MarketError::InvalidService { .. })
        ));

        let unknown = directory.quote(&AgentId::from("Ghost"), "clean_data").await;
        assert!(matches!(unknown, Err(MarketError::UnknownAgent { .. })));
    }
}
