use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{
    errors::IdentityError,
    identifier::{insert_dashes, strip_dashes, Identifier},
    models::PlayerIdentity,
    repository::IdentityRepository,
};

/// Turns a raw identifier into the canonical identity every other resolver
/// joins on. Its failure is terminal for the request.
pub struct IdentityResolver {
    repository: Arc<dyn IdentityRepository + Send + Sync>,
    lookup_timeout: Duration,
}

impl IdentityResolver {
    pub fn new(repository: Arc<dyn IdentityRepository + Send + Sync>) -> Self {
        Self {
            repository,
            lookup_timeout: Duration::from_secs(3),
        }
    }

    /// Set the bound applied to the whole lookup, retry included
    pub fn with_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, raw: &str) -> Result<PlayerIdentity, IdentityError> {
        let Some(identifier) = Identifier::parse(raw) else {
            debug!("Blank identifier, skipping lookup");
            return Err(IdentityError::NotFound(raw.to_string()));
        };

        match timeout(self.lookup_timeout, self.lookup(&identifier)).await {
            Ok(Ok(Some(mut identity))) => {
                identity.uuid = canonical_uuid(&identity.uuid);
                info!(
                    uuid = %identity.uuid,
                    display_name = %identity.display_name,
                    "Resolved player identity"
                );
                Ok(identity)
            }
            Ok(Ok(None)) => {
                info!(identifier = %identifier.as_str(), "No player matches identifier");
                Err(IdentityError::NotFound(identifier.as_str().to_string()))
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Identity lookup failed");
                Err(err)
            }
            Err(_) => {
                let ms = self.lookup_timeout.as_millis() as u64;
                warn!(timeout_ms = ms, "Identity lookup timed out");
                Err(IdentityError::Timeout(ms))
            }
        }
    }

    async fn lookup(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<PlayerIdentity>, IdentityError> {
        if let Identifier::Name(name) = identifier {
            return self.repository.find_latest_by_name(name).await;
        }

        if let Some(identity) = self.repository.find_by_uuid(identifier.as_str()).await? {
            return Ok(Some(identity));
        }

        // Stores disagree on dash convention; retry once in the other form
        match identifier.alternate_form() {
            Some(alternate) => {
                debug!(alternate = %alternate, "Retrying uuid lookup in other dash convention");
                self.repository.find_by_uuid(&alternate).await
            }
            None => Ok(None),
        }
    }
}

/// Lowercase dashed form every statistics store is keyed by. Registry rows
/// may hold either convention.
fn canonical_uuid(stored: &str) -> String {
    let lowered = stored.trim().to_ascii_lowercase();
    if strip_dashes(&lowered).len() == 32 {
        insert_dashes(&lowered)
    } else {
        lowered
    }
}
