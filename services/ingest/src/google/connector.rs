use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::connector::{Connector, SourceDocument};
use crate::google::client::{GoogleApiError, GoogleClient};
use crate::google::models::{parse_mailbox, CalendarEvent, GmailMessage};
use crate::google::token::AccessTokenProvider;
use crate::windows::SyncWindow;
use relata_common::error::{RelataError, RelataResult};
use relata_db::crm::models::Source;

/// Connector backed by the Gmail and Calendar REST APIs. A malformed item
/// (missing sender, missing occurrence time) fails the whole window rather
/// than being skipped; the caller retries after the upstream data is fixed.
pub struct GoogleConnector {
    client: GoogleClient,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl GoogleConnector {
    pub fn new(client: GoogleClient, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self { client, tokens }
    }

    fn message_to_document(message: GmailMessage) -> Result<SourceDocument, GoogleApiError> {
        let occurred_at = message
            .occurred_at()
            .ok_or_else(|| GoogleApiError::Decode(format!("message {} has no date", message.id)))?;

        let from = message
            .header("From")
            .ok_or_else(|| GoogleApiError::Decode(format!("message {} has no From", message.id)))?;
        let (participant_email, participant_name) = parse_mailbox(from).ok_or_else(|| {
            GoogleApiError::Decode(format!("message {} has unparseable From: {from}", message.id))
        })?;

        Ok(SourceDocument {
            external_id: message.id.clone(),
            external_updated_at: occurred_at,
            occurred_at,
            participant_email,
            participant_name,
            subject: message.header("Subject").unwrap_or_default().to_string(),
            snippet: message.snippet,
        })
    }

    fn event_to_document(event: CalendarEvent) -> Result<SourceDocument, GoogleApiError> {
        let occurred_at = event
            .start
            .as_ref()
            .and_then(|s| s.occurred_at())
            .ok_or_else(|| GoogleApiError::Decode(format!("event {} has no start", event.id)))?;

        let organizer = event
            .organizer
            .as_ref()
            .ok_or_else(|| GoogleApiError::Decode(format!("event {} has no organizer", event.id)))?;
        let participant_email = organizer
            .email
            .clone()
            .ok_or_else(|| {
                GoogleApiError::Decode(format!("event {} organizer has no email", event.id))
            })?;
        let participant_name = organizer
            .display_name
            .clone()
            .unwrap_or_else(|| participant_email.clone());

        Ok(SourceDocument {
            external_id: event.id,
            external_updated_at: event.updated.unwrap_or(occurred_at),
            occurred_at,
            participant_email,
            participant_name,
            subject: event.summary,
            snippet: String::new(),
        })
    }
}

#[async_trait]
impl Connector for GoogleConnector {
    fn name(&self) -> &str {
        "google"
    }

    async fn fetch_items(
        &self,
        tenant_id: Uuid,
        window: &SyncWindow,
        source: Source,
    ) -> RelataResult<Vec<SourceDocument>> {
        let token = self.tokens.access_token(tenant_id).await?;

        let documents = match source {
            Source::Gmail => {
                let refs = self
                    .client
                    .list_messages(&token, window)
                    .await
                    .map_err(|e| RelataError::Connector(e.to_string()))?;
                tracing::info!(count = refs.len(), "listed gmail messages");

                let mut documents = Vec::with_capacity(refs.len());
                for message_ref in refs {
                    let message = self
                        .client
                        .get_message(&token, &message_ref.id)
                        .await
                        .map_err(|e| RelataError::Connector(e.to_string()))?;
                    documents.push(
                        Self::message_to_document(message)
                            .map_err(|e| RelataError::Connector(e.to_string()))?,
                    );
                }
                documents
            }
            Source::Calendar => {
                let events = self
                    .client
                    .list_events(&token, window)
                    .await
                    .map_err(|e| RelataError::Connector(e.to_string()))?;
                tracing::info!(count = events.len(), "listed calendar events");

                events
                    .into_iter()
                    .map(|event| {
                        Self::event_to_document(event)
                            .map_err(|e| RelataError::Connector(e.to_string()))
                    })
                    .collect::<RelataResult<Vec<_>>>()?
            }
        };

        Ok(documents)
    }
}
