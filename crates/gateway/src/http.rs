use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, ensure};

use super::error::{
    BuildClientSnafu, DecodeSnafu, GatewayResult, NotFoundSnafu, PlaceholderIdSnafu, StatusSnafu,
    TransportSnafu,
};
use super::gateway::AgentGateway;
use super::ids::ConversationId;
use super::types::{
    AgentReply, ConversationRecord, MessageRecord, RenameRequest, SendRequest, SharedChat,
};

/// `AgentGateway` speaking JSON over HTTP to the agent backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    share_base_url: String,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        share_base_url: Option<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-http-client",
            })?;
        let base_url = trim_base(base_url.into());
        let share_base_url = share_base_url
            .map(trim_base)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| base_url.clone());

        Ok(Self {
            client,
            base_url,
            share_base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn conversation_url(
        &self,
        conversation_id: &ConversationId,
        suffix: &str,
        stage: &'static str,
    ) -> GatewayResult<String> {
        ensure!(
            !conversation_id.is_placeholder(),
            PlaceholderIdSnafu {
                stage,
                id: conversation_id.to_string(),
            }
        );
        Ok(self.url(&format!("/conversations/{conversation_id}{suffix}")))
    }

    /// Sends the request and returns the body of a successful response.
    async fn execute(
        &self,
        request: RequestBuilder,
        url: &str,
        send_stage: &'static str,
        read_stage: &'static str,
    ) -> GatewayResult<String> {
        let response = request.send().await.context(TransportSnafu {
            stage: send_stage,
            url: url.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.context(TransportSnafu {
            stage: read_stage,
            url: url.to_string(),
        })?;

        if status == StatusCode::NOT_FOUND {
            return NotFoundSnafu {
                stage: read_stage,
                url: url.to_string(),
            }
            .fail();
        }

        if !status.is_success() {
            return StatusSnafu {
                stage: read_stage,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(body)
    }

    async fn get_json<T>(
        &self,
        url: String,
        send_stage: &'static str,
        decode_stage: &'static str,
    ) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.client.get(&url), &url, send_stage, decode_stage)
            .await?;
        decode(&body, &url, decode_stage)
    }
}

impl AgentGateway for HttpGateway {
    fn list_conversations(&self) -> BoxFuture<'_, GatewayResult<Vec<ConversationRecord>>> {
        Box::pin(async move {
            self.get_json::<Vec<ConversationRecord>>(
                self.url("/conversations"),
                "send-list-conversations",
                "decode-conversations",
            )
            .await
        })
    }

    fn fetch_messages<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<Vec<MessageRecord>>> {
        Box::pin(async move {
            let url = self.conversation_url(conversation_id, "/messages", "fetch-messages-url")?;
            self.get_json::<Vec<MessageRecord>>(url, "send-fetch-messages", "decode-messages")
                .await
        })
    }

    fn send_message(&self, request: SendRequest) -> BoxFuture<'_, GatewayResult<AgentReply>> {
        Box::pin(async move {
            if let Some(conversation_id) = &request.conversation_id {
                ensure!(
                    !conversation_id.is_placeholder(),
                    PlaceholderIdSnafu {
                        stage: "send-message-url",
                        id: conversation_id.to_string(),
                    }
                );
            }

            let url = self.url("/agent");
            let body = self
                .execute(
                    self.client.post(&url).json(&request),
                    &url,
                    "send-agent-message",
                    "decode-agent-reply",
                )
                .await?;
            decode::<AgentReply>(&body, &url, "decode-agent-reply")
        })
    }

    fn rename_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        name: &'a str,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let url = self.conversation_url(conversation_id, "", "rename-conversation-url")?;
            let request = self.client.patch(&url).json(&RenameRequest {
                name: name.to_string(),
            });
            // Acknowledgement bodies carry nothing the client needs.
            self.execute(request, &url, "send-rename-conversation", "read-rename-ack")
                .await
                .map(|_| ())
        })
    }

    fn delete_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            let url = self.conversation_url(conversation_id, "", "delete-conversation-url")?;
            self.execute(
                self.client.delete(&url),
                &url,
                "send-delete-conversation",
                "read-delete-ack",
            )
            .await
            .map(|_| ())
        })
    }

    fn fetch_shared_chat<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<SharedChat>> {
        Box::pin(async move {
            ensure!(
                !conversation_id.is_placeholder(),
                PlaceholderIdSnafu {
                    stage: "shared-chat-url",
                    id: conversation_id.to_string(),
                }
            );
            self.get_json::<SharedChat>(
                self.url(&format!("/chat/{conversation_id}")),
                "send-fetch-shared-chat",
                "decode-shared-chat",
            )
            .await
        })
    }

    fn share_url(&self, conversation_id: &ConversationId) -> String {
        format!("{}/chat/{conversation_id}", self.share_base_url)
    }
}

fn decode<T>(body: &str, url: &str, stage: &'static str) -> GatewayResult<T>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).context(DecodeSnafu {
        stage,
        url: url.to_string(),
    })
}

fn trim_base(raw: String) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
