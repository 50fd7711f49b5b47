use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GatewayError {
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("backend returned status {status} for {url} on `{stage}`: {body}"))]
    Status {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("backend has no resource at {url} on `{stage}`"))]
    NotFound { stage: &'static str, url: String },
    #[snafu(display("failed to decode response from {url} on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        url: String,
        source: serde_json::Error,
    },
    #[snafu(display("placeholder id '{id}' cannot be sent to the backend on `{stage}`"))]
    PlaceholderId { stage: &'static str, id: String },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("gateway rejected request on `{stage}`: {details}"))]
    Rejected {
        stage: &'static str,
        details: String,
    },
}

impl GatewayError {
    /// Step that produced the failure, for structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Transport { stage, .. }
            | Self::Status { stage, .. }
            | Self::NotFound { stage, .. }
            | Self::Decode { stage, .. }
            | Self::PlaceholderId { stage, .. }
            | Self::BuildClient { stage, .. }
            | Self::Rejected { stage, .. } => stage,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
