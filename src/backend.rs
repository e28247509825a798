use crate::{
    error::ApiError,
    table::{
        GameResponse,
        Token,
    },
    wallet::IdentityBlobs,
};
use reqwest::{
    Response,
    StatusCode,
};
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use std::{
    fmt,
    future::Future,
};
use tracing::debug;

pub const IDENTITY_HEADER: &str = "X-Identity";

/// A player move or fund movement submitted to the game backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Start { bet: u64 },
    Hit,
    Stand,
    DoubleDown,
    Deposit { amount: u64 },
    Withdraw { amount: u64, token: Token },
}

impl Action {
    pub fn path(&self) -> &'static str {
        match self {
            Action::Start { .. } => "/api/init",
            Action::Hit => "/api/hit",
            Action::Stand => "/api/stand",
            Action::DoubleDown => "/api/double_down",
            Action::Deposit { .. } => "/api/deposit",
            Action::Withdraw { .. } => "/api/withdraw",
        }
    }

    /// Message shown when the request fails without a usable backend error.
    pub fn fallback_error(&self) -> &'static str {
        match self {
            Action::Start { .. } => "Failed to initialize game. Please try again.",
            Action::Hit => "Failed to hit. Please try again.",
            Action::Stand => "Failed to stand. Please try again.",
            Action::DoubleDown => "Failed to double down. Please try again.",
            Action::Deposit { .. } => "Failed to deposit. Please try again.",
            Action::Withdraw { .. } => "Failed to withdraw. Please try again.",
        }
    }

    pub fn moves_funds(&self) -> bool {
        matches!(self, Action::Deposit { .. } | Action::Withdraw { .. })
    }

    /// Hit, stand and double down only make sense inside an ongoing round.
    pub fn needs_open_round(&self) -> bool {
        matches!(self, Action::Hit | Action::Stand | Action::DoubleDown)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start { bet } => write!(f, "deal (bet {bet})"),
            Action::Hit => f.write_str("hit"),
            Action::Stand => f.write_str("stand"),
            Action::DoubleDown => f.write_str("double down"),
            Action::Deposit { amount } => write!(f, "deposit {amount}"),
            Action::Withdraw { amount, token } => write!(f, "withdraw {amount} {token}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionRequest {
    pub identity: String,
    pub action: Action,
    pub wallet_blobs: IdentityBlobs,
}

impl ActionRequest {
    pub fn body(&self) -> Value {
        let mut body = json!({ "wallet_blobs": self.wallet_blobs });
        match self.action {
            Action::Start { bet } => body["bet"] = json!(bet),
            Action::Deposit { amount } => body["deposit"] = json!(amount),
            Action::Withdraw { amount, token } => {
                body["withdraw"] = json!(amount);
                body["token"] = json!(token);
            }
            Action::Hit | Action::Stand | Action::DoubleDown => {}
        }
        body
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct BackendConfig {
    pub contract_name: String,
}

/// The service that turns player actions into contract transactions.
pub trait GameBackend {
    fn submit(
        &self,
        request: &ActionRequest,
    ) -> impl Future<Output = Result<GameResponse, ApiError>> + Send;

    fn config(&self) -> impl Future<Output = Result<BackendConfig, ApiError>> + Send;
}

#[derive(Clone)]
pub struct HttpGameBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGameBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ApiError::network(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { base_url, http })
    }
}

impl GameBackend for HttpGameBackend {
    async fn submit(&self, request: &ActionRequest) -> Result<GameResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.action.path());
        debug!(%url, action = %request.action, "submitting action");
        let res = self
            .http
            .post(url)
            .header(IDENTITY_HEADER, &request.identity)
            .json(&request.body())
            .send()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;
        let response: GameResponse = decode_response(res).await?;
        response
            .table
            .validate()
            .map_err(|err| ApiError::decode(err.to_string()))?;
        Ok(response)
    }

    async fn config(&self) -> Result<BackendConfig, ApiError> {
        let url = format!("{}/api/config", self.base_url);
        let res = self
            .http
            .get(url)
            .header(IDENTITY_HEADER, "")
            .send()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;
        decode_response(res).await
    }
}

impl fmt::Display for HttpGameBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Turns a response into `T`, or into the backend's `{error}` message for
/// non-2xx statuses.
pub(crate) async fn decode_response<T: DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    let status = res.status();
    let bytes = res
        .bytes()
        .await
        .map_err(|err| ApiError::network(err.to_string()))?;
    if !status.is_success() {
        return Err(status_error(status, &bytes));
    }
    serde_json::from_slice(&bytes).map_err(|err| ApiError::decode(err.to_string()))
}

fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    ApiError::backend(status.as_u16(), message)
}
