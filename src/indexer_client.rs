use crate::{
    backend::{
        IDENTITY_HEADER,
        decode_response,
    },
    error::ApiError,
    table::{
        ContractState,
        GameState,
        Token,
    },
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use std::{
    fmt,
    future::Future,
};

/// Balances the game contract holds on behalf of a player.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct UserBalances {
    #[serde(default)]
    pub oranj: u64,
    #[serde(default)]
    pub vitamin: u64,
}

#[derive(Deserialize)]
struct TokenBalanceDto {
    balance: u64,
}

/// Read side of the chain: indexed contract state and token ledgers.
///
/// A missing record is not an error: lookups answer `None` or zero.
pub trait IndexerApi {
    fn contract_state(
        &self,
        contract: &str,
        identity: &str,
    ) -> impl Future<Output = Result<Option<ContractState>, ApiError>> + Send;

    fn user_balances(
        &self,
        contract: &str,
        identity: &str,
    ) -> impl Future<Output = Result<UserBalances, ApiError>> + Send;

    fn token_balance(
        &self,
        token: Token,
        identity: &str,
    ) -> impl Future<Output = Result<u64, ApiError>> + Send;
}

/// The player's table as currently indexed, if a round was ever dealt.
pub async fn current_table<I: IndexerApi>(
    indexer: &I,
    contract: &str,
    identity: &str,
) -> Result<Option<GameState>, ApiError> {
    let Some(mut state) = indexer.contract_state(contract, identity).await? else {
        return Ok(None);
    };
    let table = state.tables.remove(identity);
    if let Some(table) = &table {
        table
            .validate()
            .map_err(|err| ApiError::decode(err.to_string()))?;
    }
    Ok(table)
}

#[derive(Clone)]
pub struct IndexerClient {
    base_url: String,
    http: reqwest::Client,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build().map_err(|err| {
            ApiError::network(format!("failed to build HTTP client for indexer: {err}"))
        })?;
        Ok(Self { base_url, http })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: String,
        identity: &str,
    ) -> Result<Option<T>, ApiError> {
        let url = format!("{}/v1/indexer/contract/{}", self.base_url, path);
        let res = self
            .http
            .get(url)
            .header(IDENTITY_HEADER, identity)
            .send()
            .await
            .map_err(|err| ApiError::network(format!("indexer request failed: {err}")))?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_response(res).await.map(Some)
    }
}

impl IndexerApi for IndexerClient {
    async fn contract_state(
        &self,
        contract: &str,
        identity: &str,
    ) -> Result<Option<ContractState>, ApiError> {
        self.fetch(format!("{contract}/state"), identity).await
    }

    async fn user_balances(&self, contract: &str, identity: &str) -> Result<UserBalances, ApiError> {
        let balances = self
            .fetch(format!("{contract}/user/{identity}/balances"), identity)
            .await?;
        Ok(balances.unwrap_or_default())
    }

    async fn token_balance(&self, token: Token, identity: &str) -> Result<u64, ApiError> {
        let dto: Option<TokenBalanceDto> = self
            .fetch(format!("{}/balance/{identity}", token.contract_name()), identity)
            .await?;
        Ok(dto.map(|dto| dto.balance).unwrap_or(0))
    }
}

impl fmt::Display for IndexerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}
