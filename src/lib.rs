pub mod app;
pub mod backend;
pub mod balances;
pub mod card;
pub mod config;
pub mod error;
pub mod hand;
pub mod indexer_client;
pub mod logging;
pub mod notifications;
pub mod session;
pub mod table;
pub mod ui;
pub mod wallet;

pub use backend::{
    Action,
    GameBackend,
    HttpGameBackend,
};
pub use indexer_client::{
    IndexerApi,
    IndexerClient,
};
pub use session::{
    ActionError,
    GameSession,
};
