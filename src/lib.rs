//! Async client for the myanimelist API.
//!
//! [MalClient] talks to both generations of the service. The legacy XML API
//! authenticates with a username and password:
//!
//! ```no_run
//! use mal_api::{ClientConfig, MalClient};
//! use mal_api::requests::anime::{AnimeEntry, AnimeEntryStatus};
//!
//! # async fn run() -> mal_api::Result<()> {
//! let client = MalClient::with_config(
//!     ClientConfig::builder()
//!         .username("user")
//!         .password("secret")
//!         .build(),
//! )?;
//!
//! let entry = AnimeEntry::builder().episode(3).status(AnimeEntryStatus::Watching).build();
//! client.anime().update(967, &entry).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The current REST API expects a bearer token, which is attached by the
//! transport (see [`bearer_transport`]).

pub mod logging;
pub mod requests;

pub use requests::{
    bearer_transport, traced_transport, ClientConfig, Error, Generation, MalClient, Response,
    Result,
};
