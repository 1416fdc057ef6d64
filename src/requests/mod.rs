//! Structs and utilities for making requests to myanimelist servers
//!
//! Two generations of the remote API are served by the same [MalClient]:
//! the legacy one (XML payloads sent as a form field, HTTP Basic auth) and the
//! current REST one (query parameters built from option sets, bearer token
//! injected by the transport). Every operation picks its [Generation]
//! explicitly.

pub mod account;
pub mod anime;
pub mod manga;
pub mod payload;
pub mod query_utils;
pub mod user;

use account::AccountService;
use anime::AnimeService;
use manga::MangaService;
use payload::{DecodeError, EncodeError};
use query_utils::{ApplyParams, Page, Paging, Query, QueryParams};
use user::UserService;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Request, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use url::Url;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

pub const DEFAULT_LEGACY_BASE_URL: &str = "http://myanimelist.net/";
pub const DEFAULT_API_BASE_URL: &str = "https://api.myanimelist.net/v2/";
pub const DEFAULT_USER_AGENT: &str = "api-indiv-2D4068FCF43349DA30D8D4E5667883C2";

/// Custom error type that contains all errors that can be emitted by this crate's functions
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid url {input:?}: {source}")]
    InvalidUrl {
        input: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    EncodeFailed(#[from] EncodeError),
    #[error("{method} {url}: {status} {body}")]
    RequestFailed {
        method: Method,
        url: Url,
        status: StatusCode,
        body: String,
        response: Box<Response>,
    },
    #[error(transparent)]
    Transport(#[from] reqwest_middleware::Error),
    #[error("cannot read response body of {} {}: {source}", .response.method, .response.url)]
    ReadFailed {
        source: reqwest::Error,
        /// Status and headers as received, with an empty body
        response: Box<Response>,
    },
    #[error("cannot decode {target}: {source} (body: {snippet:?})")]
    DecodeFailed {
        target: &'static str,
        snippet: String,
        source: DecodeError,
        response: Box<Response>,
    },
    #[error("invalid page url {url:?}: {source}")]
    InvalidPageUrl {
        url: String,
        source: url::ParseError,
        /// The list response the url came from
        response: Option<Box<Response>>,
    },
    #[error("page url {url:?} has no numeric offset (got {value:?})")]
    InvalidOffset {
        url: String,
        value: Option<String>,
        response: Option<Box<Response>>,
    },
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.into())
    }
}

impl Error {
    /// The response received before the failure, if the server answered at all
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::RequestFailed { response, .. }
            | Error::ReadFailed { response, .. }
            | Error::DecodeFailed { response, .. } => Some(response),
            Error::InvalidPageUrl { response, .. } | Error::InvalidOffset { response, .. } => {
                response.as_deref()
            }
            _ => None,
        }
    }

    fn with_page_response(mut self, page: Response) -> Self {
        if let Error::InvalidPageUrl { response, .. } | Error::InvalidOffset { response, .. } =
            &mut self
        {
            *response = Some(Box::new(page));
        }

        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|r| r.status)
    }
}

/// Type alias for the [`Result`](std::result::Result) that is used in the crate's functions
pub type Result<T> = std::result::Result<T, Error>;

/// Generation of the remote API an endpoint belongs to. Decides body encoding,
/// authentication and the decoder used for the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// `myanimelist.net/api/...` and `malappinfo.php`: XML, form bodies, Basic auth
    Legacy,
    /// `api.myanimelist.net/v2`: JSON, query parameters, bearer token
    Current,
}

/// Fully buffered server response
#[derive(Debug, Clone)]
pub struct Response {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Offset of the next page, set by list endpoints
    pub next_offset: Option<u32>,
    /// Offset of the previous page, set by list endpoints
    pub prev_offset: Option<u32>,
}

impl Response {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Fills the offsets from `paging`. A malformed page url fails with the
    /// response attached to the error
    pub(crate) fn with_paging(mut self, paging: &Paging) -> Result<Self> {
        let offset = |url: Option<&str>| {
            url.filter(|u| !u.is_empty())
                .map(query_utils::extract_offset)
                .transpose()
        };

        match (offset(paging.previous.as_deref()), offset(paging.next.as_deref())) {
            (Ok(prev), Ok(next)) => {
                self.prev_offset = prev;
                self.next_offset = next;
                Ok(self)
            }
            (Err(err), _) | (_, Err(err)) => Err(err.with_page_response(self)),
        }
    }
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct Settings {
    user_agent: Option<String>,
    credentials: Option<Credentials>,
}

/// Everything needed to construct a [MalClient]. Built with the builder syntax from the [bon] crate
#[derive(Clone, bon::Builder)]
pub struct ClientConfig {
    /// Transport used for every request. Attach bearer tokens, timeouts and
    /// proxies here (see [bearer_transport])
    pub transport: Option<ClientWithMiddleware>,
    #[builder(into, default = DEFAULT_LEGACY_BASE_URL.to_owned())]
    pub legacy_base_url: String,
    #[builder(into, default = DEFAULT_API_BASE_URL.to_owned())]
    pub api_base_url: String,
    /// An empty user agent disables the header
    #[builder(into, default = DEFAULT_USER_AGENT.to_owned())]
    pub user_agent: String,
    #[builder(into)]
    pub username: Option<String>,
    #[builder(into)]
    pub password: Option<String>,
}

/// Wraps a [reqwest::Client] into a transport that records a tracing span per round trip
pub fn traced_transport(client: reqwest::Client) -> ClientWithMiddleware {
    ClientBuilder::new(client)
        .with(TracingMiddleware::default())
        .build()
}

/// Transport for the current API: every request carries `Authorization: Bearer {token}`
pub fn bearer_transport(token: &str) -> Result<ClientWithMiddleware> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);

    let client = reqwest::Client::builder().default_headers(headers).build()?;

    Ok(traced_transport(client))
}

fn parse_url(input: &str) -> Result<Url> {
    Url::parse(input).map_err(|source| Error::InvalidUrl {
        input: input.to_owned(),
        source,
    })
}

fn resolve(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|source| Error::InvalidUrl {
        input: path.to_owned(),
        source,
    })
}

/// Client for both generations of the myanimelist API.
///
/// Cloning is cheap: clones share the transport and the settings changed by
/// [`set_credentials`](MalClient::set_credentials) and
/// [`set_user_agent`](MalClient::set_user_agent). Settings are read once per
/// built request, so changing them concurrently never tears a request.
///
/// Operations are futures; dropping one aborts its transport call. Timeouts
/// belong to the transport passed in [ClientConfig].
#[derive(Debug, Clone)]
pub struct MalClient {
    client: ClientWithMiddleware,
    legacy_base_url: Url,
    api_base_url: Url,
    settings: Arc<RwLock<Settings>>,
}

impl MalClient {
    /// Client with the default base urls and user agent, no credentials and
    /// an unauthenticated transport
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::builder().build())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = match config.transport {
            Some(transport) => transport,
            None => traced_transport(reqwest::Client::builder().build()?),
        };

        let credentials = config.username.map(|username| Credentials {
            username,
            password: config.password.unwrap_or_default(),
        });

        let user_agent = Some(config.user_agent).filter(|agent| !agent.is_empty());
        if let Some(agent) = &user_agent {
            HeaderValue::from_str(agent)?;
        }

        Ok(Self {
            client,
            legacy_base_url: parse_url(&config.legacy_base_url)?,
            api_base_url: parse_url(&config.api_base_url)?,
            settings: Arc::new(RwLock::new(Settings {
                user_agent,
                credentials,
            })),
        })
    }

    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        self.settings.write().credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
    }

    /// Sets the user agent sent with every request. An empty string disables the header
    pub fn set_user_agent(&self, user_agent: impl Into<String>) -> Result<()> {
        let user_agent = user_agent.into();
        if !user_agent.is_empty() {
            HeaderValue::from_str(&user_agent)?;
        }

        self.settings.write().user_agent = Some(user_agent).filter(|agent| !agent.is_empty());

        Ok(())
    }

    pub fn legacy_base_url(&self) -> &Url {
        &self.legacy_base_url
    }

    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    pub fn accounts(&self) -> AccountService<'_> {
        AccountService { client: self }
    }

    pub fn anime(&self) -> AnimeService<'_> {
        AnimeService { client: self }
    }

    pub fn manga(&self) -> MangaService<'_> {
        MangaService { client: self }
    }

    pub fn users(&self) -> UserService<'_> {
        UserService { client: self }
    }

    fn user_agent_header(settings: &Settings) -> Result<Option<HeaderValue>> {
        match &settings.user_agent {
            Some(agent) => Ok(Some(HeaderValue::from_str(agent)?)),
            None => Ok(None),
        }
    }

    /// Builds a request for the legacy API. `path` is resolved against the
    /// legacy base url. When `entry` is given it is marshalled to XML and sent
    /// as the `data` field of a form-urlencoded body
    pub fn build_legacy_request<E>(
        &self,
        method: Method,
        path: &str,
        entry: Option<&E>,
    ) -> Result<Request>
    where
        E: Serialize,
    {
        let url = resolve(&self.legacy_base_url, path)?;
        let settings = self.settings.read().clone();

        let mut builder = self.client.request(method, url);

        if let Some(entry) = entry {
            let data = payload::encode_entry(entry)?;
            builder = builder.form(&[("data", data)]);
        }

        if let Some(agent) = Self::user_agent_header(&settings)? {
            builder = builder.header(USER_AGENT, agent);
        }

        if let Some(credentials) = settings.credentials {
            builder = builder.basic_auth(credentials.username, Some(credentials.password));
        }

        Ok(builder.build()?)
    }

    /// Builds a request for the current API. `path` is resolved against the
    /// current base url and every option is applied to the query string.
    /// Authorization is left to the transport
    pub fn build_request<O: ApplyParams>(
        &self,
        method: Method,
        path: &str,
        options: &[O],
    ) -> Result<Request> {
        self.build_request_with_params(method, path, QueryParams::from_options(options))
    }

    pub(crate) fn build_request_with_params(
        &self,
        method: Method,
        path: &str,
        params: QueryParams,
    ) -> Result<Request> {
        let url = resolve(&self.api_base_url, path)?;

        self.build_request_at(method, url, params)
    }

    /// Current API url made of `segments` appended to the base path. Every
    /// segment is percent-encoded on its own, so user supplied names cannot
    /// add path components or a query
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base_url.clone();

        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                input: self.api_base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub(crate) fn build_request_at(
        &self,
        method: Method,
        mut url: Url,
        params: QueryParams,
    ) -> Result<Request> {

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.iter() {
                pairs.append_pair(key, value);
            }
        }

        let settings = self.settings.read().clone();

        let mut builder = self.client.request(method, url);
        if let Some(agent) = Self::user_agent_header(&settings)? {
            builder = builder.header(USER_AGENT, agent);
        }

        Ok(builder.build()?)
    }

    /// Executes `request` once and buffers the whole body. Any status outside
    /// `200..=299` becomes [Error::RequestFailed] carrying the response
    #[tracing::instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
    pub async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();

        tracing::debug!("dispatching request");

        let resp = self.client.execute(request).await?;

        let mut response = Response {
            method: method.clone(),
            url: url.clone(),
            status: resp.status(),
            headers: resp.headers().clone(),
            body: Bytes::new(),
            next_offset: None,
            prev_offset: None,
        };
        let status = response.status;

        response.body = match resp.bytes().await {
            Ok(body) => body,
            Err(source) => {
                return Err(Error::ReadFailed {
                    source,
                    response: Box::new(response),
                })
            }
        };

        tracing::debug!(status = status.as_u16(), bytes = response.body.len(), "got response");

        if !status.is_success() {
            let body = response.text().into_owned();

            return Err(Error::RequestFailed {
                method,
                url,
                status,
                body,
                response: Box::new(response),
            });
        }

        Ok(response)
    }

    /// [`send`](MalClient::send) followed by decoding the body with the decoder of `generation`
    pub async fn send_decoded<T>(
        &self,
        request: Request,
        generation: Generation,
    ) -> Result<(T, Response)>
    where
        T: DeserializeOwned,
    {
        let response = self.send(request).await?;

        Self::decode_response(response, generation)
    }

    fn decode_response<T>(response: Response, generation: Generation) -> Result<(T, Response)>
    where
        T: DeserializeOwned,
    {
        match payload::decode::<T>(generation, &response.body) {
            Ok(value) => Ok((value, response)),
            Err(source) => Err(Error::DecodeFailed {
                target: std::any::type_name::<T>(),
                snippet: payload::snippet(&response.body),
                source,
                response: Box::new(response),
            }),
        }
    }

    /// Posts `entry` to a legacy list endpoint of the form `{endpoint}{id}.xml`
    pub(crate) async fn legacy_post<E>(&self, endpoint: &str, id: u64, entry: &E) -> Result<Response>
    where
        E: Serialize,
    {
        let request =
            self.build_legacy_request(Method::POST, &format!("{endpoint}{id}.xml"), Some(entry))?;

        self.send(request).await
    }

    pub(crate) async fn legacy_delete(&self, endpoint: &str, id: u64) -> Result<Response> {
        let request =
            self.build_legacy_request(Method::DELETE, &format!("{endpoint}{id}.xml"), None::<&()>)?;

        self.send(request).await
    }

    /// Lowest level function that executes a legacy GET with arbitrary [Query].
    /// A `204 No Content` (or an empty body) decodes to `T::default()`
    pub(crate) async fn legacy_query<T>(
        &self,
        path: &str,
        query: &impl Query,
    ) -> Result<(T, Response)>
    where
        T: DeserializeOwned + Default,
    {
        let query_data = serde_qs::to_string(query).map_err(EncodeError::Query)?;
        let path = if query_data.is_empty() {
            path.to_owned()
        } else {
            format!("{path}?{query_data}")
        };

        let request = self.build_legacy_request(Method::GET, &path, None::<&()>)?;
        let response = self.send(request).await?;

        if response.status == StatusCode::NO_CONTENT || response.body.is_empty() {
            return Ok((T::default(), response));
        }

        Self::decode_response(response, Generation::Legacy)
    }

    /// Fetches one page of a current API list endpoint, fills the paging
    /// offsets of the response and returns the page items
    pub(crate) async fn fetch_page<T>(&self, request: Request) -> Result<(Vec<T>, Response)>
    where
        T: DeserializeOwned,
    {
        let (page, response): (Page<T>, Response) =
            self.send_decoded(request, Generation::Current).await?;

        Ok((page.data, response.with_paging(&page.paging)?))
    }
}
