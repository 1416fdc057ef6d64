use serde::{Deserialize, Serialize};
use url::Url;

use super::{Error, Result};

use std::collections::BTreeMap;

/// Query strings of the legacy API, serialized with [serde_qs]
pub trait Query: Serialize + std::fmt::Debug {}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub q: &'a str,
}
impl Query for SearchQuery<'_> {}

/// `malappinfo.php?status=all&type={anime|manga}&u={user}`
#[derive(Serialize, Debug, Clone, Copy)]
pub struct UserListQuery<'a> {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub u: &'a str,
}
impl Query for UserListQuery<'_> {}

#[derive(Serialize, Debug, Clone, Copy, Default)]
pub struct EmptyQuery {}
impl Query for EmptyQuery {}

/// Query parameters of a current API request. Keys are kept sorted so the
/// produced query string is deterministic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<&'static str, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options<O: ApplyParams>(options: &[O]) -> Self {
        let mut params = Self::new();
        for option in options {
            option.apply(&mut params);
        }

        params
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub(crate) fn set_limit(&mut self, limit: u32) {
        if limit != 0 {
            self.set("limit", limit.to_string());
        }
    }

    pub(crate) fn set_offset(&mut self, offset: u32) {
        if offset != 0 {
            self.set("offset", offset.to_string());
        }
    }

    pub(crate) fn set_nsfw(&mut self, nsfw: bool) {
        self.set("nsfw", nsfw.to_string());
    }

    pub(crate) fn set_tags(&mut self, tags: &[String]) {
        self.set("tags", tags.join(","));
    }
}

/// Capability of an option to modify the query parameters of the operation it belongs to.
///
/// Every operation of the current API accepts its own closed set of options
/// (an enum implementing this trait), so passing an option to an operation
/// that does not understand it does not compile.
pub trait ApplyParams {
    fn apply(&self, params: &mut QueryParams);
}

/// Fields the server should include in returned records, sent comma separated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(pub Vec<String>);

impl Fields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }
}

impl ApplyParams for Fields {
    fn apply(&self, params: &mut QueryParams) {
        if !self.0.is_empty() {
            params.set("fields", self.0.join(","));
        }
    }
}

/// Options of the search, ranking and similar list operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOption {
    Fields(Fields),
    Limit(u32),
    Offset(u32),
    Nsfw(bool),
}

impl ApplyParams for ListOption {
    fn apply(&self, params: &mut QueryParams) {
        match self {
            ListOption::Fields(fields) => fields.apply(params),
            ListOption::Limit(limit) => params.set_limit(*limit),
            ListOption::Offset(offset) => params.set_offset(*offset),
            ListOption::Nsfw(nsfw) => params.set_nsfw(*nsfw),
        }
    }
}

/// Options of the details operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsOption {
    Fields(Fields),
}

impl ApplyParams for DetailsOption {
    fn apply(&self, params: &mut QueryParams) {
        match self {
            DetailsOption::Fields(fields) => fields.apply(params),
        }
    }
}

/// Next and previous page urls of a list response
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Paging {
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Envelope of every list response of the current API
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Paging,
}

/// `{"node": X}` wrapper used by list items
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Node<T> {
    pub node: T,
}

pub(crate) fn into_nodes<T>(nodes: Vec<Node<T>>) -> Vec<T> {
    nodes.into_iter().map(|n| n.node).collect()
}

/// Extracts the `offset` query parameter of a page url
pub fn extract_offset(page_url: &str) -> Result<u32> {
    let url = Url::parse(page_url).map_err(|source| Error::InvalidPageUrl {
        url: page_url.to_owned(),
        source,
        response: None,
    })?;

    let value = url
        .query_pairs()
        .find(|(key, _)| key == "offset")
        .map(|(_, value)| value.into_owned());
    let offset = value.as_deref().and_then(|v| v.parse::<u32>().ok());

    match offset {
        Some(offset) => Ok(offset),
        None => Err(Error::InvalidOffset {
            url: page_url.to_owned(),
            value,
            response: None,
        }),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Picture {
    pub medium: String,
    pub large: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AlternativeTitles {
    pub synonyms: Vec<String>,
    pub en: String,
    pub ja: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Studio {
    pub id: u64,
    pub name: String,
}
