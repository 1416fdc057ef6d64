//! User lists and profile on the current API

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};
use reqwest::Method;

use super::anime::{Anime, AnimeListStatus, AnimeStatus};
use super::manga::{Manga, MangaListStatus, MangaStatus};
use super::query_utils::{ApplyParams, Fields, QueryParams};
use super::{Generation, MalClient, Response, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortAnimeList {
    ListScore,
    ListUpdatedAt,
    AnimeTitle,
    AnimeStartDate,
    AnimeId,
}

impl SortAnimeList {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortAnimeList::ListScore => "list_score",
            SortAnimeList::ListUpdatedAt => "list_updated_at",
            SortAnimeList::AnimeTitle => "anime_title",
            SortAnimeList::AnimeStartDate => "anime_start_date",
            SortAnimeList::AnimeId => "anime_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMangaList {
    ListScore,
    ListUpdatedAt,
    MangaTitle,
    MangaStartDate,
    MangaId,
}

impl SortMangaList {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMangaList::ListScore => "list_score",
            SortMangaList::ListUpdatedAt => "list_updated_at",
            SortMangaList::MangaTitle => "manga_title",
            SortMangaList::MangaStartDate => "manga_start_date",
            SortMangaList::MangaId => "manga_id",
        }
    }
}

/// Options of [`UserService::anime_list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimeListOption {
    /// Only entries with this status
    Status(AnimeStatus),
    Sort(SortAnimeList),
    Fields(Fields),
    Limit(u32),
    Offset(u32),
    Nsfw(bool),
}

impl ApplyParams for AnimeListOption {
    fn apply(&self, params: &mut QueryParams) {
        match self {
            AnimeListOption::Status(status) => params.set("status", status.as_str()),
            AnimeListOption::Sort(sort) => params.set("sort", sort.as_str()),
            AnimeListOption::Fields(fields) => fields.apply(params),
            AnimeListOption::Limit(limit) => params.set_limit(*limit),
            AnimeListOption::Offset(offset) => params.set_offset(*offset),
            AnimeListOption::Nsfw(nsfw) => params.set_nsfw(*nsfw),
        }
    }
}

/// Options of [`UserService::manga_list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MangaListOption {
    Status(MangaStatus),
    Sort(SortMangaList),
    Fields(Fields),
    Limit(u32),
    Offset(u32),
    Nsfw(bool),
}

impl ApplyParams for MangaListOption {
    fn apply(&self, params: &mut QueryParams) {
        match self {
            MangaListOption::Status(status) => params.set("status", status.as_str()),
            MangaListOption::Sort(sort) => params.set("sort", sort.as_str()),
            MangaListOption::Fields(fields) => fields.apply(params),
            MangaListOption::Limit(limit) => params.set_limit(*limit),
            MangaListOption::Offset(offset) => params.set_offset(*offset),
            MangaListOption::Nsfw(nsfw) => params.set_nsfw(*nsfw),
        }
    }
}

/// Options of [`UserService::my_info`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MyInfoOption {
    Fields(Fields),
}

impl ApplyParams for MyInfoOption {
    fn apply(&self, params: &mut QueryParams) {
        match self {
            MyInfoOption::Fields(fields) => fields.apply(params),
        }
    }
}

/// Anime of a user's list along with its status on that list
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UserAnime {
    #[serde(rename = "node")]
    pub anime: Anime,
    pub list_status: AnimeListStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UserManga {
    #[serde(rename = "node")]
    pub manga: Manga,
    pub list_status: MangaListStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AnimeStatistics {
    pub num_items_watching: u32,
    pub num_items_completed: u32,
    pub num_items_on_hold: u32,
    pub num_items_dropped: u32,
    pub num_items_plan_to_watch: u32,
    pub num_items: u32,
    pub num_days_watched: f64,
    pub num_days_watching: f64,
    pub num_days_completed: f64,
    pub num_days_on_hold: f64,
    pub num_days_dropped: f64,
    pub num_days: f64,
    pub num_episodes: u32,
    pub num_times_rewatched: u32,
    pub mean_score: f64,
}

/// Profile of the authenticated user
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UserInfo {
    pub id: u64,
    pub name: String,
    pub picture: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<String>,
    pub location: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub anime_statistics: Option<AnimeStatistics>,
    pub time_zone: Option<String>,
    pub is_supporter: Option<bool>,
}

/// Handles communication with the user methods of the myanimelist API
#[derive(Debug, Clone, Copy)]
pub struct UserService<'a> {
    pub(crate) client: &'a MalClient,
}

impl UserService<'_> {
    /// Anime list of `username`. `@me` names the authenticated user. The name
    /// is sent as a single path segment
    #[tracing::instrument(skip(self, options))]
    pub async fn anime_list(
        &self,
        username: &str,
        options: &[AnimeListOption],
    ) -> Result<(Vec<UserAnime>, Response)> {
        let url = self.client.api_url(&["users", username, "animelist"])?;
        let params = QueryParams::from_options(options);
        let request = self.client.build_request_at(Method::GET, url, params)?;

        self.client.fetch_page(request).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn manga_list(
        &self,
        username: &str,
        options: &[MangaListOption],
    ) -> Result<(Vec<UserManga>, Response)> {
        let url = self.client.api_url(&["users", username, "mangalist"])?;
        let params = QueryParams::from_options(options);
        let request = self.client.build_request_at(Method::GET, url, params)?;

        self.client.fetch_page(request).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn my_info(&self, options: &[MyInfoOption]) -> Result<(UserInfo, Response)> {
        let request = self.client.build_request(Method::GET, "users/@me", options)?;

        self.client.send_decoded(request, Generation::Current).await
    }
}
