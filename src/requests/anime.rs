//! Anime part of the myanimelist API.
//!
//! The legacy operations ([`add`](AnimeService::add), [`update`](AnimeService::update),
//! [`delete`](AnimeService::delete), [`search`](AnimeService::search) and
//! [`user_list`](AnimeService::user_list)) speak XML and authenticate with the
//! client credentials. Everything else targets the current REST API.
//!
//! Entries can be constructed with the builder syntax from the [bon] crate

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;

use super::manga::RelatedManga;
use super::payload::{comma_separated, deserialize_status, flag, mmddyyyy};
use super::query_utils::{
    into_nodes, AlternativeTitles, ApplyParams, DetailsOption, Fields, Genre, ListOption, Node,
    Picture, QueryParams, SearchQuery, Studio, UserListQuery,
};
use super::{Generation, MalClient, Response, Result};

/// Status of an anime entry as understood by the legacy API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimeEntryStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl AnimeEntryStatus {
    const ALL: [Self; 5] = [
        Self::Watching,
        Self::Completed,
        Self::OnHold,
        Self::Dropped,
        Self::PlanToWatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimeEntryStatus::Watching => "watching",
            AnimeEntryStatus::Completed => "completed",
            AnimeEntryStatus::OnHold => "onhold",
            AnimeEntryStatus::Dropped => "dropped",
            AnimeEntryStatus::PlanToWatch => "plantowatch",
        }
    }
}

impl Serialize for AnimeEntryStatus {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnimeEntryStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        deserialize_status(d, &Self::ALL, Self::as_str)
    }
}

/// Values an anime will have on the user's list once added or updated.
/// Unset fields are left out of the payload. The server requires `status` when adding
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, bon::Builder)]
#[serde(rename = "entry", default)]
pub struct AnimeEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnimeEntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_episodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_rewatched: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewatch_value: Option<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "mmddyyyy"
    )]
    pub date_start: Option<NaiveDate>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "mmddyyyy"
    )]
    pub date_finish: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", with = "flag")]
    pub enable_discussion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", with = "flag")]
    pub enable_rewatching: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub fansub_group: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "comma_separated"
    )]
    pub tags: Option<Vec<String>>,
}

/// Result of a legacy anime search
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AnimeResult {
    #[serde(rename = "entry", default)]
    pub rows: Vec<AnimeRow>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AnimeRow {
    pub id: u64,
    pub title: String,
    pub english: String,
    pub synonyms: String,
    pub score: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub synopsis: String,
    pub image: String,
    pub episodes: u32,
}

/// Anime list of a user as returned by `malappinfo.php`
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AnimeList {
    #[serde(rename = "myinfo", default)]
    pub my_info: AnimeMyInfo,
    #[serde(rename = "anime", default)]
    pub anime: Vec<ListAnime>,
}

/// Stats about the anime in the user's list
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AnimeMyInfo {
    pub user_id: u64,
    pub user_name: String,
    pub user_watching: u32,
    pub user_completed: u32,
    pub user_onhold: u32,
    pub user_dropped: u32,
    pub user_plantowatch: u32,
    pub user_days_spent_watching: String,
}

/// Anime of a legacy user list. `series_*` fields describe the anime, `my_*`
/// fields the user's entry
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ListAnime {
    pub series_animedb_id: u64,
    pub series_title: String,
    pub series_synonyms: String,
    pub series_type: u32,
    pub series_episodes: u32,
    pub series_status: u32,
    pub series_start: String,
    pub series_end: String,
    pub series_image: String,
    pub my_id: u64,
    pub my_watched_episodes: u32,
    pub my_start_date: String,
    pub my_finish_date: String,
    pub my_score: u8,
    pub my_status: u8,
    pub my_rewatching: u8,
    pub my_rewatching_ep: u32,
    pub my_last_updated: String,
    pub my_tags: String,
}

/// Status of an anime in the user's list on the current API
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnimeStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl AnimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimeStatus::Watching => "watching",
            AnimeStatus::Completed => "completed",
            AnimeStatus::OnHold => "on_hold",
            AnimeStatus::Dropped => "dropped",
            AnimeStatus::PlanToWatch => "plan_to_watch",
        }
    }
}

/// The user's tracking state of an anime
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AnimeListStatus {
    pub status: Option<AnimeStatus>,
    pub score: u8,
    #[serde(alias = "num_watched_episodes")]
    pub num_episodes_watched: u32,
    pub is_rewatching: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub priority: u8,
    pub num_times_rewatched: u32,
    pub rewatch_value: u8,
    pub tags: Vec<String>,
    pub comments: String,
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StartSeason {
    pub year: u32,
    pub season: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Broadcast {
    pub day_of_the_week: String,
    pub start_time: String,
}

/// Number of users per list status. The server sends the counts as strings
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StatusCounts {
    pub watching: String,
    pub completed: String,
    pub on_hold: String,
    pub dropped: String,
    pub plan_to_watch: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Statistics {
    pub status: StatusCounts,
    pub num_list_users: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AnimeRecommendation {
    pub node: Anime,
    pub num_recommendations: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RelatedAnime {
    pub node: Anime,
    pub relation_type: String,
    pub relation_type_formatted: String,
}

/// Anime as returned by the current API. Which fields are populated depends on
/// the requested [Fields]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Anime {
    pub id: u64,
    pub title: String,
    pub main_picture: Option<Picture>,
    pub alternative_titles: Option<AlternativeTitles>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub synopsis: Option<String>,
    pub mean: Option<f64>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub num_list_users: Option<u32>,
    pub num_scoring_users: Option<u32>,
    pub nsfw: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub media_type: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<Genre>,
    pub my_list_status: Option<AnimeListStatus>,
    pub num_episodes: Option<u32>,
    pub start_season: Option<StartSeason>,
    pub broadcast: Option<Broadcast>,
    pub source: Option<String>,
    pub average_episode_duration: Option<u32>,
    pub rating: Option<String>,
    pub pictures: Vec<Picture>,
    pub background: Option<String>,
    pub related_anime: Vec<RelatedAnime>,
    pub related_manga: Vec<RelatedManga>,
    pub recommendations: Vec<AnimeRecommendation>,
    pub studios: Vec<Studio>,
    pub statistics: Option<Statistics>,
}

/// Ranking types of [`AnimeService::ranking`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimeRanking {
    All,
    Airing,
    Upcoming,
    Tv,
    Ova,
    Movie,
    Special,
    ByPopularity,
    Favorite,
}

impl AnimeRanking {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimeRanking::All => "all",
            AnimeRanking::Airing => "airing",
            AnimeRanking::Upcoming => "upcoming",
            AnimeRanking::Tv => "tv",
            AnimeRanking::Ova => "ova",
            AnimeRanking::Movie => "movie",
            AnimeRanking::Special => "special",
            AnimeRanking::ByPopularity => "bypopularity",
            AnimeRanking::Favorite => "favorite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortSeasonalAnime {
    AnimeScore,
    AnimeNumListUsers,
}

impl SortSeasonalAnime {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortSeasonalAnime::AnimeScore => "anime_score",
            SortSeasonalAnime::AnimeNumListUsers => "anime_num_list_users",
        }
    }
}

/// Options of [`AnimeService::seasonal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonalOption {
    Sort(SortSeasonalAnime),
    Fields(Fields),
    Limit(u32),
    Offset(u32),
    Nsfw(bool),
}

impl ApplyParams for SeasonalOption {
    fn apply(&self, params: &mut QueryParams) {
        match self {
            SeasonalOption::Sort(sort) => params.set("sort", sort.as_str()),
            SeasonalOption::Fields(fields) => fields.apply(params),
            SeasonalOption::Limit(limit) => params.set_limit(*limit),
            SeasonalOption::Offset(offset) => params.set_offset(*offset),
            SeasonalOption::Nsfw(nsfw) => params.set_nsfw(*nsfw),
        }
    }
}

/// Options of [`AnimeService::update_my_list_status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMyAnimeListStatusOption {
    Status(AnimeStatus),
    IsRewatching(bool),
    Score(u8),
    NumEpisodesWatched(u32),
    Priority(u8),
    NumTimesRewatched(u32),
    /// 0 = no value, 1 = very low ... 5 = very high
    RewatchValue(u8),
    Tags(Vec<String>),
    Comments(String),
}

impl ApplyParams for UpdateMyAnimeListStatusOption {
    fn apply(&self, params: &mut QueryParams) {
        use UpdateMyAnimeListStatusOption::*;

        match self {
            Status(status) => params.set("status", status.as_str()),
            IsRewatching(rewatching) => params.set("is_rewatching", rewatching.to_string()),
            Score(score) => params.set("score", score.to_string()),
            NumEpisodesWatched(n) => params.set("num_watched_episodes", n.to_string()),
            Priority(priority) => params.set("priority", priority.to_string()),
            NumTimesRewatched(n) => params.set("num_times_rewatched", n.to_string()),
            RewatchValue(value) => params.set("rewatch_value", value.to_string()),
            Tags(tags) => params.set_tags(tags),
            Comments(comments) => params.set("comments", comments.as_str()),
        }
    }
}

/// Handles communication with the anime methods of the myanimelist API
#[derive(Debug, Clone, Copy)]
pub struct AnimeService<'a> {
    pub(crate) client: &'a MalClient,
}

impl AnimeService<'_> {
    const ADD_ENDPOINT: &'static str = "api/animelist/add/";
    const UPDATE_ENDPOINT: &'static str = "api/animelist/update/";
    const DELETE_ENDPOINT: &'static str = "api/animelist/delete/";

    /// Adds the anime with the given `id` to the authenticated user's list
    #[tracing::instrument(skip(self, entry))]
    pub async fn add(&self, id: u64, entry: &AnimeEntry) -> Result<Response> {
        self.client.legacy_post(Self::ADD_ENDPOINT, id, entry).await
    }

    /// Updates the anime with the given `id` on the authenticated user's list.
    ///
    /// The server only bumps the entry's last-updated time when the episode changes
    #[tracing::instrument(skip(self, entry))]
    pub async fn update(&self, id: u64, entry: &AnimeEntry) -> Result<Response> {
        self.client.legacy_post(Self::UPDATE_ENDPOINT, id, entry).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<Response> {
        self.client.legacy_delete(Self::DELETE_ENDPOINT, id).await
    }

    /// Searches anime titles on the legacy API. `%` acts as a wildcard.
    /// Nothing found is an empty result
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<(AnimeResult, Response)> {
        self.client
            .legacy_query("api/anime/search.xml", &SearchQuery { q: query })
            .await
    }

    /// Anime list of `username` from `malappinfo.php`
    #[tracing::instrument(skip(self))]
    pub async fn user_list(&self, username: &str) -> Result<(AnimeList, Response)> {
        let query = UserListQuery {
            status: "all",
            kind: "anime",
            u: username,
        };

        self.client.legacy_query("malappinfo.php", &query).await
    }

    /// Searches anime by `query` on the current API
    #[tracing::instrument(skip(self, options))]
    pub async fn list(&self, query: &str, options: &[ListOption]) -> Result<(Vec<Anime>, Response)> {
        let mut params = QueryParams::from_options(options);
        params.set("q", query);

        let request = self
            .client
            .build_request_with_params(Method::GET, "anime", params)?;
        let (nodes, response) = self.client.fetch_page::<Node<Anime>>(request).await?;

        Ok((into_nodes(nodes), response))
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn details(&self, id: u64, options: &[DetailsOption]) -> Result<(Anime, Response)> {
        let request = self
            .client
            .build_request(Method::GET, &format!("anime/{id}"), options)?;

        self.client.send_decoded(request, Generation::Current).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn ranking(
        &self,
        ranking: AnimeRanking,
        options: &[ListOption],
    ) -> Result<(Vec<Anime>, Response)> {
        let mut params = QueryParams::from_options(options);
        params.set("ranking_type", ranking.as_str());

        let request = self
            .client
            .build_request_with_params(Method::GET, "anime/ranking", params)?;
        let (nodes, response) = self.client.fetch_page::<Node<Anime>>(request).await?;

        Ok((into_nodes(nodes), response))
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn seasonal(
        &self,
        year: u32,
        season: Season,
        options: &[SeasonalOption],
    ) -> Result<(Vec<Anime>, Response)> {
        let path = format!("anime/season/{year}/{}", season.as_str());
        let request = self.client.build_request(Method::GET, &path, options)?;
        let (nodes, response) = self.client.fetch_page::<Node<Anime>>(request).await?;

        Ok((into_nodes(nodes), response))
    }

    /// Adds the anime to the user's list or, if already there, updates only
    /// the fields given as options
    #[tracing::instrument(skip(self, options))]
    pub async fn update_my_list_status(
        &self,
        id: u64,
        options: &[UpdateMyAnimeListStatusOption],
    ) -> Result<(AnimeListStatus, Response)> {
        let request = self.client.build_request(
            Method::PATCH,
            &format!("anime/{id}/my_list_status"),
            options,
        )?;

        self.client.send_decoded(request, Generation::Current).await
    }

    /// Removes the anime from the user's list. The server answers 404 when it
    /// is not in the list
    #[tracing::instrument(skip(self))]
    pub async fn delete_my_list_item(&self, id: u64) -> Result<Response> {
        let request = self.client.build_request_with_params(
            Method::DELETE,
            &format!("anime/{id}/my_list_status"),
            QueryParams::new(),
        )?;

        self.client.send(request).await
    }
}
