//! Manga part of the myanimelist API

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;

use super::anime::RelatedAnime;
use super::payload::{comma_separated, deserialize_status, flag, mmddyyyy};
use super::query_utils::{
    into_nodes, AlternativeTitles, ApplyParams, DetailsOption, Genre, ListOption, Node, Picture,
    QueryParams, SearchQuery, UserListQuery,
};
use super::{Generation, MalClient, Response, Result};

/// Status of a manga entry as understood by the legacy API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MangaEntryStatus {
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToRead,
}

impl MangaEntryStatus {
    const ALL: [Self; 5] = [
        Self::Reading,
        Self::Completed,
        Self::OnHold,
        Self::Dropped,
        Self::PlanToRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MangaEntryStatus::Reading => "reading",
            MangaEntryStatus::Completed => "completed",
            MangaEntryStatus::OnHold => "onhold",
            MangaEntryStatus::Dropped => "dropped",
            MangaEntryStatus::PlanToRead => "plantoread",
        }
    }
}

impl Serialize for MangaEntryStatus {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MangaEntryStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        deserialize_status(d, &Self::ALL, Self::as_str)
    }
}

/// Values a manga will have on the user's list once added or updated.
/// Unset fields are left out of the payload
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, bon::Builder)]
#[serde(rename = "entry", default)]
pub struct MangaEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MangaEntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_reread: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reread_value: Option<u8>,
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
    pub enable_rereading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub scan_group: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "comma_separated"
    )]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_volumes: Option<u32>,
}

/// Result of a legacy manga search
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MangaResult {
    #[serde(rename = "entry", default)]
    pub rows: Vec<MangaRow>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MangaRow {
    pub id: u64,
    pub title: String,
    pub english: String,
    pub synonyms: String,
    pub chapters: u32,
    pub volumes: u32,
    pub score: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub synopsis: String,
    pub image: String,
}

/// Manga list of a user as returned by `malappinfo.php`
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MangaList {
    #[serde(rename = "myinfo", default)]
    pub my_info: MangaMyInfo,
    #[serde(rename = "manga", default)]
    pub manga: Vec<ListManga>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MangaMyInfo {
    pub user_id: u64,
    pub user_name: String,
    pub user_reading: u32,
    pub user_completed: u32,
    pub user_onhold: u32,
    pub user_dropped: u32,
    pub user_plantoread: u32,
    pub user_days_spent_watching: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ListManga {
    pub series_mangadb_id: u64,
    pub series_title: String,
    pub series_synonyms: String,
    pub series_type: u32,
    pub series_chapters: u32,
    pub series_volumes: u32,
    pub series_status: u32,
    pub series_start: String,
    pub series_end: String,
    pub series_image: String,
    pub my_id: u64,
    pub my_read_chapters: u32,
    pub my_read_volumes: u32,
    pub my_start_date: String,
    pub my_finish_date: String,
    pub my_score: u8,
    pub my_status: u8,
    /// The server really spells this tag with a double `g`
    #[serde(rename = "my_rereadingg")]
    pub my_rereading: u8,
    pub my_rereading_chap: u32,
    pub my_last_updated: String,
    pub my_tags: String,
}

/// Status of a manga in the user's list on the current API
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MangaStatus {
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToRead,
}

impl MangaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MangaStatus::Reading => "reading",
            MangaStatus::Completed => "completed",
            MangaStatus::OnHold => "on_hold",
            MangaStatus::Dropped => "dropped",
            MangaStatus::PlanToRead => "plan_to_read",
        }
    }
}

/// The user's tracking state of a manga
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MangaListStatus {
    pub status: Option<MangaStatus>,
    pub is_rereading: bool,
    pub num_volumes_read: u32,
    pub num_chapters_read: u32,
    pub score: u8,
    pub updated_at: Option<DateTime<Utc>>,
    pub priority: u8,
    pub num_times_reread: u32,
    pub reread_value: u8,
    pub tags: Vec<String>,
    pub comments: String,
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Person {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Author {
    pub node: Person,
    pub role: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Magazine {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Serialization {
    pub node: Magazine,
    pub role: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RelatedManga {
    pub node: Manga,
    pub relation_type: String,
    pub relation_type_formatted: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MangaRecommendation {
    pub node: Manga,
    pub num_recommendations: u32,
}

/// Manga as returned by the current API
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Manga {
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
    pub my_list_status: Option<MangaListStatus>,
    pub num_volumes: Option<u32>,
    pub num_chapters: Option<u32>,
    pub authors: Vec<Author>,
    pub pictures: Vec<Picture>,
    pub background: Option<String>,
    pub related_anime: Vec<RelatedAnime>,
    pub related_manga: Vec<RelatedManga>,
    pub recommendations: Vec<MangaRecommendation>,
    pub serialization: Vec<Serialization>,
}

/// Ranking types of [`MangaService::ranking`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MangaRanking {
    All,
    Manga,
    Novels,
    Oneshots,
    Doujin,
    Manhwa,
    Manhua,
    ByPopularity,
    Favorite,
}

impl MangaRanking {
    pub fn as_str(&self) -> &'static str {
        match self {
            MangaRanking::All => "all",
            MangaRanking::Manga => "manga",
            MangaRanking::Novels => "novels",
            MangaRanking::Oneshots => "oneshots",
            MangaRanking::Doujin => "doujin",
            MangaRanking::Manhwa => "manhwa",
            MangaRanking::Manhua => "manhua",
            MangaRanking::ByPopularity => "bypopularity",
            MangaRanking::Favorite => "favorite",
        }
    }
}

/// Options of [`MangaService::update_my_list_status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMyMangaListStatusOption {
    Status(MangaStatus),
    IsRereading(bool),
    Score(u8),
    NumVolumesRead(u32),
    NumChaptersRead(u32),
    Priority(u8),
    NumTimesReread(u32),
    /// 0 = no value, 1 = very low ... 5 = very high
    RereadValue(u8),
    Tags(Vec<String>),
    Comments(String),
}

impl ApplyParams for UpdateMyMangaListStatusOption {
    fn apply(&self, params: &mut QueryParams) {
        use UpdateMyMangaListStatusOption::*;

        match self {
            Status(status) => params.set("status", status.as_str()),
            IsRereading(rereading) => params.set("is_rereading", rereading.to_string()),
            Score(score) => params.set("score", score.to_string()),
            NumVolumesRead(n) => params.set("num_volumes_read", n.to_string()),
            NumChaptersRead(n) => params.set("num_chapters_read", n.to_string()),
            Priority(priority) => params.set("priority", priority.to_string()),
            NumTimesReread(n) => params.set("num_times_reread", n.to_string()),
            RereadValue(value) => params.set("reread_value", value.to_string()),
            Tags(tags) => params.set_tags(tags),
            Comments(comments) => params.set("comments", comments.as_str()),
        }
    }
}

/// Handles communication with the manga methods of the myanimelist API
#[derive(Debug, Clone, Copy)]
pub struct MangaService<'a> {
    pub(crate) client: &'a MalClient,
}

impl MangaService<'_> {
    const ADD_ENDPOINT: &'static str = "api/mangalist/add/";
    const UPDATE_ENDPOINT: &'static str = "api/mangalist/update/";
    const DELETE_ENDPOINT: &'static str = "api/mangalist/delete/";

    #[tracing::instrument(skip(self, entry))]
    pub async fn add(&self, id: u64, entry: &MangaEntry) -> Result<Response> {
        self.client.legacy_post(Self::ADD_ENDPOINT, id, entry).await
    }

    #[tracing::instrument(skip(self, entry))]
    pub async fn update(&self, id: u64, entry: &MangaEntry) -> Result<Response> {
        self.client.legacy_post(Self::UPDATE_ENDPOINT, id, entry).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<Response> {
        self.client.legacy_delete(Self::DELETE_ENDPOINT, id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<(MangaResult, Response)> {
        self.client
            .legacy_query("api/manga/search.xml", &SearchQuery { q: query })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn user_list(&self, username: &str) -> Result<(MangaList, Response)> {
        let query = UserListQuery {
            status: "all",
            kind: "manga",
            u: username,
        };

        self.client.legacy_query("malappinfo.php", &query).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn list(&self, query: &str, options: &[ListOption]) -> Result<(Vec<Manga>, Response)> {
        let mut params = QueryParams::from_options(options);
        params.set("q", query);

        let request = self
            .client
            .build_request_with_params(Method::GET, "manga", params)?;
        let (nodes, response) = self.client.fetch_page::<Node<Manga>>(request).await?;

        Ok((into_nodes(nodes), response))
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn details(&self, id: u64, options: &[DetailsOption]) -> Result<(Manga, Response)> {
        let request = self
            .client
            .build_request(Method::GET, &format!("manga/{id}"), options)?;

        self.client.send_decoded(request, Generation::Current).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn ranking(
        &self,
        ranking: MangaRanking,
        options: &[ListOption],
    ) -> Result<(Vec<Manga>, Response)> {
        let mut params = QueryParams::from_options(options);
        params.set("ranking_type", ranking.as_str());

        let request = self
            .client
            .build_request_with_params(Method::GET, "manga/ranking", params)?;
        let (nodes, response) = self.client.fetch_page::<Node<Manga>>(request).await?;

        Ok((into_nodes(nodes), response))
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn update_my_list_status(
        &self,
        id: u64,
        options: &[UpdateMyMangaListStatusOption],
    ) -> Result<(MangaListStatus, Response)> {
        let request = self.client.build_request(
            Method::PATCH,
            &format!("manga/{id}/my_list_status"),
            options,
        )?;

        self.client.send_decoded(request, Generation::Current).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_my_list_item(&self, id: u64) -> Result<Response> {
        let request = self.client.build_request_with_params(
            Method::DELETE,
            &format!("manga/{id}/my_list_status"),
            QueryParams::new(),
        )?;

        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::payload::{decode, encode_entry};

    #[test]
    fn entry_uses_manga_tags() {
        let entry = MangaEntry::builder()
            .chapter(12)
            .status(MangaEntryStatus::Reading)
            .enable_rereading(false)
            .scan_group("group")
            .retail_volumes(2)
            .build();

        assert_eq!(
            encode_entry(&entry).unwrap(),
            "<entry><chapter>12</chapter><status>reading</status>\
             <enable_rereading>0</enable_rereading><scan_group>group</scan_group>\
             <retail_volumes>2</retail_volumes></entry>"
        );
    }

    #[test]
    fn entry_survives_form_round_trip() {
        let entry = MangaEntry::builder()
            .chapter(245)
            .volume(27)
            .status(MangaEntryStatus::Completed)
            .score(10)
            .times_reread(1)
            .reread_value(5)
            .date_start(NaiveDate::from_ymd_opt(2001, 1, 31).unwrap())
            .date_finish(NaiveDate::from_ymd_opt(2002, 12, 1).unwrap())
            .priority(2)
            .enable_discussion(true)
            .enable_rereading(false)
            .comments("Ken & Raoh <3")
            .scan_group("Scans & Co")
            .tags(vec!["martial arts".to_owned(), "classic".to_owned()])
            .retail_volumes(27)
            .build();

        let request = crate::MalClient::new()
            .unwrap()
            .build_legacy_request(Method::POST, "api/mangalist/add/401.xml", Some(&entry))
            .unwrap();
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let (_, data) = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "data")
            .unwrap();

        let decoded: MangaEntry = quick_xml::de::from_str(&data).unwrap();

        assert_eq!(decoded, entry);
    }

    #[test]
    fn update_options_use_server_parameter_names() {
        let params = QueryParams::from_options(&[
            UpdateMyMangaListStatusOption::Status(MangaStatus::Reading),
            UpdateMyMangaListStatusOption::NumChaptersRead(40),
            UpdateMyMangaListStatusOption::RereadValue(3),
            UpdateMyMangaListStatusOption::Comments("nice".to_owned()),
        ]);

        assert_eq!(params.get("status"), Some("reading"));
        assert_eq!(params.get("num_chapters_read"), Some("40"));
        assert_eq!(params.get("reread_value"), Some("3"));
        assert_eq!(params.get("comments"), Some("nice"));
    }

    #[test]
    fn legacy_list_reads_misspelled_rereading_tag() {
        let body = br#"<myanimelist>
                <myinfo><user_id>7</user_id><user_reading>2</user_reading></myinfo>
                <manga>
                    <series_mangadb_id>2</series_mangadb_id>
                    <series_title>Berserk</series_title>
                    <my_read_chapters>300</my_read_chapters>
                    <my_rereadingg>1</my_rereadingg>
                </manga>
            </myanimelist>"#;

        let list: MangaList = decode(Generation::Legacy, body).unwrap();

        assert_eq!(list.my_info.user_reading, 2);
        assert_eq!(list.manga[0].series_mangadb_id, 2);
        assert_eq!(list.manga[0].my_read_chapters, 300);
        assert_eq!(list.manga[0].my_rereading, 1);
    }

    #[test]
    fn list_status_decodes() {
        let status: MangaListStatus = serde_json::from_str(
            r#"{"status":"plan_to_read","is_rereading":true,"num_volumes_read":3,
                "updated_at":"2018-04-25T15:59:52+00:00"}"#,
        )
        .unwrap();

        assert_eq!(status.status, Some(MangaStatus::PlanToRead));
        assert!(status.is_rereading);
        assert_eq!(status.num_volumes_read, 3);
        assert!(status.updated_at.is_some());
    }
}
