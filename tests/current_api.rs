use mal_api::requests::anime::{
    AnimeRanking, AnimeStatus, Season, SeasonalOption, SortSeasonalAnime,
    UpdateMyAnimeListStatusOption,
};
use mal_api::requests::manga::{MangaRanking, MangaStatus, UpdateMyMangaListStatusOption};
use mal_api::requests::query_utils::{DetailsOption, Fields, ListOption};
use mal_api::requests::user::{AnimeListOption, MangaListOption, MyInfoOption, SortMangaList};
use mal_api::{bearer_transport, ClientConfig, Error, MalClient};

use reqwest::StatusCode;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANIME_LIST: &str = include_str!("testdata/animeList.json");
const ANIME_DETAILS: &str = include_str!("testdata/animeDetails.json");
const ANIME_RANKING: &str = include_str!("testdata/animeRanking.json");
const MANGA_DETAILS: &str = include_str!("testdata/mangaDetails.json");
const USER_MANGA_LIST: &str = include_str!("testdata/userMangaList.json");
const MY_INFO: &str = include_str!("testdata/myInfo.json");

fn client(server: &MockServer) -> MalClient {
    MalClient::with_config(
        ClientConfig::builder()
            .transport(bearer_transport("test-token").unwrap())
            .api_base_url(format!("{}/v2/", server.uri()))
            .build(),
    )
    .unwrap()
}

fn json(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json")
}

#[tokio::test]
async fn anime_list_fills_paging_offsets() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/anime"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("q", "hokuto no ken"))
        .and(query_param("fields", "rank,popularity,start_season"))
        .and(query_param("limit", "5"))
        .and(query_param_is_missing("offset"))
        .respond_with(json(ANIME_LIST))
        .expect(1)
        .mount(&server)
        .await;

    let (anime, response) = client(&server)
        .anime()
        .list(
            "hokuto no ken",
            &[
                ListOption::Fields(Fields::new(["rank", "popularity", "start_season"])),
                ListOption::Limit(5),
                ListOption::Offset(0),
            ],
        )
        .await
        .unwrap();

    let summary: Vec<_> = anime
        .iter()
        .map(|a| (a.id, a.rank, a.popularity, a.start_season.as_ref().map(|s| s.year)))
        .collect();

    assert_eq!(
        summary,
        vec![
            (967, Some(556), Some(1410), Some(1984)),
            (1356, Some(1423), Some(3367), Some(1987)),
            (1358, Some(2757), Some(3964), Some(1986)),
        ]
    );
    assert_eq!(response.next_offset, Some(5));
    assert_eq!(response.prev_offset, Some(0));
}

#[tokio::test]
async fn anime_details() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/anime/967"))
        .and(query_param("fields", "alternative_titles,studios,genres"))
        .respond_with(json(ANIME_DETAILS))
        .mount(&server)
        .await;

    let (anime, response) = client(&server)
        .anime()
        .details(
            967,
            &[DetailsOption::Fields(Fields::new([
                "alternative_titles",
                "studios",
                "genres",
            ]))],
        )
        .await
        .unwrap();

    assert_eq!(anime.title, "Hokuto no Ken");
    assert_eq!(
        anime.alternative_titles.unwrap().en,
        "Fist of the North Star"
    );
    assert_eq!(anime.num_episodes, Some(109));
    assert_eq!(anime.studios[0].name, "Toei Animation");
    assert_eq!(anime.genres.len(), 5);
    assert_eq!(anime.average_episode_duration, Some(1500));
    assert!(anime.created_at.is_some());
    assert_eq!(response.next_offset, None);
}

#[tokio::test]
async fn anime_ranking() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/anime/ranking"))
        .and(query_param("ranking_type", "airing"))
        .and(query_param("fields", "rank,popularity"))
        .and(query_param("limit", "6"))
        .respond_with(json(ANIME_RANKING))
        .mount(&server)
        .await;

    let (anime, response) = client(&server)
        .anime()
        .ranking(
            AnimeRanking::Airing,
            &[
                ListOption::Fields(Fields::new(["rank", "popularity"])),
                ListOption::Limit(6),
            ],
        )
        .await
        .unwrap();

    let ranks: Vec<_> = anime.iter().map(|a| a.rank.unwrap_or_default()).collect();

    assert_eq!(ranks, vec![2, 59, 67, 69, 83, 85]);
    assert_eq!(anime[5].title, "Horimiya");
    assert_eq!(response.next_offset, Some(6));
    assert_eq!(response.prev_offset, None);
}

#[tokio::test]
async fn seasonal_anime() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/anime/season/1984/fall"))
        .and(query_param("sort", "anime_score"))
        .respond_with(json(ANIME_LIST))
        .mount(&server)
        .await;

    let (anime, _) = client(&server)
        .anime()
        .seasonal(
            1984,
            Season::Fall,
            &[SeasonalOption::Sort(SortSeasonalAnime::AnimeScore)],
        )
        .await
        .unwrap();

    assert_eq!(anime.len(), 3);
}

#[tokio::test]
async fn delete_my_anime_list_item() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v2/anime/967/my_list_status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .anime()
        .delete_my_list_item(967)
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_missing_item_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v2/manga/401/my_list_status"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"not_found"}"#))
        .mount(&server)
        .await;

    let err = client(&server)
        .manga()
        .delete_my_list_item(401)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RequestFailed { .. }));
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.response().unwrap().text(), r#"{"error":"not_found"}"#);
}

#[tokio::test]
async fn update_my_anime_list_status() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v2/anime/967/my_list_status"))
        .and(query_param("status", "watching"))
        .and(query_param("num_watched_episodes", "5"))
        .and(query_param("score", "8"))
        .respond_with(json(
            r#"{"status":"watching","score":8,"num_episodes_watched":5,"is_rewatching":false}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _) = client(&server)
        .anime()
        .update_my_list_status(
            967,
            &[
                UpdateMyAnimeListStatusOption::Status(AnimeStatus::Watching),
                UpdateMyAnimeListStatusOption::NumEpisodesWatched(5),
                UpdateMyAnimeListStatusOption::Score(8),
            ],
        )
        .await
        .unwrap();

    assert_eq!(status.status, Some(AnimeStatus::Watching));
    assert_eq!(status.num_episodes_watched, 5);
    assert_eq!(status.score, 8);
}

#[tokio::test]
async fn update_my_manga_list_status() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v2/manga/401/my_list_status"))
        .and(query_param("is_rereading", "true"))
        .and(query_param("num_volumes_read", "27"))
        .respond_with(json(r#"{"status":"completed","is_rereading":true,"num_volumes_read":27}"#))
        .mount(&server)
        .await;

    let (status, _) = client(&server)
        .manga()
        .update_my_list_status(
            401,
            &[
                UpdateMyMangaListStatusOption::IsRereading(true),
                UpdateMyMangaListStatusOption::NumVolumesRead(27),
            ],
        )
        .await
        .unwrap();

    assert_eq!(status.status, Some(MangaStatus::Completed));
    assert!(status.is_rereading);
}

#[tokio::test]
async fn manga_details() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/manga/401"))
        .respond_with(json(MANGA_DETAILS))
        .mount(&server)
        .await;

    let (manga, _) = client(&server).manga().details(401, &[]).await.unwrap();

    assert_eq!(manga.num_volumes, Some(27));
    assert_eq!(manga.num_chapters, Some(245));
    assert_eq!(manga.authors[0].node.last_name, "Hara");
    assert_eq!(manga.authors[1].role, "Story");
    assert_eq!(manga.serialization[0].node.name, "Shounen Jump (Weekly)");
}

#[tokio::test]
async fn user_manga_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/users/TestUser/mangalist"))
        .and(query_param("status", "reading"))
        .and(query_param("sort", "list_score"))
        .respond_with(json(USER_MANGA_LIST))
        .mount(&server)
        .await;

    let (list, response) = client(&server)
        .users()
        .manga_list(
            "TestUser",
            &[
                MangaListOption::Status(MangaStatus::Reading),
                MangaListOption::Sort(SortMangaList::ListScore),
            ],
        )
        .await
        .unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0].manga.title, "Berserk");
    assert_eq!(list[0].list_status.num_chapters_read, 346);
    assert_eq!(list[1].list_status.status, Some(MangaStatus::Completed));
    assert_eq!(response.next_offset, None);
    assert_eq!(response.prev_offset, None);
}

#[tokio::test]
async fn my_info() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/users/@me"))
        .and(query_param("fields", "anime_statistics"))
        .respond_with(json(MY_INFO))
        .mount(&server)
        .await;

    let (user, _) = client(&server)
        .users()
        .my_info(&[MyInfoOption::Fields(Fields::new(["anime_statistics"]))])
        .await
        .unwrap();

    assert_eq!(user.name, "TestUser");
    let stats = user.anime_statistics.unwrap();
    assert_eq!(stats.num_items_completed, 120);
    assert_eq!(stats.num_episodes, 2401);
}

#[tokio::test]
async fn page_url_without_offset_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/anime"))
        .respond_with(json(
            r#"{"data":[],"paging":{"next":"https://api.myanimelist.net/v2/anime?limit=3"}}"#,
        ))
        .mount(&server)
        .await;

    let err = client(&server)
        .anime()
        .list("x", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidOffset { value: None, .. }));

    let response = err.response().unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("limit=3"));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/anime/1"))
        .respond_with(json("not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .anime()
        .details(1, &[])
        .await
        .unwrap_err();

    match &err {
        Error::DecodeFailed { snippet, .. } => assert_eq!(snippet, "not json"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status(), Some(StatusCode::OK));
}

#[tokio::test]
async fn manga_ranking_and_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/manga/ranking"))
        .and(query_param("ranking_type", "bypopularity"))
        .respond_with(json(r#"{"data":[{"node":{"id":2,"title":"Berserk"}}],"paging":{}}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/manga"))
        .and(query_param("q", "berserk"))
        .and(query_param("nsfw", "false"))
        .respond_with(json(r#"{"data":[{"node":{"id":2,"title":"Berserk"}}]}"#))
        .mount(&server)
        .await;

    let client = client(&server);

    let (ranked, _) = client
        .manga()
        .ranking(MangaRanking::ByPopularity, &[])
        .await
        .unwrap();
    let (found, response) = client
        .manga()
        .list("berserk", &[ListOption::Nsfw(false)])
        .await
        .unwrap();

    assert_eq!(ranked[0].title, "Berserk");
    assert_eq!(found[0].id, 2);
    assert_eq!(response.next_offset, None);
}

#[tokio::test]
async fn user_anime_list_of_authenticated_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/users/@me/animelist"))
        .and(query_param("status", "watching"))
        .and(query_param("offset", "10"))
        .respond_with(json(
            r#"{"data":[{"node":{"id":967,"title":"Hokuto no Ken"},
                "list_status":{"status":"watching","num_episodes_watched":12}}],
                "paging":{"previous":"https://api.myanimelist.net/v2/users/@me/animelist?offset=0"}}"#,
        ))
        .mount(&server)
        .await;

    let (list, response) = client(&server)
        .users()
        .anime_list(
            "@me",
            &[
                AnimeListOption::Status(AnimeStatus::Watching),
                AnimeListOption::Offset(10),
            ],
        )
        .await
        .unwrap();

    assert_eq!(list[0].anime.id, 967);
    assert_eq!(list[0].list_status.num_episodes_watched, 12);
    assert_eq!(response.prev_offset, Some(0));
    assert_eq!(response.next_offset, None);
}
