mod common;

use avatar_client::config::ClientConfig;
use avatar_client::services::api_client::ApiClient;
use avatar_client::services::avatar_cache::{AvatarCache, QueryStatus};
use avatar_client::services::notice_board::NoticeLevel;
use avatar_client::views::gallery::{Gallery, GalleryView, Selection};
use avatar_client::views::upload::{FileInput, UploadForm};
use common::{avatar_json, notices};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png() -> FileInput {
    FileInput::new("me.png", "image/png", b"fake-png-bytes".to_vec())
}

fn config() -> ClientConfig {
    ClientConfig::from_lookup(|_| None).unwrap()
}

#[tokio::test]
async fn uploaded_avatar_shows_up_after_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/avatars/upload"))
        .and(body_string_contains("Alex"))
        .and(body_string_contains("fake-png-bytes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(avatar_json("a1", "Alex")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([avatar_json("a1", "Alex")])))
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let cache = AvatarCache::new();
    let gallery = Gallery::new(cache.clone(), board.clone(), config());
    let selection = Selection::default();

    assert_eq!(gallery.load(&api, &selection).await, GalleryView::Empty);

    let mut form = UploadForm::new(board.clone());
    form.set_name("Alex");
    assert!(form.choose_file(png()).await);
    let uploaded = form.submit(&api, &cache).await;
    assert!(uploaded.is_some());

    // form is reset and the list was invalidated
    assert_eq!(form.name(), "");
    assert!(form.preview().is_none());
    assert!(cache.is_stale().await);
    assert_eq!(board.texts(NoticeLevel::Success).await, vec!["Avatar uploaded successfully!"]);

    match gallery.load(&api, &selection).await {
        GalleryView::Items(items) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].avatar.name, "Alex");
            assert_eq!(items[0].avatar.status, "ready");
            assert!(!items[0].selected);
            assert_eq!(
                items[0].display_url.as_deref(),
                Some("http://localhost:9000/avatars/a1/thumbnail.jpg")
            );
        }
        other => panic!("expected items, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_without_name_or_image_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/avatars/upload"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let cache = AvatarCache::new();

    // image but no name
    let mut form = UploadForm::new(board.clone());
    form.choose_file(png()).await;
    assert!(form.submit(&api, &cache).await.is_none());

    // name but no image
    let mut form = UploadForm::new(board.clone());
    form.set_name("Alex");
    assert!(form.submit(&api, &cache).await.is_none());
    assert_eq!(form.name(), "Alex");

    assert_eq!(
        board.texts(NoticeLevel::Error).await,
        vec![
            "Please provide a name and select an image",
            "Please provide a name and select an image"
        ]
    );
}

#[tokio::test]
async fn non_image_files_are_rejected() {
    let board = notices();
    let mut form = UploadForm::new(board.clone());
    form.choose_file(png()).await;
    let before = form.preview().map(str::to_string);

    let pdf = FileInput::new("cv.pdf", "application/pdf", b"%PDF".to_vec());
    form.drag_enter();
    assert!(!form.drop_file(pdf).await);

    assert!(!form.drag_active());
    assert_eq!(form.preview().map(str::to_string), before);
    assert_eq!(board.texts(NoticeLevel::Error).await, vec!["Please upload an image file"]);
}

#[tokio::test]
async fn failed_upload_keeps_the_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/avatars/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let cache = AvatarCache::new();
    let mut form = UploadForm::new(board.clone());
    form.set_name("Alex");
    form.choose_file(png()).await;

    assert!(form.submit(&api, &cache).await.is_none());
    assert_eq!(form.name(), "Alex");
    assert!(form.preview().is_some_and(|p| p.starts_with("data:image/png;base64,")));
    assert_eq!(board.texts(NoticeLevel::Error).await, vec!["Failed to upload avatar"]);
}

#[tokio::test]
async fn deleting_the_selected_avatar_clears_selection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/avatars/a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let cache = AvatarCache::new();
    let mut gallery = Gallery::new(cache.clone(), board.clone(), config());
    let mut selection = Selection::default();
    gallery.select(&mut selection, "a1");

    gallery.request_delete("a1");
    assert!(gallery.confirm_delete(true, &api, &mut selection).await);

    assert_eq!(selection.get(), None);
    assert!(gallery.pending_delete().is_none());
    assert!(cache.is_stale().await);
    assert_eq!(board.texts(NoticeLevel::Success).await, vec!["Avatar deleted successfully"]);
}

#[tokio::test]
async fn deleting_another_avatar_keeps_selection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/avatars/a2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let mut gallery = Gallery::new(AvatarCache::new(), notices(), config());
    let mut selection = Selection::default();
    gallery.select(&mut selection, "a1");

    gallery.request_delete("a2");
    assert!(gallery.confirm_delete(true, &api, &mut selection).await);
    assert_eq!(selection.get(), Some("a1"));
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let mut gallery = Gallery::new(AvatarCache::new(), notices(), config());
    let mut selection = Selection::default();
    gallery.select(&mut selection, "a1");

    gallery.request_delete("a1");
    assert!(!gallery.confirm_delete(false, &api, &mut selection).await);
    assert_eq!(selection.get(), Some("a1"));
    assert!(gallery.pending_delete().is_none());
}

#[tokio::test]
async fn failed_delete_leaves_state_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([avatar_json("a1", "Alex")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/avatars/a1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let cache = AvatarCache::new();
    let mut gallery = Gallery::new(cache.clone(), board.clone(), config());
    let mut selection = Selection::default();
    gallery.select(&mut selection, "a1");
    gallery.load(&api, &selection).await;

    gallery.request_delete("a1");
    assert!(!gallery.confirm_delete(true, &api, &mut selection).await);

    assert_eq!(selection.get(), Some("a1"));
    assert!(!cache.is_stale().await);
    assert_eq!(board.texts(NoticeLevel::Error).await, vec!["Failed to delete avatar"]);

    // still served from cache: the GET mock expects exactly one call
    match gallery.load(&api, &selection).await {
        GalleryView::Items(items) => assert!(items[0].selected),
        other => panic!("expected items, got {other:?}"),
    }
}

#[tokio::test]
async fn cache_reports_loading_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let cache = AvatarCache::new();
    assert_eq!(cache.status().await, QueryStatus::Loading);
    assert_eq!(cache.key(), "avatars");

    assert!(cache.fetch(&api).await.is_err());
    assert!(matches!(cache.status().await, QueryStatus::Failed(_)));

}

#[tokio::test]
async fn unreachable_list_shows_empty_state_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let gallery = Gallery::new(AvatarCache::new(), board.clone(), config());
    for _ in 0..3 {
        assert_eq!(gallery.load(&api, &Selection::default()).await, GalleryView::Empty);
    }
    assert_eq!(board.texts(NoticeLevel::Error).await.len(), 3);
    assert!(board.texts(NoticeLevel::Error).await.iter().all(|t| t == "Failed to load avatars"));
}

#[tokio::test]
async fn failed_refetch_keeps_cached_avatars() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([avatar_json("a1", "Alex")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let board = notices();
    let cache = AvatarCache::new();
    let gallery = Gallery::new(cache.clone(), board.clone(), config());
    assert!(matches!(gallery.load(&api, &Selection::default()).await, GalleryView::Items(_)));

    cache.invalidate().await;
    let GalleryView::Items(items) = gallery.load(&api, &Selection::default()).await else {
        panic!("cached avatars should still render");
    };
    assert_eq!(items[0].avatar.name, "Alex");
    assert_eq!(board.texts(NoticeLevel::Error).await, vec!["Failed to load avatars"]);
}

#[tokio::test]
async fn disallowed_image_hosts_are_not_rendered() {
    let server = MockServer::start().await;
    let mut foreign = avatar_json("a9", "Zed");
    foreign["thumbnail_url"] = json!(null);
    foreign["image_url"] = json!("https://tracker.example.net/a9.jpg");
    Mock::given(method("GET"))
        .and(path("/api/v1/avatars/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([foreign])))
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(server.uri());
    let gallery = Gallery::new(AvatarCache::new(), notices(), config());
    match gallery.load(&api, &Selection::default()).await {
        GalleryView::Items(items) => assert_eq!(items[0].display_url, None),
        other => panic!("expected items, got {other:?}"),
    }
}
