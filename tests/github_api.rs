// GithubApi against an in-process fake of the contents API.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;

use repogallery::config::{Category, GalleryConfig};
use repogallery::gallery::{GalleryRenderer, MediaKind};
use repogallery::settings::EffectiveSettings;
use repogallery::store::{ContentClient, GithubApi, MemoryContentApi, StoreError};
use repogallery::upload::{FixedClock, LargeFileNotice, LocalFile, UploadRequest, Uploader};

use support::start_fake_github;

fn target(token: Option<&str>) -> EffectiveSettings {
    EffectiveSettings { owner: "artist".into(), repo: "portfolio".into(), branch: "main".into(), token: token.map(str::to_string) }
}

fn client(base: &str, token: Option<&str>) -> Arc<ContentClient<GithubApi>> {
    let api = GithubApi::new(base).expect("api base");
    Arc::new(ContentClient::new(api, target(token), Duration::from_secs(5)))
}

#[tokio::test]
async fn upload_sends_authenticated_create_requests() {
    let fake = start_fake_github(MemoryContentApi::new().requiring_token()).await;
    let client = client(&fake.base_url, Some("tok"));
    let now = chrono::Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    let uploader = Uploader::new(client, &GalleryConfig::default()).with_clock(Arc::new(FixedClock(now)));

    let request = UploadRequest {
        category: Category::All,
        file: Some(LocalFile::new("walk cycle.png", vec![7u8; 500])),
        description: "first pass".into(),
    };
    let outcome = uploader.upload(request, |_: &LargeFileNotice| false).await.unwrap();
    assert!(outcome.is_complete());

    assert_eq!(
        fake.store.paths(),
        vec![
            "uploads/all/1700000000000_walk_cycle.png".to_string(),
            "uploads/all/meta_1700000000000_walk_cycle.png.json".to_string(),
        ]
    );
    assert_eq!(fake.store.file("uploads/all/1700000000000_walk_cycle.png").unwrap(), vec![7u8; 500]);

    let seen = fake.seen.lock().clone();
    let puts: Vec<_> = seen.iter().filter(|r| r.method == "PUT").collect();
    assert_eq!(puts.len(), 2);
    for r in &seen {
        assert_eq!(r.authorization.as_deref(), Some("Bearer tok"));
        assert_eq!(r.accept.as_deref(), Some("application/vnd.github+json"));
        assert!(r.user_agent.as_deref().unwrap_or_default().starts_with("repogallery/"));
        assert_eq!(r.branch.as_deref(), Some("main"));
    }
    assert!(puts.iter().all(|r| r.sha.is_none()));
}

#[tokio::test]
async fn overwrite_carries_the_revision_read_back() {
    let fake = start_fake_github(MemoryContentApi::new()).await;
    let client = client(&fake.base_url, Some("tok"));

    let first = client.write_text("about/ABOUT.md", "one", "Update About").await.unwrap();
    client.write_text("about/ABOUT.md", "two", "Update About").await.unwrap();

    let last_put = fake.seen.lock().iter().rev().find(|r| r.method == "PUT").cloned().unwrap();
    assert_eq!(last_put.sha, Some(first.revision_id));
    assert_eq!(client.read_text("about/ABOUT.md").await.unwrap(), "two");
}

#[tokio::test]
async fn long_multibyte_text_survives_wrapped_base64() {
    let fake = start_fake_github(MemoryContentApi::new()).await;
    let client = client(&fake.base_url, Some("tok"));
    let text = "Ünïcödé animation notes 🎞️ ".repeat(20);

    client.write_text("about/ABOUT.md", &text, "Update About").await.unwrap();
    assert_eq!(client.read_text("about/ABOUT.md").await.unwrap(), text);
}

#[tokio::test]
async fn anonymous_gallery_over_http() {
    let fake = start_fake_github(MemoryContentApi::new()).await;
    fake.store.insert("uploads/toonboom/20_b.mp4", b"v".to_vec());
    fake.store.insert("uploads/toonboom/10_a.png", b"i".to_vec());
    fake.store.insert(
        "uploads/toonboom/meta_10_a.png.json",
        br#"{"filename":"10_a.png","description":"sketch","uploaded_at":"2024-01-01T00:00:00.000Z"}"#.to_vec(),
    );

    let config = GalleryConfig { raw_host: "https://raw.test".into(), ..Default::default() };
    let gallery = GalleryRenderer::new(client(&fake.base_url, None), &config).render(Category::Toonboom).await;

    let names: Vec<_> = gallery.items.iter().map(|i| (i.name.as_str(), i.kind)).collect();
    assert_eq!(names, vec![("20_b.mp4", MediaKind::Video), ("10_a.png", MediaKind::Image)]);
    assert_eq!(gallery.items[1].description.as_deref(), Some("sketch"));
    assert_eq!(gallery.items[0].url, "https://raw.test/artist/portfolio/main/uploads/toonboom/20_b.mp4");
    assert!(fake.seen.lock().iter().all(|r| r.authorization.is_none()));
}

#[tokio::test]
async fn missing_paths_and_rejections() {
    let fake = start_fake_github(MemoryContentApi::new()).await;
    let client = client(&fake.base_url, Some("tok"));

    assert!(client.read_directory("uploads/all").await.is_empty());
    assert!(client.read_file("about/ABOUT.md").await.unwrap_err().is_not_found());

    fake.store.fail_next_writes(403, 1);
    let err = client.write_text("about/ABOUT.md", "x", "Update About").await.unwrap_err();
    assert_eq!(err, StoreError::RemoteRejected { status: 403, message: "injected failure".into() });
}
