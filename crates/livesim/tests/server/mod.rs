use std::{sync::Arc, time::Duration};

use livesim::{decode_playlist, serve, AppState, Launch, LiveSimResult, PlaylistStore};
use reqwest::{header, Client, StatusCode};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{media_fixture, uris, AssertWrapper};

const LIVE: &str = include_str!("../fixtures/live.m3u8");
const VOD: &str = include_str!("../fixtures/vod.m3u8");
const MASTER: &str = include_str!("../fixtures/master.m3u8");

struct TestServer {
    url: String,
    state: Arc<AppState>,
    shutdown: CancellationToken,
    task: JoinHandle<LiveSimResult<()>>,
}

impl TestServer {
    async fn start(data: &str, interval: Duration) -> anyhow::Result<Self> {
        let state = AppState::new(PlaylistStore::new(media_fixture(data)), interval);
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(serve(
            listener,
            state.clone(),
            shutdown.clone().cancelled_owned(),
        ));

        Ok(Self {
            url,
            state,
            shutdown,
            task,
        })
    }

    async fn stop(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.task).await???;
        Ok(())
    }
}

fn client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .assert_success()
}

async fn fetch(client: &Client, url: &str) -> anyhow::Result<String> {
    Ok(client.get(url).send().await?.error_for_status()?.text().await?)
}

#[tokio::test]
async fn serves_playlist_with_headers() -> anyhow::Result<()> {
    let server = TestServer::start(LIVE, Duration::from_secs(3)).await?;
    let client = client();

    let response = client.get(&server.url).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let playlist = media_fixture(&response.text().await?);
    assert_eq!(uris(&playlist), vec!["a.ts", "b.ts", "c.ts"]);
    assert!(!playlist.end_list);
    assert!(server.state.is_sliding());

    drop(client);
    server.stop().await
}

#[tokio::test]
async fn any_path_and_method_is_served() -> anyhow::Result<()> {
    let server = TestServer::start(VOD, Duration::from_secs(3)).await?;
    let client = client();

    let response = client
        .post(format!("{}/somewhere/else.m3u8", server.url))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let playlist = media_fixture(&response.text().await?);
    assert_eq!(uris(&playlist), vec!["a.ts", "b.ts", "c.ts"]);

    drop(client);
    server.stop().await
}

#[tokio::test]
async fn closed_playlist_is_served_as_is() -> anyhow::Result<()> {
    let server = TestServer::start(VOD, Duration::from_millis(50)).await?;
    let client = client();

    let first = fetch(&client, &server.url).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    let second = fetch(&client, &server.url).await?;

    assert_eq!(first, second);
    assert!(media_fixture(&first).end_list);
    assert!(!server.state.is_sliding());
    assert_eq!(server.state.slider_ticks(), None);

    drop(client);
    server.stop().await
}

#[tokio::test]
async fn live_playlist_slides_after_first_request() -> anyhow::Result<()> {
    let server = TestServer::start(LIVE, Duration::from_millis(100)).await?;
    let client = client();

    // nothing moves before somebody asks for the playlist
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!server.state.is_sliding());
    let first = media_fixture(&fetch(&client, &server.url).await?);
    assert_eq!(first.media_sequence, 0);

    tokio::time::sleep(Duration::from_millis(550)).await;
    let later = media_fixture(&fetch(&client, &server.url).await?);
    assert!(later.media_sequence >= 1);
    assert_eq!(later.segments.len(), 3);

    drop(client);
    server.stop().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_start_one_slider() -> anyhow::Result<()> {
    let server = TestServer::start(LIVE, Duration::from_millis(200)).await?;
    let client = client();

    let mut requests = Vec::new();
    for _ in 0..16 {
        let client = client.clone();
        let url = server.url.clone();
        requests.push(tokio::spawn(async move { fetch(&client, &url).await }));
    }
    for request in requests {
        request.await??;
    }

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let playlist = media_fixture(&fetch(&client, &server.url).await?);
    // a single slider moves at most 5 times in 1.1s
    assert!(playlist.media_sequence >= 1);
    assert!(playlist.media_sequence <= 6);
    assert!(server.state.slider_ticks().assert_success() <= 6);

    drop(client);
    server.stop().await
}

#[tokio::test(start_paused = true)]
async fn racing_starts_tick_at_single_rate() -> anyhow::Result<()> {
    let state = AppState::new(
        PlaylistStore::new(media_fixture(LIVE)),
        Duration::from_secs(3),
    );

    let mut starters = Vec::new();
    for _ in 0..16 {
        let state = state.clone();
        starters.push(tokio::spawn(async move { state.ensure_slider() }));
    }
    let mut started = 0;
    for starter in starters {
        if starter.await? {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    tokio::time::sleep(Duration::from_millis(9_500)).await;
    assert_eq!(state.slider_ticks(), Some(3));
    assert_eq!(uris(&state.store().snapshot()), vec!["a.ts", "b.ts", "c.ts"]);
    assert_eq!(state.store().snapshot().media_sequence, 3);

    state.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_starts_spawn_one_slider() -> anyhow::Result<()> {
    let state = AppState::new(
        PlaylistStore::new(media_fixture(LIVE)),
        Duration::from_secs(3),
    );

    let mut starters = Vec::new();
    for _ in 0..32 {
        let state = state.clone();
        starters.push(tokio::spawn(async move { state.ensure_slider() }));
    }
    let mut started = 0;
    for starter in starters {
        if starter.await? {
            started += 1;
        }
    }
    assert_eq!(started, 1);
    assert!(state.is_sliding());

    state.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_sliding_for_good() -> anyhow::Result<()> {
    let state = AppState::new(
        PlaylistStore::new(media_fixture(LIVE)),
        Duration::from_secs(3),
    );
    assert!(state.ensure_slider());

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    state.shutdown().await;
    assert!(!state.is_sliding());
    assert!(!state.ensure_slider());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(state.store().snapshot().media_sequence, 1);

    Ok(())
}

#[tokio::test]
async fn server_shutdown_stops_slider() -> anyhow::Result<()> {
    let server = TestServer::start(LIVE, Duration::from_millis(50)).await?;
    let client = client();
    fetch(&client, &server.url).await?;
    drop(client);

    let state = server.state.clone();
    assert!(state.is_sliding());
    server.stop().await?;

    assert!(!state.is_sliding());
    let sequence = state.store().snapshot().media_sequence;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(state.store().snapshot().media_sequence, sequence);

    Ok(())
}

#[test]
fn master_playlist_is_only_described() -> anyhow::Result<()> {
    let source = decode_playlist(MASTER.as_bytes())?;

    match Launch::from_source(source, Duration::from_secs(3)) {
        Launch::Describe(description) => {
            assert!(description.starts_with("Master playlist: 3 variants"));
            assert!(description.contains("hi/media.m3u8"));
        }
        Launch::Serve(_) => panic!("a master playlist must not be served"),
    }

    Ok(())
}

#[tokio::test]
async fn media_playlist_is_served_idle() -> anyhow::Result<()> {
    let source = decode_playlist(LIVE.as_bytes())?;

    let state = match Launch::from_source(source, Duration::from_secs(3)) {
        Launch::Serve(state) => state,
        Launch::Describe(_) => panic!("a media playlist must be served"),
    };
    // the slider waits for the first request
    assert!(!state.is_sliding());
    assert_eq!(uris(&state.store().snapshot()), vec!["a.ts", "b.ts", "c.ts"]);

    Ok(())
}
