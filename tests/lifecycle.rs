use bot_bridge::server::{serve, spawn_janitor};
use bot_bridge::{AppState, Args, Providers, build_router};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const TOKEN: &str = "lifecycle-secret";

fn state(extra: &[&str]) -> Arc<AppState> {
    let args = Args::parse_from(
        ["bot-bridge", "--token", TOKEN, "--log-requests", "false"]
            .into_iter()
            .chain(extra.iter().copied()),
    );
    Arc::new(AppState::new(&args, Providers::unavailable()))
}

#[tokio::test]
async fn shutdown_waits_at_most_the_grace_period() {
    let grace = Duration::from_millis(500);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(
        listener,
        build_router(state(&[])),
        async {
            let _ = stopped.await;
        },
        grace,
    ));

    // headers go through, the body never completes
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "POST /v1/placeholders/eval HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Authorization: Bearer {TOKEN}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: 100\r\n\r\n{{\"uuid\":"
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let signalled = Instant::now();
    stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("serve returned")
        .expect("server task");
    let elapsed = signalled.elapsed();

    assert!(result.is_ok());
    assert!(elapsed >= Duration::from_millis(450), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "returned after {elapsed:?}");

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn idle_server_stops_promptly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(
        listener,
        build_router(state(&[])),
        async {
            let _ = stopped.await;
        },
        Duration::from_secs(30),
    ));

    stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("serve returned")
        .expect("server task");
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn janitor_sweeps_on_each_interval() {
    // zero ttl: every stored entry is already expired
    let state = state(&["--vote-cache-ttl", "0"]);
    state
        .vote_cache
        .get_or_compute("550e8400-e29b-41d4-a716-446655440000".to_string(), || {
            Ok::<_, ()>(Vec::new())
        })
        .unwrap();
    assert_eq!(state.vote_cache.len(), 1);

    let janitor = spawn_janitor(state.clone(), Duration::from_secs(60));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(state.vote_cache.len(), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(state.vote_cache.is_empty());

    janitor.abort();
}
