use bot_bridge::client::{BridgeClient, ClientError};
use bot_bridge::providers::{MemoryLinks, MemoryPlaceholders, MemoryVotes, VoteSiteFixture};
use bot_bridge::server::serve;
use bot_bridge::{AppState, Args, Providers, build_router};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const TOKEN: &str = "client-secret";
const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";
const DISCORD_ID: &str = "123456789012345678";

struct Running {
    base_url: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

async fn start() -> Running {
    let links = MemoryLinks::new();
    links.link(DISCORD_ID, UUID, "Steve");

    let placeholders = MemoryPlaceholders::new();
    placeholders.set(UUID, "%player_name%", "Steve");

    let votes = MemoryVotes::new(vec![VoteSiteFixture {
        name: "TopG".to_string(),
        url: "https://topg.org/vote".to_string(),
        cooldown_hours: 24,
    }]);

    let providers = Providers::unavailable()
        .with_links(links)
        .with_votes(votes)
        .with_placeholders(placeholders);

    let args = Args::parse_from(["bot-bridge", "--token", TOKEN, "--log-requests", "false"]);
    let app = build_router(Arc::new(AppState::new(&args, providers)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(serve(
        listener,
        app,
        async {
            let _ = stopped.await;
        },
        Duration::from_secs(1),
    ));

    Running {
        base_url: format!("http://{addr}"),
        stop,
        handle,
    }
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        let result = self.handle.await.expect("server task");
        assert!(result.is_ok());
    }
}

#[tokio::test]
async fn client_talks_to_live_bridge() {
    let server = start().await;
    let client = BridgeClient::new(&server.base_url, TOKEN).unwrap();

    let health = client.health().await.unwrap();
    assert!(health.ok);
    assert!(health.integrations.discordsrv);
    assert!(health.integrations.votingplugin);
    assert!(health.integrations.placeholderapi);

    let link = client.resolve_link(DISCORD_ID).await.unwrap();
    assert!(link.result.linked);
    assert_eq!(link.result.name.as_deref(), Some("Steve"));
    assert!(link.error.is_none());

    let votes = client.vote_next(UUID).await.unwrap();
    assert_eq!(votes.uuid, UUID);
    assert_eq!(votes.sites.len(), 1);
    assert!(votes.sites[0].ready_now);

    let tokens = vec!["%player_name%".to_string(), "%math_1+1%".to_string()];
    let values = client.eval_placeholders(UUID, &tokens).await.unwrap();
    let ordered: Vec<(&str, &str)> = values
        .values
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str().unwrap_or_default()))
        .collect();
    assert_eq!(
        ordered,
        vec![("%player_name%", "Steve"), ("%math_1+1%", "INVALID_FORMAT")]
    );

    server.shutdown().await;
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let server = start().await;

    let intruder = BridgeClient::new(&server.base_url, "wrong").unwrap();
    let err = intruder.vote_next(UUID).await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    let client = BridgeClient::new(&server.base_url, TOKEN).unwrap();
    match client.resolve_link("42").await.unwrap_err() {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid discord_id format");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // grab a free port, then close it again
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BridgeClient::new(&format!("http://{addr}/"), TOKEN)
        .unwrap()
        .with_retry_delay(Duration::from_millis(10));
    assert_eq!(client.base_url(), format!("http://{addr}"));

    let err = client.health().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { ref path, .. } if path == "/health"));
    assert_eq!(err.status(), None);
}
