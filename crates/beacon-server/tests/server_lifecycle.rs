//! End-to-end server behavior over real TCP connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use beacon_core::TokenPolicy;
use beacon_server::config::Config;
use beacon_server::context::ServerContext;
use beacon_server::server::Server;

const STEP_TIMEOUT: Duration = Duration::from_secs(3);

struct TestServer {
    ctx: Arc<ServerContext>,
    addr: SocketAddr,
    task: JoinHandle<anyhow::Result<()>>,
    _id_dir: tempfile::TempDir,
}

async fn start_server(max_clients: usize) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        max_clients,
        token_policy: TokenPolicy::Sequential,
        id_file: dir.path().join("last_id"),
    };

    let server = Server::bind(config).await.unwrap();
    let ctx = server.context();
    let addr = server.local_addr();
    let task = tokio::spawn(server.run());

    TestServer {
        ctx,
        addr,
        task,
        _id_dir: dir,
    }
}

async fn shutdown(server: TestServer) {
    server.ctx.request_shutdown();
    timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop in time")
        .expect("server task panicked")
        .expect("server returned an error");
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> TestClient {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        TestClient {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Next line from the server, `None` on EOF.
    async fn next_line(&mut self) -> Option<String> {
        timeout(STEP_TIMEOUT, self.lines.next_line())
            .await
            .expect("no line from server in time")
            .expect("read error")
    }

    /// Skip token lines until a member-count line arrives.
    ///
    /// Token values carry the seconds-of-day bucket in their high
    /// bits, so outside the first second after local midnight they
    /// are far larger than any member count.
    async fn next_count_line(&mut self, capacity: usize) -> u32 {
        loop {
            let line = self
                .next_line()
                .await
                .expect("server closed the connection");
            if let Ok(value) = line.parse::<u32>() {
                if value as usize <= capacity {
                    return value;
                }
            }
        }
    }

    /// True if no member-count line shows up within `window`.
    async fn no_count_line_within(&mut self, window: Duration, capacity: usize) -> bool {
        timeout(window, async {
            loop {
                match self.lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.parse::<u32>().map_or(false, |v| v as usize <= capacity) {
                            return;
                        }
                    }
                    // EOF or error: no more lines are coming.
                    _ => std::future::pending::<()>().await,
                }
            }
        })
        .await
        .is_err()
    }

    async fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }
}

#[tokio::test]
async fn idle_client_receives_fresh_tokens_each_second() {
    let server = start_server(6).await;
    let mut client = TestClient::connect(server.addr).await;

    let first: u32 = client.next_line().await.unwrap().parse().unwrap();
    let started = Instant::now();
    let second: u32 = client.next_line().await.unwrap().parse().unwrap();
    let gap = started.elapsed();

    assert_ne!(first, second);
    // One poll interval apart, with generous scheduling slack.
    assert!(
        gap >= Duration::from_millis(500) && gap <= Duration::from_millis(2500),
        "token gap {:?} outside the expected cadence window",
        gap
    );

    shutdown(server).await;
}

#[tokio::test]
async fn newline_broadcasts_member_count_to_everyone() {
    let server = start_server(6).await;
    let mut c1 = TestClient::connect(server.addr).await;
    let mut c2 = TestClient::connect(server.addr).await;
    let mut c3 = TestClient::connect(server.addr).await;

    // Wait until every session is live (each has pushed a token).
    for c in [&mut c1, &mut c2, &mut c3] {
        c.next_line().await.unwrap();
    }

    c3.send(b"x\n").await;

    for c in [&mut c1, &mut c2, &mut c3] {
        assert_eq!(c.next_count_line(6).await, 3);
    }

    // One newline, one broadcast.
    for c in [&mut c1, &mut c2, &mut c3] {
        assert!(
            c.no_count_line_within(Duration::from_millis(1500), 6)
                .await
        );
    }

    shutdown(server).await;
}

#[tokio::test]
async fn two_newlines_in_one_write_broadcast_twice() {
    let server = start_server(6).await;
    let mut client = TestClient::connect(server.addr).await;
    client.next_line().await.unwrap();

    client.send(b"first\nsecond\n").await;

    assert_eq!(client.next_count_line(6).await, 1);
    assert_eq!(client.next_count_line(6).await, 1);
    assert!(
        client
            .no_count_line_within(Duration::from_millis(1500), 6)
            .await
    );

    shutdown(server).await;
}

#[tokio::test]
async fn connections_beyond_capacity_get_rejected() {
    let server = start_server(2).await;
    let mut c1 = TestClient::connect(server.addr).await;
    let mut c2 = TestClient::connect(server.addr).await;
    for c in [&mut c1, &mut c2] {
        c.next_line().await.unwrap();
    }

    let mut rejected = TestClient::connect(server.addr).await;
    assert_eq!(rejected.next_line().await.as_deref(), Some("server full"));
    assert_eq!(rejected.next_line().await, None);

    // The rejected connection never made it into the registry.
    c1.send(b"\n").await;
    assert_eq!(c1.next_count_line(2).await, 2);
    assert_eq!(c2.next_count_line(2).await, 2);

    shutdown(server).await;
}

#[tokio::test]
async fn freed_slot_admits_a_new_client() {
    let server = start_server(2).await;
    let mut c1 = TestClient::connect(server.addr).await;
    let mut c2 = TestClient::connect(server.addr).await;
    for c in [&mut c1, &mut c2] {
        c.next_line().await.unwrap();
    }

    drop(c1);
    // The dropped client's session notices on its next poll.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let mut c3 = TestClient::connect(server.addr).await;
    let line = c3.next_line().await.expect("connection closed");
    assert_ne!(line, "server full");

    shutdown(server).await;
}

#[tokio::test]
async fn shutdown_says_thank_you_then_closes_everything() {
    let server = start_server(6).await;
    let mut c1 = TestClient::connect(server.addr).await;
    let mut c2 = TestClient::connect(server.addr).await;
    for c in [&mut c1, &mut c2] {
        c.next_line().await.unwrap();
    }

    server.ctx.request_shutdown();

    // A token already in flight may precede the farewell; the
    // farewell line is the last thing on the wire.
    for c in [&mut c1, &mut c2] {
        loop {
            match c.next_line().await {
                Some(line) if line == "Thank you" => break,
                Some(_token) => continue,
                None => panic!("connection closed before the farewell line"),
            }
        }
        assert_eq!(c.next_line().await, None);
    }

    timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop in time")
        .expect("server task panicked")
        .expect("server returned an error");

    // The listener is gone; new connections must fail.
    assert!(TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn clients_connected_at_different_phases_all_get_the_farewell() {
    let server = start_server(6).await;

    let mut c1 = TestClient::connect(server.addr).await;
    c1.next_line().await.unwrap();

    // The second connect re-anchors the accept loop's poll window, so
    // the loop wakes well after the shutdown request below, and the
    // two session polls expire at distinct offsets from it.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let mut c2 = TestClient::connect(server.addr).await;
    c2.next_line().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    server.ctx.request_shutdown();

    // Both clients were connected when shutdown was requested; the
    // farewell must reach each of them no matter where its session
    // poll stood at that moment.
    for c in [&mut c1, &mut c2] {
        loop {
            match c.next_line().await {
                Some(line) if line == "Thank you" => break,
                Some(_token) => continue,
                None => panic!("client closed before receiving the farewell line"),
            }
        }
        assert_eq!(c.next_line().await, None);
    }

    timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop in time")
        .expect("server task panicked")
        .expect("server returned an error");
}
