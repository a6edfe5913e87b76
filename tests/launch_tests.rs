//! Tests for process launching, supervision, and the full invocation path.

use std::io::Write;
use std::time::{Duration, Instant};

use sockrun::{EndpointSpec, ErrorCategory, IoConfig, LaunchConfig, SpawnMode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn shell(command: &str) -> Option<SpawnMode> {
    Some(SpawnMode::shell(command).unwrap())
}

async fn connect_retry(port: u16) -> tokio::net::TcpStream {
    for _ in 0..100 {
        match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => return stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    panic!("could not connect to 127.0.0.1:{port}");
}

// =============================================================================
// Exit Status Propagation
// =============================================================================

#[tokio::test]
async fn test_exit_code_zero_on_success() {
    let config = LaunchConfig {
        command: shell("true"),
        io: IoConfig::Inherit,
        timeout: None,
    };
    assert_eq!(sockrun::run(config).await.unwrap(), 0);
}

#[tokio::test]
async fn test_child_exit_code_propagates() {
    let config = LaunchConfig {
        command: shell("exit 3"),
        io: IoConfig::Inherit,
        timeout: None,
    };
    assert_eq!(sockrun::run(config).await.unwrap(), 3);
}

#[tokio::test]
async fn test_signal_killed_child_is_process_error() {
    let config = LaunchConfig {
        command: shell("kill -9 $$"),
        io: IoConfig::Inherit,
        timeout: None,
    };
    let err = sockrun::run(config).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Process);
}

#[tokio::test]
async fn test_spawn_failure_is_process_error() {
    let config = LaunchConfig {
        command: Some(SpawnMode::direct("/no/such/binary-at-all").unwrap()),
        io: IoConfig::Inherit,
        timeout: None,
    };
    let err = sockrun::run(config).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Process);
}

#[tokio::test]
async fn test_direct_mode_runs_without_shell() {
    let config = LaunchConfig {
        command: Some(SpawnMode::direct("true").unwrap()),
        io: IoConfig::Inherit,
        timeout: None,
    };
    assert_eq!(sockrun::run(config).await.unwrap(), 0);
}

// =============================================================================
// Timeout Guard
// =============================================================================

#[tokio::test]
async fn test_timeout_terminates_hanging_command() {
    let config = LaunchConfig {
        command: shell("sleep 30"),
        io: IoConfig::Inherit,
        timeout: Some(Duration::from_secs(1)),
    };

    let start = Instant::now();
    let err = sockrun::run(config).await.unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[tokio::test]
async fn test_guard_has_no_effect_after_normal_exit() {
    let config = LaunchConfig {
        command: shell("true"),
        io: IoConfig::Inherit,
        timeout: Some(Duration::from_secs(30)),
    };
    let start = Instant::now();
    assert_eq!(sockrun::run(config).await.unwrap(), 0);
    assert!(start.elapsed() < Duration::from_secs(5));
}

// =============================================================================
// Redirection
// =============================================================================

#[tokio::test]
async fn test_input_endpoint_feeds_child_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let out_file = dir.path().join("received.txt");
    let port = free_port();

    let config = LaunchConfig {
        command: shell(&format!("cat > {}", out_file.display())),
        io: IoConfig::Input {
            input: EndpointSpec::parse_input(&format!("TCPS{port}")).unwrap(),
        },
        timeout: Some(Duration::from_secs(10)),
    };
    let invocation = tokio::spawn(sockrun::run(config));

    let mut peer = connect_retry(port).await;
    peer.write_all(b"fed over tcp").await.unwrap();
    drop(peer);

    assert_eq!(invocation.await.unwrap().unwrap(), 0);
    assert_eq!(std::fs::read(&out_file).unwrap(), b"fed over tcp");
}

#[tokio::test]
async fn test_output_endpoint_carries_child_stdout() {
    let port = free_port();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap();

    let config = LaunchConfig {
        command: shell("echo over the wire"),
        io: IoConfig::Output {
            output: EndpointSpec::parse_output(&format!("TCPC127.0.0.1,{port}")).unwrap(),
        },
        timeout: Some(Duration::from_secs(10)),
    };
    let invocation = tokio::spawn(sockrun::run(config));

    let (mut peer, _) = listener.accept().await.unwrap();
    let mut received = String::new();
    peer.read_to_string(&mut received).await.unwrap();

    assert_eq!(received, "over the wire\n");
    assert_eq!(invocation.await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_bidirectional_echo_round_trip() {
    let port = free_port();
    let config = LaunchConfig {
        command: shell("cat"),
        io: IoConfig::Bidirectional {
            endpoint: EndpointSpec::parse_bidirectional(&format!("TCPS{port}")).unwrap(),
        },
        timeout: Some(Duration::from_secs(10)),
    };
    let invocation = tokio::spawn(sockrun::run(config));

    let mut peer = connect_retry(port).await;
    peer.write_all(b"hello\n").await.unwrap();

    let mut echoed = [0u8; 6];
    peer.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"hello\n");

    // Closing the connection ends the child's stdin.
    drop(peer);
    assert_eq!(invocation.await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_partial_setup_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("in.sock");
    let out_path = dir.path().join("nobody-listens.sock");

    // Input (datagram, no accept needed) succeeds; output connect fails;
    // the whole invocation must fail without spawning anything.
    let config = LaunchConfig {
        command: shell("true"),
        io: IoConfig::Both {
            input: EndpointSpec::parse_input(&format!("UDSSD{}", in_path.display())).unwrap(),
            output: EndpointSpec::parse_output(&format!("UDSCS{}", out_path.display())).unwrap(),
        },
        timeout: None,
    };
    let err = sockrun::run(config).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
}

// =============================================================================
// Binary Surface
// =============================================================================

#[test]
fn test_passthrough_reproduces_stdin() {
    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_sockrun"))
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"abc")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, b"abc");
}

#[test]
fn test_binary_propagates_child_exit_code() {
    let status = std::process::Command::new(env!("CARGO_BIN_EXE_sockrun"))
        .args(["-e", "exit 5"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(5));
}

#[test]
fn test_binary_exits_one_on_timeout() {
    let start = Instant::now();
    let status = std::process::Command::new(env!("CARGO_BIN_EXE_sockrun"))
        .args(["-e", "sleep 30", "-t", "1"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_binary_exits_one_on_bad_flags() {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_sockrun"))
        .args(["-i", "TCPSnope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}
