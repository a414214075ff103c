//! Integration tests for the ps-core DDP codec.
//!
//! These tests go through the public API the way the discovery engine and
//! wake dispatcher use it: parse a console reply into a [`Console`], and
//! build the exact bytes that go on the wire.

use std::net::SocketAddr;

use ps_core::{
    build_search_request, build_wake_request, parse_search_response, Console, ConsoleStatus,
    Credential,
};

#[test]
fn test_living_room_reply_becomes_awake_console() {
    // Arrange
    let datagram = b"host-id:abc\nhost-name:Living Room\nstatus:AWAKE\n";
    let source: SocketAddr = "192.168.1.50:9302".parse().unwrap();

    // Act
    let response = parse_search_response(datagram).expect("reply must parse");
    let status = response.status.expect("reply carries a status");
    let console = Console::from_response(response, source, status);

    // Assert
    assert_eq!(console.host_id, "abc");
    assert_eq!(console.host_name, "Living Room");
    assert_eq!(console.status, ConsoleStatus::Awake);
    assert_eq!(console.ip_address.to_string(), "192.168.1.50");
    assert_eq!(console.port, 9302);
}

#[test]
fn test_wake_request_from_stored_credential() {
    let credential = Credential::remote_play("deadbeef==", "AQAAAAAAAAA=");
    let secret = credential.wake_secret("abc").expect("remote play credential");

    let text = String::from_utf8(build_wake_request(secret)).unwrap();

    assert!(text.starts_with("WAKEUP * HTTP/1.1\n"));
    assert!(text.lines().any(|l| l == "user-credential:deadbeef=="));
}

#[test]
fn test_search_request_is_a_single_short_datagram() {
    let bytes = build_search_request();
    assert!(bytes.len() < 128, "search request must fit in one small datagram");
    assert!(bytes.ends_with(b"\n"));
}
