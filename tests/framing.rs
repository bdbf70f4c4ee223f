#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Channel-level framing tests over in-memory duplex streams.
//! Covers stop-byte round-trips, the buffered write path, heuristic
//! termination with buffer growth, typed encodings, and teardown.

use netchannel::config::{FramingConfig, READ_CHUNK_SIZE};
use netchannel::error::Error;
use netchannel::transport::channel::DuplexChannel;
use proptest::prelude::*;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

fn pair(buffer: usize, framing: FramingConfig) -> (DuplexChannel, DuplexChannel) {
    let (client, server) = tokio::io::duplex(buffer);
    let (_, client_tx) = tokio::io::split(client);
    let (server_rx, _) = tokio::io::split(server);
    (
        DuplexChannel::from_writer(client_tx, framing),
        DuplexChannel::from_reader(server_rx, framing),
    )
}

#[tokio::test]
async fn stop_byte_round_trip() {
    let (mut writer, mut reader) = pair(8192, FramingConfig::default());

    writer.write_bytes(b"client send data!").await.unwrap();
    let got = reader.read_all().await.unwrap();
    assert_eq!(got, b"client send data!");
}

#[tokio::test]
async fn stop_byte_spanning_chunks_is_reassembled() {
    let (mut writer, mut reader) = pair(16384, FramingConfig::default());

    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 200) as u8 + 16).collect();
    assert!(!payload.contains(&0x04));
    writer.write_bytes(&payload).await.unwrap();

    let got = reader.read_all().await.unwrap();
    assert_eq!(got, payload);
}

#[tokio::test]
async fn trailing_stop_byte_is_not_doubled() {
    let (mut writer, mut reader) = pair(4096, FramingConfig::default());

    // Payload already ends with the terminator; the writer must not append
    // a second one, so the reader sees the payload minus its terminator.
    writer.write_bytes(b"abc\x04").await.unwrap();
    let got = reader.read_all().await.unwrap();
    assert_eq!(got, b"abc");
}

#[tokio::test]
async fn empty_message_reads_as_none() {
    let (mut writer, mut reader) = pair(4096, FramingConfig::default());

    writer.write_str("").await.unwrap();
    assert_eq!(reader.read_string().await.unwrap(), None);
}

#[tokio::test]
async fn buffered_writes_stay_local_until_flush() {
    let (client, server) = tokio::io::duplex(8192);
    let (_, client_tx) = tokio::io::split(client);
    let (server_rx, _) = tokio::io::split(server);
    let mut writer = DuplexChannel::from_writer(client_tx, FramingConfig::default());
    writer.set_auto_flush(false);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::default())
        .with_read_timeout(Duration::from_millis(100));

    writer.write_str("first").await.unwrap();
    writer.write_str("second").await.unwrap();

    // Nothing on the wire yet: the read times out.
    assert!(matches!(reader.read_all().await, Err(Error::Timeout)));

    writer.flush().await.unwrap();
    assert_eq!(reader.read_string().await.unwrap().as_deref(), Some("first"));
    assert_eq!(
        reader.read_string().await.unwrap().as_deref(),
        Some("second")
    );
}

#[tokio::test]
async fn coalesced_frames_split_into_messages() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (server_rx, _server_tx) = tokio::io::split(server);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::default());

    // Three framed messages arriving in a single underlying read.
    client.write_all(b"one\x04two\x04three\x04").await.unwrap();

    assert_eq!(reader.read_all().await.unwrap(), b"one");
    assert_eq!(reader.read_all().await.unwrap(), b"two");
    assert_eq!(reader.read_all().await.unwrap(), b"three");
}

#[tokio::test]
async fn partial_trailing_frame_completes_on_next_read() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (server_rx, _server_tx) = tokio::io::split(server);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::default());

    client.write_all(b"alpha\x04bet").await.unwrap();
    assert_eq!(reader.read_all().await.unwrap(), b"alpha");

    // The unterminated tail is retained and joined with the rest.
    client.write_all(b"a\x04").await.unwrap();
    assert_eq!(reader.read_all().await.unwrap(), b"beta");
}

#[tokio::test]
async fn heuristic_read_grows_across_chunk_boundary() {
    // N bytes arriving in two underlying reads, the first ending exactly at
    // buffer capacity with no stop byte: the buffer must grow and return all N.
    let total = READ_CHUNK_SIZE + 476;
    let payload: Vec<u8> = (0..total).map(|i| (i % 251) as u8).collect();

    let (mut client, server) = tokio::io::duplex(4 * READ_CHUNK_SIZE);
    let (server_rx, _server_tx) = tokio::io::split(server);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::unframed());

    client.write_all(&payload).await.unwrap();

    let got = reader.read_all().await.unwrap();
    assert_eq!(got.len(), total);
    assert_eq!(got, payload);
}

#[tokio::test]
async fn heuristic_read_ends_on_short_read() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (server_rx, _server_tx) = tokio::io::split(server);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::unframed());

    client.write_all(b"short message").await.unwrap();
    assert_eq!(reader.read_all().await.unwrap(), b"short message");
}

#[tokio::test]
async fn typed_values_round_trip() {
    let (mut writer, mut reader) = pair(8192, FramingConfig::default());

    writer.write_i32(-1_234_567).await.unwrap();
    assert_eq!(reader.read_i32().await.unwrap(), Some(-1_234_567));

    writer.write_i64(i64::MAX).await.unwrap();
    assert_eq!(reader.read_i64().await.unwrap(), Some(i64::MAX));

    writer.write_f64(std::f64::consts::PI).await.unwrap();
    assert_eq!(reader.read_f64().await.unwrap(), Some(std::f64::consts::PI));

    writer.write_bool(true).await.unwrap();
    assert_eq!(reader.read_bool().await.unwrap(), Some(true));

    writer.write_str("usine à gaz").await.unwrap();
    assert_eq!(
        reader.read_string().await.unwrap().as_deref(),
        Some("usine à gaz")
    );
}

#[tokio::test]
async fn eof_before_terminator_is_connection_closed() {
    let (client, server) = tokio::io::duplex(4096);
    let (server_rx, _server_tx) = tokio::io::split(server);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::default());

    drop(client);
    assert!(matches!(
        reader.read_all().await,
        Err(Error::ConnectionClosed)
    ));
}

#[tokio::test]
async fn read_times_out_without_data() {
    let (_client, server) = tokio::io::duplex(4096);
    let (server_rx, _server_tx) = tokio::io::split(server);
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::default())
        .with_read_timeout(Duration::from_millis(50));

    assert!(matches!(reader.read_all().await, Err(Error::Timeout)));
}

#[tokio::test]
async fn object_path_round_trips_serde_payloads() {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Company {
        company: String,
        employees: u32,
    }

    let (client, server) = tokio::io::duplex(8192);
    let (_, client_tx) = tokio::io::split(client);
    let (server_rx, _) = tokio::io::split(server);
    let mut writer = DuplexChannel::from_writer(client_tx, FramingConfig::default());
    let mut reader = DuplexChannel::from_reader(server_rx, FramingConfig::default());

    let sent = Company {
        company: String::from("Client Inc"),
        employees: 42,
    };
    writer.write_object(&sent).await.unwrap();
    let got: Company = reader.read_object().await.unwrap();
    assert_eq!(got, sent);
}

// Property: any payload free of the stop byte survives a framed round-trip.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_stop_byte_round_trip(
        payload in prop::collection::vec(any::<u8>().prop_filter("no stop byte", |b| *b != 0x04), 1..4096)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        rt.block_on(async {
            let (mut writer, mut reader) = pair(16384, FramingConfig::default());
            writer.write_bytes(&payload).await.unwrap();
            let got = reader.read_all().await.unwrap();
            prop_assert_eq!(got, payload);
            Ok(())
        })?;
    }
}
