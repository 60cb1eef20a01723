// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::response::Response;

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Ok;
    let encoded = encode(&response).unwrap();

    let json_str = std::str::from_utf8(&encoded).unwrap();
    assert!(json_str.starts_with('{'), "should be a JSON object: {json_str}");
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.unwrap();
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.unwrap();
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_big_endian_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.unwrap();

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_on_empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn read_message_rejects_a_length_over_the_limit() {
    let mut buffer = (MAX_MESSAGE_BYTES + 1).to_be_bytes().to_vec();
    buffer.extend_from_slice(b"irrelevant");
    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge(_, _)));
}

#[tokio::test]
async fn request_response_roundtrip_over_a_duplex_stream() {
    let query = Query::Ping;
    let mut buffer = Vec::new();
    write_message(&mut buffer, &encode(&query).unwrap()).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let decoded = read_request(&mut cursor).await.unwrap();
    assert_eq!(decoded, Query::Ping);

    let mut out = Vec::new();
    write_response(&mut out, &Response::Pong).await.unwrap();
    let mut out_cursor = std::io::Cursor::new(out);
    let payload = read_message(&mut out_cursor).await.unwrap();
    assert_eq!(decode::<Response>(&payload).unwrap(), Response::Pong);
}
