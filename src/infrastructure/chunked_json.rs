// Chunked JSON streaming utilities
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// Create a chunked streaming response of length-prefixed JSON frames
pub async fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let byte_stream = stream.then(move |msg| encode_frame(msg, compress));

    let body = Body::from_stream(byte_stream);

    // Frames are compressed one by one, so the HTTP response itself carries no
    // Content-Encoding.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson-frames")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize one message to a frame: 4-byte big-endian length, then the
/// (optionally brotli-compressed) JSON payload
pub async fn encode_frame<T: Serialize>(msg: T, compress: bool) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(&msg).map_err(std::io::Error::other)?;

    let payload = if compress {
        let cursor = std::io::Cursor::new(json);
        let mut encoder = BrotliEncoder::new(cursor);
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await?;
        compressed
    } else {
        json
    };

    let mut frame = BytesMut::with_capacity(4 + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);

    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::BrotliDecoder;
    use serde_json::json;

    #[tokio::test]
    async fn test_plain_frame_layout() {
        let frame = encode_frame(json!({"type": "chart"}), false).await.unwrap();

        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);
        assert_eq!(&frame[4..], br#"{"type":"chart"}"#);
    }

    #[tokio::test]
    async fn test_compressed_frame_decodes() {
        let msg = json!({"type": "skeleton", "charts": vec!["c0"; 64]});
        let frame = encode_frame(msg.clone(), true).await.unwrap();

        let mut decoder = BrotliDecoder::new(&frame[4..]);
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).await.unwrap();

        assert_eq!(serde_json::from_slice::<serde_json::Value>(&decoded).unwrap(), msg);
    }
}
