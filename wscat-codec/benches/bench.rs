use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion};
use tokio_util::codec::{Decoder, Encoder};
use wscat_codec::{Request, RequestCodec, ResponseCodec, ResponseEvent};

fn content_length_response(len: usize) -> Vec<u8> {
    let mut data = format!("HTTP/1.1 200 OK\r\nServer: bench\r\nContent-Length: {}\r\n\r\n", len).into_bytes();
    data.resize(data.len() + len, b'x');
    data
}

fn chunked_response(len: usize, chunk_len: usize) -> Vec<u8> {
    let mut data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    let body = vec![b'x'; len];
    for chunk in body.chunks(chunk_len) {
        data.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        data.extend_from_slice(chunk);
        data.extend_from_slice(b"\r\n");
    }

    data.extend_from_slice(b"0\r\n\r\n");
    data
}

fn decode_all(data: &[u8]) -> usize {
    let mut codec = ResponseCodec::new();
    let mut src = BytesMut::from(data);
    let mut n = 0;
    while let Some(event) = codec.decode(&mut src).unwrap() {
        match event {
            ResponseEvent::Body(data) => n += data.len(),
            ResponseEvent::Header(_) => {}
            ResponseEvent::End => break,
        }
    }

    n
}

fn bench_decode(c: &mut Criterion, id: &str, data: Vec<u8>) {
    c.bench_function(id, move |b| b.iter(|| decode_all(&data)));
}

fn bench_encode(c: &mut Criterion, id: &str, body_len: usize) {
    let headers = ["Accept-Encoding: deflate".to_owned(), "wscat-protocol".to_owned()];
    let body = vec![0; body_len];
    let mut dst = BytesMut::with_capacity(body_len + 512);

    c.bench_function(id, move |b| {
        b.iter(|| {
            dst.clear();
            RequestCodec::new().encode(
                Request {
                    target: "/stream",
                    host: "localhost:8000",
                    headers: &headers,
                    body: &body,
                },
                &mut dst,
            )
        })
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    bench_encode(c, "encode tiny", 2);
    bench_encode(c, "encode default buffer", 1024);

    bench_decode(c, "decode content-length small", content_length_response(127));
    bench_decode(c, "decode content-length medium", content_length_response(64 * 1024));
    bench_decode(c, "decode chunked medium", chunked_response(64 * 1024, 1024));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
