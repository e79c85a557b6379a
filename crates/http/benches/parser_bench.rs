use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rivet_http::codec::{parse, RequestDecoder};
use tokio_util::codec::Decoder;

fn bench_parse_simple(c: &mut Criterion) {
    let request = b"GET /index.html HTTP/1.1\r\nHost: 127.0.0.1:8080\r\nUser-Agent: curl/7.79.1\r\nAccept: */*\r\n\r\n";

    c.bench_function("parse_simple_request", |b| {
        b.iter(|| {
            black_box(parse(&request[..]).unwrap());
        });
    });
}

fn bench_parse_chunked(c: &mut Criterion) {
    let request =
        b"POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";

    c.bench_function("parse_chunked_request", |b| {
        b.iter(|| {
            black_box(parse(&request[..]).unwrap());
        });
    });
}

fn bench_decode_pipelined(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    c.bench_function("decode_pipelined_requests", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut buffer = BytesMut::with_capacity(request.len() * 4);
            for _ in 0..4 {
                buffer.extend_from_slice(request);
            }
            while let Some(request) = decoder.decode(&mut buffer).unwrap() {
                black_box(request);
            }
        });
    });
}

criterion_group!(benches, bench_parse_simple, bench_parse_chunked, bench_decode_pipelined);
criterion_main!(benches);
