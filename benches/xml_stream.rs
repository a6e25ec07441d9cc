//! Streaming extraction benchmarks.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use s3_multipart::extract::ResponseExtractor;
use s3_multipart::mocks::TestFixtures;
use s3_multipart::xml::XmlStream;

/// Commit response padded with ignored elements to a realistic size.
fn padded_commit_xml(padding: usize) -> String {
    let mut xml = String::from("<CompleteMultipartUploadResult>");
    for i in 0..padding {
        xml.push_str(&format!("<Checksum{}>c2hhMjU2LXBhZGRpbmc=</Checksum{}>", i % 8, i % 8));
    }
    xml.push_str("<Location>https://test-bucket.s3.amazonaws.com/big.bin</Location>");
    xml.push_str("<ETag>&quot;3858f62230ac3c915f300c664312c11f-9&quot;</ETag>");
    xml.push_str("</CompleteMultipartUploadResult>");
    xml
}

fn bench_initiate_chunked(c: &mut Criterion) {
    let xml =
        TestFixtures::initiate_xml("VXBsb2FkIElEIGZvciA2aWWpbmcncyBteS1tb3ZpZS5tMnRzIHVwbG9hZA");
    let mut group = c.benchmark_group("initiate_chunked");
    group.throughput(Throughput::Bytes(xml.len() as u64));

    for size in [1usize, 16, 4096] {
        let chunks = TestFixtures::chunks_of(&xml, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &chunks, |b, chunks| {
            b.iter(|| {
                let extractor = ResponseExtractor::for_initiate(128).unwrap();
                let mut stream = XmlStream::new(extractor);
                for chunk in chunks {
                    stream.feed(black_box(chunk)).unwrap();
                }
                black_box(stream.finish().handler.into_initiate_result())
            });
        });
    }

    group.finish();
}

fn bench_commit_padded(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_padded");

    for padding in [0usize, 64, 1024] {
        let xml = padded_commit_xml(padding);
        let chunks = TestFixtures::chunks_of(&xml, 1024);
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(padding), &chunks, |b, chunks| {
            b.iter(|| {
                let extractor = ResponseExtractor::for_commit(128).unwrap();
                let mut stream = XmlStream::new(extractor);
                for chunk in chunks {
                    stream.feed(black_box(chunk)).unwrap();
                }
                black_box(stream.finish().handler.into_commit_result())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_initiate_chunked, bench_commit_padded);
criterion_main!(benches);
