//! Benchmarks for extraction throughput.
//!
//! Measures tokenizer and demuxer cost per byte across chunk sizes.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use futures::stream;
use tracksift_media::testing::{MatroskaBuilder, TestBlock, TestTrack};
use tracksift_media::{extract, extract_bytes, ExtractOptions};

/// A stream with one audio and one subtitle track over many clusters.
fn fixture(clusters: u64) -> Vec<u8> {
    let mut builder = MatroskaBuilder::new()
        .track(TestTrack::new(1, 0x02).codec_id("A_OPUS").language("eng"))
        .track(TestTrack::new(2, 0x11).codec_id("S_TEXT/UTF8").language("eng"));

    for i in 0..clusters {
        let mut blocks: Vec<TestBlock> = (0..50)
            .map(|n| TestBlock::simple(1, n * 20, vec![0xA5u8; 960]))
            .collect();
        blocks.push(TestBlock::group(2, 0, format!("Line {}", i), Some(900)));
        builder = builder.cluster(i * 1000, blocks);
    }

    builder.build()
}

fn bench_extract_bytes(c: &mut Criterion) {
    let data = fixture(200);
    let mut group = c.benchmark_group("extract_bytes");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("whole_buffer", |b| {
        b.iter(|| black_box(extract_bytes(&data, &ExtractOptions::default()).unwrap()))
    });

    group.finish();
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let data = fixture(200);
    let mut group = c.benchmark_group("extract_stream");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk_size in [512, 16 * 1024, 2 * 1024 * 1024] {
        let chunks: Vec<Bytes> = data.chunks(chunk_size).map(Bytes::copy_from_slice).collect();

        group.bench_function(format!("chunk_{}", chunk_size), |b| {
            b.iter(|| {
                let source = stream::iter(chunks.clone().into_iter().map(Ok));
                rt.block_on(async {
                    black_box(
                        extract(source, &ExtractOptions::default())
                            .await
                            .unwrap(),
                    )
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract_bytes, bench_chunk_sizes);
criterion_main!(benches);
