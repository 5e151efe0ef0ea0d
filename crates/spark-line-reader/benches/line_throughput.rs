use criterion::{BenchmarkId, Criterion, Throughput, black_box};
use spark_line_reader::{BufferRegistry, Handle, LineReader, MemorySource, ReaderConfig};
use std::{env, time::Duration};

/// 行读取吞吐基准：在内存数据源上读尽 1 MiB 文本。
///
/// # 设计背景（Why）
/// - 压缩与扩容策略直接决定每行的拷贝次数，块大小则决定物理读取次数；
/// - 以短读上限模拟管道场景，观察不同块大小下的吞吐变化。
fn bench_line_throughput(c: &mut Criterion) {
    let payload = sample_payload(1 << 20);
    let mut group = c.benchmark_group("line_throughput");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for chunk_size in [256usize, 2048, 16384] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let registry = BufferRegistry::new();
                    let source = MemorySource::new().with_max_read(4096);
                    let handle = Handle::new(0);
                    source.push(handle, &payload);
                    let config = ReaderConfig::new()
                        .with_buffer_size(4096)
                        .with_chunk_size(chunk_size);
                    let mut reader =
                        LineReader::with_registry(&registry, source, handle, config).unwrap();

                    let mut lines = 0usize;
                    while let Some(line) = reader.next_line_bytes().unwrap() {
                        lines += black_box(line).len();
                    }
                    black_box(lines)
                });
            },
        );
    }
    group.finish();
}

fn sample_payload(len: usize) -> Vec<u8> {
    let mut payload = Vec::with_capacity(len);
    let mut width = 1usize;
    while payload.len() < len {
        payload.extend(std::iter::repeat_n(b'x', width));
        payload.push(b'\n');
        width = width % 200 + 7;
    }
    payload.truncate(len);
    payload
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_line_throughput(&mut criterion);
    criterion.final_summary();
}
