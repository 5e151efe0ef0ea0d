//! 行读取器性质验证。
//!
//! # 结构说明 (How)
//! - `stream()`：随机字节流，刻意提高 `\n`/`\r` 的出现频率；
//! - `read_all`：以给定容量、块大小与短读上限读尽整个流，每次调用后检查游标快照；
//! - 期望值来自对整段输入做 `split_inclusive(b'\n')`，即“一次性读完再切行”的结果。
//!
//! # 合同与边界 (What)
//! - 无论块/容量如何组合，切出的行与一次性切行完全一致，拼接后等于原始输入；
//! - 除最后一行外每行以 `\n` 结尾，行数为 `k` 或 `k + 1`（`k` 为分隔符个数）；
//! - 流结束后的后续调用稳定返回 `None`；
//! - 任意调用之后 `read_start <= write_offset <= capacity`，容量为 2 的幂且从不缩小。

use proptest::prelude::*;
use spark_line_reader::{
    BufferRegistry, BufferSnapshot, Handle, LineReader, MemorySource, ReaderConfig,
};

fn stream() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            3 => Just(b'\n'),
            1 => Just(b'\r'),
            8 => b'a'..=b'z',
        ],
        0..512,
    )
}

/// 校验游标不变量，返回本次快照的容量。
fn check_cursors(snapshot: BufferSnapshot, previous_capacity: usize) -> usize {
    assert!(
        snapshot.read_start <= snapshot.write_offset,
        "read_start 越过 write_offset：{snapshot:?}"
    );
    assert!(
        snapshot.write_offset <= snapshot.capacity,
        "write_offset 越过容量：{snapshot:?}"
    );
    assert!(snapshot.capacity.is_power_of_two(), "容量不是 2 的幂：{snapshot:?}");
    assert!(
        snapshot.capacity >= previous_capacity,
        "容量从 {previous_capacity} 缩小：{snapshot:?}"
    );
    snapshot.capacity
}

fn read_all(input: &[u8], buffer_size: usize, chunk_size: usize, max_read: usize) -> Vec<Vec<u8>> {
    let registry = BufferRegistry::new();
    let source = MemorySource::new().with_max_read(max_read);
    let handle = Handle::new(0);
    source.push(handle, input);
    let config = ReaderConfig::new()
        .with_buffer_size(buffer_size)
        .with_chunk_size(chunk_size);
    let mut reader = LineReader::with_registry(&registry, source, handle, config).unwrap();
    let mut capacity = check_cursors(reader.snapshot().unwrap(), 0);

    let mut lines = Vec::new();
    while let Some(line) = reader.next_line_bytes().unwrap() {
        capacity = check_cursors(reader.snapshot().unwrap(), capacity);
        lines.push(line.to_vec());
    }
    capacity = check_cursors(reader.snapshot().unwrap(), capacity);
    for _ in 0..3 {
        assert!(reader.next_line_bytes().unwrap().is_none());
        capacity = check_cursors(reader.snapshot().unwrap(), capacity);
    }
    lines
}

proptest! {
    #[test]
    fn chunking_never_changes_lines(
        input in stream(),
        buffer_size in 1usize..64,
        chunk_size in 1usize..64,
        max_read in 0usize..16,
    ) {
        let lines = read_all(&input, buffer_size, chunk_size, max_read);
        let expected: Vec<Vec<u8>> = input
            .split_inclusive(|byte| *byte == b'\n')
            .map(<[u8]>::to_vec)
            .collect();
        prop_assert_eq!(&lines, &expected);
        prop_assert_eq!(lines.concat(), input.clone());
    }

    #[test]
    fn line_count_tracks_delimiters(input in stream(), chunk_size in 1usize..32) {
        let lines = read_all(&input, 4, chunk_size, 0);
        let delimiters = input.iter().filter(|byte| **byte == b'\n').count();
        let trailing = usize::from(input.last().is_some_and(|byte| *byte != b'\n'));
        prop_assert_eq!(lines.len(), delimiters + trailing);

        if let Some((last, body)) = lines.split_last() {
            for line in body {
                prop_assert_eq!(line.last(), Some(&b'\n'));
            }
            prop_assert!(!last.is_empty());
        }
    }

    #[test]
    fn decoded_lines_concatenate_to_input(input in stream(), buffer_size in 1usize..16) {
        let registry = BufferRegistry::new();
        let source = MemorySource::new().with_max_read(3);
        let handle = Handle::new(1);
        source.push(handle, &input);
        let config = ReaderConfig::new().with_buffer_size(buffer_size).with_chunk_size(5);
        let mut reader = LineReader::with_registry(&registry, source, handle, config).unwrap();

        let text: String = reader.lines().collect::<Result<Vec<_>, _>>().unwrap().concat();
        prop_assert_eq!(text.as_bytes(), &input[..]);
    }
}
