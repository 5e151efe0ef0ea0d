//! `LineBuffer`：行读取器的字节缓冲与游标状态机。
//!
//! # 数据结构解析（How）
//! - `data`：连续字节区，`data.len()` 即逻辑容量，恒为 2 的幂；
//! - `read_start`：首个未消费字节的下标；
//! - `write_offset`：最后一个有效字节之后的下标。
//!
//! # 契约说明（What）
//! - 始终满足 `0 <= read_start <= write_offset <= capacity`；
//! - `[read_start, write_offset)` 为尚未返回给调用方的数据，`read_start` 之前的字节可被压缩回收；
//! - 容量只增不减；扩容时重新分配并保留 `[0, write_offset)`；
//! - 物理读取一旦返回 0，`end_of_stream` 置位且不再清除，直到槽位被重建。

use core::ops::Range;

use tracing::trace;

use crate::DELIMITER;

/// 无法把缓冲扩到 `requested` 字节（容量溢出或分配失败）。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CapacityOverflow {
    pub(crate) requested: usize,
}

/// 缓冲游标的只读快照。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BufferSnapshot {
    /// 当前容量（2 的幂）。
    pub capacity: usize,
    /// 首个未消费字节的下标。
    pub read_start: usize,
    /// 有效数据的末尾下标。
    pub write_offset: usize,
    /// 是否已观察到流结束。
    pub end_of_stream: bool,
}

impl BufferSnapshot {
    /// 已读入但尚未返回的字节数。
    pub fn pending(&self) -> usize {
        self.write_offset - self.read_start
    }
}

/// 将请求容量向上取整到 2 的幂，最小为 1。
pub(crate) fn capacity_for(requested: usize) -> Result<usize, CapacityOverflow> {
    requested
        .max(1)
        .checked_next_power_of_two()
        .ok_or(CapacityOverflow { requested })
}

#[derive(Debug)]
pub(crate) struct LineBuffer {
    data: Vec<u8>,
    read_start: usize,
    write_offset: usize,
    end_of_stream: bool,
}

impl LineBuffer {
    /// 分配容量为 `capacity_for(requested)` 的空缓冲。
    pub(crate) fn with_capacity(requested: usize) -> Result<Self, CapacityOverflow> {
        let mut buffer = Self {
            data: Vec::new(),
            read_start: 0,
            write_offset: 0,
            end_of_stream: false,
        };
        buffer.reserve_capacity(requested)?;
        Ok(buffer)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            capacity: self.capacity(),
            read_start: self.read_start,
            write_offset: self.write_offset,
            end_of_stream: self.end_of_stream,
        }
    }

    pub(crate) fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// 确保容量不小于 `capacity_for(requested)`，返回是否发生了扩容。
    pub(crate) fn reserve_capacity(&mut self, requested: usize) -> Result<bool, CapacityOverflow> {
        let target = capacity_for(requested)?;
        if target <= self.capacity() {
            return Ok(false);
        }
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| CapacityOverflow { requested: target })?;
        self.data.resize(target, 0);
        Ok(true)
    }

    /// 在 `[read_start, write_offset)` 中查找分隔符。
    pub(crate) fn pending_delimiter(&self) -> Option<usize> {
        self.find_delimiter(self.read_start, self.write_offset)
    }

    /// 为下一次读取腾出 `chunk` 字节的空间：先压缩，仍不足再扩容。
    pub(crate) fn reserve_chunk(&mut self, chunk: usize) -> Result<(), CapacityOverflow> {
        let required = self
            .write_offset
            .checked_add(chunk)
            .ok_or(CapacityOverflow {
                requested: usize::MAX,
            })?;
        if required > self.capacity() && self.read_start != 0 {
            self.compact();
        }

        let required = self.write_offset + chunk;
        if required > self.capacity() {
            let previous = self.capacity();
            self.reserve_capacity(required)?;
            trace!(
                from = previous,
                to = self.capacity(),
                live = self.write_offset,
                "grew line buffer"
            );
        }
        Ok(())
    }

    /// 把未消费区间平移到下标 0。
    fn compact(&mut self) {
        let pending = self.write_offset - self.read_start;
        if pending > 0 {
            self.data.copy_within(self.read_start..self.write_offset, 0);
        }
        trace!(
            discarded = self.read_start,
            shifted = pending,
            "compacted line buffer"
        );
        self.read_start = 0;
        self.write_offset = pending;
    }

    /// 下一次物理读取的目标区域 `[write_offset, write_offset + chunk)`。
    ///
    /// 调用前必须已经 `reserve_chunk(chunk)`。
    pub(crate) fn spare_mut(&mut self, chunk: usize) -> &mut [u8] {
        let start = self.write_offset;
        &mut self.data[start..start + chunk]
    }

    /// 确认新读入的 `n` 个字节，并只在新数据中查找分隔符。
    pub(crate) fn commit(&mut self, n: usize) -> Option<usize> {
        let new_end = self.write_offset + n;
        let cut = self.find_delimiter(self.write_offset, new_end);
        self.write_offset = new_end;
        cut
    }

    /// 切出 `[read_start, cut]` 并把 `read_start` 推进到 `cut + 1`。
    pub(crate) fn cut_line(&mut self, cut: usize) -> Range<usize> {
        let line = self.read_start..cut + 1;
        self.read_start = cut + 1;
        line
    }

    /// 流结束时取走剩余的半行并把两个游标归零；没有剩余数据时返回 `None`。
    ///
    /// 同时记下流结束，之后的调用不再触发物理读取。返回的区间在下一次 `reserve_chunk` 之前仍可通过 [`LineBuffer::bytes`] 访问。
    pub(crate) fn drain_remaining(&mut self) -> Option<Range<usize>> {
        let rest = self.read_start..self.write_offset;
        self.end_of_stream = true;
        self.read_start = 0;
        self.write_offset = 0;
        (!rest.is_empty()).then_some(rest)
    }

    pub(crate) fn bytes(&self, range: Range<usize>) -> &[u8] {
        &self.data[range]
    }

    fn find_delimiter(&self, from: usize, to: usize) -> Option<usize> {
        self.data[from..to]
            .iter()
            .position(|byte| *byte == DELIMITER)
            .map(|offset| from + offset)
    }
}
