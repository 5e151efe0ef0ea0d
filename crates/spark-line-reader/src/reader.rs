//! `LineReader`：在共享缓冲上逐行拉取数据。
//!
//! # 行为概览（How）
//! 1. 槽位已被拆除时返回 [`LineReaderError::StaleHandle`]；
//! 2. 缓冲中已有未消费数据时，先在其中查找分隔符，命中则直接返回，不触发物理读取；
//! 3. 否则进入读取循环：压缩 → 扩容 → 读取一个块 → 在新字节中查找分隔符；
//! 4. 读取返回 0 时，把剩余半行作为最后一行返回一次；此后该句柄上的调用
//!    不再触发物理读取，始终返回 `Ok(None)`。
//!
//! # 契约说明（What）
//! - 返回的行包含结尾的 `\n`，不剥离 `\r`；流末尾的半行没有 `\n`；
//! - 返回的行永不为空，因此 `Ok(None)`（流结束）与空行可以区分；
//! - 解码失败时游标已越过该行，下一次调用从其后继续。

use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{trace, trace_span};

use crate::buffer::{BufferSnapshot, LineBuffer};
use crate::config::ReaderConfig;
use crate::error::{LineReaderError, Result};
use crate::registry::{BufferRegistry, BufferSlot};
use crate::source::{ByteSource, Handle};

/// 同步行读取器。
///
/// # 教案式说明
/// - **意图 (Why)**：在任意阻塞字节源之上提供“按行拉取”的最小接口；
/// - **契约 (What)**：
///   - `S`：物理读取原语，同一句柄的多个读取器应使用观察同一数据流的数据源；
///   - 同一句柄上的读取器共享缓冲与游标，见 [`BufferRegistry`]；
/// - **风险 (Trade-offs)**：`next_line` 会阻塞在物理读取上，没有超时与取消。
#[derive(Debug)]
pub struct LineReader<S> {
    source: S,
    handle: Handle,
    config: ReaderConfig,
    slot: Arc<BufferSlot>,
}

impl<S: ByteSource> LineReader<S> {
    /// 在进程级仓储上构造读取器。
    pub fn new(source: S, handle: Handle, config: ReaderConfig) -> Result<Self> {
        Self::with_registry(BufferRegistry::global(), source, handle, config)
    }

    /// 在指定仓储上构造读取器。
    ///
    /// 句柄已有共享缓冲且容量不足时立即扩容。
    pub fn with_registry(
        registry: &BufferRegistry,
        source: S,
        handle: Handle,
        config: ReaderConfig,
    ) -> Result<Self> {
        let config = config.normalized();
        let slot = registry.get_or_create(handle, config.buffer_size())?;
        Ok(Self {
            source,
            handle,
            config,
            slot,
        })
    }

    /// 读取下一行并按配置的编码解码；`Ok(None)` 表示流结束。
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let handle = self.handle;
        let encoding = self.config.encoding();
        self.next_with(|bytes| {
            encoding
                .decode(bytes)
                .map_err(|source| LineReaderError::DecodeFailure {
                    handle,
                    encoding,
                    source,
                })
        })
    }

    /// 读取下一行的原始字节（包含分隔符），不做解码。
    pub fn next_line_bytes(&mut self) -> Result<Option<Bytes>> {
        self.next_with(|bytes| Ok(Bytes::copy_from_slice(bytes)))
    }

    /// 以迭代器方式读取，遇到流结束后停止。
    pub fn lines(&mut self) -> Lines<'_, S> {
        Lines {
            reader: self,
            finished: false,
        }
    }

    /// 转换为零参数闭包，每次调用返回下一行或流结束。
    pub fn into_fn(mut self) -> impl FnMut() -> Result<Option<String>> {
        move || self.next_line()
    }

    /// 读取器绑定的句柄。
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// 归一化后的配置。
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 共享缓冲的游标快照。
    pub fn snapshot(&self) -> Result<BufferSnapshot> {
        self.slot.snapshot().ok_or(LineReaderError::StaleHandle {
            handle: self.handle,
        })
    }

    fn next_with<T>(&mut self, extract: impl FnOnce(&[u8]) -> Result<T>) -> Result<Option<T>> {
        let span = trace_span!("next_line", handle = %self.handle);
        let _entered = span.enter();

        let mut state = self.slot.lock();
        let buffer = state.as_mut().ok_or(LineReaderError::StaleHandle {
            handle: self.handle,
        })?;

        match self.locate_line(buffer)? {
            Some(line) => extract(buffer.bytes(line)).map(Some),
            None => Ok(None),
        }
    }

    /// 定位下一行在缓冲中的区间，游标在返回前已推进。
    fn locate_line(&self, buffer: &mut LineBuffer) -> Result<Option<Range<usize>>> {
        if let Some(cut) = buffer.pending_delimiter() {
            return Ok(Some(buffer.cut_line(cut)));
        }
        if buffer.is_end_of_stream() {
            return Ok(None);
        }

        let chunk = self.config.chunk_size();
        loop {
            buffer
                .reserve_chunk(chunk)
                .map_err(|overflow| LineReaderError::Allocation {
                    handle: self.handle,
                    requested: overflow.requested,
                })?;

            let read = self
                .source
                .read(self.handle, buffer.spare_mut(chunk))
                .map_err(|source| LineReaderError::ReadFailure {
                    handle: self.handle,
                    source,
                })?;
            if read > chunk {
                return Err(LineReaderError::ReadFailure {
                    handle: self.handle,
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("source reported {read} bytes for a {chunk} byte chunk"),
                    ),
                });
            }

            if read == 0 {
                let rest = buffer.drain_remaining();
                trace!(
                    trailing = rest.as_ref().map_or(0, |range| range.len()),
                    "end of stream"
                );
                return Ok(rest);
            }

            if let Some(cut) = buffer.commit(read) {
                return Ok(Some(buffer.cut_line(cut)));
            }
        }
    }
}

/// [`LineReader::lines`] 返回的迭代器。
///
/// 流结束后不再触发物理读取；错误原样产出，由调用方决定是否继续。
#[derive(Debug)]
pub struct Lines<'a, S> {
    reader: &'a mut LineReader<S>,
    finished: bool,
}

impl<S: ByteSource> Iterator for Lines<'_, S> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.reader.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => Some(Err(err)),
        }
    }
}
