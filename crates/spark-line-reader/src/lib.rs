#![warn(missing_docs)]

//! `spark-line-reader` 提供基于文件描述符（或任意整数句柄）的同步分块行读取器。
//!
//! # 使用概览（How）
//! - 通过 [`LineReader::with_registry`] 在自有的 [`BufferRegistry`] 上构造读取器，
//!   或使用 [`create_line_reader`] 在进程级仓储与 [`FdSource`] 上一步得到读取闭包；
//! - 每次 [`LineReader::next_line`] 返回一整行（包含 `\n`），`Ok(None)` 表示流结束；
//! - [`remove_buffer`] / [`BufferRegistry::remove`] 拆除句柄的共享缓冲，
//!   该句柄上的全部读取器随后返回 [`LineReaderError::StaleHandle`]。
//!
//! # 合约说明（What）
//! - 分隔符固定为单字节 `\n`，`\r` 原样保留；
//! - 缓冲容量始终是 2 的幂，只增不减；读取前先压缩已消费前缀，仍不足再扩容；
//! - 同一句柄的读取器共享缓冲与游标，调用方需保证同一时刻只有一个活跃读取器。
//!
//! ```
//! use spark_line_reader::{BufferRegistry, Handle, LineReader, MemorySource, ReaderConfig};
//!
//! let registry = BufferRegistry::new();
//! let source = MemorySource::new();
//! let handle = Handle::new(3);
//! source.push(handle, b"ab\ncd\ne");
//!
//! let config = ReaderConfig::new().with_buffer_size(4).with_chunk_size(2);
//! let mut reader = LineReader::with_registry(&registry, source, handle, config)?;
//! assert_eq!(reader.next_line()?.as_deref(), Some("ab\n"));
//! assert_eq!(reader.next_line()?.as_deref(), Some("cd\n"));
//! assert_eq!(reader.next_line()?.as_deref(), Some("e"));
//! assert_eq!(reader.next_line()?, None);
//! # Ok::<(), spark_line_reader::LineReaderError>(())
//! ```

mod buffer;
mod config;
mod encoding;
mod error;
mod reader;
mod registry;
mod source;

pub use crate::buffer::BufferSnapshot;
pub use crate::config::{DEFAULT_BUFFER_SIZE, DEFAULT_CHUNK_SIZE, ReaderConfig};
pub use crate::encoding::{DecodeError, TextEncoding};
pub use crate::error::{LineReaderError, Result, codes};
pub use crate::reader::{LineReader, Lines};
pub use crate::registry::{BufferRegistry, BufferSlot};
#[cfg(unix)]
pub use crate::source::FdSource;
pub use crate::source::{ByteSource, Handle, MemorySource};

/// 行分隔符。
pub const DELIMITER: u8 = b'\n';

/// 在进程级仓储上为描述符 `handle` 创建读取闭包。
///
/// # 教案式说明
/// - **契约 (What)**：`buffer_size`/`chunk_size` 为 `0` 时使用默认值（32768 / 2048）；
///   `encoding` 为编码名称（如 `"utf-8"`），未知名称立即返回 [`LineReaderError::UnknownEncoding`]；
/// - **后置条件**：返回的闭包每次调用产出下一行，流结束后持续返回 `Ok(None)`。
#[cfg(unix)]
pub fn create_line_reader(
    handle: impl Into<Handle>,
    buffer_size: usize,
    chunk_size: usize,
    encoding: &str,
) -> Result<impl FnMut() -> Result<Option<String>>> {
    let config = ReaderConfig::new()
        .with_buffer_size(buffer_size)
        .with_chunk_size(chunk_size)
        .with_encoding(encoding.parse()?);
    Ok(LineReader::new(FdSource, handle.into(), config)?.into_fn())
}

/// 拆除进程级仓储中 `handle` 的共享缓冲；句柄未登记时返回 `false`。
pub fn remove_buffer(handle: impl Into<Handle>) -> bool {
    BufferRegistry::global().remove(handle.into())
}
