//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义行读取路径上可能出现的全部失败语义：句柄被拆除、物理读取失败、解码失败、扩容失败；
//! - 每个变体都映射到稳定的点分错误码（见 [`codes`]），便于日志聚合与调用方做分支判断。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，保留底层 `io::Error` / [`DecodeError`] 作为 `source`；
//! - 错误只上报，不在库内重试；读取器在失败后仍可继续调用。

use std::io;

use thiserror::Error;

use crate::encoding::{DecodeError, TextEncoding};
use crate::source::Handle;

/// 本 crate 的统一返回类型。
pub type Result<T, E = LineReaderError> = std::result::Result<T, E>;

/// 稳定错误码，格式为 `line_reader.<kind>`。
pub mod codes {
    /// 句柄对应的共享缓冲已被拆除。
    pub const STALE_HANDLE: &str = "line_reader.stale_handle";
    /// 底层物理读取失败。
    pub const READ_FAILURE: &str = "line_reader.read_failure";
    /// 行字节无法按配置的编码解码。
    pub const DECODE_FAILURE: &str = "line_reader.decode_failure";
    /// 扩容时无法申请到所需内存。
    pub const ALLOCATION: &str = "line_reader.allocation";
    /// 配置中出现未知的编码名称。
    pub const UNKNOWN_ENCODING: &str = "line_reader.unknown_encoding";
}

/// 行读取器错误域。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - `StaleHandle`：`remove` 之后继续在该句柄上读取；
///   - `ReadFailure`：`ByteSource::read` 返回错误，原样透传，缓冲游标不变；
///   - `DecodeFailure`：出错的行已被消费，下一次调用从其后继续；
///   - `Allocation`：扩容失败，对该读取器而言不可恢复；
///   - `UnknownEncoding`：构造阶段的配置错误。
/// - **执行逻辑 (How)**：变体携带句柄等上下文，[`LineReaderError::code`] 返回对应的稳定错误码。
#[derive(Debug, Error)]
pub enum LineReaderError {
    /// 句柄的共享缓冲已被拆除。
    #[error("buffer for handle {handle} has been removed")]
    StaleHandle {
        /// 已拆除的句柄。
        handle: Handle,
    },

    /// 物理读取失败。
    #[error("read from handle {handle} failed: {source}")]
    ReadFailure {
        /// 发起读取的句柄。
        handle: Handle,
        /// 数据源返回的原始错误。
        #[source]
        source: io::Error,
    },

    /// 行字节不符合配置的编码。
    #[error("line from handle {handle} is not valid {encoding}: {source}")]
    DecodeFailure {
        /// 行所属的句柄。
        handle: Handle,
        /// 读取器配置的编码。
        encoding: TextEncoding,
        /// 解码失败的位置信息。
        #[source]
        source: DecodeError,
    },

    /// 缓冲扩容失败。
    #[error("cannot grow buffer for handle {handle} to {requested} bytes")]
    Allocation {
        /// 缓冲所属的句柄。
        handle: Handle,
        /// 申请的字节数。
        requested: usize,
    },

    /// 未知的编码名称。
    #[error("unknown text encoding `{label}`")]
    UnknownEncoding {
        /// 配置中给出的原始名称。
        label: String,
    },
}

impl LineReaderError {
    /// 返回错误对应的稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            LineReaderError::StaleHandle { .. } => codes::STALE_HANDLE,
            LineReaderError::ReadFailure { .. } => codes::READ_FAILURE,
            LineReaderError::DecodeFailure { .. } => codes::DECODE_FAILURE,
            LineReaderError::Allocation { .. } => codes::ALLOCATION,
            LineReaderError::UnknownEncoding { .. } => codes::UNKNOWN_ENCODING,
        }
    }

    /// 触发错误的句柄；配置类错误没有句柄。
    pub fn handle(&self) -> Option<Handle> {
        match self {
            LineReaderError::StaleHandle { handle }
            | LineReaderError::ReadFailure { handle, .. }
            | LineReaderError::DecodeFailure { handle, .. }
            | LineReaderError::Allocation { handle, .. } => Some(*handle),
            LineReaderError::UnknownEncoding { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn codes_follow_variant() {
        let handle = Handle::new(7);
        let stale = LineReaderError::StaleHandle { handle };
        assert_eq!(stale.code(), codes::STALE_HANDLE);
        assert_eq!(stale.handle(), Some(handle));
        assert_eq!(stale.to_string(), "buffer for handle 7 has been removed");

        let unknown = LineReaderError::UnknownEncoding {
            label: "ebcdic".into(),
        };
        assert_eq!(unknown.code(), codes::UNKNOWN_ENCODING);
        assert_eq!(unknown.handle(), None);
    }

    #[test]
    fn read_failure_keeps_io_source() {
        let err = LineReaderError::ReadFailure {
            handle: Handle::new(3),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        let source = err.source().expect("应保留底层 io 错误");
        let io_err = source
            .downcast_ref::<io::Error>()
            .expect("source 应为 io::Error");
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.code(), codes::READ_FAILURE);
    }
}
