//! 物理读取数据源。
//!
//! # 模块定位（Why）
//! - 行读取器只依赖一个外部原语：把最多 `dest.len()` 个字节阻塞读入调用方给出的缓冲区域；
//! - 以 [`ByteSource`] trait 表达该原语，生产环境使用 [`FdSource`]（`read(2)`），
//!   测试与基准使用 [`MemorySource`]。
//!
//! # 契约（What）
//! - `read` 返回 `Ok(0)` 表示流结束；返回值不得超过 `dest.len()`；
//! - 错误原样上报，本模块不做任何重试（包括 `EINTR`）。

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;

/// 数据源句柄，例如 unix 文件描述符。
///
/// 句柄只是索引：本 crate 不拥有也不关闭它指向的资源。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Handle(i32);

impl Handle {
    /// 标准输入。
    pub const STDIN: Handle = Handle(0);

    /// 由原始整数构造句柄。
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// 返回原始整数值。
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for Handle {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 阻塞式字节数据源。
///
/// # 教案式说明
/// - **契约 (What)**：`dest` 即缓冲中 `[write_offset, write_offset + chunk_size)` 区域；
///   成功时返回写入的字节数 `n <= dest.len()`，`0` 表示流结束；
/// - **前置条件**：同一句柄上的调用由调用方串行化；
/// - **风险 (Trade-offs)**：调用可能无限期阻塞，本 crate 不提供超时或取消。
pub trait ByteSource {
    /// 从 `handle` 读取最多 `dest.len()` 个字节写入 `dest`。
    fn read(&self, handle: Handle, dest: &mut [u8]) -> io::Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn read(&self, handle: Handle, dest: &mut [u8]) -> io::Result<usize> {
        (**self).read(handle, dest)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Arc<S> {
    fn read(&self, handle: Handle, dest: &mut [u8]) -> io::Result<usize> {
        (**self).read(handle, dest)
    }
}

/// 基于 unix 文件描述符的数据源，句柄即描述符编号。
#[cfg(unix)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FdSource;

#[cfg(unix)]
impl ByteSource for FdSource {
    fn read(&self, handle: Handle, dest: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(handle.as_raw(), dest).map_err(io::Error::from)
    }
}

/// 内存数据源：每个句柄对应一段可追加的字节流。
///
/// # 教案式说明
/// - **意图 (Why)**：在不触碰真实描述符的前提下复现短读、流结束与读取失败；
/// - **执行 (How)**：内部以 `Arc<Mutex<..>>` 共享状态，克隆出的实例观察同一组流；
///   `with_max_read` 限制单次返回的字节数，模拟管道/套接字的短读；
/// - **契约 (What)**：未知句柄返回 `io::ErrorKind::NotFound`（等价于 `EBADF`）；
///   数据读尽后持续返回 `Ok(0)`，直到再次 `push`。
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    streams: HashMap<Handle, MemoryStream>,
    max_read: Option<usize>,
}

#[derive(Debug, Default)]
struct MemoryStream {
    pending: BytesMut,
    failures: VecDeque<io::ErrorKind>,
}

impl MemorySource {
    /// 创建空数据源。
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制每次 `read` 最多返回 `max_read` 个字节；`0` 表示不限制。
    pub fn with_max_read(self, max_read: usize) -> Self {
        self.inner.lock().max_read = (max_read > 0).then_some(max_read);
        self
    }

    /// 注册一个空流；已存在时不做任何事。
    pub fn open(&self, handle: Handle) {
        self.inner.lock().streams.entry(handle).or_default();
    }

    /// 向 `handle` 的流尾部追加数据，流不存在时先创建。
    pub fn push(&self, handle: Handle, data: impl AsRef<[u8]>) {
        self.inner
            .lock()
            .streams
            .entry(handle)
            .or_default()
            .pending
            .extend_from_slice(data.as_ref());
    }

    /// 让 `handle` 的下一次读取以 `kind` 失败一次。
    pub fn fail_next(&self, handle: Handle, kind: io::ErrorKind) {
        self.inner
            .lock()
            .streams
            .entry(handle)
            .or_default()
            .failures
            .push_back(kind);
    }

    /// 移除 `handle` 的流，之后的读取返回 `NotFound`。
    pub fn close(&self, handle: Handle) -> bool {
        self.inner.lock().streams.remove(&handle).is_some()
    }

    /// `handle` 尚未被读走的字节数。
    pub fn remaining(&self, handle: Handle) -> usize {
        self.inner
            .lock()
            .streams
            .get(&handle)
            .map_or(0, |stream| stream.pending.len())
    }
}

impl ByteSource for MemorySource {
    fn read(&self, handle: Handle, dest: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        let limit = inner.max_read.unwrap_or(usize::MAX);
        let stream = inner.streams.get_mut(&handle).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no memory stream for handle {handle}"),
            )
        })?;

        if let Some(kind) = stream.failures.pop_front() {
            return Err(io::Error::new(kind, "injected read failure"));
        }

        let len = dest.len().min(stream.pending.len()).min(limit);
        dest[..len].copy_from_slice(&stream.pending[..len]);
        stream.pending.advance(len);
        Ok(len)
    }
}
