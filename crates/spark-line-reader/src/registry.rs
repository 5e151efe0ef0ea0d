//! # BufferRegistry：按句柄共享的缓冲仓储
//!
//! ## 核心意图（Why）
//! - 同一句柄上构造的多个 [`LineReader`](crate::LineReader) 观察同一块缓冲与同一对游标；
//! - 以显式对象替代进程级全局表，宿主可自行持有实例；[`BufferRegistry::global`] 仅服务于
//!   crate 根部的便捷函数。
//!
//! ## 行为契约（What）
//! - `get_or_create`：句柄已存在时复用其槽位，必要时扩容；否则分配新缓冲；
//! - `remove`：原子移除槽位并释放缓冲，所有仍持有该槽位的读取器此后返回 `StaleHandle`；
//!   随后对同一句柄的 `get_or_create` 得到全新的槽位，旧读取器保持失效；
//! - 以 `DashMap<Handle, Arc<BufferSlot>>` 存储，槽位内部由 `parking_lot::Mutex` 保护。
//!
//! ## 风险提示（Trade-offs）
//! - 互斥锁只让单次 `next_line` 原子化；多个读取器交替调用仍共享同一组游标，
//!   谁先调用谁取走下一行，调用方需自行约束同一句柄上只有一个活跃读取器。

use std::sync::{Arc, OnceLock};

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::buffer::{BufferSnapshot, CapacityOverflow, LineBuffer};
use crate::error::{LineReaderError, Result};
use crate::source::Handle;

/// 单个句柄的共享缓冲状态。
///
/// `None` 表示槽位已被拆除（墓碑），缓冲内存已释放。
#[derive(Debug)]
pub struct BufferSlot {
    handle: Handle,
    state: Mutex<Option<LineBuffer>>,
}

impl BufferSlot {
    fn new(handle: Handle, buffer: LineBuffer) -> Self {
        Self {
            handle,
            state: Mutex::new(Some(buffer)),
        }
    }

    /// 槽位所属的句柄。
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// 槽位是否已被拆除。
    pub fn is_retired(&self) -> bool {
        self.state.lock().is_none()
    }

    /// 当前游标快照；已拆除时返回 `None`。
    pub fn snapshot(&self) -> Option<BufferSnapshot> {
        self.state.lock().as_ref().map(LineBuffer::snapshot)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<LineBuffer>> {
        self.state.lock()
    }

    fn retire(&self) {
        self.state.lock().take();
    }
}

/// 句柄到共享缓冲槽位的仓储。
#[derive(Debug, Default)]
pub struct BufferRegistry {
    slots: DashMap<Handle, Arc<BufferSlot>>,
}

impl BufferRegistry {
    /// 创建空仓储。
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级默认仓储，供 [`create_line_reader`](crate::create_line_reader) 与
    /// [`remove_buffer`](crate::remove_buffer) 使用。
    pub fn global() -> &'static BufferRegistry {
        static GLOBAL: OnceLock<BufferRegistry> = OnceLock::new();
        GLOBAL.get_or_init(BufferRegistry::new)
    }

    /// 获取或创建 `handle` 的槽位，保证容量不小于 `capacity` 向上取整后的 2 的幂。
    ///
    /// # 教案式注释
    /// - **前置条件**：无；`capacity == 0` 按最小容量 1 处理；
    /// - **后置条件**：返回的槽位处于活跃状态，容量满足请求；
    /// - **错误**：容量溢出或分配失败时返回 [`LineReaderError::Allocation`]。
    pub fn get_or_create(&self, handle: Handle, capacity: usize) -> Result<Arc<BufferSlot>> {
        let to_error = |overflow: CapacityOverflow| LineReaderError::Allocation {
            handle,
            requested: overflow.requested,
        };

        let slot = match self.slots.entry(handle) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                let buffer = LineBuffer::with_capacity(capacity).map_err(to_error)?;
                debug!(%handle, capacity = buffer.capacity(), "created line buffer");
                return Ok(Arc::clone(
                    vacant.insert(Arc::new(BufferSlot::new(handle, buffer))).value(),
                ));
            }
        };

        // 条目锁已释放，再加槽位锁。
        let mut state = slot.lock();
        if let Some(buffer) = state.as_mut() {
            let previous = buffer.capacity();
            if buffer.reserve_capacity(capacity).map_err(to_error)? {
                debug!(
                    %handle,
                    from = previous,
                    to = buffer.capacity(),
                    "grew shared line buffer"
                );
            }
        }
        drop(state);
        Ok(slot)
    }

    /// 拆除 `handle` 的槽位；句柄不存在时返回 `false`。
    pub fn remove(&self, handle: Handle) -> bool {
        match self.slots.remove(&handle) {
            Some((_, slot)) => {
                slot.retire();
                debug!(%handle, "removed line buffer");
                true
            }
            None => false,
        }
    }

    /// 拆除全部槽位。
    pub fn clear(&self) {
        let handles: Vec<Handle> = self.slots.iter().map(|entry| *entry.key()).collect();
        for handle in handles {
            self.remove(handle);
        }
    }

    /// `handle` 是否登记了共享缓冲。
    pub fn contains(&self, handle: Handle) -> bool {
        self.slots.contains_key(&handle)
    }

    /// `handle` 当前的游标快照。
    pub fn snapshot(&self, handle: Handle) -> Option<BufferSnapshot> {
        let slot = self.slots.get(&handle).map(|entry| Arc::clone(entry.value()))?;
        slot.snapshot()
    }

    /// 当前登记的句柄数量。
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 仓储中没有任何句柄时返回 `true`。
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
