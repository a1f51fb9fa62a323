//! 元素出现监视
//!
//! 围绕"命名选择器集合"的出现状态提供扫描与持续监视能力:
//!
//! - `presence`: 词汇类型 [`TrackedSet`](监视目标)与 [`PresenceMap`](扫描结果)
//! - `scan`: 选择器预编译与全量扫描,[`scan_once`] 提供一次性检查
//! - `session`: 单次观察的生命周期 [`WatchSession`],先扫描、缺失才挂观察器
//! - `handle`: 对外入口 [`ElementWatcher`],按配置内容复用或重建会话
//! - `settle`: 基于 watch 通道的等待辅助([`wait_settled`] 等)
//!
//! 状态机只有两个状态:Idle(无观察器)与 Watching(已挂观察器)。
//! 全部元素出现后会话自行断开观察器并回到 Idle;显式 detach 在任何
//! 状态下都会同步移除观察器注册。

pub mod handle;
pub mod presence;
pub mod scan;
pub mod session;
pub mod settle;

pub use handle::ElementWatcher;
pub use presence::{PresenceMap, TrackedSet};
pub use scan::scan_once;
pub use session::{WatchSession, WatchState};
pub use settle::{presence_stream, wait_settled};
