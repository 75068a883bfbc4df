/// 规范适配层 (Canonical Adapter Layer)
///
/// 每种记录一组纯函数: `to_canonical` (写方向, 全量) 和
/// `from_canonical` (读方向, 部分):
/// - ID 域不符 → `MalformedRecord`, 整条记录作废
/// - 未知的时间戳域/框域/置信度域 → 记录到 `skipped` 并打印警告, 继续
/// - 不认识的键值对 → 忽略
pub mod activity;
pub mod geometry;
pub mod label;
pub mod meta;

use crate::canonical::PacketStyle;
use crate::error::UnsupportedDomain;

/// 记录一个不支持的域 (非致命)
pub(crate) fn skip_domain(
    skipped: &mut Vec<UnsupportedDomain>,
    schema: &str,
    style: PacketStyle,
    domain: u32,
) {
    let w = UnsupportedDomain { style, domain };
    tracing::warn!("{} record: {}, packet skipped", schema, w);
    skipped.push(w);
}
