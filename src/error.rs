//! KPF 错误类型
//! Error taxonomy for reading and writing KPF records

use thiserror::Error;

use crate::canonical::PacketStyle;

/// 读写 KPF 记录时可能出现的错误
#[derive(Debug, Error)]
pub enum KpfError {
    /// 写入时记录缺少必填字段 (invalid_record_error)
    #[error("invalid {kind} record: {reason}")]
    InvalidRecord {
        /// 记录类型 (geom/types/act/meta)
        kind: &'static str,
        /// 无效原因
        reason: String,
    },

    /// 读取时文本无法解析或域不一致 (malformed_record_error)
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 行号 (从1开始, 0 表示未知)
        line: usize,
        /// 解析失败原因
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KpfError {
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            kind,
            reason: reason.into(),
        }
    }

    /// 行号未知的解析错误 (由读取器补上行号)
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line: 0,
            reason: reason.into(),
        }
    }

    /// 为解析错误补上行号
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::MalformedRecord { reason, .. } => Self::MalformedRecord { line, reason },
            other => other,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::InvalidRecord { .. })
    }
}

pub type Result<T> = std::result::Result<T, KpfError>;

/// 不支持的域 (unsupported_domain_warning)
///
/// 非致命: 记录仍然返回, 该数据包被丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedDomain {
    pub style: PacketStyle,
    pub domain: u32,
}

impl std::fmt::Display for UnsupportedDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported {} domain {}", self.style.token(), self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_only_touches_malformed() {
        let e = KpfError::malformed("bad box").at_line(7);
        assert!(matches!(e, KpfError::MalformedRecord { line: 7, .. }));
        assert_eq!(e.to_string(), "malformed record at line 7: bad box");

        let e = KpfError::invalid("types", "missing track id").at_line(3);
        assert!(e.is_invalid());
        assert!(!e.is_malformed());
    }

    #[test]
    fn test_unsupported_domain_display() {
        let w = UnsupportedDomain {
            style: PacketStyle::Ts,
            domain: 7,
        };
        assert_eq!(w.to_string(), "unsupported ts domain 7");
    }
}
