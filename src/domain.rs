//! 域注册表 (Domain Registry)
//!
//! 同一种规范数据包 (时间戳、ID、置信度...) 通过整数域标签区分含义,
//! 例如 `ts0` 是帧号, `ts1` 是相对时间(秒)。
//! 这里集中定义本系统使用的全部域常量, 读取时在适配层校验。

// ========== 时间戳域 ==========

/// 时间戳/时间区间的域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimestampDomain {
    /// 帧号
    FrameNumber = 0,
    /// 相对帧时间 (秒)
    FrameTime = 1,
    /// 绝对时间 (微秒)
    AbsoluteTime = 2,
}

impl TimestampDomain {
    pub const ALL: [TimestampDomain; 3] = [
        TimestampDomain::FrameNumber,
        TimestampDomain::FrameTime,
        TimestampDomain::AbsoluteTime,
    ];

    pub fn from_domain(domain: u32) -> Option<Self> {
        match domain {
            0 => Some(Self::FrameNumber),
            1 => Some(Self::FrameTime),
            2 => Some(Self::AbsoluteTime),
            _ => None,
        }
    }

    pub fn domain(self) -> u32 {
        self as u32
    }
}

// ========== ID 域 ==========

/// ID 数据包的域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdDomain {
    /// 检测ID (`id0`)
    Detection = 0,
    /// 轨迹ID (`id1`)
    Track = 1,
    /// 活动ID (`id2`)
    Activity = 2,
}

impl IdDomain {
    pub fn domain(self) -> u32 {
        self as u32
    }
}

/// 活动参与者(轨迹)ID 的域, 与活动ID相同
pub const ACTOR_ID_DOMAIN: u32 = 2;

// ========== 其他数据包的域 ==========

/// 边界框/多边形: 图像像素坐标
pub const IMAGE_COORDS_DOMAIN: u32 = 0;

/// 检测器输出的置信度与分类 (`conf17`, `cset17`)
pub const DETECTOR_DOMAIN: u32 = 17;

/// 轨迹类型标签 (`cset3`)
pub const TYPES_DOMAIN: u32 = 3;

/// 活动标签 (`act2`)
pub const ACTIVITY_DOMAIN: u32 = 2;
