/// 规范数据包 (Canonical Packets)
///
/// 与具体记录类型无关的通用中间表示。每个数据包带一个域标签,
/// 记录类型通过适配层 (`crate::adapter`) 与这里的表示互相转换,
/// 再由 `codec` + `dialect` 变成一行 KPF 文本。
///
/// ```text
/// Geometry/Label/Activity ⇄ CanonicalRecord ⇄ Node ⇄ "- { geom: { ... } }"
///        (adapter)              (codec)        (dialect)
/// ```
pub mod codec;
pub mod dialect;

use std::collections::BTreeMap;

// ========== 记录模式 ==========

/// 记录类型标签 (每行开头的 `geom:` / `types:` / `act:` / `meta:`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    Geom,
    Types,
    Act,
    Meta,
}

impl Schema {
    pub fn token(&self) -> &'static str {
        match self {
            Schema::Geom => "geom",
            Schema::Types => "types",
            Schema::Act => "act",
            Schema::Meta => "meta",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "geom" => Some(Schema::Geom),
            "types" => Some(Schema::Types),
            "act" => Some(Schema::Act),
            "meta" => Some(Schema::Meta),
            _ => None,
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

// ========== 数据包类型 ==========

/// 数据包样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketStyle {
    Id,
    Ts,
    Tsr,
    Geom,
    Poly,
    Conf,
    CSet,
    Kv,
    Act,
    Meta,
}

impl PacketStyle {
    /// 线格式中的关键字 (域号紧跟其后, 如 `id1`)
    pub fn token(&self) -> &'static str {
        match self {
            PacketStyle::Id => "id",
            PacketStyle::Ts => "ts",
            PacketStyle::Tsr => "tsr",
            PacketStyle::Geom => "g",
            PacketStyle::Poly => "poly",
            PacketStyle::Conf => "conf",
            PacketStyle::CSet => "cset",
            PacketStyle::Kv => "kv",
            PacketStyle::Act => "act",
            PacketStyle::Meta => "meta",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "id" => Some(PacketStyle::Id),
            "ts" => Some(PacketStyle::Ts),
            "tsr" => Some(PacketStyle::Tsr),
            "g" => Some(PacketStyle::Geom),
            "poly" => Some(PacketStyle::Poly),
            "conf" => Some(PacketStyle::Conf),
            "cset" => Some(PacketStyle::CSet),
            "act" => Some(PacketStyle::Act),
            _ => None,
        }
    }
}

/// 数据包头: 样式 + 域 (kv/meta 没有域)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    pub style: PacketStyle,
    pub domain: Option<u32>,
}

impl PacketHeader {
    pub fn new(style: PacketStyle, domain: u32) -> Self {
        Self {
            style,
            domain: Some(domain),
        }
    }
}

/// 带域标签的值
#[derive(Debug, Clone, PartialEq)]
pub struct Scoped<T> {
    pub domain: u32,
    pub t: T,
}

impl<T> Scoped<T> {
    pub fn new(domain: u32, t: T) -> Self {
        Self { domain, t }
    }
}

/// 边界框 (左上角 x1,y1 - 右下角 x2,y2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// 多边形顶点 (顺序有意义)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Poly {
    pub xy: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampRange {
    pub start: f64,
    pub stop: f64,
}

/// 时间戳取值: 整数 (帧号) 按原样保存, 其余为浮点秒/微秒
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TsValue {
    Int(u64),
    Real(f64),
}

impl TsValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            TsValue::Int(n) => n as f64,
            TsValue::Real(t) => t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kv {
    pub key: String,
    pub val: String,
}

impl Kv {
    pub fn new(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }
}

/// 置信度集合 (名称 → 置信度)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSet {
    pub d: BTreeMap<String, f64>,
}

/// 活动参与者
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: Scoped<u64>,
    pub timespan: Vec<Scoped<TimestampRange>>,
}

/// 活动数据包 (act 记录的整个主体)
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPacket {
    pub labels: Scoped<CSet>,
    pub id: Scoped<u64>,
    pub timespan: Vec<Scoped<TimestampRange>>,
    pub actors: Vec<Actor>,
    pub attributes: Vec<Kv>,
}

/// 单个规范数据包
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Id(Scoped<u64>),
    Ts(Scoped<TsValue>),
    Tsr(Scoped<TimestampRange>),
    Geom(Scoped<BBox>),
    Poly(Scoped<Poly>),
    Conf(Scoped<f64>),
    CSet(Scoped<CSet>),
    Kv(Kv),
    Act(ActivityPacket),
    Meta(String),
}

impl Packet {
    pub fn header(&self) -> PacketHeader {
        let (style, domain) = match self {
            Packet::Id(s) => (PacketStyle::Id, Some(s.domain)),
            Packet::Ts(s) => (PacketStyle::Ts, Some(s.domain)),
            Packet::Tsr(s) => (PacketStyle::Tsr, Some(s.domain)),
            Packet::Geom(s) => (PacketStyle::Geom, Some(s.domain)),
            Packet::Poly(s) => (PacketStyle::Poly, Some(s.domain)),
            Packet::Conf(s) => (PacketStyle::Conf, Some(s.domain)),
            Packet::CSet(s) => (PacketStyle::CSet, Some(s.domain)),
            Packet::Kv(_) => (PacketStyle::Kv, None),
            Packet::Act(a) => (PacketStyle::Act, Some(a.labels.domain)),
            Packet::Meta(_) => (PacketStyle::Meta, None),
        };
        PacketHeader { style, domain }
    }
}

// ========== 规范记录 ==========

/// 一行 KPF 记录的规范形式
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub schema: Schema,
    pub packets: Vec<Packet>,
}

impl CanonicalRecord {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            packets: Vec::new(),
        }
    }

    pub fn push(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    /// 记录的主域, 用于按 (类型, 域) 读取
    ///
    /// - geom:  第一个 `g` 包的域, 没有框时取 `poly` 的域
    /// - types: `cset` 的域
    /// - act:   活动标签的域
    /// - meta:  无
    pub fn domain(&self) -> Option<u32> {
        let primary = |style: PacketStyle| {
            self.packets
                .iter()
                .map(Packet::header)
                .find(|h| h.style == style)
                .and_then(|h| h.domain)
        };
        match self.schema {
            Schema::Geom => primary(PacketStyle::Geom).or_else(|| primary(PacketStyle::Poly)),
            Schema::Types => primary(PacketStyle::CSet),
            Schema::Act => primary(PacketStyle::Act),
            Schema::Meta => None,
        }
    }

    /// 是否匹配请求的 (类型, 域); 域为 `None` 时只比较类型
    pub fn matches(&self, kind: Schema, domain: Option<u32>) -> bool {
        self.schema == kind && (domain.is_none() || self.domain() == domain)
    }
}
