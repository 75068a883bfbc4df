/// KPF 记录类型 (Record Types)
///
/// | 类型 | Schema | 有效条件 |
/// |------|--------|----------|
/// | `Meta`     | `meta`  | 消息非空 |
/// | `Geometry` | `geom`  | 总是有效 |
/// | `Label`    | `types` | 有 track_id 且分类非空 |
/// | `Activity` | `act`   | 有 activity_id 且活动名非空 |
///
/// 每个可选字段提供 `has_x / get_x / set_x / remove_x` 四个操作,
/// 与规范形式之间的转换见 `crate::adapter`。
pub mod activity;
pub mod geometry;
pub mod label;
pub mod meta;

pub use activity::Activity;
pub use geometry::{BoundingBox, Evaluation, Geometry, Keyframe, Occlusion, Source};
pub use label::Label;
pub use meta::Meta;

use std::collections::BTreeMap;
use std::io::Write;

use crate::canonical::{CanonicalRecord, Schema};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::io::{RecordReader, RecordWriter};

/// 单个开始/结束区间
pub type Span = (f64, f64);

/// 所有记录类型的公共接口
pub trait KpfRecord: Sized + Default {
    const SCHEMA: Schema;

    /// 所有字段恢复为未设置
    fn clear(&mut self) {
        *self = Self::default();
    }

    /// 检查必填字段, 无效时返回 `InvalidRecord`
    fn validate(&self) -> Result<()>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// 原生字段 → 规范记录 (只输出已设置的字段)
    fn to_canonical(&self) -> CanonicalRecord;

    /// 规范记录 → 原生字段; 不支持的域追加到 `skipped`
    fn from_canonical(rec: &CanonicalRecord, skipped: &mut Vec<UnsupportedDomain>) -> Result<Self>;

    /// 写入一行; 记录无效时不输出任何内容
    fn write<W: Write>(&self, os: &mut W) -> Result<()> {
        RecordWriter::new(os).write_record(self)
    }

    fn to_kpf_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        String::from_utf8(buf).map_err(|e| KpfError::malformed(e.to_string()))
    }

    /// 从文本中读取第一条该类型的记录, 其他类型的行被忽略
    fn from_kpf_str(text: &str) -> Result<Self> {
        let mut reader = RecordReader::new(text.as_bytes());
        reader.next_record::<Self>()?.ok_or_else(|| {
            KpfError::malformed(format!("no {} record in input", Self::SCHEMA.token()))
        })
    }
}

/// 任意类型的记录 (异构流)
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Meta(Meta),
    Geometry(Geometry),
    Label(Label),
    Activity(Activity),
}

impl Record {
    pub fn schema(&self) -> Schema {
        match self {
            Record::Meta(_) => Schema::Meta,
            Record::Geometry(_) => Schema::Geom,
            Record::Label(_) => Schema::Types,
            Record::Activity(_) => Schema::Act,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Record::Meta(r) => r.validate(),
            Record::Geometry(r) => r.validate(),
            Record::Label(r) => r.validate(),
            Record::Activity(r) => r.validate(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn to_canonical(&self) -> CanonicalRecord {
        match self {
            Record::Meta(r) => r.to_canonical(),
            Record::Geometry(r) => r.to_canonical(),
            Record::Label(r) => r.to_canonical(),
            Record::Activity(r) => r.to_canonical(),
        }
    }

    /// 按记录的 schema 分派到对应适配器
    pub fn from_canonical(
        rec: &CanonicalRecord,
        skipped: &mut Vec<UnsupportedDomain>,
    ) -> Result<Self> {
        Ok(match rec.schema {
            Schema::Meta => Record::Meta(Meta::from_canonical(rec, skipped)?),
            Schema::Geom => Record::Geometry(Geometry::from_canonical(rec, skipped)?),
            Schema::Types => Record::Label(Label::from_canonical(rec, skipped)?),
            Schema::Act => Record::Activity(Activity::from_canonical(rec, skipped)?),
        })
    }
}

impl From<Meta> for Record {
    fn from(r: Meta) -> Self {
        Record::Meta(r)
    }
}

impl From<Geometry> for Record {
    fn from(r: Geometry) -> Self {
        Record::Geometry(r)
    }
}

impl From<Label> for Record {
    fn from(r: Label) -> Self {
        Record::Label(r)
    }
}

impl From<Activity> for Record {
    fn from(r: Activity) -> Self {
        Record::Activity(r)
    }
}

/// 置信度最高的名称
///
/// 按名称排序遍历, 只有严格大于当前最大值才替换,
/// 所以并列时返回字典序最靠前的名称。空集合返回空字符串。
pub fn max_confidence_name(d: &BTreeMap<String, f64>) -> String {
    let mut best: Option<(&String, f64)> = None;
    for (name, conf) in d {
        if best.map_or(true, |(_, max)| *conf > max) {
            best = Some((name, *conf));
        }
    }
    best.map(|(name, _)| name.clone()).unwrap_or_default()
}
