// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod error; // 错误类型
pub mod presence; // 字段存在性模型
pub mod domain; // 域注册表
pub mod canonical; // 规范数据包与KPF文本格式
pub mod records; // 记录类型
pub mod adapter; // 原生 ⇄ 规范适配层
pub mod io; // 记录读写

pub mod config; // 实验配置
pub mod detection; // 检测器接口与结果记录
pub mod export; // 训练集导出
pub mod input; // 帧输入
pub mod samples; // 示例数据

pub use crate::error::{KpfError, Result, UnsupportedDomain};
pub use crate::io::{ReadStats, RecordReader, RecordWriter};
pub use crate::records::{
    Activity, BoundingBox, Evaluation, Geometry, Keyframe, KpfRecord, Label, Meta, Occlusion,
    Record, Source,
};

/// 当前时间字符串, 用于 meta 记录和输出文件名
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
