/// 记录读写 (Record Writer / Reader)
///
/// 写: 校验 → 规范记录 → 编码 → 一行文本。
/// 读: 一行文本 → 规范记录 → 按 (类型, 域) 匹配 → 原生记录,
///     不匹配的记录放入缓冲区, 留给之后读取其他类型的调用。
pub mod reader;
pub mod writer;

pub use reader::{ReadStats, RecordReader, Records};
pub use writer::RecordWriter;
