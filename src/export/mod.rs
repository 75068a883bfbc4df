/// 训练集导出 (Training Set Export)
///
/// - darknet: Geometry + Label → YOLO 标注文件
pub mod darknet;

pub use darknet::{DarknetExporter, ExportSummary, YoloBox, DEFAULT_CLASSES};
