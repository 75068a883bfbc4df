/// 检测系统 (Detection System)
///
/// - Detector: 外部检测器接口, 每帧返回一组检测框
/// - DetectionRecorder: 检测框 → Geometry/Label 记录 → KPF 文件
pub mod recorder;

pub use recorder::{run_detector, DetectionRecorder, RunSummary};

use std::collections::BTreeMap;

use image::DynamicImage;

/// 单个检测结果 (像素坐标)
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: (f64, f64, f64, f64), // (x1, y1, x2, y2)
    pub confidence: f64,
    pub classes: BTreeMap<String, f64>, // 类别名 -> 分数
}

impl Detection {
    pub fn new(bbox: (f64, f64, f64, f64), confidence: f64) -> Self {
        Self {
            bbox,
            confidence,
            classes: BTreeMap::new(),
        }
    }

    pub fn with_class(mut self, name: &str, score: f64) -> Self {
        self.classes.insert(name.to_string(), score);
        self
    }
}

/// 目标检测器 (darknet/YOLO 等由调用方实现)
pub trait Detector {
    fn detect(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>>;
}
