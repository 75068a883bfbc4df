// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::collections::BTreeMap;

use super::{max_confidence_name, KpfRecord};
use crate::adapter;
use crate::canonical::{CanonicalRecord, Schema};
use crate::error::{Result, UnsupportedDomain};
use crate::presence::{Optional, Sentinel};

// ========== 枚举类型 ==========

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Truth,
}

/// 遮挡程度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occlusion {
    Medium,
    Heavy,
}

/// 评估结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    TruePositive,
    FalsePositive,
    FalseAlarm,
}

/// 是否关键帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyframe {
    Yes,
    No,
}

// ========== 边界框 ==========

/// 像素坐标边界框 (x1,y1 左上, x2,y2 右下)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

impl Sentinel for BoundingBox {
    const UNSET: Self = BoundingBox {
        x1: -1.0,
        y1: -1.0,
        x2: -1.0,
        y2: -1.0,
    };

    // 任意一个坐标是 -1 都视为没有框
    fn is_unset(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2].contains(&-1.0)
    }
}

// ========== 几何记录 ==========

/// 检测/轨迹几何记录 (`geom`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    detection_id: Optional<u64>,
    track_id: Optional<u64>,
    frame_id: Optional<u64>,
    frame_time_s: Optional<f64>,
    frame_absolute_time_us: Optional<f64>,
    confidence: Optional<f64>,
    bounding_box: Optional<BoundingBox>,
    source: Option<Source>,
    evaluation: Option<Evaluation>,
    occlusion: Option<Occlusion>,
    keyframe: Option<Keyframe>,
    polygon: Vec<(f64, f64)>,
    classification: BTreeMap<String, f64>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    // --- detection_id (id0) ---
    pub fn has_detection_id(&self) -> bool {
        self.detection_id.has()
    }
    pub fn get_detection_id(&self) -> u64 {
        self.detection_id.get()
    }
    pub fn set_detection_id(&mut self, id: u64) {
        self.detection_id.set(id);
    }
    pub fn remove_detection_id(&mut self) {
        self.detection_id.remove();
    }

    // --- track_id (id1) ---
    pub fn has_track_id(&self) -> bool {
        self.track_id.has()
    }
    pub fn get_track_id(&self) -> u64 {
        self.track_id.get()
    }
    pub fn set_track_id(&mut self, id: u64) {
        self.track_id.set(id);
    }
    pub fn remove_track_id(&mut self) {
        self.track_id.remove();
    }

    // --- frame_id (ts0) ---
    pub fn has_frame_id(&self) -> bool {
        self.frame_id.has()
    }
    pub fn get_frame_id(&self) -> u64 {
        self.frame_id.get()
    }
    pub fn set_frame_id(&mut self, id: u64) {
        self.frame_id.set(id);
    }
    pub fn remove_frame_id(&mut self) {
        self.frame_id.remove();
    }

    // --- frame_time_s (ts1) ---
    pub fn has_frame_time(&self) -> bool {
        self.frame_time_s.has()
    }
    pub fn get_frame_time(&self) -> f64 {
        self.frame_time_s.get()
    }
    pub fn set_frame_time(&mut self, time_s: f64) {
        self.frame_time_s.set(time_s);
    }
    pub fn remove_frame_time(&mut self) {
        self.frame_time_s.remove();
    }

    // --- frame_absolute_time_us (ts2) ---
    pub fn has_frame_absolute_time(&self) -> bool {
        self.frame_absolute_time_us.has()
    }
    pub fn get_frame_absolute_time(&self) -> f64 {
        self.frame_absolute_time_us.get()
    }
    pub fn set_frame_absolute_time(&mut self, time_us: f64) {
        self.frame_absolute_time_us.set(time_us);
    }
    pub fn remove_frame_absolute_time(&mut self) {
        self.frame_absolute_time_us.remove();
    }

    // --- confidence (conf17) ---
    pub fn has_confidence(&self) -> bool {
        self.confidence.has()
    }
    pub fn get_confidence(&self) -> f64 {
        self.confidence.get()
    }
    pub fn set_confidence(&mut self, conf: f64) {
        self.confidence.set(conf);
    }
    pub fn remove_confidence(&mut self) {
        self.confidence.remove();
    }

    // --- bounding_box (g0) ---
    pub fn has_bounding_box(&self) -> bool {
        self.bounding_box.has()
    }
    /// 未设置时返回 (-1,-1,-1,-1)
    pub fn get_bounding_box(&self) -> BoundingBox {
        self.bounding_box.get()
    }
    /// 四个坐标一起设置, 不存在只设置部分坐标的框
    pub fn set_bounding_box(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.bounding_box.set(BoundingBox::new(x1, y1, x2, y2));
    }
    pub fn remove_bounding_box(&mut self) {
        self.bounding_box.remove();
    }

    // --- source (src) ---
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }
    pub fn get_source(&self) -> Option<Source> {
        self.source
    }
    pub fn set_source(&mut self, s: Source) {
        self.source = Some(s);
    }
    pub fn remove_source(&mut self) {
        self.source = None;
    }

    // --- evaluation (eval_type) ---
    pub fn has_evaluation(&self) -> bool {
        self.evaluation.is_some()
    }
    pub fn get_evaluation(&self) -> Option<Evaluation> {
        self.evaluation
    }
    pub fn set_evaluation(&mut self, e: Evaluation) {
        self.evaluation = Some(e);
    }
    pub fn remove_evaluation(&mut self) {
        self.evaluation = None;
    }

    // --- occlusion ---
    pub fn has_occlusion(&self) -> bool {
        self.occlusion.is_some()
    }
    pub fn get_occlusion(&self) -> Option<Occlusion> {
        self.occlusion
    }
    pub fn set_occlusion(&mut self, o: Occlusion) {
        self.occlusion = Some(o);
    }
    pub fn remove_occlusion(&mut self) {
        self.occlusion = None;
    }

    // --- keyframe ---
    pub fn has_keyframe(&self) -> bool {
        self.keyframe.is_some()
    }
    pub fn get_keyframe(&self) -> Option<Keyframe> {
        self.keyframe
    }
    pub fn set_keyframe(&mut self, kf: Keyframe) {
        self.keyframe = Some(kf);
    }
    pub fn remove_keyframe(&mut self) {
        self.keyframe = None;
    }

    // --- polygon (poly0), 顶点顺序保持插入顺序 ---
    pub fn has_polygon(&self) -> bool {
        !self.polygon.is_empty()
    }
    pub fn get_polygon(&self) -> &[(f64, f64)] {
        &self.polygon
    }
    pub fn get_polygon_mut(&mut self) -> &mut Vec<(f64, f64)> {
        &mut self.polygon
    }
    pub fn add_polygon_point(&mut self, x: f64, y: f64) {
        self.polygon.push((x, y));
    }
    pub fn remove_polygon(&mut self) {
        self.polygon.clear();
    }

    // --- classification (cset17) ---
    pub fn has_classification(&self) -> bool {
        !self.classification.is_empty()
    }
    pub fn get_classification(&self) -> &BTreeMap<String, f64> {
        &self.classification
    }
    pub fn get_classification_mut(&mut self) -> &mut BTreeMap<String, f64> {
        &mut self.classification
    }
    pub fn add_classification(&mut self, name: impl Into<String>, confidence: f64) {
        self.classification.insert(name.into(), confidence);
    }
    pub fn remove_classification(&mut self) {
        self.classification.clear();
    }
    pub fn get_max_classification_name(&self) -> String {
        max_confidence_name(&self.classification)
    }
}

impl KpfRecord for Geometry {
    const SCHEMA: Schema = Schema::Geom;

    // 几何记录没有必填字段
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn to_canonical(&self) -> CanonicalRecord {
        adapter::geometry::to_canonical(self)
    }

    fn from_canonical(rec: &CanonicalRecord, skipped: &mut Vec<UnsupportedDomain>) -> Result<Self> {
        adapter::geometry::from_canonical(rec, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Geometry {
        let mut g = Geometry::new();
        g.set_detection_id(0);
        g.set_track_id(66);
        g.set_frame_id(5);
        g.set_bounding_box(104.0, 349.0, 210.0, 385.0);
        g.add_classification("Dumpster", 1.0);
        g
    }

    #[test]
    fn test_presence_after_clear() {
        let mut g = scenario();
        g.set_frame_time(0.5);
        g.set_frame_absolute_time(1_500_000.0);
        g.set_confidence(0.8);
        g.set_source(Source::Truth);
        g.set_evaluation(Evaluation::FalseAlarm);
        g.set_occlusion(Occlusion::Heavy);
        g.set_keyframe(Keyframe::No);
        g.add_polygon_point(1.0, 2.0);

        g.clear();
        assert!(!g.has_detection_id());
        assert!(!g.has_track_id());
        assert!(!g.has_frame_id());
        assert!(!g.has_frame_time());
        assert!(!g.has_frame_absolute_time());
        assert!(!g.has_confidence());
        assert!(!g.has_bounding_box());
        assert!(!g.has_source());
        assert!(!g.has_evaluation());
        assert!(!g.has_occlusion());
        assert!(!g.has_keyframe());
        assert!(!g.has_polygon());
        assert!(!g.has_classification());
        assert_eq!(g, Geometry::default());
    }

    #[test]
    fn test_set_and_remove() {
        let mut g = Geometry::new();
        assert_eq!(g.get_track_id(), u64::MAX);
        g.set_track_id(0);
        assert!(g.has_track_id());
        g.remove_track_id();
        assert!(!g.has_track_id());

        assert_eq!(g.get_confidence(), -1.0);
        g.set_confidence(0.0);
        assert!(g.has_confidence());
        g.remove_confidence();
        assert!(!g.has_confidence());

        assert_eq!(g.get_source(), None);
        g.set_source(Source::Truth);
        assert_eq!(g.get_source(), Some(Source::Truth));
        g.remove_source();
        assert!(!g.has_source());
    }

    #[test]
    fn test_bounding_box_is_atomic() {
        let mut g = Geometry::new();
        assert_eq!(g.get_bounding_box(), BoundingBox::UNSET);

        g.set_bounding_box(104.0, 349.0, 210.0, 385.0);
        assert!(g.has_bounding_box());
        assert_eq!(g.get_bounding_box(), BoundingBox::new(104.0, 349.0, 210.0, 385.0));

        // 任一坐标为哨兵值则整个框未设置
        g.set_bounding_box(1.0, -1.0, 3.0, 4.0);
        assert!(!g.has_bounding_box());

        g.set_bounding_box(0.0, 0.0, 3.0, 4.0);
        g.remove_bounding_box();
        assert!(!g.has_bounding_box());
    }

    #[test]
    fn test_polygon_keeps_order() {
        let mut g = Geometry::new();
        g.add_polygon_point(300.0, 397.0);
        g.add_polygon_point(100.0, 399.0);
        g.get_polygon_mut().push((200.0, 398.0));
        assert_eq!(g.get_polygon(), &[(300.0, 397.0), (100.0, 399.0), (200.0, 398.0)]);
    }

    #[test]
    fn test_geometry_always_valid() {
        assert!(Geometry::new().is_valid());
        assert!(scenario().is_valid());
    }

    #[test]
    fn test_scenario_round_trip() {
        let g = scenario();
        let line = g.to_kpf_string().unwrap();
        let back = Geometry::from_kpf_str(&line).unwrap();
        assert!(back.has_bounding_box());
        assert_eq!(back.get_bounding_box(), BoundingBox::new(104.0, 349.0, 210.0, 385.0));
        assert_eq!(back.get_classification()["Dumpster"], 1.0);
        assert_eq!(back, g);
    }

    #[test]
    fn test_max_classification() {
        let mut g = Geometry::new();
        g.add_classification("Person", 0.3);
        g.add_classification("Vehicle", 0.6);
        assert_eq!(g.get_max_classification_name(), "Vehicle");
    }
}
