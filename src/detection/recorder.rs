//! 检测记录器 (DetectionRecorder)
//! 职责: 每帧检测结果 → Geometry 记录 (可选 Label 记录) → KPF 输出

use std::io::Write;

use anyhow::Context;

use super::{Detection, Detector};
use crate::error::Result;
use crate::input::{FrameSource, FrameTimestamp};
use crate::io::RecordWriter;
use crate::records::{Geometry, Label, Meta};

pub struct DetectionRecorder<W: Write> {
    geom: RecordWriter<W>,
    types: Option<RecordWriter<W>>,
    next_id: u64,
    conf_threshold: f64,
}

impl<W: Write> DetectionRecorder<W> {
    pub fn new(geom: W) -> Self {
        Self {
            geom: RecordWriter::new(geom),
            types: None,
            next_id: 0,
            conf_threshold: 0.0,
        }
    }

    /// 同时为每个带类别的检测写一条 types 记录
    pub fn with_labels(mut self, types: W) -> Self {
        self.types = Some(RecordWriter::new(types));
        self
    }

    /// 低于阈值的检测不写出
    pub fn with_conf_threshold(mut self, threshold: f64) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// 在输出开头写一条 meta 记录
    pub fn write_header(&mut self, msg: &str) -> Result<()> {
        let meta = Meta::new(msg);
        self.geom.write_record(&meta)?;
        if let Some(types) = self.types.as_mut() {
            types.write_record(&meta)?;
        }
        Ok(())
    }

    /// 写出一帧的检测, 返回写出的 geometry 数量
    ///
    /// 每个检测分配一个递增ID, 同时作为 detection_id 和 track_id。
    pub fn record_frame(&mut self, ts: FrameTimestamp, detections: &[Detection]) -> Result<usize> {
        let threshold = self.conf_threshold;
        let mut count = 0;
        for det in detections.iter().filter(|d| d.confidence >= threshold) {
            let id = self.next_id;
            self.next_id += 1;

            let mut g = Geometry::new();
            g.set_detection_id(id);
            g.set_track_id(id);
            g.set_frame_id(ts.frame);
            g.set_frame_time(ts.time_s);
            g.set_confidence(det.confidence);
            let (x1, y1, x2, y2) = det.bbox;
            g.set_bounding_box(x1, y1, x2, y2);
            *g.get_classification_mut() = det.classes.clone();
            self.geom.write_record(&g)?;
            count += 1;

            if let Some(types) = self.types.as_mut() {
                if !det.classes.is_empty() {
                    let mut l = Label::new();
                    l.set_track_id(id);
                    *l.get_classification_mut() = det.classes.clone();
                    types.write_record(&l)?;
                }
            }
        }
        Ok(count)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.geom.flush()?;
        if let Some(types) = self.types.as_mut() {
            types.flush()?;
        }
        Ok(())
    }

    /// 已分配的检测ID数量
    pub fn detections(&self) -> u64 {
        self.next_id
    }

    pub fn into_inner(self) -> (W, Option<W>) {
        (self.geom.into_inner(), self.types.map(RecordWriter::into_inner))
    }
}

/// 一次检测运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detections: u64,
}

/// 逐帧运行检测器并记录结果
pub fn run_detector<W: Write>(
    source: &mut dyn FrameSource,
    detector: &mut dyn Detector,
    recorder: &mut DetectionRecorder<W>,
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();
    while source.has_next() {
        let (ts, image) = source.next()?;
        let detections = detector
            .detect(&image)
            .with_context(|| format!("第 {} 帧检测失败", ts.frame))?;
        let written = recorder.record_frame(ts, &detections)?;
        summary.frames += 1;
        summary.detections += written as u64;
        tracing::debug!("frame {}: {} detections", ts.frame, written);
    }
    recorder.flush()?;
    println!(
        "✅ 检测完成: {} 帧, {} 个目标",
        summary.frames, summary.detections
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RecordReader;
    use crate::records::KpfRecord;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    struct BlankFrames {
        remaining: u64,
        frame: u64,
    }

    impl FrameSource for BlankFrames {
        fn has_next(&mut self) -> bool {
            self.remaining > 0
        }

        fn next(&mut self) -> anyhow::Result<(FrameTimestamp, DynamicImage)> {
            self.remaining -= 1;
            self.frame += 1;
            let ts = FrameTimestamp {
                frame: self.frame,
                time_s: self.frame as f64 * 0.5,
            };
            Ok((ts, DynamicImage::ImageRgb8(RgbImage::new(16, 16))))
        }
    }

    /// 每帧返回两个固定检测, 第二个没有类别
    struct FixedDetector;

    impl Detector for FixedDetector {
        fn detect(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
            assert_eq!(image.width(), 16);
            Ok(vec![
                Detection::new((1.0, 2.0, 5.0, 8.0), 0.9).with_class("Person", 0.9),
                Detection::new((3.0, 3.0, 4.0, 4.0), 0.2),
            ])
        }
    }

    #[test]
    fn test_run_writes_geometry_and_labels() {
        let mut source = BlankFrames { remaining: 2, frame: 0 };
        let mut recorder = DetectionRecorder::new(Vec::new()).with_labels(Vec::new());
        recorder.write_header("detections for dataset test").unwrap();
        let summary = run_detector(&mut source, &mut FixedDetector, &mut recorder).unwrap();
        assert_eq!(summary, RunSummary { frames: 2, detections: 4 });

        let (geom, types) = recorder.into_inner();
        let mut r = RecordReader::new(Cursor::new(geom));
        assert_eq!(r.next_meta().unwrap().unwrap().get_msg(), "detections for dataset test");

        let mut ids = Vec::new();
        while let Some(g) = r.next_geometry().unwrap() {
            assert_eq!(g.get_detection_id(), g.get_track_id());
            ids.push((g.get_detection_id(), g.get_frame_id()));
        }
        assert_eq!(ids, vec![(0, 1), (1, 1), (2, 2), (3, 2)]);

        let mut r = RecordReader::new(Cursor::new(types.unwrap()));
        let labels: Vec<u64> = std::iter::from_fn(|| r.next_label().unwrap())
            .map(|l| l.get_track_id())
            .collect();
        assert_eq!(labels, vec![0, 2]);
    }

    #[test]
    fn test_conf_threshold_filters() {
        let mut recorder = DetectionRecorder::new(Vec::new()).with_conf_threshold(0.5);
        let ts = FrameTimestamp { frame: 7, time_s: 2.3 };
        let n = recorder.record_frame(ts, &FixedDetector.detect(&blank()).unwrap()).unwrap();
        assert_eq!(n, 1);
        assert_eq!(recorder.detections(), 1);

        let (geom, types) = recorder.into_inner();
        assert!(types.is_none());
        let g = Geometry::from_kpf_str(std::str::from_utf8(&geom).unwrap()).unwrap();
        assert_eq!(g.get_frame_id(), 7);
        assert_eq!(g.get_frame_time(), 2.3);
        assert_eq!(g.get_bounding_box().width(), 4.0);
        assert_eq!(g.get_max_classification_name(), "Person");
    }

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(16, 16))
    }
}
