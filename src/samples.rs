//! 示例数据 - 各种记录类型和实验配置的样例

use std::io::Write;

use crate::config::{ExperimentConfig, InputType, Transport};
use crate::error::Result;
use crate::io::RecordWriter;
use crate::records::activity::Source as ActivitySource;
use crate::records::{Activity, Evaluation, Geometry, KpfRecord, Label, Occlusion, Source};

/// 一条轨迹 (track 66) 的 50 帧几何记录
pub fn write_geometry_sample<W: Write>(out: W) -> Result<W> {
    let mut w = RecordWriter::new(out);
    w.write_meta("Example geometry")?;
    w.write_meta("1 tracks; 50 detection")?;
    w.write_meta("min / max frame: 0 49 min / max timestamp: 0 4.9")?;

    let mut geom = Geometry::new();
    for i in 0..50u64 {
        geom.clear();
        geom.set_track_id(66);
        geom.set_detection_id(i);
        geom.set_frame_id(i);
        geom.set_frame_time(i as f64 / 10.0);
        geom.set_evaluation(Evaluation::TruePositive);
        geom.set_occlusion(Occlusion::Heavy);
        geom.set_source(Source::Truth);
        geom.set_bounding_box(104.0, 349.0, 210.0, 385.0);
        geom.add_polygon_point(100.0, 399.0);
        geom.add_polygon_point(200.0, 398.0);
        geom.add_polygon_point(300.0, 397.0);
        w.write_record(&geom)?;
    }
    w.write_meta("eof")?;
    Ok(w.into_inner())
}

/// 两条轨迹的类型标签
pub fn write_label_sample<W: Write>(out: W) -> Result<W> {
    let mut w = RecordWriter::new(out);
    w.write_meta("Example type labels")?;

    let mut label = Label::new();
    label.set_track_id(66);
    label.add_classification("Dumpster", 1.0);
    w.write_record(&label)?;

    label.clear();
    label.set_track_id(67);
    label.add_classification("Vehicle", 1.0);
    w.write_record(&label)?;

    w.write_meta("eof")?;
    Ok(w.into_inner())
}

/// 一个有两个参与者的活动
pub fn write_activity_sample<W: Write>(out: W) -> Result<W> {
    let mut w = RecordWriter::new(out);
    w.write_meta("Example activity")?;
    w.write_meta("vehicle_moving 1 instances")?;

    let mut act = Activity::new();
    act.add_activity_name("vehicle_moving", 1.0);
    act.set_activity_id(1);
    act.set_source(ActivitySource::Truth);
    act.add_frame_id_span((2135.0, 2456.0));
    act.add_frame_id_span((2479.0, 2503.0));
    act.add_actor_frame_id_span(55, (2135.0, 2344.0));
    act.add_actor_frame_id_span(55, (2479.0, 2496.0));
    act.add_actor_frame_id_span(44, (2267.0, 2456.0));
    act.add_actor_frame_id_span(44, (2488.0, 2503.0));
    w.write_record(&act)?;

    w.write_meta("eof")?;
    Ok(w.into_inner())
}

/// 目标检测实验配置样例
pub fn experiment_sample() -> ExperimentConfig {
    let mut exp = ExperimentConfig::image_list(
        "VIRAT_S_000206_04_000710_000779",
        "./data/frames",
        "VIRAT_S_000206_04_000710_000779.txt",
    );
    exp.input.input_type = InputType::ImageList;
    exp.input.frame_rate_hz = Some(30.0);
    exp.input.transport = Transport::Disk;
    exp.output.root_dir = "./output".into();
    exp.scoring.score_events_executable = "score_events".to_string();
    exp.scoring.reference_geometry = "./data/VIRAT_S_000206_04_000710_000779.geom.yml".to_string();
    exp.scoring.evaluation_output_dir = "./eval".to_string();
    exp.scoring.object_detection_reference_types =
        "./data/VIRAT_S_000206_04_000710_000779.types.yml".to_string();
    exp.scoring.object_detection_target = "Vehicle".to_string();
    exp.scoring.object_detection_iou = "0.5".to_string();
    exp.scoring.object_detection_time_window = "0".to_string();
    exp.algorithm.executable = "darknet_detections".to_string();
    exp.algorithm
        .parameters
        .insert("darknet_config_path".to_string(), "./darknet.cfg".to_string());
    exp
}
