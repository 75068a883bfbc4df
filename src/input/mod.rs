/// 帧输入 (Frame Input)
///
/// 按顺序产出 (时间戳, 图像):
/// - ImageListSource: 图片列表文件, 每行一个路径
///
/// 视频文件和 RTSP 解码不在本库内, 由外部实现 `FrameSource`。
pub mod image_list;

pub use image_list::ImageListSource;

use anyhow::{bail, Result};
use image::DynamicImage;

use crate::config::{ExperimentConfig, InputType};

/// 图片列表没有时间信息时的默认帧间隔 (秒)
pub const DEFAULT_FRAME_STEP_S: f64 = 0.3333;

/// 帧时间戳
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimestamp {
    /// 帧号, 从1开始
    pub frame: u64,
    /// 相对时间 (秒)
    pub time_s: f64,
}

/// 帧来源
pub trait FrameSource {
    fn has_next(&mut self) -> bool;
    fn next(&mut self) -> Result<(FrameTimestamp, DynamicImage)>;
}

/// 帧间隔: 配置了帧率时取 1/帧率
pub fn frame_step(config: &ExperimentConfig) -> f64 {
    config
        .input
        .frame_rate_hz
        .map(|hz| 1.0 / hz)
        .unwrap_or(DEFAULT_FRAME_STEP_S)
}

/// 根据实验配置打开输入源
pub fn open_source(config: &ExperimentConfig) -> Result<Box<dyn FrameSource>> {
    match config.input.input_type {
        InputType::ImageList => Ok(Box::new(ImageListSource::from_config(config)?)),
        other => bail!("输入类型 {:?} 需要外部解码器", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_step() {
        let mut config = ExperimentConfig::image_list("ds", "/in", "list.txt");
        assert_eq!(frame_step(&config), DEFAULT_FRAME_STEP_S);
        config.input.frame_rate_hz = Some(4.0);
        assert_eq!(frame_step(&config), 0.25);
    }

    #[test]
    fn test_video_source_needs_external_decoder() {
        let mut config = ExperimentConfig::image_list("ds", "/in", "a.mp4");
        config.input.input_type = InputType::VideoFile;
        assert!(open_source(&config).is_err());
    }
}
