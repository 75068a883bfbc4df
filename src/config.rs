//! 实验配置 - 通过JSON文件描述一次实验的输入、输出、评分和算法参数

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 实验类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentType {
    ObjectDetection,
    ActivityDetection,
}

/// 输入类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// 文本文件, 每行一个图片路径
    ImageList,
    VideoFile,
    Rtsp,
}

/// 输入传输方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Disk,
    Girder,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    #[default]
    File,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub input_type: InputType,
    pub root_dir: PathBuf,
    /// 相对 root_dir 的列表文件/视频文件, 或 RTSP 地址
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate_hz: Option<f64>,
    #[serde(default)]
    pub transport: Transport,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub output_type: OutputType,
    pub root_dir: PathBuf,
}

/// 评分参数 (交给外部评分程序, 原样传递)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub score_events_executable: String,
    pub reference_geometry: String,
    pub evaluation_output_dir: String,
    pub object_detection_reference_types: String,
    pub object_detection_target: String,
    pub object_detection_iou: String,
    pub object_detection_time_window: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub executable: String,
    pub parameters: BTreeMap<String, String>,
}

/// 实验配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_type: ExperimentType,
    /// 数据集ID, 同时作为输出文件名前缀
    pub dataset_id: String,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub algorithm: AlgorithmConfig,
}

impl ExperimentConfig {
    /// 图片列表输入的最小配置
    pub fn image_list(dataset_id: &str, root_dir: impl Into<PathBuf>, list_file: &str) -> Self {
        Self {
            experiment_type: ExperimentType::ObjectDetection,
            dataset_id: dataset_id.to_string(),
            input: InputConfig {
                input_type: InputType::ImageList,
                root_dir: root_dir.into(),
                source: list_file.to_string(),
                frame_rate_hz: None,
                transport: Transport::Disk,
            },
            output: OutputConfig::default(),
            scoring: ScoringConfig::default(),
            algorithm: AlgorithmConfig::default(),
        }
    }

    /// 从JSON文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("读取实验配置失败: {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("实验配置解析失败: {}", path.display()))?;
        config.validate()?;
        tracing::debug!("experiment config loaded from {}", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("序列化实验配置失败")?;
        fs::write(path, json).with_context(|| format!("保存实验配置失败: {}", path.display()))?;
        Ok(())
    }

    /// 检查必填项
    pub fn validate(&self) -> Result<()> {
        if self.dataset_id.trim().is_empty() {
            bail!("dataset_id 不能为空");
        }
        if self.input.source.trim().is_empty() {
            bail!("input.source 不能为空");
        }
        if let Some(hz) = self.input.frame_rate_hz {
            if !(hz > 0.0) {
                bail!("input.frame_rate_hz 必须为正数, 实际为 {}", hz);
            }
        }
        Ok(())
    }

    /// 输出文件前缀: `<output.root_dir>/<dataset_id>`
    pub fn output_prefix(&self) -> PathBuf {
        self.output.root_dir.join(&self.dataset_id)
    }

    /// 带扩展名的输出路径, 例如 `output_path("geom.yml")`
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.output_prefix().into_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    /// 输入源的完整路径 (RTSP 地址原样返回)
    pub fn input_source_path(&self) -> PathBuf {
        match self.input.input_type {
            InputType::Rtsp => PathBuf::from(&self.input.source),
            _ => self.input.root_dir.join(&self.input.source),
        }
    }

    pub fn algorithm_parameter(&self, key: &str) -> Option<&str> {
        self.algorithm.parameters.get(key).map(String::as_str)
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        println!("\n🎛️  当前实验配置:");
        println!("  实验类型: {:?}", self.experiment_type);
        println!("  数据集: {}", self.dataset_id);
        println!(
            "  输入: {:?} {}",
            self.input.input_type,
            self.input_source_path().display()
        );
        if let Some(hz) = self.input.frame_rate_hz {
            println!("  帧率: {:.2} Hz", hz);
        }
        println!("  输出前缀: {}\n", self.output_prefix().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("diva_kpf_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut config = ExperimentConfig::image_list("VIRAT_S_000000", "/data/frames", "list.txt");
        config.input.frame_rate_hz = Some(30.0);
        config.output.root_dir = PathBuf::from("/tmp/out");
        config.scoring.object_detection_iou = "0.5".to_string();
        config
            .algorithm
            .parameters
            .insert("thresh".to_string(), "0.25".to_string());

        let path = temp_path("experiment.json");
        config.save(&path).unwrap();
        let loaded = ExperimentConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
        assert_eq!(loaded.algorithm_parameter("thresh"), Some("0.25"));
        assert_eq!(loaded.algorithm_parameter("missing"), None);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "experiment_type": "activity_detection",
            "dataset_id": "ds",
            "input": { "input_type": "video_file", "root_dir": "/videos", "source": "a.mp4" },
            "output": { "root_dir": "/out" }
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.experiment_type, ExperimentType::ActivityDetection);
        assert_eq!(config.input.transport, Transport::Disk);
        assert_eq!(config.output.output_type, OutputType::File);
        assert!(config.algorithm.parameters.is_empty());
        assert_eq!(config.input_source_path(), PathBuf::from("/videos/a.mp4"));
    }

    #[test]
    fn test_output_prefix() {
        let mut config = ExperimentConfig::image_list("ds1", "/in", "list.txt");
        config.output.root_dir = PathBuf::from("/out");
        assert_eq!(config.output_prefix(), PathBuf::from("/out/ds1"));
        assert_eq!(config.output_path("geom.yml"), PathBuf::from("/out/ds1.geom.yml"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ExperimentConfig::image_list("", "/in", "list.txt");
        assert!(config.validate().is_err());
        config.dataset_id = "ds".to_string();
        config.input.frame_rate_hz = Some(0.0);
        assert!(config.validate().is_err());
        config.input.frame_rate_hz = Some(15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(ExperimentConfig::load(temp_path("does_not_exist.json")).is_err());
    }
}
