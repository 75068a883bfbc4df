//! 图片列表输入
//! 列表文件每行一个图片路径; 不存在的路径相对输入根目录解析

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::DynamicImage;

use super::{frame_step, FrameSource, FrameTimestamp};
use crate::config::ExperimentConfig;

pub struct ImageListSource {
    files: Vec<PathBuf>,
    cursor: usize,
    frame_step_s: f64,
}

impl ImageListSource {
    /// 直接使用一组已解析的路径
    pub fn from_paths(files: Vec<PathBuf>, frame_step_s: f64) -> Self {
        Self {
            files,
            cursor: 0,
            frame_step_s,
        }
    }

    /// 读取 `root_dir/list_file`, 解析其中每个路径
    pub fn open(root_dir: &Path, list_file: &str, frame_step_s: f64) -> Result<Self> {
        let list_path = root_dir.join(list_file);
        let text = fs::read_to_string(&list_path)
            .with_context(|| format!("无法打开图片列表: {}", list_path.display()))?;

        let mut files = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            files.push(resolve(root_dir, line)?);
        }
        println!("📂 图片列表: {} 张 ({})", files.len(), list_path.display());
        Ok(Self::from_paths(files, frame_step_s))
    }

    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        Self::open(&config.input.root_dir, &config.input.source, frame_step(config))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

fn resolve(root_dir: &Path, entry: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(entry);
    if direct.exists() {
        return Ok(direct);
    }
    let joined = root_dir.join(entry);
    if joined.exists() {
        return Ok(joined);
    }
    bail!("找不到图片 '{}' (搜索目录: {})", entry, root_dir.display())
}

impl FrameSource for ImageListSource {
    fn has_next(&mut self) -> bool {
        self.cursor < self.files.len()
    }

    fn next(&mut self) -> Result<(FrameTimestamp, DynamicImage)> {
        let Some(path) = self.files.get(self.cursor) else {
            bail!("图片列表已读完");
        };
        let image = image::open(path).with_context(|| format!("图片解码失败: {}", path.display()))?;
        self.cursor += 1;
        let frame = self.cursor as u64;
        let ts = FrameTimestamp {
            frame,
            time_s: frame as f64 * self.frame_step_s,
        };
        Ok((ts, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("diva_kpf_{}_{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_list_relative_to_root() {
        let dir = scratch_dir("image_list");
        RgbImage::new(4, 3).save(dir.join("a.png")).unwrap();
        RgbImage::new(8, 6).save(dir.join("b.png")).unwrap();
        fs::write(dir.join("list.txt"), "a.png\n\nb.png\n").unwrap();

        let mut src = ImageListSource::open(&dir, "list.txt", 0.5).unwrap();
        assert_eq!(src.len(), 2);

        let (ts, img) = src.next().unwrap();
        assert_eq!(ts, FrameTimestamp { frame: 1, time_s: 0.5 });
        assert_eq!((img.width(), img.height()), (4, 3));

        assert!(src.has_next());
        let (ts, img) = src.next().unwrap();
        assert_eq!(ts.frame, 2);
        assert_eq!(img.width(), 8);
        assert!(!src.has_next());
        assert!(src.next().is_err());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_entry_fails() {
        let dir = scratch_dir("image_list_missing");
        fs::write(dir.join("list.txt"), "nope.png\n").unwrap();
        assert!(ImageListSource::open(&dir, "list.txt", 1.0).is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
