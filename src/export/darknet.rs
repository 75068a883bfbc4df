//! Darknet/YOLO 训练集导出
//!
//! 每张图片旁生成同名 `.txt`, 每行一个目标:
//! `<类别序号> <中心x/宽> <中心y/高> <框宽/宽> <框高/高>`
//! 类别取该轨迹 types 记录中置信度最高的名称。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::io::RecordReader;
use crate::records::{Geometry, KpfRecord};

/// 默认类别表 (顺序即类别序号)
pub const DEFAULT_CLASSES: [&str; 18] = [
    "Vehicle",
    "Person",
    "Tree",
    "Umbrella",
    "Construction_Barrier",
    "Door",
    "Prop",
    "Bike",
    "Parking_Meter",
    "Push_Pulled_Object",
    "Trees",
    "Dumpster",
    "Construction_Vehicle",
    "Receptacle",
    "Other",
    "ATM",
    "Animal",
    "Articulated_Infrastructure",
];

pub const DATA_FILE: &str = "darknet.data.txt";
pub const NAMES_FILE: &str = "darknet.names.txt";
pub const TRAIN_FILE: &str = "train.darknet.txt";

/// 归一化后的 YOLO 框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl YoloBox {
    /// 像素框 → 归一化框; 没有框或图片尺寸为0时返回 None
    pub fn from_geometry(g: &Geometry, class: usize, width: u32, height: u32) -> Option<Self> {
        if !g.has_bounding_box() || width == 0 || height == 0 {
            return None;
        }
        let b = g.get_bounding_box();
        let (cx, cy) = b.center();
        let (iw, ih) = (width as f64, height as f64);
        Some(Self {
            class,
            cx: cx / iw,
            cy: cy / ih,
            w: b.width() / iw,
            h: b.height() / ih,
        })
    }
}

impl fmt::Display for YoloBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {} {}", self.class, self.cx, self.cy, self.w, self.h)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub images: usize,
    pub boxes: usize,
    /// 找不到类别的目标
    pub unlabeled: usize,
}

pub struct DarknetExporter {
    classes: Vec<String>,
    /// track_id -> 类别名
    labels: BTreeMap<u64, String>,
    /// frame_id -> 该帧的几何记录
    frames: BTreeMap<u64, Vec<Geometry>>,
}

impl Default for DarknetExporter {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect())
    }
}

impl DarknetExporter {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            labels: BTreeMap::new(),
            frames: BTreeMap::new(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }

    /// 读入 types 记录, 返回读到的数量; 无法解析的行跳过
    pub fn load_labels<R: BufRead>(&mut self, reader: &mut RecordReader<R>) -> Result<usize> {
        let mut count = 0;
        while let Some(l) = next_or_skip(reader, RecordReader::next_label)? {
            if l.is_valid() {
                self.labels.insert(l.get_track_id(), l.get_max_classification_name());
                count += 1;
            }
        }
        Ok(count)
    }

    /// 读入 geom 记录并按帧号分组; 没有帧号的记录被忽略
    pub fn load_geometry<R: BufRead>(&mut self, reader: &mut RecordReader<R>) -> Result<usize> {
        let mut count = 0;
        while let Some(g) = next_or_skip(reader, RecordReader::next_geometry)? {
            if g.has_frame_id() {
                self.frames.entry(g.get_frame_id()).or_default().push(g);
                count += 1;
            }
        }
        Ok(count)
    }

    /// 目标类别: 优先 types 记录, 其次几何记录自身的分类
    fn class_of(&self, g: &Geometry) -> Option<usize> {
        let name = match (g.has_track_id(), self.labels.get(&g.get_track_id())) {
            (true, Some(name)) => name.clone(),
            _ => g.get_max_classification_name(),
        };
        self.class_index(&name)
    }

    /// 一帧的全部 YOLO 框, 以及找不到类别的目标数
    pub fn frame_boxes(&self, frame: u64, width: u32, height: u32) -> (Vec<YoloBox>, usize) {
        let mut boxes = Vec::new();
        let mut unlabeled = 0;
        for g in self.frames.get(&frame).into_iter().flatten() {
            match self.class_of(g) {
                Some(class) => boxes.extend(YoloBox::from_geometry(g, class, width, height)),
                None => {
                    tracing::warn!(
                        "frame {}: no known class for track {}, box skipped",
                        frame,
                        g.get_track_id()
                    );
                    unlabeled += 1;
                }
            }
        }
        (boxes, unlabeled)
    }

    /// 为图片序列生成标注; 第 i 张图片对应帧号 i
    ///
    /// 标注写到图片同目录的 `.txt`, 图片路径追加到 `out_dir/train.darknet.txt`,
    /// 同时写出 `darknet.data.txt` 和 `darknet.names.txt`。
    pub fn export_images(&self, images: &[PathBuf], out_dir: &Path) -> Result<ExportSummary> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("无法创建目录: {}", out_dir.display()))?;
        self.write_data_file(out_dir)?;
        self.write_names_file(out_dir)?;

        let train_path = out_dir.join(TRAIN_FILE);
        let mut train = fs::File::create(&train_path)
            .with_context(|| format!("无法创建: {}", train_path.display()))?;

        let mut summary = ExportSummary::default();
        for (frame, image) in images.iter().enumerate() {
            let (width, height) = image::image_dimensions(image)
                .with_context(|| format!("无法读取图片尺寸: {}", image.display()))?;
            let (boxes, unlabeled) = self.frame_boxes(frame as u64, width, height);

            let label_path = image.with_extension("txt");
            let mut text = String::new();
            for b in &boxes {
                text.push_str(&b.to_string());
                text.push('\n');
            }
            fs::write(&label_path, text)
                .with_context(|| format!("无法写入: {}", label_path.display()))?;
            writeln!(train, "{}", image.display())?;

            summary.images += 1;
            summary.boxes += boxes.len();
            summary.unlabeled += unlabeled;
        }
        println!(
            "✅ 导出完成: {} 张图片, {} 个框 ({} 个无类别)",
            summary.images, summary.boxes, summary.unlabeled
        );
        Ok(summary)
    }

    pub fn write_data_file(&self, out_dir: &Path) -> Result<()> {
        let text = format!(
            "classes={}\ntrain = {}\ntest = test.darknet.txt\nnames = {}\nbackup = /\n",
            self.classes.len(),
            TRAIN_FILE,
            NAMES_FILE
        );
        let path = out_dir.join(DATA_FILE);
        fs::write(&path, text).with_context(|| format!("无法写入: {}", path.display()))
    }

    pub fn write_names_file(&self, out_dir: &Path) -> Result<()> {
        let mut text = self.classes.join("\n");
        text.push('\n');
        let path = out_dir.join(NAMES_FILE);
        fs::write(&path, text).with_context(|| format!("无法写入: {}", path.display()))
    }
}

/// 读取下一条记录, 格式错误的记录打印警告后跳过
fn next_or_skip<R, T, F>(reader: &mut RecordReader<R>, mut next: F) -> Result<Option<T>>
where
    R: BufRead,
    F: FnMut(&mut RecordReader<R>) -> crate::error::Result<Option<T>>,
{
    loop {
        match next(reader) {
            Ok(r) => return Ok(r),
            Err(e) if e.is_malformed() => tracing::warn!("{}, skipped", e),
            Err(e) => return Err(e.into()),
        }
    }
}
