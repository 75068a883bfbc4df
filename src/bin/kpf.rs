// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! KPF 工具 - 统计、校验、转换 KPF 标注文件
//!
//! 直接运行: cargo run --bin kpf -- stats a.geom.yml b.types.yml
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use diva_kpf::canonical::Schema;
use diva_kpf::export::DarknetExporter;
use diva_kpf::{samples, Record, RecordReader, RecordWriter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "KPF 标注文件工具", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 统计每个文件的记录数、错误数、跳过的数据包数
    Stats {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// 重新输出记录 (规范化格式), 可按类型和域过滤
    Cat {
        file: PathBuf,

        /// 只输出该类型的记录
        #[arg(short, long, value_enum)]
        kind: Option<Kind>,

        /// 只输出主域为该值的记录 (需要 --kind)
        #[arg(short, long, requires = "kind")]
        domain: Option<u32>,
    },

    /// 检查文件中是否有无法解析或无效的记录
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// 由 geom/types 文件生成 darknet 训练标注
    Darknet {
        /// 几何记录文件
        #[arg(long)]
        geom: PathBuf,

        /// 类型标签文件
        #[arg(long)]
        types: PathBuf,

        /// 图片列表, 每行一个路径, 第 i 行对应帧号 i
        #[arg(long)]
        images: PathBuf,

        /// 输出目录 (darknet.data.txt / darknet.names.txt / train.darknet.txt)
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// 类别名文件, 每行一个; 默认使用内置类别表
        #[arg(long)]
        names: Option<PathBuf>,
    },

    /// 输出各类记录和实验配置的样例
    Examples {
        /// 输出目录; 不指定时打印到标准输出
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Geom,
    Types,
    Act,
    Meta,
}

impl From<Kind> for Schema {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Geom => Schema::Geom,
            Kind::Types => Schema::Types,
            Kind::Act => Schema::Act,
            Kind::Meta => Schema::Meta,
        }
    }
}

fn open(path: &Path) -> Result<RecordReader<BufReader<File>>> {
    let f = File::open(path).with_context(|| format!("无法打开 {}", path.display()))?;
    Ok(RecordReader::new(BufReader::new(f)))
}

// ========== 子命令 ==========

/// 每种类型的记录数
#[derive(Default)]
struct KindCounts {
    geom: usize,
    types: usize,
    act: usize,
    meta: usize,
}

impl KindCounts {
    fn add(&mut self, r: &Record) {
        match r {
            Record::Geometry(_) => self.geom += 1,
            Record::Label(_) => self.types += 1,
            Record::Activity(_) => self.act += 1,
            Record::Meta(_) => self.meta += 1,
        }
    }
}

fn stats(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let mut reader = open(path)?;
        let mut counts = KindCounts::default();
        for rec in reader.records() {
            match rec {
                Ok(r) => counts.add(&r),
                Err(e) if e.is_malformed() => tracing::warn!("{}: {}", path.display(), e),
                Err(e) => return Err(e).with_context(|| format!("读取失败 {}", path.display())),
            }
        }
        let s = reader.stats();
        println!("📄 {}", path.display());
        println!(
            "  记录: {} (geom {}, types {}, act {}, meta {})",
            s.records, counts.geom, counts.types, counts.act, counts.meta
        );
        println!(
            "  错误: {}  跳过的数据包: {}  空行/注释: {}",
            s.malformed, s.unsupported_domains, s.skipped_lines
        );
    }
    Ok(())
}

fn cat(file: &Path, kind: Option<Kind>, domain: Option<u32>) -> Result<()> {
    let mut reader = open(file)?;
    if kind.is_some() {
        reader = reader.discard_unmatched();
    }
    let stdout = io::stdout();
    let mut writer = RecordWriter::new(BufWriter::new(stdout.lock()));
    loop {
        let next = match kind {
            Some(k) => reader.read_next(k.into(), domain),
            None => reader.read_any(),
        };
        match next {
            Ok(Some(r)) => {
                if let Err(e) = writer.write(&r) {
                    tracing::warn!("{}: {}", file.display(), e);
                }
            }
            Ok(None) => break,
            Err(e) if e.is_malformed() => eprintln!("⚠️  {}: {}", file.display(), e),
            Err(e) => return Err(e.into()),
        }
    }
    writer.flush()?;
    Ok(())
}

fn validate(files: &[PathBuf]) -> Result<()> {
    let mut problems = 0;
    for path in files {
        let mut reader = open(path)?;
        let mut invalid = 0;
        for rec in reader.records() {
            match rec {
                Ok(r) => {
                    if let Err(e) = r.validate() {
                        eprintln!("❌ {}: {}", path.display(), e);
                        invalid += 1;
                    }
                }
                Err(e) if e.is_malformed() => eprintln!("❌ {}: {}", path.display(), e),
                Err(e) => return Err(e.into()),
            }
        }
        let s = reader.stats();
        let bad = s.malformed + invalid;
        if bad == 0 {
            println!("✅ {}: {} 条记录", path.display(), s.records);
        } else {
            println!(
                "❌ {}: {} 条记录, {} 条格式错误, {} 条无效",
                path.display(),
                s.records,
                s.malformed,
                invalid
            );
        }
        problems += bad;
    }
    if problems > 0 {
        bail!("发现 {} 条有问题的记录", problems);
    }
    Ok(())
}

fn darknet(
    geom: &Path,
    types: &Path,
    images: &Path,
    out_dir: &Path,
    names: Option<&Path>,
) -> Result<()> {
    let mut exporter = match names {
        Some(p) => {
            let text =
                fs::read_to_string(p).with_context(|| format!("无法读取 {}", p.display()))?;
            DarknetExporter::new(
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect(),
            )
        }
        None => DarknetExporter::default(),
    };
    println!("📦 类别数: {}", exporter.classes().len());

    let n = exporter.load_geometry(&mut open(geom)?)?;
    println!("📐 几何记录: {}", n);
    let n = exporter.load_labels(&mut open(types)?)?;
    println!("🏷️  类型标签: {}", n);

    let list = fs::read_to_string(images)
        .with_context(|| format!("无法读取 {}", images.display()))?;
    let image_paths: Vec<PathBuf> = list
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect();
    exporter.export_images(&image_paths, out_dir)?;
    Ok(())
}

fn examples(out_dir: Option<&Path>) -> Result<()> {
    let exp = samples::experiment_sample();
    match out_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("无法创建目录 {}", dir.display()))?;
            let prefix = dir.join(&exp.dataset_id);
            let file = |ext: &str| -> Result<BufWriter<File>> {
                let path = PathBuf::from(format!("{}.{}", prefix.display(), ext));
                println!("💾 {}", path.display());
                Ok(BufWriter::new(File::create(&path)?))
            };
            samples::write_geometry_sample(file("geom.yml")?)?.flush()?;
            samples::write_label_sample(file("types.yml")?)?.flush()?;
            samples::write_activity_sample(file("activities.yml")?)?.flush()?;
            exp.save(dir.join("experiment.json"))?;
            println!("💾 {}", dir.join("experiment.json").display());
            println!("✅ 样例已生成 ({})", diva_kpf::gen_time_string("-"));
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out = samples::write_geometry_sample(out)?;
            writeln!(out)?;
            out = samples::write_label_sample(out)?;
            writeln!(out)?;
            out = samples::write_activity_sample(out)?;
            writeln!(out)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&exp)?)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Stats { files } => stats(&files),
        Command::Cat { file, kind, domain } => cat(&file, kind, domain),
        Command::Validate { files } => validate(&files),
        Command::Darknet {
            geom,
            types,
            images,
            out_dir,
            names,
        } => darknet(&geom, &types, &images, &out_dir, names.as_deref()),
        Command::Examples { out_dir } => examples(out_dir.as_deref()),
    }
}
