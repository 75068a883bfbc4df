use std::io::Write;

use crate::canonical::{codec, dialect, CanonicalRecord};
use crate::error::Result;
use crate::records::{KpfRecord, Meta, Record};

/// KPF 记录写入器
///
/// 每条记录一行 `- { <schema>: <body> }`。记录无效时返回
/// `InvalidRecord`, 不输出任何内容。
pub struct RecordWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// 写入任意类型的记录
    pub fn write(&mut self, record: &Record) -> Result<()> {
        record.validate()?;
        self.emit(&record.to_canonical())
    }

    /// 写入具体类型的记录
    pub fn write_record<T: KpfRecord>(&mut self, record: &T) -> Result<()> {
        record.validate()?;
        self.emit(&record.to_canonical())
    }

    /// 写入一条 meta 记录
    pub fn write_meta(&mut self, msg: impl Into<String>) -> Result<()> {
        self.write_record(&Meta::new(msg))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// 已写入的记录数
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, rec: &CanonicalRecord) -> Result<()> {
        let (schema, body) = codec::encode(rec);
        let mut line = dialect::emit_line(schema, &body);
        line.push('\n');
        // 整行一次写出, 避免半行输出
        self.out.write_all(line.as_bytes())?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Geometry, Label};

    #[test]
    fn test_write_heterogeneous_records() {
        let mut w = RecordWriter::new(Vec::new());
        w.write_meta("Example geometry").unwrap();

        let mut g = Geometry::new();
        g.set_detection_id(0);
        g.set_track_id(66);
        g.set_frame_id(5);
        g.set_bounding_box(104.0, 349.0, 210.0, 385.0);
        g.add_classification("Dumpster", 1.0);
        w.write(&Record::Geometry(g)).unwrap();
        assert_eq!(w.written(), 2);

        let text = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(
            text,
            "- { meta: Example geometry }\n\
             - { geom: { id0: 0, id1: 66, ts0: 5, g0: 104 349 210 385, cset17: { Dumpster: 1 } } }\n"
        );
    }

    #[test]
    fn test_invalid_record_writes_nothing() {
        let mut w = RecordWriter::new(Vec::new());
        let mut l = Label::new();
        l.set_track_id(3);
        let err = w.write_record(&l).unwrap_err();
        assert!(err.is_invalid());
        assert_eq!(w.written(), 0);
        assert!(w.into_inner().is_empty());
    }

    #[test]
    fn test_record_unchanged_by_write() {
        let mut l = Label::new();
        l.set_track_id(66);
        l.add_classification("Dumpster", 1.0);
        let before = l.clone();
        let mut w = RecordWriter::new(Vec::new());
        w.write_record(&l).unwrap();
        w.write_record(&l).unwrap();
        assert_eq!(l, before);
        assert_eq!(w.written(), 2);
    }
}
