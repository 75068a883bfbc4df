use std::collections::VecDeque;
use std::io::BufRead;

use crate::canonical::{codec, dialect, CanonicalRecord, Schema};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::records::{Activity, Geometry, KpfRecord, Label, Meta, Record};

/// 读取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// 读过的行数
    pub lines: usize,
    /// 成功返回的记录数
    pub records: usize,
    /// 解析失败的记录数
    pub malformed: usize,
    /// 因域不支持而丢弃的数据包数
    pub unsupported_domains: usize,
    /// 空行和注释行
    pub skipped_lines: usize,
}

/// 已解析但尚未被取走的记录
struct Pending {
    line: usize,
    rec: CanonicalRecord,
}

/// KPF 记录读取器
///
/// 按需逐行读取。请求某种类型时, 路过的其他类型记录进入缓冲区,
/// 之后请求那种类型时先从缓冲区按流顺序取出。缓冲区不设上限,
/// 只读一种类型时用 `discard_unmatched()` 关闭缓冲。
pub struct RecordReader<R: BufRead> {
    input: R,
    line_no: usize,
    pending: VecDeque<Pending>,
    keep_unmatched: bool,
    stats: ReadStats,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line_no: 0,
            pending: VecDeque::new(),
            keep_unmatched: true,
            stats: ReadStats::default(),
            buf: Vec::new(),
        }
    }

    /// 不再缓冲未请求的记录, 直接丢弃
    pub fn discard_unmatched(mut self) -> Self {
        self.keep_unmatched = false;
        self.pending.clear();
        self
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// 缓冲区中等待读取的记录数
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// 读取下一条指定类型 (及可选主域) 的记录
    pub fn read_next(&mut self, kind: Schema, domain: Option<u32>) -> Result<Option<Record>> {
        self.next_matching(|rec| rec.matches(kind, domain), Record::from_canonical)
    }

    /// 读取下一条记录, 不限类型
    pub fn read_any(&mut self) -> Result<Option<Record>> {
        self.next_matching(|_| true, Record::from_canonical)
    }

    /// 读取下一条 `T` 类型的记录
    pub fn next_record<T: KpfRecord>(&mut self) -> Result<Option<T>> {
        self.next_matching(|rec| rec.schema == T::SCHEMA, T::from_canonical)
    }

    pub fn next_geometry(&mut self) -> Result<Option<Geometry>> {
        self.next_record()
    }

    pub fn next_label(&mut self) -> Result<Option<Label>> {
        self.next_record()
    }

    pub fn next_activity(&mut self) -> Result<Option<Activity>> {
        self.next_record()
    }

    pub fn next_meta(&mut self) -> Result<Option<Meta>> {
        self.next_record()
    }

    /// 遍历剩余的全部记录 (缓冲区优先)
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }

    fn next_matching<T, M, C>(&mut self, matches: M, convert: C) -> Result<Option<T>>
    where
        M: Fn(&CanonicalRecord) -> bool,
        C: Fn(&CanonicalRecord, &mut Vec<UnsupportedDomain>) -> Result<T>,
    {
        if let Some(i) = self.pending.iter().position(|p| matches(&p.rec)) {
            if let Some(p) = self.pending.remove(i) {
                return self.convert(p, &convert).map(Some);
            }
        }

        while let Some(p) = self.next_canonical()? {
            if matches(&p.rec) {
                return self.convert(p, &convert).map(Some);
            }
            if self.keep_unmatched {
                self.pending.push_back(p);
            } else {
                tracing::debug!("line {}: {} record dropped", p.line, p.rec.schema);
            }
        }
        Ok(None)
    }

    fn convert<T, C>(&mut self, p: Pending, convert: &C) -> Result<T>
    where
        C: Fn(&CanonicalRecord, &mut Vec<UnsupportedDomain>) -> Result<T>,
    {
        let mut skipped = Vec::new();
        let result = convert(&p.rec, &mut skipped);
        self.stats.unsupported_domains += skipped.len();
        match result {
            Ok(record) => {
                self.stats.records += 1;
                Ok(record)
            }
            Err(e) => {
                self.stats.malformed += 1;
                Err(e.at_line(p.line))
            }
        }
    }

    /// 读入并解析下一条非空、非注释行
    fn next_canonical(&mut self) -> Result<Option<Pending>> {
        loop {
            self.buf.clear();
            if self.input.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            self.stats.lines += 1;

            let parsed = std::str::from_utf8(&self.buf)
                .map_err(|e| KpfError::malformed(format!("line is not valid UTF-8: {}", e)))
                .and_then(dialect::parse_line)
                .and_then(|entry| {
                    entry
                        .map(|(schema, body)| codec::decode(&schema, &body))
                        .transpose()
                });
            match parsed {
                Ok(Some(rec)) => {
                    return Ok(Some(Pending {
                        line: self.line_no,
                        rec,
                    }))
                }
                Ok(None) => {
                    tracing::debug!("line {}: blank or comment, skipped", self.line_no);
                    self.stats.skipped_lines += 1;
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    return Err(e.at_line(self.line_no));
                }
            }
        }
    }
}

/// `RecordReader::records()` 返回的迭代器
///
/// 遇到错误时产出 `Err`, 下一次调用从下一行继续。
pub struct Records<'a, R: BufRead> {
    reader: &'a mut RecordReader<R>,
}

impl<R: BufRead> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_any().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const STREAM: &str = "\
# 示例文件
- { meta: Example geometry }
- { geom: { id0: 0, id1: 66, ts0: 5, g0: 104 349 210 385, cset17: { Dumpster: 1 } } }

- { types: { id1: 66, cset3: { Dumpster: 1 } } }
- { act: { act2: { vehicle_moving: 1 }, id2: 1, timespan: [ { tsr0: [ 2135, 2456 ] } ], src: truth, actors: [ { id2: 55, timespan: [ { tsr0: [ 2135, 2344 ] }, { tsr0: [ 2479, 2496 ] } ] } ] } }
- { geom: { id0: 1, id1: 66, ts0: 6, g0: 105 350 211 386 } }
";

    fn reader(text: &str) -> RecordReader<Cursor<&str>> {
        RecordReader::new(Cursor::new(text))
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed() {
        let bytes: &[u8] = b"- { meta: \xff\xfe }\n\
            - { geom: { id0: 1, g0: 1 2 3 } }\n\
            - { geom: { id0: 2 } }\n";
        let mut r = RecordReader::new(Cursor::new(bytes));
        let err = r.read_any().unwrap_err();
        assert!(matches!(err, KpfError::MalformedRecord { line: 1, .. }));
        let err = r.read_any().unwrap_err();
        assert!(matches!(err, KpfError::MalformedRecord { line: 2, .. }));
        let g = r.next_geometry().unwrap().unwrap();
        assert_eq!(g.get_detection_id(), 2);
        let stats = r.stats();
        assert_eq!((stats.lines, stats.malformed, stats.records), (3, 2, 1));
    }

    #[test]
    fn test_discard_unmatched_keeps_nothing() {
        let mut r = reader(STREAM).discard_unmatched();
        let a = r.next_activity().unwrap().unwrap();
        assert_eq!(a.get_activity_id(), 1);
        assert_eq!(r.buffered(), 0);
        assert!(r.next_meta().unwrap().is_none());
        assert_eq!(r.stats().records, 1);
    }

    #[test]
    fn test_heterogeneous_stream_any_order() {
        let mut r = reader(STREAM);

        let a = r.next_activity().unwrap().unwrap();
        assert_eq!(a.get_activity_id(), 1);
        assert_eq!(a.get_max_activity_name(), "vehicle_moving");
        assert_eq!(a.get_actor_frame_id_span()[&55], vec![(2135.0, 2344.0), (2479.0, 2496.0)]);
        assert_eq!(r.buffered(), 3);
        assert!(r.next_activity().unwrap().is_none());
        assert_eq!(r.buffered(), 4);

        let g1 = r.next_geometry().unwrap().unwrap();
        let g2 = r.next_geometry().unwrap().unwrap();
        assert_eq!((g1.get_frame_id(), g2.get_frame_id()), (5, 6));
        assert_eq!(r.next_label().unwrap().unwrap().get_max_classification_name(), "Dumpster");
        assert_eq!(r.next_meta().unwrap().unwrap().get_msg(), "Example geometry");
        assert!(r.read_any().unwrap().is_none());

        let stats = r.stats();
        assert_eq!(stats.records, 5);
        assert_eq!(stats.skipped_lines, 2);
        assert_eq!(stats.lines, 7);
    }

    #[test]
    fn test_records_iterator_keeps_stream_order() {
        let mut r = reader(STREAM);
        let kinds: Vec<Schema> = r.records().map(|rec| rec.unwrap().schema()).collect();
        assert_eq!(
            kinds,
            vec![Schema::Meta, Schema::Geom, Schema::Types, Schema::Act, Schema::Geom]
        );
    }

    #[test]
    fn test_buffered_records_come_first() {
        let mut r = reader(STREAM);
        r.next_label().unwrap().unwrap();
        // meta 和第一条 geom 已进入缓冲区
        match r.read_any().unwrap() {
            Some(Record::Meta(m)) => assert_eq!(m.get_msg(), "Example geometry"),
            other => panic!("unexpected {:?}", other),
        }
        match r.read_any().unwrap() {
            Some(Record::Geometry(g)) => assert_eq!(g.get_frame_id(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_read_next_by_domain() {
        let text = "\
- { types: { id1: 1, cset3: { Person: 1 } } }
- { types: { id1: 2, cset9: { Tree: 1 } } }
";
        let mut r = reader(text);
        let rec = r.read_next(Schema::Types, Some(9)).unwrap().unwrap();
        let Record::Label(l) = rec else {
            panic!("expected label")
        };
        assert_eq!(l.get_track_id(), 2);
        assert!(!l.has_classification());
        assert_eq!(r.stats().unsupported_domains, 1);
        assert!(r.read_next(Schema::Types, Some(3)).unwrap().is_some());
    }

    #[test]
    fn test_malformed_line_then_good_line() {
        let text = "\
- { geom: { id0: 1, g0: 1 2 3 } }
- { geom: { id0: 2, g0: 1 2 3 4 } }
";
        let mut r = reader(text);
        let err = r.next_geometry().unwrap_err();
        assert!(matches!(err, KpfError::MalformedRecord { line: 1, .. }));
        let g = r.next_geometry().unwrap().unwrap();
        assert_eq!(g.get_detection_id(), 2);
        assert_eq!(r.stats().malformed, 1);
    }

    #[test]
    fn test_unparsable_text_is_malformed() {
        let mut r = reader("geom: id0 1\n- { geom: { id0: 4 } }\n");
        assert!(r.read_any().unwrap_err().is_malformed());
        assert!(r.read_any().unwrap().is_some());
    }

    #[test]
    fn test_unknown_timestamp_domain_counted() {
        let mut r = reader("- { geom: { id1: 3, ts7: 12 } }\n");
        let g = r.next_geometry().unwrap().unwrap();
        assert_eq!(g.get_track_id(), 3);
        assert!(!g.has_frame_id());
        assert_eq!(r.stats().unsupported_domains, 1);
    }

    #[test]
    fn test_unexpected_id_domain_reports_line() {
        let mut r = reader("- { meta: x }\n- { geom: { id5: 3 } }\n");
        let err = r.next_geometry().unwrap_err();
        assert!(matches!(err, KpfError::MalformedRecord { line: 2, .. }));
        assert!(r.next_meta().unwrap().is_some());
    }

    #[test]
    fn test_from_kpf_str_skips_other_kinds() {
        let l = Label::from_kpf_str(STREAM).unwrap();
        assert_eq!(l.get_track_id(), 66);
        assert!(Activity::from_kpf_str("- { meta: nothing here }\n")
            .unwrap_err()
            .is_malformed());
    }
}
