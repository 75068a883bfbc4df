// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::collections::BTreeMap;

use super::{max_confidence_name, KpfRecord, Span};
use crate::adapter;
use crate::canonical::{CanonicalRecord, Schema};
use crate::domain::TimestampDomain;
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::presence::Optional;

/// 活动数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Truth,
}

/// 参与者 (轨迹ID) → 区间列表
pub type ActorSpans = BTreeMap<u64, Vec<Span>>;

/// 活动实例记录 (`act`)
///
/// 整体区间和参与者区间各按三个时间域分别保存, 互不影响;
/// 区间不去重、不排序、允许重叠。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Activity {
    activity_names: BTreeMap<String, f64>,
    activity_id: Optional<u64>,
    source: Option<Source>,
    spans: [Vec<Span>; 3],
    actor_spans: [ActorSpans; 3],
}

impl Activity {
    pub fn new() -> Self {
        Self::default()
    }

    // --- activity_names (act2) ---
    pub fn has_activity_names(&self) -> bool {
        !self.activity_names.is_empty()
    }
    pub fn get_activity_names(&self) -> &BTreeMap<String, f64> {
        &self.activity_names
    }
    pub fn get_activity_names_mut(&mut self) -> &mut BTreeMap<String, f64> {
        &mut self.activity_names
    }
    pub fn set_activity_names(&mut self, names: BTreeMap<String, f64>) {
        self.activity_names = names;
    }
    pub fn add_activity_name(&mut self, name: impl Into<String>, confidence: f64) {
        self.activity_names.insert(name.into(), confidence);
    }
    pub fn remove_activity_names(&mut self) {
        self.activity_names.clear();
    }
    pub fn get_max_activity_name(&self) -> String {
        max_confidence_name(&self.activity_names)
    }

    // --- activity_id (id2) ---
    pub fn has_activity_id(&self) -> bool {
        self.activity_id.has()
    }
    pub fn get_activity_id(&self) -> u64 {
        self.activity_id.get()
    }
    pub fn set_activity_id(&mut self, id: u64) {
        self.activity_id.set(id);
    }
    pub fn remove_activity_id(&mut self) {
        self.activity_id.remove();
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

    // --- 按时间域访问 ---

    /// 指定时间域的整体区间
    pub fn spans(&self, domain: TimestampDomain) -> &[Span] {
        &self.spans[domain as usize]
    }
    pub fn spans_mut(&mut self, domain: TimestampDomain) -> &mut Vec<Span> {
        &mut self.spans[domain as usize]
    }
    pub fn add_span(&mut self, domain: TimestampDomain, span: Span) {
        self.spans[domain as usize].push(span);
    }

    /// 指定时间域的参与者区间
    pub fn actor_spans(&self, domain: TimestampDomain) -> &ActorSpans {
        &self.actor_spans[domain as usize]
    }
    pub fn actor_spans_mut(&mut self, domain: TimestampDomain) -> &mut ActorSpans {
        &mut self.actor_spans[domain as usize]
    }
    /// 追加到该参与者的列表末尾, 不去重
    pub fn add_actor_span(&mut self, domain: TimestampDomain, actor: u64, span: Span) {
        self.actor_spans[domain as usize]
            .entry(actor)
            .or_default()
            .push(span);
    }

    // --- frame_id_span (tsr0) ---
    pub fn has_frame_id_span(&self) -> bool {
        !self.spans(TimestampDomain::FrameNumber).is_empty()
    }
    pub fn get_frame_id_span(&self) -> &[Span] {
        self.spans(TimestampDomain::FrameNumber)
    }
    pub fn get_frame_id_span_mut(&mut self) -> &mut Vec<Span> {
        self.spans_mut(TimestampDomain::FrameNumber)
    }
    pub fn add_frame_id_span(&mut self, span: Span) {
        self.add_span(TimestampDomain::FrameNumber, span);
    }
    pub fn remove_frame_id_span(&mut self) {
        self.spans_mut(TimestampDomain::FrameNumber).clear();
    }

    // --- frame_time_span (tsr1) ---
    pub fn has_frame_time_span(&self) -> bool {
        !self.spans(TimestampDomain::FrameTime).is_empty()
    }
    pub fn get_frame_time_span(&self) -> &[Span] {
        self.spans(TimestampDomain::FrameTime)
    }
    pub fn get_frame_time_span_mut(&mut self) -> &mut Vec<Span> {
        self.spans_mut(TimestampDomain::FrameTime)
    }
    pub fn add_frame_time_span(&mut self, span: Span) {
        self.add_span(TimestampDomain::FrameTime, span);
    }
    pub fn remove_frame_time_span(&mut self) {
        self.spans_mut(TimestampDomain::FrameTime).clear();
    }

    // --- frame_absolute_time_span (tsr2) ---
    pub fn has_frame_absolute_time_span(&self) -> bool {
        !self.spans(TimestampDomain::AbsoluteTime).is_empty()
    }
    pub fn get_frame_absolute_time_span(&self) -> &[Span] {
        self.spans(TimestampDomain::AbsoluteTime)
    }
    pub fn get_frame_absolute_time_span_mut(&mut self) -> &mut Vec<Span> {
        self.spans_mut(TimestampDomain::AbsoluteTime)
    }
    pub fn add_frame_absolute_time_span(&mut self, span: Span) {
        self.add_span(TimestampDomain::AbsoluteTime, span);
    }
    pub fn remove_frame_absolute_time_span(&mut self) {
        self.spans_mut(TimestampDomain::AbsoluteTime).clear();
    }

    // --- actor_frame_id_span ---
    pub fn has_actor_frame_id_span(&self) -> bool {
        !self.actor_spans(TimestampDomain::FrameNumber).is_empty()
    }
    pub fn get_actor_frame_id_span(&self) -> &ActorSpans {
        self.actor_spans(TimestampDomain::FrameNumber)
    }
    pub fn get_actor_frame_id_span_mut(&mut self) -> &mut ActorSpans {
        self.actor_spans_mut(TimestampDomain::FrameNumber)
    }
    pub fn add_actor_frame_id_span(&mut self, actor: u64, span: Span) {
        self.add_actor_span(TimestampDomain::FrameNumber, actor, span);
    }
    pub fn remove_actor_frame_id_span(&mut self) {
        self.actor_spans_mut(TimestampDomain::FrameNumber).clear();
    }

    // --- actor_frame_time_span ---
    pub fn has_actor_frame_time_span(&self) -> bool {
        !self.actor_spans(TimestampDomain::FrameTime).is_empty()
    }
    pub fn get_actor_frame_time_span(&self) -> &ActorSpans {
        self.actor_spans(TimestampDomain::FrameTime)
    }
    pub fn get_actor_frame_time_span_mut(&mut self) -> &mut ActorSpans {
        self.actor_spans_mut(TimestampDomain::FrameTime)
    }
    pub fn add_actor_frame_time_span(&mut self, actor: u64, span: Span) {
        self.add_actor_span(TimestampDomain::FrameTime, actor, span);
    }
    pub fn remove_actor_frame_time_span(&mut self) {
        self.actor_spans_mut(TimestampDomain::FrameTime).clear();
    }

    // --- actor_frame_absolute_time_span ---
    pub fn has_actor_frame_absolute_time_span(&self) -> bool {
        !self.actor_spans(TimestampDomain::AbsoluteTime).is_empty()
    }
    pub fn get_actor_frame_absolute_time_span(&self) -> &ActorSpans {
        self.actor_spans(TimestampDomain::AbsoluteTime)
    }
    pub fn get_actor_frame_absolute_time_span_mut(&mut self) -> &mut ActorSpans {
        self.actor_spans_mut(TimestampDomain::AbsoluteTime)
    }
    pub fn add_actor_frame_absolute_time_span(&mut self, actor: u64, span: Span) {
        self.add_actor_span(TimestampDomain::AbsoluteTime, actor, span);
    }
    pub fn remove_actor_frame_absolute_time_span(&mut self) {
        self.actor_spans_mut(TimestampDomain::AbsoluteTime).clear();
    }
}

impl KpfRecord for Activity {
    const SCHEMA: Schema = Schema::Act;

    fn validate(&self) -> Result<()> {
        if !self.has_activity_id() {
            return Err(KpfError::invalid("act", "activity id is not set"));
        }
        if !self.has_activity_names() {
            return Err(KpfError::invalid("act", "activity names are empty"));
        }
        Ok(())
    }

    fn to_canonical(&self) -> CanonicalRecord {
        adapter::activity::to_canonical(self)
    }

    fn from_canonical(rec: &CanonicalRecord, skipped: &mut Vec<UnsupportedDomain>) -> Result<Self> {
        adapter::activity::from_canonical(rec, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_moving() -> Activity {
        let mut a = Activity::new();
        a.add_activity_name("vehicle_moving", 1.0);
        a.set_activity_id(1);
        a.add_frame_id_span((2135.0, 2456.0));
        a.add_actor_frame_id_span(55, (2135.0, 2344.0));
        a.add_actor_frame_id_span(55, (2479.0, 2496.0));
        a
    }

    #[test]
    fn test_scenario_round_trip() {
        let a = vehicle_moving();
        let text = a.to_kpf_string().unwrap();
        let back = Activity::from_kpf_str(&text).unwrap();
        assert_eq!(back.get_activity_id(), 1);
        assert_eq!(back.get_frame_id_span(), &[(2135.0, 2456.0)]);
        assert_eq!(
            back.get_actor_frame_id_span()[&55],
            vec![(2135.0, 2344.0), (2479.0, 2496.0)]
        );
        assert_eq!(back, a);
    }

    #[test]
    fn test_domain_isolation() {
        let mut a = vehicle_moving();
        a.add_frame_time_span((71.1, 81.8));
        a.add_frame_absolute_time_span((1.0e6, 2.0e6));
        assert_eq!(a.get_frame_id_span(), &[(2135.0, 2456.0)]);
        assert_eq!(a.get_frame_time_span(), &[(71.1, 81.8)]);

        a.remove_frame_time_span();
        assert!(!a.has_frame_time_span());
        assert!(a.has_frame_id_span());
        assert!(a.has_frame_absolute_time_span());

        // 读回后每个域只包含自己的区间
        let back = Activity::from_kpf_str(&a.to_kpf_string().unwrap()).unwrap();
        assert_eq!(back.get_frame_id_span(), &[(2135.0, 2456.0)]);
        assert_eq!(back.get_frame_absolute_time_span(), &[(1.0e6, 2.0e6)]);
        assert!(!back.has_frame_time_span());
    }

    #[test]
    fn test_actor_spans_keep_duplicates() {
        let mut a = Activity::new();
        a.add_actor_frame_time_span(3, (1.0, 2.0));
        a.add_actor_frame_time_span(3, (1.0, 2.0));
        assert_eq!(a.get_actor_frame_time_span()[&3].len(), 2);
        assert!(!a.has_actor_frame_id_span());
    }

    #[test]
    fn test_validity() {
        let mut a = Activity::new();
        assert!(!a.is_valid());
        a.set_activity_id(4);
        assert!(!a.is_valid());
        a.add_activity_name("walking", 0.5);
        assert!(a.is_valid());
        a.remove_activity_id();
        let mut buf = Vec::new();
        assert!(a.write(&mut buf).unwrap_err().is_invalid());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_max_activity_name_tie() {
        let mut a = Activity::new();
        a.add_activity_name("talking", 0.5);
        a.add_activity_name("running", 0.5);
        assert_eq!(a.get_max_activity_name(), "running");
    }

    #[test]
    fn test_clear() {
        let mut a = vehicle_moving();
        a.set_source(Source::Truth);
        a.clear();
        assert!(!a.has_activity_id());
        assert!(!a.has_activity_names());
        assert!(!a.has_source());
        assert!(!a.has_frame_id_span());
        assert!(!a.has_actor_frame_id_span());
    }
}
