//! Geometry ⇄ 规范记录
//!
//! | 原生字段 | 数据包 |
//! |----------|--------|
//! | detection_id | `id0` |
//! | track_id | `id1` |
//! | frame_id / frame_time_s / frame_absolute_time_us | `ts0` / `ts1` / `ts2` |
//! | bounding_box | `g0` |
//! | confidence | `conf17` |
//! | source / evaluation / occlusion / keyframe | `src` / `eval_type` / `occlusion` / `keyframe` |
//! | polygon | `poly0` |
//! | classification | `cset17` |

use super::skip_domain;
use crate::canonical::{
    BBox, CSet, CanonicalRecord, Kv, Packet, PacketStyle, Poly, Schema, Scoped, TsValue,
};
use crate::domain::{IdDomain, TimestampDomain, DETECTOR_DOMAIN, IMAGE_COORDS_DOMAIN};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::records::{Evaluation, Geometry, Keyframe, Occlusion, Source};

const SCHEMA: &str = "geom";

// ========== 键值对词表 ==========

const KEY_SOURCE: &str = "src";
const KEY_EVALUATION: &str = "eval_type";
const KEY_OCCLUSION: &str = "occlusion";
const KEY_KEYFRAME: &str = "keyframe";

fn source_token(s: Source) -> &'static str {
    match s {
        Source::Truth => "truth",
    }
}

fn evaluation_token(e: Evaluation) -> &'static str {
    match e {
        Evaluation::TruePositive => "tp",
        Evaluation::FalsePositive => "fp",
        Evaluation::FalseAlarm => "fa",
    }
}

fn occlusion_token(o: Occlusion) -> &'static str {
    match o {
        Occlusion::Medium => "medium",
        Occlusion::Heavy => "heavy",
    }
}

fn keyframe_token(k: Keyframe) -> &'static str {
    match k {
        Keyframe::Yes => "1",
        Keyframe::No => "0",
    }
}

// ========== 写方向 ==========

pub fn to_canonical(g: &Geometry) -> CanonicalRecord {
    let mut rec = CanonicalRecord::new(Schema::Geom);

    if g.has_detection_id() {
        rec.push(Packet::Id(Scoped::new(IdDomain::Detection.domain(), g.get_detection_id())));
    }
    if g.has_track_id() {
        rec.push(Packet::Id(Scoped::new(IdDomain::Track.domain(), g.get_track_id())));
    }
    if g.has_frame_id() {
        rec.push(Packet::Ts(Scoped::new(
            TimestampDomain::FrameNumber.domain(),
            TsValue::Int(g.get_frame_id()),
        )));
    }
    if g.has_frame_time() {
        rec.push(Packet::Ts(Scoped::new(
            TimestampDomain::FrameTime.domain(),
            TsValue::Real(g.get_frame_time()),
        )));
    }
    if g.has_frame_absolute_time() {
        rec.push(Packet::Ts(Scoped::new(
            TimestampDomain::AbsoluteTime.domain(),
            TsValue::Real(g.get_frame_absolute_time()),
        )));
    }
    if g.has_bounding_box() {
        let b = g.get_bounding_box();
        rec.push(Packet::Geom(Scoped::new(
            IMAGE_COORDS_DOMAIN,
            BBox { x1: b.x1, y1: b.y1, x2: b.x2, y2: b.y2 },
        )));
    }
    if g.has_confidence() {
        rec.push(Packet::Conf(Scoped::new(DETECTOR_DOMAIN, g.get_confidence())));
    }
    if let Some(s) = g.get_source() {
        rec.push(Packet::Kv(Kv::new(KEY_SOURCE, source_token(s))));
    }
    if let Some(e) = g.get_evaluation() {
        rec.push(Packet::Kv(Kv::new(KEY_EVALUATION, evaluation_token(e))));
    }
    if let Some(o) = g.get_occlusion() {
        rec.push(Packet::Kv(Kv::new(KEY_OCCLUSION, occlusion_token(o))));
    }
    if let Some(k) = g.get_keyframe() {
        rec.push(Packet::Kv(Kv::new(KEY_KEYFRAME, keyframe_token(k))));
    }
    if g.has_polygon() {
        rec.push(Packet::Poly(Scoped::new(
            IMAGE_COORDS_DOMAIN,
            Poly { xy: g.get_polygon().to_vec() },
        )));
    }
    if g.has_classification() {
        rec.push(Packet::CSet(Scoped::new(
            DETECTOR_DOMAIN,
            CSet { d: g.get_classification().clone() },
        )));
    }
    rec
}

// ========== 读方向 ==========

pub fn from_canonical(
    rec: &CanonicalRecord,
    skipped: &mut Vec<UnsupportedDomain>,
) -> Result<Geometry> {
    if rec.schema != Schema::Geom {
        return Err(KpfError::malformed(format!("expected geom record, got {}", rec.schema)));
    }
    let mut g = Geometry::new();

    for packet in &rec.packets {
        match packet {
            Packet::Id(id) => match id.domain {
                d if d == IdDomain::Detection.domain() => g.set_detection_id(id.t),
                d if d == IdDomain::Track.domain() => g.set_track_id(id.t),
                d => {
                    return Err(KpfError::malformed(format!(
                        "geom id domain {} is neither detection ({}) nor track ({})",
                        d,
                        IdDomain::Detection.domain(),
                        IdDomain::Track.domain()
                    )))
                }
            },
            Packet::Ts(ts) => match TimestampDomain::from_domain(ts.domain) {
                Some(TimestampDomain::FrameNumber) => g.set_frame_id(frame_number(ts.t)?),
                Some(TimestampDomain::FrameTime) => g.set_frame_time(ts.t.as_f64()),
                Some(TimestampDomain::AbsoluteTime) => g.set_frame_absolute_time(ts.t.as_f64()),
                None => skip_domain(skipped, SCHEMA, PacketStyle::Ts, ts.domain),
            },
            Packet::Geom(b) if b.domain == IMAGE_COORDS_DOMAIN => {
                g.set_bounding_box(b.t.x1, b.t.y1, b.t.x2, b.t.y2)
            }
            Packet::Poly(p) if p.domain == IMAGE_COORDS_DOMAIN => {
                *g.get_polygon_mut() = p.t.xy.clone();
            }
            Packet::Conf(c) if c.domain == DETECTOR_DOMAIN => g.set_confidence(c.t),
            Packet::CSet(c) if c.domain == DETECTOR_DOMAIN => {
                *g.get_classification_mut() = c.t.d.clone();
            }
            Packet::Kv(kv) => apply_kv(&mut g, kv),
            other => {
                let h = other.header();
                match h.domain {
                    Some(d) => skip_domain(skipped, SCHEMA, h.style, d),
                    None => tracing::debug!("geom record: ignoring {:?} packet", h.style),
                }
            }
        }
    }
    Ok(g)
}

/// 帧号必须是非负整数; 写成浮点的整数值 (如 `5.0`) 也接受
fn frame_number(t: TsValue) -> Result<u64> {
    match t {
        TsValue::Int(n) => Ok(n),
        TsValue::Real(t) if t >= 0.0 && t.fract() == 0.0 && t < u64::MAX as f64 => Ok(t as u64),
        TsValue::Real(t) => Err(KpfError::malformed(format!(
            "frame number must be a non-negative integer, got {}",
            t
        ))),
    }
}

fn apply_kv(g: &mut Geometry, kv: &Kv) {
    let known = match (kv.key.as_str(), kv.val.as_str()) {
        (KEY_SOURCE, "truth") => {
            g.set_source(Source::Truth);
            true
        }
        (KEY_EVALUATION, v) => match v {
            "tp" => Some(Evaluation::TruePositive),
            "fp" => Some(Evaluation::FalsePositive),
            "fa" => Some(Evaluation::FalseAlarm),
            _ => None,
        }
        .map(|e| g.set_evaluation(e))
        .is_some(),
        (KEY_OCCLUSION, v) => match v {
            "medium" => Some(Occlusion::Medium),
            "heavy" => Some(Occlusion::Heavy),
            _ => None,
        }
        .map(|o| g.set_occlusion(o))
        .is_some(),
        (KEY_KEYFRAME, v) => match v {
            "1" => Some(Keyframe::Yes),
            "0" => Some(Keyframe::No),
            _ => None,
        }
        .map(|k| g.set_keyframe(k))
        .is_some(),
        (KEY_SOURCE, _) => false,
        _ => {
            tracing::debug!("geom record: ignoring key '{}'", kv.key);
            return;
        }
    };
    if !known {
        tracing::warn!("geom record: unsupported {} value '{}'", kv.key, kv.val);
    }
}
