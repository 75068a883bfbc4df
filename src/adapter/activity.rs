//! Activity ⇄ 规范记录
//!
//! 活动记录的主体是一个 `act` 数据包: 标签 `act2`, ID `id2`,
//! 整体区间 `timespan`, 参与者 `actors` (每个参与者 `id2` + 自己的 `timespan`)。
//! 三个时间域的区间都写出, 读入时按域分桶。

use std::collections::BTreeSet;

use super::skip_domain;
use crate::canonical::{
    ActivityPacket, Actor, CSet, CanonicalRecord, Kv, Packet, PacketStyle, Schema, Scoped,
    TimestampRange,
};
use crate::domain::{IdDomain, TimestampDomain, ACTIVITY_DOMAIN, ACTOR_ID_DOMAIN};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::records::activity::Source;
use crate::records::{Activity, Span};

const SCHEMA: &str = "act";
const KEY_SOURCE: &str = "src";

fn scoped_range(domain: TimestampDomain, (start, stop): Span) -> Scoped<TimestampRange> {
    Scoped::new(domain.domain(), TimestampRange { start, stop })
}

// ========== 写方向 ==========

pub fn to_canonical(a: &Activity) -> CanonicalRecord {
    let mut timespan = Vec::new();
    for domain in TimestampDomain::ALL {
        timespan.extend(a.spans(domain).iter().map(|s| scoped_range(domain, *s)));
    }

    // 三个域的参与者合并, 每个参与者一项, 按ID排序
    let actor_ids: BTreeSet<u64> = TimestampDomain::ALL
        .iter()
        .flat_map(|d| a.actor_spans(*d).keys().copied())
        .collect();
    let actors = actor_ids
        .into_iter()
        .map(|actor| {
            let mut spans = Vec::new();
            for domain in TimestampDomain::ALL {
                if let Some(list) = a.actor_spans(domain).get(&actor) {
                    spans.extend(list.iter().map(|s| scoped_range(domain, *s)));
                }
            }
            Actor {
                id: Scoped::new(ACTOR_ID_DOMAIN, actor),
                timespan: spans,
            }
        })
        .collect();

    let mut attributes = Vec::new();
    if let Some(Source::Truth) = a.get_source() {
        attributes.push(Kv::new(KEY_SOURCE, "truth"));
    }

    let packet = ActivityPacket {
        labels: Scoped::new(ACTIVITY_DOMAIN, CSet { d: a.get_activity_names().clone() }),
        id: Scoped::new(IdDomain::Activity.domain(), a.get_activity_id()),
        timespan,
        actors,
        attributes,
    };
    let mut rec = CanonicalRecord::new(Schema::Act);
    rec.push(Packet::Act(packet));
    rec
}

// ========== 读方向 ==========

pub fn from_canonical(
    rec: &CanonicalRecord,
    skipped: &mut Vec<UnsupportedDomain>,
) -> Result<Activity> {
    if rec.schema != Schema::Act {
        return Err(KpfError::malformed(format!("expected act record, got {}", rec.schema)));
    }
    let packet = rec
        .packets
        .iter()
        .find_map(|p| match p {
            Packet::Act(a) => Some(a),
            _ => None,
        })
        .ok_or_else(|| KpfError::malformed("act record has no activity packet"))?;

    if packet.id.domain != IdDomain::Activity.domain() {
        return Err(KpfError::malformed(format!(
            "activity id domain must be {}, got {}",
            IdDomain::Activity.domain(),
            packet.id.domain
        )));
    }
    // 参与者ID域错误同样使整条记录作废, 先检查再填充
    if let Some(actor) = packet.actors.iter().find(|a| a.id.domain != ACTOR_ID_DOMAIN) {
        return Err(KpfError::malformed(format!(
            "activity actor id domain must be {}, got {}",
            ACTOR_ID_DOMAIN, actor.id.domain
        )));
    }

    let mut a = Activity::new();
    a.set_activity_id(packet.id.t);
    if packet.labels.domain == ACTIVITY_DOMAIN {
        a.set_activity_names(packet.labels.t.d.clone());
    } else {
        skip_domain(skipped, SCHEMA, PacketStyle::Act, packet.labels.domain);
    }

    for ts in &packet.timespan {
        match TimestampDomain::from_domain(ts.domain) {
            Some(domain) => a.add_span(domain, (ts.t.start, ts.t.stop)),
            None => skip_domain(skipped, SCHEMA, PacketStyle::Tsr, ts.domain),
        }
    }

    for actor in &packet.actors {
        for ts in &actor.timespan {
            match TimestampDomain::from_domain(ts.domain) {
                Some(domain) => a.add_actor_span(domain, actor.id.t, (ts.t.start, ts.t.stop)),
                None => skip_domain(skipped, SCHEMA, PacketStyle::Tsr, ts.domain),
            }
        }
    }

    for kv in &packet.attributes {
        match (kv.key.as_str(), kv.val.as_str()) {
            (KEY_SOURCE, "truth") => a.set_source(Source::Truth),
            (KEY_SOURCE, v) => tracing::warn!("act record: unsupported src value '{}'", v),
            (k, _) => tracing::debug!("act record: ignoring key '{}'", k),
        }
    }
    Ok(a)
}
