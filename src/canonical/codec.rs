//! 规范记录 ⇄ 方言语法树
//!
//! 关键字拼写是固定的外部约定: `id0`, `ts1`, `tsr0`, `g0`, `poly0`,
//! `conf17`, `cset3`, `act2`, `timespan`, `actors`, `meta`。

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::dialect::Node;
use super::{
    ActivityPacket, Actor, BBox, CSet, CanonicalRecord, Kv, Packet, PacketStyle, Poly, Schema,
    Scoped, TimestampRange, TsValue,
};
use crate::error::{KpfError, Result};

/// `<style><domain>` 形式的关键字, 如 `id1`、`tsr0`、`cset17`
static DOMAIN_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(id|tsr|ts|g|poly|conf|cset|act)([0-9]+)$").unwrap());

const TIMESPAN_KEY: &str = "timespan";
const ACTORS_KEY: &str = "actors";

fn split_key(key: &str) -> Option<(PacketStyle, u32)> {
    let caps = DOMAIN_KEY.captures(key)?;
    let style = PacketStyle::from_token(caps.get(1)?.as_str())?;
    let domain = caps.get(2)?.as_str().parse().ok()?;
    Some((style, domain))
}

fn domain_key(style: PacketStyle, domain: u32) -> String {
    format!("{}{}", style.token(), domain)
}

// ========== 数值格式 ==========

/// 最短可往返的十进制表示 (104.0 → "104", 0.1 → "0.1")
pub fn format_f64(v: f64) -> String {
    format!("{}", v)
}

fn parse_f64(text: &str, what: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| KpfError::malformed(format!("{} is not a number: '{}'", what, text)))
}

fn parse_u64(text: &str, what: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|_| {
            KpfError::malformed(format!("{} is not an unsigned integer: '{}'", what, text))
        })
}

/// 整数按 `u64` 原样保存, 避免大帧号经过 `f64` 丢失精度
fn parse_ts(text: &str, what: &str) -> Result<TsValue> {
    match text.trim().parse::<u64>() {
        Ok(n) => Ok(TsValue::Int(n)),
        Err(_) => parse_f64(text, what).map(TsValue::Real),
    }
}

fn format_ts(v: TsValue) -> String {
    match v {
        TsValue::Int(n) => n.to_string(),
        TsValue::Real(t) => format_f64(t),
    }
}

fn expect_scalar<'a>(node: &'a Node, what: &str) -> Result<&'a str> {
    node.as_scalar().ok_or_else(|| {
        KpfError::malformed(format!("{} must be a scalar, found {}", what, node.kind()))
    })
}

// ========== 解码 ==========

/// 把一行的 (schema 关键字, 主体) 解码为规范记录
pub fn decode(schema: &str, body: &Node) -> Result<CanonicalRecord> {
    let schema = Schema::from_token(schema)
        .ok_or_else(|| KpfError::malformed(format!("unknown schema '{}'", schema)))?;
    let mut rec = CanonicalRecord::new(schema);

    match schema {
        Schema::Meta => {
            let msg = expect_scalar(body, "meta")?;
            rec.push(Packet::Meta(msg.to_string()));
        }
        Schema::Geom | Schema::Types => {
            for (key, value) in map_entries(body, schema.token())? {
                if let Some(packet) = decode_packet(key, value)? {
                    rec.push(packet);
                }
            }
        }
        Schema::Act => rec.push(Packet::Act(decode_activity(body)?)),
    }
    Ok(rec)
}

fn map_entries<'a>(node: &'a Node, what: &str) -> Result<&'a [(String, Node)]> {
    match node {
        Node::Map(entries) => Ok(entries),
        other => Err(KpfError::malformed(format!(
            "{} body must be a map, found {}",
            what,
            other.kind()
        ))),
    }
}

/// 单个数据包; 无法识别的结构化条目返回 `None`
fn decode_packet(key: &str, value: &Node) -> Result<Option<Packet>> {
    let Some((style, domain)) = split_key(key) else {
        return Ok(match value {
            Node::Scalar(v) => Some(Packet::Kv(Kv::new(key, v.clone()))),
            _ => {
                tracing::debug!("skipping unrecognized entry '{}'", key);
                None
            }
        });
    };

    let packet = match style {
        PacketStyle::Id => {
            Packet::Id(Scoped::new(domain, parse_u64(expect_scalar(value, key)?, key)?))
        }
        PacketStyle::Ts => {
            Packet::Ts(Scoped::new(domain, parse_ts(expect_scalar(value, key)?, key)?))
        }
        PacketStyle::Tsr => Packet::Tsr(Scoped::new(domain, decode_range(value, key)?)),
        PacketStyle::Geom => Packet::Geom(Scoped::new(domain, decode_bbox(value, key)?)),
        PacketStyle::Poly => Packet::Poly(Scoped::new(domain, decode_poly(value, key)?)),
        PacketStyle::Conf => {
            Packet::Conf(Scoped::new(domain, parse_f64(expect_scalar(value, key)?, key)?))
        }
        PacketStyle::CSet => Packet::CSet(Scoped::new(domain, decode_cset(value, key)?)),
        PacketStyle::Act | PacketStyle::Kv | PacketStyle::Meta => {
            return Err(KpfError::malformed(format!("'{}' is not allowed here", key)))
        }
    };
    Ok(Some(packet))
}

fn decode_bbox(value: &Node, key: &str) -> Result<BBox> {
    let text = expect_scalar(value, key)?;
    let coords = text
        .split_whitespace()
        .map(|c| parse_f64(c, key))
        .collect::<Result<Vec<_>>>()?;
    match coords[..] {
        [x1, y1, x2, y2] => Ok(BBox { x1, y1, x2, y2 }),
        _ => Err(KpfError::malformed(format!(
            "{} needs 4 coordinates, got {}",
            key,
            coords.len()
        ))),
    }
}

fn decode_poly(value: &Node, key: &str) -> Result<Poly> {
    let Node::Seq(points) = value else {
        return Err(KpfError::malformed(format!("{} must be a sequence of points", key)));
    };
    let mut poly = Poly::default();
    for (i, point) in points.iter().enumerate() {
        let coords = match point {
            Node::Seq(xy) => xy,
            other => {
                return Err(KpfError::malformed(format!(
                    "{} point {} must be a sequence, found {}",
                    key,
                    i,
                    other.kind()
                )))
            }
        };
        if coords.len() != 2 {
            return Err(KpfError::malformed(format!(
                "{} point {} has {} coordinates, expected x and y",
                key,
                i,
                coords.len()
            )));
        }
        let x = parse_f64(expect_scalar(&coords[0], key)?, key)?;
        let y = parse_f64(expect_scalar(&coords[1], key)?, key)?;
        poly.xy.push((x, y));
    }
    Ok(poly)
}

fn decode_range(value: &Node, key: &str) -> Result<TimestampRange> {
    let Node::Seq(items) = value else {
        return Err(KpfError::malformed(format!("{} must be [start, stop]", key)));
    };
    if items.len() != 2 {
        return Err(KpfError::malformed(format!(
            "{} needs start and stop, got {} values",
            key,
            items.len()
        )));
    }
    Ok(TimestampRange {
        start: parse_f64(expect_scalar(&items[0], key)?, key)?,
        stop: parse_f64(expect_scalar(&items[1], key)?, key)?,
    })
}

fn decode_cset(value: &Node, key: &str) -> Result<CSet> {
    let mut cset = CSet::default();
    for (name, conf) in map_entries(value, key)? {
        let conf = parse_f64(expect_scalar(conf, name)?, name)?;
        cset.d.insert(name.clone(), conf);
    }
    Ok(cset)
}

/// `timespan: [ { tsr0: [a, b] }, ... ]`
fn decode_timespan(value: &Node) -> Result<Vec<Scoped<TimestampRange>>> {
    let Node::Seq(items) = value else {
        return Err(KpfError::malformed("timespan must be a sequence"));
    };
    let mut spans = Vec::with_capacity(items.len());
    for item in items {
        for (key, range) in map_entries(item, TIMESPAN_KEY)? {
            match split_key(key) {
                Some((PacketStyle::Tsr, domain)) => {
                    spans.push(Scoped::new(domain, decode_range(range, key)?))
                }
                _ => {
                    return Err(KpfError::malformed(format!(
                        "timespan entry '{}' is not a timestamp range",
                        key
                    )))
                }
            }
        }
    }
    Ok(spans)
}

fn decode_activity(body: &Node) -> Result<ActivityPacket> {
    let mut labels = None;
    let mut id = None;
    let mut timespan = Vec::new();
    let mut actors = Vec::new();
    let mut attributes = Vec::new();

    for (key, value) in map_entries(body, "act")? {
        match split_key(key) {
            Some((PacketStyle::Act, domain)) => {
                labels = Some(Scoped::new(domain, decode_cset(value, key)?));
            }
            Some((PacketStyle::Id, domain)) => {
                id = Some(Scoped::new(domain, parse_u64(expect_scalar(value, key)?, key)?));
            }
            _ if key == TIMESPAN_KEY => timespan = decode_timespan(value)?,
            _ if key == ACTORS_KEY => actors = decode_actors(value)?,
            _ => match value {
                Node::Scalar(v) => attributes.push(Kv::new(key.clone(), v.clone())),
                _ => tracing::debug!("skipping unrecognized activity entry '{}'", key),
            },
        }
    }

    Ok(ActivityPacket {
        labels: labels.ok_or_else(|| KpfError::malformed("act record has no activity labels"))?,
        id: id.ok_or_else(|| KpfError::malformed("act record has no activity id"))?,
        timespan,
        actors,
        attributes,
    })
}

fn decode_actors(value: &Node) -> Result<Vec<Actor>> {
    let Node::Seq(items) = value else {
        return Err(KpfError::malformed("actors must be a sequence"));
    };
    let mut actors = Vec::with_capacity(items.len());
    for item in items {
        let mut id = None;
        let mut timespan = Vec::new();
        for (key, v) in map_entries(item, ACTORS_KEY)? {
            match split_key(key) {
                Some((PacketStyle::Id, domain)) => {
                    id = Some(Scoped::new(domain, parse_u64(expect_scalar(v, key)?, key)?))
                }
                _ if key == TIMESPAN_KEY => timespan = decode_timespan(v)?,
                _ => tracing::debug!("skipping unrecognized actor entry '{}'", key),
            }
        }
        let id = id.ok_or_else(|| KpfError::malformed("actor has no id"))?;
        actors.push(Actor { id, timespan });
    }
    Ok(actors)
}

// ========== 编码 ==========

/// 把规范记录编码为 (schema 关键字, 主体)
pub fn encode(rec: &CanonicalRecord) -> (&'static str, Node) {
    let body = match rec.schema {
        Schema::Meta => {
            let msg = rec
                .packets
                .iter()
                .find_map(|p| match p {
                    Packet::Meta(m) => Some(m.as_str()),
                    _ => None,
                })
                .unwrap_or_default();
            Node::scalar(msg)
        }
        _ => Node::Map(rec.packets.iter().flat_map(encode_packet).collect()),
    };
    (rec.schema.token(), body)
}

fn encode_packet(packet: &Packet) -> Vec<(String, Node)> {
    match packet {
        Packet::Id(s) => vec![(
            domain_key(PacketStyle::Id, s.domain),
            Node::scalar(s.t.to_string()),
        )],
        Packet::Ts(s) => vec![(
            domain_key(PacketStyle::Ts, s.domain),
            Node::scalar(format_ts(s.t)),
        )],
        Packet::Tsr(s) => vec![(domain_key(PacketStyle::Tsr, s.domain), encode_range(&s.t))],
        Packet::Geom(s) => {
            let b = &s.t;
            let text = [b.x1, b.y1, b.x2, b.y2]
                .iter()
                .map(|v| format_f64(*v))
                .collect::<Vec<_>>()
                .join(" ");
            vec![(domain_key(PacketStyle::Geom, s.domain), Node::scalar(text))]
        }
        Packet::Poly(s) => {
            let points = s
                .t
                .xy
                .iter()
                .map(|(x, y)| {
                    Node::Seq(vec![Node::scalar(format_f64(*x)), Node::scalar(format_f64(*y))])
                })
                .collect();
            vec![(domain_key(PacketStyle::Poly, s.domain), Node::Seq(points))]
        }
        Packet::Conf(s) => vec![(
            domain_key(PacketStyle::Conf, s.domain),
            Node::scalar(format_f64(s.t)),
        )],
        Packet::CSet(s) => vec![(domain_key(PacketStyle::CSet, s.domain), encode_cset(&s.t.d))],
        Packet::Kv(kv) => vec![(kv.key.clone(), Node::scalar(kv.val.clone()))],
        Packet::Act(a) => encode_activity(a),
        Packet::Meta(m) => vec![("meta".to_string(), Node::scalar(m.clone()))],
    }
}

fn encode_range(r: &TimestampRange) -> Node {
    Node::Seq(vec![Node::scalar(format_f64(r.start)), Node::scalar(format_f64(r.stop))])
}

fn encode_cset(d: &BTreeMap<String, f64>) -> Node {
    Node::Map(
        d.iter()
            .map(|(name, conf)| (name.clone(), Node::scalar(format_f64(*conf))))
            .collect(),
    )
}

fn encode_timespan(spans: &[Scoped<TimestampRange>]) -> Node {
    Node::Seq(
        spans
            .iter()
            .map(|s| Node::Map(vec![(domain_key(PacketStyle::Tsr, s.domain), encode_range(&s.t))]))
            .collect(),
    )
}

fn encode_activity(a: &ActivityPacket) -> Vec<(String, Node)> {
    let mut entries = vec![
        (domain_key(PacketStyle::Act, a.labels.domain), encode_cset(&a.labels.t.d)),
        (domain_key(PacketStyle::Id, a.id.domain), Node::scalar(a.id.t.to_string())),
        (TIMESPAN_KEY.to_string(), encode_timespan(&a.timespan)),
    ];
    entries.extend(a.attributes.iter().map(|kv| (kv.key.clone(), Node::scalar(kv.val.clone()))));
    let actors = a
        .actors
        .iter()
        .map(|actor| {
            Node::Map(vec![
                (
                    domain_key(PacketStyle::Id, actor.id.domain),
                    Node::scalar(actor.id.t.to_string()),
                ),
                (TIMESPAN_KEY.to_string(), encode_timespan(&actor.timespan)),
            ])
        })
        .collect();
    entries.push((ACTORS_KEY.to_string(), Node::Seq(actors)));
    entries
}
