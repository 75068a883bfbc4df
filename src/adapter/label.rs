//! Label ⇄ 规范记录: `id1` + `cset3`

use super::skip_domain;
use crate::canonical::{CSet, CanonicalRecord, Packet, Schema, Scoped};
use crate::domain::{IdDomain, TYPES_DOMAIN};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::records::Label;

const SCHEMA: &str = "types";

pub fn to_canonical(l: &Label) -> CanonicalRecord {
    let mut rec = CanonicalRecord::new(Schema::Types);
    if l.has_track_id() {
        rec.push(Packet::Id(Scoped::new(IdDomain::Track.domain(), l.get_track_id())));
    }
    if l.has_classification() {
        rec.push(Packet::CSet(Scoped::new(
            TYPES_DOMAIN,
            CSet { d: l.get_classification().clone() },
        )));
    }
    rec
}

pub fn from_canonical(
    rec: &CanonicalRecord,
    skipped: &mut Vec<UnsupportedDomain>,
) -> Result<Label> {
    if rec.schema != Schema::Types {
        return Err(KpfError::malformed(format!("expected types record, got {}", rec.schema)));
    }
    let mut l = Label::new();
    for packet in &rec.packets {
        match packet {
            Packet::Id(id) if id.domain == IdDomain::Track.domain() => l.set_track_id(id.t),
            Packet::Id(id) => {
                return Err(KpfError::malformed(format!(
                    "types id domain must be {} (track), got {}",
                    IdDomain::Track.domain(),
                    id.domain
                )))
            }
            Packet::CSet(c) if c.domain == TYPES_DOMAIN => {
                l.get_classification_mut().extend(c.t.d.clone());
            }
            Packet::Kv(kv) => tracing::debug!("types record: ignoring key '{}'", kv.key),
            other => {
                let h = other.header();
                if let Some(d) = h.domain {
                    skip_domain(skipped, SCHEMA, h.style, d);
                }
            }
        }
    }
    Ok(l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::PacketStyle;

    #[test]
    fn test_track_id_domain_mismatch() {
        let mut rec = CanonicalRecord::new(Schema::Types);
        rec.push(Packet::Id(Scoped::new(0, 66)));
        assert!(from_canonical(&rec, &mut Vec::new()).unwrap_err().is_malformed());
    }

    #[test]
    fn test_other_cset_domain_is_skipped() {
        let mut rec = CanonicalRecord::new(Schema::Types);
        rec.push(Packet::Id(Scoped::new(1, 66)));
        rec.push(Packet::CSet(Scoped::new(17, CSet::default())));
        let mut skipped = Vec::new();
        let l = from_canonical(&rec, &mut skipped).unwrap();
        assert_eq!(l.get_track_id(), 66);
        assert!(!l.has_classification());
        assert_eq!(skipped[0].style, PacketStyle::CSet);
    }
}
