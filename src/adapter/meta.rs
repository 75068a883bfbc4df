use crate::canonical::{CanonicalRecord, Packet, Schema};
use crate::error::{KpfError, Result, UnsupportedDomain};
use crate::records::Meta;

pub fn to_canonical(m: &Meta) -> CanonicalRecord {
    let mut rec = CanonicalRecord::new(Schema::Meta);
    rec.push(Packet::Meta(m.get_msg().to_string()));
    rec
}

pub fn from_canonical(
    rec: &CanonicalRecord,
    _skipped: &mut Vec<UnsupportedDomain>,
) -> Result<Meta> {
    if rec.schema != Schema::Meta {
        return Err(KpfError::malformed(format!("expected meta record, got {}", rec.schema)));
    }
    let mut m = Meta::default();
    for packet in &rec.packets {
        if let Packet::Meta(msg) = packet {
            m.set_msg(msg.clone());
        }
    }
    Ok(m)
}
