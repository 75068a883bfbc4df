// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use super::KpfRecord;
use crate::adapter;
use crate::canonical::{CanonicalRecord, Schema};
use crate::error::{KpfError, Result, UnsupportedDomain};

/// 注释记录 (`- { meta: ... }`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Meta {
    msg: String,
}

impl Meta {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    pub fn has_msg(&self) -> bool {
        !self.msg.is_empty()
    }

    pub fn get_msg(&self) -> &str {
        &self.msg
    }

    pub fn set_msg(&mut self, msg: impl Into<String>) {
        self.msg = msg.into();
    }

    pub fn remove_msg(&mut self) {
        self.msg.clear();
    }
}

impl KpfRecord for Meta {
    const SCHEMA: Schema = Schema::Meta;

    fn validate(&self) -> Result<()> {
        if !self.has_msg() {
            return Err(KpfError::invalid("meta", "message is empty"));
        }
        Ok(())
    }

    fn to_canonical(&self) -> CanonicalRecord {
        adapter::meta::to_canonical(self)
    }

    fn from_canonical(rec: &CanonicalRecord, skipped: &mut Vec<UnsupportedDomain>) -> Result<Self> {
        adapter::meta::from_canonical(rec, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_presence() {
        let mut m = Meta::default();
        assert!(!m.has_msg());
        assert!(!m.is_valid());

        m.set_msg("eof");
        assert!(m.has_msg());
        assert_eq!(m.get_msg(), "eof");

        m.remove_msg();
        assert!(!m.has_msg());
    }

    #[test]
    fn test_meta_write_and_read() {
        let m = Meta::new("1 tracks; 50 detection");
        let line = m.to_kpf_string().unwrap();
        assert_eq!(line, "- { meta: 1 tracks; 50 detection }\n");
        assert_eq!(Meta::from_kpf_str(&line).unwrap(), m);
    }

    #[test]
    fn test_empty_meta_is_not_written() {
        let mut buf = Vec::new();
        let err = Meta::default().write(&mut buf).unwrap_err();
        assert!(err.is_invalid());
        assert!(buf.is_empty());
    }
}
