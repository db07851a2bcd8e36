//! Big-endian primitive streams.
//!
//! Strings are `[u32 byte length][UTF-8]`, UUIDs are their 16 raw bytes,
//! timestamps are `i64` milliseconds since the Unix epoch (UTC).

use std::io::{self, Read, Write};

use chrono::{DateTime, Utc};
use modgraph_types::EntityId;
use uuid::Uuid;

use super::LoadError;

/// Strings longer than this are treated as corruption.
const MAX_STRING_LEN: usize = 64 * 1024 * 1024;

pub struct StreamWriter<W: Write> {
    inner: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, v: u8) -> io::Result<()> {
        self.inner.write_all(&[v])
    }

    pub fn write_u32(&mut self, v: u32) -> io::Result<()> {
        self.inner.write_all(&v.to_be_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> io::Result<()> {
        self.inner.write_all(&v.to_be_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> io::Result<()> {
        self.inner.write_all(&v.to_be_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> io::Result<()> {
        self.inner.write_all(&v.to_be_bytes())
    }

    pub fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.write_u8(v as u8)
    }

    /// Collection length prefix.
    pub fn write_len(&mut self, len: usize) -> io::Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "collection too large"))?;
        self.write_u32(len)
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_len(s.len())?;
        self.inner.write_all(s.as_bytes())
    }

    pub fn write_uuid(&mut self, id: Uuid) -> io::Result<()> {
        self.inner.write_all(id.as_bytes())
    }

    pub fn write_id(&mut self, id: EntityId) -> io::Result<()> {
        self.write_uuid(id.uuid())
    }

    /// `None` is written as the nil UUID.
    pub fn write_opt_id(&mut self, id: Option<EntityId>) -> io::Result<()> {
        self.write_uuid(id.map(EntityId::uuid).unwrap_or_else(Uuid::nil))
    }

    pub fn write_datetime(&mut self, t: &DateTime<Utc>) -> io::Result<()> {
        self.write_i64(t.timestamp_millis())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct StreamReader<R: Read> {
    inner: R,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(truncated)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, LoadError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, LoadError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, LoadError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, LoadError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, LoadError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LoadError::Corrupt(format!("invalid bool byte {}", other))),
        }
    }

    pub fn read_len(&mut self) -> Result<usize, LoadError> {
        Ok(self.read_u32()? as usize)
    }

    pub fn read_str(&mut self) -> Result<String, LoadError> {
        let len = self.read_len()?;
        if len > MAX_STRING_LEN {
            return Err(LoadError::Corrupt(format!("string too long: {} bytes", len)));
        }
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(truncated)?;
        String::from_utf8(buf).map_err(|e| LoadError::Corrupt(format!("invalid UTF-8: {}", e)))
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, LoadError> {
        Ok(Uuid::from_bytes(self.read_array()?))
    }

    pub fn read_id(&mut self) -> Result<EntityId, LoadError> {
        let id = self.read_uuid()?;
        if id.is_nil() {
            return Err(LoadError::Corrupt("nil entity id".to_string()));
        }
        Ok(EntityId::from_uuid(id))
    }

    /// The nil UUID reads as `None`.
    pub fn read_opt_id(&mut self) -> Result<Option<EntityId>, LoadError> {
        let id = self.read_uuid()?;
        Ok((!id.is_nil()).then(|| EntityId::from_uuid(id)))
    }

    pub fn read_datetime(&mut self) -> Result<DateTime<Utc>, LoadError> {
        let millis = self.read_i64()?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| LoadError::Corrupt(format!("timestamp out of range: {}", millis)))
    }
}

fn truncated(e: io::Error) -> LoadError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        LoadError::Corrupt("unexpected end of stream".to_string())
    } else {
        LoadError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn integers_are_big_endian() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_u32(0xA1B2C3D4).unwrap();
        w.write_i32(-2).unwrap();
        assert_eq!(
            w.into_inner(),
            vec![0xA1, 0xB2, 0xC3, 0xD4, 0xFF, 0xFF, 0xFF, 0xFE]
        );
    }

    #[test]
    fn strings_and_ids() {
        let id = EntityId::generate();
        let mut w = StreamWriter::new(Vec::new());
        w.write_str("Lead Synth").unwrap();
        w.write_opt_id(None).unwrap();
        w.write_opt_id(Some(id)).unwrap();
        w.write_f32(0.25).unwrap();

        let mut r = StreamReader::new(Cursor::new(w.into_inner()));
        assert_eq!(r.read_str().unwrap(), "Lead Synth");
        assert_eq!(r.read_opt_id().unwrap(), None);
        assert_eq!(r.read_opt_id().unwrap(), Some(id));
        assert_eq!(r.read_f32().unwrap(), 0.25);
    }

    #[test]
    fn truncated_input_is_corrupt() {
        let mut r = StreamReader::new(Cursor::new(vec![0u8, 0, 0, 9, b'a']));
        assert!(matches!(r.read_str(), Err(LoadError::Corrupt(_))));
    }

    #[test]
    fn invalid_bool_is_corrupt() {
        let mut r = StreamReader::new(Cursor::new(vec![7u8]));
        assert!(matches!(r.read_bool(), Err(LoadError::Corrupt(_))));
    }
}
