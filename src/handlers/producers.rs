//! Ready-made body producers.

use super::BodyProducer;
use crate::error::S3Error;
use crate::types::CompletedPart;
use crate::xml::build_complete_multipart_xml;
use bytes::Bytes;

/// Streams an in-memory body.
#[derive(Debug, Clone)]
pub struct BytesProducer {
    data: Bytes,
    offset: usize,
}

impl BytesProducer {
    /// Produce `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            offset: 0,
        }
    }

    /// Total body size.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet produced.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

impl BodyProducer for BytesProducer {
    fn produce(&mut self, buf: &mut [u8]) -> Result<usize, S3Error> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }

    fn take_bytes(&mut self) -> Option<Bytes> {
        let rest = self.data.slice(self.offset..);
        self.offset = self.data.len();
        Some(rest)
    }
}

/// Produces a `CompleteMultipartUpload` manifest.
#[derive(Debug, Clone)]
pub struct ManifestProducer {
    inner: BytesProducer,
}

impl ManifestProducer {
    /// Manifest listing `parts` in ascending part-number order.
    pub fn new(parts: &[CompletedPart]) -> Self {
        let mut sorted = parts.to_vec();
        sorted.sort_by_key(|p| p.part_number);
        Self {
            inner: BytesProducer::new(build_complete_multipart_xml(&sorted)),
        }
    }

    /// Manifest size, the content length of the commit request.
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    /// Always false; a manifest has at least its root element.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl BodyProducer for ManifestProducer {
    fn produce(&mut self, buf: &mut [u8]) -> Result<usize, S3Error> {
        self.inner.produce(buf)
    }

    fn take_bytes(&mut self) -> Option<Bytes> {
        self.inner.take_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_producer_in_slices() {
        let mut producer = BytesProducer::new(&b"hello world"[..]);
        let mut buf = [0u8; 4];
        let mut out = Vec::new();
        loop {
            let n = producer.produce(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"hello world");
        assert_eq!(producer.remaining(), 0);
    }

    #[test]
    fn test_manifest_is_sorted() {
        let producer = ManifestProducer::new(&[
            CompletedPart::new(2, "\"b\""),
            CompletedPart::new(1, "\"a\""),
        ]);
        let mut inner = producer.inner.clone();
        let mut buf = vec![0u8; producer.len() as usize];
        let n = inner.produce(&mut buf).unwrap();
        let xml = String::from_utf8(buf[..n].to_vec()).unwrap();
        let first = xml.find("<PartNumber>1</PartNumber>").unwrap();
        let second = xml.find("<PartNumber>2</PartNumber>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_take_bytes_hands_over_the_rest() {
        let data = Bytes::from_static(b"hello world");
        let mut producer = BytesProducer::new(data.clone());
        let mut buf = [0u8; 6];
        assert_eq!(producer.produce(&mut buf).unwrap(), 6);

        let rest = producer.take_bytes().unwrap();
        assert_eq!(&rest[..], b"world");
        assert_eq!(rest.as_ptr(), data[6..].as_ptr());
        assert_eq!(producer.remaining(), 0);
        assert!(producer.take_bytes().unwrap().is_empty());
    }
}
