//! Bounded accumulator for one response field.

use crate::error::{ConfigurationError, ResourceError, S3Error};

/// Capacity used for every watched field unless configured otherwise.
pub const DEFAULT_FIELD_CAPACITY: usize = 128;

/// Fixed-capacity text buffer that concatenates the fragments of one field.
///
/// A buffer of capacity `n` stores at most `n - 1` bytes, the last slot being
/// reserved the way a terminated text buffer would reserve it. Anything past
/// that is dropped and the buffer is marked truncated. The mark is sticky:
/// once a fragment did not fit, the buffer stays truncated.
#[derive(Debug, Clone)]
pub struct FieldBuffer {
    value: String,
    capacity: usize,
    truncated: bool,
}

impl FieldBuffer {
    /// Allocate a buffer for `capacity` bytes up front.
    ///
    /// Fails with a configuration error for a zero capacity and with
    /// [`ResourceError::OutOfMemory`] when the reservation cannot be made.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, S3Error> {
        if capacity == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "field_capacity".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        let mut value = String::new();
        value
            .try_reserve_exact(capacity - 1)
            .map_err(|_| ResourceError::OutOfMemory {
                requested: capacity,
                purpose: "response field buffer",
            })?;

        Ok(Self {
            value,
            capacity,
            truncated: false,
        })
    }

    /// Append a fragment, returning whether all of it fit.
    pub fn append(&mut self, fragment: &str) -> bool {
        let room = self.max_len() - self.value.len();
        if fragment.len() <= room {
            self.value.push_str(fragment);
            return true;
        }

        let mut cut = room;
        while !fragment.is_char_boundary(cut) {
            cut -= 1;
        }
        self.value.push_str(&fragment[..cut]);
        self.truncated = true;
        false
    }

    /// Accumulated text.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Accumulated length in bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether any fragment was cut short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest value the buffer keeps.
    pub fn max_len(&self) -> usize {
        self.capacity - 1
    }

    /// Consume the buffer, returning the value and its truncation flag.
    pub fn into_parts(self) -> (String, bool) {
        (self.value, self.truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_concatenate() {
        let mut field = FieldBuffer::try_with_capacity(DEFAULT_FIELD_CAPACITY).unwrap();
        assert!(field.append("AB"));
        assert!(field.append("C1"));
        assert!(field.append("23"));
        assert_eq!(field.as_str(), "ABC123");
        assert!(!field.is_truncated());
    }

    #[test]
    fn test_capacity_boundary() {
        let mut exact = FieldBuffer::try_with_capacity(128).unwrap();
        assert!(exact.append(&"a".repeat(127)));
        assert_eq!(exact.len(), 127);
        assert!(!exact.is_truncated());

        let mut over = FieldBuffer::try_with_capacity(128).unwrap();
        assert!(!over.append(&"a".repeat(128)));
        assert_eq!(over.len(), 127);
        assert!(over.is_truncated());
    }

    #[test]
    fn test_truncation_across_fragments_is_sticky() {
        let mut field = FieldBuffer::try_with_capacity(5).unwrap();
        assert!(field.append("ab"));
        assert!(!field.append("cdef"));
        assert_eq!(field.as_str(), "abcd");
        assert!(!field.append(""));
        assert!(field.is_truncated());
        assert_eq!(field.into_parts(), ("abcd".to_string(), true));
    }

    #[test]
    fn test_truncation_keeps_whole_characters() {
        let mut field = FieldBuffer::try_with_capacity(4).unwrap();
        // 'é' is two bytes; only one byte of room is left after "ab".
        assert!(!field.append("abé"));
        assert_eq!(field.as_str(), "ab");
        assert!(field.is_truncated());
    }

    #[test]
    fn test_capacity_one_keeps_nothing() {
        let mut field = FieldBuffer::try_with_capacity(1).unwrap();
        assert!(field.append(""));
        assert!(!field.append("x"));
        assert!(field.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = FieldBuffer::try_with_capacity(0).unwrap_err();
        assert!(matches!(err, S3Error::Configuration(_)));
    }

    #[test]
    fn test_impossible_reservation_is_out_of_memory() {
        let err = FieldBuffer::try_with_capacity(usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            S3Error::Resource(ResourceError::OutOfMemory { .. })
        ));
    }
}
