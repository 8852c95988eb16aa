//! # object: validated remote object descriptors
//!
//! A [`ObjectDescriptor`] names a single remote object: its key within the
//! bucket, the bucket it lives in, and the CRC32C checksum the storage
//! service reports for its content. Descriptors are constructed through
//! [`ObjectDescriptor::new`], which rejects values that can never identify
//! a real object, so every descriptor that flows through the pipeline is
//! known-good.

use thiserror::Error;

/// Construction-time validation failures for [`ObjectDescriptor`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The object name was empty.
    #[error("object name must not be empty")]
    EmptyName,
    /// The bucket name was empty.
    #[error("bucket name must not be empty")]
    EmptyBucket,
    /// The checksum was zero, which the storage service never reports for
    /// real content and therefore marks an unset or corrupt attribute.
    #[error("object checksum must not be zero")]
    InvalidChecksum,
}

/// Immutable description of a single remote object.
///
/// The name may contain `/` separators; it is interpreted as a relative
/// path below the mirror's destination directory when materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    name: String,
    bucket: String,
    crc32c: u32,
}

impl ObjectDescriptor {
    /// Validate and construct a descriptor.
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        crc32c: u32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let bucket = bucket.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if bucket.is_empty() {
            return Err(ValidationError::EmptyBucket);
        }
        if crc32c == 0 {
            return Err(ValidationError::InvalidChecksum);
        }
        Ok(Self {
            name,
            bucket,
            crc32c,
        })
    }

    /// Object key within the bucket.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bucket the object belongs to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// CRC32C (Castagnoli) checksum of the object content as reported by
    /// the storage service.
    pub fn crc32c(&self) -> u32 {
        self.crc32c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_valid_descriptor() {
        let object = ObjectDescriptor::new("docs/readme.txt", "my-bucket", 42)
            .expect("valid descriptor should construct");
        assert_eq!(object.name(), "docs/readme.txt");
        assert_eq!(object.bucket(), "my-bucket");
        assert_eq!(object.crc32c(), 42);
    }

    #[test]
    fn rejects_invalid_fields() {
        let cases = [
            ("", "bucket", 1, ValidationError::EmptyName),
            ("name", "", 1, ValidationError::EmptyBucket),
            ("name", "bucket", 0, ValidationError::InvalidChecksum),
        ];
        for (name, bucket, crc, want) in cases {
            let got = ObjectDescriptor::new(name, bucket, crc)
                .expect_err("descriptor should be rejected");
            assert_eq!(got, want);
        }
    }

    #[test]
    fn empty_name_reported_before_empty_bucket() {
        let got = ObjectDescriptor::new("", "", 0).expect_err("invalid");
        assert_eq!(got, ValidationError::EmptyName);
    }
}
