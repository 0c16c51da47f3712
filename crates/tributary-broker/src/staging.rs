//! Certificate staging
//!
//! TLS material for the broker client (keystore, truststore) lives in object
//! storage under a `scheme://bucket/prefix` reference. [`CertificateStager`]
//! copies every object under the prefix into a deterministic local directory
//! so the client library can open the files by path.
//!
//! Staging is idempotent and safe to run concurrently for the same reference:
//! each file is written to a uniquely named `.partial` sibling and then
//! renamed over the target, so readers only ever observe complete files.
//!
//! Zero listed objects is not an error. A strategy that needs a particular
//! file fails later, when the client opens the missing path.

use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{KEYSTORE_FILE, TRUSTSTORE_FILE};
use tributary_core::{Error, Result};

/// Directory created under the base temp dir for all staged bundles
pub const STAGING_DIR_NAME: &str = "broker-certificates";

/// Parsed `scheme://bucket/prefix` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectStoreReference {
    scheme: String,
    bucket: String,
    prefix: String,
}

impl ObjectStoreReference {
    /// Parse a reference; a missing `://` or `/` delimiter is a staging error
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (scheme, rest) = raw.split_once("://").ok_or_else(|| {
            Error::staging(format!(
                "malformed object-store reference '{}': expected scheme://bucket/prefix",
                raw
            ))
        })?;
        let (bucket, prefix) = rest.split_once('/').ok_or_else(|| {
            Error::staging(format!(
                "malformed object-store reference '{}': missing '/' after bucket",
                raw
            ))
        })?;

        if scheme.is_empty() || bucket.is_empty() {
            return Err(Error::staging(format!(
                "malformed object-store reference '{}': empty scheme or bucket",
                raw
            )));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    /// URL scheme, lowercased
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix without leading or trailing `/` (may be empty)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn object_prefix(&self) -> Option<ObjectPath> {
        (!self.prefix.is_empty()).then(|| ObjectPath::from(self.prefix.as_str()))
    }

    /// Deterministic staging directory for this reference under `base_dir`
    pub fn staging_dir(&self, base_dir: &Path) -> PathBuf {
        let key: String = format!("{}-{}", self.bucket, self.prefix)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        base_dir.join(STAGING_DIR_NAME).join(key)
    }
}

impl FromStr for ObjectStoreReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectStoreReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.prefix)
    }
}

/// Resolves the object store serving a reference
pub trait ObjectStoreProvider: Send + Sync {
    /// Object store client for the reference's bucket
    fn store_for(&self, reference: &ObjectStoreReference) -> Result<Arc<dyn ObjectStore>>;
}

/// Serves every reference from one store, ignoring scheme and bucket
#[derive(Clone)]
pub struct StaticObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
}

impl StaticObjectStoreProvider {
    /// Wrap an existing store
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl ObjectStoreProvider for StaticObjectStoreProvider {
    fn store_for(&self, _reference: &ObjectStoreReference) -> Result<Arc<dyn ObjectStore>> {
        Ok(self.store.clone())
    }
}

/// Builds an S3 client per bucket from the ambient AWS environment
#[derive(Debug, Clone, Default)]
pub struct S3ObjectStoreProvider {
    region: Option<String>,
    endpoint: Option<String>,
}

impl S3ObjectStoreProvider {
    /// Provider using the default credential chain and region
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Override the endpoint (S3-compatible stores)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl ObjectStoreProvider for S3ObjectStoreProvider {
    #[cfg(feature = "s3")]
    fn store_for(&self, reference: &ObjectStoreReference) -> Result<Arc<dyn ObjectStore>> {
        use object_store::aws::AmazonS3Builder;

        if !matches!(reference.scheme(), "s3" | "s3a") {
            return Err(Error::staging(format!(
                "unsupported object-store scheme '{}'",
                reference.scheme()
            )));
        }

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(reference.bucket());
        if let Some(region) = &self.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| Error::staging_with_source("failed to create S3 client", e))?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "s3"))]
    fn store_for(&self, _reference: &ObjectStoreReference) -> Result<Arc<dyn ObjectStore>> {
        Err(Error::staging(
            "S3 support not enabled. Rebuild with 's3' feature.",
        ))
    }
}

/// A local directory holding staged certificate files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCertificates {
    directory: PathBuf,
    files: Vec<String>,
}

impl StagedCertificates {
    /// Staging directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Basenames copied by the staging run that produced this bundle
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Expected keystore location (not checked for existence)
    pub fn keystore_path(&self) -> PathBuf {
        self.directory.join(KEYSTORE_FILE)
    }

    /// Expected truststore location (not checked for existence)
    pub fn truststore_path(&self) -> PathBuf {
        self.directory.join(TRUSTSTORE_FILE)
    }
}

/// Copies certificate objects into local staging directories
#[derive(Clone)]
pub struct CertificateStager {
    provider: Arc<dyn ObjectStoreProvider>,
}

impl CertificateStager {
    /// Create a stager resolving stores through `provider`
    pub fn new(provider: Arc<dyn ObjectStoreProvider>) -> Self {
        Self { provider }
    }

    /// Stage every object under `reference` into its directory below `base_dir`
    pub async fn stage(
        &self,
        reference: &ObjectStoreReference,
        base_dir: &Path,
    ) -> Result<StagedCertificates> {
        let directory = reference.staging_dir(base_dir);
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            Error::staging_with_source(
                format!("failed to create staging directory {}", directory.display()),
                e,
            )
        })?;

        let store = self.provider.store_for(reference)?;
        let prefix = reference.object_prefix();
        let objects: Vec<ObjectMeta> = store
            .list(prefix.as_ref())
            .try_collect()
            .await
            .map_err(|e| Error::staging_with_source(format!("failed to list {}", reference), e))?;

        debug!(
            bucket = %reference.bucket(),
            prefix = %reference.prefix(),
            objects = objects.len(),
            "Listed certificate objects"
        );

        let mut files = Vec::with_capacity(objects.len());
        for meta in &objects {
            let Some(name) = meta.location.filename().filter(|n| !n.is_empty()) else {
                continue;
            };

            let data = store
                .get(&meta.location)
                .await
                .map_err(|e| {
                    Error::staging_with_source(format!("failed to fetch {}", meta.location), e)
                })?
                .bytes()
                .await
                .map_err(|e| {
                    Error::staging_with_source(format!("failed to read {}", meta.location), e)
                })?;

            write_atomic(&directory.join(name), &data).await?;
            files.push(name.to_string());
        }

        info!(
            bucket = %reference.bucket(),
            prefix = %reference.prefix(),
            files = files.len(),
            directory = %directory.display(),
            "Staged certificates"
        );

        Ok(StagedCertificates { directory, files })
    }
}

impl fmt::Debug for CertificateStager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateStager").finish_non_exhaustive()
    }
}

async fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("certificate");
    let partial = target.with_file_name(format!(".{}.{}.partial", name, Uuid::new_v4().simple()));

    if let Err(e) = tokio::fs::write(&partial, data).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(Error::staging_with_source(
            format!("failed to write {}", partial.display()),
            e,
        ));
    }

    if let Err(e) = tokio::fs::rename(&partial, target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(Error::staging_with_source(
            format!("failed to move certificate into {}", target.display()),
            e,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::PutPayload;
    use tributary_core::ErrorCode;

    #[test]
    fn test_parse_reference() {
        let reference = ObjectStoreReference::parse("s3://certs-bucket/msk/prod/").unwrap();
        assert_eq!(reference.scheme(), "s3");
        assert_eq!(reference.bucket(), "certs-bucket");
        assert_eq!(reference.prefix(), "msk/prod");
        assert_eq!(reference.to_string(), "s3://certs-bucket/msk/prod");
    }

    #[test]
    fn test_parse_reference_empty_prefix() {
        let reference: ObjectStoreReference = "S3://bucket/".parse().unwrap();
        assert_eq!(reference.scheme(), "s3");
        assert_eq!(reference.prefix(), "");
        assert!(reference.object_prefix().is_none());
    }

    #[test]
    fn test_parse_reference_malformed() {
        for raw in ["certs-bucket/msk", "s3://certs-bucket", "://bucket/p", "s3:///p", ""] {
            let err = ObjectStoreReference::parse(raw).unwrap_err();
            assert_eq!(err.code(), ErrorCode::StagingFailure, "{raw}");
        }
    }

    #[test]
    fn test_staging_dir_is_deterministic() {
        let a = ObjectStoreReference::parse("s3://bucket/msk/prod").unwrap();
        let b = ObjectStoreReference::parse("s3://bucket/msk/prod/").unwrap();
        let c = ObjectStoreReference::parse("s3://bucket/msk/dev").unwrap();
        let base = Path::new("/tmp");

        assert_eq!(a.staging_dir(base), b.staging_dir(base));
        assert_ne!(a.staging_dir(base), c.staging_dir(base));
        assert!(a.staging_dir(base).starts_with("/tmp/broker-certificates"));
    }

    #[tokio::test]
    async fn test_stage_copies_by_basename() {
        let store = Arc::new(InMemory::new());
        store
            .put(
                &ObjectPath::from("msk/kafka.client.truststore.jks"),
                PutPayload::from(b"truststore".to_vec()),
            )
            .await
            .unwrap();

        let temp = tempfile::tempdir().unwrap();
        let stager = CertificateStager::new(Arc::new(StaticObjectStoreProvider::new(store)));
        let reference = ObjectStoreReference::parse("s3://bucket/msk").unwrap();

        let staged = stager.stage(&reference, temp.path()).await.unwrap();
        assert_eq!(staged.files(), ["kafka.client.truststore.jks"]);
        assert_eq!(
            std::fs::read(staged.truststore_path()).unwrap(),
            b"truststore"
        );
        assert!(!staged.keystore_path().exists());
    }

    #[cfg(not(feature = "s3"))]
    #[test]
    fn test_s3_provider_requires_feature() {
        let reference = ObjectStoreReference::parse("s3://bucket/msk").unwrap();
        let err = S3ObjectStoreProvider::new().store_for(&reference).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StagingFailure);
    }
}
