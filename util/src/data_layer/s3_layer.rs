use std::env;
use std::path::{Path, PathBuf};

use futures::{Future, Stream};
use rusoto_core::Region;
use rusoto_s3::{S3Client, S3};
use rusoto_s3;

use errors::*;
use data_layer::abstraction_layer::AbstractionLayer;

const DEFAULT_S3_REGION: Region = Region::EuWest1;
const S3_SCHEME: &str = "s3://";

pub struct AmazonS3AbstractionLayer {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl AmazonS3AbstractionLayer {
    /// Creates a layer from a `bucket[/prefix]` location. The region is taken from `AWS_REGION`
    /// when it is set.
    pub fn from_location(location: &str) -> Result<Self> {
        let location = location.trim_start_matches(S3_SCHEME).trim_matches('/');
        let mut parts = location.splitn(2, '/');
        let bucket = match parts.next() {
            Some(bucket) if !bucket.is_empty() => bucket.to_owned(),
            _ => return Err("S3 location has no bucket".into()),
        };
        let prefix = parts.next().unwrap_or("").to_owned();

        let region = env::var("AWS_REGION")
            .ok()
            .and_then(|region| region.parse().ok())
            .unwrap_or(DEFAULT_S3_REGION);

        AmazonS3AbstractionLayer::new(S3Client::simple(region), bucket, prefix)
    }

    pub fn new(client: S3Client, bucket: String, prefix: String) -> Result<Self> {
        let s3 = AmazonS3AbstractionLayer {
            client,
            bucket,
            prefix,
        };

        let exists = s3.bucket_exists().chain_err(
            || "Unable to check if bucket exists",
        )?;
        if !exists {
            return Err(format!("Bucket '{}' does not exist.", s3.bucket).into());
        }

        Ok(s3)
    }

    fn object_key(&self, path: &Path) -> Result<String> {
        let stripped_path = {
            if path.starts_with("/") {
                path.strip_prefix("/").chain_err(
                    || "Unable to strip prefix from path",
                )?
            } else {
                path
            }
        };
        let key = match stripped_path.to_str() {
            Some(string) => string.trim_end_matches('/').to_owned(),
            None => {
                return Err(
                    format!("Unable to convert path '{:?}' to a String", path).into(),
                )
            }
        };

        if self.prefix.is_empty() {
            Ok(key)
        } else if key.is_empty() {
            Ok(self.prefix.clone())
        } else {
            Ok(format!("{}/{}", self.prefix, key))
        }
    }

    fn relative_path(&self, key: &str) -> PathBuf {
        if self.prefix.is_empty() {
            return PathBuf::from(key);
        }
        let prefix = format!("{}/", self.prefix);
        PathBuf::from(key.trim_start_matches(prefix.as_str()))
    }

    pub fn file_metadata(&self, path: &Path) -> Result<rusoto_s3::HeadObjectOutput> {
        let key = self.object_key(path)?;

        let request = rusoto_s3::HeadObjectRequest {
            bucket: self.bucket.clone(),
            key: key.clone(),
            ..Default::default()
        };

        let response = self.client.head_object(&request).sync().chain_err(|| {
            format!("Unable to retrieve metadata for file {:?}", &key)
        })?;
        Ok(response)
    }

    pub fn bucket_exists(&self) -> Result<bool> {
        let result = self.client.list_buckets().sync().chain_err(
            || "Unable to retrieve bucket list",
        )?;

        match result.buckets {
            Some(buckets) => {
                for bucket in buckets {
                    if let Some(name) = bucket.name {
                        if self.bucket == name {
                            return Ok(true);
                        }
                    } else {
                        return Err("Returned bucket has no name".into());
                    }
                }
                Ok(false)
            }
            None => Err("Unable to get list of buckets".into()),
        }
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let request = rusoto_s3::ListObjectsV2Request {
                bucket: self.bucket.clone(),
                continuation_token: continuation_token.clone(),
                prefix: Some(prefix.to_owned()),
                ..Default::default()
            };

            let response = self.client.list_objects_v2(&request).sync().chain_err(
                || "Unable to get list of objects from bucket",
            )?;

            if let Some(contents) = response.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        if key != prefix {
                            keys.push(key);
                        }
                    }
                }
            }

            match (response.is_truncated, response.next_continuation_token) {
                (Some(true), Some(token)) => continuation_token = Some(token),
                _ => break,
            }
        }

        Ok(keys)
    }
}

impl AbstractionLayer for AmazonS3AbstractionLayer {
    fn get_file_length(&self, path: &Path) -> Result<u64> {
        let metadata = self.file_metadata(path).chain_err(
            || "Unable to get metadata for file",
        )?;

        if let Some(size) = metadata.content_length {
            return Ok(size as u64);
        }

        Err(
            format!("Unable to get content length of file: {:?}", path).into(),
        )
    }

    fn read_file_location(&self, path: &Path, start_byte: u64, end_byte: u64) -> Result<Vec<u8>> {
        if end_byte <= start_byte {
            return Ok(Vec::new());
        }

        let key = self.object_key(path)?;

        let request = rusoto_s3::GetObjectRequest {
            bucket: self.bucket.clone(),
            key,
            // HTTP ranges are inclusive.
            range: Some(format!("bytes={}-{}", start_byte, end_byte - 1)),
            ..Default::default()
        };

        let response = self.client.get_object(&request).sync().chain_err(
            || "Unable to get object",
        )?;

        let streaming_body = match response.body {
            Some(body) => body,
            None => return Err("Object has no body".into()),
        };

        let bytes: Vec<u8> = streaming_body.concat2().wait().chain_err(
            || "Unable to get body of file",
        )?;

        if bytes.len() as u64 != end_byte - start_byte {
            return Err(
                format!(
                    "Short read of {:?}: wanted {} bytes, got {}",
                    path,
                    end_byte - start_byte,
                    bytes.len()
                ).into(),
            );
        }

        Ok(bytes)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let key = self.object_key(path)?;

        let request = rusoto_s3::PutObjectRequest {
            bucket: self.bucket.clone(),
            key,
            body: Some(data.to_vec()),
            ..Default::default()
        };

        self.client.put_object(&request).sync().chain_err(
            || "Unable to put object into bucket",
        )?;
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let key = self.object_key(path)?;
        let prefix = if key.is_empty() {
            key
        } else {
            format!("{}/", key)
        };

        let keys = self.list_keys(&prefix)?;
        Ok(keys.iter().map(|key| self.relative_path(key)).collect())
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        if self.is_file(path)? {
            return Ok(true);
        }
        self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> Result<bool> {
        match self.file_metadata(path) {
            Ok(_) => Ok(true),
            Err(err) => {
                debug!("No object found for {:?}: {}", path, err);
                Ok(false)
            }
        }
    }

    // S3 has no directories, a path is a directory if any object lives under it.
    fn is_dir(&self, path: &Path) -> Result<bool> {
        let entries = self.read_dir(path).chain_err(
            || "Unable to check if path is a directory",
        )?;
        Ok(!entries.is_empty())
    }

    // S3 automatically creates folders if they don't exist, so we can just return here.
    fn create_dir_all(&self, _: &Path) -> Result<()> {
        Ok(())
    }
}
