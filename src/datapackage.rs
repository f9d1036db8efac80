//! Structured definition of `datapackage.json` and its digest sibling.
//! According to [the spec](https://specs.webrecorder.net/wacz/1.1.1/#datapackage-json):
//!
//! > The file **must** be present at the root of the WACZ which serves as the manifest for the web archive
//! > and is compliant with the [FRICTIONLESS-DATA-PACKAGE](https://specs.frictionlessdata.io/data-package/) specification.

use std::{error::Error, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{
    signer::{Signer, SignedData},
    zipwriter::ResourceRecord,
    WACZ_VERSION,
};

#[derive(Serialize, Deserialize)]
pub struct DataPackage {
    /// In WACZ 1.1.1 this value is `data-package`.
    pub profile: String,
    pub wacz_version: String,
    pub title: String,
    pub description: String,
    /// Creation date in RFC 3339 format.
    pub created: String,
    /// Name and version of the software that produced the archive.
    pub software: String,
    #[serde(rename = "mainPageUrl", skip_serializing_if = "Option::is_none")]
    pub main_page_url: Option<String>,
    #[serde(rename = "mainPageDate", skip_serializing_if = "Option::is_none")]
    pub main_page_date: Option<String>,
    pub resources: Vec<DataPackageResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_data: Option<SignedData>,
    /// Arbitrary caller-supplied fields, flattened alongside the fields above.
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

/// Caller-supplied manifest fields that don't come from the resources list
/// itself: main page pointers, display metadata, and arbitrary extras.
#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub main_page_url: Option<String>,
    pub main_page_date: Option<String>,
    pub extras: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DataPackageResource {
    #[serde(rename = "name")]
    pub file_name: String,
    pub path: String,
    pub hash: String,
    pub bytes: u64,
}

#[derive(Serialize, Deserialize)]
pub struct DataPackageDigest {
    pub path: String,
    pub hash: String,
}

impl DataPackage {
    /// Builds the manifest from the resources a [`crate::zipwriter::StreamingZipWriter`]
    /// already wrote, optionally invoking `signer` to attach a signature over
    /// the datapackage hash.
    pub fn new(
        resources: &[ResourceRecord],
        created: DateTime<Utc>,
        signer: Option<&dyn Signer>,
        options: &ManifestOptions,
    ) -> Result<Self, DataPackageError> {
        let mut data_package = Self {
            profile: "data-package".to_owned(),
            wacz_version: WACZ_VERSION.to_owned(),
            title: options.title.clone().unwrap_or_else(|| "WACZ".to_owned()),
            description: options.description.clone().unwrap_or_default(),
            created: created.to_rfc3339(),
            software: format!("waczcore {}", env!("CARGO_PKG_VERSION")),
            main_page_url: options.main_page_url.clone(),
            main_page_date: options.main_page_date.clone(),
            resources: resources.iter().map(DataPackageResource::from_record).collect(),
            signed_data: None,
            extras: options.extras.clone().unwrap_or_default(),
        };

        if let Some(signer) = signer {
            let hash = data_package.content_hash()?;
            let signed = signer
                .sign(&hash, created)
                .map_err(DataPackageError::SigningError)?;
            data_package.signed_data = Some(signed);
        }

        Ok(data_package)
    }

    fn content_hash(&self) -> Result<String, DataPackageError> {
        let as_vec = serde_json::to_vec(self).map_err(DataPackageError::SerialisationError)?;
        Ok(format!("sha256:{:x}", Sha256::digest(as_vec)))
    }

    pub fn digest(&self) -> Result<DataPackageDigest, DataPackageError> {
        Ok(DataPackageDigest {
            path: "datapackage.json".to_owned(),
            hash: self.content_hash()?,
        })
    }
}

impl DataPackageResource {
    fn from_record(record: &ResourceRecord) -> Self {
        let file_name = record
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&record.path)
            .to_owned();
        Self {
            file_name,
            path: record.path.clone(),
            hash: format!("sha256:{}", record.sha256),
            bytes: record.size,
        }
    }
}

#[derive(Debug)]
pub enum DataPackageError {
    SerialisationError(serde_json::Error),
    SigningError(crate::error::WaczError),
}

impl fmt::Display for DataPackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialisationError(error) => write!(f, "serialisation error: {error}"),
            Self::SigningError(error) => write!(f, "signing error: {error}"),
        }
    }
}

impl Error for DataPackageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SerialisationError(error) => Some(error),
            Self::SigningError(error) => Some(error),
        }
    }
}
