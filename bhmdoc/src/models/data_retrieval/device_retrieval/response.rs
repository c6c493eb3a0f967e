// Copyright (C) 2020-2025  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! This module defines the data model described in the section "8.3.2.1.2.2 Device retrieval mdoc
//! response" of the [ISO/IEC 18013-5:2021][1] standard.
//!
//! [1]: <https://www.iso.org/standard/69084.html>
use std::collections::HashMap;

use base64::Engine as _;
use bh_jws_utils::{SignatureVerifier, SigningAlgorithm};
use bherror::traits::{ErrorContext as _, ForeignError as _};
use bhx5chain::X509Trust;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    device_auth::{DeviceAuth, DeviceAuthentication},
    issuer_auth::{DigestAlgorithm, IssuerAuth},
    request::NameSpaces,
};
use crate::{
    models::{
        data_retrieval::{
            common::{DataElementIdentifier, DataElementValue, DocType, NameSpace},
            BorrowedClaims, Claims,
        },
        Bytes, BytesCbor,
    },
    utils::{
        base64::{base64_url_decode, base64_url_encode},
        digest::{sha256, sha384, sha512},
    },
    DeviceKey, MdocError, Result,
};

/// The version of the [`DeviceResponse`] structure.
///
/// The value is currently specified in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
const DEVICE_RESPONSE_VERSION: &str = "1.0";

/// [`DeviceResponse`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<Vec<Document>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_errors: Option<Vec<DocumentError>>,
    status: u64,
}

impl DeviceResponse {
    pub(crate) fn new(documents: Vec<Document>) -> Self {
        Self {
            version: DEVICE_RESPONSE_VERSION.to_owned(),
            // set to `None` if no `Document`s are present
            documents: (!documents.is_empty()).then_some(documents),
            document_errors: None,
            status: 0,
        }
    }

    /// Parses the provided `base64url`-encoded `string` of _CBOR_ data into
    /// [`DeviceResponse`].
    pub fn from_base64_cbor(value: &str) -> Result<Self> {
        // HACK(third-party): We should only use `base64_url_decode`, but the `vp_token` from a
        // certain `third-party` implementation is encoded with invalid padding so we workaround
        // that here.

        let decoded = match base64_url_decode(value) {
            Ok(decoded) => decoded,
            Err(base64::DecodeError::InvalidPadding) => base64::engine::general_purpose::URL_SAFE
                .decode(value)
                .foreign_err(|| MdocError::DeviceResponseParse("invalid base64".to_owned()))?,
            Err(err) => Err(err)
                .foreign_err(|| MdocError::DeviceResponseParse("invalid base64".to_owned()))?,
        };

        ciborium::from_reader(decoded.as_slice())
            .foreign_err(|| MdocError::DeviceResponseParse("invalid CBOR".to_owned()))
    }

    /// Serializes the [`DeviceResponse`] to `base64url`-encoded (**without
    /// padding**) `string` of _CBOR_ data.
    pub fn to_base64_cbor(&self) -> Result<String> {
        let mut cbor = Vec::new();
        ciborium::into_writer(self, &mut cbor).foreign_err(|| {
            MdocError::DeviceResponseParse("serialization to CBOR failed".to_owned())
        })?;

        Ok(base64_url_encode(cbor))
    }

    /// Consumes the [`DeviceResponse`] and returns the underlying
    /// [`Document`]s.
    pub fn into_documents(self) -> Option<Vec<Document>> {
        self.documents
    }
}

/// [`Document`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    doc_type: DocType,
    pub(crate) issuer_signed: IssuerSigned,
    pub(crate) device_signed: DeviceSigned,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Errors>,
}

impl Document {
    pub(crate) fn new(
        doc_type: DocType,
        issuer_signed: IssuerSigned,
        device_signed: DeviceSigned,
    ) -> Self {
        Self {
            doc_type,
            issuer_signed,
            device_signed,
            errors: None,
        }
    }

    /// Validates the claims of the underlying [`IssuerSigned`].
    ///
    /// Note: this is intended to be used **ONLY** by the `mDoc` verifier, and
    /// not the holder (device), because some information, such as `validUntil`,
    /// is evaluated differently, i.e. *not-yet-valid* credential might be
    /// accepted by the holder, and not the verifier.
    pub(crate) fn validate(&self, current_time: u64) -> Result<()> {
        self.issuer_signed
            .validate_verifier(current_time, &self.doc_type)
    }

    /// Extracts and returns only the data elements.
    pub(crate) fn into_claims(self) -> Claims {
        self.issuer_signed.into_claims()
    }

    /// Verifies both issuer signature and device signature or MAC of this [`Document`].
    ///
    /// If [`X509Trust`] is provided, the Issuer's authenticity is verified as well.
    ///
    /// **Note**: currently, only the signature is supported for the `DeviceAuth`. Verifying the
    /// MAC results in the [DeviceMac][MdocError::DeviceMac] error.
    pub(crate) fn verify<'a>(
        &self,
        client_id: &str,
        response_uri: &str,
        nonce: &str,
        mdoc_generated_nonce: &str,
        trust: Option<&X509Trust>,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<()> {
        self.issuer_signed
            .verify_signature(trust, &get_signature_verifier)
            .ctx(|| "issuer signature")?;

        let device_key = self.issuer_signed.device_key()?;

        self.device_signed
            .verify_signature(
                client_id,
                response_uri,
                nonce,
                mdoc_generated_nonce,
                &self.doc_type,
                get_signature_verifier,
                &device_key,
            )
            .ctx(|| "device signature")
    }
}

/// [`DocumentError`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentError(DocType, ErrorCode);

/// [`IssuerSigned`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSigned {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name_spaces: Option<IssuerNameSpaces>,
    issuer_auth: IssuerAuth,
}

impl IssuerSigned {
    /// Creates a new `IssuerSigned` object with a single namespace.
    pub(crate) fn new<Signer: bh_jws_utils::Signer + bh_jws_utils::HasX5Chain, R: Rng + ?Sized>(
        doc_type: DocType,
        name_spaces: Claims,
        device_key: DeviceKey,
        signer: &Signer,
        rng: &mut R,
        current_time: u64,
    ) -> Result<Self> {
        let name_spaces = IssuerNameSpaces(
            name_spaces
                .0
                .into_iter()
                .map(|(name_space, items)| {
                    let items = items
                        .into_iter()
                        .enumerate()
                        .map(|(digest_id, (element_identifier, element_value))| {
                            IssuerSignedItem {
                                digest_id: digest_id.into(),
                                random: Bytes::random_salt(rng),
                                element_identifier,
                                element_value,
                            }
                            .into()
                        })
                        .collect();

                    (name_space, items)
                })
                .collect(),
        );

        let issuer_auth =
            IssuerAuth::new(doc_type, &name_spaces, device_key, signer, current_time)?;

        Ok(Self {
            name_spaces: Some(name_spaces),
            issuer_auth,
        })
    }

    /// Deserializes the provided _CBOR_-serialized and _base64url_-encoded string into the
    /// [`IssuerSigned`].
    pub(crate) fn from_base64_url(base64_url: &str) -> Result<Self> {
        // TODO(issues/24): Remove fallback to URL_SAFE once certain `third-party` implementation
        // fixes its bug.
        let decoded = match base64_url_decode(base64_url) {
            Ok(decoded) => decoded,
            Err(base64::DecodeError::InvalidPadding) => base64::engine::general_purpose::URL_SAFE
                .decode(base64_url)
                .foreign_err(|| MdocError::IssuerSignedParse)
                .ctx(|| "invalid base64-url payload")?,
            Err(err) => {
                return Err(err)
                    .foreign_err(|| MdocError::IssuerSignedParse)
                    .ctx(|| "invalid base64-url payload")
            }
        };

        ciborium::from_reader(decoded.as_slice())
            .foreign_err(|| MdocError::IssuerSignedParse)
            .ctx(|| "invalid CBOR payload")
    }

    /// Created a new [`IssuerSigned`] with the claims filtered with respect to
    /// the provided [`NameSpaces`].
    ///
    /// In other words, the claims are here selectively disclosed.
    pub(crate) fn filtered_claims(&self, name_spaces: &NameSpaces) -> Self {
        let filtered = self
            .name_spaces
            .as_ref()
            .and_then(|all_name_spaces| all_name_spaces.filtered_claims(name_spaces));

        Self {
            name_spaces: filtered,
            issuer_auth: self.issuer_auth.clone(),
        }
    }

    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        self.name_spaces
            .map(IssuerNameSpaces::into_claims)
            .unwrap_or_else(|| Claims(HashMap::new()))
    }

    /// Extracts and returns the [`BorrowedClaims`].
    pub fn claims(&self) -> BorrowedClaims<'_> {
        self.name_spaces
            .as_ref()
            .map(IssuerNameSpaces::claims)
            .unwrap_or_else(|| BorrowedClaims(HashMap::new()))
    }

    /// Returns the signed [`DeviceKey`] of the respective `mdoc` Device the
    /// credential is issued to.
    pub fn device_key(&self) -> Result<DeviceKey> {
        self.issuer_auth.device_key()
    }

    /// Verifies the issuer's signature of the underlying [`IssuerAuth`].
    ///
    /// If [`X509Trust`] is provided, the Issuer's authenticity is verified as well.
    pub(crate) fn verify_signature<'a>(
        &self,
        trust: Option<&X509Trust>,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
    ) -> Result<()> {
        self.issuer_auth
            .verify_signature(trust, get_signature_verifier)
    }

    /// Validates the claims of the underlying [`IssuerAuth`].
    ///
    /// **Note**: this is intended to be used only by the `mDoc` Verifier.
    fn validate_verifier(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        self.issuer_auth
            .validate_verifier(current_time, doc_type, self.name_spaces.as_ref())
    }

    /// Validates the claims of the underlying [`IssuerAuth`].
    ///
    /// Unlike [`validate_verifier`][Self::validate_verifier], this does not
    /// validate the _validFrom_ claim, as the Device should be able to accept
    /// _not-yet-valid_ credentials.
    ///
    /// **Note**: this is intended to be used only by the `mDoc` Device.
    pub(crate) fn validate_device(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        self.issuer_auth
            .validate_device(current_time, doc_type, self.name_spaces.as_ref())
    }
}

/// [`IssuerNameSpaces`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IssuerNameSpaces(pub(crate) HashMap<NameSpace, Vec<IssuerSignedItemBytes>>);

impl IssuerNameSpaces {
    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        Claims(
            self.0
                .into_iter()
                .map(|(k, vs)| {
                    let vs_map = vs
                        .into_iter()
                        .map(|item| {
                            let item = IssuerSignedItem::from(item);
                            (item.element_identifier, item.element_value)
                        })
                        .collect();

                    (k, vs_map)
                })
                .collect(),
        )
    }

    /// Extracts and returns the [`BorrowedClaims`].
    fn claims(&self) -> BorrowedClaims<'_> {
        BorrowedClaims(
            self.0
                .iter()
                .map(|(k, vs)| {
                    let vs_map = vs
                        .iter()
                        .map(|item| {
                            (
                                &item.0.inner.element_identifier,
                                &item.0.inner.element_value,
                            )
                        })
                        .collect();

                    (k, vs_map)
                })
                .collect(),
        )
    }

    /// Selectively discloses claims based on the provided [`NameSpaces`].
    ///
    /// If no claims are disclosed, [`None`] is returned.
    fn filtered_claims(&self, name_spaces: &NameSpaces) -> Option<Self> {
        let mut filtered = HashMap::new();

        for (name_space, issuer_signed_items) in &self.0 {
            let Some(data_elements) = name_spaces.0.get(name_space) else {
                // no claims from this namespace are selected
                continue;
            };

            let filtered_name_space: Vec<IssuerSignedItemBytes> = issuer_signed_items
                .iter()
                .filter(|item| {
                    data_elements
                        .0
                        .contains_key(&item.0.inner.element_identifier)
                })
                .cloned()
                .collect();

            if !filtered_name_space.is_empty() {
                filtered.insert(name_space.clone(), filtered_name_space);
            }
        }

        if filtered.is_empty() {
            return None;
        };

        Some(Self(filtered))
    }

    /// Converts the Issuer-signed claims to the format to be signed by the
    /// Device.
    pub(crate) fn to_device_name_spaces(&self) -> DeviceNameSpaces {
        DeviceNameSpaces(
            self.0
                .iter()
                .map(|(name_space, issuer_signed_items)| {
                    let device_signed_items = DeviceSignedItems(
                        issuer_signed_items
                            .iter()
                            .map(|item| {
                                (
                                    item.0.inner.element_identifier.clone(),
                                    item.0.inner.element_value.clone(),
                                )
                            })
                            .collect(),
                    );

                    (name_space.clone(), device_signed_items)
                })
                .collect(),
        )
    }
}

/// [`IssuerSignedItemBytes`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC
/// 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IssuerSignedItemBytes(pub(crate) BytesCbor<IssuerSignedItem>);

impl IssuerSignedItemBytes {
    /// Computes the digest of the serialized `self`.
    pub fn digest(&self, alg: &DigestAlgorithm) -> Result<Vec<u8>> {
        let serialize = || -> Result<Vec<u8>> {
            let mut payload = Vec::new();
            ciborium::into_writer(self, &mut payload)
                .foreign_err(|| MdocError::IssuerAuth)
                .ctx(|| "unable to serialize `IssuerSignedItemBytes`")?;

            Ok(payload)
        };

        let payload = match self.0.original_data {
            Some(ref original_data) => original_data,
            None => &serialize()?,
        };

        Ok(match alg {
            DigestAlgorithm::Sha256 => sha256(payload).to_vec(),
            DigestAlgorithm::Sha384 => sha384(payload).to_vec(),
            DigestAlgorithm::Sha512 => sha512(payload).to_vec(),
        })
    }
}

impl From<IssuerSignedItem> for IssuerSignedItemBytes {
    fn from(value: IssuerSignedItem) -> Self {
        Self(value.into())
    }
}

impl From<IssuerSignedItemBytes> for IssuerSignedItem {
    fn from(value: IssuerSignedItemBytes) -> Self {
        value.0.inner
    }
}

/// [`IssuerSignedItem`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSignedItem {
    pub(super) random: Bytes,
    #[serde(rename = "digestID")]
    pub(super) digest_id: DigestID,
    pub(super) element_value: DataElementValue,
    pub(super) element_identifier: DataElementIdentifier,
}

/// Digest ID for issuer data authentication.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct DigestID(u64);

impl std::fmt::Display for DigestID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DigestID {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<usize> for DigestID {
    fn from(value: usize) -> Self {
        Self(value as u64)
    }
}

/// [`DeviceSigned`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSigned {
    pub(crate) name_spaces: DeviceNameSpacesBytes,
    device_auth: DeviceAuth,
}

impl DeviceSigned {
    /// Creates a new [`DeviceSigned`] object by computing the signature with
    /// the provided [`Signer`][bh_jws_utils::Signer] over the provided data.
    pub(crate) fn new(
        name_spaces: DeviceNameSpaces,
        client_id: &str,
        response_uri: &str,
        nonce: &str,
        mdoc_generated_nonce: &str,
        doc_type: &DocType,
        signer: &impl bh_jws_utils::Signer,
    ) -> Result<Self> {
        let name_spaces = name_spaces.into();

        let device_authentication = DeviceAuthentication::new(
            client_id,
            response_uri,
            nonce,
            mdoc_generated_nonce,
            doc_type,
            &name_spaces,
        );

        let device_auth = DeviceAuth::new_signature(device_authentication, signer)?;

        Ok(Self {
            name_spaces,
            device_auth,
        })
    }

    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        self.name_spaces.0.inner.into_claims()
    }

    /// Extracts and returns the [`BorrowedClaims`].
    pub fn claims(&self) -> BorrowedClaims<'_> {
        self.name_spaces.0.inner.claims()
    }

    /// Verifies the underlying signature or MAC.
    ///
    /// The payload for the signature is detached, i.e. it is not directly
    /// contained underneath. It is constructed from the provided arguments, and
    /// used as such to verify the signature against.
    ///
    /// **Note**: currently, only the signature is supported. Verifying the MAC
    /// results in the [DeviceMac][MdocError::DeviceMac] error.
    #[allow(clippy::too_many_arguments)]
    fn verify_signature<'a>(
        &self,
        client_id: &str,
        response_uri: &str,
        nonce: &str,
        mdoc_generated_nonce: &str,
        doc_type: &DocType,
        get_signature_verifier: impl Fn(SigningAlgorithm) -> Option<&'a dyn SignatureVerifier>,
        device_key: &DeviceKey,
    ) -> Result<()> {
        let device_authentication = DeviceAuthentication::new(
            client_id,
            response_uri,
            nonce,
            mdoc_generated_nonce,
            doc_type,
            &self.name_spaces,
        );

        self.device_auth
            .verify_signature(device_authentication, get_signature_verifier, device_key)
    }
}

/// [`DeviceNameSpacesBytes`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC
/// 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceNameSpacesBytes(pub(crate) BytesCbor<DeviceNameSpaces>);

impl From<DeviceNameSpaces> for DeviceNameSpacesBytes {
    fn from(value: DeviceNameSpaces) -> Self {
        Self(value.into())
    }
}

/// [`DeviceNameSpaces`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceNameSpaces(HashMap<NameSpace, DeviceSignedItems>);

impl DeviceNameSpaces {
    /// Extracts and returns only the data elements.
    pub fn into_claims(self) -> Claims {
        Claims(self.0.into_iter().map(|(k, vs)| (k, vs.0)).collect())
    }

    /// Extracts and returns the [`BorrowedClaims`].
    pub fn claims(&self) -> BorrowedClaims<'_> {
        BorrowedClaims(
            self.0
                .iter()
                .map(|(k, vs)| (k, vs.0.iter().collect()))
                .collect(),
        )
    }
}

impl From<HashMap<NameSpace, DeviceSignedItems>> for DeviceNameSpaces {
    fn from(value: HashMap<NameSpace, DeviceSignedItems>) -> Self {
        Self(value)
    }
}

/// [`DeviceSignedItems`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignedItems(HashMap<DataElementIdentifier, DataElementValue>);

/// [`Errors`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1] standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Errors(HashMap<NameSpace, ErrorItems>);

/// [`ErrorItems`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorItems(HashMap<DataElementIdentifier, ErrorCode>);

/// [`ErrorCode`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCode(i64);
