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

use std::{collections::HashSet, str::FromStr};

use bherror::{traits::PropagateError, Error};
use serde_json::Value;

use crate::{
    path_map,
    utils::{is_reserved_key_name, VecDisplayWrapper, SD_ALG_FIELD_NAME},
    DecodingError, DecodingResult, Disclosure, DisclosureByDigestTable, DisclosureByPathTable,
    DisclosureData, Hasher, HashingAlgorithm, JsonObject, ELLIPSIS, SD, SHA_256_ALG_NAME,
};

type PathMap<'a> = path_map::PathMap<&'a Disclosure>;
type PathMapObject<'a> = path_map::PathMapObject<&'a Disclosure>;
type PathMapArray<'a> = path_map::PathMapArray<&'a Disclosure>;

/// **Creates** a [JsonObject] from the provided claims and disclosures by decoding
/// disclosures found in the provided claims. The procedure follows the instructions
/// which can be found at [1]. Alongside the decoded claims, returns the [Hasher]
/// identified in the hash function claim (as described [here]) and used to calculate
/// digest of disclosures, and a [`DisclosureByPathTable`] for further lookup
/// (mostly useful on the Holder).
///
/// # Complexity
///
/// This recreates a copy of the provided `claims` [JsonObject] with the disclosed disclosures by
/// traversing the whole `claims` object recursivley.
///
/// # Notes
///
/// - Argument `get_hasher` needs to support the hash function from the hash function claim
///   or error will be returned.
/// - Digest of the disclosure found in the `claims` or recursively processed disclosures but
///   not found among the digests of the provided disclosures will be skipped.
/// - Decoded claims are valid in terms of not containing any [RESERVED_CLAIM_NAMES]
///
/// [1]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.1
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-4.1.1
pub(crate) fn decode_disclosed_claims<'dis>(
    claims: &JsonObject,
    disclosures: &'dis [Disclosure],
    get_hasher: impl Fn(HashingAlgorithm) -> Option<Box<dyn Hasher>>,
) -> DecodingResult<(JsonObject, Box<dyn Hasher>, DisclosureByPathTable<'dis>)> {
    // Extract a hashing algorithm to recreate a given payload
    let sd_alg = fetch_hashing_algorithm(claims)?;

    // Use a user-provided hasher for the given algorithm
    let hasher = get_hasher(sd_alg)
        .ok_or_else(|| Error::root(DecodingError::MissingHasher(sd_alg.to_string())))?;
    let mut state = DecoderState::new(DisclosureByDigestTable::new(disclosures, &hasher)?);

    let (decoded_claims, path_map) = decode_object(claims, &mut state, true)?;

    state.finalize()?;

    Ok((decoded_claims, hasher, DisclosureByPathTable::new(path_map)))
}

struct DecoderState<'json, 'dis> {
    /// Precomputes all the disclosure digest for fast lookup afterwards
    ///
    /// <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.1.1>
    disclosures_by_digest: DisclosureByDigestTable<'dis>,

    /// Keeps track of all encountered digest in the `claims` object to check for duplicate digests
    ///
    /// <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.4>
    processed_digests: HashSet<&'json str>,
}

impl<'dis> DecoderState<'_, 'dis> {
    fn new(disclosures_by_digest: DisclosureByDigestTable<'dis>) -> Self {
        Self {
            processed_digests: HashSet::new(),
            disclosures_by_digest,
        }
    }

    fn finalize(self) -> DecodingResult<()> {
        // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.5
        if !self.disclosures_by_digest.0.is_empty() {
            let unused_disclosures = self.disclosures_by_digest.0.into_keys().collect();
            return Err(Error::root(DecodingError::UnusedDisclosures(
                VecDisplayWrapper(unused_disclosures),
            )));
        }

        Ok(())
    }
}

/// Identifies the hashing algorithm used to generate the disclosure digests in the claims as described [here]
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-4.1.1
fn fetch_hashing_algorithm(claims: &JsonObject) -> DecodingResult<HashingAlgorithm> {
    let sd_alg_name = claims
        .get(SD_ALG_FIELD_NAME)
        .map_or(Some(SHA_256_ALG_NAME), |value| value.as_str())
        .ok_or_else(|| Error::root(DecodingError::ReservedKeyName(SD_ALG_FIELD_NAME)))?;

    HashingAlgorithm::from_str(sd_alg_name)
        .with_err(|| DecodingError::InvalidHashAlgorithmName(sd_alg_name.to_owned()))
}

// https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.3.2.2.1
fn decode_object<'json, 'dis: 'json>(
    object: &'json JsonObject,
    state: &mut DecoderState<'json, 'dis>,
    top_level: bool,
) -> DecodingResult<(JsonObject, PathMapObject<'dis>)> {
    let mut decoded_object = JsonObject::new();
    let mut disclosures_by_path = PathMapObject::default();

    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.2.2.1
    if let Some(sd) = object.get(SD) {
        let sd_array = sd
            .as_array()
            .ok_or_else(|| Error::root(DecodingError::MalformedDigest(sd.to_string())))?;

        for digest in sd_array {
            let Some(disclosure) = process_digest(digest, state)? else {
                // ignores the digest if no matching disclosure is found
                // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.3.2.1
                continue;
            };

            match disclosure.data {
                DisclosureData::KeyValue {
                    ref key, ref value, ..
                } => process_key_value(
                    key,
                    value,
                    &mut decoded_object,
                    state,
                    &mut disclosures_by_path,
                    Some(disclosure),
                )?,
                _ => {
                    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.3.2.2.2.1
                    return Err(Error::root(DecodingError::MismatchedDisclosureFormat));
                }
            }
        }
    }

    for (key, value) in object {
        if key.eq(SD) {
            continue;
        }
        // avoids the check of reserved key for [SD_ALG_FIELD_NAME] case when recursion is on the top level and
        // essentially removes the key by skipping the insertion
        // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.6
        if key.eq(SD_ALG_FIELD_NAME) && top_level {
            continue;
        }
        process_key_value(
            key,
            value,
            &mut decoded_object,
            state,
            &mut disclosures_by_path,
            None,
        )?;
    }

    Ok((decoded_object, disclosures_by_path))
}

/// Processes the (`key`, `value`) pair by:
/// - checking the key for validity
/// - recursively decoding it
/// - inserting it into the provided `object`
/// - updating the constructed path map with a disclosure corresponding to this node, if any.
///
/// Function will return error if:
///
/// - provided `key` is one of the `RESERVED_CLAIM_NAMES`
/// - recursive decoding fails
/// - object already contains a key-value pair with the provided `key`
fn process_key_value<'json, 'dis: 'json>(
    key: &'json str,
    value: &'json Value,
    object: &mut JsonObject,
    state: &mut DecoderState<'json, 'dis>,
    path_map: &mut PathMapObject<'dis>,
    disclosure: Option<&'dis Disclosure>,
) -> DecodingResult<()> {
    if let Some(reserved_key) = is_reserved_key_name(key) {
        return Err(Error::root(DecodingError::ReservedKeyName(reserved_key)));
    }

    let (decoded_value, mut child_map) = decode_value(value, state)?;

    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.3.2.2.2.3
    if object.insert(key.to_string(), decoded_value).is_some() {
        return Err(Error::root(DecodingError::DuplicateClaimName(
            key.to_string(),
        )));
    }

    if let Some(disclosure) = disclosure {
        child_map.insert_value(disclosure);
    }

    // Prune empty leaves
    if !child_map.is_empty_leaf() {
        path_map.insert_key(key.to_owned(), child_map)?;
    }

    Ok(())
}

// https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.3.2.3.1
fn decode_array<'json, 'dis: 'json>(
    array: &'json [Value],
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<(Value, PathMapArray<'dis>)> {
    let mut decoded_array = Vec::new();
    let mut disclosures_by_path = PathMapArray::default();

    fn resolve_element<'json, 'dis: 'json>(
        value: &'json Value,
        state: &mut DecoderState<'json, 'dis>,
    ) -> DecodingResult<Option<(&'json Value, Option<&'dis Disclosure>)>> {
        // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.2.2.2
        let Some(object) = value.as_object() else {
            return Ok(Some((value, None)));
        };
        let Some(digest) = object.get(ELLIPSIS) else {
            return Ok(Some((value, None)));
        };
        if object.len() != 1 {
            return Err(Error::root(DecodingError::MalformedDigest(
                value.to_string(),
            )));
        }

        let Some(disclosure) = process_digest(digest, state)? else {
            return Ok(None);
        };

        if let DisclosureData::ArrayElement { value, .. } = &disclosure.data {
            Ok(Some((value, Some(disclosure))))
        } else {
            // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.3.2.3.2.1
            Err(Error::root(DecodingError::MismatchedDisclosureFormat))
        }
    }

    for (index, value) in array.iter().enumerate() {
        if let Some((value, disclosure)) = resolve_element(value, state)? {
            let (value, mut child_map) = decode_value(value, state)?;

            decoded_array.push(value);

            if let Some(disclosure) = disclosure {
                child_map.insert_value(disclosure);
            }

            // Prune empty leaves
            if !child_map.is_empty_leaf() {
                disclosures_by_path.insert_element(index as _, child_map);
            }
        };
    }

    Ok((Value::Array(decoded_array), disclosures_by_path))
}

fn decode_value<'json, 'dis: 'json>(
    value: &'json Value,
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<(Value, PathMap<'dis>)> {
    match value {
        Value::Object(object) => {
            let (value, child_map) = decode_object(object, state, false)?;
            Ok((Value::Object(value), child_map.finish_subtree()))
        }
        Value::Array(array) => {
            let (value, child_map) = decode_array(array, state)?;
            Ok((value, child_map.finish_subtree()))
        }
        _ => Ok((value.to_owned(), PathMap::default())),
    }
}

/// Checks if digest was already processed and finds the disclosure that matches the digest
/// and marks the disclosure as resolved
fn process_digest<'json, 'dis>(
    digest: &'json Value,
    state: &mut DecoderState<'json, 'dis>,
) -> DecodingResult<Option<&'dis Disclosure>> {
    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.2.2.1
    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.2.2.2
    let digest = digest
        .as_str()
        .ok_or_else(|| Error::root(DecodingError::MalformedDigest(digest.to_string())))?;
    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1-4.3.2.2.2.2
    if !state.processed_digests.insert(digest) {
        return Err(Error::root(DecodingError::DuplicateDigest(
            digest.to_owned(),
        )));
    }

    Ok(state.disclosures_by_digest.0.remove(digest))
}
