// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
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

use std::collections::{btree_map::Entry, BTreeMap};

use bherror::Error;

use super::{DecodingResult, JsonNodePathSegment};
use crate::DecodingError;

type Key = String;
type Index = u32;

#[derive(Debug)]
pub(crate) struct PathMap<T> {
    value: Option<T>,
    children: Children<T>,
}

impl<T> Default for PathMap<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: Children::None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Children<T> {
    None,
    Object(PathMapObject<T>),
    Array(PathMapArray<T>),
}

impl<T> PathMap<T> {
    pub(crate) fn is_empty_leaf(&self) -> bool {
        self.value.is_none()
            && match &self.children {
                Children::None => true,
                Children::Object(path_map_object) => path_map_object.0.is_empty(),
                Children::Array(path_map_array) => path_map_array.0.is_empty(),
            }
    }

    pub(crate) fn insert_value(&mut self, value: T) {
        assert!(
            self.value.is_none(),
            "implementation error: insert_value called on non-empty map"
        );
        self.value = Some(value);
    }

    pub(crate) fn traverse_path<'a, 'p>(
        &'a self,
        mut path: impl Iterator<Item = JsonNodePathSegment<'p>>,
        mut visit_value: impl FnMut(&'a T),
    ) -> Result<(), ()> {
        if let Some(value) = &self.value {
            visit_value(value);
        }
        match &self.children {
            Children::None => {
                if path.next().is_none() {
                    Ok(())
                } else {
                    Err(())
                }
            }
            Children::Object(path_map_object) => path_map_object.traverse_path(path, visit_value),
            Children::Array(path_map_array) => path_map_array.traverse_path(path, visit_value),
        }
    }
}

#[derive(Debug)]
pub(crate) struct PathMapObject<T>(BTreeMap<Key, PathMap<T>>);

impl<T> Default for PathMapObject<T> {
    fn default() -> Self {
        Self(Default::default())
    }
}

#[derive(Debug)]
pub(crate) struct PathMapArray<T>(BTreeMap<Index, PathMap<T>>);

impl<T> Default for PathMapArray<T> {
    fn default() -> Self {
        Self(Default::default())
    }
}

impl<T> PathMapObject<T> {
    pub(crate) fn insert_key(
        &mut self,
        key: Key,
        child: PathMap<T>,
    ) -> DecodingResult<&mut PathMap<T>> {
        match self.0.entry(key) {
            Entry::Occupied(entry) => Err(Error::root(DecodingError::DuplicateClaimName(
                entry.key().to_owned(),
            ))),
            Entry::Vacant(entry) => Ok(entry.insert(child)),
        }
    }

    pub(crate) fn finish_subtree(self) -> PathMap<T> {
        PathMap {
            value: None,
            children: Children::Object(self),
        }
    }

    pub(crate) fn traverse_path<'a, 'p>(
        &'a self,
        path: impl IntoIterator<Item = JsonNodePathSegment<'p>>,
        visit_value: impl FnMut(&'a T),
    ) -> Result<(), ()> {
        let mut path = path.into_iter();
        match path.next() {
            Some(JsonNodePathSegment::Key(key)) => {
                let Some(next) = self.0.get(key) else {
                    return Err(());
                };
                next.traverse_path(path, visit_value)
            }
            None => Ok(()),
            _ => Err(()),
        }
    }
}

impl<T> PathMapArray<T> {
    pub(crate) fn insert_element(&mut self, index: Index, child: PathMap<T>) -> &mut PathMap<T> {
        match self.0.entry(index) {
            Entry::Occupied(_) => panic!(
                "implementation error: PathTableArray::enter called with duplicate index {}",
                index
            ),
            Entry::Vacant(entry) => entry.insert(child),
        }
    }

    pub(crate) fn finish_subtree(self) -> PathMap<T> {
        PathMap {
            value: None,
            children: Children::Array(self),
        }
    }

    pub(crate) fn traverse_path<'a, 'p>(
        &'a self,
        mut path: impl Iterator<Item = JsonNodePathSegment<'p>>,
        visit_value: impl FnMut(&'a T),
    ) -> Result<(), ()> {
        match path.next() {
            Some(JsonNodePathSegment::Index(index)) => {
                let Some(next) = self.0.get(&index) else {
                    return Err(());
                };
                next.traverse_path(path, visit_value)
            }
            None => Ok(()),
            _ => Err(()),
        }
    }
}
