// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{FlagsError, Result};
use crate::flag::{FlagDeclaration, FlagId};

/// Immutable table of every declared flag, indexed by name and ordered by id.
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
	by_name: HashMap<String, Arc<FlagDeclaration>>,
	by_id: BTreeMap<FlagId, Arc<FlagDeclaration>>,
}

impl FlagRegistry {
	/// Builds the registry, rejecting duplicate names or ids.
	pub fn new(declarations: impl IntoIterator<Item = FlagDeclaration>) -> Result<Self> {
		let mut registry = Self::default();
		for declaration in declarations {
			if registry.by_name.contains_key(&declaration.name) {
				return Err(FlagsError::DuplicateFlag(declaration.name));
			}
			if registry.by_id.contains_key(&declaration.id) {
				return Err(FlagsError::DuplicateFlag(format!(
					"{} (id {})",
					declaration.name, declaration.id
				)));
			}
			let declaration = Arc::new(declaration);
			registry
				.by_name
				.insert(declaration.name.clone(), Arc::clone(&declaration));
			registry.by_id.insert(declaration.id, declaration);
		}
		Ok(registry)
	}

	pub fn get(&self, name: &str) -> Option<&Arc<FlagDeclaration>> {
		self.by_name.get(name)
	}

	/// Looks a flag up by the `(namespace, name)` pair used by server pushes.
	pub fn find(&self, namespace: &str, name: &str) -> Option<&Arc<FlagDeclaration>> {
		self.get(name).filter(|d| d.namespace == namespace)
	}

	/// Iterates declarations in id order.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<FlagDeclaration>> {
		self.by_id.values()
	}

	pub fn len(&self) -> usize {
		self.by_id.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_id.is_empty()
	}
}
