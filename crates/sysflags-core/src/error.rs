// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::flag::{FlagKind, ResourceId};

/// Errors that can occur while resolving or persisting feature flags.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlagsError {
	#[error("resource not found: {resource_id}")]
	ResourceNotFound { resource_id: ResourceId },

	#[error("resource {resource_id} resolved to no value")]
	NullResource { resource_id: ResourceId },

	#[error("serialization error: {0}")]
	Serialization(String),

	#[error("flag registered twice: {0}")]
	DuplicateFlag(String),

	#[error("unknown flag: {0}")]
	UnknownFlag(String),

	#[error("flag {name} is {actual}, not {expected}")]
	TypeMismatch {
		name: String,
		expected: FlagKind,
		actual: FlagKind,
	},

	#[error("settings store error: {0}")]
	Store(String),

	#[error("failed to write output: {0}")]
	Write(#[from] std::fmt::Error),
}

impl FlagsError {
	/// Returns true for failures caused by a broken resource reference.
	pub fn is_resource_error(&self) -> bool {
		matches!(
			self,
			FlagsError::ResourceNotFound { .. } | FlagsError::NullResource { .. }
		)
	}
}

impl From<serde_json::Error> for FlagsError {
	fn from(err: serde_json::Error) -> Self {
		FlagsError::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, FlagsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resource_errors_are_classified() {
		assert!(FlagsError::ResourceNotFound {
			resource_id: ResourceId(1004)
		}
		.is_resource_error());
		assert!(FlagsError::NullResource {
			resource_id: ResourceId(1004)
		}
		.is_resource_error());
		assert!(!FlagsError::Serialization("bad".to_string()).is_resource_error());
		assert!(!FlagsError::Write(std::fmt::Error).is_resource_error());
	}

	#[test]
	fn type_mismatch_message_names_both_kinds() {
		let err = FlagsError::TypeMismatch {
			name: "3".to_string(),
			expected: FlagKind::Boolean,
			actual: FlagKind::String,
		};
		assert_eq!(err.to_string(), "flag 3 is string, not boolean");
	}
}
