use crate::EntityKind;
use itertools::Itertools;
use log::warn;
use std::{collections::HashSet, fmt};

/// A way or relation with references that do not resolve in its store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
	pub kind: EntityKind,
	pub id: i64,
	pub missing: Vec<(EntityKind, i64)>,
}

impl fmt::Display for ValidationIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} {} references missing {}",
			self.kind,
			self.id,
			self.missing.iter().map(|(kind, id)| format!("{kind} {id}")).join(", ")
		)
	}
}

/// Issues found by [`EntityStore::validate`](crate::EntityStore::validate).
///
/// Incomplete entities stay in the store; the report only flags them.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
	issues: Vec<ValidationIssue>,
	incomplete: HashSet<(EntityKind, i64)>,
}

const LOGGED_ISSUES: usize = 10;

impl ValidationReport {
	pub(crate) fn push(&mut self, issue: ValidationIssue) {
		self.incomplete.insert((issue.kind, issue.id));
		self.issues.push(issue);
	}

	#[must_use]
	pub fn issues(&self) -> &[ValidationIssue] {
		&self.issues
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.issues.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.issues.is_empty()
	}

	#[must_use]
	pub fn is_incomplete(&self, kind: EntityKind, id: i64) -> bool {
		self.incomplete.contains(&(kind, id))
	}

	/// Logs the first issues and a summary as warnings.
	pub fn log(&self) {
		for issue in self.issues.iter().take(LOGGED_ISSUES) {
			warn!("{issue}");
		}
		if self.issues.len() > LOGGED_ISSUES {
			warn!("{} more incomplete entities", self.issues.len() - LOGGED_ISSUES);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_and_lookup() {
		let mut report = ValidationReport::default();
		report.push(ValidationIssue {
			kind: EntityKind::Relation,
			id: 7,
			missing: vec![(EntityKind::Way, 3), (EntityKind::Node, 4)],
		});
		assert_eq!(
			report.issues()[0].to_string(),
			"relation 7 references missing way 3, node 4"
		);
		assert!(report.is_incomplete(EntityKind::Relation, 7));
		assert!(!report.is_incomplete(EntityKind::Way, 7));
		assert_eq!(report.len(), 1);
	}
}
