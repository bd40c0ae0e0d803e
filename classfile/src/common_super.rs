//! External collaborator contract: the common-super-type oracle.

/// Resolves the nearest common supertype of two internal names, used
/// exclusively by frame synthesis. Implementations may
/// consult a host classloader, an offline class index, or a user-supplied
/// lattice; must be pure and reflexive, and must return `java/lang/Object`
/// when a class is merged with an interface it does not implement.
pub trait ClassHierarchy {
	fn common_super_class(&self, a: &str, b: &str) -> String;

	/// `true` if `descendant` is `ancestor` or a (possibly indirect)
	/// subtype of it. Used to short-circuit `common_super_class` when one
	/// side is already an ancestor of the other.
	fn is_assignable(&self, descendant: &str, ancestor: &str) -> bool {
		ancestor == "java/lang/Object" || descendant == ancestor
	}

	fn is_interface(&self, internal_name: &str) -> bool;
}

/// A minimal oracle that knows only `java/lang/Object` is a universal
/// supertype and otherwise falls back to `java/lang/Object` for any
/// non-identical pair. Sufficient for single-class inputs (no external
/// classpath available) and as the default when the caller supplies none;
/// matches the JVMS requirement that a reference type merged with an
/// interface resolve to `java/lang/Object`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrivialClassHierarchy;

impl ClassHierarchy for TrivialClassHierarchy {
	fn common_super_class(&self, a: &str, b: &str) -> String {
		if a == b {
			a.to_string()
		} else {
			"java/lang/Object".to_string()
		}
	}

	fn is_interface(&self, _internal_name: &str) -> bool {
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trivial_oracle_is_reflexive() {
		let oracle = TrivialClassHierarchy;
		assert_eq!(oracle.common_super_class("A", "A"), "A");
	}

	#[test]
	fn trivial_oracle_falls_back_to_object() {
		let oracle = TrivialClassHierarchy;
		assert_eq!(oracle.common_super_class("A", "B"), "java/lang/Object");
	}
}
