//! Matching push payloads to configured chat groups

use crate::Binding;

/// Returns every binding whose organization or repository matches, in config order.
///
/// A binding matching on both fields is still returned once. Unset binding
/// fields never match, and comparison is exact and case-sensitive.
pub fn resolve<'a>(
    bindings: &'a [Binding],
    organization: Option<&str>,
    repository: Option<&str>,
) -> Vec<&'a Binding> {
    bindings
        .iter()
        .filter(|binding| {
            let org_match = matches!(
                (binding.organization.as_deref(), organization),
                (Some(wanted), Some(actual)) if wanted == actual
            );
            let repo_match = matches!(
                (binding.repository.as_deref(), repository),
                (Some(wanted), Some(actual)) if wanted == actual
            );
            org_match || repo_match
        })
        .collect()
}
