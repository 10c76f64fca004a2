//! Identifier canonicalization.
//!
//! Converts namespace-qualified names and URI-style accessions into the
//! forms used as keys across the library: Clark notation
//! (`{namespace}local`) for attributes, and `PREFIX:LOCAL` for accessions.

use crate::core::{ProntoError, Result};
use std::collections::HashMap;

/// Mapping from short prefix to full namespace URI
pub type NamespaceMap = HashMap<String, String>;

/// Expand the namespace prefix of `attr` using `nsmap`.
///
/// The input is split on its first `:`.
///
/// # Errors
///
/// [`ProntoError::MissingPrefix`] if `attr` has no `:` or its prefix is not
/// in `nsmap`.
///
/// # Example
///
/// ```
/// use pronto_utils::ident::{explicit_namespace, NamespaceMap};
///
/// let mut ns = NamespaceMap::new();
/// ns.insert("owl".into(), "http://www.w3.org/2002/07/owl#".into());
/// assert_eq!(
///     explicit_namespace("owl:Class", &ns).unwrap(),
///     "{http://www.w3.org/2002/07/owl#}Class"
/// );
/// ```
pub fn explicit_namespace(attr: &str, nsmap: &NamespaceMap) -> Result<String> {
    let (prefix, local) = attr
        .split_once(':')
        .ok_or_else(|| ProntoError::missing_prefix("", attr))?;
    let namespace = nsmap
        .get(prefix)
        .ok_or_else(|| ProntoError::missing_prefix(prefix, attr))?;

    let mut expanded = String::with_capacity(namespace.len() + local.len() + 2);
    expanded.push('{');
    expanded.push_str(namespace);
    expanded.push('}');
    expanded.push_str(local);
    Ok(expanded)
}

/// Format an accession URI or string into the `PREFIX:LOCAL` token form.
///
/// Every namespace URI in `nsmap` is removed wherever it occurs, longest
/// URI first (ties in lexical order) so that a namespace nested inside
/// another cannot leave a fragment behind. The order of `nsmap` itself is
/// never consulted: a map that lists a short namespace before a longer one
/// containing it still strips the longer one whole. Then, unless the result starts with `_` (a blank node),
/// every `_` becomes `:`. Malformed input is returned as-is, best effort.
///
/// # Example
///
/// ```
/// use pronto_utils::ident::{format_accession, NamespaceMap};
///
/// assert_eq!(format_accession("UO_1000003", None), "UO:1000003");
///
/// let mut ns = NamespaceMap::new();
/// ns.insert("obo".into(), "http://purl.obolibrary.org/obo/".into());
/// assert_eq!(
///     format_accession("http://purl.obolibrary.org/obo/IAO_0000601", Some(&ns)),
///     "IAO:0000601"
/// );
/// ```
pub fn format_accession(accession: &str, nsmap: Option<&NamespaceMap>) -> String {
    let mut token = accession.to_string();

    if let Some(nsmap) = nsmap {
        let mut namespaces: Vec<&str> = nsmap
            .values()
            .map(String::as_str)
            .filter(|ns| !ns.is_empty())
            .collect();
        namespaces.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        for namespace in namespaces {
            token = token.replace(namespace, "");
        }
    }

    if !token.starts_with('_') {
        token = token.replace('_', ":");
    }
    token
}
