//! Property-based tests for pronto_utils using proptest

use pronto_utils::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Deduplication
// ============================================================================

proptest! {
    /// Output holds each distinct input once, in first-occurrence order
    #[test]
    fn test_unique_everseen_first_occurrences(items in prop::collection::vec(0u8..16, 0..64)) {
        let out: Vec<u8> = unique_everseen(items.iter().copied()).collect();

        let mut seen = HashSet::new();
        let expected: Vec<u8> = items.iter().copied().filter(|x| seen.insert(*x)).collect();
        prop_assert_eq!(&out, &expected);

        let distinct: HashSet<u8> = items.iter().copied().collect();
        prop_assert_eq!(out.len(), distinct.len());
    }

    /// A key function coarser than identity keeps the first member of each class
    #[test]
    fn test_unique_everseen_by_key(items in prop::collection::vec(0u32..1000, 0..64)) {
        let out: Vec<u32> = items.iter().copied().unique_everseen_by(|x| x % 10).collect();
        prop_assert!(out.len() <= 10);

        let classes: HashSet<u32> = out.iter().map(|x| x % 10).collect();
        prop_assert_eq!(classes.len(), out.len());
    }
}

// ============================================================================
// Identifiers
// ============================================================================

proptest! {
    /// Non-blank accessions lose every underscore, and formatting is stable
    #[test]
    fn test_format_accession_replaces_underscores(accession in "[A-Za-z][A-Za-z0-9_:]{0,20}") {
        let formatted = format_accession(&accession, None);
        prop_assert!(!formatted.contains('_'));
        prop_assert_eq!(formatted.len(), accession.len());
        prop_assert_eq!(format_accession(&formatted, None), formatted.clone());
    }

    /// Blank-node identifiers come back untouched
    #[test]
    fn test_format_accession_keeps_blank_nodes(rest in "[A-Za-z0-9_]{0,20}") {
        let blank = format!("_{}", rest);
        prop_assert_eq!(format_accession(&blank, None), blank);
    }

    /// Namespaced accessions reduce to PREFIX:LOCAL
    #[test]
    fn test_format_accession_strips_namespace(prefix in "[A-Z]{2,6}", local in "[0-9]{7}") {
        let mut ns = NamespaceMap::new();
        ns.insert("obo".to_string(), "http://purl.obolibrary.org/obo/".to_string());
        let uri = format!("http://purl.obolibrary.org/obo/{}_{}", prefix, local);
        prop_assert_eq!(format_accession(&uri, Some(&ns)), format!("{}:{}", prefix, local));
    }

    /// Known prefixes expand to Clark notation around the local part
    #[test]
    fn test_explicit_namespace_expansion(prefix in "[a-z]{1,8}", local in "[A-Za-z0-9:]{0,16}") {
        let mut ns = NamespaceMap::new();
        ns.insert(prefix.clone(), "http://example.org/ns#".to_string());
        let expanded = explicit_namespace(&format!("{}:{}", prefix, local), &ns)
            .expect("prefix is registered");
        prop_assert_eq!(expanded, format!("{{http://example.org/ns#}}{}", local));
    }
}

// ============================================================================
// Worker pool
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// map returns results in input order regardless of pool size
    #[test]
    fn test_map_matches_sequential(
        workers in 1usize..5,
        items in prop::collection::vec(any::<i32>(), 0..40)
    ) {
        let pool = WorkerPool::new(workers).expect("Failed to create pool");
        let out = pool
            .map(|x: i32| Ok(x.wrapping_mul(3)), items.clone())
            .expect("map failed");
        let expected: Vec<i32> = items.iter().map(|x| x.wrapping_mul(3)).collect();
        prop_assert_eq!(out, expected);
    }

    /// Every job submitted before close runs exactly once
    #[test]
    fn test_all_jobs_run_before_join(workers in 1usize..5, jobs in 0usize..50) {
        let pool = WorkerPool::new(workers).expect("Failed to create pool");
        for _ in 0..jobs {
            pool.execute(|| Ok(())).expect("Failed to submit job");
        }
        pool.close();
        pool.join().expect("Failed to join pool");
        prop_assert_eq!(pool.total_jobs_processed(), jobs as u64);
        prop_assert_eq!(pool.total_jobs_submitted(), jobs as u64);
    }
}
