use std::collections::BTreeMap;
use std::sync::Arc;

use dbhammer_core::{CallerBuckets, CallerRole, ProcedureMetadata};

/// Splits procedures into caller-role buckets.
///
/// A procedure lands in at most one bucket, chosen by case-insensitive match
/// of its caller tag. Untagged or unrecognized procedures appear only in the
/// full list.
pub fn partition(procedures: Vec<ProcedureMetadata>) -> CallerBuckets {
    let all: Vec<Arc<ProcedureMetadata>> = procedures.into_iter().map(Arc::new).collect();

    let mut by_role: BTreeMap<CallerRole, Vec<Arc<ProcedureMetadata>>> = CallerRole::ALL
        .into_iter()
        .map(|role| (role, Vec::new()))
        .collect();

    for procedure in &all {
        if let Some(role) = procedure.caller_role() {
            by_role.entry(role).or_default().push(Arc::clone(procedure));
        }
    }

    CallerBuckets::new(by_role, all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(name: &str, caller: Option<&str>) -> ProcedureMetadata {
        ProcedureMetadata::new(name, caller.map(str::to_string), Vec::new())
    }

    #[test]
    fn tags_are_matched_case_insensitively() {
        let buckets = partition(vec![
            proc("usp_a", Some("user")),
            proc("usp_b", Some("USER")),
            proc("usp_c", Some("Admin")),
            proc("usp_d", Some("batch")),
        ]);

        assert_eq!(buckets.bucket(CallerRole::User).len(), 2);
        assert_eq!(buckets.bucket(CallerRole::Admin).len(), 1);
        assert_eq!(buckets.bucket(CallerRole::Batch).len(), 1);
        assert_eq!(buckets.all().len(), 4);
    }

    #[test]
    fn unknown_and_missing_tags_only_in_full_list() {
        let buckets = partition(vec![proc("usp_a", Some("Reporting")), proc("usp_b", None)]);

        for role in CallerRole::ALL {
            assert!(buckets.bucket(role).is_empty());
        }
        assert_eq!(buckets.all().len(), 2);
    }

    #[test]
    fn buckets_share_the_catalog_snapshot() {
        let buckets = partition(vec![proc("usp_a", Some("User"))]);
        assert!(Arc::ptr_eq(
            &buckets.bucket(CallerRole::User)[0],
            &buckets.all()[0]
        ));
    }
}
