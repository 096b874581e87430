//! Ordinal assignment and checks.

use std::collections::HashSet;

use crate::diagnostics::TranslateError;

/// Give every item a wire position. Explicit ordinals are kept; an implicit
/// one is the previous item's assigned ordinal plus one, starting at 0.
pub fn assign_ordinals(explicit: &[Option<u32>]) -> Vec<u32> {
    let mut next = 0u32;
    explicit
        .iter()
        .map(|ordinal| {
            let assigned = ordinal.unwrap_or(next);
            next = assigned.saturating_add(1);
            assigned
        })
        .collect()
}

/// Every ordinal reused within one collection, reported against the later item.
pub fn duplicate_ordinals<'a>(
    items: impl IntoIterator<Item = (&'a str, u32)>,
    scope: &str,
) -> Vec<(usize, TranslateError)> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .enumerate()
        .filter(|(_, (_, ordinal))| !seen.insert(*ordinal))
        .map(|(index, (name, ordinal))| {
            (
                index,
                TranslateError::DuplicateOrdinal {
                    ordinal,
                    name: name.to_string(),
                    scope: scope.to_string(),
                },
            )
        })
        .collect()
}

/// Struct ordinals must cover `0..n` exactly; returns the first gap.
pub fn check_dense(ordinals: &[u32], scope: &str) -> Result<(), TranslateError> {
    let present: HashSet<u32> = ordinals.iter().copied().collect();
    match (0..ordinals.len() as u32).find(|o| !present.contains(o)) {
        Some(missing) => Err(TranslateError::NonDenseOrdinals {
            scope: scope.to_string(),
            missing,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_explicit_jump_continues() {
        assert_eq!(assign_ordinals(&[None, None, Some(10), None]), vec![0, 1, 10, 11]);
    }

    #[test]
    fn test_backwards_explicit_ordinal() {
        assert_eq!(assign_ordinals(&[Some(3), None, Some(0), None]), vec![3, 4, 0, 1]);
        assert!(assign_ordinals(&[]).is_empty());
    }

    #[test]
    fn test_duplicate_ordinals_reported_on_later_item() {
        let errors = duplicate_ordinals([("a", 0), ("b", 1), ("c", 1)], "struct S");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 2);
        assert_eq!(
            errors[0].1.to_string(),
            "ordinal @1 of 'c' is already used in struct S"
        );
    }

    #[test]
    fn test_dense_check() {
        assert!(check_dense(&[1, 0, 2], "struct S").is_ok());
        let err = check_dense(&[0, 1, 10, 11], "struct S").unwrap_err();
        assert!(matches!(err, TranslateError::NonDenseOrdinals { missing: 2, .. }));
    }

    proptest! {
        #[test]
        fn prop_all_implicit_is_sequential(n in 0usize..64) {
            let assigned = assign_ordinals(&vec![None; n]);
            prop_assert_eq!(assigned, (0..n as u32).collect::<Vec<_>>());
        }

        #[test]
        fn prop_explicit_kept_and_implicit_follow(
            input in prop::collection::vec(prop::option::of(0u32..1000), 0..32)
        ) {
            let assigned = assign_ordinals(&input);
            prop_assert_eq!(assigned.len(), input.len());
            for (i, (given, got)) in input.iter().zip(&assigned).enumerate() {
                match given {
                    Some(explicit) => prop_assert_eq!(got, explicit),
                    None if i == 0 => prop_assert_eq!(*got, 0),
                    None => prop_assert_eq!(*got, assigned[i - 1] + 1),
                }
            }
        }
    }
}
