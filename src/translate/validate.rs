//! Post-build checks over member collections: unique names, unique
//! ordinals, and dense struct ordinals.

use std::collections::HashSet;

use crate::diagnostics::TranslateError;

use super::ordinals::{check_dense, duplicate_ordinals};
use super::Diagnostics;

pub(crate) struct Member {
    pub name: String,
    pub ordinal: u32,
    pub line: u32,
}

/// One ordinal-bearing collection: struct or union fields, interface
/// methods, or a method's (response) parameters.
pub(crate) struct MemberSet {
    pub scope: String,
    pub line: u32,
    pub dense: bool,
    pub members: Vec<Member>,
}

pub(crate) fn validate_members(sets: &[MemberSet], diags: &mut Diagnostics) {
    for set in sets {
        let mut names = HashSet::new();
        for member in &set.members {
            if !names.insert(member.name.as_str()) {
                diags.push(
                    member.line,
                    TranslateError::DuplicateDeclaration {
                        name: member.name.clone(),
                        scope: set.scope.clone(),
                    },
                );
            }
        }

        let duplicates = duplicate_ordinals(
            set.members.iter().map(|m| (m.name.as_str(), m.ordinal)),
            &set.scope,
        );
        let has_duplicates = !duplicates.is_empty();
        for (index, error) in duplicates {
            diags.push(set.members[index].line, error);
        }

        if set.dense && !has_duplicates {
            let ordinals: Vec<u32> = set.members.iter().map(|m| m.ordinal).collect();
            if let Err(error) = check_dense(&ordinals, &set.scope) {
                diags.push(set.line, error);
            }
        }
    }
}
