//! Combining algorithms
//!
//! Pure functions folding the outcomes of a PolicySet's children into a single
//! outcome. Children are supplied already ordered by [`by_priority`] and with
//! excluded children removed.

use arbiter_types::{CombiningAlgorithm, Outcome};

/// Counts of each outcome among the combined children
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    permit: usize,
    deny: usize,
    indeterminate_permit: usize,
    indeterminate_deny: usize,
    indeterminate_deny_permit: usize,
}

impl Tally {
    fn of(outcomes: &[Outcome]) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Permit => tally.permit += 1,
                Outcome::Deny => tally.deny += 1,
                Outcome::NotApplicable => {}
                Outcome::IndeterminatePermit => tally.indeterminate_permit += 1,
                Outcome::IndeterminateDeny => tally.indeterminate_deny += 1,
                Outcome::IndeterminateDenyPermit => tally.indeterminate_deny_permit += 1,
            }
        }
        tally
    }

    fn any_indeterminate(&self) -> bool {
        self.indeterminate_permit + self.indeterminate_deny + self.indeterminate_deny_permit > 0
    }
}

/// Fold child outcomes with the given algorithm.
///
/// `strict_unless` only affects DENY_UNLESS_PERMIT and PERMIT_UNLESS_DENY.
pub fn combine(algorithm: CombiningAlgorithm, outcomes: &[Outcome], strict_unless: bool) -> Outcome {
    match algorithm {
        CombiningAlgorithm::DenyOverrides => deny_overrides(outcomes),
        CombiningAlgorithm::PermitOverrides => permit_overrides(outcomes),
        CombiningAlgorithm::FirstApplicable => first_applicable(outcomes),
        CombiningAlgorithm::OnlyOneApplicable => only_one_applicable(outcomes),
        CombiningAlgorithm::DenyUnlessPermit => {
            unless(outcomes, Outcome::Permit, Outcome::Deny, strict_unless)
        }
        CombiningAlgorithm::PermitUnlessDeny => {
            unless(outcomes, Outcome::Deny, Outcome::Permit, strict_unless)
        }
    }
}

/// Outcome a PolicySet falls back to when its decision cannot stand, such as
/// when its own actions fail under `indeterminate_on_action_fail`.
pub fn indeterminate_fallback(algorithm: CombiningAlgorithm, strict_unless: bool) -> Outcome {
    match algorithm {
        CombiningAlgorithm::DenyOverrides
        | CombiningAlgorithm::PermitOverrides
        | CombiningAlgorithm::FirstApplicable => Outcome::IndeterminateDenyPermit,
        CombiningAlgorithm::OnlyOneApplicable => Outcome::NotApplicable,
        CombiningAlgorithm::DenyUnlessPermit | CombiningAlgorithm::PermitUnlessDeny => {
            if strict_unless {
                Outcome::IndeterminateDenyPermit
            } else {
                Outcome::Deny
            }
        }
    }
}

pub fn deny_overrides(outcomes: &[Outcome]) -> Outcome {
    let t = Tally::of(outcomes);
    if t.deny > 0 {
        Outcome::Deny
    } else if t.indeterminate_deny_permit > 0
        || (t.indeterminate_deny > 0 && (t.indeterminate_permit > 0 || t.permit > 0))
    {
        Outcome::IndeterminateDenyPermit
    } else if t.permit > 0 {
        Outcome::Permit
    } else if t.indeterminate_permit > 0 {
        Outcome::IndeterminatePermit
    } else if t.indeterminate_deny > 0 {
        Outcome::IndeterminateDeny
    } else {
        Outcome::NotApplicable
    }
}

pub fn permit_overrides(outcomes: &[Outcome]) -> Outcome {
    let t = Tally::of(outcomes);
    if t.permit > 0 {
        Outcome::Permit
    } else if t.indeterminate_deny_permit > 0
        || (t.indeterminate_permit > 0 && (t.indeterminate_deny > 0 || t.deny > 0))
    {
        Outcome::IndeterminateDenyPermit
    } else if t.deny > 0 {
        Outcome::Deny
    } else if t.indeterminate_permit > 0 {
        Outcome::IndeterminatePermit
    } else if t.indeterminate_deny > 0 {
        Outcome::IndeterminateDeny
    } else {
        Outcome::NotApplicable
    }
}

pub fn first_applicable(outcomes: &[Outcome]) -> Outcome {
    outcomes
        .iter()
        .copied()
        .find(Outcome::is_applicable)
        .unwrap_or(Outcome::NotApplicable)
}

pub fn only_one_applicable(outcomes: &[Outcome]) -> Outcome {
    let mut applicable = outcomes.iter().copied().filter(Outcome::is_applicable);
    match (applicable.next(), applicable.next()) {
        (None, _) => Outcome::NotApplicable,
        (Some(only), None) => only,
        (Some(_), Some(_)) => Outcome::IndeterminateDenyPermit,
    }
}

fn unless(outcomes: &[Outcome], overriding: Outcome, default: Outcome, strict: bool) -> Outcome {
    let t = Tally::of(outcomes);
    if outcomes.contains(&overriding) {
        overriding
    } else if strict && t.any_indeterminate() {
        Outcome::IndeterminateDenyPermit
    } else {
        default
    }
}

/// Indices of `priorities` in evaluation order: descending priority, absent
/// priorities counting as zero, ties kept in declaration order.
pub fn by_priority(priorities: &[Option<i64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..priorities.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(priorities[i].unwrap_or(0)));
    order
}
