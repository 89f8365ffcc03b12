//! Queue-driven application of rule templates to a fixed reactant set.

use std::collections::VecDeque;

use log::debug;

use super::config::GenerationLimits;
use crate::chem::{StructureError, StructureOps};
use crate::model::reaction::{ReactionRecord, RuleTemplate};

/// Verdict for one candidate produced by a rule task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Keep the candidate and continue with the task.
    Accept,
    /// Drop the candidate and continue with the task.
    Skip,
    /// Keep the candidate and close the task.
    Finish,
}

/// Decides which candidates the engine keeps and when it stops.
pub trait CapPolicy {
    /// Whether another rule task may start after `accepted` candidates.
    fn open_task(&self, accepted: usize) -> bool;

    /// Verdict for a candidate, given how many the current task and the whole
    /// run have accepted so far.
    fn admit(&self, duplicate: bool, task_accepted: usize, accepted: usize) -> Admission;
}

/// Per-rule `limit` plus a global cap of `max_decoys` + headroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCaps {
    limit: usize,
    cap: usize,
}

impl RuleCaps {
    pub fn new(limits: &GenerationLimits) -> Self {
        Self {
            limit: limits.limit,
            cap: limits.candidate_cap(),
        }
    }
}

impl CapPolicy for RuleCaps {
    fn open_task(&self, accepted: usize) -> bool {
        accepted < self.cap
    }

    fn admit(&self, duplicate: bool, task_accepted: usize, accepted: usize) -> Admission {
        if duplicate {
            return Admission::Skip;
        }
        let task_full = task_accepted + 1 >= self.limit;
        let run_full = accepted + task_accepted + 1 >= self.cap;
        if task_full || run_full {
            Admission::Finish
        } else {
            Admission::Accept
        }
    }
}

/// Applies rule templates in order, one task per rule, under a [`CapPolicy`].
///
/// Candidates equal to one already kept (in the same task or earlier) are
/// skipped. A task whose matching fails is abandoned with no results.
pub struct RuleApplicationEngine<'a, S, P = RuleCaps> {
    ops: &'a S,
    policy: P,
}

impl<'a, S: StructureOps> RuleApplicationEngine<'a, S> {
    pub fn new(ops: &'a S, limits: &GenerationLimits) -> Self {
        Self::with_policy(ops, RuleCaps::new(limits))
    }
}

impl<'a, S: StructureOps, P: CapPolicy> RuleApplicationEngine<'a, S, P> {
    pub fn with_policy(ops: &'a S, policy: P) -> Self {
        Self { ops, policy }
    }

    pub fn apply(
        &self,
        reactants: &[S::Molecule],
        rules: &[RuleTemplate<S::Query>],
    ) -> Vec<ReactionRecord<S::Molecule>> {
        let mut queue: VecDeque<&RuleTemplate<S::Query>> = rules.iter().collect();
        let mut accepted = Vec::new();

        while self.policy.open_task(accepted.len()) {
            let Some(rule) = queue.pop_front() else {
                break;
            };
            match self.run_task(rule, reactants, &accepted) {
                Ok(local) => accepted.extend(local),
                Err(e) => debug!(
                    "Abandoned rule task for reaction {}: {e}",
                    rule.reaction_id()
                ),
            }
        }

        accepted
    }

    fn run_task(
        &self,
        rule: &RuleTemplate<S::Query>,
        reactants: &[S::Molecule],
        accepted: &[ReactionRecord<S::Molecule>],
    ) -> Result<Vec<ReactionRecord<S::Molecule>>, StructureError> {
        let mut local = Vec::new();
        for candidate in self.ops.apply_rule(rule, reactants)? {
            let candidate = candidate?;
            let duplicate = local.contains(&candidate) || accepted.contains(&candidate);
            match self.policy.admit(duplicate, local.len(), accepted.len()) {
                Admission::Skip => {}
                Admission::Accept => local.push(candidate),
                Admission::Finish => {
                    local.push(candidate);
                    break;
                }
            }
        }
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::fixtures::*;
    use crate::chem::graph::{GraphChemistry, Molecule};

    fn caps(max_decoys: usize, limit: usize) -> GenerationLimits {
        GenerationLimits { max_decoys, limit }
    }

    /// Three copies of ethyl bromide next to one hydroxide give three
    /// distinct substitution products for the SN2 template.
    fn crowded_reactants() -> Vec<Molecule> {
        vec![
            bromoethane(1, 2, 3),
            bromoethane(4, 5, 6),
            bromoethane(7, 8, 9),
            hydroxide(10),
        ]
    }

    #[test]
    fn rule_caps_verdicts() {
        let policy = RuleCaps::new(&caps(5, 2));
        assert_eq!(policy.admit(true, 0, 0), Admission::Skip);
        assert_eq!(policy.admit(false, 0, 0), Admission::Accept);
        assert_eq!(policy.admit(false, 1, 0), Admission::Finish);
        assert_eq!(policy.admit(false, 0, 14), Admission::Finish);
        assert!(policy.open_task(14));
        assert!(!policy.open_task(15));
    }

    #[test]
    fn per_rule_limit_is_respected() {
        let chem = GraphChemistry::new();
        let engine = RuleApplicationEngine::new(&chem, &caps(50, 2));
        let results = engine.apply(&crowded_reactants(), &[sn2_template(1)]);
        assert_eq!(results.len(), 2);
        assert_ne!(results[0], results[1]);
    }

    #[test]
    fn duplicate_candidates_across_rules_are_skipped() {
        let chem = GraphChemistry::new();
        let engine = RuleApplicationEngine::new(&chem, &caps(50, 5));
        let results = engine.apply(&crowded_reactants(), &[sn2_template(1), sn2_template(1)]);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn distinct_metadata_makes_distinct_candidates() {
        let chem = GraphChemistry::new();
        let engine = RuleApplicationEngine::new(&chem, &caps(50, 5));
        let results = engine.apply(&crowded_reactants(), &[sn2_template(1), sn2_template(2)]);
        assert_eq!(results.len(), 6);
        assert!(results[..3].iter().all(|r| r.rule_id() == Some(1)));
        assert!(results[3..].iter().all(|r| r.rule_id() == Some(2)));
    }

    #[test]
    fn global_cap_stops_the_queue() {
        let chem = GraphChemistry::new();
        let limits = caps(1, 5);
        let engine = RuleApplicationEngine::new(&chem, &limits);
        let rules: Vec<_> = (0..10).map(sn2_template).collect();

        let results = engine.apply(&crowded_reactants(), &rules);
        assert_eq!(results.len(), limits.candidate_cap());
        assert!(results.len() <= limits.max_decoys + 10);
    }

    #[test]
    fn failing_rule_task_is_abandoned() {
        let chem = GraphChemistry::new();
        let engine = RuleApplicationEngine::new(&chem, &caps(50, 5));
        let mut broken = sn2_template(9);
        broken.products[0].add_bond(1, 42, crate::chem::graph::BondOrder::Single);

        let results = engine.apply(&crowded_reactants(), &[broken, sn2_template(1)]);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.rule_id() == Some(1)));
    }

    #[test]
    fn no_rules_no_candidates() {
        let chem = GraphChemistry::new();
        let engine = RuleApplicationEngine::new(&chem, &caps(50, 5));
        assert!(engine.apply(&crowded_reactants(), &[]).is_empty());
    }
}
