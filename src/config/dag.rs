//! Action dependency graph of a single job.
//!
//! Runs after every action of the job has been validated on its own:
//! - action names are unique within the job
//! - every `requires` entry names an action of the same job
//! - the `requires` edges are acyclic

use crate::Result;
use crate::config::action::Action;
use crate::config_bail;

use std::collections::BTreeMap;

/// Index `actions` by name, rejecting duplicates.
pub fn index_actions(job: &str, actions: Vec<Action>) -> Result<BTreeMap<String, Action>> {
    let mut by_name = BTreeMap::<String, Action>::new();
    for action in actions {
        if by_name.contains_key(&action.name) {
            config_bail!("Action name {} on job {} used twice", action.name, job);
        }
        by_name.insert(action.name.clone(), action);
    }
    Ok(by_name)
}

/// Check that `requires` edges stay inside the job and form a DAG.
pub fn validate_action_graph(job: &str, actions: &BTreeMap<String, Action>) -> Result<()> {
    for action in actions.values() {
        if let Some(dep) = action.requires.iter().find(|d| !actions.contains_key(*d)) {
            config_bail!(
                "Action jobs.{}.{} contains external dependency {}",
                job,
                action.name,
                dep
            );
        }
    }

    #[derive(Copy, Clone, PartialEq, Eq)]
    enum Mark {
        Temp,
        Perm,
    }

    fn dfs<'a>(
        job: &str,
        v: &'a str,
        actions: &'a BTreeMap<String, Action>,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(v) {
            Some(Mark::Perm) => return Ok(()),
            Some(Mark::Temp) => {
                // v is on the current path; report the loop from its first visit.
                let start = stack.iter().position(|s| *s == v).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(v);
                config_bail!(
                    "Job {} contains circular dependency: {}",
                    job,
                    cycle.join(" -> ")
                );
            }
            None => {}
        }

        marks.insert(v, Mark::Temp);
        stack.push(v);

        if let Some(action) = actions.get(v) {
            for dep in &action.requires {
                dfs(job, dep, actions, marks, stack)?;
            }
        }

        stack.pop();
        marks.insert(v, Mark::Perm);
        Ok(())
    }

    let mut marks = BTreeMap::<&str, Mark>::new();
    let mut stack = Vec::<&str>::new();
    for name in actions.keys() {
        stack.clear();
        dfs(job, name, actions, &mut marks, &mut stack)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::action::{DEFAULT_EXPECTED_RUNTIME, ExecutorType};

    fn action(name: &str, requires: &[&str]) -> Action {
        Action {
            name: name.to_string(),
            command: "echo".to_string(),
            executor: ExecutorType::Ssh,
            requires: requires.iter().map(|r| r.to_string()).collect(),
            node: None,
            expected_runtime: DEFAULT_EXPECTED_RUNTIME,
            retries: None,
            retries_delay: None,
            trigger_downstreams: None,
            mesos: None,
        }
    }

    fn graph(actions: Vec<Action>) -> BTreeMap<String, Action> {
        index_actions("job", actions).unwrap()
    }

    #[test]
    fn duplicate_names() {
        let err = index_actions("test_job0", vec![action("a", &[]), action("a", &[])]).unwrap_err();
        assert_eq!(err.to_string(), "Action name a on job test_job0 used twice");
    }

    #[test]
    fn diamond_is_fine() {
        let actions = graph(vec![
            action("a", &[]),
            action("b", &["a"]),
            action("c", &["a"]),
            action("d", &["b", "c"]),
        ]);
        assert!(validate_action_graph("job", &actions).is_ok());
    }

    #[test]
    fn external_dependency() {
        let actions = graph(vec![action("a", &["elsewhere"])]);
        let err = validate_action_graph("job", &actions).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Action jobs.job.a contains external dependency elsewhere"
        );
    }

    #[test]
    fn two_node_cycle() {
        let actions = graph(vec![action("a1", &["a2"]), action("a2", &["a1"])]);
        let err = validate_action_graph("job", &actions).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Job job contains circular dependency: a1 -> a2 -> a1"
        );
    }

    #[test]
    fn self_loop() {
        let actions = graph(vec![action("a", &["a"])]);
        let err = validate_action_graph("job", &actions).unwrap_err();
        assert_eq!(err.to_string(), "Job job contains circular dependency: a -> a");
    }

    #[test]
    fn cycle_reported_without_its_entry_path() {
        let actions = graph(vec![
            action("a", &["b"]),
            action("b", &["c"]),
            action("c", &["b"]),
        ]);
        let err = validate_action_graph("job", &actions).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Job job contains circular dependency: b -> c -> b"
        );
    }
}
