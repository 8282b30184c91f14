use pretty_assertions::assert_eq;
use sched_config::config::{CLEANUP_ACTION_NAME, ExecutorType, MASTER_NAMESPACE};
use sched_config::schedule::ScheduleKind;
use sched_config::{load_config, update_config, validate_config_mapping, validate_fragment};
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;

fn master_document(output_dir: &str) -> String {
    format!(
        r#"
MASTER:
  output_stream_dir: "{output_dir}"
  command_context:
    batch_dir: /tron/batch/test/foo
    python: /usr/bin/python
  time_zone: EST
  state_persistence:
    name: tron_state
    store_type: shelve
  nodes:
    - name: node0
      hostname: node0
    - name: node1
      hostname: node1
  node_pools:
    - name: NodePool
      nodes: [node0, node1]
  jobs:
    - name: test_job0
      node: node0
      schedule: "interval 20s"
      actions:
        - name: action
          command: command
      cleanup_action:
        command: command
    - name: test_job1
      node: node0
      schedule: "daily 00:30:00 MWF"
      allow_overlap: true
      time_zone: Pacific/Auckland
      actions:
        - name: action
          command: "%(python)s run.py"
          requires: [action1]
          expected_runtime: 2h
        - name: action1
          command: command
          expected_runtime: 2h
    - name: test_job3
      node: node1
      schedule: constant
      actions:
        - name: action
          command: command
        - name: action1
          command: command
        - name: action2
          command: "cd %(batch_dir)s && run --day %(shortdate-1)s"
          requires: [action, action1]
          node: node0
    - name: test_job4
      node: NodePool
      all_nodes: true
      enabled: false
      schedule: daily
      actions:
        - name: action
          command: command
    - name: test_job_mesos
      node: NodePool
      schedule: daily
      actions:
        - name: action_mesos
          command: test_command_mesos
          executor: mesos
          cpus: 0.1
          mem: 100
          mesos_address: the-master.mesos
          docker_image: "container:latest"
  services:
    - name: service0
      node: NodePool
      pid_file: "/var/run/%(name)s-%(instance_number)s.pid"
      command: "service_command0 %(batch_dir)s"
      monitor_interval: 20
      restart_interval: 60.5
"#
    )
}

fn named_document() -> &'static str {
    r#"
config_name: other
jobs:
  - name: other_job
    node: NodePool
    schedule: "cron */5 * * * *"
    actions:
      - name: action
        command: command
"#
}

#[test]
fn full_master_document() {
    let dir = tempfile::tempdir().unwrap();
    let container = load_config(&master_document(&dir.path().to_string_lossy())).unwrap();

    assert_eq!(container.job_names().len(), 5);
    assert_eq!(
        container.node_names(),
        BTreeSet::from(["node0", "node1", "NodePool"].map(String::from))
    );

    let master = container.master();
    assert_eq!(master.time_zone, Some(chrono_tz::EST));
    assert_eq!(master.command_context["python"], "/usr/bin/python");

    let job0 = container.get_job("test_job0").unwrap();
    assert_eq!(
        job0.schedule.kind,
        ScheduleKind::Interval {
            period: Duration::from_secs(20)
        }
    );
    assert_eq!(
        job0.cleanup_action.as_ref().unwrap().action().name,
        CLEANUP_ACTION_NAME
    );

    let job1 = container.get_job("MASTER.test_job1").unwrap();
    assert_eq!(job1.schedule.original, "daily 00:30:00 MWF");
    assert_eq!(job1.actions["action"].requires, vec!["action1"]);
    assert_eq!(
        job1.actions["action1"].expected_runtime,
        Duration::from_secs(7200)
    );
    assert!(job1.allow_overlap);

    let job4 = container.get_job("test_job4").unwrap();
    assert!(job4.all_nodes && !job4.enabled);

    let mesos = &container.get_job("test_job_mesos").unwrap().actions["action_mesos"];
    assert_eq!(mesos.executor, ExecutorType::Mesos);
    assert_eq!(
        mesos.mesos.as_ref().map(|m| m.docker_image.as_str()),
        Some("container:latest")
    );

    let service = container.get_service("service0").unwrap();
    assert_eq!(service.count, 1);
    assert_eq!(service.restart_interval, Some(60.5));
}

#[test]
fn round_trip_counts() {
    let nodes: Vec<_> = (0..4).map(|i| format!("node{i}")).collect();
    let pools = vec![
        json!({"name": "pool_a", "nodes": ["node0", "node1"]}),
        json!(["node2", "node3"]),
    ];
    let jobs: Vec<_> = (0..3)
        .map(|i| {
            json!({
                "name": format!("job{i}"),
                "node": "pool_a",
                "schedule": "interval 1h",
                "actions": [
                    {"name": "first", "command": "echo 1"},
                    {"name": "second", "command": "echo 2", "requires": ["first"]},
                ],
            })
        })
        .collect();
    let mapping = json!({
        "MASTER": {"nodes": nodes, "node_pools": pools, "jobs": jobs}
    });

    let text = serde_yaml::to_string(&mapping).unwrap();
    let container = load_config(&text).unwrap();
    assert_eq!(container.job_names().len(), 3);
    assert_eq!(container.node_names().len(), 4 + 2);
}

#[test]
fn multiple_namespaces() {
    let dir = tempfile::tempdir().unwrap();
    let master = master_document(&dir.path().to_string_lossy());
    let merged = update_config(&master, named_document()).unwrap();
    let container = load_config(&merged).unwrap();

    let names = container.job_names();
    assert!(names.contains("other.other_job"));
    assert!(names.contains("MASTER.test_job0"));
    assert_eq!(names.len(), 6);
    assert!(container.get_job("test_job0").is_some());
    assert!(container.get_job("other_job").is_none());
    assert_eq!(
        container.get_job("other.other_job").unwrap().namespace,
        "other"
    );
}

#[test]
fn missing_master_namespace() {
    let mapping = json!({"other": {"config_name": "other"}});
    let err = validate_config_mapping(mapping.as_object().unwrap()).unwrap_err();
    assert!(err.to_string().contains("requires a MASTER namespace"));
}

#[test]
fn revalidation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let text = master_document(&dir.path().to_string_lossy());
    let first = load_config(&text).unwrap();
    let second = load_config(&text).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.summary(), second.summary());
}

fn master_with_job(job: serde_json::Value) -> String {
    let mapping = json!({
        MASTER_NAMESPACE: {
            "nodes": ["node0"],
            "node_pools": [{"name": "pool0", "nodes": ["node0"]}],
            "jobs": [job],
        }
    });
    serde_yaml::to_string(&mapping).unwrap()
}

fn load_err(text: &str) -> String {
    load_config(text).unwrap_err().to_string()
}

#[test]
fn job_errors() {
    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
    })));
    assert!(err.contains("missing options: actions"), "{err}");

    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant", "actions": null,
    })));
    assert!(err.contains("actions` can't be empty"), "{err}");

    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [
            {"name": "a", "command": "c"},
            {"name": "a", "command": "c"},
        ],
    })));
    assert_eq!(err, "Action name a on job test_job0 used twice");

    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [{"name": "cleanup", "command": "c"}],
    })));
    assert!(err.contains("reserved for cleanup action"), "{err}");

    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node9", "schedule": "constant",
        "actions": [{"name": "a", "command": "c"}],
    })));
    assert!(err.contains("node9"), "{err}");
}

#[test]
fn dependency_errors() {
    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [
            {"name": "a1", "command": "c", "requires": ["a2"]},
            {"name": "a2", "command": "c", "requires": ["a1"]},
        ],
    })));
    assert!(err.contains("circular dependency"), "{err}");
    assert!(err.contains("a1") && err.contains("a2"), "{err}");

    let text = serde_yaml::to_string(&json!({
        "MASTER": {
            "nodes": ["node0"],
            "jobs": [
                {"name": "job_a", "node": "node0", "schedule": "constant",
                 "actions": [{"name": "a", "command": "c", "requires": ["b"]}]},
                {"name": "job_b", "node": "node0", "schedule": "constant",
                 "actions": [{"name": "b", "command": "c"}]},
            ],
        }
    }))
    .unwrap();
    let err = load_err(&text);
    assert!(err.contains("external dependency"), "{err}");
}

#[test]
fn cleanup_action_errors() {
    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [{"name": "a", "command": "c"}],
        "cleanup_action": {"name": "gone", "command": "c"},
    })));
    assert!(err.contains("cannot have custom names"), "{err}");

    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [{"name": "a", "command": "c"}],
        "cleanup_action": {"command": "c", "requires": ["a"]},
    })));
    assert!(err.contains("cannot have dependencies"), "{err}");
    assert!(err.contains(r#"["a"]"#), "{err}");
}

#[test]
fn nested_pool_names_both_pools() {
    let text = serde_yaml::to_string(&json!({
        "MASTER": {
            "nodes": ["node0"],
            "node_pools": [
                {"name": "inner", "nodes": ["node0"]},
                {"name": "outer", "nodes": ["inner"]},
            ],
        }
    }))
    .unwrap();
    let err = load_err(&text);
    assert!(err.contains("outer") && err.contains("inner"), "{err}");
}

#[test]
fn template_variables() {
    let err = load_err(&master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [{"name": "a", "command": "%(missing)s"}],
    })));
    assert!(err.contains("Unknown context variable"), "{err}");

    let ok = master_with_job(json!({
        "name": "test_job0", "node": "node0", "schedule": "constant",
        "actions": [{"name": "a", "command": "%(runid)s %(namespace)s"}],
    }));
    assert!(load_config(&ok).is_ok());
}

#[test]
fn filesystem_predicates() {
    let dir = tempfile::tempdir().unwrap();
    let key = dir.path().join("id_rsa");
    std::fs::write(&key, "private").unwrap();
    std::fs::write(dir.path().join("id_rsa.pub"), "public").unwrap();
    let hosts = dir.path().join("known_hosts");
    std::fs::write(&hosts, "").unwrap();

    let valid = serde_yaml::to_string(&json!({
        "MASTER": {
            "ssh_options": {
                "agent": true,
                "identities": [key.to_string_lossy()],
                "known_hosts_file": hosts.to_string_lossy(),
            },
        }
    }))
    .unwrap();
    let container = load_config(&valid).unwrap();
    assert!(container.master().ssh_options.agent);

    let missing = serde_yaml::to_string(&json!({
        "MASTER": {"ssh_options": {"known_hosts_file": "/does/not/exist"}}
    }))
    .unwrap();
    assert!(load_err(&missing).starts_with("Known hosts file /does/not/exist doesn't exist"));

    let bad_dir = serde_yaml::to_string(&json!({
        "MASTER": {"output_stream_dir": "/does/not/exist"}
    }))
    .unwrap();
    assert!(load_err(&bad_dir).contains("is not a directory"));
}

#[test]
fn fragment_update_skips_filesystem_checks() {
    let update = r#"
config_name: MASTER
output_stream_dir: /does/not/exist
ssh_options:
  known_hosts_file: /does/not/exist/known_hosts
nodes: [node0]
jobs:
  - name: job0
    node: node0
    schedule: constant
    actions:
      - name: action
        command: command
"#;
    let fragment = validate_fragment(update).unwrap();
    let master = fragment.as_master().unwrap();
    assert_eq!(
        master.output_stream_dir.as_deref(),
        Some("/does/not/exist")
    );

    let dir = tempfile::tempdir().unwrap();
    let original = master_document(&dir.path().to_string_lossy());
    let err = update_config(&original, update).unwrap_err().to_string();
    assert!(err.contains("is not a directory"), "{err}");
}

#[test]
fn dotted_long_and_unicode_names_are_rejected() {
    let long = "x".repeat(256);
    for name in ["a.b", "nöde", long.as_str()] {
        let err = load_err(&master_with_job(json!({
            "name": name, "node": "node0", "schedule": "constant",
            "actions": [{"name": "a", "command": "c"}],
        })));
        assert!(err.contains("is not a valid identifier"), "{err}");
    }
}

#[test]
fn overflowing_durations_are_config_errors() {
    let err = load_err(&master_with_job(json!({
        "name": "job0", "node": "node0",
        "schedule": "interval 18446744073709551615s 1s",
        "actions": [{"name": "a", "command": "c"}],
    })));
    assert!(err.starts_with("Invalid schedule at"), "{err}");

    let err = load_err(&master_with_job(json!({
        "name": "job0", "node": "node0", "schedule": "constant",
        "actions": [{"name": "a", "command": "c", "expected_runtime": "18446744073709551615s 1s"}],
    })));
    assert!(err.contains("is not a valid time delta"), "{err}");
}
