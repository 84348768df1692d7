//! Evaluator hot-path benchmarks

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use lattice_authz::evaluator::Evaluator;
use lattice_authz::policy::InMemoryPolicyStore;
use lattice_authz::types::{Effect, PolicyRule};

fn build_evaluator(rule_count: usize) -> Evaluator {
    let mut rules = Vec::with_capacity(rule_count + 2);
    for i in 0..rule_count {
        rules.push(PolicyRule::permission(
            format!("user:{i}"),
            "hr",
            format!("hrm.resource{}", i % 50),
            "list",
            Effect::Allow,
        ));
    }
    rules.push(PolicyRule::role_assignment("user:alice", "hr", "role:manager"));
    rules.push(PolicyRule::permission(
        "role:manager",
        "hr",
        "hrm.employees",
        "edit",
        Effect::Allow,
    ));

    Evaluator::new(Arc::new(InMemoryPolicyStore::with_rules(rules)))
}

fn bench_decide(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    for rule_count in [100, 1_000, 10_000] {
        let evaluator = build_evaluator(rule_count);

        c.bench_function(&format!("decide_role_closure_{rule_count}_rules"), |b| {
            b.to_async(&rt).iter(|| {
                let evaluator = evaluator.clone();
                async move {
                    evaluator
                        .decide("user:alice", "hr", "hrm.employees", "edit")
                        .await
                        .expect("decision")
                }
            });
        });

        let cold = build_evaluator(rule_count);
        c.bench_function(&format!("decide_default_deny_{rule_count}_rules"), |b| {
            b.to_async(&rt).iter(|| {
                let evaluator = cold.clone();
                async move {
                    evaluator
                        .decide("user:nobody", "hr", "hrm.employees", "edit")
                        .await
                        .expect("decision")
                }
            });
        });
    }
}

criterion_group!(benches, bench_decide);
criterion_main!(benches);
