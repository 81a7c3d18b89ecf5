//! Synthesis benchmark
//!
//! Measures stack assembly, graph resolution and template rendering as the
//! number of cache users grows.
//!
//! ```bash
//! cargo bench --package rbac-synth
//! cargo bench --package rbac-synth -- assemble
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rbac_config::{AppConfig, ConsumerConfig, GrantConfig, RoleConfig, UserConfig};
use rbac_constructs::assemble;

/// Demo configuration widened to `users` users, each with its own role,
/// grant and consumer.
fn config_with_users(users: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.network.subnet_ids = vec!["subnet-0a".to_string(), "subnet-0b".to_string()];
    config.users.clear();
    config.roles.clear();
    config.grants.clear();
    config.consumers.clear();

    for i in 0..users {
        let user_id = format!("app-user-{}", i);
        let role = format!("appRole{}", i);
        config.users.push(
            UserConfig::new(format!("appUser{}RBAC", i), format!("app{}", i), user_id.clone())
                .with_access_string(format!("on ~app{}:* -@all +GET +SET", i)),
        );
        config.roles.push(RoleConfig::function_role(role.clone(), "benchmark role"));
        config.grants.push(GrantConfig::new(user_id.clone(), role.clone()));
        config.consumers.push(ConsumerConfig::new(format!("app{}Fn", i), role, user_id));
    }
    config
}

fn benchmark_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    for users in [3_usize, 10, 50] {
        let config = config_with_users(users);
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::new("users", users), &config, |b, config| {
            b.iter(|| assemble(black_box(config)));
        });
    }

    group.finish();
}

fn benchmark_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");

    for users in [3_usize, 10, 50] {
        let Ok(assembled) = assemble(&config_with_users(users)) else {
            continue;
        };
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::new("users", users), &assembled, |b, assembled| {
            b.iter(|| assembled.synthesize());
        });
    }

    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.sample_size(20);

    let Ok(template) = assemble(&config_with_users(50)).and_then(|a| a.synthesize()) else {
        return;
    };
    group.bench_function("json/compact", |b| b.iter(|| template.to_json_string(false)));
    group.bench_function("json/pretty", |b| b.iter(|| template.to_json_string(true)));

    group.finish();
}

criterion_group!(benches, benchmark_assemble, benchmark_synthesize, benchmark_render);
criterion_main!(benches);
