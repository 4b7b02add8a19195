use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use llm_warden::engine::reconciler::PolicyReconciler;
use llm_warden::engine::rule_compiler;
use llm_warden::engine_core::models::{DomainRecord, OverridePolicy, Policy};
use llm_warden::host::codec::HostCodec;
use tokio_util::codec::Decoder;

fn bench_codec_decode(c: &mut Criterion) {
    let mut codec = HostCodec::new();
    let data = b"{\"type\":\"RULE_MATCHED\",\"matchedRuleId\":4,\"url\":\"https://claude.ai/\"}\n";

    c.bench_function("codec_decode_rule_matched", |b| {
        b.iter(|| {
            let mut src = BytesMut::from(&data[..]);
            let _ = codec.decode(black_box(&mut src));
        })
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let canonical: Vec<DomainRecord> = (0..1000)
        .map(|i| DomainRecord::new(format!("llm{}.example", i)))
        .collect();
    let overrides: Vec<OverridePolicy> = (0..100)
        .map(|i| OverridePolicy {
            id: 5000 + i,
            domain: format!("llm{}.example", i * 20),
            policy: if i % 2 == 0 { Policy::Block } else { Policy::Warn },
        })
        .collect();

    c.bench_function("reconcile_1000_domains_100_overrides", |b| {
        b.iter(|| PolicyReconciler::reconcile(black_box(&canonical), black_box(&overrides)))
    });

    let rules = PolicyReconciler::reconcile(&canonical, &overrides);
    c.bench_function("compile_1000_rules", |b| {
        b.iter(|| {
            black_box(&rules)
                .iter()
                .map(rule_compiler::compile)
                .collect::<Vec<_>>()
        })
    });
}

criterion_group!(benches, bench_codec_decode, bench_reconcile);
criterion_main!(benches);
