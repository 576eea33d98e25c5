use camino::Utf8Path;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geoipenrich::range_table::RangeTable;
use geoipenrich::{
    AsnResolver, CityResolver, EnrichmentConfig, GeoIpResolverEngine, Message, ResolveTimer,
};
use std::hint::black_box;
use std::sync::Arc;

// Generate a range table with one /16 per line, enough to make the binary search realistic
fn generate_range_table(count: usize) -> String {
    let mut text = String::from("# start_ip,end_ip,country_iso,country_name,region,city\n");
    for i in 0..count {
        let (a, b) = (1 + i / 256, i % 256);
        text.push_str(&format!(
            "{a}.{b}.0.0,{a}.{b}.255.255,C{},Country {i},Region {i},City {i}\n",
            i % 10
        ));
    }
    text
}

fn generate_records(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let public = format!("{}.{}.{}.{}", 1 + (i % 40), (i * 7) % 256, i % 256, 1);
            Message::new()
                .with_field("source_ip", public)
                .with_field("destination_ip", "10.1.2.3")
                .with_field("host_ip", "not an address")
                .with_field("message", format!("sample log line {i}"))
                .with_field("gl2_source_input", "5f1e0c")
        })
        .collect()
}

fn build_engine(config: &EnrichmentConfig, ranges: usize) -> GeoIpResolverEngine {
    let table = RangeTable::parse(Utf8Path::new("bench.txt"), &generate_range_table(ranges))
        .expect("valid range table");
    let timer = Arc::new(ResolveTimer::new());
    GeoIpResolverEngine::with_resolvers(
        config,
        CityResolver::new(Box::new(table), timer.clone()),
        AsnResolver::disabled(timer.clone()),
        timer,
    )
}

fn bench_filter(c: &mut Criterion) {
    let records = generate_records(1000);
    let strict = EnrichmentConfig::default().with_enabled(true);
    let legacy = strict.clone().with_enforce_schema(false);

    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Elements(records.len() as u64));

    for (name, config) in [("strict", &strict), ("legacy", &legacy)] {
        let engine = build_engine(config, 10_000);
        group.bench_with_input(BenchmarkId::from_parameter(name), &records, |b, records| {
            b.iter(|| {
                for record in records {
                    let mut msg = record.clone();
                    black_box(engine.filter(&mut msg));
                    black_box(msg);
                }
            })
        });
    }
    group.finish();
}

fn bench_disabled(c: &mut Criterion) {
    let records = generate_records(1000);
    let engine = GeoIpResolverEngine::new(&EnrichmentConfig::default());

    c.bench_function("filter_disabled", |b| {
        b.iter(|| {
            for record in &records {
                let mut msg = record.clone();
                black_box(engine.filter(&mut msg));
            }
        })
    });
}

criterion_group!(benches, bench_filter, bench_disabled);
criterion_main!(benches);
