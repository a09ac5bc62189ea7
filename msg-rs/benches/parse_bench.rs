use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chatmsg::grammar::{TokenPattern, Wildcard};
use chatmsg::memory::World;
use chatmsg::message::Pipeline;
use chatmsg::services::Sender;
use chatmsg::var::Settings;
use chatmsg::{Context, Engine};

fn make_engine() -> Engine {
    let mut world = World::new();
    world.stats_mut().viewers = 42;
    world.stats_mut().game = Some("Chess".into());
    let world = Arc::new(world);
    Engine::new(world.services(), Settings::default()).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let engine = make_engine();
    let ctx = Context::new(Sender::new("ann", "1")).with_param("bob");

    let literal = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let globals = "$viewers viewers are watching $game with $sender";
    let mixed = "$touser: (if 2>1|heads|tails), rolled (random.number-1-to-6), (math.6*7) (list.alias)";

    let mut g = c.benchmark_group("parse");
    g.bench_function("literal", |b| {
        b.iter(|| rt.block_on(engine.parse(black_box(&literal), &ctx)))
    });
    g.bench_function("globals", |b| {
        b.iter(|| rt.block_on(engine.parse(black_box(globals), &ctx)))
    });
    g.bench_function("mixed", |b| {
        b.iter(|| rt.block_on(engine.parse(black_box(mixed), &ctx)))
    });
    g.finish();
}

fn bench_grammar(c: &mut Criterion) {
    let hay = "hello (random.number-1-to-6) and (random.number-10-to-20) ".repeat(50);
    let pattern = TokenPattern::new("(random.number-#-to-#)", Wildcard::Lazy).unwrap();

    let mut g = c.benchmark_group("grammar");
    g.bench_function("pipeline_build", |b| b.iter(Pipeline::standard));
    g.bench_function("find_all", |b| {
        b.iter(|| pattern.find_all(black_box(&hay)))
    });
    g.finish();
}

criterion_group!(benches, bench_parse, bench_grammar);
criterion_main!(benches);
