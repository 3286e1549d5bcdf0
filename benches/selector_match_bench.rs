use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use fastselect::config::set_bloom_hoist_enabled;
use fastselect::{NodeId, Session};

/// Builds a branching tree whose levels cycle through a few tags and a
/// bounded class vocabulary, roughly the shape selector-heavy pages have.
fn build_branching_tree(
  session: &mut Session,
  depth: usize,
  branching: usize,
  class_variants: usize,
) -> Vec<NodeId> {
  let tags: Vec<_> = ["section", "div", "article", "nav"]
    .iter()
    .map(|t| session.intern(t.as_bytes()).unwrap())
    .collect();
  let classes: Vec<_> = (0..class_variants)
    .map(|i| session.intern(format!("c{}", i).as_bytes()).unwrap())
    .collect();
  let leaf_class = session.intern(b"leaf").unwrap();

  let mut nodes = Vec::new();
  let mut spine = NodeId::NONE;
  for level in 0..depth {
    let node = session.create_element(tags[level % tags.len()], spine).unwrap();
    let primary = classes[level % class_variants];
    let secondary = classes[(level * 7) % class_variants];
    session.set_classes(node, &[primary, secondary]).unwrap();
    nodes.push(node);

    for branch in 1..branching {
      let leaf = session.create_element(tags[(level + branch) % tags.len()], node).unwrap();
      let c = classes[(level + branch * 5) % class_variants];
      session.set_classes(leaf, &[c, leaf_class]).unwrap();
      nodes.push(leaf);
    }
    spine = node;
  }
  nodes
}

fn bench_selector_matching(c: &mut Criterion) {
  let selectors = [
    "div",
    ".c1",
    ".c0 .leaf",
    "section div article .leaf",
    ".absent-class .leaf",
    "section > div > article",
    "nav ~ div .c2",
  ];

  let mut group = c.benchmark_group("selector_match");
  for hoist in [true, false] {
    set_bloom_hoist_enabled(hoist);
    let mut session = Session::new();
    let nodes = build_branching_tree(&mut session, 24, 6, 8);
    let compiled: Vec<u32> = selectors.iter().map(|s| session.compile(s).unwrap()).collect();

    let label = if hoist { "bloom_hoist" } else { "no_hoist" };
    group.bench_function(label, |b| {
      b.iter(|| {
        let mut matches = 0usize;
        for &node in &nodes {
          for &sel in &compiled {
            if session.matches(sel, node) == Some(true) {
              matches += 1;
            }
          }
        }
        black_box(matches)
      })
    });
  }
  group.finish();
  set_bloom_hoist_enabled(true);
}

fn bench_tree_construction(c: &mut Criterion) {
  c.bench_function("build_branching_tree", |b| {
    b.iter(|| {
      let mut session = Session::new();
      let nodes = build_branching_tree(&mut session, 24, 6, 8);
      black_box(nodes.len())
    })
  });
}

fn bench_compilation(c: &mut Criterion) {
  c.bench_function("compile_selectors", |b| {
    b.iter(|| {
      let mut session = Session::new();
      // Distinct sources so the compile cache never short-circuits.
      for i in 0..64 {
        let source = format!("section .c{} > div.leaf:nth-child(2n+1)", i);
        black_box(session.compile(&source).unwrap());
      }
    })
  });
}

criterion_group!(
  benches,
  bench_selector_matching,
  bench_tree_construction,
  bench_compilation
);
criterion_main!(benches);
