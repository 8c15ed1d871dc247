//! Grounded on the teacher's `benches/process-html-standard.rs`:
//! `divan::main()` plus a single `#[divan::bench]` function running the
//! full pipeline over a large input in a loop. The teacher benchmarks
//! against an external fixture (`data/html-standard.html`, a real-world
//! HTML document); no equivalent large-SWAN-template corpus exists in
//! this retrieval pack, so the input here is synthesized instead —
//! repeated nested elements, mustaches, and an `s-for` loop, the shapes
//! `tests/properties.rs`'s generator also produces, just flattened into
//! one large document rather than QuickCheck's many small ones.

use swan_parser::options::ParseOptions;
use swan_parser::parse;

fn main() {
    divan::main();
}

fn build_large_template(rows: usize) -> String {
    let mut out = String::with_capacity(rows * 96);
    out.push_str(r#"<view class="root">"#);
    out.push_str(r#"<view s-for="item, idx in items trackBy item.id">"#);
    for i in 0..rows {
        out.push_str(&format!(
            r#"<block s-if="{{{{idx % 2}}}}"><text bind:tap="onTap">{{{{item.name}}}} #{i}</text></block>"#
        ));
    }
    out.push_str("</view></view>");
    out
}

#[divan::bench(args = [100, 1_000, 5_000])]
fn bench_parse_large_template(bencher: divan::Bencher, rows: usize) {
    let input = build_large_template(rows);

    bencher.bench(|| {
        let doc = parse(&input, ParseOptions::default());
        std::hint::black_box(&doc);
    });
}
