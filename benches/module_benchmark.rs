use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use tempfile::TempDir;
use tailwind_web_components::codegen::{generate_module, ModuleOptions};
use tailwind_web_components::{run_lifecycle, tailwind_web_components, PluginConfig, STYLESHEET_MODULE, Plugin};

/// Stylesheet with `rules` simple rules
fn stylesheet(rules: usize) -> String {
    (0..rules)
        .map(|i| format!(".rule-{i} {{ padding: {i}px; content: \"\\f{i:03}\"; }}\n"))
        .collect()
}

fn create_project(rules: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("postcss.config.json"), r#"{ "plugins": { "postcss-import": {} } }"#).unwrap();
    fs::write(dir.path().join("theme.css"), stylesheet(rules)).unwrap();
    dir
}

fn bench_generate_module(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_module");
    let options = ModuleOptions { inject_css: true, hot_update: true };

    for rules in [10, 100, 1000] {
        let css = stylesheet(rules);
        group.bench_with_input(BenchmarkId::from_parameter(rules), &css, |b, css| {
            b.iter(|| generate_module(black_box(css), options).unwrap());
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("load_module");

    for (mode, rules) in [("development", 100), ("production", 100), ("production", 1000)] {
        let project = create_project(rules);
        let mut plugins = tailwind_web_components(PluginConfig::new("theme.css"));
        runtime
            .block_on(run_lifecycle(&mut plugins.stylesheet, project.path(), mode, None))
            .unwrap();

        group.bench_function(BenchmarkId::new(mode, rules), |b| {
            b.iter(|| {
                runtime
                    .block_on(plugins.stylesheet.load(STYLESHEET_MODULE.internal()))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate_module, bench_load);
criterion_main!(benches);
