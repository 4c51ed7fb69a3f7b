use super::*;
use crate::config::BuildConfig;
use crate::tasks::tests::{MANIFEST, Site};
use TaskId::*;

#[test]
fn test_task_names_round_trip() {
    for task in TaskId::ALL {
        assert_eq!(task.name().parse::<TaskId>().unwrap(), task);
    }
}

#[test]
fn test_unknown_task() {
    let err = "deploy".parse::<TaskId>().unwrap_err();
    assert!(matches!(err, BuildError::UnknownTask(ref name) if name == "deploy"));
}

#[test]
fn test_plan_build_levels() {
    let levels = TaskGraph::standard().plan(Build).unwrap();
    assert_eq!(
        levels,
        vec![
            vec![Inject, Lint, Preprocess, Fonts, Images],
            vec![Styles, Scripts],
            vec![Rewrite],
            vec![Build],
        ]
    );
}

#[test]
fn test_plan_only_includes_closure() {
    let graph = TaskGraph::standard();
    assert_eq!(graph.plan(Styles).unwrap(), vec![vec![Inject], vec![Styles]]);
    assert_eq!(graph.plan(Clean).unwrap(), vec![vec![Clean]]);
    assert_eq!(
        graph.plan_all(&[Styles, Fonts]).unwrap(),
        vec![vec![Inject, Fonts], vec![Styles]]
    );
}

#[test]
fn test_plan_detects_cycle() {
    let mut graph = TaskGraph::new();
    graph.add(Styles, &[Inject]);
    graph.add(Inject, &[Styles]);
    graph.add(Build, &[Styles, Fonts]);

    let err = graph.plan(Build).unwrap_err();
    let BuildError::Cycle(tasks) = err else {
        panic!("expected a cycle, got {err:?}");
    };
    assert!(tasks.contains(&Styles) && tasks.contains(&Inject));
    assert!(!tasks.contains(&Fonts));
}

#[test]
fn test_run_build_end_to_end() {
    let site = Site::new();
    site.write("assets/styles/a.css", ".a { color: red; }\n");
    site.write("assets/scripts/app.js", "var a = 1;\n");
    site.write("assets/fonts/icons.woff", "font");
    site.write("templates/base.html", "<link href=\"/static/dist/styles/main.css\">");
    let ctx = site.context(MANIFEST, BuildConfig::PRODUCTION);

    run_default(&ctx, &TaskGraph::standard()).unwrap();

    assert!(site.path("static/dist/fonts/icons.woff").exists());
    let html = site.read("templates/base.html");
    assert!(html.contains("styles/main-"), "{html}");
}

#[test]
fn test_failure_stops_run() {
    let site = Site::new();
    site.write("assets/scripts/app.js", "var = ;\n");
    site.write("templates/base.html", "<script src=\"scripts/main.js\"></script>");
    let ctx = site.context(MANIFEST, BuildConfig::PRODUCTION);

    let err = run(&ctx, &TaskGraph::standard(), Build).unwrap_err();
    assert!(matches!(err, BuildError::Task { task: Lint, .. }), "{err:?}");
    assert_eq!(
        site.read("templates/base.html"),
        "<script src=\"scripts/main.js\"></script>"
    );
}

#[test]
fn test_clean_runs_before_build() {
    let site = Site::new();
    site.write("static/dist/stale.txt", "old");
    let ctx = site.context(MANIFEST, BuildConfig::PRODUCTION);

    run_default(&ctx, &TaskGraph::standard()).unwrap();
    assert!(!site.path("static/dist/stale.txt").exists());
}
