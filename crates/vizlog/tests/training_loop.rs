use serde_json::json;
use std::sync::Arc;
use vizlog::prelude::*;
use vizlog::VizlogError;

fn publish(host: &mut PluginHost, samples: u64, loss: f64) {
    let stats = host.stats_mut();
    stats
        .set_path(&"progress.samples_used".parse::<FieldPath>().unwrap(), json!(samples))
        .unwrap();
    stats
        .set_path(&"loss.last".parse::<FieldPath>().unwrap(), json!(loss))
        .unwrap();
}

#[test]
fn test_plot_logger_creates_once_then_appends() {
    let viz = Arc::new(RecordingVisdom::new());
    let mut host = PluginHost::new();
    host.register(Box::new(
        VisdomPlotLogger::new(
            viz.clone(),
            "line",
            LoggerConfig::new(["progress.samples_used", "loss.last"]).unwrap()
                .interval(Interval::every(2, Hook::Iteration)),
        )
        .unwrap(),
    ));

    for i in 1..=6u64 {
        publish(&mut host, i * 32, 1.0 / i as f64);
        host.call_hook(Hook::Iteration).unwrap();
    }

    let calls = viz.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_plot());
    for call in &calls[1..] {
        match call {
            VisdomCall::UpdateTrace { win, .. } => assert_eq!(win, "window_1"),
            other => panic!("expected trace update, got {:?}", other),
        }
    }
    match &calls[2] {
        VisdomCall::UpdateTrace { message, .. } => {
            assert_eq!(message["x"], json!([192.0]));
        }
        other => panic!("expected trace update, got {:?}", other),
    }
}

#[test]
fn test_epoch_triggers_one_save_per_logger() {
    let viz = Arc::new(RecordingVisdom::new());
    let mut host = PluginHost::new();
    host.register(Box::new(
        VisdomPlotLogger::new(
            viz.clone(),
            "scatter",
            LoggerConfig::new(["progress.samples_used", "loss.last"]).unwrap(),
        )
        .unwrap(),
    ));
    host.register(Box::new(
        VisdomLogger::new(
            viz.clone(),
            "histogram",
            LoggerConfig::new(["weights"]).unwrap().interval(Interval::every(1, Hook::Epoch)),
        )
        .unwrap(),
    ));

    publish(&mut host, 10, 0.5);
    host.stats_mut().insert("weights", json!([0.1, -0.2, 0.3, 0.05]));
    host.call_hook(Hook::Epoch).unwrap();

    assert_eq!(viz.plot_count(), 2);
    assert_eq!(viz.save_count(), 2);
}

#[test]
fn test_text_and_saver_together() {
    let viz = Arc::new(RecordingVisdom::new());
    let mut host = PluginHost::with_stats(
        Stats::from_value(json!({
            "loss": {
                "last": 0.25,
                "epoch_mean": 0.3,
                "log_iter_fields": ["{last:.3f}"],
                "log_epoch_fields": ["{epoch_mean:.3f}"]
            }
        }))
        .unwrap(),
    );
    host.register(Box::new(
        VisdomTextLogger::new(
            viz.clone(),
            LoggerConfig::new(["loss"]).unwrap().env("text_env"),
            "APPEND",
        )
        .unwrap(),
    ));
    host.register(Box::new(VisdomSaver::new(
        viz.clone(),
        Some(vec!["main".to_string(), "text_env".to_string()]),
        None,
    )));

    host.call_hook(Hook::Iteration).unwrap();
    host.call_hook(Hook::Epoch).unwrap();

    let saves: Vec<_> = viz.calls().into_iter().filter(|c| c.is_save()).collect();
    assert_eq!(
        saves,
        vec![
            VisdomCall::Save {
                envs: vec!["text_env".to_string()]
            },
            VisdomCall::Save {
                envs: vec!["main".to_string(), "text_env".to_string()]
            },
        ]
    );

    match viz.calls().iter().rev().find(|c| c.is_plot()) {
        Some(VisdomCall::Plot { message, env, .. }) => {
            let content = message["data"][0]["content"].as_str().unwrap();
            assert!(content.starts_with("loss: 0.250<br>####"));
            assert!(content.contains("Epoch summary:<br>loss: 0.300<br>"));
            assert_eq!(env.as_deref(), Some("text_env"));
        }
        other => panic!("expected text plot, got {:?}", other),
    }
}

#[test]
fn test_missing_stat_aborts_hook() {
    let viz = Arc::new(RecordingVisdom::new());
    let mut host = PluginHost::new();
    host.register(Box::new(
        VisdomPlotLogger::new(
            viz.clone(),
            "scatter",
            LoggerConfig::new(["progress.samples_used", "accuracy.top1"]).unwrap(),
        )
        .unwrap(),
    ));
    host.register(Box::new(VisdomSaver::new(viz.clone(), None, None)));

    publish(&mut host, 1, 1.0);
    let err = host.call_hook(Hook::Epoch).unwrap_err();
    assert!(matches!(err, VizlogError::FieldNotFound { ref key, .. } if key == "accuracy"));
    assert!(viz.calls().is_empty());
}

#[test]
fn test_logger_config_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logger.json");
    std::fs::write(
        &path,
        r#"{
            "fields": ["progress.samples_used", "loss.last"],
            "interval": [{ "every": 1, "hook": "iteration" }],
            "env": "from_file",
            "opts": { "title": "Loss", "markersize": 4 }
        }"#,
    )
    .unwrap();

    let config: LoggerConfig =
        serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    let viz = Arc::new(RecordingVisdom::new());
    let mut logger = VisdomPlotLogger::new(viz.clone(), "scatter", config).unwrap();
    logger
        .on_hook(
            Hook::Iteration,
            &Stats::from_value(json!({
                "progress": { "samples_used": 3 },
                "loss": { "last": 0.9 }
            }))
            .unwrap(),
        )
        .unwrap();

    match &viz.calls()[0] {
        VisdomCall::Plot { env, message, .. } => {
            assert_eq!(env.as_deref(), Some("from_file"));
            assert_eq!(message["data"][0]["marker"]["size"], json!(4));
            assert_eq!(message["layout"]["title"], json!("Loss"));
        }
        other => panic!("expected plot, got {:?}", other),
    }
}
