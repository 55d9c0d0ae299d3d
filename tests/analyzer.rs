use std::thread;

use hipot_analyzer::config::AnalyzerConfig;
use hipot_analyzer::{synthetic, Analyzer, AnalyzerError, ModelConfig, RawSession};

fn small_config() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.model = ModelConfig {
        hidden_dim: 6,
        num_layers: 1,
        latent_dim: 3,
        head_widths: vec![4],
        classifier_widths: vec![4],
        seed: 7,
    };
    config.training.epochs = 4;
    config.training.batch_size = 2;
    config.analysis.max_sequence_len = 32;
    config.preprocessing.n_trees = 25;
    config
}

fn training_sessions() -> Vec<RawSession> {
    (0..3).map(|i| synthetic::sample_session(100 + i, 80)).collect()
}

#[test]
fn train_then_analyze() {
    let analyzer = Analyzer::new(small_config()).unwrap();
    let summary = analyzer.train(&training_sessions()).unwrap();
    assert_eq!(summary.sessions, 3);
    assert_eq!(summary.generation, 1);
    assert!(summary.outcome.final_loss.is_finite());
    assert!(summary.baseline_samples > 0 && summary.baseline_samples <= 80);

    let report = analyzer.analyze(&synthetic::sample_session(500, 80)).unwrap();
    let acc = report.accuracy_metrics;
    for score in [acc.pattern_similarity, acc.statistical_match, acc.temporal_consistency, acc.overall_accuracy] {
        assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
    }
    assert!(report.session_summary.count <= 80);
    assert!(report.defect_metrics.total_tests > 0);
    assert!(!report.recommendations.is_empty());

    let stats = analyzer.statistics();
    assert!(stats.initialized);
    assert_eq!(stats.generation, Some(1));
    assert_eq!(stats.sequence_len, Some(summary.outcome.sequence_len));
}

#[test]
fn analysis_requires_a_trained_model() {
    let analyzer = Analyzer::new(small_config()).unwrap();
    let err = analyzer.analyze(&synthetic::sample_session(1, 40)).unwrap_err();
    assert!(matches!(err, AnalyzerError::NotInitialized(_)));
}

#[test]
fn checkpoint_round_trip_reproduces_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hipot.json");
    let probe = synthetic::sample_session(900, 80);

    let trained = Analyzer::new(small_config()).unwrap();
    trained.train(&training_sessions()).unwrap();
    trained.save_checkpoint(&path).unwrap();
    let expected = trained.analyze(&probe).unwrap();

    let restored = Analyzer::from_checkpoint(small_config(), &path).unwrap();
    let actual = restored.analyze(&probe).unwrap();

    assert_eq!(actual.accuracy_metrics, expected.accuracy_metrics);
    assert_eq!(actual.defect_metrics, expected.defect_metrics);
    assert_eq!(actual.session_summary, expected.session_summary);
    assert_eq!(actual.model_diagnostics, expected.model_diagnostics);
    assert_eq!(restored.statistics().baseline_statistics, trained.statistics().baseline_statistics);
}

#[test]
fn failed_retrain_keeps_previous_baseline() {
    let analyzer = Analyzer::new(small_config()).unwrap();
    analyzer.train(&training_sessions()).unwrap();
    let before = analyzer.statistics();

    assert!(matches!(analyzer.train(&[]), Err(AnalyzerError::EmptyTrainingSet)));

    let ragged = RawSession {
        time: vec![0.0, 0.1],
        voltage: vec![1000.0],
        current: vec![0.001, 0.001],
        resistance: vec![1e6, 1e6],
    };
    assert!(matches!(analyzer.train(&[ragged]), Err(AnalyzerError::Validation(_))));

    assert_eq!(analyzer.statistics(), before);
    assert!(analyzer.analyze(&synthetic::sample_session(3, 60)).is_ok());
}

#[test]
fn training_stops_after_patience_runs_out() {
    let mut config = small_config();
    config.training.learning_rate = 0.0;
    config.training.epochs = 50;
    config.training.early_stopping_patience = 3;

    let analyzer = Analyzer::new(config).unwrap();
    // a single session keeps every epoch's loss bit-identical
    let summary = analyzer.train(&[synthetic::sample_session(100, 80)]).unwrap();
    // epoch 1 sets the best loss; nothing improves after it
    assert_eq!(summary.outcome.epochs_completed, 4);
    assert_eq!(summary.outcome.best_epoch, 1);
    assert!(summary.outcome.stopped_early);
}

#[test]
fn timed_out_analysis_leaves_state_untouched() {
    let mut config = small_config();
    config.analysis.timeout_ms = 0;
    let analyzer = Analyzer::new(config).unwrap();
    analyzer.train(&training_sessions()).unwrap();
    let before = analyzer.statistics();

    let err = analyzer.analyze(&synthetic::sample_session(4, 20_000)).unwrap_err();
    assert!(matches!(err, AnalyzerError::Timeout { timeout_ms: 0 }));
    assert_eq!(analyzer.statistics(), before);
    assert!(analyzer.export_checkpoint().is_ok());
}

#[test]
fn concurrent_analysis_shares_one_baseline() {
    let analyzer = Analyzer::new(small_config()).unwrap();
    analyzer.train(&training_sessions()).unwrap();
    let probe = synthetic::sample_session(42, 80);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let analyzer = analyzer.clone();
            let probe = probe.clone();
            thread::spawn(move || analyzer.analyze(&probe).unwrap().accuracy_metrics)
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn retraining_bumps_the_generation_and_clears_cached_reports() {
    let analyzer = Analyzer::new(small_config()).unwrap();
    analyzer.train(&training_sessions()).unwrap();
    let probe = synthetic::sample_session(8, 60);
    let first = analyzer.analyze(&probe).unwrap();

    let summary = analyzer.train(&[synthetic::sample_session(77, 60)]).unwrap();
    assert_eq!(summary.generation, 2);
    let second = analyzer.analyze(&probe).unwrap();
    assert!(second.timestamp >= first.timestamp);
    assert_eq!(analyzer.statistics().generation, Some(2));
}
