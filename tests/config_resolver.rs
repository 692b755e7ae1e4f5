// tests/config_resolver.rs
use std::fs;

use sentiment_poller::config::{
    active_sources, ConfigResolver, ProcessEnv, QueueSettings, SecretsDir, StaticValues,
};
use sentiment_poller::{ConfigError, Source};
use serial_test::serial;

#[test]
fn secret_file_beats_environment_value() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("RABBITMQ_PASS"), "from-vault\n").unwrap();
    let cfg = ConfigResolver::new(
        SecretsDir::new(tmp.path()),
        StaticValues::new()
            .with("RABBITMQ_PASS", "from-env")
            .with("RABBITMQ_USER", "poller"),
    );
    assert_eq!(cfg.resolve("RABBITMQ_PASS", None).unwrap(), "from-vault");
    // absent from the secret store: falls through to the environment
    assert_eq!(cfg.resolve("RABBITMQ_USER", None).unwrap(), "poller");
    assert_eq!(cfg.resolve("RABBITMQ_HOST", Some("localhost")).unwrap(), "localhost");
    assert_eq!(
        cfg.resolve("RABBITMQ_VHOST", None).unwrap_err(),
        ConfigError::missing("RABBITMQ_VHOST")
    );
}

#[test]
#[serial]
fn process_environment_is_read_on_every_call() {
    let cfg = ConfigResolver::new(StaticValues::new(), ProcessEnv);
    std::env::set_var("SENTIMENT_POLLER_TEST_SYMBOLS", "aapl, msft");
    assert_eq!(
        cfg.as_string_list("SENTIMENT_POLLER_TEST_SYMBOLS", None).unwrap(),
        vec!["AAPL", "MSFT"]
    );
    std::env::set_var("SENTIMENT_POLLER_TEST_SYMBOLS", "tsla");
    assert_eq!(
        cfg.as_string_list("SENTIMENT_POLLER_TEST_SYMBOLS", None).unwrap(),
        vec!["TSLA"]
    );
    std::env::remove_var("SENTIMENT_POLLER_TEST_SYMBOLS");
    assert!(cfg.as_string_list("SENTIMENT_POLLER_TEST_SYMBOLS", None).is_err());
}

#[test]
fn blank_list_entries_are_dropped() {
    let cfg = ConfigResolver::from_values(StaticValues::new().with("SYMBOLS", "aapl, msft,, GOOG"));
    assert_eq!(
        cfg.as_string_list("SYMBOLS", None).unwrap(),
        vec!["AAPL", "MSFT", "GOOG"]
    );
    let symbols: Vec<String> = cfg
        .symbols()
        .unwrap()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT", "GOOG"]);
}

#[test]
fn broker_mode_requires_a_vhost() {
    let cfg = ConfigResolver::from_values(
        StaticValues::new()
            .with("QUEUE_TYPE", "rabbitmq")
            .with("RABBITMQ_VHOST", "  "),
    );
    assert_eq!(
        QueueSettings::resolve(&cfg).unwrap_err(),
        ConfigError::missing("RABBITMQ_VHOST")
    );
}

#[test]
fn broker_defaults_fill_the_rest() {
    let cfg = ConfigResolver::from_values(StaticValues::new().with("RABBITMQ_VHOST", "/"));
    let QueueSettings::Broker(b) = QueueSettings::resolve(&cfg).unwrap() else {
        panic!("expected broker settings");
    };
    assert_eq!(b.host, "localhost");
    assert_eq!(b.port, 5672);
    assert_eq!(b.exchange, "stock_data_exchange");
    assert_eq!(b.routing_key, "stock_data");
    assert_eq!(b.uri(), "amqp://localhost:5672/%2F");
}

#[test]
fn sqs_mode_requires_a_queue_url() {
    let cfg = ConfigResolver::from_values(StaticValues::new().with("QUEUE_TYPE", "sqs"));
    assert_eq!(
        QueueSettings::resolve(&cfg).unwrap_err(),
        ConfigError::missing("SQS_QUEUE_URL")
    );

    let cfg = ConfigResolver::from_values(
        StaticValues::new()
            .with("QUEUE_TYPE", "SQS")
            .with("SQS_QUEUE_URL", "https://sqs.us-east-1.amazonaws.com/1/stock-data"),
    );
    assert!(matches!(
        QueueSettings::resolve(&cfg).unwrap(),
        QueueSettings::Managed(_)
    ));
}

#[test]
fn poller_type_accepts_legacy_names_and_lists() {
    let cfg = ConfigResolver::from_values(
        StaticValues::new().with("POLLER_TYPE", "news, finviz,google_news,social,news"),
    );
    assert_eq!(
        active_sources(&cfg).unwrap(),
        vec![Source::NewsApi, Source::Finviz, Source::GoogleNews, Source::Reddit]
    );

    let cfg = ConfigResolver::from_values(StaticValues::new());
    assert_eq!(active_sources(&cfg).unwrap(), vec![Source::NewsApi]);

    let cfg = ConfigResolver::from_values(StaticValues::new().with("POLLER_TYPE", "myspace"));
    assert!(active_sources(&cfg).is_err());
}

#[test]
fn malformed_number_is_invalid_not_missing() {
    let cfg = ConfigResolver::from_values(StaticValues::new().with("POLL_INTERVAL", "5m"));
    match cfg.as_int("POLL_INTERVAL", Some(300)) {
        Err(ConfigError::Invalid { key, value, .. }) => {
            assert_eq!(key, "POLL_INTERVAL");
            assert_eq!(value, "5m");
        }
        other => panic!("unexpected {other:?}"),
    }
}
