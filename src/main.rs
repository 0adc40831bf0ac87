use avro_kafka::codec::{is_string_like, LogicalValue, SchemaSource};
use avro_kafka::config::DecodeErrorPolicy;
use avro_kafka::{consume, produce, Config, Error, ProduceRequest, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "avro-kafka")]
#[command(about = "Produce and consume Avro records on Kafka topics", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, global = true, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produces one Avro record to a Kafka topic
    Produce(ProduceArgs),
    /// Consumes Avro records from a Kafka topic until interrupted
    Consume(ConsumeArgs),
}

#[derive(ClapArgs, Debug)]
struct ProduceArgs {
    /// The Kafka topic
    topic: String,

    /// Path to Avro schema for Kafka value
    value_schema_path: PathBuf,

    /// Kafka value, as JSON
    value: String,

    #[arg(
        long,
        visible_alias = "ks",
        value_name = "FILE",
        help = r#"Path to Avro schema for Kafka key, defaults to: {"type": "string"}"#
    )]
    key_schema_path: Option<PathBuf>,

    #[arg(short, long, help = "Kafka key, defaults to a random UUID")]
    key: Option<String>,

    #[arg(
        short,
        long,
        num_args = 1..,
        value_name = "HOST:PORT",
        help = "Kafka bootstrap servers, e.g. localhost:9092 localhost:9093"
    )]
    bootstrap_servers: Option<Vec<String>>,
}

#[derive(ClapArgs, Debug)]
struct ConsumeArgs {
    /// The Kafka topic
    topic: String,

    /// The Kafka group id of this consumer
    group_id: String,

    /// The Kafka client id of this consumer
    client_id: String,

    #[arg(
        short,
        long,
        num_args = 1..,
        value_name = "HOST:PORT",
        help = "Kafka bootstrap servers, e.g. localhost:9092 localhost:9093"
    )]
    bootstrap_servers: Option<Vec<String>>,

    #[arg(long, help = "Log and skip records that fail to decode instead of stopping")]
    skip_undecodable: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match args.command {
        Command::Produce(produce_args) => {
            if let Some(servers) = &produce_args.bootstrap_servers {
                config.kafka.brokers = servers.clone();
            }
            run_produce(config, produce_args).await
        }
        Command::Consume(consume_args) => {
            if let Some(servers) = &consume_args.bootstrap_servers {
                config.kafka.brokers = servers.clone();
            }
            if consume_args.skip_undecodable {
                config.consumer.on_decode_error = DecodeErrorPolicy::Skip;
            }
            run_consume(config, consume_args).await
        }
    }
}

async fn run_produce(config: Config, args: ProduceArgs) -> Result<()> {
    let key_schema = match &args.key_schema_path {
        Some(path) => SchemaSource::FilePath(path.clone()),
        None => SchemaSource::default_key(),
    }
    .load()?;
    let value_schema = SchemaSource::FilePath(args.value_schema_path.clone()).load()?;

    let value: LogicalValue = serde_json::from_str(&args.value).map_err(|e| {
        error!(topic = %args.topic, "Value is not valid JSON: {}", e);
        Error::from(e)
    })?;

    let mut request = ProduceRequest::new(&args.topic, value_schema, value)
        .with_key_schema(key_schema.clone());
    if let Some(key) = args.key {
        request = request.with_key(key_value(&key_schema, key)?);
    }

    info!(
        topic = %args.topic,
        brokers = %config.kafka.bootstrap_servers(),
        "Starting producer"
    );

    let outcome = tokio::task::spawn_blocking(move || produce::produce(&config, request)).await??;

    // A failed delivery is logged but does not change the exit status.
    info!(topic = %args.topic, "Delivery {}", outcome);
    Ok(())
}

async fn run_consume(config: Config, args: ConsumeArgs) -> Result<()> {
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping consumer");
            signal_token.cancel();
        }
    });

    info!(
        topic = %args.topic,
        group_id = %args.group_id,
        client_id = %args.client_id,
        brokers = %config.kafka.bootstrap_servers(),
        "Starting consumer"
    );

    let stats = tokio::task::spawn_blocking(move || {
        consume::consume(&config, &args.topic, &args.group_id, &args.client_id, &token)
    })
    .await??;

    info!(
        consumed = stats.consumed,
        broker_errors = stats.broker_errors,
        skipped = stats.skipped,
        "Consumer finished"
    );
    Ok(())
}

/// String-like key schemas take the key verbatim; anything else is JSON.
fn key_value(key_schema: &avro_kafka::codec::Schema, key: String) -> Result<LogicalValue> {
    if is_string_like(key_schema) {
        Ok(LogicalValue::String(key))
    } else {
        serde_json::from_str(&key).map_err(Error::from)
    }
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("avro_kafka=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("avro_kafka=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
