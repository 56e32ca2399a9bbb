use std::sync::Arc;

use rfidgate_server::{ChannelPublisher, RfidListener, ServerConfig};
use tokio_util::sync::CancellationToken;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{io_error, server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ServerConfig {
        listen_addr: args.listen,
        debounce: parse_duration(&args.debounce)?,
        max_frame_size: args.max_frame_size,
        topic: args.topic,
    };
    config
        .validate()
        .map_err(|err| server_error("invalid configuration", err))?;

    let shutdown = CancellationToken::new();
    install_shutdown_handler(shutdown.clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    runtime.block_on(serve(config, args.count, format, shutdown))
}

async fn serve(
    config: ServerConfig,
    count: Option<usize>,
    format: OutputFormat,
    shutdown: CancellationToken,
) -> CliResult<i32> {
    let (publisher, mut readings) = ChannelPublisher::new();
    let listener = RfidListener::bind(config, Arc::new(publisher))
        .await
        .map_err(|err| server_error("bind failed", err))?;
    let server = tokio::spawn(listener.run(shutdown.clone()));

    // The channel closes once the listener and every connection store are gone.
    let mut printed = 0usize;
    while let Some(message) = readings.recv().await {
        print_message(&message, format);
        printed = printed.saturating_add(1);

        if count.is_some_and(|count| printed >= count) {
            shutdown.cancel();
            break;
        }
    }

    match server.await {
        Ok(Ok(())) => Ok(SUCCESS),
        Ok(Err(err)) => Err(server_error("listener failed", err)),
        Err(err) => Err(CliError::new(
            INTERNAL,
            format!("listener task failed: {err}"),
        )),
    }
}

fn install_shutdown_handler(shutdown: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        tracing::info!("shutdown requested");
        shutdown.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
